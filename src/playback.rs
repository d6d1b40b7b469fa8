use bevy::asset::LoadState;
use bevy::input::keyboard::KeyboardInput;
use bevy::input::mouse::MouseButtonInput;
use bevy::input::touch::{TouchInput, TouchPhase};
use bevy::input::ButtonState;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use std::path::Path;

use crate::clip::{frame_exists, plan_frame, NextFrame, PendingLoad};
use crate::stage::{check_assets, Stage, StepOutcome, INTRO_HOLD_FRAME};

// ===== Assets =====
/// Asset root; every path below is relative to the working directory.
pub const ASSET_ROOT: &str = ".";
pub const WALKER_IMAGE: &str = "assets/pi_creature.png";

const Z_BACKDROP: f32 = 0.0;
const Z_WALKER: f32 = 1.0;

#[derive(Component)]
pub struct WalkerSprite;

#[derive(Component)]
pub struct Backdrop;

/// Pointer, touch and keys all collapse into this.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Press {
    Down,
    Up,
}

pub fn press_from_button(state: ButtonState) -> Press {
    match state {
        ButtonState::Pressed => Press::Down,
        ButtonState::Released => Press::Up,
    }
}

pub fn press_from_touch(phase: TouchPhase) -> Option<Press> {
    match phase {
        TouchPhase::Started => Some(Press::Down),
        TouchPhase::Ended | TouchPhase::Canceled => Some(Press::Up),
        TouchPhase::Moved => None,
    }
}

struct FrameSlot {
    shown: Handle<Image>,
    pending: Option<(u32, Handle<Image>)>,
    failed_at: Option<u32>,
    ended: bool,
}

/// Image handles per clip: the frame on screen and the one being fetched.
#[derive(Resource, Default)]
pub struct ClipFrames {
    slots: Vec<FrameSlot>,
}

impl ClipFrames {
    pub fn shown(&self, scene: usize) -> Option<&Handle<Image>> {
        self.slots.get(scene).map(|s| &s.shown)
    }
}

/// Missing startup assets are fatal.
pub fn check_startup_assets(stage: Res<Stage>, mut exit: EventWriter<AppExit>) {
    let root = Path::new(ASSET_ROOT);
    match check_assets(root, Path::new(WALKER_IMAGE), stage.clips()) {
        Ok(()) => info!("{} clips ready", stage.clips().len()),
        Err(e) => {
            error!("{e}");
            exit.send(AppExit::error());
        }
    }
}

/// Camera so sprites can be drawn
pub fn setup_camera(mut commands: Commands) {
    commands.spawn(Camera2dBundle::default());
}

/// Queue frame 0 of every clip and spawn the backdrop and walker sprites.
pub fn spawn_stage(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    stage: Res<Stage>,
    mut frames: ResMut<ClipFrames>,
) {
    frames.slots = stage
        .clips()
        .iter()
        .map(|clip| FrameSlot {
            shown: asset_server.load(clip.frame_path(0)),
            pending: None,
            failed_at: None,
            ended: false,
        })
        .collect();

    let clip_rect = stage.clip_rect();
    commands.spawn((
        SpriteBundle {
            texture: frames.slots[stage.current_scene()].shown.clone(),
            sprite: Sprite {
                custom_size: Some(clip_rect.size()),
                ..default()
            },
            transform: Transform::from_translation(to_world(clip_rect, stage.screen(), Z_BACKDROP)),
            ..default()
        },
        Backdrop,
    ));

    let walker_rect = stage.walker_rect();
    commands.spawn((
        SpriteBundle {
            texture: asset_server.load(WALKER_IMAGE),
            sprite: Sprite {
                custom_size: Some(walker_rect.size()),
                ..default()
            },
            transform: Transform::from_translation(to_world(walker_rect, stage.screen(), Z_WALKER)),
            ..default()
        },
        WalkerSprite,
    ));
}

/// The stage lives in the window's logical pixels.
pub fn sync_screen_size(windows: Query<&Window, With<PrimaryWindow>>, mut stage: ResMut<Stage>) {
    let Ok(win) = windows.get_single() else {
        return;
    };
    let size = IVec2::new(win.width() as i32, win.height() as i32);
    if size.x <= 0 || size.y <= 0 || size == stage.screen() {
        return;
    }
    info!("screen is {}x{}", size.x, size.y);
    stage.resize(size);
}

pub fn read_input(
    mut mouse: EventReader<MouseButtonInput>,
    mut touches: EventReader<TouchInput>,
    mut keys: EventReader<KeyboardInput>,
    mut stage: ResMut<Stage>,
) {
    let presses = mouse
        .read()
        .map(|ev| press_from_button(ev.state))
        .chain(touches.read().filter_map(|ev| press_from_touch(ev.phase)))
        .chain(keys.read().map(|ev| press_from_button(ev.state)));

    for press in presses {
        match press {
            Press::Down => {
                if !stage.has_started() {
                    info!("first press, intro released");
                }
                stage.press();
            }
            Press::Up => stage.release(),
        }
    }
}

pub fn tick_stage(mut stage: ResMut<Stage>) {
    match stage.step() {
        StepOutcome::IntroHeld => {
            info!("intro holding on frame {INTRO_HOLD_FRAME} until first press");
        }
        StepOutcome::Wrapped {
            scene,
            advanced: true,
        } => {
            info!("scene {scene}: {}", stage.current_clip().dir().display());
        }
        StepOutcome::Wrapped {
            advanced: false, ..
        } => {
            debug!("walker wrapped on the last scene");
        }
        StepOutcome::Idle | StepOutcome::Walked => {}
    }
}

fn pending_load(asset_server: &AssetServer, handle: &Handle<Image>) -> PendingLoad {
    match asset_server.get_load_state(handle.id()) {
        Some(LoadState::Loaded) => PendingLoad::Loaded,
        Some(LoadState::Failed(_)) => PendingLoad::Failed,
        _ => PendingLoad::Loading,
    }
}

/// Drive the active clip by one tick of `plan_frame`.
pub fn advance_clip(
    mut stage: ResMut<Stage>,
    asset_server: Res<AssetServer>,
    mut frames: ResMut<ClipFrames>,
) {
    let scene = stage.current_scene();
    let Some(slot) = frames.slots.get_mut(scene) else {
        return;
    };
    let clip = stage.current_clip_mut();
    let root = Path::new(ASSET_ROOT);

    let pending = slot
        .pending
        .as_ref()
        .map(|(index, handle)| (*index, pending_load(&asset_server, handle)));
    let plan = plan_frame(clip.wants_frame(), pending, slot.failed_at, |index| {
        frame_exists(root, clip.dir(), index)
    });

    if plan.show_pending {
        if let Some((_, handle)) = slot.pending.take() {
            slot.shown = handle;
            clip.frame_shown();
        }
    }

    match plan.next {
        NextFrame::Wait => {}
        NextFrame::Request(next) => {
            slot.ended = false;
            slot.pending = Some((next, asset_server.load(clip.frame_path(next))));
        }
        NextFrame::Ended(next) => {
            slot.pending = None;
            if !slot.ended {
                info!("{} ended after {next} frames", clip.dir().display());
                slot.ended = true;
            }
        }
        NextFrame::Failed(index) => {
            slot.pending = None;
            slot.failed_at = Some(index);
            warn!(
                "could not load {}, holding last frame",
                clip.frame_path(index).display()
            );
        }
        NextFrame::Hold => slot.pending = None,
    }
}

pub fn draw_stage(
    stage: Res<Stage>,
    frames: Res<ClipFrames>,
    mut walker_q: Query<(&mut Sprite, &mut Transform), (With<WalkerSprite>, Without<Backdrop>)>,
    mut backdrop_q: Query<
        (&mut Handle<Image>, &mut Sprite, &mut Transform),
        (With<Backdrop>, Without<WalkerSprite>),
    >,
) {
    let screen = stage.screen();

    if let Ok((mut sprite, mut tf)) = walker_q.get_single_mut() {
        let rect = stage.walker_rect();
        sprite.flip_x = stage.walker().flipped;
        sprite.custom_size = Some(rect.size());
        tf.translation = to_world(rect, screen, Z_WALKER);
    }

    if let Ok((mut texture, mut sprite, mut tf)) = backdrop_q.get_single_mut() {
        if let Some(shown) = frames.shown(stage.current_scene()) {
            if *texture != *shown {
                *texture = shown.clone();
            }
        }
        let rect = stage.clip_rect();
        sprite.custom_size = Some(rect.size());
        tf.translation = to_world(rect, screen, Z_BACKDROP);
    }
}

/// Top-left screen rect (y down) to the centre of the sprite in camera space
/// (origin at screen centre, y up).
pub fn to_world(rect: Rect, screen: IVec2, z: f32) -> Vec3 {
    let centre = rect.center();
    let half = screen.as_vec2() / 2.0;
    Vec3::new(centre.x - half.x, half.y - centre.y, z)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input_app() -> App {
        let mut app = App::new();
        app.add_event::<MouseButtonInput>()
            .add_event::<TouchInput>()
            .add_event::<KeyboardInput>()
            .insert_resource(Stage::new(IVec2::new(1920, 1080), &["videos/intro"]))
            .add_systems(Update, read_input);
        app
    }

    fn click(state: ButtonState) -> MouseButtonInput {
        MouseButtonInput {
            button: MouseButton::Left,
            state,
            window: Entity::PLACEHOLDER,
        }
    }

    #[test]
    fn button_states_collapse_to_presses() {
        assert_eq!(press_from_button(ButtonState::Pressed), Press::Down);
        assert_eq!(press_from_button(ButtonState::Released), Press::Up);
    }

    #[test]
    fn touch_phases_collapse_to_presses() {
        assert_eq!(press_from_touch(TouchPhase::Started), Some(Press::Down));
        assert_eq!(press_from_touch(TouchPhase::Ended), Some(Press::Up));
        assert_eq!(press_from_touch(TouchPhase::Canceled), Some(Press::Up));
        assert_eq!(press_from_touch(TouchPhase::Moved), None);
    }

    #[test]
    fn pointer_press_and_release_drive_the_walker() {
        let mut app = input_app();

        app.world_mut().send_event(click(ButtonState::Pressed));
        app.update();
        let stage = app.world().resource::<Stage>();
        assert!(stage.has_started());
        assert!(stage.walker().moving_right);

        app.world_mut().send_event(click(ButtonState::Released));
        app.update();
        assert!(!app.world().resource::<Stage>().walker().moving_right);
    }

    #[test]
    fn later_events_in_a_frame_win() {
        let mut app = input_app();
        app.world_mut().send_event(click(ButtonState::Pressed));
        app.world_mut().send_event(click(ButtonState::Released));
        app.update();

        let stage = app.world().resource::<Stage>();
        assert!(stage.has_started());
        assert!(!stage.walker().moving_right);
    }

    #[test]
    fn press_drives_the_following_tick() {
        let mut app = App::new();
        app.add_event::<MouseButtonInput>()
            .add_event::<TouchInput>()
            .add_event::<KeyboardInput>()
            .insert_resource(Stage::new(IVec2::new(1920, 1080), &["videos/intro"]))
            .add_systems(Update, (tick_stage, read_input).chain());

        app.world_mut().send_event(click(ButtonState::Pressed));
        app.update();
        let stage = app.world().resource::<Stage>();
        assert!(stage.walker().moving_right);
        assert_eq!(stage.walker().pos.x, 0);

        app.update();
        assert_eq!(app.world().resource::<Stage>().walker().pos.x, 5);
    }

    #[test]
    fn world_coordinates_are_centred_and_y_up() {
        let screen = IVec2::new(1920, 1080);
        let full = Rect::new(0.0, 0.0, 1920.0, 1080.0);
        assert_eq!(to_world(full, screen, 0.0), Vec3::ZERO);

        let bottom_left = Rect::new(0.0, 880.0, 200.0, 1080.0);
        assert_eq!(
            to_world(bottom_left, screen, 1.0),
            Vec3::new(-860.0, -440.0, 1.0)
        );
    }
}
