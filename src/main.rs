use bevy::asset::AssetPlugin;
use bevy::input::InputSystem;
use bevy::prelude::*;
use bevy::window::{WindowMode, WindowResolution};

mod clip;
mod playback;
mod stage;

use playback::{
    advance_clip, check_startup_assets, draw_stage, read_input, setup_camera, spawn_stage,
    sync_screen_size, tick_stage, ClipFrames, ASSET_ROOT,
};
use stage::Stage;

// ===== Scenes, in walking order =====
const CLIP_DIRS: [&str; 4] = [
    "videos/intro",
    "videos/about_me",
    "videos/skills",
    "videos/ending",
];

const TICK_HZ: f64 = 60.0;

// Until the window reports its real size
const BOOT_SIZE: IVec2 = IVec2::new(1280, 720);

fn main() -> AppExit {
    App::new()
        .add_plugins(
            DefaultPlugins
                .set(AssetPlugin {
                    file_path: ASSET_ROOT.into(), // assets/ and videos/ from the working dir
                    ..default()
                })
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "pi walkthrough".into(),
                        name: Some("pi-walkthrough".into()),
                        resolution: WindowResolution::new(BOOT_SIZE.x as f32, BOOT_SIZE.y as f32),
                        mode: WindowMode::BorderlessFullscreen,
                        ..default()
                    }),
                    ..default()
                }),
        )
        .insert_resource(ClearColor(Color::BLACK))
        .insert_resource(Time::<Fixed>::from_hz(TICK_HZ))
        .insert_resource(Stage::new(BOOT_SIZE, &CLIP_DIRS))
        .init_resource::<ClipFrames>()
        .add_systems(
            Startup,
            (check_startup_assets, setup_camera, spawn_stage).chain(),
        )
        .add_systems(PreUpdate, sync_screen_size.after(InputSystem))
        .add_systems(FixedUpdate, (tick_stage, advance_clip).chain())
        // presses land after this frame's ticks, so they drive the next one
        .add_systems(Update, (read_input, draw_stage).chain())
        .run()
}
