mod api;
mod audio;
mod camera;
mod components;
mod config;
mod director;
mod events;
mod game_runtime;
mod input;
mod interaction;
mod level_state;
mod levels;
mod narration;
mod physics;
mod render;
mod telemetry;
mod timers;
mod ui;
mod world_text;

use bevy::prelude::*;
use components::HeadlessMode;
use config::{load_startup_config, GameConfig};

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let headless = args.iter().any(|a| a == "--headless");

    let startup_config = load_startup_config();
    let (config, problems) = GameConfig::resolve(startup_config, |key| std::env::var(key).ok());
    for problem in &problems {
        eprintln!("[Onboard] {}; using default", problem);
    }

    let mut app = App::new();
    app.insert_resource(HeadlessMode(headless));

    if headless {
        // Headless mode: no window, no rendering, no audio output
        app.add_plugins(MinimalPlugins);
        app.add_plugins(bevy::log::LogPlugin::default());
        println!("[Onboard] Starting in HEADLESS mode");
    } else {
        let bounds = config.bounds;
        app.add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: config.window_title.clone(),
                resolution: (bounds.width, bounds.height).into(),
                resizable: false,
                present_mode: bevy::window::PresentMode::AutoVsync,
                ..default()
            }),
            ..default()
        }));
        let bg = config.background_color;
        app.insert_resource(ClearColor(Color::srgb(bg[0], bg[1], bg[2])));
        app.add_plugins(render::RenderPlugin);
        println!("[Onboard] Starting in WINDOWED mode");
    }

    // Plugins below read GameConfig while building.
    app.insert_resource(config)
        .add_plugins(events::GameEventsPlugin)
        .add_plugins(input::InputPlugin)
        .add_plugins(camera::CameraPlugin)
        .add_plugins(narration::NarrationPlugin)
        .add_plugins(game_runtime::ProgressionPlugin)
        .add_plugins(world_text::WorldTextPlugin)
        .add_plugins(ui::UiPlugin)
        .add_plugins(telemetry::TelemetryPlugin)
        .add_plugins(api::ApiPlugin);

    app.run();
}
