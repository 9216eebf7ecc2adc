use scene_inspector_lib::command::{execute_command, execute_json_batch, ViewportCommand};
use scene_inspector_lib::fixtures;
use scene_inspector_lib::harness::TestHarness;
use scene_inspector_lib::settings::ViewportSettings;
use shared::SceneDescription;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scene_inspector=info,scene_inspector_lib=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = ViewportSettings::load();
    if std::env::args().any(|a| a == "--write-settings") {
        settings.save();
        tracing::info!("Wrote settings to the config directory");
    }
    let mut harness = TestHarness::with_settings(settings);

    let scene = arg_value("--scene")
        .and_then(|path| load_scene(&path))
        .unwrap_or_else(|| {
            tracing::info!("No scene given, using the built-in demo scene");
            fixtures::mixed_scene()
        });
    let loaded = harness.load_scene(&scene);
    tracing::info!("Loaded {} root entities", loaded.len());
    harness.open();

    match arg_value("--script") {
        Some(path) => run_script(&mut harness, &path),
        None => print_json(&execute_command(&mut harness, ViewportCommand::Inspect)),
    }
}

/// Value following `flag` on the command line
fn arg_value(flag: &str) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1).cloned())
}

fn load_scene(path: &str) -> Option<SceneDescription> {
    match std::fs::read_to_string(path) {
        Ok(json) => match SceneDescription::from_json(&json) {
            Ok(scene) => {
                tracing::info!("Loaded scene from {path} ({} entities)", scene.entity_count());
                Some(scene)
            }
            Err(e) => {
                tracing::error!("Failed to parse scene JSON from {path}: {e}");
                None
            }
        },
        Err(e) => {
            tracing::error!("Failed to read scene file {path}: {e}");
            None
        }
    }
}

fn run_script(harness: &mut TestHarness, path: &str) {
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to read script {path}: {e}");
            std::process::exit(1);
        }
    };
    match execute_json_batch(harness, &json) {
        Ok(responses) => {
            for response in &responses {
                print_json(response);
            }
        }
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::error!("Failed to serialize response: {e}"),
    }
}
