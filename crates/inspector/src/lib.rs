// Library crate: the viewport interaction core plus the headless harness and
// JSON command layer used by integration tests and the CLI.

pub mod command;
pub mod events;
pub mod fixtures;
pub mod harness;
pub mod scene;
pub mod session;
pub mod settings;
pub mod telemetry;
pub mod viewport;
