mod app;
pub mod cli;
mod error;
pub mod export;
pub mod logging;
pub mod settings;
pub mod sync;

pub use app::{App, RunReport};
pub use cli::CliArgs;
pub use error::SyncError;
pub use settings::Settings;
