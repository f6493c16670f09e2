use anyhow::Result;
use clap::Parser;

use stravasync::{logging::init_logging, App, CliArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    let log = init_logging()?;
    tracing::debug!(path = %log.path.display(), "Logging to file");

    let settings = args.settings()?;
    let report = App::new(settings).run().await?;
    tracing::info!(exported = report.exported, "Done");

    Ok(())
}
