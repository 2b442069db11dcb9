mod revapatch;

use revapatch::cli::Cli;
use revapatch::config::AppCatalog;
use revapatch::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let argv = Cli::parse_with_catalog(&AppCatalog::builtin());
    let level = if argv.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("revapatch={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(MultiProgressWriter::new)
        .init();

    program::program(argv).await
}
