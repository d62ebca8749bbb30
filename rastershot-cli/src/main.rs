/// rastershot - render a building element database to PNG
///
/// Logging defaults to `info`; set RUST_LOG to change it.
use clap::Parser;
use env_logger::{Builder, Env};
use rastershot_cli::{run, Args};

fn main() -> anyhow::Result<()> {
    Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    run(&args)?;
    Ok(())
}
