use clap::Parser;
use commit_lens_core::{run, style, CoreCliArgs};
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    // RUST_LOG wins when set
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli_args = CoreCliArgs::parse();
    init_logging(cli_args.verbose);

    match run(cli_args).await {
        Ok(outcome) => std::process::exit(outcome.exit_code()),
        Err(e) => {
            eprintln!(
                "{} {} {}",
                style("❌"),
                style("commit-lens failed:").red().bold(),
                style(format!("{e:#}")).red()
            );
            std::process::exit(1);
        }
    }
}
