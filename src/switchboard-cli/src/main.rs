//! Switchboard CLI - Main entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use switchboard_cli::cli::{Cli, dispatch_command};
use switchboard_cli::styled_output::print_error;

/// Log to stderr. `RUST_LOG` wins when set; otherwise the level chosen on
/// the command line applies to the switchboard crates only.
fn init_logging(cli: &Cli) {
    let level = cli.effective_log_level().as_filter_str();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "error,switchboard={level},switchboard_core={level},switchboard_storage={level},switchboard_cli={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    if let Err(err) = dispatch_command(cli) {
        print_error(&format!("{:#}", err));
        std::process::exit(1);
    }
}
