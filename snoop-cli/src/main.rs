//! snoop - multi-interface packet capture and classification

use snoop_capture::{ConsoleWriter, LockedSink, SessionController, Sink};
use snoop_cli::{Cli, Commands};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse_args();
    init_logging(cli.log_level());

    let controller = SessionController::pcap();

    if let Some(Commands::Interfaces) = cli.command {
        for interface in controller.interfaces()? {
            println!("{}", interface);
        }
        return Ok(());
    }

    let settings = cli.settings()?;

    let mut sinks: Vec<Arc<dyn Sink>> = Vec::new();
    if !cli.quiet {
        sinks.push(Arc::new(LockedSink::new(
            "console",
            ConsoleWriter::new(std::io::stdout(), !cli.no_color),
        )));
    }

    let session = controller.start(&settings, sinks)?;
    let stopper = session.stopper();
    info!(session = %session.id(), "Capturing; press Ctrl-C to stop");

    let mut join = tokio::task::spawn_blocking(move || session.join());
    let report = tokio::select! {
        result = &mut join => result?,
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => {
                    info!("Interrupted, stopping capture");
                    stopper.stop();
                }
                Err(e) => warn!(error = %e, "Cannot listen for Ctrl-C"),
            }
            join.await?
        }
    }?;

    print!("{}", report.summary());
    Ok(())
}

/// Install the stderr subscriber; `RUST_LOG` takes precedence over `-v`
fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
