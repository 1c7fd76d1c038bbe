use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::Error;
use ecu_telemetry::protocol::layouts::LayoutTable;
use ecu_telemetry::telemetry::aggregator::{Aggregator, AggregatorOptions, StopReason};
use ecu_telemetry::telemetry::sink::{CsvFileSink, CsvOptions};
use tracing::{info, warn};

#[cfg(target_os = "linux")]
mod receiver;

/// Decode engine ECU broadcast frames from a CAN interface and keep the
/// latest readings in a single-line CSV file.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// CAN interface to listen on.
    #[arg(short, long, env = "ECU_TELEMETRY_INTERFACE", default_value = "can0")]
    interface: String,

    /// CSV file rewritten on every change.
    #[arg(short, long, env = "ECU_TELEMETRY_OUTPUT", default_value = "telemetry_data.csv")]
    output: PathBuf,

    /// JSON layout manifest replacing the built-in table.
    #[arg(short, long, env = "ECU_TELEMETRY_LAYOUT")]
    layout: Option<PathBuf>,

    /// Write a header row before the values.
    #[arg(long)]
    header: bool,

    /// Text written for channels not received yet.
    #[arg(long, default_value = "")]
    placeholder: String,

    /// Decimal places of real-valued channels.
    #[arg(long, default_value_t = 2)]
    precision: usize,

    /// Warn when the bus stays silent this long.
    #[arg(long, default_value = "10s", value_parser = humantime::parse_duration)]
    idle_timeout: Duration,

    /// Log every channel after each decoded frame.
    #[arg(long)]
    log_values: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    let _ = dotenvy::dotenv();
    color_eyre::install()?;
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let table = LayoutTable::load(args.layout.as_deref())?;
    let mut sink = CsvFileSink::new(
        &args.output,
        CsvOptions {
            header: args.header,
            placeholder: args.placeholder.clone(),
            precision: args.precision,
        },
    );
    let mut aggregator = Aggregator::new(
        table,
        AggregatorOptions {
            log_values: args.log_values,
        },
    );
    info!(output = %sink.path().display(), "writing telemetry");

    run(&args, &mut aggregator, &mut sink).await
}

#[cfg(target_os = "linux")]
async fn run(
    args: &Args,
    aggregator: &mut Aggregator,
    sink: &mut CsvFileSink,
) -> Result<(), Error> {
    use color_eyre::eyre::WrapErr;

    let (mut source, handle) =
        receiver::spawn(&args.interface, aggregator.table(), args.idle_timeout)
            .wrap_err_with(|| format!("failed to open CAN interface {}", args.interface))?;

    let stop = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(%error, "cannot listen for Ctrl-C, running until the bus fails");
            std::future::pending::<()>().await;
        }
    };

    let reason = aggregator.run(&mut source, sink, stop).await;
    drop(source);
    if handle.join().is_err() {
        warn!("CAN receiver thread panicked");
    }

    let stats = aggregator.stats();
    info!(
        received = stats.frames_received,
        decoded = stats.frames_decoded,
        ignored = stats.frames_ignored,
        persist_failures = stats.persist_failures,
        "shutdown complete"
    );

    match reason {
        StopReason::Transport(error) => {
            Err(Error::new(error).wrap_err(format!("CAN interface {} failed", args.interface)))
        }
        StopReason::EndOfStream | StopReason::Cancelled | StopReason::AlreadyStopped => Ok(()),
    }
}

#[cfg(not(target_os = "linux"))]
async fn run(
    args: &Args,
    _aggregator: &mut Aggregator,
    _sink: &mut CsvFileSink,
) -> Result<(), Error> {
    color_eyre::eyre::bail!(
        "cannot open {}: SocketCAN is only available on Linux",
        args.interface
    )
}
