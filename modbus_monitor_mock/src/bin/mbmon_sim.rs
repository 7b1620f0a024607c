use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::Mutex;

use modbus_monitor::config::config;
use modbus_monitor::exception_codes::ExceptionRegistry;
use modbus_monitor::executor::ExecOutcome;
use modbus_monitor::request::format_preview;
use modbus_monitor::response::blank_rows;
use modbus_monitor::session::{spawn_bus_poller, Session, MIN_POLL_PERIOD};
use modbus_monitor::MonitorError;
use modbus_monitor_mock::Scenario;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a Modbus scenario against a simulated bus")]
struct Args {
    /// Scenario TOML file
    scenario: PathBuf,

    /// Extra exception-code table merged over the built-in one
    #[arg(long)]
    exceptions: Option<PathBuf>,

    /// Show register values in hex for every read step
    #[arg(long)]
    hex: bool,

    /// Print the monitor table as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Bus poll period in milliseconds (defaults to MBMON_POLL_INTERVAL_MS)
    #[arg(long)]
    poll_ms: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    modbus_monitor::init_defaults()?;
    if let Some(path) = &args.exceptions {
        ExceptionRegistry::from_path(path)?.register_or_merge()?;
        tracing::info!("merged exception codes from {}", path.display());
    }

    let scenario = Scenario::from_path(&args.scenario)?;
    let bus = scenario.build_bus();
    let handle = bus.handle();
    let period = args
        .poll_ms
        .map_or_else(|| config().poll_interval(), Duration::from_millis)
        .max(MIN_POLL_PERIOD);

    let session = Arc::new(Mutex::new(Session::new()));
    session.lock().await.activate(Box::new(bus));
    let poller = spawn_bus_poller(Arc::downgrade(&session), period);

    for (i, step) in scenario.steps.iter().enumerate() {
        let req = step
            .to_request()
            .with_context(|| format!("step {}", i + 1))?;
        println!(
            "#{} {}  [{}]",
            i + 1,
            req.function.label(),
            format_preview(&req.preview())
        );

        if step.foreign {
            match step.fault {
                Some(fault) => handle.inject_foreign_exchange_with_fault(req, fault),
                None => handle.inject_foreign_exchange(req),
            }
            while handle.pending_foreign() > 0 {
                tokio::time::sleep(period).await;
            }
            println!("   foreign exchange observed");
            continue;
        }

        if let Some(fault) = step.fault {
            handle.push_fault(fault);
        }
        let mut guard = session.lock().await;
        guard.options.hex_display = args.hex || step.hex;
        if req.function.is_write() {
            for row in blank_rows(req.function, req.start_address, req.quantity) {
                tracing::debug!("editable row {} {}", row.data_type_label, row.address);
            }
        }
        match guard.send(&req) {
            Ok(outcome) => {
                if let ExecOutcome::Read(rows) = &outcome {
                    for row in rows {
                        println!(
                            "   {:<28} {:>6} {:>8} {}",
                            row.data_type_label, row.address, row.display_value, row.float_text
                        );
                    }
                }
                println!("   {}", outcome.status_text());
            }
            Err(MonitorError::Exec(e)) => println!("   {}: {}", e.title(), e),
            Err(e) => println!("   error: {e}"),
        }
    }

    let monitor = session.lock().await.monitor().clone();
    drop(session);
    poller.await.context("bus poller")?;

    println!();
    if args.json {
        println!("{}", monitor.lock().export_json()?);
    } else {
        for row in monitor.lock().display_rows() {
            println!(
                "{:<8} {:>3} {:<14} {:>6} {:>6} {}",
                row.direction, row.slave, row.function, row.address, row.quantity, row.crc
            );
        }
        println!();
        print!("{}", monitor.raw_trace());
    }
    Ok(())
}
