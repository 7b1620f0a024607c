#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::doc_markdown,
    clippy::cast_possible_truncation
)]

//! modbus_monitor
//!
//! Core of an interactive Modbus client and bus monitor. The crate turns user
//! input into request frames, runs them through a transport supplied by the
//! caller and decodes the returned units into register-table rows. Every frame
//! the transport observes, including traffic driven by other masters on the
//! bus, is recorded in a passive bus monitor.
//!
//! Main pieces:
//! - function code catalog and data-type labels (`function_code`)
//! - half-precision float decode for register values (`float16`)
//! - request header preview (`request`)
//! - request execution with count validation and typed errors (`executor`)
//! - bus monitor log with CRC and exception flags (`monitor`)
//! - the transport boundary (`transport`) and the session that owns it (`session`)
//!
//! A simulated bus for tests lives in the separate `modbus_monitor_mock` crate.
//!
//! ```no_run
//! use modbus_monitor::function_code::FunctionCode;
//! use modbus_monitor::request::Request;
//! use modbus_monitor::session::Session;
//! # fn transport() -> Box<dyn modbus_monitor::transport::Transport> { unimplemented!() }
//! let mut session = Session::new();
//! session.activate(transport());
//! let req = Request::new()
//!     .with_slave(1)
//!     .with_function(FunctionCode::ReadHoldingRegisters)
//!     .with_quantity(4);
//! let outcome = session.send(&req)?;
//! for row in outcome.rows() {
//!     println!("{} {} {}", row.data_type_label, row.address, row.display_value);
//! }
//! # Ok::<(), modbus_monitor::MonitorError>(())
//! ```

pub mod config;
pub mod crc;
pub mod error;
pub mod exception_codes;
pub mod executor;
pub mod float16;
pub mod function_code;
pub mod monitor;
pub mod request;
pub mod response;
pub mod session;
pub mod transport;

pub use error::{ExecError, MonitorError};
pub use executor::{execute, ExecOptions, ExecOutcome};
pub use function_code::{classify, describe, FunctionCode, UnitSize};
pub use monitor::{BusEvent, BusMonitorLog, Direction, FrameEvent, MonitorSink, SharedBusMonitor};
pub use request::Request;
pub use response::DecodedRegister;
pub use session::Session;
pub use transport::{Transport, TransportError, TransportErrorKind};

/// Register the embedded exception-code table into the global registry.
///
/// Safe to call more than once: later calls merge into the existing table.
pub fn init_defaults() -> Result<(), MonitorError> {
    exception_codes::ExceptionRegistry::embedded()?.register_or_merge()
}

/// Initialize `env_logger` (filtered by `RUST_LOG`). Ignored if a logger is already set.
pub fn init_logging() {
    if env_logger::try_init().is_err() {
        tracing::debug!("logger already initialized");
    }
}
