//! Transport boundary.
//!
//! The byte-level serial/TCP I/O lives outside this crate. A transport only
//! has to expose the read/write primitives per function class, a slave
//! address setter, a non-blocking poll and a place to attach a monitor sink.
//! Sinks are handed over explicitly at activation, so nothing here depends on
//! process-wide callback registration.

use std::sync::Arc;

use thiserror::Error;

use crate::monitor::MonitorSink;

/// Why a transport call failed. The executor uses this, not a global error
/// variable, to tell a silent slave from a rejected request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Nothing came back before the response timeout.
    NoResponse,
    /// The slave answered with an exception response carrying this code.
    SlaveException(u8),
    /// The transport or the slave does not implement the function.
    Unsupported,
    /// A malformed or unexpected reply.
    InvalidResponse,
    /// Any other I/O failure on the underlying link.
    Io,
}

#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("{description}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub description: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
        }
    }

    #[must_use]
    pub fn no_response() -> Self {
        Self::new(TransportErrorKind::NoResponse, "Connection timed out")
    }

    /// Exception response; the description comes from the exception table.
    #[must_use]
    pub fn slave_exception(code: u8) -> Self {
        Self::new(
            TransportErrorKind::SlaveException(code),
            crate::exception_codes::describe_exception(code),
        )
    }

    #[must_use]
    pub const fn is_no_response(&self) -> bool {
        matches!(self.kind, TransportErrorKind::NoResponse)
    }

    /// An exception raised by a gateway rather than by the addressed slave.
    #[must_use]
    pub const fn is_gateway_error(&self) -> bool {
        match self.kind {
            TransportErrorKind::SlaveException(code) => {
                crate::exception_codes::is_gateway_error(code)
            }
            _ => false,
        }
    }
}

/// A connected link to the bus.
///
/// Read primitives return the units the slave actually delivered; their
/// length is the returned count. Write primitives return the number of units
/// the slave acknowledged. One handle serves one request at a time.
pub trait Transport: Send {
    /// Short name for logs, e.g. the port or socket address.
    fn name(&self) -> &str;

    fn set_slave(&mut self, slave: u8) -> Result<(), TransportError>;

    fn read_bits(&mut self, address: u16, count: u16) -> Result<Vec<bool>, TransportError>;

    fn read_input_bits(&mut self, address: u16, count: u16) -> Result<Vec<bool>, TransportError>;

    fn read_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>, TransportError>;

    fn read_input_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError>;

    fn write_bit(&mut self, address: u16, value: bool) -> Result<usize, TransportError>;

    fn write_register(&mut self, address: u16, value: u16) -> Result<usize, TransportError>;

    fn write_bits(&mut self, address: u16, values: &[bool]) -> Result<usize, TransportError>;

    fn write_registers(&mut self, address: u16, values: &[u16]) -> Result<usize, TransportError>;

    /// Give the transport a chance to surface frames driven by other bus
    /// participants. Must not block.
    fn poll(&mut self) -> Result<(), TransportError>;

    /// Route every observed frame exchange to `sink` from now on.
    fn attach_monitor(&mut self, sink: Arc<dyn MonitorSink>);

    fn detach_monitor(&mut self);
}

/// `xx xx xx` rendering used in transport logs.
#[must_use]
pub fn hex_dump(b: &[u8]) -> String {
    b.iter()
        .map(|x| format!("{x:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}
