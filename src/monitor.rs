//! Passive bus monitor.
//!
//! Two independent append-only logs: the structured frame table (one
//! [`BusEvent`] per observed frame) and the continuous raw byte trace. They
//! share no entries and are cleared separately. Nothing is ever removed
//! individually; the monitor keeps the whole session for later replay.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::config::config as global_config;
use crate::exception_codes;
use crate::function_code::EXCEPTION_FLAG;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Direction {
    Request,
    Response,
}

impl Direction {
    #[must_use]
    pub const fn from_is_request(is_request: bool) -> Self {
        if is_request {
            Self::Request
        } else {
            Self::Response
        }
    }

    /// Column text of the monitor table.
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Request => "Req >>",
            Self::Response => "<< Resp",
        }
    }
}

/// One frame notification as reported by a transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameEvent {
    pub direction: Direction,
    pub slave_id: u8,
    pub function_code: u8,
    pub address: u16,
    pub quantity: u16,
    pub expected_crc: u16,
    pub actual_crc: u16,
}

/// A recorded frame. Never mutated after it is appended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BusEvent {
    /// Position in the session, starting at 0; keeps counting across `clear()`.
    pub sequence: u64,
    pub direction: Direction,
    pub slave_id: u8,
    pub function_code: u8,
    pub address: u16,
    pub quantity: u16,
    pub expected_crc: u16,
    pub actual_crc: u16,
    /// Set when the checksum in the frame differs from the computed one.
    /// Exception frames are not checked.
    pub crc_mismatch: bool,
    pub is_exception: bool,
    pub exception_code: Option<u8>,
}

/// Text form of a [`BusEvent`], one string per table column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BusEventRow {
    pub direction: String,
    pub slave: String,
    pub function: String,
    pub address: String,
    pub quantity: String,
    pub crc: String,
}

impl BusEvent {
    fn from_frame(sequence: u64, frame: FrameEvent) -> Self {
        let is_exception = frame.function_code > 127;
        let exception_code = is_exception.then(|| frame.function_code - EXCEPTION_FLAG);
        Self {
            sequence,
            direction: frame.direction,
            slave_id: frame.slave_id,
            function_code: frame.function_code,
            address: frame.address,
            quantity: frame.quantity,
            expected_crc: frame.expected_crc,
            actual_crc: frame.actual_crc,
            crc_mismatch: !is_exception && frame.expected_crc != frame.actual_crc,
            is_exception,
            exception_code,
        }
    }

    /// Checksum column: the received CRC, followed by the expected one in
    /// parentheses on mismatch. Empty for exception frames.
    #[must_use]
    pub fn crc_text(&self) -> String {
        if self.is_exception {
            String::new()
        } else if self.crc_mismatch {
            format!("{:04x} ({:04x})", self.actual_crc, self.expected_crc)
        } else {
            format!("{:04x}", self.actual_crc)
        }
    }

    #[must_use]
    pub fn function_text(&self) -> String {
        match self.exception_code {
            Some(code) => format!("Exception ({code})"),
            None => self.function_code.to_string(),
        }
    }

    /// Registered description of the exception carried by this frame.
    #[must_use]
    pub fn exception_description(&self) -> Option<String> {
        self.exception_code.and_then(exception_codes::code_description)
    }

    #[must_use]
    pub fn display_row(&self) -> BusEventRow {
        let (address, quantity) = if self.is_exception {
            (String::new(), String::new())
        } else {
            (self.address.to_string(), self.quantity.to_string())
        };
        BusEventRow {
            direction: self.direction.marker().to_string(),
            slave: self.slave_id.to_string(),
            function: self.function_text(),
            address,
            quantity,
            crc: self.crc_text(),
        }
    }
}

/// Receiver of transport notifications. Transports get one at activation time
/// and call it for every frame they see, whoever initiated the exchange.
pub trait MonitorSink: Send + Sync {
    fn on_frame_event(&self, frame: FrameEvent);
    fn on_raw_bytes(&self, bytes: &[u8], append_newline: bool);
}

#[derive(Debug, Default)]
pub struct BusMonitorLog {
    events: Vec<BusEvent>,
    raw_trace: String,
    next_sequence: u64,
}

impl BusMonitorLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one frame. Exception and bad-CRC frames are recorded like any other.
    pub fn on_frame_event(&mut self, frame: FrameEvent) -> &BusEvent {
        let event = BusEvent::from_frame(self.next_sequence, frame);
        self.next_sequence += 1;
        if global_config().log_frames {
            log::debug!(
                "[BUS {}] slave={} fc={} addr={} qty={} crc={}",
                event.direction.marker(),
                event.slave_id,
                event.function_text(),
                event.address,
                event.quantity,
                event.crc_text()
            );
        }
        if event.crc_mismatch {
            log::warn!(
                "CRC mismatch on frame #{}: got {:04x}, expected {:04x}",
                event.sequence,
                event.actual_crc,
                event.expected_crc
            );
        }
        self.events.push(event);
        &self.events[self.events.len() - 1]
    }

    /// Append bytes to the raw trace as `xx ` groups.
    pub fn on_raw_bytes(&mut self, bytes: &[u8], append_newline: bool) {
        if bytes.is_empty() {
            return;
        }
        for b in bytes {
            self.raw_trace.push_str(&format!("{b:02x} "));
        }
        if append_newline {
            self.raw_trace.push('\n');
        }
    }

    #[must_use]
    pub fn events(&self) -> &[BusEvent] {
        &self.events
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[must_use]
    pub fn raw_trace(&self) -> &str {
        &self.raw_trace
    }

    #[must_use]
    pub fn display_rows(&self) -> Vec<BusEventRow> {
        self.events.iter().map(BusEvent::display_row).collect()
    }

    /// Empty the frame table. The raw trace is left alone.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Empty the raw trace. The frame table is left alone.
    pub fn clear_raw(&mut self) {
        self.raw_trace.clear();
    }

    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.events)
    }
}

/// Thread-safe handle to a [`BusMonitorLog`]. Appends from any thread are
/// serialized on the inner mutex, so a multi-threaded transport can report
/// frames directly.
#[derive(Clone, Debug, Default)]
pub struct SharedBusMonitor {
    inner: Arc<Mutex<BusMonitorLog>>,
}

impl SharedBusMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the log. A poisoned lock is recovered: entries are plain data and
    /// the log stays consistent between appends.
    pub fn lock(&self) -> MutexGuard<'_, BusMonitorLog> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<BusEvent> {
        self.lock().events().to_vec()
    }

    #[must_use]
    pub fn raw_trace(&self) -> String {
        self.lock().raw_trace().to_string()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn clear_raw(&self) {
        self.lock().clear_raw();
    }

    /// The same log as a sink to hand to a transport.
    #[must_use]
    pub fn sink(&self) -> Arc<dyn MonitorSink> {
        Arc::new(self.clone())
    }
}

impl MonitorSink for SharedBusMonitor {
    fn on_frame_event(&self, frame: FrameEvent) {
        self.lock().on_frame_event(frame);
    }

    fn on_raw_bytes(&self, bytes: &[u8], append_newline: bool) {
        self.lock().on_raw_bytes(bytes, append_newline);
    }
}
