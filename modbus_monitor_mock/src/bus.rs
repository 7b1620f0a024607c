//! Simulated RTU bus implementing the `Transport` boundary.
//!
//! Every exchange builds the real request and response frames and reports
//! them to the attached monitor sink, so the monitor sees the same traffic a
//! serial line would carry. Faults are queued per call and consumed in order.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Deserialize;

use modbus_monitor::crc::split_crc;
use modbus_monitor::function_code::FunctionCode;
use modbus_monitor::monitor::{Direction, FrameEvent, MonitorSink};
use modbus_monitor::request::Request;
use modbus_monitor::transport::{hex_dump, Transport, TransportError, TransportErrorKind};

use crate::frame;
use crate::image::SlaveImage;

/// Fault applied to the next request sent through the bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fault {
    /// The slave stays silent.
    NoResponse,
    /// The slave answers with this exception code.
    Exception(u8),
    /// The slave answers normally but reports this many units.
    UnitCount(usize),
    /// The response trailer is damaged on the wire. The payload still arrives.
    CorruptCrc,
}

#[derive(Debug)]
enum Reply {
    Bits(Vec<bool>),
    Words(Vec<u16>),
    Written(usize),
}

impl Reply {
    fn resize(&mut self, count: usize) {
        match self {
            Self::Bits(b) => b.resize(count, false),
            Self::Words(w) => w.resize(count, 0),
            Self::Written(n) => *n = count,
        }
    }
}

/// One operation on the bus, expressed with the values that go on the wire.
#[derive(Clone, Debug)]
enum Operation {
    Read { function: FunctionCode, address: u16, count: u16 },
    WriteCoil { address: u16, value: bool },
    WriteRegister { address: u16, value: u16 },
    WriteCoils { address: u16, values: Vec<bool> },
    WriteRegisters { address: u16, values: Vec<u16> },
}

impl Operation {
    fn from_request(req: &Request) -> Option<Self> {
        let address = req.start_address;
        let quantity = req.quantity;
        Some(match req.function {
            f @ (FunctionCode::ReadCoils
            | FunctionCode::ReadDiscreteInputs
            | FunctionCode::ReadHoldingRegisters
            | FunctionCode::ReadInputRegisters) => Self::Read {
                function: f,
                address,
                count: quantity,
            },
            FunctionCode::WriteSingleCoil => Self::WriteCoil {
                address,
                value: req.value_at(0) != 0,
            },
            FunctionCode::WriteSingleRegister => Self::WriteRegister {
                address,
                value: req.value_at(0) as u16,
            },
            FunctionCode::WriteMultipleCoils => Self::WriteCoils {
                address,
                values: (0..usize::from(quantity)).map(|i| req.value_at(i) != 0).collect(),
            },
            FunctionCode::WriteMultipleRegisters => Self::WriteRegisters {
                address,
                values: (0..usize::from(quantity)).map(|i| req.value_at(i) as u16).collect(),
            },
            FunctionCode::Unknown(_) => return None,
        })
    }

    const fn function(&self) -> FunctionCode {
        match self {
            Self::Read { function, .. } => *function,
            Self::WriteCoil { .. } => FunctionCode::WriteSingleCoil,
            Self::WriteRegister { .. } => FunctionCode::WriteSingleRegister,
            Self::WriteCoils { .. } => FunctionCode::WriteMultipleCoils,
            Self::WriteRegisters { .. } => FunctionCode::WriteMultipleRegisters,
        }
    }

    const fn address(&self) -> u16 {
        match self {
            Self::Read { address, .. }
            | Self::WriteCoil { address, .. }
            | Self::WriteRegister { address, .. }
            | Self::WriteCoils { address, .. }
            | Self::WriteRegisters { address, .. } => *address,
        }
    }

    fn quantity(&self) -> u16 {
        match self {
            Self::Read { count, .. } => *count,
            Self::WriteCoil { .. } | Self::WriteRegister { .. } => 1,
            Self::WriteCoils { values, .. } => values.len() as u16,
            Self::WriteRegisters { values, .. } => values.len() as u16,
        }
    }

    fn request_frame(&self, slave: u8) -> Vec<u8> {
        match self {
            Self::Read {
                function,
                address,
                count,
            } => frame::read_request(slave, *function, *address, *count),
            Self::WriteCoil { address, value } => {
                frame::write_single_coil(slave, *address, *value)
            }
            Self::WriteRegister { address, value } => {
                frame::write_single_register(slave, *address, *value)
            }
            Self::WriteCoils { address, values } => {
                frame::write_multiple_coils(slave, *address, values)
            }
            Self::WriteRegisters { address, values } => {
                frame::write_multiple_registers(slave, *address, values)
            }
        }
    }

    fn apply(&self, image: &mut SlaveImage) -> Result<Reply, u8> {
        match self {
            Self::Read {
                function,
                address,
                count,
            } => match function {
                FunctionCode::ReadCoils => image.read_coils(*address, *count).map(Reply::Bits),
                FunctionCode::ReadDiscreteInputs => {
                    image.read_discrete_inputs(*address, *count).map(Reply::Bits)
                }
                FunctionCode::ReadHoldingRegisters => {
                    image.read_holding_registers(*address, *count).map(Reply::Words)
                }
                _ => image.read_input_registers(*address, *count).map(Reply::Words),
            },
            Self::WriteCoil { address, value } => {
                image.write_coils(*address, &[*value]).map(Reply::Written)
            }
            Self::WriteRegister { address, value } => {
                image.write_registers(*address, &[*value]).map(Reply::Written)
            }
            Self::WriteCoils { address, values } => {
                image.write_coils(*address, values).map(Reply::Written)
            }
            Self::WriteRegisters { address, values } => {
                image.write_registers(*address, values).map(Reply::Written)
            }
        }
    }

    fn response_frame(&self, slave: u8, reply: &Reply) -> Vec<u8> {
        let function = self.function();
        match (self, reply) {
            (_, Reply::Bits(bits)) => frame::bits_response(slave, function, bits),
            (_, Reply::Words(words)) => frame::words_response(slave, function, words),
            // single writes echo the request
            (Self::WriteCoil { .. } | Self::WriteRegister { .. }, Reply::Written(_)) => {
                self.request_frame(slave)
            }
            (_, Reply::Written(n)) => {
                frame::write_multiple_ack(slave, function, self.address(), *n as u16)
            }
        }
    }
}

#[derive(Default)]
struct BusState {
    slaves: HashMap<u8, SlaveImage>,
    current_slave: u8,
    faults: VecDeque<Fault>,
    foreign: VecDeque<(Request, Option<Fault>)>,
    sent: Vec<Vec<u8>>,
    sink: Option<Arc<dyn MonitorSink>>,
}

impl BusState {
    /// Report one frame on the wire: raw bytes first, then the decoded event.
    fn emit(&self, is_request: bool, frame: &[u8], address: u16, quantity: u16) {
        let Some(sink) = &self.sink else {
            return;
        };
        let (expected_crc, actual_crc) = split_crc(frame).unwrap_or_default();
        let function_code = frame.get(1).copied().unwrap_or_default();
        sink.on_raw_bytes(frame, true);
        sink.on_frame_event(FrameEvent {
            direction: Direction::from_is_request(is_request),
            slave_id: frame.first().copied().unwrap_or_default(),
            function_code,
            address,
            quantity,
            expected_crc,
            actual_crc,
        });
    }

    /// Run one exchange, applying `fault` to it.
    fn transact(
        &mut self,
        slave: u8,
        op: &Operation,
        fault: Option<Fault>,
    ) -> Result<Reply, TransportError> {
        let function = op.function();
        let address = op.address();
        let quantity = op.quantity();

        let request = op.request_frame(slave);
        tracing::debug!("[MOCK] >> {}", hex_dump(&request));
        self.emit(true, &request, address, quantity);
        self.sent.push(request);

        if fault == Some(Fault::NoResponse) {
            return Err(TransportError::no_response());
        }
        let Some(image) = self.slaves.get_mut(&slave) else {
            tracing::debug!("[MOCK] no slave {slave} on the bus");
            return Err(TransportError::no_response());
        };

        let result = match fault {
            Some(Fault::Exception(code)) => Err(code),
            _ => op.apply(image),
        };
        let mut reply = match result {
            Ok(reply) => reply,
            Err(code) => {
                let response = frame::exception_response(slave, function, code);
                tracing::debug!("[MOCK] << {}", hex_dump(&response));
                self.emit(false, &response, address, quantity);
                return Err(TransportError::slave_exception(code));
            }
        };

        if let Some(Fault::UnitCount(n)) = fault {
            reply.resize(n);
        }
        let mut response = op.response_frame(slave, &reply);
        if fault == Some(Fault::CorruptCrc) {
            if let Some(last) = response.last_mut() {
                *last ^= 0xFF;
            }
        }
        tracing::debug!("[MOCK] << {}", hex_dump(&response));
        self.emit(false, &response, address, quantity);
        Ok(reply)
    }

    fn transact_queued(&mut self, op: &Operation) -> Result<Reply, TransportError> {
        let fault = self.faults.pop_front();
        let slave = self.current_slave;
        self.transact(slave, op, fault)
    }
}

fn lock(state: &Mutex<BusState>) -> MutexGuard<'_, BusState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn invalid(reply: &Reply) -> TransportError {
    TransportError::new(
        TransportErrorKind::InvalidResponse,
        format!("unexpected reply {reply:?}"),
    )
}

/// Cloneable handle into a [`MockBus`]; stays usable after the bus has been
/// boxed and handed to a session.
#[derive(Clone)]
pub struct MockBusHandle {
    state: Arc<Mutex<BusState>>,
}

impl MockBusHandle {
    /// Queue a fault for the next request sent through the bus.
    pub fn push_fault(&self, fault: Fault) {
        lock(&self.state).faults.push_back(fault);
    }

    /// Queue an exchange driven by another master. It is carried out on the
    /// next `poll()`, one exchange per poll.
    pub fn inject_foreign_exchange(&self, request: Request) {
        lock(&self.state).foreign.push_back((request, None));
    }

    /// Like [`inject_foreign_exchange`](Self::inject_foreign_exchange), with
    /// `fault` applied to that exchange only. The fault queue is left alone.
    pub fn inject_foreign_exchange_with_fault(&self, request: Request, fault: Fault) {
        lock(&self.state).foreign.push_back((request, Some(fault)));
    }

    #[must_use]
    pub fn pending_foreign(&self) -> usize {
        lock(&self.state).foreign.len()
    }

    /// Copy of a slave's tables.
    #[must_use]
    pub fn slave(&self, id: u8) -> Option<SlaveImage> {
        lock(&self.state).slaves.get(&id).cloned()
    }

    pub fn set_slave_image(&self, id: u8, image: SlaveImage) {
        lock(&self.state).slaves.insert(id, image);
    }

    /// Request frames sent so far, including foreign ones.
    #[must_use]
    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        lock(&self.state).sent.clone()
    }

    #[must_use]
    pub fn has_monitor(&self) -> bool {
        lock(&self.state).sink.is_some()
    }
}

pub struct MockBus {
    name: String,
    state: Arc<Mutex<BusState>>,
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new("mock-bus")
    }
}

impl MockBus {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(BusState {
                current_slave: 1,
                ..BusState::default()
            })),
        }
    }

    #[must_use]
    pub fn with_slave(self, id: u8, image: SlaveImage) -> Self {
        lock(&self.state).slaves.insert(id, image);
        self
    }

    #[must_use]
    pub fn handle(&self) -> MockBusHandle {
        MockBusHandle {
            state: Arc::clone(&self.state),
        }
    }

    fn run(&self, op: &Operation) -> Result<Reply, TransportError> {
        lock(&self.state).transact_queued(op)
    }

    fn read_bits_as(
        &self,
        function: FunctionCode,
        address: u16,
        count: u16,
    ) -> Result<Vec<bool>, TransportError> {
        match self.run(&Operation::Read { function, address, count })? {
            Reply::Bits(bits) => Ok(bits),
            other => Err(invalid(&other)),
        }
    }

    fn read_words_as(
        &self,
        function: FunctionCode,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        match self.run(&Operation::Read { function, address, count })? {
            Reply::Words(words) => Ok(words),
            other => Err(invalid(&other)),
        }
    }

    fn write(&self, op: &Operation) -> Result<usize, TransportError> {
        match self.run(op)? {
            Reply::Written(n) => Ok(n),
            other => Err(invalid(&other)),
        }
    }
}

impl Transport for MockBus {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_slave(&mut self, slave: u8) -> Result<(), TransportError> {
        lock(&self.state).current_slave = slave;
        Ok(())
    }

    fn read_bits(&mut self, address: u16, count: u16) -> Result<Vec<bool>, TransportError> {
        self.read_bits_as(FunctionCode::ReadCoils, address, count)
    }

    fn read_input_bits(&mut self, address: u16, count: u16) -> Result<Vec<bool>, TransportError> {
        self.read_bits_as(FunctionCode::ReadDiscreteInputs, address, count)
    }

    fn read_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>, TransportError> {
        self.read_words_as(FunctionCode::ReadHoldingRegisters, address, count)
    }

    fn read_input_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        self.read_words_as(FunctionCode::ReadInputRegisters, address, count)
    }

    fn write_bit(&mut self, address: u16, value: bool) -> Result<usize, TransportError> {
        self.write(&Operation::WriteCoil { address, value })
    }

    fn write_register(&mut self, address: u16, value: u16) -> Result<usize, TransportError> {
        self.write(&Operation::WriteRegister { address, value })
    }

    fn write_bits(&mut self, address: u16, values: &[bool]) -> Result<usize, TransportError> {
        self.write(&Operation::WriteCoils {
            address,
            values: values.to_vec(),
        })
    }

    fn write_registers(&mut self, address: u16, values: &[u16]) -> Result<usize, TransportError> {
        self.write(&Operation::WriteRegisters {
            address,
            values: values.to_vec(),
        })
    }

    fn poll(&mut self) -> Result<(), TransportError> {
        let mut state = lock(&self.state);
        let Some((request, fault)) = state.foreign.pop_front() else {
            return Ok(());
        };
        let op = Operation::from_request(&request).ok_or_else(|| {
            TransportError::new(
                TransportErrorKind::Unsupported,
                format!("foreign request with {}", request.function.label()),
            )
        })?;
        // the other master's outcome is only visible through the monitor
        state.transact(request.slave_id, &op, fault).map(|_| ())
    }

    fn attach_monitor(&mut self, sink: Arc<dyn MonitorSink>) {
        lock(&self.state).sink = Some(sink);
    }

    fn detach_monitor(&mut self) {
        lock(&self.state).sink = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modbus_monitor::monitor::SharedBusMonitor;

    fn bus() -> MockBus {
        MockBus::new("test").with_slave(
            1,
            SlaveImage::with_size(16).with_holding_registers(vec![10, 20, 30]),
        )
    }

    #[test]
    fn read_emits_request_and_response() {
        let monitor = SharedBusMonitor::new();
        let mut bus = bus();
        bus.attach_monitor(monitor.sink());
        assert_eq!(bus.read_registers(0, 2), Ok(vec![10, 20]));
        let events = monitor.snapshot();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].direction, Direction::Request);
        assert_eq!(events[1].direction, Direction::Response);
        assert!(events.iter().all(|e| !e.crc_mismatch));
        assert!(monitor.raw_trace().starts_with("01 03 00 00 00 02 "));
    }

    #[test]
    fn faults_are_consumed_in_order() {
        let mut bus = bus();
        let handle = bus.handle();
        handle.push_fault(Fault::NoResponse);
        handle.push_fault(Fault::UnitCount(1));
        assert!(bus.read_registers(0, 2).expect_err("timeout").is_no_response());
        assert_eq!(bus.read_registers(0, 2), Ok(vec![10]));
        assert_eq!(bus.read_registers(0, 2), Ok(vec![10, 20]));
    }

    #[test]
    fn unknown_slave_is_silent() {
        let mut bus = bus();
        bus.set_slave(9).expect("set slave");
        assert!(bus.read_bits(0, 1).expect_err("silent").is_no_response());
    }

    #[test]
    fn out_of_range_read_is_an_exception() {
        let mut bus = bus();
        let err = bus.read_registers(15, 2).expect_err("exception");
        assert_eq!(err.kind, TransportErrorKind::SlaveException(0x02));
    }

    #[test]
    fn poll_drains_one_foreign_exchange() {
        let monitor = SharedBusMonitor::new();
        let mut bus = bus();
        bus.attach_monitor(monitor.sink());
        let handle = bus.handle();
        let req = Request::new()
            .with_function(FunctionCode::WriteSingleRegister)
            .with_start_address(4)
            .with_payload(vec![77]);
        handle.inject_foreign_exchange(req.clone());
        handle.inject_foreign_exchange(req);
        bus.poll().expect("poll");
        assert_eq!(handle.pending_foreign(), 1);
        assert_eq!(monitor.len(), 2);
        assert_eq!(handle.slave(1).expect("slave").holding_registers[4], 77);
        bus.poll().expect("poll");
        bus.poll().expect("idle poll");
        assert_eq!(monitor.len(), 4);
    }

    #[test]
    fn foreign_fault_applies_to_that_exchange_only() {
        let monitor = SharedBusMonitor::new();
        let mut bus = bus();
        bus.attach_monitor(monitor.sink());
        let handle = bus.handle();
        let req = Request::new()
            .with_function(FunctionCode::ReadHoldingRegisters)
            .with_quantity(2);
        handle.inject_foreign_exchange_with_fault(req, Fault::Exception(0x04));

        let err = bus.poll().expect_err("foreign exception");
        assert_eq!(err.kind, TransportErrorKind::SlaveException(0x04));
        let events = monitor.snapshot();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].function_code, 0x83);
        assert!(events[1].is_exception);

        // the caller's own requests are unaffected
        assert_eq!(bus.read_registers(0, 2), Ok(vec![10, 20]));
    }
}
