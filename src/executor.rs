//! Request execution: dispatch by function code, count validation and
//! decoding of the returned units.

use crate::config::config as global_config;
use crate::error::ExecError;
use crate::function_code::FunctionCode;
use crate::request::Request;
use crate::response::{DecodedRegister, Response};
use crate::transport::{hex_dump, Transport, TransportError, TransportErrorKind};

/// Presentation options that change how read results are rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecOptions {
    /// Show register values as `0x%04x`. Ignored for bit reads.
    pub hex_display: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExecOutcome {
    /// A read completed; one row per returned unit.
    Read(Vec<DecodedRegister>),
    /// A write was acknowledged for `count` units.
    WriteAcknowledged { function: FunctionCode, count: usize },
}

impl ExecOutcome {
    #[must_use]
    pub fn rows(&self) -> &[DecodedRegister] {
        match self {
            Self::Read(rows) => rows,
            Self::WriteAcknowledged { .. } => &[],
        }
    }

    #[must_use]
    pub const fn is_write(&self) -> bool {
        matches!(self, Self::WriteAcknowledged { .. })
    }

    /// Status line for the caller.
    #[must_use]
    pub fn status_text(&self) -> String {
        match self {
            Self::Read(rows) => format!("{} values read", rows.len()),
            Self::WriteAcknowledged { .. } => "Values successfully sent".to_string(),
        }
    }
}

impl From<TransportError> for ExecError {
    fn from(e: TransportError) -> Self {
        match e.kind {
            TransportErrorKind::NoResponse => Self::IoTimeout,
            _ => Self::ProtocolException(e.description),
        }
    }
}

enum Returned {
    Units(Response),
    Written(usize),
}

/// Run `request` on `transport` once. Never retries.
///
/// The returned count must equal [`Request::effective_quantity`]; anything
/// else, larger or smaller, is a [`ExecError::CountMismatch`].
pub fn execute(
    transport: &mut dyn Transport,
    request: &Request,
    options: ExecOptions,
) -> Result<ExecOutcome, ExecError> {
    let function = request.function;
    let addr = request.start_address;
    let expected = usize::from(request.effective_quantity());

    log::debug!(
        "[{}] {} slave={} addr={} qty={}",
        transport.name(),
        function.name(),
        request.slave_id,
        addr,
        expected
    );

    let result = dispatch(transport, request).map_err(|e| {
        if e.is_gateway_error() {
            log::warn!(
                "[{}] gateway could not reach slave {}: {}",
                transport.name(),
                request.slave_id,
                e
            );
        }
        if global_config().dump_on_error {
            log::error!(
                "[{}] request {} failed: {}",
                transport.name(),
                hex_dump(&request.preview()),
                e
            );
        }
        ExecError::from(e)
    })?;

    let actual = match &result {
        Returned::Units(resp) => resp.matched_count(),
        Returned::Written(n) => *n,
    };
    if actual != expected {
        log::warn!(
            "[{}] {}: requested {} units, transport returned {}",
            transport.name(),
            function.name(),
            expected,
            actual
        );
        return Err(ExecError::CountMismatch { expected, actual });
    }

    Ok(match result {
        Returned::Units(resp) => {
            ExecOutcome::Read(resp.decode(function, addr, options.hex_display))
        }
        Returned::Written(count) => ExecOutcome::WriteAcknowledged { function, count },
    })
}

fn dispatch(transport: &mut dyn Transport, request: &Request) -> Result<Returned, TransportError> {
    let addr = request.start_address;
    let num = request.quantity;

    transport.set_slave(request.slave_id)?;

    match request.function {
        FunctionCode::ReadCoils => {
            let bits = transport.read_bits(addr, num)?;
            Ok(Returned::Units(Response::from_bits(&bits)))
        }
        FunctionCode::ReadDiscreteInputs => {
            let bits = transport.read_input_bits(addr, num)?;
            Ok(Returned::Units(Response::from_bits(&bits)))
        }
        FunctionCode::ReadHoldingRegisters => {
            let words = transport.read_registers(addr, num)?;
            Ok(Returned::Units(Response::from_words(words)))
        }
        FunctionCode::ReadInputRegisters => {
            let words = transport.read_input_registers(addr, num)?;
            Ok(Returned::Units(Response::from_words(words)))
        }
        FunctionCode::WriteSingleCoil => {
            let n = transport.write_bit(addr, request.value_at(0) != 0)?;
            Ok(Returned::Written(n))
        }
        FunctionCode::WriteSingleRegister => {
            // raw 16-bit value; wider inputs are truncated like the wire field
            let n = transport.write_register(addr, request.value_at(0) as u16)?;
            Ok(Returned::Written(n))
        }
        FunctionCode::WriteMultipleCoils => {
            let data: Vec<bool> = (0..usize::from(num)).map(|i| request.value_at(i) != 0).collect();
            let n = transport.write_bits(addr, &data)?;
            Ok(Returned::Written(n))
        }
        FunctionCode::WriteMultipleRegisters => {
            let data: Vec<u16> = (0..usize::from(num))
                .map(|i| request.value_at(i) as u16)
                .collect();
            let n = transport.write_registers(addr, &data)?;
            Ok(Returned::Written(n))
        }
        FunctionCode::Unknown(code) => Err(TransportError::new(
            TransportErrorKind::Unsupported,
            format!("function code 0x{code:02x} not supported"),
        )),
    }
}
