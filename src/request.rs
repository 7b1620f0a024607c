use crate::error::MonitorError;
use crate::function_code::FunctionCode;

/// A request as entered by the user. Transient: owned by the call that sends it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub slave_id: u8,
    pub function: FunctionCode,
    pub start_address: u16,
    pub quantity: u16,
    /// User values for write requests, one per table row.
    pub payload: Vec<i64>,
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}

impl Request {
    /// Builder for requests.
    ///
    /// ```
    /// use modbus_monitor::function_code::FunctionCode;
    /// use modbus_monitor::request::Request;
    /// let req = Request::new()
    ///     .with_slave(1)
    ///     .with_function(FunctionCode::ReadHoldingRegisters)
    ///     .with_quantity(2);
    /// assert_eq!(req.preview(), vec![0x01, 0x03, 0x00, 0x00, 0x00, 0x02]);
    /// ```
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slave_id: 1,
            function: FunctionCode::ReadCoils,
            start_address: 0,
            quantity: 1,
            payload: Vec::new(),
        }
    }
    #[must_use]
    pub const fn with_slave(mut self, slave_id: u8) -> Self {
        self.slave_id = slave_id;
        self
    }
    #[must_use]
    pub const fn with_function(mut self, function: FunctionCode) -> Self {
        self.function = function;
        self
    }
    #[must_use]
    pub const fn with_start_address(mut self, start_address: u16) -> Self {
        self.start_address = start_address;
        self
    }
    #[must_use]
    pub const fn with_quantity(mut self, quantity: u16) -> Self {
        self.quantity = quantity;
        self
    }
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<Vec<i64>>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Fill the payload from table cells, parsing each with [`parse_cell_value`].
    pub fn try_with_cells<S: AsRef<str>>(mut self, cells: &[S]) -> Result<Self, MonitorError> {
        self.payload = cells
            .iter()
            .map(|c| parse_cell_value(c.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self)
    }

    /// Units the transport is expected to confirm. Single writes always count
    /// as one unit whatever `quantity` holds: the single-write frame has no
    /// quantity field, so the comparison against the returned count must use 1.
    #[must_use]
    pub const fn effective_quantity(&self) -> u16 {
        if self.function.is_write_single() {
            1
        } else {
            self.quantity
        }
    }

    /// Value of table row `row`; rows the caller never filled read as 0.
    #[must_use]
    pub fn value_at(&self, row: usize) -> i64 {
        self.payload.get(row).copied().unwrap_or(0)
    }

    /// Check the payload invariants before the request reaches a transport.
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.function.is_write_multiple() && self.payload.len() != usize::from(self.quantity)
        {
            return Err(MonitorError::InvalidRequest(format!(
                "{} needs {} values, got {}",
                self.function.name(),
                self.quantity,
                self.payload.len()
            )));
        }
        if self.function.is_write_single() && self.payload.len() > 1 {
            return Err(MonitorError::InvalidRequest(format!(
                "{} takes a single value, got {}",
                self.function.name(),
                self.payload.len()
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn preview(&self) -> Vec<u8> {
        preview(self.slave_id, self.function, self.start_address, self.quantity)
    }

    #[must_use]
    pub fn preview_text(&self) -> String {
        format_preview(&self.preview())
    }
}

/// Header bytes of the outgoing frame, without payload or checksum.
///
/// Single writes carry `slave, fc, addr_hi, addr_lo`; every other code adds
/// `qty_hi, qty_lo`.
#[must_use]
pub fn preview(slave: u8, function: FunctionCode, address: u16, quantity: u16) -> Vec<u8> {
    let mut header = Vec::with_capacity(6);
    header.push(slave);
    header.push(function.value());
    header.extend_from_slice(&address.to_be_bytes());
    if !function.is_write_single() {
        header.extend_from_slice(&quantity.to_be_bytes());
    }
    header
}

/// Render preview bytes grouped as `slave  fc  addr  qty`, e.g. `01  03  00 00  00 02`.
#[must_use]
pub fn format_preview(bytes: &[u8]) -> String {
    let mut groups: Vec<String> = Vec::with_capacity(4);
    if let Some(b) = bytes.first() {
        groups.push(format!("{b:02x}"));
    }
    if let Some(b) = bytes.get(1) {
        groups.push(format!("{b:02x}"));
    }
    for pair in bytes.get(2..).unwrap_or_default().chunks(2) {
        groups.push(
            pair.iter()
                .map(|b| format!("{b:02x}"))
                .collect::<Vec<_>>()
                .join(" "),
        );
    }
    groups.join("  ")
}

/// Parse a table cell with automatic radix: `0x`/`0X` hex, a leading `0`
/// octal, otherwise decimal. One optional sign may lead the cell; the digits
/// after it and after any prefix must all belong to the radix.
pub fn parse_cell_value(cell: &str) -> Result<i64, MonitorError> {
    let invalid = |why: String| MonitorError::InvalidValue(format!("{cell:?}: {why}"));
    let s = cell.trim();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let (radix, body) = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        (16, hex)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };
    if body.is_empty() || !body.chars().all(|c| c.is_digit(radix)) {
        return Err(invalid(format!("not a base-{radix} number")));
    }
    let value = i64::from_str_radix(body, radix).map_err(|e| invalid(e.to_string()))?;
    Ok(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_sign_only_leads_the_cell() {
        assert_eq!(parse_cell_value("-0x10").ok(), Some(-16));
        assert_eq!(parse_cell_value("+017").ok(), Some(15));
        for cell in ["0x-5", "0x+5", "--5", "+-5", "-+5", "0-5", "-", "+", "0x", "- 5"] {
            assert!(parse_cell_value(cell).is_err(), "{cell:?} should be rejected");
        }
    }

    #[test]
    fn preview_single_write_has_no_quantity() {
        let p = preview(1, FunctionCode::WriteSingleRegister, 0x0010, 7);
        assert_eq!(p, vec![0x01, 0x06, 0x00, 0x10]);
        let p = preview(0x11, FunctionCode::WriteSingleCoil, 0xABCD, 0);
        assert_eq!(p, vec![0x11, 0x05, 0xAB, 0xCD]);
    }

    #[test]
    fn preview_read_and_multiple_write() {
        let p = preview(1, FunctionCode::ReadHoldingRegisters, 0x0000, 0x0002);
        assert_eq!(p, vec![0x01, 0x03, 0x00, 0x00, 0x00, 0x02]);
        let p = preview(2, FunctionCode::WriteMultipleCoils, 0x0102, 0x0304);
        assert_eq!(p, vec![0x02, 0x0F, 0x01, 0x02, 0x03, 0x04]);
        let p = preview(3, FunctionCode::Unknown(0x2B), 0, 1);
        assert_eq!(p.len(), 6);
    }

    #[test]
    fn preview_text_groups() {
        assert_eq!(
            format_preview(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x02]),
            "01  03  00 00  00 02"
        );
        assert_eq!(format_preview(&[0x01, 0x06, 0x00, 0x10]), "01  06  00 10");
        assert_eq!(format_preview(&[]), "");
    }

    #[test]
    fn effective_quantity_forced_for_single_writes() {
        let req = Request::new()
            .with_function(FunctionCode::WriteSingleCoil)
            .with_quantity(40);
        assert_eq!(req.effective_quantity(), 1);
        let req = req.with_function(FunctionCode::WriteMultipleCoils);
        assert_eq!(req.effective_quantity(), 40);
    }

    #[test]
    fn cell_values_auto_radix() {
        assert_eq!(parse_cell_value("42").unwrap(), 42);
        assert_eq!(parse_cell_value(" 0x1F ").unwrap(), 31);
        assert_eq!(parse_cell_value("0X10").unwrap(), 16);
        assert_eq!(parse_cell_value("017").unwrap(), 15);
        assert_eq!(parse_cell_value("0").unwrap(), 0);
        assert_eq!(parse_cell_value("-5").unwrap(), -5);
        assert!(parse_cell_value("abc").is_err());
        assert!(parse_cell_value("").is_err());
        assert!(parse_cell_value("09").is_err());
    }

    #[test]
    fn validate_payload_length() {
        let req = Request::new()
            .with_function(FunctionCode::WriteMultipleRegisters)
            .with_quantity(3)
            .with_payload(vec![1, 2]);
        assert!(req.validate().is_err());
        assert!(req.with_payload(vec![1, 2, 3]).validate().is_ok());
        let single = Request::new()
            .with_function(FunctionCode::WriteSingleRegister)
            .with_payload(vec![1, 2]);
        assert!(single.validate().is_err());
    }
}
