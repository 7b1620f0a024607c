/// Exception code for an address range outside the image.
pub const ILLEGAL_DATA_ADDRESS: u8 = 0x02;
/// Exception code for a quantity outside the protocol limits.
pub const ILLEGAL_DATA_VALUE: u8 = 0x03;

const MAX_READ_BITS: u16 = 2000;
const MAX_READ_WORDS: u16 = 125;
const MAX_WRITE_BITS: usize = 1968;
const MAX_WRITE_WORDS: usize = 123;

/// Data tables of one simulated slave. Each table starts at address 0 and
/// ends at its length; anything outside raises an illegal-address exception.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlaveImage {
    pub coils: Vec<bool>,
    pub discrete_inputs: Vec<bool>,
    pub holding_registers: Vec<u16>,
    pub input_registers: Vec<u16>,
}

fn range(len: usize, address: u16, count: usize) -> Result<std::ops::Range<usize>, u8> {
    let start = usize::from(address);
    let end = start + count;
    if end > len {
        return Err(ILLEGAL_DATA_ADDRESS);
    }
    Ok(start..end)
}

impl SlaveImage {
    /// An image with `size` zeroed entries in every table.
    #[must_use]
    pub fn with_size(size: usize) -> Self {
        Self {
            coils: vec![false; size],
            discrete_inputs: vec![false; size],
            holding_registers: vec![0; size],
            input_registers: vec![0; size],
        }
    }

    #[must_use]
    pub fn with_holding_registers(mut self, values: Vec<u16>) -> Self {
        self.holding_registers = values;
        self
    }

    #[must_use]
    pub fn with_input_registers(mut self, values: Vec<u16>) -> Self {
        self.input_registers = values;
        self
    }

    #[must_use]
    pub fn with_coils(mut self, values: Vec<bool>) -> Self {
        self.coils = values;
        self
    }

    #[must_use]
    pub fn with_discrete_inputs(mut self, values: Vec<bool>) -> Self {
        self.discrete_inputs = values;
        self
    }

    pub fn read_coils(&self, address: u16, count: u16) -> Result<Vec<bool>, u8> {
        read_bits(&self.coils, address, count)
    }

    pub fn read_discrete_inputs(&self, address: u16, count: u16) -> Result<Vec<bool>, u8> {
        read_bits(&self.discrete_inputs, address, count)
    }

    pub fn read_holding_registers(&self, address: u16, count: u16) -> Result<Vec<u16>, u8> {
        read_words(&self.holding_registers, address, count)
    }

    pub fn read_input_registers(&self, address: u16, count: u16) -> Result<Vec<u16>, u8> {
        read_words(&self.input_registers, address, count)
    }

    pub fn write_coils(&mut self, address: u16, values: &[bool]) -> Result<usize, u8> {
        if values.is_empty() || values.len() > MAX_WRITE_BITS {
            return Err(ILLEGAL_DATA_VALUE);
        }
        let r = range(self.coils.len(), address, values.len())?;
        self.coils[r].copy_from_slice(values);
        Ok(values.len())
    }

    pub fn write_registers(&mut self, address: u16, values: &[u16]) -> Result<usize, u8> {
        if values.is_empty() || values.len() > MAX_WRITE_WORDS {
            return Err(ILLEGAL_DATA_VALUE);
        }
        let r = range(self.holding_registers.len(), address, values.len())?;
        self.holding_registers[r].copy_from_slice(values);
        Ok(values.len())
    }
}

fn read_bits(table: &[bool], address: u16, count: u16) -> Result<Vec<bool>, u8> {
    if count == 0 || count > MAX_READ_BITS {
        return Err(ILLEGAL_DATA_VALUE);
    }
    let r = range(table.len(), address, usize::from(count))?;
    Ok(table[r].to_vec())
}

fn read_words(table: &[u16], address: u16, count: u16) -> Result<Vec<u16>, u8> {
    if count == 0 || count > MAX_READ_WORDS {
        return Err(ILLEGAL_DATA_VALUE);
    }
    let r = range(table.len(), address, usize::from(count))?;
    Ok(table[r].to_vec())
}
