//! TOML scenarios for the simulated bus.
//!
//! ```toml
//! [[slave]]
//! id = 1
//! holding_registers = [15360, 10, 0]
//!
//! [[step]]
//! slave = 1
//! function = 3                       # or "Read Holding Registers (0x03)"
//! address = 0
//! quantity = 2
//! hex = true
//!
//! [[step]]
//! function = "0x10"
//! quantity = 2
//! values = ["0x10", 12]
//! fault = { unit_count = 1 }
//!
//! [[step]]
//! function = 6
//! values = [5]
//! foreign = true                     # driven by another master, seen only by the monitor
//! ```

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use modbus_monitor::function_code::{classify, parse_selector_label, FunctionCode};
use modbus_monitor::request::{parse_cell_value, Request};

use crate::bus::{Fault, MockBus};
use crate::image::SlaveImage;

#[derive(Debug, Deserialize)]
pub struct SlaveSpec {
    pub id: u8,
    #[serde(default)]
    pub coils: Vec<bool>,
    #[serde(default)]
    pub discrete_inputs: Vec<bool>,
    #[serde(default)]
    pub holding_registers: Vec<u16>,
    #[serde(default)]
    pub input_registers: Vec<u16>,
}

impl SlaveSpec {
    #[must_use]
    pub fn image(&self) -> SlaveImage {
        SlaveImage {
            coils: self.coils.clone(),
            discrete_inputs: self.discrete_inputs.clone(),
            holding_registers: self.holding_registers.clone(),
            input_registers: self.input_registers.clone(),
        }
    }
}

/// Function code as a number or as a selector label.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum FunctionSpec {
    Code(u8),
    Text(String),
}

impl FunctionSpec {
    pub fn resolve(&self) -> Result<FunctionCode> {
        match self {
            Self::Code(c) => Ok(classify(*c)),
            Self::Text(s) => {
                let t = s.trim();
                if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
                    return u8::from_str_radix(hex, 16)
                        .map(classify)
                        .with_context(|| format!("function code {s:?}"));
                }
                parse_selector_label(t).ok_or_else(|| anyhow!("unrecognised function {s:?}"))
            }
        }
    }
}

/// A table cell: a number, or text parsed with automatic radix.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum CellSpec {
    Int(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
pub struct Step {
    #[serde(default = "default_slave")]
    pub slave: u8,
    pub function: FunctionSpec,
    #[serde(default)]
    pub address: u16,
    #[serde(default = "default_quantity")]
    pub quantity: u16,
    #[serde(default)]
    pub values: Vec<CellSpec>,
    #[serde(default)]
    pub hex: bool,
    pub fault: Option<Fault>,
    #[serde(default)]
    pub foreign: bool,
}

const fn default_slave() -> u8 {
    1
}

const fn default_quantity() -> u16 {
    1
}

impl Step {
    pub fn to_request(&self) -> Result<Request> {
        let mut payload = Vec::with_capacity(self.values.len());
        for cell in &self.values {
            payload.push(match cell {
                CellSpec::Int(v) => *v,
                CellSpec::Text(s) => parse_cell_value(s)?,
            });
        }
        Ok(Request::new()
            .with_slave(self.slave)
            .with_function(self.function.resolve()?)
            .with_start_address(self.address)
            .with_quantity(self.quantity)
            .with_payload(payload))
    }
}

#[derive(Debug, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "slave")]
    pub slaves: Vec<SlaveSpec>,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

impl Scenario {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parse scenario")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        Self::from_str(&s)
    }

    /// A bus carrying every slave of the scenario.
    #[must_use]
    pub fn build_bus(&self) -> MockBus {
        let name = self.name.clone().unwrap_or_else(|| "scenario".to_string());
        self.slaves
            .iter()
            .fold(MockBus::new(name), |bus, s| bus.with_slave(s.id, s.image()))
    }
}
