//! modbus_monitor_mock
//!
//! A simulated Modbus RTU bus for exercising `modbus_monitor` without
//! hardware. [`MockBus`] implements the `Transport` trait over in-memory
//! slave images, builds the real frames for every exchange and reports them
//! to the attached monitor. Faults and traffic from other masters are queued
//! through a [`MockBusHandle`].

pub mod bus;
pub mod frame;
pub mod image;
pub mod scenario;

pub use bus::{Fault, MockBus, MockBusHandle};
pub use image::SlaveImage;
pub use scenario::Scenario;
