use modbus_monitor::error::ExecError;
use modbus_monitor::executor::{execute, ExecOptions, ExecOutcome};
use modbus_monitor::function_code::FunctionCode;
use modbus_monitor::request::Request;
use modbus_monitor_mock::{Fault, MockBus, SlaveImage};

fn bus() -> MockBus {
    let mut holding = vec![0u16; 32];
    holding[..4].copy_from_slice(&[0x3C00, 0x000A, 0xC000, 0x7BFF]);
    let mut coils = vec![false; 32];
    coils[..4].copy_from_slice(&[true, false, true, true]);
    MockBus::new("exec").with_slave(
        1,
        SlaveImage::with_size(32)
            .with_holding_registers(holding)
            .with_input_registers(vec![513, 1, 2])
            .with_coils(coils),
    )
}

fn read_holding(quantity: u16) -> Request {
    Request::new()
        .with_function(FunctionCode::ReadHoldingRegisters)
        .with_quantity(quantity)
}

#[test]
fn holding_registers_decode_to_rows() {
    let mut bus = bus();
    let out = execute(&mut bus, &read_holding(4), ExecOptions { hex_display: true })
        .expect("read holding registers");
    let rows = out.rows();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0].display_value, "0x3c00");
    assert_eq!(rows[0].float_value, Some(1.0));
    assert_eq!(rows[2].float_value, Some(-2.0));
    assert_eq!(rows[3].float_value, Some(65504.0));
    assert_eq!(rows[3].address, 3);
    assert_eq!(rows[0].data_type_label, "Holding Register (16 bit)");
}

#[test]
fn coils_ignore_hex_display() {
    let mut bus = bus();
    let req = Request::new().with_start_address(1).with_quantity(3);
    let out = execute(&mut bus, &req, ExecOptions { hex_display: true }).expect("read coils");
    let values: Vec<&str> = out.rows().iter().map(|r| r.display_value.as_str()).collect();
    assert_eq!(values, ["0", "1", "1"]);
    assert!(out.rows().iter().all(|r| r.float_value.is_none()));
    assert_eq!(out.rows()[0].address, 1);
}

#[test]
fn fewer_units_than_requested_is_a_mismatch() {
    let mut bus = bus();
    bus.handle().push_fault(Fault::UnitCount(1));
    let err = execute(&mut bus, &read_holding(3), ExecOptions::default()).expect_err("mismatch");
    assert_eq!(err, ExecError::CountMismatch { expected: 3, actual: 1 });
    assert_eq!(err.title(), "Protocol error");
    assert!(err.to_string().starts_with("Number of registers returned does not match"));
}

#[test]
fn more_units_than_requested_is_a_mismatch() {
    let mut bus = bus();
    bus.handle().push_fault(Fault::UnitCount(5));
    let err = execute(&mut bus, &read_holding(3), ExecOptions::default()).expect_err("mismatch");
    assert_eq!(err, ExecError::CountMismatch { expected: 3, actual: 5 });
}

#[test]
fn silent_slave_is_an_io_timeout() {
    let mut bus = bus();
    bus.handle().push_fault(Fault::NoResponse);
    let err = execute(&mut bus, &read_holding(1), ExecOptions::default()).expect_err("timeout");
    assert_eq!(err, ExecError::IoTimeout);
    assert_eq!(err.title(), "I/O error");
    assert_eq!(
        err.to_string(),
        "I/O error: did not receive any data from slave."
    );
}

#[test]
fn exception_response_is_a_protocol_error() {
    modbus_monitor::init_defaults().expect("exception table");
    let mut bus = bus();
    let req = read_holding(2).with_start_address(31);
    let err = execute(&mut bus, &req, ExecOptions::default()).expect_err("exception");
    assert_eq!(
        err,
        ExecError::ProtocolException("Illegal data address".into())
    );
    assert_eq!(
        err.to_string(),
        "Slave threw exception \"Illegal data address\" or function not implemented."
    );
}

#[test]
fn gateway_exception_is_a_protocol_error() {
    modbus_monitor::init_defaults().expect("exception table");
    let mut bus = bus();
    bus.handle().push_fault(Fault::Exception(0x0B));
    let err = execute(&mut bus, &read_holding(1), ExecOptions::default()).expect_err("gateway");
    assert_eq!(
        err,
        ExecError::ProtocolException("Target device failed to respond".into())
    );
}

#[test]
fn unknown_function_is_a_protocol_error() {
    let mut bus = bus();
    let req = Request::new().with_function(FunctionCode::Unknown(0x2B));
    let err = execute(&mut bus, &req, ExecOptions::default()).expect_err("unsupported");
    assert!(matches!(err, ExecError::ProtocolException(_)));
}

#[test]
fn single_write_counts_as_one_unit_whatever_the_quantity() {
    let mut bus = bus();
    let handle = bus.handle();
    let req = Request::new()
        .with_function(FunctionCode::WriteSingleRegister)
        .with_start_address(5)
        .with_quantity(7)
        .with_payload(vec![0x1234]);
    let out = execute(&mut bus, &req, ExecOptions::default()).expect("single write");
    assert_eq!(
        out,
        ExecOutcome::WriteAcknowledged {
            function: FunctionCode::WriteSingleRegister,
            count: 1
        }
    );
    assert_eq!(out.status_text(), "Values successfully sent");
    assert!(out.rows().is_empty());
    assert_eq!(handle.slave(1).expect("slave").holding_registers[5], 0x1234);
    // the request frame carries the value, not the quantity
    let sent = handle.sent_frames();
    assert_eq!(&sent[0][..6], &[0x01, 0x06, 0x00, 0x05, 0x12, 0x34]);
}

#[test]
fn single_coil_write_coerces_non_zero() {
    let mut bus = bus();
    let handle = bus.handle();
    let req = Request::new()
        .with_function(FunctionCode::WriteSingleCoil)
        .with_start_address(9)
        .with_payload(vec![42]);
    execute(&mut bus, &req, ExecOptions::default()).expect("coil write");
    assert!(handle.slave(1).expect("slave").coils[9]);
}

#[test]
fn multiple_writes_use_every_row() {
    let mut bus = bus();
    let handle = bus.handle();
    let req = Request::new()
        .with_function(FunctionCode::WriteMultipleRegisters)
        .with_start_address(10)
        .with_quantity(3)
        .try_with_cells(&["0x10", "010", "-1"])
        .expect("cells");
    let out = execute(&mut bus, &req, ExecOptions::default()).expect("write registers");
    assert!(out.is_write());
    assert_eq!(
        handle.slave(1).expect("slave").holding_registers[10..13],
        [0x10, 8, 0xFFFF]
    );

    let req = Request::new()
        .with_function(FunctionCode::WriteMultipleCoils)
        .with_start_address(20)
        .with_quantity(3)
        .with_payload(vec![1, 0, 5]);
    execute(&mut bus, &req, ExecOptions::default()).expect("write coils");
    assert_eq!(
        handle.slave(1).expect("slave").coils[20..23],
        [true, false, true]
    );
}

#[test]
fn write_acknowledged_for_fewer_units_is_a_mismatch() {
    let mut bus = bus();
    bus.handle().push_fault(Fault::UnitCount(0));
    let req = Request::new()
        .with_function(FunctionCode::WriteSingleCoil)
        .with_payload(vec![1]);
    let err = execute(&mut bus, &req, ExecOptions::default()).expect_err("mismatch");
    assert_eq!(err, ExecError::CountMismatch { expected: 1, actual: 0 });
}
