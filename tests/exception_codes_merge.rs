use std::io::Write;

use modbus_monitor::exception_codes::{
    code_description, code_name, describe_exception, ExceptionRegistry, EMBEDDED_EXCEPTION_CODES,
};
use modbus_monitor::monitor::{BusMonitorLog, Direction, FrameEvent};

#[test]
fn vendor_codes_merge_over_the_embedded_table() {
    modbus_monitor::init_defaults().expect("embedded table");
    assert_eq!(code_name(0x04), Some("SLAVE_DEVICE_FAILURE".into()));

    // a vendor file adds one code and rewords an existing one
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"
[[codes]]
code = "0x0C"
name = "VENDOR_BUSY"
description = "Vendor device busy"

[[codes]]
code = 6
name = "SLAVE_DEVICE_BUSY"
description = "Slave device is busy"
"#
    )
    .expect("write table");

    let reg = ExceptionRegistry::from_path(file.path()).expect("parse vendor table");
    assert_eq!(reg.len(), 2);
    reg.register_or_merge().expect("merge vendor table");

    assert_eq!(code_description(0x0C), Some("Vendor device busy".into()));
    assert_eq!(describe_exception(0x06), "Slave device is busy");
    // untouched entries survive the merge
    assert_eq!(code_name(0x02), Some("ILLEGAL_DATA_ADDRESS".into()));

    // registering a second time on an existing registry is refused
    assert!(reg.register_codes().is_err());

    let mut log = BusMonitorLog::new();
    let ev = log.on_frame_event(FrameEvent {
        direction: Direction::Response,
        slave_id: 1,
        function_code: 0x80 | 0x03,
        address: 0,
        quantity: 0,
        expected_crc: 0,
        actual_crc: 0,
    });
    assert_eq!(ev.exception_code, Some(3));
    assert_eq!(ev.exception_description(), Some("Illegal data value".into()));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = ExceptionRegistry::from_path(&dir.path().join("none.toml")).expect_err("missing");
    assert!(matches!(err, modbus_monitor::MonitorError::Io(_)));
}

#[test]
fn malformed_table_is_rejected() {
    assert!(ExceptionRegistry::validate_str("[[codes]]\ncode = \"zz\"\n").is_err());
    assert!(ExceptionRegistry::validate_str("codes = 5").is_err());
    assert!(ExceptionRegistry::validate_str(EMBEDDED_EXCEPTION_CODES).is_ok());
}
