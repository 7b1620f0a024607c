use std::path::Path;

use modbus_monitor::error::{ExecError, MonitorError};
use modbus_monitor::session::Session;
use modbus_monitor_mock::Scenario;

#[test]
fn demo_scenario_runs_through_a_session() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios/demo.toml");
    let scenario = Scenario::from_path(&path).expect("demo scenario");
    assert_eq!(scenario.slaves.len(), 2);

    let bus = scenario.build_bus();
    let handle = bus.handle();
    let mut session = Session::new();
    session.activate(Box::new(bus));

    let mut outcomes = Vec::new();
    for step in &scenario.steps {
        let req = step.to_request().expect("step request");
        if step.foreign {
            match step.fault {
                Some(fault) => handle.inject_foreign_exchange_with_fault(req, fault),
                None => handle.inject_foreign_exchange(req),
            }
            session.poll();
            continue;
        }
        if let Some(fault) = step.fault {
            handle.push_fault(fault);
        }
        session.options.hex_display = step.hex;
        outcomes.push(session.send(&req));
    }

    let rows = outcomes[0].as_ref().expect("holding read").rows().to_vec();
    assert_eq!(rows[0].display_value, "0x3c00");
    assert_eq!(rows[2].float_value, Some(-2.0));

    let coils: Vec<u16> = outcomes[1]
        .as_ref()
        .expect("coil read")
        .rows()
        .iter()
        .map(|r| r.raw_value)
        .collect();
    assert_eq!(coils, [1, 1, 0, 0, 1, 1]);

    assert!(outcomes[2].as_ref().expect("write").is_write());
    assert_eq!(
        handle.slave(1).expect("slave 1").holding_registers[4..6],
        [0x10, 0o12]
    );

    assert_eq!(outcomes[3].as_ref().expect("slave 17").rows()[0].raw_value, 17216);

    assert!(matches!(
        outcomes[4],
        Err(MonitorError::Exec(ExecError::CountMismatch { expected: 3, actual: 2 }))
    ));
    assert!(matches!(outcomes[5], Err(MonitorError::Exec(ExecError::IoTimeout))));
    assert!(outcomes[6].is_ok());

    let events = session.monitor().snapshot();
    assert!(events.iter().any(|e| e.crc_mismatch));
    assert_eq!(events.last().map(|e| e.slave_id), Some(17));
    assert_eq!(handle.slave(17).expect("slave 17").holding_registers[0], 1);
}

#[test]
fn foreign_step_carries_its_fault() {
    let scenario = Scenario::from_str(
        r#"
[[slave]]
id = 1
holding_registers = [5, 6]

[[step]]
function = 3
quantity = 2
fault = { exception = 2 }
foreign = true

[[step]]
function = 3
quantity = 2
"#,
    )
    .expect("scenario");

    let bus = scenario.build_bus();
    let handle = bus.handle();
    let mut session = Session::new();
    session.activate(Box::new(bus));

    let foreign = &scenario.steps[0];
    let fault = foreign.fault.expect("fault on foreign step");
    handle.inject_foreign_exchange_with_fault(foreign.to_request().expect("request"), fault);
    session.poll();

    let events = session.monitor().snapshot();
    assert_eq!(events.len(), 2);
    assert!(events[1].is_exception);
    assert_eq!(events[1].function_code, 0x83);

    let own = scenario.steps[1].to_request().expect("request");
    let out = session.send(&own).expect("own request unaffected");
    assert_eq!(out.rows().len(), 2);
}
