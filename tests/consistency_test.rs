// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sbc-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Both front-ends share one store: these tests check that what one side
//! writes the other side reads, and that concurrent accesses stay atomic and
//! are logged in the order they were applied.

use std::borrow::Cow;
use std::sync::{Arc, Mutex};
use std::thread;

use rocket::http::{ContentType, Status};
use rocket::{config::LogLevel, local::asynchronous::Client};
use serde_json::Value;
use tokio_modbus::prelude::{Request, Response};

use rust_sbc_bridge::modbus::BridgeModbusService;
use rust_sbc_bridge::registers::{
    AccessEvent, AccessKind, AccessRecorder, InstrumentedAccessor, RegisterStore, RegisterTable,
};
use rust_sbc_bridge::web::build_rocket;

/// Recorder keeping every event in memory
#[derive(Default)]
struct MemoryRecorder {
    events: Mutex<Vec<AccessEvent>>,
}

impl AccessRecorder for MemoryRecorder {
    fn record(&self, event: &AccessEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

fn shared_accessor(data_points: usize) -> (Arc<InstrumentedAccessor>, Arc<MemoryRecorder>) {
    let recorder = Arc::new(MemoryRecorder::default());
    let store = Arc::new(RegisterStore::new(data_points, 1).unwrap());
    let accessor = Arc::new(InstrumentedAccessor::new(store, recorder.clone()));
    (accessor, recorder)
}

async fn web_client(accessor: Arc<InstrumentedAccessor>) -> Client {
    let figment = rocket::Config::figment().merge(("log_level", LogLevel::Off));
    Client::tracked(build_rocket(figment, accessor))
        .await
        .expect("valid rocket instance")
}

#[rocket::async_test]
async fn test_web_write_is_read_by_modbus() {
    let (accessor, recorder) = shared_accessor(8);
    let client = web_client(accessor.clone()).await;
    let service = BridgeModbusService::new(accessor);

    let response = client
        .post("/api/write")
        .header(ContentType::JSON)
        .body(r#"{"table": "coils", "address": 1, "values": [1, 1]}"#)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    assert_eq!(
        service.handle(Request::ReadCoils(0, 4)),
        Ok(Response::ReadCoils(vec![false, true, true, false]))
    );

    let events = recorder.events.lock().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], AccessEvent::write(RegisterTable::Coils, 1, &[1, 1]));
    assert_eq!(events[1], AccessEvent::read(RegisterTable::Coils, 0, 4));
}

#[rocket::async_test]
async fn test_modbus_write_is_seen_by_web() {
    let (accessor, recorder) = shared_accessor(4);
    let client = web_client(accessor.clone()).await;
    let service = BridgeModbusService::new(accessor);

    service
        .handle(Request::WriteMultipleRegisters(1, Cow::Owned(vec![7, 9])))
        .unwrap();

    let response = client.get("/api/state").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let state: Value = response.into_json().await.unwrap();
    assert_eq!(state["tables"]["holding_registers"], serde_json::json!([0, 7, 9, 0]));

    // Snapshots are not master accesses
    assert_eq!(recorder.events.lock().unwrap().len(), 1);
}

#[test]
fn test_snapshots_never_see_partial_writes() {
    const DATA_POINTS: usize = 64;
    let (accessor, _) = shared_accessor(DATA_POINTS);

    let writer = {
        let accessor = accessor.clone();
        thread::spawn(move || {
            for value in 1..=500u16 {
                accessor
                    .write(RegisterTable::HoldingRegisters, 0, &[value; DATA_POINTS])
                    .unwrap();
            }
        })
    };

    for _ in 0..500 {
        let snapshot = accessor.snapshot();
        let registers = &snapshot.tables.holding_registers;
        assert!(
            registers.iter().all(|&v| v == registers[0]),
            "torn write observed: {registers:?}"
        );
    }
    writer.join().unwrap();

    assert_eq!(accessor.snapshot().tables.holding_registers, vec![500; DATA_POINTS]);
}

#[test]
fn test_access_log_order_matches_store_order() {
    let (accessor, recorder) = shared_accessor(4);

    let writers: Vec<_> = (0..4u16)
        .map(|id| {
            let accessor = accessor.clone();
            thread::spawn(move || {
                for i in 0..100u16 {
                    accessor
                        .write(RegisterTable::HoldingRegisters, 0, &[id * 1000 + i])
                        .unwrap();
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    let events = recorder.events.lock().unwrap();
    assert_eq!(events.len(), 400);
    let last_logged = match &events.last().unwrap().kind {
        AccessKind::Write { values } => values[0],
        other => panic!("unexpected event {other:?}"),
    };
    // Release the recorder lock: the read below records an event itself
    drop(events);
    let stored = accessor.read(RegisterTable::HoldingRegisters, 0, 1).unwrap()[0];
    assert_eq!(stored, last_logged);
}

#[test]
fn test_failed_writes_are_not_logged() {
    let (accessor, recorder) = shared_accessor(4);
    let service = BridgeModbusService::new(accessor.clone());

    assert!(service
        .handle(Request::WriteMultipleRegisters(3, Cow::Owned(vec![1, 2])))
        .is_err());
    assert!(accessor.write(RegisterTable::Coils, 0, &[3]).is_err());
    assert!(recorder.events.lock().unwrap().is_empty());
}
