//! Distribution side end-to-end: store → distributor → telemetry sink.

use embassy_sync::signal::Signal;

use crate::mock_hw::{MockHardware, RecordingSink, RecordingTelemetry};

use soilwatch::app::channels::UpdateSignal;
use soilwatch::app::context::SystemContext;
use soilwatch::app::service::ControlService;
use soilwatch::config::SystemConfig;
use soilwatch::tasks::distribution::DistributionTask;
use soilwatch::telemetry::ConsoleView;

static UPDATED: UpdateSignal = Signal::new();

fn produce(ctx: &SystemContext, cycles: u64) {
    let mut svc = ControlService::new(ctx, &UPDATED, 0);
    let mut hw = MockHardware::new();
    hw.nutrients.potassium = true;
    hw.health.wifi_rssi = -72;
    let mut sink = RecordingSink::new();
    svc.start(&mut hw, &mut sink);
    for i in 0..cycles {
        svc.run_cycle(&mut hw, i * 200, &mut sink);
    }
}

#[test]
fn json_frame_has_nested_layout() {
    let ctx = SystemContext::new(SystemConfig::default()).unwrap();
    produce(&ctx, 6);

    let mut task = DistributionTask::new(&ctx, RecordingTelemetry::default(), &UPDATED);
    let version = task.deliver_once().unwrap();
    assert_eq!(version, ctx.store().snapshot_all().unwrap().version);

    let frame = &task.sink().frames[0];
    assert!(!frame.stale);
    let v: serde_json::Value = serde_json::from_str(&frame.json).unwrap();

    assert_eq!(v["version"], version);
    let sensors = &v["sensors"];
    assert_eq!(sensors["readCount"], 6);
    assert_eq!(sensors["timestamp"], 1_000);
    assert_eq!(sensors["potassium"], true);
    assert_eq!(sensors["phosphorus"], false);
    assert_eq!(sensors["temperature"].as_f64(), Some(21.0));
    assert!((sensors["ph"].as_f64().unwrap() - 7.0).abs() < 0.05);

    let irrigation = &v["irrigation"];
    assert_eq!(irrigation["active"], false);
    assert_eq!(irrigation["state"], "IDLE");
    assert_eq!(irrigation["activations"], 0);
    assert_eq!(irrigation["threshold"].as_f64(), Some(30.0));

    let stats = &v["stats"];
    assert_eq!(stats["uptime"], 1);
    assert_eq!(stats["wifiRssi"], -72);
    assert!(stats["ipAddress"].is_string());
    assert!(stats["freeHeap"].is_u64());
}

#[test]
fn console_rotates_through_views() {
    let ctx = SystemContext::new(SystemConfig::default()).unwrap();
    produce(&ctx, 1);

    let mut task = DistributionTask::new(&ctx, RecordingTelemetry::default(), &UPDATED);
    let views: Vec<ConsoleView> = (0..5).map(|_| task.console_once().unwrap()).collect();
    assert_eq!(
        views,
        [
            ConsoleView::Sensors,
            ConsoleView::System,
            ConsoleView::Network,
            ConsoleView::All,
            ConsoleView::Sensors,
        ]
    );

    let lines = &task.sink().console;
    assert!(lines[0].contains("K: PRESENT"));
    assert!(lines[1].starts_with("System"));
    assert!(lines[2].ends_with("Signal: fair"));
    assert!(lines[3].contains("Irrigation: IDLE"));
    assert!(task.sink().frames.is_empty(), "console does not push JSON");
}

#[test]
fn empty_store_still_renders() {
    let ctx = SystemContext::new(SystemConfig::default()).unwrap();
    let mut task = DistributionTask::new(&ctx, RecordingTelemetry::default(), &UPDATED);
    assert_eq!(task.deliver_once().unwrap(), 0);
    assert_eq!(task.pushed(), 1);
}
