//! Integration tests for routing, batch framing and the periodic loop.

use pardalote::adapters::host_link::HostLink;
use pardalote::adapters::log_sink::LogReportSink;
use pardalote::app::service::PeriodicRunner;
use pardalote::error::{CommandError, DispatchError};
use pardalote::protocol::frame::{FrameError, WireCommand};
use pardalote::protocol::{
    END, NEO_INIT, NEO_PIXEL_DEVICE, SERVO_ATTACH, SERVO_DEVICE, SERVO_READ, ULTRASONIC_ATTACH,
    ULTRASONIC_DEVICE, ULTRASONIC_READ,
};
use pardalote::scheduler::PeriodicScheduler;

use crate::mock_hw::{MockPins, MockReports, Rig, SchedCall};

// ── Routing ──────────────────────────────────────────────────

#[test]
fn action_ranges_pick_the_extension() {
    let mut rig = Rig::new();
    rig.send(NEO_PIXEL_DEVICE, NEO_INIT, &[0, 6, 8, 0x52]).unwrap();
    rig.send(SERVO_DEVICE, SERVO_ATTACH, &[0, 9]).unwrap();
    rig.send(ULTRASONIC_DEVICE, ULTRASONIC_ATTACH, &[0, 5]).unwrap();

    assert!(rig.dispatcher.neopixel().is_initialized(0));
    assert!(rig.dispatcher.servo().is_attached(0));
    assert!(rig.dispatcher.ultrasonic().is_attached(0));
}

#[test]
fn end_only_routes_for_ultrasonic_device() {
    let mut rig = Rig::new();
    let err = rig.send(SERVO_DEVICE, END, &[0]).unwrap_err();
    assert_eq!(
        err,
        DispatchError::UnsupportedDevice {
            device: SERVO_DEVICE,
            action: END
        }
    );
    assert!(rig.sched.calls.is_empty());

    rig.send(ULTRASONIC_DEVICE, END, &[0]).unwrap();
    assert_eq!(rig.sched.calls, vec![SchedCall::Unregister(2000)]);
}

#[test]
fn core_actions_are_not_claimed() {
    let mut rig = Rig::new();
    for action in [0, 1, 5, 9, 40, 99] {
        assert!(matches!(
            rig.send(13, action, &[0]),
            Err(DispatchError::UnsupportedDevice { .. })
        ));
    }
}

#[test]
fn empty_params_are_reported_not_panicked() {
    let mut rig = Rig::new();
    assert_eq!(
        rig.send(SERVO_DEVICE, SERVO_READ, &[]),
        Err(DispatchError::Command(CommandError::EmptyParams))
    );
    assert!(rig.reports.values.is_empty());
}

// ── Batches and frames ───────────────────────────────────────

#[test]
fn batch_continues_past_rejected_commands() {
    let mut rig = Rig::new();
    let cmds = vec![
        WireCommand {
            id: SERVO_DEVICE,
            action: SERVO_READ,
            params: vec![99],
        },
        WireCommand {
            id: SERVO_DEVICE,
            action: SERVO_READ,
            params: vec![1],
        },
    ];
    let rejected = rig.dispatcher.process_batch(
        &cmds,
        &mut rig.pins,
        &mut rig.reports,
        &mut rig.sched,
    );
    assert_eq!(rejected, 1);
    assert_eq!(rig.reports.values, vec![(1001, SERVO_READ, -1.0)]);
}

#[test]
fn frame_round_trip_through_host_link() {
    let mut rig = Rig::new();
    let mut link = HostLink::new();
    let frame = br#"{"header":{"version":1},"data":[
        {"id":201,"action":20,"params":[2,9]},
        {"id":201,"action":24,"params":[2]}
    ]}"#;

    let rejected = rig
        .dispatcher
        .handle_frame(frame, &mut rig.pins, &mut link, &mut rig.sched)
        .unwrap();
    assert_eq!(rejected, 0);

    let out = link.flush().unwrap().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["header"]["version"], 1);
    assert_eq!(parsed["data"][0]["id"], 1002);
    assert_eq!(parsed["data"][0]["type"], SERVO_READ);
    assert_eq!(parsed["data"][0]["value"], 90.0);
}

#[test]
fn fractional_angles_from_sweeps_are_truncated() {
    let mut rig = Rig::new();
    let frame = br#"{"header":{"version":1},"data":[
        {"id":201,"action":20,"params":[0,9]},
        {"id":201,"action":22,"params":[0,12.857142857142858]}
    ]}"#;

    let rejected = rig
        .dispatcher
        .handle_frame(frame, &mut rig.pins, &mut rig.reports, &mut rig.sched)
        .unwrap();
    assert_eq!(rejected, 0);
    assert!(rig.dispatcher.servo().is_attached(0));
    assert_eq!(rig.dispatcher.servo().last_angle(0), Some(12));
}

#[test]
fn malformed_frame_is_rejected_whole() {
    let mut rig = Rig::new();
    let err = rig
        .dispatcher
        .handle_frame(b"{not json", &mut rig.pins, &mut rig.reports, &mut rig.sched)
        .unwrap_err();
    assert_eq!(err, FrameError::Malformed);
    assert!(rig.reports.values.is_empty());
}

// ── Periodic loop ────────────────────────────────────────────

#[test]
fn scheduler_drives_periodic_reads() {
    let mut rig = Rig::new();
    let mut sched = PeriodicScheduler::new();
    rig.dispatcher
        .dispatch(
            ULTRASONIC_DEVICE,
            ULTRASONIC_ATTACH,
            &[1, 5, 6],
            &mut rig.pins,
            &mut rig.reports,
            &mut sched,
        )
        .unwrap();
    rig.dispatcher
        .dispatch(
            ULTRASONIC_DEVICE,
            ULTRASONIC_READ,
            &[1, 0, 100],
            &mut rig.pins,
            &mut rig.reports,
            &mut sched,
        )
        .unwrap();
    assert_eq!(sched.len(), 1);

    let mut pins = MockPins::with_pulses([Some(1000), Some(1000)]);
    let mut reports = MockReports::new();
    for _ in 0..20 {
        let mut runner = PeriodicRunner {
            dispatcher: &rig.dispatcher,
            hw: &mut pins,
            reports: &mut reports,
        };
        sched.tick(10, &mut runner);
    }
    assert_eq!(reports.values.len(), 2);
    assert!(reports.values.iter().all(|&(id, action, _)| id == 2001 && action == ULTRASONIC_READ));

    // END stops the stream.
    rig.dispatcher
        .dispatch(ULTRASONIC_DEVICE, END, &[1], &mut rig.pins, &mut rig.reports, &mut sched)
        .unwrap();
    assert!(sched.is_empty());
}

#[test]
fn reset_all_clears_every_table() {
    let mut rig = Rig::new();
    rig.send(NEO_PIXEL_DEVICE, NEO_INIT, &[0, 6, 8, 0x52]).unwrap();
    rig.send(SERVO_DEVICE, SERVO_ATTACH, &[0, 9]).unwrap();
    rig.send(ULTRASONIC_DEVICE, ULTRASONIC_ATTACH, &[0, 5]).unwrap();

    rig.dispatcher.reset_all();
    rig.dispatcher.log_status();

    assert!(!rig.dispatcher.neopixel().is_initialized(0));
    assert!(!rig.dispatcher.servo().is_attached(0));
    assert!(!rig.dispatcher.ultrasonic().is_attached(0));
    assert_eq!(rig.live_strips.get(), 0);
}

#[test]
fn log_sink_accepts_reports_from_dispatch() {
    let mut rig = Rig::new();
    let mut sink = LogReportSink::new();
    rig.dispatcher
        .dispatch(SERVO_DEVICE, SERVO_READ, &[3], &mut rig.pins, &mut sink, &mut rig.sched)
        .unwrap();
    assert!(rig.pins.ops.is_empty());
}
