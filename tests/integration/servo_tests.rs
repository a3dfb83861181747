//! Integration tests for the Dispatcher → Servo extension → driver path.

use pardalote::app::ports::PulseRange;
use pardalote::error::{DispatchError, ExtensionError};
use pardalote::protocol::{
    ExtensionKind, SERVO_ATTACH, SERVO_ATTACHED, SERVO_DETACH, SERVO_DEVICE, SERVO_READ,
    SERVO_WRITE, SERVO_WRITE_MICROSECONDS,
};

use crate::mock_hw::{Rig, ServoCall};

const DEV: i64 = SERVO_DEVICE;

fn attached(id: i64, pin: i64) -> Rig {
    let mut rig = Rig::new();
    rig.send(DEV, SERVO_ATTACH, &[id, pin]).unwrap();
    rig
}

// ── End-to-end attach / write / detach ───────────────────────

#[test]
fn attach_write_detach_round_trip() {
    let mut rig = attached(2, 9);
    rig.send(DEV, SERVO_WRITE, &[2, 90]).unwrap();
    rig.send(DEV, SERVO_ATTACHED, &[2]).unwrap();
    assert_eq!(rig.reports.last(), Some((1002, SERVO_ATTACHED, 1.0)));

    rig.send(DEV, SERVO_DETACH, &[2]).unwrap();
    rig.send(DEV, SERVO_ATTACHED, &[2]).unwrap();
    assert_eq!(rig.reports.last(), Some((1002, SERVO_ATTACHED, 0.0)));

    let writes_before = rig.servo(2).calls.len();
    let err = rig.send(DEV, SERVO_WRITE, &[2, 90]).unwrap_err();
    assert_eq!(
        err,
        DispatchError::Extension(ExtensionError::NotActive {
            kind: ExtensionKind::Servo,
            id: 2
        })
    );
    assert_eq!(rig.servo(2).calls.len(), writes_before);
}

#[test]
fn attach_uses_default_range_and_homes_angle() {
    let rig = attached(0, 4);
    assert_eq!(rig.servo(0).calls, vec![ServoCall::Attach { pin: 4, range: None }]);
    assert_eq!(rig.dispatcher.servo().last_angle(0), Some(90));
    assert_eq!(rig.dispatcher.servo().pin(0), Some(4));
}

#[test]
fn attach_with_explicit_range() {
    let mut rig = Rig::new();
    rig.send(DEV, SERVO_ATTACH, &[1, 5, 1000, 2000]).unwrap();
    assert_eq!(
        rig.servo(1).calls,
        vec![ServoCall::Attach {
            pin: 5,
            range: Some(PulseRange {
                min_us: 1000,
                max_us: 2000
            })
        }]
    );
}

#[test]
fn reattach_detaches_first() {
    let mut rig = attached(3, 4);
    rig.send(DEV, SERVO_ATTACH, &[3, 12]).unwrap();
    assert_eq!(
        rig.servo(3).calls,
        vec![
            ServoCall::Attach { pin: 4, range: None },
            ServoCall::Detach,
            ServoCall::Attach { pin: 12, range: None },
        ]
    );
    assert_eq!(rig.dispatcher.servo().pin(3), Some(12));
}

// ── Clamping ─────────────────────────────────────────────────

#[test]
fn write_clamps_angle() {
    let mut rig = attached(0, 4);
    rig.send(DEV, SERVO_WRITE, &[0, 400]).unwrap();
    assert_eq!(rig.dispatcher.servo().last_angle(0), Some(180));
    rig.send(DEV, SERVO_WRITE, &[0, -50]).unwrap();
    assert_eq!(rig.dispatcher.servo().last_angle(0), Some(0));

    assert_eq!(
        &rig.servo(0).calls[1..],
        &[ServoCall::Write(180), ServoCall::Write(0)]
    );
}

#[test]
fn write_microseconds_clamps_and_keeps_last_angle() {
    let mut rig = attached(0, 4);
    rig.send(DEV, SERVO_WRITE, &[0, 45]).unwrap();
    rig.send(DEV, SERVO_WRITE_MICROSECONDS, &[0, 100]).unwrap();
    rig.send(DEV, SERVO_WRITE_MICROSECONDS, &[0, 5000]).unwrap();

    assert_eq!(
        &rig.servo(0).calls[2..],
        &[
            ServoCall::WriteMicroseconds(544),
            ServoCall::WriteMicroseconds(2400)
        ]
    );
    assert_eq!(rig.dispatcher.servo().last_angle(0), Some(45));
}

// ── Reads ────────────────────────────────────────────────────

#[test]
fn read_never_attached_reports_minus_one_without_hardware() {
    let mut rig = Rig::new();
    rig.send(DEV, SERVO_READ, &[7]).unwrap();
    assert_eq!(rig.reports.values, vec![(1007, SERVO_READ, -1.0)]);
    assert_eq!(rig.servo(7).reads.get(), 0);
    assert!(rig.servo(7).calls.is_empty());
}

#[test]
fn read_reports_driver_angle() {
    let mut rig = attached(11, 4);
    rig.send(DEV, SERVO_WRITE, &[11, 135]).unwrap();
    rig.send(DEV, SERVO_READ, &[11]).unwrap();
    assert_eq!(rig.reports.last(), Some((1011, SERVO_READ, 135.0)));
}

#[test]
fn attached_reports_zero_when_driver_lost_output() {
    let mut rig = attached(3, 4);
    // Output dropped behind the extension's back.
    rig.servo_mut(3).attached = false;

    rig.send(DEV, SERVO_ATTACHED, &[3]).unwrap();
    assert_eq!(rig.reports.last(), Some((1003, SERVO_ATTACHED, 0.0)));
    assert!(rig.dispatcher.servo().is_attached(3));
    assert_eq!(rig.servo(3).reads.get(), 1);
}

#[test]
fn attached_on_never_attached_slot_skips_driver() {
    let mut rig = Rig::new();
    rig.send(DEV, SERVO_ATTACHED, &[4]).unwrap();
    assert_eq!(rig.reports.last(), Some((1004, SERVO_ATTACHED, 0.0)));
    assert_eq!(rig.servo(4).reads.get(), 0);
}

#[test]
fn detach_when_detached_is_silent() {
    let mut rig = Rig::new();
    rig.send(DEV, SERVO_DETACH, &[6]).unwrap();
    assert!(rig.servo(6).calls.is_empty());
}

#[test]
fn reset_all_detaches_every_servo() {
    let mut rig = attached(0, 4);
    rig.send(DEV, SERVO_ATTACH, &[5, 6]).unwrap();
    assert_eq!(rig.dispatcher.servo().status().len(), 2);

    rig.dispatcher.reset_all();
    assert!(rig.dispatcher.servo().status().is_empty());
    assert!(!rig.servo(0).attached);
    assert!(!rig.servo(5).attached);
}
