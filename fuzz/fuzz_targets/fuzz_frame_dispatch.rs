//! Fuzz target: `Dispatcher::handle_frame`
//!
//! Feeds arbitrary bytes through frame decoding and command dispatch using
//! the host builds of every driver.  Nothing may panic, the outbound link
//! must stay within capacity, and a full reset must leave every table empty.
//!
//! cargo fuzz run fuzz_frame_dispatch

#![no_main]

use libfuzzer_sys::fuzz_target;
use pardalote::adapters::hardware::HardwareAdapter;
use pardalote::adapters::host_link::HostLink;
use pardalote::app::ports::PulseRange;
use pardalote::app::service::{Dispatcher, PeriodicRunner};
use pardalote::config::ExtensionConfig;
use pardalote::drivers::neopixel::NeoPixelFactory;
use pardalote::drivers::servo::LedcServo;
use pardalote::scheduler::{MAX_REGISTRATIONS, PeriodicScheduler};

fuzz_target!(|data: &[u8]| {
    let config = ExtensionConfig::default();
    let range = PulseRange {
        min_us: i32::from(config.servo_min_pulse_us),
        max_us: i32::from(config.servo_max_pulse_us),
    };
    let mut dispatcher =
        Dispatcher::new(&config, NeoPixelFactory::new(), |id| LedcServo::new(id, range));
    let mut hw = HardwareAdapter::new();
    let mut link = HostLink::new();
    let mut sched = PeriodicScheduler::new();

    let _ = dispatcher.handle_frame(data, &mut hw, &mut link, &mut sched);
    assert!(sched.len() <= MAX_REGISTRATIONS);

    let mut runner = PeriodicRunner {
        dispatcher: &dispatcher,
        hw: &mut hw,
        reports: &mut link,
    };
    sched.tick(u32::MAX, &mut runner);
    let _ = link.flush();
    assert!(link.pending().is_empty());

    dispatcher.reset_all();
    assert!(dispatcher.neopixel().status().is_empty());
    assert!(dispatcher.servo().status().is_empty());
    assert!(dispatcher.ultrasonic().status().is_empty());
});
