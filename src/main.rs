//! Pardalote firmware entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter    HostLink+LogTap   Esp32TimeAdapter         │
//! │  (PinPort+DelayNs)  (ReturnChannel)   (tick source)            │
//! │  NeoPixelFactory    LedcServo                                  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              Dispatcher (pure logic)                   │    │
//! │  │  NeoPixel · Servo · Ultrasonic                         │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  PeriodicScheduler (delegate-driven)                           │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::time::Duration;

use anyhow::Result;
use log::{info, warn};

use pardalote::adapters::console;
use pardalote::adapters::hardware::HardwareAdapter;
use pardalote::adapters::host_link::HostLink;
use pardalote::adapters::log_sink::LogTap;
use pardalote::adapters::time::Esp32TimeAdapter;
use pardalote::app::ports::PulseRange;
use pardalote::app::service::{Dispatcher, PeriodicRunner};
use pardalote::config::ExtensionConfig;
use pardalote::drivers::neopixel::NeoPixelFactory;
use pardalote::drivers::servo::LedcServo;
use pardalote::scheduler::PeriodicScheduler;

/// Console line that dumps every active instance instead of dispatching.
const STATUS_REQUEST: &str = "?";

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Pardalote v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = ExtensionConfig::default();
    config.validate()?;

    // ── 3. Construct adapters + dispatcher ────────────────────
    let default_range = PulseRange {
        min_us: i32::from(config.servo_min_pulse_us),
        max_us: i32::from(config.servo_max_pulse_us),
    };
    let mut dispatcher = Dispatcher::new(&config, NeoPixelFactory::new(), |id| {
        LedcServo::new(id, default_range)
    });
    let mut hw = HardwareAdapter::new();
    let mut link = HostLink::new();
    let mut sched = PeriodicScheduler::new();
    let mut clock = Esp32TimeAdapter::new();

    let _reader = console::spawn_reader()?;
    let tick = Duration::from_millis(u64::from(config.scheduler_tick_ms));

    info!("System ready. Entering dispatch loop.");

    // ── 4. Dispatch loop ──────────────────────────────────────
    loop {
        while let Some(line) = console::try_next_line() {
            if line.as_str() == STATUS_REQUEST {
                dispatcher.log_status();
                continue;
            }
            let mut reports = LogTap::new(&mut link);
            match dispatcher.handle_frame(line.as_bytes(), &mut hw, &mut reports, &mut sched) {
                Ok(0) => {}
                Ok(rejected) => warn!("{} command(s) rejected in frame", rejected),
                Err(e) => warn!("Frame rejected: {}", e),
            }
        }

        let elapsed = clock.take_elapsed_ms();
        let mut reports = LogTap::new(&mut link);
        let mut runner = PeriodicRunner {
            dispatcher: &dispatcher,
            hw: &mut hw,
            reports: &mut reports,
        };
        sched.tick(elapsed, &mut runner);

        match link.flush() {
            Ok(Some(frame)) => println!("{frame}"),
            Ok(None) => {}
            Err(e) => warn!("Outbound frame dropped: {}", e),
        }

        std::thread::sleep(tick);
    }
}
