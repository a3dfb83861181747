//! ESP32 time adapter.
//!
//! Monotonic milliseconds for driving the periodic scheduler.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic).
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` for
//!   host-side testing and simulation.

pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
    last_tick_ms: u64,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        let mut clock = Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
            last_tick_ms: 0,
        };
        clock.last_tick_ms = clock.uptime_ms();
        clock
    }

    /// Milliseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    pub fn uptime_ms(&self) -> u64 {
        // SAFETY: esp_timer_get_time is a monotonic counter read.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    /// Milliseconds since boot (monotonic).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Milliseconds since the previous call (or since construction),
    /// saturated to `u32`.
    pub fn take_elapsed_ms(&mut self) -> u32 {
        let now = self.uptime_ms();
        let elapsed = now.saturating_sub(self.last_tick_ms);
        self.last_tick_ms = now;
        u32::try_from(elapsed).unwrap_or(u32::MAX)
    }
}
