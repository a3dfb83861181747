//! Raw GPIO helpers for bit-banged protocols.
//!
//! Pin direction, level read/write, microsecond busy-waits and a bounded
//! `pulse_in`, all on raw ESP-IDF sys calls.  Pins are configured on
//! demand (the ultrasonic extension flips the same pin between output
//! and input in 3-wire mode), so there is no one-shot init table.
//!
//! On host builds every call is a no-op and `pulse_in` never sees a
//! pulse.

#[cfg(target_os = "espidf")]
use esp_idf_sys::*;

/// Errors from pin configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioError {
    InvalidPin(i32),
    ConfigFailed(i32),
}

impl core::fmt::Display for GpioError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidPin(pin) => write!(f, "GPIO {} is not a valid pin", pin),
            Self::ConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
        }
    }
}

// ── Direction ─────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn set_output(pin: i32) -> Result<(), GpioError> {
    if pin < 0 {
        return Err(GpioError::InvalidPin(pin));
    }
    // SAFETY: gpio_set_direction only touches the IO-mux registers of
    // `pin`; called from the main task only.
    let ret = unsafe { gpio_set_direction(pin, gpio_mode_t_GPIO_MODE_OUTPUT) };
    if ret != ESP_OK as i32 {
        return Err(GpioError::ConfigFailed(ret));
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn set_output(pin: i32) -> Result<(), GpioError> {
    if pin < 0 {
        return Err(GpioError::InvalidPin(pin));
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn set_input(pin: i32) -> Result<(), GpioError> {
    if pin < 0 {
        return Err(GpioError::InvalidPin(pin));
    }
    // SAFETY: see set_output.
    let ret = unsafe { gpio_set_direction(pin, gpio_mode_t_GPIO_MODE_INPUT) };
    if ret != ESP_OK as i32 {
        return Err(GpioError::ConfigFailed(ret));
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn set_input(pin: i32) -> Result<(), GpioError> {
    if pin < 0 {
        return Err(GpioError::InvalidPin(pin));
    }
    Ok(())
}

// ── Levels ────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes a single output register bit.
    unsafe {
        gpio_set_level(pin, u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn write(_pin: i32, _high: bool) {}

#[cfg(target_os = "espidf")]
pub fn read(pin: i32) -> bool {
    // SAFETY: gpio_get_level is a read-only register access.
    (unsafe { gpio_get_level(pin) }) != 0
}

#[cfg(not(target_os = "espidf"))]
pub fn read(_pin: i32) -> bool {
    false
}

// ── Timing ────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn delay_us(us: u32) {
    // SAFETY: ROM busy-wait, no shared state.
    unsafe { esp_rom_delay_us(us) };
}

#[cfg(not(target_os = "espidf"))]
pub fn delay_us(_us: u32) {}

#[cfg(target_os = "espidf")]
fn now_us() -> i64 {
    // SAFETY: esp_timer_get_time is a monotonic counter read.
    unsafe { esp_timer_get_time() }
}

/// Length of the next pulse at `level` on `pin`, in microseconds.
///
/// Waits for any pulse already in progress to end, then for the pulse to
/// start, then for it to end.  The whole measurement is bounded by
/// `timeout_us`; `None` when any phase runs past it.
#[cfg(target_os = "espidf")]
pub fn pulse_in(pin: i32, high: bool, timeout_us: u32) -> Option<u32> {
    let start = now_us();
    let deadline = start + i64::from(timeout_us);
    let wait_while = |want: bool| -> Option<i64> {
        loop {
            let now = now_us();
            if read(pin) != want {
                return Some(now);
            }
            if now >= deadline {
                return None;
            }
        }
    };

    wait_while(high)?;
    let rise = wait_while(!high)?;
    let fall = wait_while(high)?;
    u32::try_from(fall - rise).ok()
}

#[cfg(not(target_os = "espidf"))]
pub fn pulse_in(_pin: i32, _high: bool, _timeout_us: u32) -> Option<u32> {
    None
}
