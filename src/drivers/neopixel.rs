//! WS2812 / SK6812 addressable LED strip driver.
//!
//! [`PixelBuffer`] holds packed `0xWWRRGGBB` colours and knows how to
//! serialise them in the strip's wire colour order with global brightness
//! applied.  [`NeoPixelStrip`] pairs a buffer with an RMT transmit
//! channel.
//!
//! ## Colour order
//!
//! The `kind` passed to `INIT` uses the usual NeoPixel type encoding:
//! two bits per component giving its byte offset within a pixel, packed
//! as `0bWWRRGGBB`.  When the white offset equals the red offset the
//! strip has no white channel (3 bytes per pixel).
//!
//! ## Dual-target design
//!
//! On ESP-IDF: one RMT TX channel per strip, bit timings built from the
//! channel's counter clock.
//! On host/test: the last shown frame is kept in memory.

use log::{debug, warn};

use crate::app::ports::{PixelStrip, StripFactory};
use crate::protocol::Pin;

/// RMT TX channels available for strips.
pub const RMT_TX_CHANNELS: usize = 4;

/// `NEO_GRB`, the most common WS2812B ordering.
pub const KIND_GRB: u16 = (1 << 6) | (1 << 4) | 2;
/// `NEO_RGBW` (SK6812 RGBW).
pub const KIND_RGBW: u16 = (3 << 6) | (1 << 2) | 2;

// ───────────────────────────────────────────────────────────────
// Colour order
// ───────────────────────────────────────────────────────────────

/// Byte offsets of each component within one pixel on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorOrder {
    pub r: usize,
    pub g: usize,
    pub b: usize,
    /// `None` for 3-byte (RGB-only) strips.
    pub w: Option<usize>,
}

impl ColorOrder {
    pub fn from_kind(kind: u16) -> Self {
        let w = usize::from((kind >> 6) & 0b11);
        let r = usize::from((kind >> 4) & 0b11);
        let g = usize::from((kind >> 2) & 0b11);
        let b = usize::from(kind & 0b11);
        Self {
            r,
            g,
            b,
            w: (w != r).then_some(w),
        }
    }

    pub fn bytes_per_pixel(&self) -> usize {
        if self.w.is_some() { 4 } else { 3 }
    }
}

// ───────────────────────────────────────────────────────────────
// Pixel buffer
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PixelBuffer {
    pixels: Vec<u32>,
    order: ColorOrder,
    brightness: u8,
}

impl PixelBuffer {
    pub fn new(len: u16, kind: u16) -> Self {
        Self {
            pixels: vec![0; usize::from(len)],
            order: ColorOrder::from_kind(kind),
            brightness: u8::MAX,
        }
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn order(&self) -> ColorOrder {
        self.order
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn get(&self, index: u16) -> Option<u32> {
        self.pixels.get(usize::from(index)).copied()
    }

    /// Out-of-range indices are ignored.
    pub fn set(&mut self, index: u16, color: u32) {
        if let Some(px) = self.pixels.get_mut(usize::from(index)) {
            *px = color;
        }
    }

    /// `count == 0` means "to the end".  The span is cut at the end of
    /// the strip.
    pub fn fill(&mut self, color: u32, first: u16, count: u16) {
        let len = self.pixels.len();
        let first = usize::from(first).min(len);
        let end = if count == 0 {
            len
        } else {
            (first + usize::from(count)).min(len)
        };
        self.pixels[first..end].fill(color);
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    pub fn set_brightness(&mut self, value: u8) {
        self.brightness = value;
    }

    /// Serialise into `out` in wire order, brightness applied.
    pub fn encode(&self, out: &mut Vec<u8>) {
        let bpp = self.order.bytes_per_pixel();
        out.clear();
        out.resize(self.pixels.len() * bpp, 0);
        for (px, chunk) in self.pixels.iter().zip(out.chunks_exact_mut(bpp)) {
            let [w, r, g, b] = px.to_be_bytes();
            chunk[self.order.r] = scale(r, self.brightness);
            chunk[self.order.g] = scale(g, self.brightness);
            chunk[self.order.b] = scale(b, self.brightness);
            if let Some(wo) = self.order.w {
                chunk[wo] = scale(w, self.brightness);
            }
        }
    }
}

/// `255` leaves the component untouched, `0` turns it off.
pub const fn scale(component: u8, brightness: u8) -> u8 {
    ((component as u16 * (brightness as u16 + 1)) >> 8) as u8
}

// ───────────────────────────────────────────────────────────────
// Strip + factory
// ───────────────────────────────────────────────────────────────

pub struct NeoPixelStrip {
    pin: Pin,
    buffer: PixelBuffer,
    frame: Vec<u8>,
    output: rmt::Output,
}

impl NeoPixelStrip {
    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn pin(&self) -> Pin {
        self.pin
    }

    /// Bytes most recently pushed to the strip.
    pub fn last_frame(&self) -> &[u8] {
        &self.frame
    }
}

impl PixelStrip for NeoPixelStrip {
    fn begin(&mut self) {
        debug!("NeoPixel strip on GPIO {} ready ({} px)", self.pin, self.buffer.len());
    }

    fn clear(&mut self) {
        self.buffer.clear();
    }

    fn show(&mut self) {
        self.buffer.encode(&mut self.frame);
        if let Err(e) = self.output.write(&self.frame) {
            warn!("NeoPixel show on GPIO {} failed: {}", self.pin, e);
        }
    }

    fn set_pixel_color(&mut self, index: u16, color: u32) {
        self.buffer.set(index, color);
    }

    fn fill(&mut self, color: u32, first: u16, count: u16) {
        self.buffer.fill(color, first, count);
    }

    fn set_brightness(&mut self, value: u8) {
        self.buffer.set_brightness(value);
    }
}

/// Hands out one RMT channel per strip id.  The extension drops a
/// slot's old strip before asking for a new one, so a channel is never
/// claimed twice.
#[derive(Debug, Default)]
pub struct NeoPixelFactory;

impl NeoPixelFactory {
    pub fn new() -> Self {
        Self
    }
}

impl StripFactory for NeoPixelFactory {
    type Strip = NeoPixelStrip;

    fn create(&mut self, strip_id: usize, pin: Pin, pixel_count: u16, kind: u16) -> Option<NeoPixelStrip> {
        if strip_id >= RMT_TX_CHANNELS || pin < 0 {
            warn!("NeoPixel strip {}: no RMT channel for GPIO {}", strip_id, pin);
            return None;
        }
        let output = rmt::Output::open(strip_id, pin)?;
        Some(NeoPixelStrip {
            pin,
            buffer: PixelBuffer::new(pixel_count, kind),
            frame: Vec::new(),
            output,
        })
    }
}

// ── RMT output ────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod rmt {
    use core::time::Duration;

    use esp_idf_hal::gpio::AnyOutputPin;
    use esp_idf_hal::rmt::config::TransmitConfig;
    use esp_idf_hal::rmt::{
        CHANNEL0, CHANNEL1, CHANNEL2, CHANNEL3, PinState, Pulse, TxRmtDriver,
        VariableLengthSignal,
    };
    use esp_idf_sys::EspError;
    use log::warn;

    // WS2812B bit timings (ns).
    const T0H_NS: u64 = 350;
    const T0L_NS: u64 = 800;
    const T1H_NS: u64 = 700;
    const T1L_NS: u64 = 600;

    pub struct Output {
        tx: TxRmtDriver<'static>,
        zero: [Pulse; 2],
        one: [Pulse; 2],
    }

    impl Output {
        pub fn open(channel: usize, pin: i32) -> Option<Self> {
            match Self::try_open(channel, pin) {
                Ok(out) => Some(out),
                Err(e) => {
                    warn!("RMT channel {} on GPIO {} failed: {}", channel, pin, e);
                    None
                }
            }
        }

        fn try_open(channel: usize, pin: i32) -> Result<Self, EspError> {
            let config = TransmitConfig::new().clock_divider(1);
            // SAFETY: the factory maps each strip id to exactly one channel
            // and the previous holder is dropped before a re-open.
            let tx = unsafe {
                let pin = AnyOutputPin::new(pin);
                match channel {
                    0 => TxRmtDriver::new(CHANNEL0::new(), pin, &config),
                    1 => TxRmtDriver::new(CHANNEL1::new(), pin, &config),
                    2 => TxRmtDriver::new(CHANNEL2::new(), pin, &config),
                    _ => TxRmtDriver::new(CHANNEL3::new(), pin, &config),
                }
            }?;
            let hz = tx.counter_clock()?;
            let pulse = |state, ns| Pulse::new_with_duration(hz, state, &Duration::from_nanos(ns));
            Ok(Self {
                zero: [pulse(PinState::High, T0H_NS)?, pulse(PinState::Low, T0L_NS)?],
                one: [pulse(PinState::High, T1H_NS)?, pulse(PinState::Low, T1L_NS)?],
                tx,
            })
        }

        pub fn write(&mut self, bytes: &[u8]) -> Result<(), EspError> {
            let mut signal = VariableLengthSignal::new();
            for byte in bytes {
                for bit in (0..8).rev() {
                    let pulses = if (byte >> bit) & 1 == 1 { &self.one } else { &self.zero };
                    signal.push(pulses)?;
                }
            }
            self.tx.start_blocking(&signal)
        }
    }
}

#[cfg(not(target_os = "espidf"))]
mod rmt {
    use core::convert::Infallible;

    pub struct Output;

    impl Output {
        pub fn open(_channel: usize, _pin: i32) -> Option<Self> {
            Some(Self)
        }

        pub fn write(&mut self, _bytes: &[u8]) -> Result<(), Infallible> {
            Ok(())
        }
    }
}
