//! NeoPixel extension: a fixed table of addressable LED strips.
//!
//! Each slot owns at most one [`PixelStrip`] handle.  `INIT` is the only
//! way to create one and always drops the previous handle first, so a
//! slot never holds two live handles.  All writes are buffered; the host
//! must send `SHOW` for changes to reach the LEDs.

use log::{debug, info};

use crate::app::commands::{Fill, NeoPixelCommand, NeoPixelOp, SetPixel, StripInit};
use crate::app::ports::{PixelStrip, StripFactory};
use crate::error::{ExtensionError, Result};
use crate::protocol::{ExtensionKind, MAX_STRIPS, Param, Pin};

/// Pack an RGB(W) colour the way the strip buffer stores it.
pub const fn pack_color(r: u8, g: u8, b: u8, w: u8) -> u32 {
    ((w as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

struct StripSlot<S> {
    pin: Pin,
    pixel_count: u16,
    /// `Some` exactly when the slot is initialised.
    strip: Option<S>,
}

impl<S> StripSlot<S> {
    const fn empty() -> Self {
        Self {
            pin: -1,
            pixel_count: 0,
            strip: None,
        }
    }
}

/// Snapshot of one initialised strip, for status dumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripStatus {
    pub id: usize,
    pub pin: Pin,
    pub pixel_count: u16,
}

pub struct NeoPixelExtension<F: StripFactory> {
    factory: F,
    slots: [StripSlot<F::Strip>; MAX_STRIPS],
}

impl<F: StripFactory> NeoPixelExtension<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            slots: core::array::from_fn(|_| StripSlot::empty()),
        }
    }

    /// Parse and execute one raw action.
    pub fn handle_action(&mut self, action: Param, params: &[Param]) -> Result<()> {
        let cmd = NeoPixelCommand::parse(action, params)?;
        self.handle(cmd)
    }

    pub fn handle(&mut self, cmd: NeoPixelCommand) -> Result<()> {
        let id = cmd.id;
        match cmd.op {
            NeoPixelOp::Init(init) => self.init(id, init),
            NeoPixelOp::SetPixel(px) => self.set_pixel(id, px),
            NeoPixelOp::Fill(fill) => self.fill(id, fill),
            NeoPixelOp::Clear => {
                self.strip_mut(id)?.clear();
                Ok(())
            }
            NeoPixelOp::Brightness(value) => {
                self.strip_mut(id)?.set_brightness(value);
                debug!("Strip {} brightness {}", id, value);
                Ok(())
            }
            NeoPixelOp::Show => {
                self.strip_mut(id)?.show();
                Ok(())
            }
        }
    }

    fn init(&mut self, id: usize, init: StripInit) -> Result<()> {
        info!(
            "NEO_INIT received: stripId={}, pin={}, numPixels={}, type={}",
            id, init.pin, init.pixel_count, init.kind
        );

        let slot = &mut self.slots[id];
        // Release the old handle before asking for a new one so the
        // factory can reuse its output channel.
        if slot.strip.take().is_some() {
            debug!("Strip {} released for re-init", id);
        }
        slot.pin = init.pin;
        slot.pixel_count = init.pixel_count;

        let mut strip = self
            .factory
            .create(id, init.pin, init.pixel_count, init.kind)
            .ok_or(ExtensionError::HardwareUnavailable {
                kind: ExtensionKind::NeoPixel,
                id,
            })?;
        strip.begin();
        strip.clear();
        strip.show();
        slot.strip = Some(strip);

        info!(
            "Initialized NeoPixel strip {} on pin {} with {} pixels",
            id, init.pin, init.pixel_count
        );
        Ok(())
    }

    fn set_pixel(&mut self, id: usize, px: SetPixel) -> Result<()> {
        let len = self.active_len(id)?;
        let index = u16::try_from(px.index)
            .ok()
            .filter(|&i| i < len)
            .ok_or(ExtensionError::IndexOutOfRange {
                index: px.index,
                len,
            })?;

        // w == 0 packs to a plain RGB colour.
        let color = pack_color(px.r, px.g, px.b, px.w);
        self.strip_mut(id)?.set_pixel_color(index, color);
        Ok(())
    }

    fn fill(&mut self, id: usize, fill: Fill) -> Result<()> {
        let len = Param::from(self.active_len(id)?);
        let Some((first, count)) = fill_span(len, fill.first, fill.count) else {
            debug!("Strip {} fill starts past the end, ignored", id);
            return Ok(());
        };
        self.strip_mut(id)?.fill(fill.color, first as u16, count as u16);
        Ok(())
    }

    fn active_len(&self, id: usize) -> Result<u16> {
        let slot = &self.slots[id];
        if slot.strip.is_none() {
            return Err(not_active(id));
        }
        Ok(slot.pixel_count)
    }

    fn strip_mut(&mut self, id: usize) -> Result<&mut F::Strip> {
        self.slots[id].strip.as_mut().ok_or_else(|| not_active(id))
    }

    // ── Queries / maintenance ─────────────────────────────────

    pub fn is_initialized(&self, id: usize) -> bool {
        self.slots.get(id).is_some_and(|s| s.strip.is_some())
    }

    pub fn pixel_count(&self, id: usize) -> Option<u16> {
        self.slots
            .get(id)
            .filter(|s| s.strip.is_some())
            .map(|s| s.pixel_count)
    }

    /// Direct access to a live handle (status readers, tests).
    pub fn strip(&self, id: usize) -> Option<&F::Strip> {
        self.slots.get(id).and_then(|s| s.strip.as_ref())
    }

    pub fn status(&self) -> heapless::Vec<StripStatus, MAX_STRIPS> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.strip.is_some())
            .map(|(id, s)| StripStatus {
                id,
                pin: s.pin,
                pixel_count: s.pixel_count,
            })
            .collect()
    }

    pub fn log_status(&self) {
        info!("=== NeoPixel Strip Status ===");
        for s in self.status() {
            info!("Strip {}: Pin {}, {} pixels", s.id, s.pin, s.pixel_count);
        }
    }

    /// Release every handle and reset all slots.
    pub fn reset_all(&mut self) {
        for slot in &mut self.slots {
            *slot = StripSlot::empty();
        }
    }
}

fn not_active(id: usize) -> crate::error::DispatchError {
    ExtensionError::NotActive {
        kind: ExtensionKind::NeoPixel,
        id,
    }
    .into()
}

/// Resolve a fill request against a strip of `len` pixels.
///
/// Order matters: a start past the end is a no-op *before* a negative
/// start is clamped to 0, and the count is clamped to the remaining range
/// *before* a non-positive count falls back to "everything remaining".
pub fn fill_span(len: Param, first: Param, count: Param) -> Option<(Param, Param)> {
    if first >= len || len <= 0 {
        return None;
    }
    let first = first.max(0);
    let mut count = count.min(len - first);
    if count <= 0 {
        count = len - first;
    }
    Some((first, count))
}
