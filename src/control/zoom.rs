//! Zoom-out crop control
//!
//! Each step grows the crop rectangle by a fixed factor, clamps it to the
//! native sensor size and re-centers it. The state lives behind a mutex that
//! is held across both the update and the camera call, so concurrent `/zoom`
//! requests apply one at a time and in the same order on the hardware.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::error::{Error, Result};

/// Crop rectangle in native sensor pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle of the given size centered in `native`
    pub fn centered(width: u32, height: u32, native: (u32, u32)) -> Self {
        Self {
            x: native.0.saturating_sub(width) / 2,
            y: native.1.saturating_sub(height) / 2,
            width,
            height,
        }
    }

    fn fits_in(&self, native: (u32, u32)) -> bool {
        u64::from(self.x) + u64::from(self.width) <= u64::from(native.0)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(native.1)
    }
}

impl std::fmt::Display for CropRect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}, {}x{})",
            self.x, self.y, self.width, self.height
        )
    }
}

/// Zoom configuration
#[derive(Debug, Clone)]
pub struct ZoomConfig {
    /// Native sensor size (width, height)
    pub native_size: (u32, u32),

    /// Crop applied at startup
    pub initial_crop: CropRect,

    /// Factor applied to width and height on every zoom-out step
    pub growth_factor: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            native_size: (4656, 3496),
            initial_crop: CropRect::new(0, 0, 3240, 2430),
            growth_factor: 1.1,
        }
    }
}

impl ZoomConfig {
    /// Set the native sensor size
    pub fn native_size(mut self, width: u32, height: u32) -> Self {
        self.native_size = (width, height);
        self
    }

    /// Set the startup crop
    pub fn initial_crop(mut self, crop: CropRect) -> Self {
        self.initial_crop = crop;
        self
    }

    /// Set the per-step growth factor
    pub fn growth_factor(mut self, factor: f64) -> Self {
        self.growth_factor = factor;
        self
    }

    /// Check that the values describe a usable zoom range
    pub fn validate(&self) -> Result<()> {
        let (w, h) = self.native_size;
        if w == 0 || h == 0 {
            return Err(Error::Config(format!("native size {}x{} is empty", w, h)));
        }
        if !self.initial_crop.fits_in(self.native_size) {
            return Err(Error::Config(format!(
                "initial crop {} exceeds native size {}x{}",
                self.initial_crop, w, h
            )));
        }
        if !self.growth_factor.is_finite() || self.growth_factor < 1.0 {
            return Err(Error::Config(format!(
                "growth factor {} must be a finite value >= 1.0",
                self.growth_factor
            )));
        }

        // A side that rounds back to itself would never zoom out
        for (side, limit) in [(self.initial_crop.width, w), (self.initial_crop.height, h)] {
            if side < limit && grow_side(side, limit, self.growth_factor) == side {
                return Err(Error::Config(format!(
                    "initial crop {} cannot grow by factor {}",
                    self.initial_crop, self.growth_factor
                )));
            }
        }
        Ok(())
    }
}

/// One side after a zoom-out step: scaled, floored, never smaller, capped at `limit`
fn grow_side(size: u32, limit: u32, factor: f64) -> u32 {
    let grown = (f64::from(size) * factor).floor();
    let grown = if grown >= f64::from(limit) {
        limit
    } else {
        grown as u32
    };
    grown.max(size).min(limit)
}

/// Crop rectangle plus the bounds it moves in
#[derive(Debug, Clone)]
pub struct ZoomState {
    native: (u32, u32),
    crop: CropRect,
    growth_factor: f64,
}

impl ZoomState {
    /// Create state from a validated configuration
    pub fn new(config: &ZoomConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            native: config.native_size,
            crop: config.initial_crop,
            growth_factor: config.growth_factor,
        })
    }

    pub fn crop(&self) -> CropRect {
        self.crop
    }

    pub fn native_size(&self) -> (u32, u32) {
        self.native
    }

    /// The crop one zoom-out step from the current one
    ///
    /// Width and height grow by the factor (rounded down), never shrink and
    /// never exceed the native size. The result is centered.
    pub fn next_crop(&self) -> CropRect {
        let width = grow_side(self.crop.width, self.native.0, self.growth_factor);
        let height = grow_side(self.crop.height, self.native.1, self.growth_factor);
        CropRect::centered(width, height, self.native)
    }

    /// Advance one zoom-out step and return the new crop
    pub fn increment(&mut self) -> CropRect {
        self.crop = self.next_crop();
        self.crop
    }
}

/// Hardware crop register
pub trait ScalerCrop: Send + Sync + 'static {
    /// Apply a new crop rectangle
    fn set_scaler_crop(&self, crop: CropRect) -> Result<()>;
}

/// Anything that can zoom the picture out by one step
pub trait ZoomControl: Send + Sync + 'static {
    /// Zoom out once, returning the crop now in effect
    fn increment_zoom(&self) -> Result<CropRect>;
}

/// Serialized zoom state driving a `ScalerCrop`
pub struct ZoomController<C: ScalerCrop> {
    state: Mutex<ZoomState>,
    camera: C,
}

impl<C: ScalerCrop> ZoomController<C> {
    /// Create the controller and apply the initial crop to the camera
    pub fn new(config: &ZoomConfig, camera: C) -> Result<Self> {
        let state = ZoomState::new(config)?;
        camera.set_scaler_crop(state.crop())?;

        tracing::info!(
            crop = %state.crop(),
            native_width = state.native.0,
            native_height = state.native.1,
            "Zoom controller ready"
        );

        Ok(Self {
            state: Mutex::new(state),
            camera,
        })
    }

    /// Crop currently in effect
    pub fn crop(&self) -> CropRect {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .crop()
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }
}

impl<C: ScalerCrop> ZoomControl for ZoomController<C> {
    fn increment_zoom(&self) -> Result<CropRect> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let next = state.next_crop();
        // Commit only once the camera accepted the crop
        self.camera.set_scaler_crop(next)?;
        state.crop = next;

        tracing::debug!(crop = %next, "Zoom incremented");
        Ok(next)
    }
}

/// `ScalerCrop` that only records the requested crop in the log
///
/// Used when no camera hardware is attached.
#[derive(Debug, Default)]
pub struct LoggingScalerCrop {
    last: Mutex<Option<CropRect>>,
    applied: AtomicU64,
}

impl LoggingScalerCrop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently applied crop
    pub fn last_applied(&self) -> Option<CropRect> {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of crops applied, including repeats of the same rectangle
    pub fn applied_count(&self) -> u64 {
        self.applied.load(Ordering::Relaxed)
    }
}

impl ScalerCrop for LoggingScalerCrop {
    fn set_scaler_crop(&self, crop: CropRect) -> Result<()> {
        tracing::info!(crop = %crop, "ScalerCrop");
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(crop);
        self.applied.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
