//! Data-ready handling: how a frame gets from the DRDY line to the caller.
//!
//! Two strategies share one interface. [`PolledHandoff`] checks the DRDY level
//! on every retrieval attempt and reads the frame inline. [`InterruptHandoff`]
//! reads the frame from a falling-edge callback into a [`FrameSlot`] and the
//! retrieval attempt only drains the slot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, error, warn};

use super::frame::SampleFrame;
use super::protocol;
use crate::hal::{Edge, InterruptPin};
use crate::spi_bus::BusDevice;
use crate::types::DriverError;

/// Single-slot mailbox holding the latest undelivered frame.
///
/// A frame published before the previous one was taken replaces it.
#[derive(Debug, Default)]
pub struct FrameSlot {
    pending: Mutex<Option<SampleFrame>>,
    overwritten: AtomicU64,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `frame` and mark it fresh.
    pub fn publish(&self, frame: SampleFrame) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if pending.replace(frame).is_some() {
            self.overwritten.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Copy out the fresh frame and clear the flag, in one step.
    pub fn take(&self) -> Option<SampleFrame> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn is_fresh(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Frames replaced before anyone took them.
    pub fn overwritten(&self) -> u64 {
        self.overwritten.load(Ordering::Relaxed)
    }
}

/// How the driver learns about and collects new frames.
pub trait DataReadyHandoff: Send {
    /// Called when the device enters continuous-read mode.
    fn arm(&mut self, device: &BusDevice) -> Result<(), DriverError>;

    /// Called when the device leaves continuous-read mode.
    fn disarm(&mut self) -> Result<(), DriverError>;

    /// Non-blocking: `Ok(None)` when no new frame is available.
    fn try_get_frame(&mut self, device: &BusDevice) -> Result<Option<SampleFrame>, DriverError>;

    /// Frames dropped because a newer one arrived first, if tracked.
    fn frames_overwritten(&self) -> Option<u64> {
        None
    }
}

/// Reads a frame whenever the DRDY line is found low.
pub struct PolledHandoff {
    drdy: Box<dyn InterruptPin>,
    armed: bool,
}

impl PolledHandoff {
    pub fn new<P: InterruptPin>(drdy: P) -> Self {
        Self {
            drdy: Box::new(drdy),
            armed: false,
        }
    }
}

impl DataReadyHandoff for PolledHandoff {
    fn arm(&mut self, _device: &BusDevice) -> Result<(), DriverError> {
        self.armed = true;
        Ok(())
    }

    fn disarm(&mut self) -> Result<(), DriverError> {
        self.armed = false;
        Ok(())
    }

    fn try_get_frame(&mut self, device: &BusDevice) -> Result<Option<SampleFrame>, DriverError> {
        // DRDY is active low
        if !self.armed || self.drdy.is_high() {
            return Ok(None);
        }
        protocol::read_frame(device).map(Some)
    }
}

/// Reads frames from a falling-edge callback into a shared [`FrameSlot`].
pub struct InterruptHandoff {
    drdy: Box<dyn InterruptPin>,
    slot: Arc<FrameSlot>,
    armed: bool,
}

impl InterruptHandoff {
    pub fn new<P: InterruptPin>(drdy: P) -> Self {
        Self {
            drdy: Box::new(drdy),
            slot: Arc::new(FrameSlot::new()),
            armed: false,
        }
    }

    pub fn slot(&self) -> Arc<FrameSlot> {
        Arc::clone(&self.slot)
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

impl DataReadyHandoff for InterruptHandoff {
    fn arm(&mut self, device: &BusDevice) -> Result<(), DriverError> {
        if self.armed {
            return Ok(());
        }
        let device = device.clone();
        let slot = Arc::clone(&self.slot);

        self.drdy
            .set_async_interrupt(
                Edge::Falling,
                Box::new(move || match protocol::read_frame(&device) {
                    Ok(frame) => slot.publish(frame),
                    Err(e) => error!("Error reading frame in DRDY handler: {}", e),
                }),
            )
            .map_err(|e| DriverError::GpioError(format!("Failed to arm DRDY interrupt: {}", e)))?;

        self.armed = true;
        debug!("DRDY falling-edge handler armed");
        Ok(())
    }

    fn disarm(&mut self) -> Result<(), DriverError> {
        if !self.armed {
            return Ok(());
        }
        self.drdy
            .clear_async_interrupt()
            .map_err(|e| DriverError::GpioError(format!("Failed to clear DRDY interrupt: {}", e)))?;
        self.armed = false;
        debug!("DRDY falling-edge handler disarmed");
        Ok(())
    }

    fn try_get_frame(&mut self, _device: &BusDevice) -> Result<Option<SampleFrame>, DriverError> {
        Ok(self.slot.take())
    }

    fn frames_overwritten(&self) -> Option<u64> {
        Some(self.slot.overwritten())
    }
}

impl Drop for InterruptHandoff {
    fn drop(&mut self) {
        if self.armed {
            warn!("InterruptHandoff dropped while armed, clearing DRDY handler");
            if let Err(e) = self.disarm() {
                warn!("Failed to clear DRDY handler on drop: {}", e);
            }
        }
    }
}
