//! Simulated ADS129x for tests and `--mock` runs.

mod chip;
mod generator;

pub use chip::{MockChipSelect, MockDrdyPin, MockSpi, SimulatedAds129x};
pub use generator::{FrameGenerator, SignalModel, STATUS_SYNC};
