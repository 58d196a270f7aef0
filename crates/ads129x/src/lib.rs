pub mod ads129x;
pub mod config;
pub mod hal;
pub mod mock_hal;
#[cfg(feature = "pi-hardware")]
pub mod rppal_hal;
pub mod spi_bus;
pub mod types;

// Re-export the main types that users need
pub use ads129x::{
    Ads129xDriver, Ads129xDriverBuilder, AcquisitionState, DataReadyHandoff, FrameSlot,
    InterruptAds129x, PolledAds129x, SampleFrame,
};
pub use config::{load_config, ChannelConfig, DataReadyMode, DeviceConfig};
pub use spi_bus::{BusDevice, SpiBus};
pub use types::{DeviceId, DriverError, Gain, Mux, SampleRate};
