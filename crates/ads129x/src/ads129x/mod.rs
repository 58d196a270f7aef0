pub mod builder;
pub mod driver;
pub mod frame;
pub mod handoff;
pub mod protocol;
pub mod registers;
pub mod state;

pub use builder::Ads129xDriverBuilder;
pub use driver::{Ads129xDriver, InterruptAds129x, PolledAds129x};
pub use frame::SampleFrame;
pub use handoff::{DataReadyHandoff, FrameSlot, InterruptHandoff, PolledHandoff};
pub use protocol::Command;
pub use state::AcquisitionState;
