//! Main driver implementation for the ADS129x chip.

use log::{debug, info, warn};

use super::frame::SampleFrame;
use super::handoff::{DataReadyHandoff, InterruptHandoff, PolledHandoff};
use super::protocol::{self, Command};
use super::registers::*;
use super::state::AcquisitionState;
use crate::config::DeviceConfig;
use crate::spi_bus::BusDevice;
use crate::types::{DeviceId, DriverError, Gain, Mux, SampleRate};

/// Handle for one ADS129x on a shared SPI bus.
///
/// `H` decides how data-ready events are handled, see [`DataReadyHandoff`].
pub struct Ads129xDriver<H: DataReadyHandoff> {
    device: BusDevice,
    handoff: H,
    state: AcquisitionState,
}

/// Driver that checks the DRDY level on every retrieval attempt.
pub type PolledAds129x = Ads129xDriver<PolledHandoff>;
/// Driver that collects frames from a DRDY falling-edge handler.
pub type InterruptAds129x = Ads129xDriver<InterruptHandoff>;

impl<H: DataReadyHandoff> Ads129xDriver<H> {
    /// The device is assumed freshly powered: not converting, in RDATAC mode.
    pub fn new(device: BusDevice, handoff: H) -> Self {
        Self {
            device,
            handoff,
            state: AcquisitionState::ContinuousIdle,
        }
    }

    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    pub fn handoff(&self) -> &H {
        &self.handoff
    }

    /// Exit standby mode.
    pub fn wakeup(&mut self) -> Result<(), DriverError> {
        self.command(Command::Wakeup)
    }

    /// Enter standby mode.
    pub fn standby(&mut self) -> Result<(), DriverError> {
        self.command(Command::Standby)
    }

    /// Reset registers to their defaults. Blocks for the reset settle time.
    ///
    /// The device comes back in continuous-read mode; call
    /// [`stop_continuous`](Self::stop_continuous) before register access.
    pub fn reset(&mut self) -> Result<(), DriverError> {
        self.command(Command::Reset)
    }

    /// Start (or resynchronize) conversions.
    pub fn start(&mut self) -> Result<(), DriverError> {
        self.command(Command::Start)
    }

    pub fn stop(&mut self) -> Result<(), DriverError> {
        self.command(Command::Stop)
    }

    /// Enter continuous-read mode and arm data-ready handling.
    pub fn read_continuous(&mut self) -> Result<(), DriverError> {
        self.command(Command::ReadContinuous)
    }

    pub fn stop_continuous(&mut self) -> Result<(), DriverError> {
        self.command(Command::StopContinuous)
    }

    /// Read one frame by command (RDATA). Only while converting outside
    /// continuous-read mode.
    pub fn read_once(&mut self) -> Result<SampleFrame, DriverError> {
        self.state = self.state.transition(Command::ReadData)?;
        protocol::read_data_by_command(&self.device)
    }

    pub fn read_register(&mut self, address: u8) -> Result<u8, DriverError> {
        self.state.check_register_access("read_register")?;
        protocol::read_register(&self.device, address)
    }

    /// Burst read of `count` registers starting at `address`.
    ///
    /// Rejected while in continuous-read mode; call
    /// [`stop_continuous`](Self::stop_continuous) first.
    pub fn read_registers(&mut self, address: u8, count: u8) -> Result<Vec<u8>, DriverError> {
        self.state.check_register_access("read_registers")?;
        protocol::read_registers(&self.device, address, count)
    }

    pub fn write_register(&mut self, address: u8, value: u8) -> Result<(), DriverError> {
        self.state.check_register_access("write_register")?;
        protocol::write_register(&self.device, address, value)
    }

    /// Read and decode the ID register.
    pub fn read_device_id(&mut self) -> Result<DeviceId, DriverError> {
        self.state.check_register_access("read_device_id")?;
        let id = protocol::read_register(&self.device, REG_ID_ADDR)?;
        Ok(DeviceId::from_id_byte(id))
    }

    /// Latest frame, if a new one is available. Never blocks.
    pub fn try_get_frame(&mut self) -> Result<Option<SampleFrame>, DriverError> {
        self.handoff.try_get_frame(&self.device)
    }

    pub fn frames_overwritten(&self) -> Option<u64> {
        self.handoff.frames_overwritten()
    }

    /// Fill `buffer` with status + 8 channels. Returns whether a frame was available.
    pub fn get_data(&mut self, buffer: &mut [i32; FRAME_WORDS]) -> Result<bool, DriverError> {
        match self.try_get_frame()? {
            Some(frame) => {
                *buffer = frame.to_array();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Write the CHnSET register of a 1-based `channel`.
    pub fn configure_channel(
        &mut self,
        channel: u8,
        power_down: bool,
        gain: Gain,
        mux: Mux,
    ) -> Result<(), DriverError> {
        let address = chnset_address(channel).ok_or_else(|| {
            DriverError::ConfigurationError(format!(
                "Invalid channel: {}. Channels are numbered 1-8",
                channel
            ))
        })?;
        let value = channel_settings(power_down, gain.code(), mux.code());
        self.write_register(address, value)
    }

    /// Change the output data rate, keeping the other CONFIG1 bits.
    pub fn set_sample_rate(&mut self, rate: SampleRate) -> Result<(), DriverError> {
        let config1 = self.read_register(CONFIG1_ADDR)?;
        let value = (config1 & !CONFIG1_DR_MASK) | rate.code();
        self.write_register(CONFIG1_ADDR, value)
    }

    /// Read the whole register map in one burst and log it.
    pub fn dump_registers(&mut self) -> Result<Vec<u8>, DriverError> {
        let values = self.read_registers(REG_ID_ADDR, REGISTER_COUNT as u8)?;
        info!("----Register Dump----");
        for (address, value) in values.iter().enumerate() {
            info!(
                "Reg 0x{:02X} ({:<10}): 0x{:02X}",
                address,
                register_name(address as u8),
                value
            );
        }
        info!("----End Register Dump----");
        Ok(values)
    }

    /// Bring the chip from power-up into a configured, idle state.
    ///
    /// An unrecognized ID is logged and returned, not treated as fatal.
    pub fn initialize(&mut self, config: &DeviceConfig) -> Result<DeviceId, DriverError> {
        config.validate()?;

        self.reset()?;
        // RESET re-enters RDATAC, where register access is ignored
        self.stop_continuous()?;

        let id = self.read_device_id()?;
        match id {
            DeviceId::Unrecognized(byte) => {
                warn!("Unrecognized device ID 0x{:02X}, continuing", byte)
            }
            id => info!("Found {:?} with {:?} channels", id, id.channel_count()),
        }

        self.set_sample_rate(config.sample_rate)?;

        for channel in 1..=NUM_CHANNELS as u8 {
            match config.channel(channel) {
                Some(ch) => self.configure_channel(channel, ch.power_down, ch.gain, ch.mux)?,
                None => {
                    let address = CH1SET_ADDR + (channel - 1);
                    self.write_register(address, CH_POWER_OFF)?;
                }
            }
        }

        self.dump_registers()?;
        Ok(id)
    }

    /// Leave continuous-read mode, stop converting and enter standby.
    pub fn shutdown(&mut self) -> Result<(), DriverError> {
        debug!("Shutting down Ads129xDriver");
        if self.state.is_streaming() {
            self.stop_continuous()?;
        }
        self.stop()?;
        self.standby()?;
        info!("Ads129xDriver shutdown complete");
        Ok(())
    }

    fn command(&mut self, command: Command) -> Result<(), DriverError> {
        let next = self.state.transition(command)?;
        let leaving_stream = self.state.is_streaming() && !next.is_streaming();
        let entering_stream = !self.state.is_streaming() && next.is_streaming();

        // The handler must not read frames after the device has left RDATAC.
        if leaving_stream {
            self.handoff.disarm()?;
        }

        if let Err(e) = protocol::send_command(&self.device, command) {
            if leaving_stream {
                self.handoff.arm(&self.device)?;
            }
            return Err(e);
        }

        debug!("{}: {:?} -> {:?}", command.name(), self.state, next);
        self.state = next;

        if entering_stream {
            self.handoff.arm(&self.device)?;
        }
        Ok(())
    }
}
