//! Command and register protocol of the ADS129x on top of a [`BusDevice`].
//!
//! Every function here is one chip-select framed, exclusive bus transaction.

use std::time::Duration;

use log::debug;

use super::frame::{decode_frame, SampleFrame};
use super::registers::*;
use crate::spi_bus::BusDevice;
use crate::types::DriverError;

/// Wait after WAKEUP and RDATAC, at least 4 tCLK.
pub const COMMAND_SETTLE: Duration = Duration::from_micros(2);
/// Wait after RESET, at least 18 tCLK.
pub const RESET_SETTLE: Duration = Duration::from_millis(10);
/// Gap between the RREG opcode and the first register byte.
pub const RREG_DATA_GAP: Duration = Duration::from_micros(1);

/// Single-byte system and data commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Wakeup,
    Standby,
    Reset,
    Start,
    Stop,
    ReadContinuous,
    StopContinuous,
    ReadData,
}

impl Command {
    pub fn opcode(self) -> u8 {
        match self {
            Command::Wakeup => CMD_WAKEUP,
            Command::Standby => CMD_STANDBY,
            Command::Reset => CMD_RESET,
            Command::Start => CMD_START,
            Command::Stop => CMD_STOP,
            Command::ReadContinuous => CMD_RDATAC,
            Command::StopContinuous => CMD_SDATAC,
            Command::ReadData => CMD_RDATA,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::Wakeup => "WAKEUP",
            Command::Standby => "STANDBY",
            Command::Reset => "RESET",
            Command::Start => "START",
            Command::Stop => "STOP",
            Command::ReadContinuous => "RDATAC",
            Command::StopContinuous => "SDATAC",
            Command::ReadData => "RDATA",
        }
    }

    /// Minimum time before the next command may be issued.
    pub fn settle_time(self) -> Option<Duration> {
        match self {
            Command::Reset => Some(RESET_SETTLE),
            Command::Wakeup | Command::ReadContinuous => Some(COMMAND_SETTLE),
            _ => None,
        }
    }
}

fn check_address(address: u8) -> Result<(), DriverError> {
    if is_valid_address(address) {
        Ok(())
    } else {
        Err(DriverError::InvalidRegister(address))
    }
}

/// Send a single-byte command.
pub fn send_command(device: &BusDevice, command: Command) -> Result<(), DriverError> {
    debug!("Sending {} (0x{:02X})", command.name(), command.opcode());
    device.transaction_with_settle(command.settle_time(), |tx| tx.write(&[command.opcode()]))
}

/// RREG of one register.
pub fn read_register(device: &BusDevice, address: u8) -> Result<u8, DriverError> {
    check_address(address)?;
    let opcode = CMD_RREG | (address & ADDRESS_MASK);

    device.transaction(|tx| {
        tx.write(&[opcode, 0x00])?;
        tx.delay(RREG_DATA_GAP);
        tx.transfer_byte(0x00)
    })
}

/// Burst RREG of `count` consecutive registers.
///
/// The frame opens with SDATAC, since burst reads are not decoded while the
/// device is in continuous-read mode. Callers must have left continuous-read
/// mode through the driver already; this prefix only covers the power-up
/// default, which is continuous-read.
pub fn read_registers(device: &BusDevice, address: u8, count: u8) -> Result<Vec<u8>, DriverError> {
    check_address(address)?;
    if count == 0 || address as usize + count as usize > REGISTER_COUNT {
        return Err(DriverError::ConfigurationError(format!(
            "Cannot read {} registers starting at 0x{:02X}",
            count, address
        )));
    }
    let opcode = CMD_RREG | (address & ADDRESS_MASK);

    device.transaction(|tx| {
        tx.write(&[CMD_SDATAC, opcode, count - 1])?;
        let mut values = vec![0u8; count as usize];
        tx.read(&mut values)?;
        Ok(values)
    })
}

/// WREG of one register.
pub fn write_register(device: &BusDevice, address: u8, value: u8) -> Result<(), DriverError> {
    check_address(address)?;
    if is_read_only(address) {
        return Err(DriverError::ReadOnlyRegister(address));
    }
    let opcode = CMD_WREG | (address & ADDRESS_MASK);

    debug!("WREG {} (0x{:02X}) = 0x{:02X}", register_name(address), address, value);
    device.transaction(|tx| tx.write(&[opcode, 0x00, value]))
}

/// Clock one frame out of the device. Used when DRDY has signalled a frame.
pub fn read_frame(device: &BusDevice) -> Result<SampleFrame, DriverError> {
    let mut raw = [0u8; FRAME_BYTES];
    device.transaction(|tx| tx.read(&mut raw))?;
    Ok(decode_frame(&raw))
}

/// RDATA followed by one frame, in the same chip-select frame.
pub fn read_data_by_command(device: &BusDevice) -> Result<SampleFrame, DriverError> {
    let mut raw = [0u8; FRAME_BYTES];
    device.transaction(|tx| {
        tx.write(&[CMD_RDATA])?;
        tx.read(&mut raw)
    })?;
    Ok(decode_frame(&raw))
}
