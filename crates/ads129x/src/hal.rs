//! Hardware abstraction for the SPI bus, chip-select line and DRDY line.

use std::io;

/// SPI clock polarity/phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpiMode {
    Mode0,
    Mode1,
    Mode2,
    Mode3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOrder {
    MsbFirst,
    LsbFirst,
}

/// Settings applied at the start of every exclusive bus transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusSettings {
    pub clock_speed_hz: u32,
    pub mode: SpiMode,
    pub bit_order: BitOrder,
}

impl BusSettings {
    /// ADS129x framing: CPOL=0, CPHA=1, MSB first.
    pub fn ads129x(clock_speed_hz: u32) -> Self {
        Self {
            clock_speed_hz,
            mode: SpiMode::Mode1,
            bit_order: BitOrder::MsbFirst,
        }
    }
}

impl Default for BusSettings {
    fn default() -> Self {
        Self::ads129x(4_000_000)
    }
}

/// Byte-level SPI port. Chip select is driven separately.
pub trait SpiPort: Send + 'static {
    /// Called once when a transaction takes ownership of the bus.
    fn begin_transaction(&mut self, _settings: &BusSettings) -> Result<(), io::Error> {
        Ok(())
    }

    /// Clock one byte out and return the byte clocked in.
    fn transfer_byte(&mut self, out: u8) -> Result<u8, io::Error>;

    /// Transfer data over SPI (simultaneous read/write)
    fn transfer(&mut self, read_buffer: &mut [u8], write_buffer: &[u8]) -> Result<(), io::Error> {
        for (read, &write) in read_buffer.iter_mut().zip(write_buffer) {
            *read = self.transfer_byte(write)?;
        }
        Ok(())
    }

    /// Called when the transaction releases the bus.
    fn end_transaction(&mut self) -> Result<(), io::Error> {
        Ok(())
    }
}

/// Active-low chip-select output.
pub trait ChipSelectPin: Send + 'static {
    fn assert(&mut self);
    fn deassert(&mut self);
}

/// Edge trigger types for interrupt pins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Falling,
    Rising,
    Both,
}

pub type InterruptCallback = Box<dyn FnMut() + Send + 'static>;

/// Trait for interrupt pin operations
pub trait InterruptPin: Send + 'static {
    /// Check if the pin is in a high state
    fn is_high(&self) -> bool;

    /// Run `callback` on a background context every time `edge` is seen.
    fn set_async_interrupt(&mut self, edge: Edge, callback: InterruptCallback)
        -> Result<(), io::Error>;

    /// Remove a callback installed with `set_async_interrupt`.
    fn clear_async_interrupt(&mut self) -> Result<(), io::Error>;
}

impl<T: InterruptPin + ?Sized> InterruptPin for Box<T> {
    fn is_high(&self) -> bool {
        (**self).is_high()
    }
    fn set_async_interrupt(&mut self, edge: Edge, callback: InterruptCallback)
        -> Result<(), io::Error> {
        (**self).set_async_interrupt(edge, callback)
    }
    fn clear_async_interrupt(&mut self) -> Result<(), io::Error> {
        (**self).clear_async_interrupt()
    }
}
