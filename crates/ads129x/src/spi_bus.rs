//! A thread-safe SPI bus abstraction for managing multiple devices on a single bus.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::hal::{BusSettings, ChipSelectPin, SpiPort};
use crate::DriverError;

/// Hold time between the last clocked byte and releasing chip select.
pub const CS_HOLD: Duration = Duration::from_micros(2);

/// Dummy bytes clocked out by [`Transaction::read`], one frame's worth at a time.
const READ_FILL: [u8; 32] = [0u8; 32];

/// A thread-safe wrapper around an SPI port.
/// Only one transaction, for any device on the bus, runs at a time.
#[derive(Clone)]
pub struct SpiBus {
    port: Arc<Mutex<Box<dyn SpiPort>>>,
    settings: BusSettings,
}

impl SpiBus {
    pub fn new<P: SpiPort>(port: P, settings: BusSettings) -> Self {
        Self {
            port: Arc::new(Mutex::new(Box::new(port))),
            settings,
        }
    }

    pub fn settings(&self) -> &BusSettings {
        &self.settings
    }

    /// Attach a device, identified by its chip-select line, to this bus.
    pub fn device<C: ChipSelectPin>(&self, chip_select: C) -> BusDevice {
        BusDevice {
            bus: self.clone(),
            chip_select: Arc::new(Mutex::new(Box::new(chip_select))),
        }
    }
}

/// One chip on a shared [`SpiBus`]. Cloning yields another handle to the same chip.
#[derive(Clone)]
pub struct BusDevice {
    bus: SpiBus,
    chip_select: Arc<Mutex<Box<dyn ChipSelectPin>>>,
}

impl BusDevice {
    /// Run `f` as one exclusive transaction framed by chip select.
    pub fn transaction<T, F>(&self, f: F) -> Result<T, DriverError>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, DriverError>,
    {
        self.transaction_with_settle(None, f)
    }

    /// Like [`transaction`](Self::transaction), but keeps the bus for `settle`
    /// after chip select is released so no command can follow too early.
    pub fn transaction_with_settle<T, F>(
        &self,
        settle: Option<Duration>,
        f: F,
    ) -> Result<T, DriverError>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, DriverError>,
    {
        let mut port = self
            .bus
            .port
            .lock()
            .map_err(|_| DriverError::Other("SPI bus lock poisoned".to_string()))?;
        let mut chip_select = self
            .chip_select
            .lock()
            .map_err(|_| DriverError::Other("Chip select lock poisoned".to_string()))?;

        port.begin_transaction(&self.bus.settings)
            .map_err(|e| DriverError::SpiError(e.to_string()))?;

        chip_select.assert();
        let result = f(&mut Transaction { port: &mut *port });
        thread::sleep(CS_HOLD);
        chip_select.deassert();

        if let Some(settle) = settle {
            thread::sleep(settle);
        }
        let end = port
            .end_transaction()
            .map_err(|e| DriverError::SpiError(e.to_string()));

        let value = result?;
        end?;
        Ok(value)
    }
}

/// Byte transfers inside one chip-select frame.
pub struct Transaction<'a> {
    port: &'a mut Box<dyn SpiPort>,
}

impl Transaction<'_> {
    pub fn transfer_byte(&mut self, out: u8) -> Result<u8, DriverError> {
        self.port
            .transfer_byte(out)
            .map_err(|e| DriverError::SpiError(e.to_string()))
    }

    /// Clock out `bytes`, discarding what comes back.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), DriverError> {
        for &byte in bytes {
            self.transfer_byte(byte)?;
        }
        Ok(())
    }

    /// Fill `buffer` while clocking out zeros.
    pub fn read(&mut self, buffer: &mut [u8]) -> Result<(), DriverError> {
        for chunk in buffer.chunks_mut(READ_FILL.len()) {
            self.port
                .transfer(chunk, &READ_FILL[..chunk.len()])
                .map_err(|e| DriverError::SpiError(e.to_string()))?;
        }
        Ok(())
    }

    /// Inter-byte gap required by some opcodes.
    pub fn delay(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    /// Echoes a counter and records every transfer call.
    struct CountingPort {
        calls: Arc<Mutex<Vec<Vec<u8>>>>,
        next: u8,
    }

    impl SpiPort for CountingPort {
        fn transfer_byte(&mut self, _out: u8) -> Result<u8, io::Error> {
            self.next = self.next.wrapping_add(1);
            Ok(self.next)
        }

        fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), io::Error> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(write.to_vec());
            }
            for byte in read.iter_mut() {
                *byte = self.transfer_byte(0)?;
            }
            Ok(())
        }
    }

    struct NoopChipSelect;

    impl ChipSelectPin for NoopChipSelect {
        fn assert(&mut self) {}
        fn deassert(&mut self) {}
    }

    fn device() -> (BusDevice, Arc<Mutex<Vec<Vec<u8>>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let port = CountingPort {
            calls: Arc::clone(&calls),
            next: 0,
        };
        let bus = SpiBus::new(port, BusSettings::default());
        (bus.device(NoopChipSelect), calls)
    }

    #[test]
    fn frame_read_is_one_transfer_of_zeros() {
        let (device, calls) = device();
        let mut frame = [0u8; 27];
        device.transaction(|tx| tx.read(&mut frame)).unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(*calls, vec![vec![0u8; 27]]);
        assert_eq!(frame[0], 1);
        assert_eq!(frame[26], 27);
    }

    #[test]
    fn long_read_is_split_and_filled_in_order() {
        let (device, calls) = device();
        let mut buffer = [0u8; 70];
        device.transaction(|tx| tx.read(&mut buffer)).unwrap();

        let calls = calls.lock().unwrap();
        let lengths: Vec<usize> = calls.iter().map(Vec::len).collect();
        assert_eq!(lengths, vec![32, 32, 6]);
        assert!(calls.iter().flatten().all(|&b| b == 0));
        assert!(buffer.iter().enumerate().all(|(i, &b)| b as usize == i + 1));
    }
}
