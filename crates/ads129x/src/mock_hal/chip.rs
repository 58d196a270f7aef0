//! A simulated ADS129x that speaks the command protocol byte by byte.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, trace};

use crate::ads129x::registers::*;
use crate::hal::{BusSettings, ChipSelectPin, Edge, InterruptCallback, InterruptPin, SpiPort};

/// Register contents after power-up or RESET.
fn default_registers(id: u8) -> [u8; REGISTER_COUNT] {
    let mut registers = [0u8; REGISTER_COUNT];
    registers[REG_ID_ADDR as usize] = id;
    registers[CONFIG1_ADDR as usize] = 0x06;
    registers[CONFIG2_ADDR as usize] = 0x40;
    registers[CONFIG3_ADDR as usize] = 0x40;
    registers[GPIO_ADDR as usize] = 0x0F;
    registers
}

/// What the next MOSI byte means.
#[derive(Debug, Clone, Copy)]
enum Decode {
    Opcode,
    RregCount { address: u8 },
    RregData { remaining: usize },
    WregCount { address: u8 },
    WregData { address: u8, remaining: usize },
}

struct ChipState {
    registers: [u8; REGISTER_COUNT],
    continuous: bool,
    converting: bool,
    standby: bool,
    latched: Option<[u8; FRAME_BYTES]>,
    decode: Decode,
    miso: VecDeque<u8>,
    current: Vec<u8>,
    transactions: Vec<Vec<u8>>,
    settings: Vec<BusSettings>,
    cs_asserted: bool,
    overlapping_frames: usize,
    unframed_bytes: usize,
}

impl ChipState {
    fn new(id: u8) -> Self {
        Self {
            registers: default_registers(id),
            // RDATAC is the power-up default
            continuous: true,
            converting: false,
            standby: false,
            latched: None,
            decode: Decode::Opcode,
            miso: VecDeque::new(),
            current: Vec::new(),
            transactions: Vec::new(),
            settings: Vec::new(),
            cs_asserted: false,
            overlapping_frames: 0,
            unframed_bytes: 0,
        }
    }

    fn begin_frame(&mut self, drdy: &DrdyLine) {
        if self.cs_asserted {
            self.overlapping_frames += 1;
        }
        self.cs_asserted = true;
        self.current.clear();
        self.miso.clear();
        self.decode = Decode::Opcode;

        // In RDATAC mode the latched conversion shifts out from the first SCLK.
        if self.continuous {
            if let Some(frame) = self.latched.take() {
                self.miso.extend(frame);
                drdy.set_high(true);
            }
        }
    }

    fn end_frame(&mut self) {
        self.cs_asserted = false;
        let bytes = std::mem::take(&mut self.current);
        trace!("Simulated ADS129x frame: {:02X?}", bytes);
        self.transactions.push(bytes);
    }

    fn exchange(&mut self, mosi: u8, drdy: &DrdyLine) -> u8 {
        if !self.cs_asserted {
            self.unframed_bytes += 1;
        }
        let out = self.miso.pop_front().unwrap_or(0);
        self.current.push(mosi);
        self.decode(mosi, drdy);
        out
    }

    fn decode(&mut self, byte: u8, drdy: &DrdyLine) {
        let decode = self.decode;
        self.decode = match decode {
            Decode::Opcode => self.opcode(byte, drdy),
            Decode::RregCount { address } => {
                let count = (byte as usize & 0x1F) + 1;
                if !self.continuous {
                    for offset in 0..count {
                        let value = self
                            .registers
                            .get(address as usize + offset)
                            .copied()
                            .unwrap_or(0);
                        self.miso.push_back(value);
                    }
                }
                Decode::RregData { remaining: count }
            }
            Decode::RregData { remaining } if remaining > 1 => Decode::RregData {
                remaining: remaining - 1,
            },
            Decode::RregData { .. } => Decode::Opcode,
            Decode::WregCount { address } => Decode::WregData {
                address,
                remaining: (byte as usize & 0x1F) + 1,
            },
            Decode::WregData { address, remaining } => {
                if !self.continuous && !is_read_only(address) && is_valid_address(address) {
                    self.registers[address as usize] = byte;
                }
                if remaining > 1 {
                    Decode::WregData {
                        address: address + 1,
                        remaining: remaining - 1,
                    }
                } else {
                    Decode::Opcode
                }
            }
        };
    }

    fn opcode(&mut self, byte: u8, drdy: &DrdyLine) -> Decode {
        match byte {
            CMD_WAKEUP => self.standby = false,
            CMD_STANDBY => self.standby = true,
            CMD_RESET => {
                let id = self.registers[REG_ID_ADDR as usize];
                self.registers = default_registers(id);
                self.continuous = true;
                self.converting = false;
                self.latched = None;
                drdy.set_high(true);
            }
            CMD_START => self.converting = true,
            CMD_STOP => self.converting = false,
            CMD_RDATAC => self.continuous = true,
            CMD_SDATAC => self.continuous = false,
            CMD_RDATA => {
                let frame = self.latched.take().unwrap_or([0u8; FRAME_BYTES]);
                self.miso.extend(frame);
                drdy.set_high(true);
            }
            b if b & 0xE0 == CMD_RREG => {
                return Decode::RregCount {
                    address: b & ADDRESS_MASK,
                }
            }
            b if b & 0xE0 == CMD_WREG => {
                return Decode::WregCount {
                    address: b & ADDRESS_MASK,
                }
            }
            // NOP / dummy byte
            _ => {}
        }
        Decode::Opcode
    }
}

struct DrdyLine {
    high: AtomicBool,
    handler: Mutex<Option<(Edge, InterruptCallback)>>,
}

impl DrdyLine {
    fn set_high(&self, high: bool) {
        self.high.store(high, Ordering::SeqCst);
    }
}

/// Simulated device. Hand its pieces to the driver with [`spi`](Self::spi),
/// [`chip_select`](Self::chip_select) and [`drdy_pin`](Self::drdy_pin).
#[derive(Clone)]
pub struct SimulatedAds129x {
    state: Arc<Mutex<ChipState>>,
    drdy: Arc<DrdyLine>,
}

impl SimulatedAds129x {
    /// A simulated chip whose ID register reads `id`.
    pub fn new(id: u8) -> Self {
        Self {
            state: Arc::new(Mutex::new(ChipState::new(id))),
            drdy: Arc::new(DrdyLine {
                high: AtomicBool::new(true),
                handler: Mutex::new(None),
            }),
        }
    }

    /// An eight-channel ADS1298.
    pub fn ads1298() -> Self {
        Self::new(ID_ADS1298)
    }

    fn state(&self) -> MutexGuard<'_, ChipState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn spi(&self) -> MockSpi {
        MockSpi { chip: self.clone() }
    }

    pub fn chip_select(&self) -> MockChipSelect {
        MockChipSelect { chip: self.clone() }
    }

    pub fn drdy_pin(&self) -> MockDrdyPin {
        MockDrdyPin { chip: self.clone() }
    }

    /// Finish a conversion: latch `frame`, pull DRDY low and run the
    /// falling-edge handler, if one is installed, on the calling thread.
    pub fn latch_frame(&self, frame: [u8; FRAME_BYTES]) {
        {
            let mut state = self.state();
            state.latched = Some(frame);
        }
        self.drdy.set_high(false);

        let mut handler = self
            .drdy
            .handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some((Edge::Falling | Edge::Both, callback)) = handler.as_mut() {
            callback();
        }
    }

    pub fn drdy_is_high(&self) -> bool {
        self.drdy.high.load(Ordering::SeqCst)
    }

    pub fn has_interrupt_handler(&self) -> bool {
        self.drdy
            .handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn register(&self, address: u8) -> u8 {
        self.state().registers[address as usize]
    }

    pub fn set_register(&self, address: u8, value: u8) {
        self.state().registers[address as usize] = value;
    }

    pub fn is_continuous(&self) -> bool {
        self.state().continuous
    }

    pub fn is_converting(&self) -> bool {
        self.state().converting
    }

    pub fn is_standby(&self) -> bool {
        self.state().standby
    }

    /// MOSI bytes of every completed chip-select frame, oldest first.
    pub fn transactions(&self) -> Vec<Vec<u8>> {
        self.state().transactions.clone()
    }

    pub fn clear_transactions(&self) {
        self.state().transactions.clear();
    }

    /// Settings passed to every `begin_transaction`, oldest first.
    pub fn bus_settings(&self) -> Vec<BusSettings> {
        self.state().settings.clone()
    }

    /// Chip select asserted while already asserted.
    pub fn overlapping_frames(&self) -> usize {
        self.state().overlapping_frames
    }

    /// Bytes clocked without chip select asserted.
    pub fn unframed_bytes(&self) -> usize {
        self.state().unframed_bytes
    }
}

/// SPI port wired to a [`SimulatedAds129x`].
pub struct MockSpi {
    chip: SimulatedAds129x,
}

impl SpiPort for MockSpi {
    fn begin_transaction(&mut self, settings: &BusSettings) -> Result<(), io::Error> {
        self.chip.state().settings.push(*settings);
        Ok(())
    }

    fn transfer_byte(&mut self, out: u8) -> Result<u8, io::Error> {
        let drdy = Arc::clone(&self.chip.drdy);
        Ok(self.chip.state().exchange(out, &drdy))
    }
}

pub struct MockChipSelect {
    chip: SimulatedAds129x,
}

impl ChipSelectPin for MockChipSelect {
    fn assert(&mut self) {
        let drdy = Arc::clone(&self.chip.drdy);
        self.chip.state().begin_frame(&drdy);
    }

    fn deassert(&mut self) {
        self.chip.state().end_frame();
    }
}

pub struct MockDrdyPin {
    chip: SimulatedAds129x,
}

impl InterruptPin for MockDrdyPin {
    fn is_high(&self) -> bool {
        self.chip.drdy_is_high()
    }

    fn set_async_interrupt(&mut self, edge: Edge, callback: InterruptCallback)
        -> Result<(), io::Error> {
        debug!("Mock DRDY handler installed for {:?} edge", edge);
        *self
            .chip
            .drdy
            .handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some((edge, callback));
        Ok(())
    }

    fn clear_async_interrupt(&mut self) -> Result<(), io::Error> {
        *self
            .chip
            .drdy
            .handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(chip: &SimulatedAds129x, mosi: &[u8]) -> Vec<u8> {
        let mut cs = chip.chip_select();
        let mut spi = chip.spi();
        cs.assert();
        let miso = mosi.iter().map(|&b| spi.transfer_byte(b).unwrap()).collect();
        cs.deassert();
        miso
    }

    #[test]
    fn register_access_ignored_in_rdatac() {
        let chip = SimulatedAds129x::ads1298();
        assert_eq!(frame(&chip, &[CMD_RREG, 0x00, 0x00]), vec![0, 0, 0]);
        frame(&chip, &[CMD_SDATAC]);
        assert_eq!(frame(&chip, &[CMD_RREG, 0x00, 0x00])[2], ID_ADS1298);
    }

    #[test]
    fn wreg_then_rreg() {
        let chip = SimulatedAds129x::ads1298();
        frame(&chip, &[CMD_SDATAC]);
        frame(&chip, &[CMD_WREG | CONFIG4_ADDR, 0x00, 0x0A]);
        assert_eq!(chip.register(CONFIG4_ADDR), 0x0A);
        // read-only registers keep their value
        frame(&chip, &[CMD_WREG | REG_ID_ADDR, 0x00, 0x55]);
        assert_eq!(chip.register(REG_ID_ADDR), ID_ADS1298);
    }

    #[test]
    fn latched_frame_shifts_out_in_rdatac() {
        let chip = SimulatedAds129x::ads1298();
        let mut raw = [0u8; FRAME_BYTES];
        raw[0] = 0xC0;
        raw[26] = 0x42;
        chip.latch_frame(raw);
        assert!(!chip.drdy_is_high());
        let miso = frame(&chip, &[0u8; FRAME_BYTES]);
        assert_eq!(miso, raw.to_vec());
        assert!(chip.drdy_is_high());
    }

    #[test]
    fn reset_restores_defaults() {
        let chip = SimulatedAds129x::ads1298();
        frame(&chip, &[CMD_SDATAC, CMD_START]);
        chip.set_register(CONFIG1_ADDR, 0x86);
        frame(&chip, &[CMD_RESET]);
        assert_eq!(chip.register(CONFIG1_ADDR), 0x06);
        assert!(chip.is_continuous());
        assert!(!chip.is_converting());
    }

    #[test]
    fn counts_framing_violations() {
        let chip = SimulatedAds129x::ads1298();
        chip.spi().transfer_byte(0x00).unwrap();
        assert_eq!(chip.unframed_bytes(), 1);
        let mut cs = chip.chip_select();
        cs.assert();
        cs.assert();
        assert_eq!(chip.overlapping_frames(), 1);
    }
}
