//! Register definitions and command opcodes for the ADS129x family.

// ADS129x Commands
pub const CMD_WAKEUP: u8 = 0x02;
pub const CMD_STANDBY: u8 = 0x04;
pub const CMD_RESET: u8 = 0x06;
pub const CMD_START: u8 = 0x08;
pub const CMD_STOP: u8 = 0x0A;
pub const CMD_RDATAC: u8 = 0x10;
pub const CMD_SDATAC: u8 = 0x11;
pub const CMD_RDATA: u8 = 0x12;
pub const CMD_RREG: u8 = 0x20; // 001r rrrr
pub const CMD_WREG: u8 = 0x40; // 010r rrrr

/// Address bits of the RREG/WREG opcode.
pub const ADDRESS_MASK: u8 = 0x1F;

// Register Addresses
pub const REG_ID_ADDR: u8 = 0x00;
pub const CONFIG1_ADDR: u8 = 0x01;
pub const CONFIG2_ADDR: u8 = 0x02;
pub const CONFIG3_ADDR: u8 = 0x03;
pub const LOFF_ADDR: u8 = 0x04;
pub const CH1SET_ADDR: u8 = 0x05;
pub const CH8SET_ADDR: u8 = 0x0C;
pub const RLD_SENSP_ADDR: u8 = 0x0D;
pub const RLD_SENSN_ADDR: u8 = 0x0E;
pub const LOFF_SENSP_ADDR: u8 = 0x0F;
pub const LOFF_SENSN_ADDR: u8 = 0x10;
pub const LOFF_FLIP_ADDR: u8 = 0x11;
pub const LOFF_STATP_ADDR: u8 = 0x12; // read-only
pub const LOFF_STATN_ADDR: u8 = 0x13; // read-only
pub const GPIO_ADDR: u8 = 0x14;
pub const PACE_ADDR: u8 = 0x15;
pub const RESP_ADDR: u8 = 0x16;
pub const CONFIG4_ADDR: u8 = 0x17;
pub const WCT1_ADDR: u8 = 0x18;
pub const WCT2_ADDR: u8 = 0x19;

/// Highest documented register address.
pub const LAST_REGISTER_ADDR: u8 = WCT2_ADDR;
pub const REGISTER_COUNT: usize = LAST_REGISTER_ADDR as usize + 1;

pub const REGISTER_NAMES: [&str; REGISTER_COUNT] = [
    "ID", "CONFIG1", "CONFIG2", "CONFIG3", "LOFF", "CH1SET", "CH2SET", "CH3SET", "CH4SET",
    "CH5SET", "CH6SET", "CH7SET", "CH8SET", "RLD_SENSP", "RLD_SENSN", "LOFF_SENSP", "LOFF_SENSN",
    "LOFF_FLIP", "LOFF_STATP", "LOFF_STATN", "GPIO", "PACE", "RESP", "CONFIG4", "WCT1", "WCT2",
];

// IDs
pub const ID_ADS1294: u8 = 0x90;
pub const ID_ADS1296: u8 = 0x91;
pub const ID_ADS1298: u8 = 0x92;
pub const ID_ADS1294R: u8 = 0xD0;
pub const ID_ADS1296R: u8 = 0xD1;
pub const ID_ADS1298R: u8 = 0xD2;

// Channel settings (CHnSET)
pub const CH_PD: u8 = 1 << 7;
pub const CH_GAIN_SHIFT: u8 = 4;
pub const CH_GAIN_MASK: u8 = 0x7;
pub const CH_MUX_MASK: u8 = 0x7;
/// Powered down with the input shorted, the recommended state for unused channels.
pub const CH_POWER_OFF: u8 = 0x81;

// Configuration Register 1
pub const CONFIG1_DR_MASK: u8 = 0x07;

/// Number of 24-bit words in one sample frame: status + 8 channels.
pub const FRAME_WORDS: usize = 9;
pub const BYTES_PER_WORD: usize = 3;
pub const FRAME_BYTES: usize = FRAME_WORDS * BYTES_PER_WORD;
pub const NUM_CHANNELS: usize = 8;

pub fn is_valid_address(address: u8) -> bool {
    address <= LAST_REGISTER_ADDR
}

pub fn is_read_only(address: u8) -> bool {
    matches!(address, REG_ID_ADDR | LOFF_STATP_ADDR | LOFF_STATN_ADDR)
}

pub fn register_name(address: u8) -> &'static str {
    REGISTER_NAMES
        .get(address as usize)
        .copied()
        .unwrap_or("Unknown")
}

/// Address of the CHnSET register for a 1-based channel number.
pub fn chnset_address(channel: u8) -> Option<u8> {
    match channel {
        1..=8 => Some(CH1SET_ADDR + (channel - 1)),
        _ => None,
    }
}

/// Compose a CHnSET value from its fields.
pub fn channel_settings(power_down: bool, gain: u8, mux: u8) -> u8 {
    let pd = if power_down { CH_PD } else { 0 };
    pd | ((gain & CH_GAIN_MASK) << CH_GAIN_SHIFT) | (mux & CH_MUX_MASK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_settings_packs_fields() {
        assert_eq!(channel_settings(false, 0x6, 0x0), 0b0110_0000);
        assert_eq!(channel_settings(true, 0x0, 0x1), CH_POWER_OFF);
        // out-of-range codes are truncated to their field width
        assert_eq!(channel_settings(false, 0xF, 0xF), 0x77);
    }

    #[test]
    fn chnset_addresses() {
        assert_eq!(chnset_address(1), Some(CH1SET_ADDR));
        assert_eq!(chnset_address(8), Some(CH8SET_ADDR));
        assert_eq!(chnset_address(0), None);
        assert_eq!(chnset_address(9), None);
    }

    #[test]
    fn read_only_registers() {
        assert!(is_read_only(REG_ID_ADDR));
        assert!(is_read_only(LOFF_STATN_ADDR));
        assert!(!is_read_only(CONFIG1_ADDR));
        assert!(is_valid_address(WCT2_ADDR));
        assert!(!is_valid_address(0x1A));
        assert_eq!(register_name(CONFIG4_ADDR), "CONFIG4");
    }
}
