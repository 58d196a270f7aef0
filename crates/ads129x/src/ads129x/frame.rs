//! Sample frame decoding for the ADS129x data stream.

use log::trace;
use serde::Serialize;

use super::registers::{BYTES_PER_WORD, FRAME_BYTES, FRAME_WORDS, NUM_CHANNELS};
use crate::types::Gain;

/// One conversion result: the 24-bit status word and eight channel readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SampleFrame {
    /// Status word. Only the low 24 bits are ever set.
    pub status: u32,
    /// Channel readings, index 0 is channel 1.
    pub channels: [i32; NUM_CHANNELS],
}

impl SampleFrame {
    /// Reading of a 1-based channel.
    pub fn channel(&self, channel: u8) -> Option<i32> {
        match channel {
            1..=8 => Some(self.channels[channel as usize - 1]),
            _ => None,
        }
    }

    /// Flat layout: index 0 is the status word, 1..=8 are channels 1..=8.
    pub fn to_array(&self) -> [i32; FRAME_WORDS] {
        let mut words = [0i32; FRAME_WORDS];
        words[0] = self.status as i32;
        words[1..].copy_from_slice(&self.channels);
        words
    }

    /// Scale every channel to volts.
    pub fn to_voltages(&self, vref: f32, gains: &[Gain; NUM_CHANNELS]) -> [f32; NUM_CHANNELS] {
        let mut volts = [0.0f32; NUM_CHANNELS];
        for (i, v) in volts.iter_mut().enumerate() {
            *v = raw_to_voltage(self.channels[i], vref, gains[i].factor());
        }
        volts
    }
}

/// Convert 24-bit SPI data to a signed 32-bit integer (sign-extended)
pub fn sample_to_raw(msb: u8, mid: u8, lsb: u8) -> i32 {
    let raw_value = ((msb as u32) << 16) | ((mid as u32) << 8) | (lsb as u32);
    ((raw_value as i32) << 8) >> 8
}

/// Low 24 bits of `raw`, most significant byte first.
pub fn raw_to_bytes(raw: i32) -> [u8; BYTES_PER_WORD] {
    let bytes = raw.to_be_bytes();
    [bytes[1], bytes[2], bytes[3]]
}

/// Convert signed raw ADC value to voltage using VREF and gain
/// Formula: voltage = (raw * (VREF / Gain)) / 2^23
pub fn raw_to_voltage(raw: i32, vref: f32, gain: f32) -> f32 {
    ((raw as f64) * ((vref / gain) as f64) / (1 << 23) as f64) as f32
}

/// Decode one 27-byte frame as clocked out of the device.
pub fn decode_frame(raw: &[u8; FRAME_BYTES]) -> SampleFrame {
    trace!("Raw frame: {:02X?}", raw);

    let status = ((raw[0] as u32) << 16) | ((raw[1] as u32) << 8) | (raw[2] as u32);
    let mut channels = [0i32; NUM_CHANNELS];
    for (ch, word) in raw[BYTES_PER_WORD..].chunks_exact(BYTES_PER_WORD).enumerate() {
        channels[ch] = sample_to_raw(word[0], word[1], word[2]);
    }

    SampleFrame { status, channels }
}

/// Inverse of [`decode_frame`], used by the simulated device.
pub fn encode_frame(frame: &SampleFrame) -> [u8; FRAME_BYTES] {
    let mut raw = [0u8; FRAME_BYTES];
    let status = frame.status & 0x00FF_FFFF;
    raw[0] = (status >> 16) as u8;
    raw[1] = (status >> 8) as u8;
    raw[2] = status as u8;
    for (ch, &value) in frame.channels.iter().enumerate() {
        let start = BYTES_PER_WORD * (ch + 1);
        raw[start..start + BYTES_PER_WORD].copy_from_slice(&raw_to_bytes(value));
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn decodes_documented_words() {
        let mut raw = [0u8; FRAME_BYTES];
        raw[..9].copy_from_slice(&[0x00, 0x00, 0x01, 0xFF, 0xFF, 0xFF, 0x7F, 0xFF, 0xFF]);
        let frame = decode_frame(&raw);
        assert_eq!(frame.status, 1);
        assert_eq!(frame.channel(1), Some(-1));
        assert_eq!(frame.channel(2), Some(8_388_607));
        assert_eq!(frame.channel(3), Some(0));
        assert_eq!(frame.to_array()[..3], [1, -1, 8_388_607]);
    }

    #[test]
    fn status_word_is_not_sign_extended() {
        let mut raw = [0u8; FRAME_BYTES];
        raw[..3].copy_from_slice(&[0xC0, 0x00, 0x0F]);
        let frame = decode_frame(&raw);
        assert_eq!(frame.status, 0x00C0_000F);
        assert!(frame.to_array()[0] > 0);
    }

    #[test]
    fn extremes_of_the_24_bit_range() {
        assert_eq!(sample_to_raw(0x80, 0x00, 0x00), -8_388_608);
        assert_eq!(sample_to_raw(0x00, 0x00, 0x00), 0);
        assert_eq!(raw_to_bytes(-8_388_608), [0x80, 0x00, 0x00]);
    }

    #[test]
    fn channel_out_of_range() {
        let frame = SampleFrame::default();
        assert_eq!(frame.channel(0), None);
        assert_eq!(frame.channel(9), None);
    }

    #[test]
    fn full_scale_voltage() {
        let v = raw_to_voltage(8_388_607, 2.4, 1.0);
        assert!((v - 2.4).abs() < 1e-5);
        let frame = SampleFrame {
            status: 0,
            channels: [-8_388_608, 0, 0, 0, 0, 0, 0, 0],
        };
        let volts = frame.to_voltages(2.4, &[Gain::X12; 8]);
        assert!((volts[0] + 0.2).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn low_24_bits_survive_decoding(msb: u8, mid: u8, lsb: u8) {
            let raw = sample_to_raw(msb, mid, lsb);
            prop_assert_eq!(raw_to_bytes(raw), [msb, mid, lsb]);
        }

        #[test]
        fn sign_follows_bit_23(msb: u8, mid: u8, lsb: u8) {
            let raw = sample_to_raw(msb, mid, lsb);
            if msb & 0x80 != 0 {
                prop_assert!(raw < 0);
            } else {
                prop_assert!(raw >= 0);
            }
        }

        #[test]
        fn encoded_frames_decode_to_themselves(
            status in 0u32..0x0100_0000,
            channels in proptest::array::uniform8(-8_388_608i32..8_388_608),
        ) {
            let frame = SampleFrame { status, channels };
            prop_assert_eq!(decode_frame(&encode_frame(&frame)), frame);
        }
    }
}
