use std::f32::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use super::chip::SimulatedAds129x;
use crate::ads129x::frame::{encode_frame, SampleFrame};
use crate::ads129x::registers::{CONFIG1_ADDR, CONFIG1_DR_MASK, NUM_CHANNELS};

/// Status word of a frame with no lead-off and GPIO inputs low.
pub const STATUS_SYNC: u32 = 0xC0_0000;

/// Sinusoid plus gaussian noise per channel.
/// Channel n (1-based) carries a sine at 2 + 4 * (n - 1) Hz.
pub struct SignalModel {
    amplitude: f32,
    noise: Option<Normal<f32>>,
    rng: StdRng,
}

impl SignalModel {
    pub fn new(amplitude: f32, noise_std_dev: f32, seed: u64) -> Self {
        Self {
            amplitude,
            // negative or NaN deviation: noiseless
            noise: Normal::new(0.0, noise_std_dev).ok(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn frame_at(&mut self, t_secs: f32) -> SampleFrame {
        let mut channels = [0i32; NUM_CHANNELS];
        for (i, sample) in channels.iter_mut().enumerate() {
            let freq = 2.0 + i as f32 * 4.0;
            let noise = match &self.noise {
                Some(normal) => normal.sample(&mut self.rng),
                None => 0.0,
            };
            let value = (2.0 * PI * freq * t_secs).sin() * self.amplitude + noise;
            *sample = value.clamp(-8_388_608.0, 8_388_607.0) as i32;
        }
        SampleFrame {
            status: STATUS_SYNC,
            channels,
        }
    }
}

impl Default for SignalModel {
    fn default() -> Self {
        Self::new(2000.0 * 256.0, 200.0, 0x5EED)
    }
}

/// Latches frames into a [`SimulatedAds129x`] at its configured data rate
/// while it is converting, the way the real chip's ADC would.
pub struct FrameGenerator {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FrameGenerator {
    pub fn spawn(chip: SimulatedAds129x, mut model: SignalModel) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::spawn(move || {
            debug!("Mock frame generator started");
            let started = Instant::now();
            while flag.load(Ordering::SeqCst) {
                let rate_code = chip.register(CONFIG1_ADDR) & CONFIG1_DR_MASK;
                let hz = 16u32 << rate_code.min(6);
                let period = Duration::from_secs(1) / hz;

                if chip.is_converting() && !chip.is_standby() {
                    let t = started.elapsed().as_secs_f32();
                    let frame = model.frame_at(t);
                    trace!("Mock frame at t={:.4}s", t);
                    chip.latch_frame(encode_frame(&frame));
                }
                thread::sleep(period);
            }
            debug!("Mock frame generator stopped");
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for FrameGenerator {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_stays_in_24_bit_range() {
        let mut model = SignalModel::new(9_000_000.0, 0.0, 1);
        for n in 0..100 {
            let frame = model.frame_at(n as f32 / 250.0);
            assert_eq!(frame.status, STATUS_SYNC);
            assert!(frame
                .channels
                .iter()
                .all(|&c| (-8_388_608..=8_388_607).contains(&c)));
        }
    }

    #[test]
    fn noiseless_signal_starts_at_zero() {
        let mut model = SignalModel::new(1000.0, 0.0, 1);
        assert_eq!(model.frame_at(0.0).channels, [0; NUM_CHANNELS]);
    }

    #[test]
    fn idle_chip_gets_no_frames() {
        let chip = SimulatedAds129x::ads1298();
        let mut generator = FrameGenerator::spawn(chip.clone(), SignalModel::default());
        thread::sleep(Duration::from_millis(150));
        generator.stop();
        assert!(chip.drdy_is_high());
    }
}
