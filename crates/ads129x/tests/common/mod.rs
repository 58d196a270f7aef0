#![allow(dead_code)]

use ads129x::hal::BusSettings;
use ads129x::mock_hal::SimulatedAds129x;
use ads129x::{
    Ads129xDriver, Ads129xDriverBuilder, DataReadyHandoff, InterruptAds129x, PolledAds129x,
    SampleFrame, SpiBus,
};

fn builder(chip: &SimulatedAds129x) -> Ads129xDriverBuilder {
    Ads129xDriverBuilder::new()
        .bus(SpiBus::new(chip.spi(), BusSettings::default()))
        .chip_select(chip.chip_select())
        .data_ready_pin(chip.drdy_pin())
}

pub fn polled(chip: &SimulatedAds129x) -> PolledAds129x {
    builder(chip).build_polled().unwrap()
}

pub fn interrupt(chip: &SimulatedAds129x) -> InterruptAds129x {
    builder(chip).build_interrupt().unwrap()
}

/// Reset, leave the power-up RDATAC mode and forget the bring-up traffic.
pub fn bring_up<H: DataReadyHandoff>(driver: &mut Ads129xDriver<H>, chip: &SimulatedAds129x) {
    driver.reset().unwrap();
    driver.stop_continuous().unwrap();
    chip.clear_transactions();
}

/// Start conversions and enter continuous-read mode.
pub fn stream<H: DataReadyHandoff>(driver: &mut Ads129xDriver<H>) {
    driver.start().unwrap();
    driver.read_continuous().unwrap();
}

pub fn frame(n: i32) -> SampleFrame {
    let mut channels = [0; 8];
    for (i, ch) in channels.iter_mut().enumerate() {
        *ch = n * 10 + i as i32 - 4;
    }
    SampleFrame {
        status: 0xC0_0000 | n as u32,
        channels,
    }
}
