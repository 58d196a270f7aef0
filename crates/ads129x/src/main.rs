use std::error::Error;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;
use log::{info, warn};

use ads129x::mock_hal::{FrameGenerator, SignalModel, SimulatedAds129x};
use ads129x::{
    load_config, Ads129xDriver, Ads129xDriverBuilder, DataReadyHandoff, DataReadyMode,
    DeviceConfig, SpiBus,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Stream ADS129x frames as CSV", long_about = None)]
struct Args {
    /// JSON device configuration. Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run against a simulated chip instead of the hardware
    #[arg(long)]
    mock: bool,

    /// Number of frames to print, 0 to run forever
    #[arg(long, default_value_t = 1000)]
    samples: u64,

    /// Print channel values in volts instead of raw counts
    #[arg(long)]
    volts: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => DeviceConfig::default(),
    };

    if args.mock {
        let chip = SimulatedAds129x::ads1298();
        let _generator = FrameGenerator::spawn(chip.clone(), SignalModel::default());
        let bus = SpiBus::new(chip.spi(), config.bus_settings());
        let builder = Ads129xDriverBuilder::new()
            .bus(bus)
            .chip_select(chip.chip_select())
            .data_ready_pin(chip.drdy_pin());
        run(builder, &config, &args)
    } else {
        run_hardware(&config, &args)
    }
}

#[cfg(feature = "pi-hardware")]
fn run_hardware(config: &DeviceConfig, args: &Args) -> Result<(), Box<dyn Error>> {
    let (bus, cs, drdy) = ads129x::rppal_hal::open(config)?;
    let builder = Ads129xDriverBuilder::new()
        .bus(bus)
        .chip_select(cs)
        .data_ready_pin(drdy);
    run(builder, config, args)
}

#[cfg(not(feature = "pi-hardware"))]
fn run_hardware(_config: &DeviceConfig, _args: &Args) -> Result<(), Box<dyn Error>> {
    Err("built without the pi-hardware feature, use --mock".into())
}

fn run(builder: Ads129xDriverBuilder, config: &DeviceConfig, args: &Args) -> Result<(), Box<dyn Error>> {
    match config.data_ready {
        DataReadyMode::Polled => stream(builder.build_polled()?, config, args),
        DataReadyMode::Interrupt => stream(builder.build_interrupt()?, config, args),
    }
}

fn stream<H: DataReadyHandoff>(
    mut driver: Ads129xDriver<H>,
    config: &DeviceConfig,
    args: &Args,
) -> Result<(), Box<dyn Error>> {
    let id = driver.initialize(config)?;
    info!("Streaming from {:?} at {} SPS", id, config.sample_rate.hz());

    driver.start()?;
    driver.read_continuous()?;

    let gains = config.channel_gains();
    let idle = Duration::from_secs(1) / (config.sample_rate.hz() * 4);
    let mut printed = 0u64;

    while args.samples == 0 || printed < args.samples {
        match driver.try_get_frame() {
            Ok(Some(frame)) => {
                let columns: Vec<String> = if args.volts {
                    frame
                        .to_voltages(config.vref, &gains)
                        .iter()
                        .map(|v| format!("{:.9}", v))
                        .collect()
                } else {
                    frame.channels.iter().map(|c| c.to_string()).collect()
                };
                println!("{},{}", frame.status, columns.join(","));
                printed += 1;
            }
            Ok(None) => thread::sleep(idle),
            Err(e) => {
                warn!("Frame read failed: {}", e);
                thread::sleep(idle);
            }
        }
    }

    if let Some(overwritten) = driver.frames_overwritten() {
        info!("{} frames were replaced before being read", overwritten);
    }
    driver.shutdown()?;
    Ok(())
}
