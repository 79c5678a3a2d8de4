//! EVE display front-end firmware
//!
//! Brings up an FT81x co-processor on SPI0 of an RP2040 and cycles through
//! the demo screens. Panel timings come from `panel.toml`, validated and
//! compiled in by the build script.
//!
//! Wiring:
//! - SCK GP18, MOSI GP19, MISO GP16
//! - CS GP17 (active low)
//! - PD GP20 (active low)

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::spi::{self, Spi};
use embassy_time::{Delay, Duration, Instant, Timer};
use {defmt_rtt as _, panic_probe as _};

use eve_core::config::{BringUpConfig, PollPolicy};
use eve_core::registers::touch_mode;
use eve_core::touch::TouchTransform;
use eve_drivers::{Eve, EveError};
use eve_hal::eh::{EhPin, EhSpi};
use eve_hal::spi::{Phase, Polarity};
use eve_hal::{ActiveLow, ChipSelect, SpiConfig, Transport};
use eve_screens::{render, BitmapTile, FlashingDot, Greeting, TouchTracker};

mod panel {
    use eve_core::config::{BacklightConfig, PanelConfig};

    include!(concat!(env!("OUT_DIR"), "/panel.rs"));
}

/// Time each demo stays on screen
const DEMO_PERIOD: Duration = Duration::from_secs(5);

/// Frame interval
const FRAME_PERIOD: Duration = Duration::from_millis(250);

/// Calibration waits for three taps
const CALIBRATION_POLL: PollPolicy = PollPolicy::new(60_000, 1_000);

/// Demo currently shown
#[derive(Clone, Copy, PartialEq, Eq, Format)]
enum Demo {
    Dot,
    Greeting,
    Tile,
    Tracker,
}

impl Demo {
    fn next(self) -> Self {
        match self {
            Demo::Dot => Demo::Greeting,
            Demo::Greeting => Demo::Tile,
            Demo::Tile => Demo::Tracker,
            Demo::Tracker => Demo::Dot,
        }
    }
}

/// Map the board-agnostic SPI settings onto the RP2040 peripheral
fn spi_config(cfg: SpiConfig) -> spi::Config {
    let mut config = spi::Config::default();
    config.frequency = cfg.frequency;
    config.polarity = match cfg.polarity {
        Polarity::IdleLow => spi::Polarity::IdleLow,
        Polarity::IdleHigh => spi::Polarity::IdleHigh,
    };
    config.phase = match cfg.phase {
        Phase::CaptureOnFirstTransition => spi::Phase::CaptureOnFirstTransition,
        Phase::CaptureOnSecondTransition => spi::Phase::CaptureOnSecondTransition,
    };
    config
}

/// Main entry point
#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("EVE firmware starting...");

    let p = embassy_rp::init(Default::default());

    let bus = Spi::new_blocking(p.SPI0, p.PIN_18, p.PIN_19, p.PIN_16, spi_config(SpiConfig::bring_up()));
    let link = EhSpi::new(bus).with_clock_control(|spi, hz| spi.set_frequency(hz));
    let cs = ActiveLow::new(EhPin::new(Output::new(p.PIN_17, Level::High), true));
    let mut pd = ActiveLow::new(EhPin::new(Output::new(p.PIN_20, Level::High), true));

    let config = BringUpConfig {
        panel: panel::PANEL,
        backlight: panel::BACKLIGHT,
        bring_up_spi_hz: SpiConfig::bring_up().frequency,
        run_spi_hz: SpiConfig::run().frequency,
        ..BringUpConfig::default()
    };
    if let Err(e) = config.validate() {
        error!("bring-up config rejected: {}", e);
        return;
    }

    let mut eve = Eve::new(link, cs, Delay);
    loop {
        match eve.bring_up(&mut pd, &config) {
            Ok(()) => break,
            Err(e) => {
                warn!("bring-up failed: {}, retrying", e);
                Timer::after_millis(500).await;
            }
        }
    }

    if let Err(e) = setup_touch(&mut eve) {
        warn!("touch setup failed: {}", e);
    }

    let mut dot = FlashingDot::new(
        (config.panel.hsize / 2) as i16,
        (config.panel.vsize / 2) as i16,
        20,
    );
    let mut greeting = Greeting::new(&config.panel);
    let mut tile = BitmapTile::new(0, 40, 40, config.panel.hsize - 80, config.panel.vsize - 80);
    let mut tracker = TouchTracker::new();

    let mut demo = Demo::Dot;
    let mut switch_at = Instant::now() + DEMO_PERIOD;
    info!("showing {}", demo);

    loop {
        let result = match demo {
            Demo::Dot => render(&mut eve, &mut dot),
            Demo::Greeting => render(&mut eve, &mut greeting),
            Demo::Tile => render(&mut eve, &mut tile),
            Demo::Tracker => match tracker.update(&mut eve) {
                Ok(Some(tag)) => {
                    info!("tag {} pressed", tag);
                    render(&mut eve, &mut tracker)
                }
                Ok(None) => render(&mut eve, &mut tracker),
                Err(e) => Err(e),
            },
        };

        match result {
            Ok(_) => {}
            Err(EveError::CoprocessorFault) => {
                warn!("co-processor faulted, recovering");
                if let Err(e) = eve.recover_coprocessor() {
                    error!("recovery failed: {}", e);
                }
                // the bitmap upload may not have run
                tile.invalidate();
            }
            Err(e) => warn!("frame failed: {}", e),
        }

        if Instant::now() >= switch_at {
            demo = demo.next();
            switch_at = Instant::now() + DEMO_PERIOD;
            info!("showing {}", demo);
        }
        Timer::after(FRAME_PERIOD).await;
    }
}

/// Enable continuous touch sampling and calibrate once if needed
fn setup_touch<T: Transport, CS: ChipSelect, D: embedded_hal::delay::DelayNs>(
    eve: &mut Eve<T, CS, D>,
) -> Result<(), EveError<T::Error>> {
    eve.set_touch_mode(touch_mode::CONTINUOUS)?;
    if eve.touch_transform()? == TouchTransform::IDENTITY {
        info!("touch not calibrated, tap the dots");
        if !eve.calibrate(CALIBRATION_POLL)? {
            warn!("touch calibration failed");
        }
    }
    Ok(())
}
