//! Adapters over `embedded-hal` 1.0
//!
//! Chip HALs (embassy-rp, stm32 HALs, linux-embedded-hal) expose their SPI
//! buses and pins through the `embedded-hal` traits. These wrappers plug
//! them into the EVE traits without any chip-specific code.

use core::convert::Infallible;

use embedded_hal::digital::OutputPin as EhOutputPin;
use embedded_hal::spi::SpiBus;

use crate::gpio::OutputPin;
use crate::spi::Transport;

/// Hook used to retune a bus clock
pub type ClockHook<S> = fn(&mut S, u32);

/// `Transport` over an `embedded-hal` SPI bus
///
/// The bus must not drive chip select itself; framing is done by the
/// protocol layer through [`crate::ChipSelect`].
pub struct EhSpi<S> {
    bus: S,
    clock: Option<ClockHook<S>>,
}

impl<S: SpiBus<u8>> EhSpi<S> {
    /// Wrap an SPI bus
    pub fn new(bus: S) -> Self {
        Self { bus, clock: None }
    }

    /// Install a hook that retunes the bus clock
    ///
    /// ```ignore
    /// let link = EhSpi::new(spi).with_clock_control(|spi, hz| spi.set_frequency(hz));
    /// ```
    pub fn with_clock_control(mut self, hook: ClockHook<S>) -> Self {
        self.clock = Some(hook);
        self
    }

    /// Return the wrapped bus
    pub fn into_inner(self) -> S {
        self.bus
    }
}

impl<S: SpiBus<u8>> Transport for EhSpi<S> {
    type Error = S::Error;

    fn exchange(&mut self, byte: u8) -> Result<u8, Self::Error> {
        let mut word = [byte];
        self.bus.transfer_in_place(&mut word)?;
        Ok(word[0])
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.bus.write(data)
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        buf.fill(0x00);
        self.bus.transfer_in_place(buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.bus.flush()
    }

    fn set_frequency(&mut self, hz: u32) -> Result<(), Self::Error> {
        // Let the last byte leave the shifter before the clock changes
        self.bus.flush()?;
        if let Some(hook) = self.clock {
            hook(&mut self.bus, hz);
        }
        Ok(())
    }
}

/// [`OutputPin`] over an infallible `embedded-hal` output
///
/// Most MCU GPIO outputs cannot fail; restricting to `Infallible` keeps the
/// control-line traits free of error plumbing.
pub struct EhPin<P> {
    pin: P,
    high: bool,
}

impl<P: EhOutputPin<Error = Infallible>> EhPin<P> {
    /// Wrap a pin, remembering its initial level
    pub fn new(pin: P, initially_high: bool) -> Self {
        Self {
            pin,
            high: initially_high,
        }
    }

    /// Return the wrapped pin
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: EhOutputPin<Error = Infallible>> OutputPin for EhPin<P> {
    fn set_high(&mut self) {
        match self.pin.set_high() {
            Ok(()) => self.high = true,
            Err(never) => match never {},
        }
    }

    fn set_low(&mut self) {
        match self.pin.set_low() {
            Ok(()) => self.high = false,
            Err(never) => match never {},
        }
    }

    fn is_set_high(&self) -> bool {
        self.high
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::spi::ErrorType;

    /// Bus that queues writes until flushed
    #[derive(Default)]
    struct QueuedBus {
        queued: usize,
        sent: usize,
        flushes: usize,
    }

    impl ErrorType for QueuedBus {
        type Error = Infallible;
    }

    impl SpiBus<u8> for QueuedBus {
        fn read(&mut self, words: &mut [u8]) -> Result<(), Infallible> {
            words.fill(0);
            Ok(())
        }

        fn write(&mut self, words: &[u8]) -> Result<(), Infallible> {
            self.queued += words.len();
            Ok(())
        }

        fn transfer(&mut self, read: &mut [u8], _write: &[u8]) -> Result<(), Infallible> {
            read.fill(0);
            Ok(())
        }

        fn transfer_in_place(&mut self, _words: &mut [u8]) -> Result<(), Infallible> {
            Ok(())
        }

        fn flush(&mut self) -> Result<(), Infallible> {
            self.sent += self.queued;
            self.queued = 0;
            self.flushes += 1;
            Ok(())
        }
    }

    #[test]
    fn test_flush_drains_bus() {
        let mut link = EhSpi::new(QueuedBus::default());
        link.write_all(&[1, 2, 3, 4]).unwrap();
        assert_eq!(link.bus.queued, 4);

        link.flush().unwrap();
        let bus = link.into_inner();
        assert_eq!((bus.queued, bus.sent, bus.flushes), (0, 4, 1));
    }

    #[test]
    fn test_clock_change_flushes_first() {
        fn retune(bus: &mut QueuedBus, _hz: u32) {
            assert_eq!(bus.queued, 0);
        }
        let mut link = EhSpi::new(QueuedBus::default()).with_clock_control(retune);
        link.write_all(&[0xAA; 3]).unwrap();
        link.set_frequency(25_000_000).unwrap();
        assert_eq!(link.into_inner().sent, 3);
    }
}
