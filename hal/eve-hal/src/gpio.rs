//! GPIO pin abstractions
//!
//! The co-processor needs two control lines besides the serial link: an
//! active-low chip select that frames every transaction, and an active-low
//! power-down line used to reset the chip at bring-up.

/// Push-pull output driving one of the control lines
pub trait OutputPin {
    fn set_high(&mut self);

    fn set_low(&mut self);

    /// Level last driven
    fn is_set_high(&self) -> bool;
}

/// Chip-select line framing one addressed transaction
///
/// Only one transaction may hold the line at a time. The target's address
/// auto-increment stays valid only while the line is held, so multi-byte
/// and multi-command sequences must keep it asserted from first byte to last.
pub trait ChipSelect {
    /// Assert chip select (begin a transaction)
    fn select(&mut self);

    /// Release chip select (end a transaction)
    fn deselect(&mut self);
}

/// Power-down / reset line of the co-processor
pub trait PowerDown {
    /// Hold the chip in reset
    fn assert_reset(&mut self);

    /// Let the chip run
    fn release_reset(&mut self);
}

/// Adapter turning an output pin into an active-low control line
///
/// Both the chip-select and power-down lines of the co-processor are active
/// low, so "assert" drives the pin low.
#[derive(Debug)]
pub struct ActiveLow<P> {
    pin: P,
}

impl<P: OutputPin> ActiveLow<P> {
    /// Wrap a pin; the line starts released (high)
    pub fn new(mut pin: P) -> Self {
        pin.set_high();
        Self { pin }
    }

    /// Check if the line is currently asserted
    pub fn is_asserted(&self) -> bool {
        !self.pin.is_set_high()
    }

    /// Return the wrapped pin
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> ChipSelect for ActiveLow<P> {
    fn select(&mut self) {
        self.pin.set_low();
    }

    fn deselect(&mut self) {
        self.pin.set_high();
    }
}

impl<P: OutputPin> PowerDown for ActiveLow<P> {
    fn assert_reset(&mut self) {
        self.pin.set_low();
    }

    fn release_reset(&mut self) {
        self.pin.set_high();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakePin {
        high: bool,
        edges: u8,
    }

    impl OutputPin for FakePin {
        fn set_high(&mut self) {
            if !self.high {
                self.edges += 1;
            }
            self.high = true;
        }

        fn set_low(&mut self) {
            if self.high {
                self.edges += 1;
            }
            self.high = false;
        }

        fn is_set_high(&self) -> bool {
            self.high
        }
    }

    #[test]
    fn test_active_low_starts_released() {
        let cs = ActiveLow::new(FakePin::default());
        assert!(!cs.is_asserted());
    }

    #[test]
    fn test_chip_select_drives_low() {
        let mut cs = ActiveLow::new(FakePin::default());
        cs.select();
        assert!(cs.is_asserted());
        cs.deselect();
        assert!(!cs.is_asserted());
        // initial release + select + deselect
        assert_eq!(cs.into_inner().edges, 3);
    }

    #[test]
    fn test_power_down_drives_low() {
        let mut pd = ActiveLow::new(FakePin::default());
        pd.assert_reset();
        assert!(pd.is_asserted());
        pd.release_reset();
        assert!(!pd.is_asserted());
    }
}
