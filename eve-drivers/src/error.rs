//! Driver errors

use core::fmt;

use eve_core::cmd::DecodeError;

/// What a bounded wait was waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaitTarget {
    /// `ID` to read 0x7C
    ChipId,
    /// `CPURESET` to read 0
    CpuReset,
    /// Ring read pointer to catch up with the write pointer
    CommandFifo,
    /// `DLSWAP` to return to 0
    DisplayListSwap,
}

impl fmt::Display for WaitTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ChipId => "chip id",
            Self::CpuReset => "cpu reset",
            Self::CommandFifo => "command fifo",
            Self::DisplayListSwap => "display list swap",
        };
        f.write_str(name)
    }
}

/// Driver errors, generic over the link error `E`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EveError<E> {
    /// The serial link failed
    Transport(E),
    /// A bounded poll gave up
    Timeout(WaitTarget),
    /// The co-processor reported a fault (read pointer 0xFFF)
    CoprocessorFault,
    /// A command does not fit in the space left in the burst
    BurstOverflow { requested: u16, available: u16 },
    /// Bytes read back from the ring are not a valid command
    Decode(DecodeError),
}

impl<E> From<E> for EveError<E> {
    fn from(e: E) -> Self {
        EveError::Transport(e)
    }
}

impl<E: fmt::Debug> fmt::Display for EveError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {:?}", e),
            Self::Timeout(target) => write!(f, "timed out waiting for {}", target),
            Self::CoprocessorFault => write!(f, "co-processor fault"),
            Self::BurstOverflow {
                requested,
                available,
            } => write!(
                f,
                "command of {} bytes does not fit, {} bytes left in burst",
                requested, available
            ),
            Self::Decode(e) => write!(f, "decode error: {}", e),
        }
    }
}
