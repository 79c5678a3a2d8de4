//! Command ring arithmetic
//!
//! The co-processor consumes commands from a 4 KiB circular buffer in
//! `RAM_CMD`. Producer and consumer positions are 12-bit byte offsets; every
//! command occupies a whole number of 32-bit words.

/// Size of the command ring in bytes
pub const CMD_FIFO_SIZE: u16 = 4096;

/// Mask applied to ring offsets
pub const OFFSET_MASK: u16 = CMD_FIFO_SIZE - 1;

/// Largest number of bytes that may be pending at once
///
/// One word always stays free so that "read == write" unambiguously means
/// empty.
pub const MAX_PENDING: u16 = CMD_FIFO_SIZE - 4;

/// Read pointer value reported after a co-processor fault
pub const FAULT_SENTINEL: u16 = 0xFFF;

/// Advance a ring offset by `size` bytes, wrapping modulo the ring size
pub const fn increment_offset(current: u16, size: u16) -> u16 {
    ((current as u32 + size as u32) & OFFSET_MASK as u32) as u16
}

/// Zero bytes needed to bring `len` up to a multiple of 4
pub const fn padding(len: usize) -> usize {
    (4 - len % 4) % 4
}

/// `len` rounded up to a multiple of 4
pub const fn padded_len(len: usize) -> usize {
    len + padding(len)
}

/// Bytes queued but not yet consumed
pub const fn fullness(read: u16, write: u16) -> u16 {
    write.wrapping_sub(read) & OFFSET_MASK
}

/// Bytes that may still be queued without overrunning the consumer
pub const fn free_space(read: u16, write: u16) -> u16 {
    MAX_PENDING - fullness(read, write)
}

/// Whether a read pointer value signals a co-processor fault
pub const fn is_fault(read: u32) -> bool {
    read & 0xFFFF == FAULT_SENTINEL as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_increment_wraps() {
        assert_eq!(increment_offset(4090, 12), 6);
        assert_eq!(increment_offset(4092, 4), 0);
        assert_eq!(increment_offset(0, 0), 0);
        assert_eq!(increment_offset(4095, 1), 0);
        assert_eq!(increment_offset(100, 40), 140);
    }

    #[test]
    fn test_padding_values() {
        assert_eq!(padding(0), 0);
        assert_eq!(padding(1), 3);
        assert_eq!(padding(2), 2);
        assert_eq!(padding(3), 1);
        assert_eq!(padding(4), 0);
        // Text header plus "HELLO AT HZIRI" plus NUL
        assert_eq!(padded_len(12 + 14 + 1), 28);
    }

    #[test]
    fn test_free_space() {
        assert_eq!(free_space(0, 0), 4092);
        assert_eq!(free_space(100, 140), 4052);
        // writer has wrapped
        assert_eq!(fullness(4000, 8), 104);
        assert_eq!(free_space(4000, 8), 3988);
    }

    #[test]
    fn test_fault_sentinel() {
        assert!(is_fault(0xFFF));
        assert!(!is_fault(0xFFC));
    }

    proptest! {
        #[test]
        fn prop_increment_is_modular(current in 0u16..4096, size in 0u16..=64) {
            let next = increment_offset(current, size);
            prop_assert!(next < CMD_FIFO_SIZE);
            prop_assert_eq!(next as u32, (current as u32 + size as u32) % 4096);
        }

        #[test]
        fn prop_increments_compose(
            current in 0u16..4096,
            steps in proptest::collection::vec(0u16..=64, 0..32),
        ) {
            let stepped = steps.iter().fold(current, |off, &s| increment_offset(off, s));
            let total: u32 = steps.iter().map(|&s| s as u32).sum();
            let once = increment_offset(current, (total % 4096) as u16);
            prop_assert_eq!(stepped, once);
        }

        #[test]
        fn prop_padding_is_minimal(len in 0usize..10_000) {
            let p = padding(len);
            prop_assert!(p <= 3);
            prop_assert_eq!((len + p) % 4, 0);
            for smaller in 0..p {
                prop_assert_ne!((len + smaller) % 4, 0);
            }
        }

        #[test]
        fn prop_free_space_bounds(read in 0u16..4096, queued in 0u16..=4092) {
            let write = increment_offset(read, queued);
            prop_assert_eq!(fullness(read, write), queued);
            prop_assert_eq!(free_space(read, write), 4092 - queued);
        }
    }
}
