//! Command bursts into the co-processor ring
//!
//! A burst is one chip-select transaction: the address phase targets
//! `RAM_CMD + offset` once and every command after it streams through the
//! chip's address auto-increment, which wraps inside the ring by itself.
//! Nothing runs until [`CommandBurst::commit`] writes `CMD_WRITE`.
//!
//! ```ignore
//! let mut burst = eve.begin_burst()?;
//! burst.push(&Command::DlStart)?;
//! burst.push_dl(DlCmd::clear(true, true, true))?;
//! burst.push_dl(DlCmd::display())?;
//! burst.push(&Command::Swap)?;
//! let next = burst.commit()?;
//! ```

use embedded_hal::delay::DelayNs;
use eve_core::cmd::{Command, CommandSink};
use eve_core::config::PollPolicy;
use eve_core::dl::DlCmd;
use eve_core::memory::{self, RAM_CMD};
use eve_core::registers::reg;
use eve_core::ring::{self, MAX_PENDING};
use eve_hal::{ChipSelect, Transport};

use crate::{Eve, EveError};

/// Encoder output going straight onto the wire
struct WireSink<'a, T> {
    link: &'a mut T,
}

impl<T: Transport> CommandSink for WireSink<'_, T> {
    type Error = T::Error;

    fn put(&mut self, bytes: &[u8]) -> Result<(), T::Error> {
        self.link.write_all(bytes)
    }
}

/// An open burst; chip select is held until it is committed or dropped
///
/// Dropping a burst without committing releases chip select and leaves
/// `CMD_WRITE` alone, so the co-processor never sees the queued bytes.
/// After a transport error the burst should be dropped.
pub struct CommandBurst<'e, T: Transport, CS: ChipSelect, D> {
    eve: &'e mut Eve<T, CS, D>,
    start: u16,
    offset: u16,
    written: u16,
    selected: bool,
}

impl<'e, T: Transport, CS: ChipSelect, D: DelayNs> CommandBurst<'e, T, CS, D> {
    fn open(eve: &'e mut Eve<T, CS, D>, start: u16) -> Result<Self, EveError<T::Error>> {
        eve.cs.select();
        let mut burst = Self {
            eve,
            start,
            offset: start,
            written: 0,
            selected: true,
        };
        burst
            .eve
            .transport
            .write_all(&memory::write_header(RAM_CMD + start as u32))?;
        Ok(burst)
    }

    /// Queue one command; returns the ring offset it starts at
    pub fn push(&mut self, cmd: &Command<'_>) -> Result<u16, EveError<T::Error>> {
        let len = cmd.encoded_len();
        let available = MAX_PENDING - self.written;
        if len > available as usize {
            return Err(EveError::BurstOverflow {
                requested: u16::try_from(len).unwrap_or(u16::MAX),
                available,
            });
        }
        let at = self.offset;
        cmd.encode(&mut WireSink {
            link: &mut self.eve.transport,
        })?;
        let len = len as u16;
        self.written += len;
        self.offset = ring::increment_offset(self.offset, len);
        Ok(at)
    }

    /// Queue a display-list instruction
    pub fn push_dl(&mut self, dl: DlCmd) -> Result<u16, EveError<T::Error>> {
        self.push(&Command::Dl(dl))
    }

    /// Queue every command in `cmds`
    pub fn extend(&mut self, cmds: &[Command<'_>]) -> Result<(), EveError<T::Error>> {
        for cmd in cmds {
            self.push(cmd)?;
        }
        Ok(())
    }

    /// Offset the burst started at
    pub fn start(&self) -> u16 {
        self.start
    }

    /// Offset the next command will be written to
    pub fn offset(&self) -> u16 {
        self.offset
    }

    /// Bytes queued so far
    pub fn written(&self) -> u16 {
        self.written
    }

    /// Bytes that still fit in this burst
    pub fn available(&self) -> u16 {
        MAX_PENDING - self.written
    }

    /// Release chip select, kick the co-processor and wait for it to drain
    ///
    /// Returns the offset the next burst starts at.
    pub fn commit(self) -> Result<u16, EveError<T::Error>> {
        let policy = self.eve.poll;
        self.commit_with(policy)
    }

    /// [`commit`](Self::commit) with an explicit wait policy
    pub fn commit_with(mut self, policy: PollPolicy) -> Result<u16, EveError<T::Error>> {
        self.eve.transport.flush()?;
        self.eve.cs.deselect();
        self.selected = false;
        #[cfg(feature = "defmt")]
        defmt::trace!(
            "commit {} bytes at {}..{}",
            self.written,
            self.start,
            self.offset
        );
        self.eve.write_register(reg::CMD_WRITE, self.offset as u32)?;
        self.eve.wait_cmd_fifo_empty_with(policy)
    }
}

impl<T: Transport, CS: ChipSelect, D> Drop for CommandBurst<'_, T, CS, D> {
    fn drop(&mut self) {
        if self.selected {
            let _ = self.eve.transport.flush();
            self.eve.cs.deselect();
        }
    }
}

impl<T: Transport, CS: ChipSelect, D: DelayNs> Eve<T, CS, D> {
    /// Wait for the ring to drain and open a burst at the resulting offset
    pub fn begin_burst(&mut self) -> Result<CommandBurst<'_, T, CS, D>, EveError<T::Error>> {
        let start = self.wait_cmd_fifo_empty()?;
        CommandBurst::open(self, start)
    }

    /// Send `cmds` as one burst and wait until they have run
    pub fn run(&mut self, cmds: &[Command<'_>]) -> Result<u16, EveError<T::Error>> {
        let mut burst = self.begin_burst()?;
        burst.extend(cmds)?;
        burst.commit()
    }

    /// Decode the command stored at ring offset `at`
    ///
    /// `buf` must be large enough for the whole command; string payloads
    /// borrow from it. Reads wrap inside the ring like writes do.
    pub fn read_back<'b>(&mut self, at: u16, buf: &'b mut [u8]) -> Result<Command<'b>, EveError<T::Error>> {
        self.read_memory(RAM_CMD + (at & ring::OFFSET_MASK) as u32, buf)?;
        let bytes: &'b [u8] = buf;
        let (cmd, _) = Command::decode(bytes).map_err(EveError::Decode)?;
        Ok(cmd)
    }
}

#[cfg(test)]
mod tests {
    use eve_core::cmd::{opcode, opt, Command, DecodeError};
    use eve_core::dl::{DlCmd, Primitive, Rgb};
    use eve_core::registers::reg;

    use crate::sim::{FifoBehavior, SimEve};
    use crate::{Eve, EveError};

    fn flashing_dot(color: Rgb) -> [Command<'static>; 10] {
        [
            Command::DlStart,
            Command::Dl(DlCmd::clear_color_rgb(0, 0, 0)),
            Command::Dl(DlCmd::clear(true, true, true)),
            Command::Dl(DlCmd::color_rgb(color.r, color.g, color.b)),
            Command::Dl(DlCmd::point_size(20 * 16)),
            Command::Dl(DlCmd::begin(Primitive::Points)),
            Command::Dl(DlCmd::vertex2f(100 * 16, 100 * 16)),
            Command::Dl(DlCmd::end()),
            Command::Dl(DlCmd::display()),
            Command::Swap,
        ]
    }

    #[test]
    fn test_dot_burst_advances_by_encoded_length() {
        let sim = SimEve::ready();
        sim.set_reg(reg::CMD_READ, 400);
        sim.set_reg(reg::CMD_WRITE, 400);
        let (link, cs) = sim.link();
        let mut eve = Eve::new(link, cs, sim.delay());

        let cmds = flashing_dot(Rgb::RED);
        let expected: usize = cmds.iter().map(|c| c.encoded_len()).sum();
        assert_eq!(expected, 40);

        let next = eve.run(&cmds).unwrap();
        assert_eq!(next, 440);
        assert_eq!(sim.reg(reg::CMD_WRITE), 440);
        assert_eq!(sim.last_burst().len(), 40);
        assert_eq!(sim.executed(), 10);
        assert_eq!(sim.cmd_swaps(), 1);
        // co-processor built the list starting at RAM_DL
        assert_eq!(sim.dl_word(0), DlCmd::clear_color_rgb(0, 0, 0).0);
        assert_eq!(sim.dl_word(7), DlCmd::display().0);
    }

    #[test]
    fn test_burst_is_one_transaction() {
        let sim = SimEve::ready();
        let (link, cs) = sim.link();
        let mut eve = Eve::new(link, cs, sim.delay());
        eve.wait_cmd_fifo_empty().unwrap();

        let before = sim.transactions();
        let mut burst = eve.begin_burst().unwrap();
        // the wait before opening is two register reads
        assert_eq!(sim.transactions(), before + 2);
        burst.extend(&flashing_dot(Rgb::BLACK)).unwrap();
        assert!(sim.cs_selected());
        burst.commit().unwrap();

        assert!(!sim.cs_selected());
        assert_eq!(sim.overlapping_selects(), 0);
        assert_eq!(sim.stray_bytes(), 0);
        assert_eq!(sim.unflushed_releases(), 0);
    }

    #[test]
    fn test_text_command_is_28_bytes() {
        let sim = SimEve::ready();
        let (link, cs) = sim.link();
        let mut eve = Eve::new(link, cs, sim.delay());

        let text = Command::text(240, 136, 31, opt::CENTER, "HELLO AT HZIRI");
        assert_eq!(text.encoded_len(), 28);

        let mut burst = eve.begin_burst().unwrap();
        assert_eq!(burst.push(&text).unwrap(), 0);
        assert_eq!(burst.offset(), 28);
        assert_eq!(burst.commit().unwrap(), 28);

        let wire = sim.last_burst();
        assert_eq!(&wire[0..4], &opcode::TEXT.to_le_bytes());
        assert_eq!(&wire[12..26], b"HELLO AT HZIRI");
        assert_eq!(&wire[26..28], &[0, 0]);
        assert_eq!(Command::decode(&wire).unwrap(), (text, 28));
    }

    #[test]
    fn test_read_back_across_wrap() {
        let sim = SimEve::ready();
        sim.set_reg(reg::CMD_READ, 4084);
        sim.set_reg(reg::CMD_WRITE, 4084);
        let (link, cs) = sim.link();
        let mut eve = Eve::new(link, cs, sim.delay());

        let text = Command::text(10, 20, 28, 0, "WRAPPED");
        assert_eq!(eve.run(&[text]).unwrap(), 8);

        let mut buf = [0u8; 24];
        assert_eq!(eve.read_back(4084, &mut buf).unwrap(), text);

        let mut short = [0u8; 14];
        assert_eq!(
            eve.read_back(4084, &mut short),
            Err(EveError::Decode(DecodeError::MissingTerminator))
        );
    }

    #[test]
    fn test_offset_wraps_mid_burst() {
        let sim = SimEve::ready();
        sim.set_reg(reg::CMD_READ, 4090);
        sim.set_reg(reg::CMD_WRITE, 4090);
        let (link, cs) = sim.link();
        let mut eve = Eve::new(link, cs, sim.delay());

        let scale = Command::Scale {
            sx: 0x2_0000,
            sy: 0x2_0000,
        };
        assert_eq!(scale.encoded_len(), 12);

        let mut burst = eve.begin_burst().unwrap();
        assert_eq!(burst.push(&scale).unwrap(), 4090);
        assert_eq!(burst.offset(), 6);
        assert_eq!(burst.commit().unwrap(), 6);

        let mut head = [0u8; 4];
        sim.ring_bytes(4090, &mut head);
        assert_eq!(head, opcode::SCALE.to_le_bytes());
        assert_eq!(sim.last_burst().as_slice().len(), 12);
        assert_eq!(sim.executed(), 1);
    }

    #[test]
    fn test_overflow_is_refused_before_sending() {
        let sim = SimEve::ready();
        let (link, cs) = sim.link();
        let mut eve = Eve::new(link, cs, sim.delay());

        let block = [0xAAu8; 1000];
        let write = Command::MemWrite { ptr: 0, data: &block };
        assert_eq!(write.encoded_len(), 1012);

        let mut burst = eve.begin_burst().unwrap();
        for _ in 0..4 {
            burst.push(&write).unwrap();
        }
        assert_eq!(burst.available(), 4092 - 4048);
        let offset = burst.offset();
        assert_eq!(
            burst.push(&write),
            Err(EveError::BurstOverflow {
                requested: 1012,
                available: 44,
            })
        );
        assert_eq!(burst.offset(), offset);
        // the rest still fits
        burst.push(&Command::Swap).unwrap();
        assert_eq!(burst.commit().unwrap(), 4052);
        assert_eq!(sim.executed(), 5);
    }

    #[test]
    fn test_abandoned_burst_is_never_kicked() {
        let sim = SimEve::ready();
        let (link, cs) = sim.link();
        let mut eve = Eve::new(link, cs, sim.delay());

        {
            let mut burst = eve.begin_burst().unwrap();
            burst.push(&Command::Swap).unwrap();
        }
        assert!(!sim.cs_selected());
        assert_eq!(sim.unflushed_releases(), 0);
        assert_eq!(sim.reg(reg::CMD_WRITE), 0);
        assert_eq!(sim.executed(), 0);
        assert_eq!(eve.wait_cmd_fifo_empty().unwrap(), 0);
    }

    #[test]
    fn test_commit_reports_fault() {
        let sim = SimEve::ready();
        let (link, cs) = sim.link();
        let mut eve = Eve::new(link, cs, sim.delay());

        // 0xFFFFFFFF is not a command
        let mut burst = eve.begin_burst().unwrap();
        burst.push_dl(DlCmd(0xFFFF_FFFF)).unwrap();
        assert_eq!(burst.commit(), Err(EveError::CoprocessorFault));
        assert!(sim.is_faulted());

        eve.recover_coprocessor().unwrap();
        assert_eq!(eve.run(&[Command::Swap]).unwrap(), 4);
    }

    #[test]
    fn test_commit_waits_for_slow_consumer() {
        let sim = SimEve::ready();
        sim.set_fifo_behavior(FifoBehavior::Lag(5));
        let (link, cs) = sim.link();
        let mut eve = Eve::new(link, cs, sim.delay());

        assert_eq!(eve.run(&[Command::DlStart, Command::Swap]).unwrap(), 8);
        assert_eq!(sim.reg(reg::CMD_READ), 8);
    }
}
