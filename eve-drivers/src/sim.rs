//! Simulated FT81x co-processor
//!
//! Decodes the SPI framing the way the chip does and keeps enough memory
//! to run the driver end to end on the host:
//!
//! - 3-byte address phase, write flag in bit 7 of the first byte
//! - one dummy byte before read data
//! - 3-byte host commands (`ACTIVE` is recognised as an address phase of
//!   zeros that ends without a dummy byte)
//! - address auto-increment, wrapping inside `RAM_CMD`
//!
//! Regions backed by memory: `RAM_DL`, `RAM_REG`, `RAM_CMD` and the first
//! 4 KiB of `RAM_G`. Everything else reads as zero and ignores writes.
//!
//! The co-processor consumes the ring when `CMD_WRITE` is written. Tests
//! can make it lag a number of `CMD_READ` polls, stall forever, or fault.
//!
//! ```ignore
//! let sim = SimEve::new();
//! let (link, cs) = sim.link();
//! let mut eve = Eve::new(link, cs, sim.delay());
//! eve.write_register(reg::PWM_DUTY, 64)?;
//! assert_eq!(sim.reg(reg::PWM_DUTY), 64);
//! ```

use core::cell::RefCell;

use embedded_hal::delay::DelayNs;
use eve_core::cmd::Command;
use eve_core::memory::{self, RAM_CMD, RAM_CMD_SIZE, RAM_DL, RAM_DL_SIZE, RAM_G, RAM_REG};
use eve_core::registers::{reg, Register, CHIP_ID};
use eve_core::ring::{self, FAULT_SENTINEL};
use eve_core::touch::NO_TOUCH;
use eve_hal::{ChipSelect, PowerDown, Transport};
use heapless::Vec;

/// Size of the simulated `RAM_G` window
pub const RAM_G_WINDOW: usize = 4096;

const RAM_REG_WINDOW: usize = 0x600;

/// Link error raised by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SimError {
    /// Injected failure
    LinkDown,
}

/// How the co-processor reacts to a `CMD_WRITE` update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FifoBehavior {
    /// Consume after `n` polls of `CMD_READ` (0 = immediately)
    Lag(u32),
    /// Never consume
    Stall,
    /// Report the fault sentinel instead of consuming
    Fault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Header { bytes: [u8; 3], n: usize },
    ReadDummy(u32),
    Read(u32),
    Write { start: u32, addr: u32 },
    Host,
}

struct State {
    phase: Phase,
    selected: bool,
    overlapping_selects: u32,
    stray_bytes: u32,
    transactions: u32,
    last_transaction_len: usize,
    transaction_len: usize,
    fail_after: Option<u32>,
    unflushed: bool,
    unflushed_releases: u32,

    ram_g: [u8; RAM_G_WINDOW],
    ram_dl: [u8; RAM_DL_SIZE as usize],
    ram_reg: [u8; RAM_REG_WINDOW],
    ram_cmd: [u8; RAM_CMD_SIZE as usize],

    awake: bool,
    id_ready_after: u32,
    id_polls: u32,
    dlswap_stuck: bool,
    host_commands: Vec<(u8, u8), 16>,
    resets: u32,

    fifo: FifoBehavior,
    pending_polls: Option<u32>,
    faulted: bool,
    executed: u32,
    cmd_swaps: u32,
    dl_swaps: u32,
    last_burst: Vec<u8, 4096>,
    calibrate_result: u32,

    spi_hz: u32,
    elapsed_ns: u64,
}

impl State {
    fn new() -> Self {
        let mut state = Self {
            phase: Phase::Idle,
            selected: false,
            overlapping_selects: 0,
            stray_bytes: 0,
            transactions: 0,
            last_transaction_len: 0,
            transaction_len: 0,
            fail_after: None,
            unflushed: false,
            unflushed_releases: 0,
            ram_g: [0; RAM_G_WINDOW],
            ram_dl: [0; RAM_DL_SIZE as usize],
            ram_reg: [0; RAM_REG_WINDOW],
            ram_cmd: [0; RAM_CMD_SIZE as usize],
            awake: false,
            id_ready_after: 0,
            id_polls: 0,
            dlswap_stuck: false,
            host_commands: Vec::new(),
            resets: 0,
            fifo: FifoBehavior::Lag(0),
            pending_polls: None,
            faulted: false,
            executed: 0,
            cmd_swaps: 0,
            dl_swaps: 0,
            last_burst: Vec::new(),
            calibrate_result: 1,
            spi_hz: 0,
            elapsed_ns: 0,
        };
        state.set_reg(reg::TOUCH_SCREEN_XY, NO_TOUCH);
        state.set_reg(reg::TOUCH_RAW_XY, NO_TOUCH);
        state.set_reg(reg::GPIO_DIR, 0x80);
        for (i, coeff) in reg::TOUCH_TRANSFORM.iter().enumerate() {
            state.set_reg(*coeff, if i == 0 || i == 4 { 0x1_0000 } else { 0 });
        }
        state
    }

    fn slot(&mut self, addr: u32) -> Option<&mut u8> {
        let addr = addr & memory::ADDRESS_MASK;
        let index = |base: u32, len: usize| {
            addr.checked_sub(base)
                .map(|off| off as usize)
                .filter(|&off| off < len)
        };
        if let Some(i) = index(RAM_G, RAM_G_WINDOW) {
            return self.ram_g.get_mut(i);
        }
        if let Some(i) = index(RAM_DL, RAM_DL_SIZE as usize) {
            return self.ram_dl.get_mut(i);
        }
        if let Some(i) = index(RAM_REG, RAM_REG_WINDOW) {
            return self.ram_reg.get_mut(i);
        }
        if let Some(i) = index(RAM_CMD, RAM_CMD_SIZE as usize) {
            return self.ram_cmd.get_mut(i);
        }
        None
    }

    fn peek(&mut self, addr: u32) -> u8 {
        self.slot(addr).map(|b| *b).unwrap_or(0)
    }

    fn poke(&mut self, addr: u32, value: u8) {
        if let Some(b) = self.slot(addr) {
            *b = value;
        }
    }

    fn reg(&mut self, register: Register) -> u32 {
        let mut bytes = [0u8; 4];
        for (i, b) in bytes.iter_mut().take(register.width.bytes()).enumerate() {
            *b = self.peek(register.address + i as u32);
        }
        u32::from_le_bytes(bytes)
    }

    fn set_reg(&mut self, register: Register, value: u32) {
        let (bytes, n) = register.encode(value);
        for (i, b) in bytes[..n].iter().enumerate() {
            self.poke(register.address + i as u32, *b);
        }
    }

    fn advance(addr: u32) -> u32 {
        let next = addr + 1;
        if next == RAM_CMD + RAM_CMD_SIZE {
            RAM_CMD
        } else {
            next
        }
    }

    fn exchange(&mut self, out: u8) -> Result<u8, SimError> {
        if let Some(left) = self.fail_after {
            if left == 0 {
                return Err(SimError::LinkDown);
            }
            self.fail_after = Some(left - 1);
        }
        if self.selected {
            self.transaction_len += 1;
            self.unflushed = true;
        }
        let (reply, next) = match self.phase {
            Phase::Idle => {
                self.stray_bytes += 1;
                (0, Phase::Idle)
            }
            Phase::Header { mut bytes, n } => {
                bytes[n] = out;
                if n + 1 < 3 {
                    (0, Phase::Header { bytes, n: n + 1 })
                } else {
                    (0, self.decode_header(bytes))
                }
            }
            Phase::ReadDummy(addr) => {
                self.before_read(addr);
                (0, Phase::Read(addr))
            }
            Phase::Read(addr) => (self.peek(addr), Phase::Read(Self::advance(addr))),
            Phase::Write { start, addr } => {
                self.poke(addr, out);
                (
                    0,
                    Phase::Write {
                        start,
                        addr: Self::advance(addr),
                    },
                )
            }
            Phase::Host => (0, Phase::Host),
        };
        self.phase = next;
        Ok(reply)
    }

    fn decode_header(&mut self, bytes: [u8; 3]) -> Phase {
        let addr = ((bytes[0] & 0x3F) as u32) << 16 | (bytes[1] as u32) << 8 | bytes[2] as u32;
        match bytes[0] & 0xC0 {
            0x80 => Phase::Write { start: addr, addr },
            0x40 => {
                self.host_command(bytes[0], bytes[1]);
                Phase::Host
            }
            _ => Phase::ReadDummy(addr),
        }
    }

    fn host_command(&mut self, cmd: u8, param: u8) {
        // log is bounded; oldest entries win
        let _ = self.host_commands.push((cmd, param));
        if cmd == 0x00 {
            self.awake = true;
        }
    }

    fn before_read(&mut self, addr: u32) {
        if addr == reg::ID.address {
            let ready = self.awake && self.id_polls >= self.id_ready_after;
            self.id_polls += 1;
            self.set_reg(reg::ID, if ready { CHIP_ID as u32 } else { 0 });
        } else if addr == reg::CMD_READ.address {
            if let Some(left) = self.pending_polls {
                if left == 0 {
                    self.pending_polls = None;
                    self.consume();
                } else {
                    self.pending_polls = Some(left - 1);
                }
            }
        }
    }

    fn select(&mut self) {
        if self.selected {
            self.overlapping_selects += 1;
        }
        self.selected = true;
        self.transaction_len = 0;
        self.phase = Phase::Header {
            bytes: [0; 3],
            n: 0,
        };
    }

    fn deselect(&mut self) {
        if !self.selected {
            return;
        }
        self.selected = false;
        if self.unflushed {
            self.unflushed_releases += 1;
            self.unflushed = false;
        }
        self.transactions += 1;
        self.last_transaction_len = self.transaction_len;
        match self.phase {
            // three zero bytes and no dummy: ACTIVE
            Phase::ReadDummy(0) => self.host_command(0x00, 0x00),
            Phase::Write { start, addr } => self.after_write(start, addr),
            _ => {}
        }
        self.phase = Phase::Idle;
    }

    fn after_write(&mut self, start: u32, end: u32) {
        let covers = |r: Register| start <= r.address && r.address < end;

        if covers(reg::CPURESET) {
            let value = self.reg(reg::CPURESET);
            if value & 0x1 != 0 {
                self.pending_polls = None;
            } else {
                self.faulted = false;
            }
        }
        if covers(reg::DLSWAP) && !self.dlswap_stuck && self.reg(reg::DLSWAP) != 0 {
            self.dl_swaps += 1;
            self.set_reg(reg::DLSWAP, 0);
        }
        if covers(reg::CMD_WRITE) {
            if self.reg(reg::CPURESET) & 0x1 != 0 {
                return;
            }
            match self.fifo {
                FifoBehavior::Lag(0) => self.consume(),
                FifoBehavior::Lag(n) => self.pending_polls = Some(n),
                FifoBehavior::Stall => {}
                FifoBehavior::Fault => self.fault(),
            }
        }
    }

    fn fault(&mut self) {
        self.faulted = true;
        self.pending_polls = None;
        self.set_reg(reg::CMD_READ, FAULT_SENTINEL as u32);
    }

    /// Run everything between the read and write pointers
    fn consume(&mut self) {
        if self.faulted {
            return;
        }
        let read = (self.reg(reg::CMD_READ) & 0xFFF) as u16;
        let write = (self.reg(reg::CMD_WRITE) & 0xFFF) as u16;
        let len = ring::fullness(read, write) as usize;

        let mut burst = [0u8; RAM_CMD_SIZE as usize];
        for (i, b) in burst.iter_mut().take(len).enumerate() {
            *b = self.ram_cmd[ring::increment_offset(read, i as u16) as usize];
        }
        self.last_burst.clear();
        let _ = self.last_burst.extend_from_slice(&burst[..len]);

        let mut pos = 0;
        while pos < len {
            match Command::decode(&burst[pos..len]) {
                Ok((cmd, used)) => {
                    let at = ring::increment_offset(read, pos as u16);
                    self.execute(&cmd, at);
                    pos += used;
                }
                Err(_) => {
                    self.fault();
                    return;
                }
            }
        }
        self.set_reg(reg::CMD_READ, write as u32);
    }

    fn execute(&mut self, cmd: &Command<'_>, at: u16) {
        self.executed += 1;
        match *cmd {
            Command::DlStart => self.set_reg(reg::CMD_DL, 0),
            Command::Dl(word) => {
                let dl = self.reg(reg::CMD_DL);
                let bytes = word.0.to_le_bytes();
                for (i, b) in bytes.iter().enumerate() {
                    self.poke(RAM_DL + dl + i as u32, *b);
                }
                self.set_reg(reg::CMD_DL, (dl + 4).min(RAM_DL_SIZE - 4));
            }
            Command::Swap => self.cmd_swaps += 1,
            Command::Calibrate => {
                let slot = ring::increment_offset(at, 4) as usize;
                let result = self.calibrate_result.to_le_bytes();
                self.ram_cmd[slot..slot + 4].copy_from_slice(&result);
            }
            Command::MemWrite { ptr, data } => {
                for (i, b) in data.iter().enumerate() {
                    self.poke(ptr + i as u32, *b);
                }
            }
            Command::MemZero { ptr, num } => {
                for i in 0..num {
                    self.poke(ptr + i, 0);
                }
            }
            Command::MemSet { ptr, value, num } => {
                for i in 0..num {
                    self.poke(ptr + i, value as u8);
                }
            }
            _ => {}
        }
    }
}

/// Simulated co-processor
///
/// Hands out a link, a chip-select line, a power-down line and a delay
/// source that all share this chip's state.
pub struct SimEve {
    state: RefCell<State>,
}

impl SimEve {
    /// A powered chip that answers `ID` as soon as it has seen `ACTIVE`
    pub fn new() -> Self {
        Self {
            state: RefCell::new(State::new()),
        }
    }

    /// A chip that has already been brought up (awake, ring empty)
    pub fn ready() -> Self {
        let sim = Self::new();
        sim.state.borrow_mut().awake = true;
        sim
    }

    /// Serial link and chip-select line
    pub fn link(&self) -> (SimLink<'_>, SimSelect<'_>) {
        (SimLink(self), SimSelect(self))
    }

    /// Power-down line
    pub fn power_down(&self) -> SimPowerDown<'_> {
        SimPowerDown(self)
    }

    /// Delay source that advances the simulated clock
    pub fn delay(&self) -> SimDelay<'_> {
        SimDelay(self)
    }

    /// Read a register directly
    pub fn reg(&self, register: Register) -> u32 {
        self.state.borrow_mut().reg(register)
    }

    /// Write a register directly, without side effects
    pub fn set_reg(&self, register: Register, value: u32) {
        self.state.borrow_mut().set_reg(register, value);
    }

    /// Read bytes from simulated memory
    pub fn read_memory(&self, addr: u32, out: &mut [u8]) {
        let mut state = self.state.borrow_mut();
        for (i, b) in out.iter_mut().enumerate() {
            *b = state.peek(addr + i as u32);
        }
    }

    /// Display-list word at `index` in `RAM_DL`
    pub fn dl_word(&self, index: usize) -> u32 {
        let mut bytes = [0u8; 4];
        self.read_memory(RAM_DL + 4 * index as u32, &mut bytes);
        u32::from_le_bytes(bytes)
    }

    /// Ring contents starting at `offset`, wrapping
    pub fn ring_bytes(&self, offset: u16, out: &mut [u8]) {
        let state = self.state.borrow();
        for (i, b) in out.iter_mut().enumerate() {
            *b = state.ram_cmd[ring::increment_offset(offset, i as u16) as usize];
        }
    }

    /// Bytes consumed by the co-processor in its latest run
    pub fn last_burst(&self) -> Vec<u8, 4096> {
        self.state.borrow().last_burst.clone()
    }

    /// Set how `CMD_WRITE` updates are handled
    pub fn set_fifo_behavior(&self, fifo: FifoBehavior) {
        self.state.borrow_mut().fifo = fifo;
    }

    /// Make `ID` read 0 for the first `polls` reads after `ACTIVE`
    pub fn set_id_ready_after(&self, polls: u32) {
        self.state.borrow_mut().id_ready_after = polls;
    }

    /// Keep `DLSWAP` non-zero after it is written
    pub fn set_dlswap_stuck(&self, stuck: bool) {
        self.state.borrow_mut().dlswap_stuck = stuck;
    }

    /// Value written into the result slot of `CMD_CALIBRATE`
    pub fn set_calibrate_result(&self, result: u32) {
        self.state.borrow_mut().calibrate_result = result;
    }

    /// Fail every exchange after `n` more succeed
    pub fn fail_after(&self, n: u32) {
        self.state.borrow_mut().fail_after = Some(n);
    }

    /// Place a finger at screen position (`x`, `y`) over `tag`
    pub fn touch(&self, x: i16, y: i16, tag: u8) {
        let mut state = self.state.borrow_mut();
        let xy = (x as u16 as u32) << 16 | y as u16 as u32;
        state.set_reg(reg::TOUCH_SCREEN_XY, xy);
        state.set_reg(reg::TOUCH_TAG_XY, xy);
        state.set_reg(reg::TOUCH_TAG, tag as u32);
    }

    /// Lift the finger
    pub fn release_touch(&self) {
        let mut state = self.state.borrow_mut();
        state.set_reg(reg::TOUCH_SCREEN_XY, NO_TOUCH);
        state.set_reg(reg::TOUCH_TAG, 0);
    }

    /// Whether chip select is currently asserted
    pub fn cs_selected(&self) -> bool {
        self.state.borrow().selected
    }

    /// Times select was called while already selected
    pub fn overlapping_selects(&self) -> u32 {
        self.state.borrow().overlapping_selects
    }

    /// Bytes clocked while chip select was released
    pub fn stray_bytes(&self) -> u32 {
        self.state.borrow().stray_bytes
    }

    /// Transactions ended while bytes were still unflushed on the link
    pub fn unflushed_releases(&self) -> u32 {
        self.state.borrow().unflushed_releases
    }

    /// Completed chip-select transactions
    pub fn transactions(&self) -> u32 {
        self.state.borrow().transactions
    }

    /// Bytes clocked in the latest completed transaction
    pub fn last_transaction_len(&self) -> usize {
        self.state.borrow().last_transaction_len
    }

    /// Host commands received, oldest first, as `(opcode, parameter)`
    pub fn host_commands(&self) -> Vec<(u8, u8), 16> {
        self.state.borrow().host_commands.clone()
    }

    /// Whether the chip has been woken with `ACTIVE`
    pub fn is_awake(&self) -> bool {
        self.state.borrow().awake
    }

    /// Times the power-down line was asserted
    pub fn resets(&self) -> u32 {
        self.state.borrow().resets
    }

    /// Co-processor commands executed so far
    pub fn executed(&self) -> u32 {
        self.state.borrow().executed
    }

    /// `CMD_SWAP` commands executed so far
    pub fn cmd_swaps(&self) -> u32 {
        self.state.borrow().cmd_swaps
    }

    /// Display-list swaps requested through `DLSWAP`
    pub fn dl_swaps(&self) -> u32 {
        self.state.borrow().dl_swaps
    }

    /// Whether the co-processor is in the fault state
    pub fn is_faulted(&self) -> bool {
        self.state.borrow().faulted
    }

    /// Latest link clock requested by the driver
    pub fn spi_hz(&self) -> u32 {
        self.state.borrow().spi_hz
    }

    /// Simulated time spent in delays, in nanoseconds
    pub fn elapsed_ns(&self) -> u64 {
        self.state.borrow().elapsed_ns
    }
}

impl Default for SimEve {
    fn default() -> Self {
        Self::new()
    }
}

/// Serial link into a [`SimEve`]
pub struct SimLink<'a>(&'a SimEve);

impl Transport for SimLink<'_> {
    type Error = SimError;

    fn exchange(&mut self, byte: u8) -> Result<u8, SimError> {
        self.0.state.borrow_mut().exchange(byte)
    }

    fn flush(&mut self) -> Result<(), SimError> {
        self.0.state.borrow_mut().unflushed = false;
        Ok(())
    }

    fn set_frequency(&mut self, hz: u32) -> Result<(), SimError> {
        self.0.state.borrow_mut().spi_hz = hz;
        Ok(())
    }
}

/// Chip-select line of a [`SimEve`]
pub struct SimSelect<'a>(&'a SimEve);

impl ChipSelect for SimSelect<'_> {
    fn select(&mut self) {
        self.0.state.borrow_mut().select();
    }

    fn deselect(&mut self) {
        self.0.state.borrow_mut().deselect();
    }
}

/// Power-down line of a [`SimEve`]
pub struct SimPowerDown<'a>(&'a SimEve);

impl PowerDown for SimPowerDown<'_> {
    fn assert_reset(&mut self) {
        let mut state = self.0.state.borrow_mut();
        state.resets += 1;
        state.awake = false;
        state.id_polls = 0;
    }

    fn release_reset(&mut self) {}
}

/// Delay source advancing the simulated clock
pub struct SimDelay<'a>(&'a SimEve);

impl DelayNs for SimDelay<'_> {
    fn delay_ns(&mut self, ns: u32) {
        self.0.state.borrow_mut().elapsed_ns += ns as u64;
    }
}
