/// # interpreter
///
/// Fetch/decode/execute over a `Machine`. One call to `cycle()` is one
/// CHIP-8 instruction:
///
///  1. fetch   -- two bytes at PC, big-endian; PC += 2. PC past the top of
///                RAM means we've halted and nothing happens. A word of
///                0x0000 means we ran off the end of the program into
///                zeroed memory, which ends the run.
///  2. decode  -- see `Instruction::decode`
///  3. execute -- one handler per instruction family. The only effect a
///                handler has outside the machine is asking for a redraw.
///
/// VF rules: an instruction that sets a flag always writes its result
/// first and the flag last, so with X == F the flag is what's left behind.
/// 7XNN never touches VF.
///
/// Some instructions behaved differently on later interpreters than on the
/// COSMAC VIP; `Quirks` picks which.
use crate::error::Chip8Error;
use crate::instruction::Instruction;
use crate::machine::{Machine, DISPLAY_HEIGHT, DISPLAY_WIDTH, FLAG};
use crate::memory::{MemoryMap, CHIP8_RAM_SIZE_BYTES};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io;
use tracing::{debug, trace, warn};

/// behaviour switches for instructions that differ between interpreters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Quirks {
    /// 8XY6/8XYE shift VY into VX (COSMAC VIP) rather than shifting VX
    pub shift_uses_vy: bool,
    /// FX55/FX65 leave I pointing past the last register (COSMAC VIP)
    pub load_store_advances_index: bool,
}

/// what the fetch step found at PC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetch {
    Word(u16),
    /// PC is past the top of RAM
    Halted,
    /// the word at `addr` was 0x0000
    EndOfProgram { addr: u16 },
}

/// what a handler asks of the outside world
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    Redraw,
}

/// the outcome of one `cycle()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    Ran(Effect),
    /// halted, or blocked on FX0A
    Idle,
    EndOfProgram { addr: u16 },
}

pub struct Chip8Interpreter {
    machine: Machine,
    quirks: Quirks,
    rng: StdRng,
    fetches: u64,
}

impl Chip8Interpreter {
    pub fn new(quirks: Quirks) -> Self {
        Self::with_rng(quirks, StdRng::from_entropy())
    }

    /// deterministic CXNN, for tests
    pub fn with_seed(quirks: Quirks, seed: u64) -> Self {
        Self::with_rng(quirks, StdRng::seed_from_u64(seed))
    }

    fn with_rng(quirks: Quirks, rng: StdRng) -> Self {
        Chip8Interpreter {
            machine: Machine::new(),
            quirks,
            rng,
            fetches: 0,
        }
    }

    /// load a chip8 program
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize, Chip8Error> {
        self.machine.memory.load_program_from(reader)
    }

    /// load a chip8 program that's already in memory
    pub fn load_rom(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        self.machine.memory.load_program(rom)
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }

    /// how many words have been fetched so far
    pub fn fetches(&self) -> u64 {
        self.fetches
    }

    /// one full fetch/decode/execute
    pub fn cycle(&mut self) -> Cycle {
        if self.machine.awaiting_key.is_some() {
            return Cycle::Idle;
        }
        match self.fetch() {
            Fetch::Word(word) => Cycle::Ran(self.execute(Instruction::decode(word))),
            Fetch::Halted => Cycle::Idle,
            Fetch::EndOfProgram { addr } => Cycle::EndOfProgram { addr },
        }
    }

    /// read the word at PC and step past it
    pub fn fetch(&mut self) -> Fetch {
        let pc = self.machine.program_counter;
        // both bytes have to be inside RAM
        if pc >= CHIP8_RAM_SIZE_BYTES - 1 {
            return Fetch::Halted;
        }
        let word = self.machine.memory.get_word(pc);
        self.machine.program_counter = pc + 2;
        self.fetches += 1;
        if word == 0x0000 {
            Fetch::EndOfProgram { addr: pc }
        } else {
            Fetch::Word(word)
        }
    }

    /// a key went down; satisfies a pending FX0A
    pub fn key_down(&mut self, key: u8) {
        let key = key & 0x0f;
        self.machine.keypad.press(key);
        if let Some(x) = self.machine.awaiting_key.take() {
            debug!("key 0x{:x} delivered to V{:X}", key, x);
            self.machine.v[x] = key;
        }
    }

    pub fn key_up(&mut self, key: u8) {
        self.machine.keypad.release(key);
    }

    pub fn tick_timers(&mut self) {
        self.machine.tick_timers();
    }

    pub fn execute(&mut self, instruction: Instruction) -> Effect {
        use Instruction::*;

        trace!(
            "{:04x}: {}",
            self.machine.program_counter.wrapping_sub(2),
            instruction
        );
        let m = &mut self.machine;
        match instruction {
            ClearScreen => {
                m.framebuffer.clear();
                return Effect::Redraw;
            }
            Return => m.program_counter = m.stack.pop(),
            Jump { addr } => m.program_counter = addr,
            Call { addr } => {
                m.stack.push(m.program_counter);
                m.program_counter = addr;
            }
            SkipIfEqImm { x, nn } => self.skip_if(self.machine.v[x] == nn),
            SkipIfNeImm { x, nn } => self.skip_if(self.machine.v[x] != nn),
            SkipIfEqReg { x, y } => self.skip_if(self.machine.v[x] == self.machine.v[y]),
            SkipIfNeReg { x, y } => self.skip_if(self.machine.v[x] != self.machine.v[y]),
            SetImm { x, nn } => m.v[x] = nn,
            AddImm { x, nn } => m.v[x] = m.v[x].wrapping_add(nn),
            Copy { x, y } => m.v[x] = m.v[y],
            Or { x, y } => m.v[x] |= m.v[y],
            And { x, y } => m.v[x] &= m.v[y],
            Xor { x, y } => m.v[x] ^= m.v[y],
            AddReg { x, y } => {
                let (result, carry) = m.v[x].overflowing_add(m.v[y]);
                self.set_with_flag(x, result, carry);
            }
            Sub { x, y } => {
                let (result, borrow) = m.v[x].overflowing_sub(m.v[y]);
                self.set_with_flag(x, result, !borrow);
            }
            SubReverse { x, y } => {
                let (result, borrow) = m.v[y].overflowing_sub(m.v[x]);
                self.set_with_flag(x, result, !borrow);
            }
            ShiftRight { x, y } => {
                let src = self.shift_source(x, y);
                self.set_with_flag(x, src >> 1, src & 0x01 != 0);
            }
            ShiftLeft { x, y } => {
                let src = self.shift_source(x, y);
                self.set_with_flag(x, src << 1, src & 0x80 != 0);
            }
            SetIndex { addr } => m.index = addr,
            JumpOffset { addr } => m.program_counter = addr + m.v[0] as u16,
            Random { x, nn } => m.v[x] = self.rng.gen::<u8>() & nn,
            Draw { x, y, n } => {
                self.draw_sprite(x, y, n);
                return Effect::Redraw;
            }
            SkipIfKey { x } => self.skip_if(self.machine.keypad.is_pressed(self.machine.v[x])),
            SkipIfNotKey { x } => {
                self.skip_if(!self.machine.keypad.is_pressed(self.machine.v[x]))
            }
            GetDelay { x } => m.v[x] = m.delay_timer,
            WaitKey { x } => {
                debug!("waiting for a key press into V{:X}", x);
                m.awaiting_key = Some(x);
            }
            SetDelay { x } => m.delay_timer = m.v[x],
            SetSound { x } => m.sound_timer = m.v[x],
            AddIndex { x } => m.index = m.index.wrapping_add(m.v[x] as u16),
            Glyph { x } => m.index = m.memory.glyph_addr_for(m.v[x]),
            Bcd { x } => {
                let value = m.v[x];
                let digits = [value / 100, (value / 10) % 10, value % 10];
                m.memory.write(&digits, m.index);
            }
            Store { x } => {
                let regs = m.v;
                m.memory.write(&regs[..=x], m.index);
                self.advance_index_after_load_store(x);
            }
            Load { x } => {
                let bytes = m.memory.get_ro_slice(m.index, x + 1);
                m.v[..=x].copy_from_slice(bytes);
                self.advance_index_after_load_store(x);
            }
            Unknown(word) => {
                warn!(
                    "unknown instruction 0x{:04x} at 0x{:04x}, skipping",
                    word,
                    self.machine.program_counter.wrapping_sub(2)
                );
            }
        }
        Effect::None
    }

    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.machine.program_counter += 2;
        }
    }

    /// result first, flag second, so VF ends up holding the flag
    fn set_with_flag(&mut self, x: usize, result: u8, flag: bool) {
        self.machine.v[x] = result;
        self.machine.v[FLAG] = flag as u8;
    }

    fn shift_source(&self, x: usize, y: usize) -> u8 {
        if self.quirks.shift_uses_vy {
            self.machine.v[y]
        } else {
            self.machine.v[x]
        }
    }

    fn advance_index_after_load_store(&mut self, x: usize) {
        if self.quirks.load_store_advances_index {
            self.machine.index = self.machine.index.wrapping_add(x as u16 + 1);
        }
    }

    /// XOR an 8xN sprite from I onto the display at (VX, VY), wrapping at
    /// the edges. VF ends up 1 if any lit pixel got erased.
    fn draw_sprite(&mut self, x: usize, y: usize, n: u8) {
        let m = &mut self.machine;
        let origin_x = m.v[x] as usize % DISPLAY_WIDTH;
        let origin_y = m.v[y] as usize % DISPLAY_HEIGHT;
        m.v[FLAG] = 0;

        let sprite = m.memory.get_ro_slice(m.index, n as usize);
        let mut collision = false;
        for (row, bits) in sprite.iter().enumerate() {
            for col in 0..8 {
                if bits & (0x80 >> col) == 0 {
                    continue;
                }
                if m.framebuffer.toggle(origin_x + col, origin_y + row) {
                    collision = true;
                }
            }
        }
        if collision {
            m.v[FLAG] = 1;
        }
    }
}
