//! Everything the CHIP-8 program can see: RAM, registers, the call stack,
//! timers, the keypad and the framebuffer. Nothing in here knows how to
//! execute an instruction; see `interpreter` for that.
use crate::memory::Chip8MemoryMap;

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;

/// how many return addresses fit on the call stack
pub const STACK_DEPTH: usize = 64;

/// index of the flag register, VF
pub const FLAG: usize = 0xf;

/// 64x32 monochrome display, row-major, origin top-left
#[derive(Clone, PartialEq, Eq)]
pub struct Framebuffer {
    pixels: [[bool; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
}

impl Framebuffer {
    pub fn new() -> Self {
        Framebuffer {
            pixels: [[false; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
        }
    }

    pub fn clear(&mut self) {
        self.pixels = [[false; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
    }

    /// coordinates wrap, so anything off the right edge reappears on the left
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.pixels[y % DISPLAY_HEIGHT][x % DISPLAY_WIDTH]
    }

    pub fn set(&mut self, x: usize, y: usize, on: bool) {
        self.pixels[y % DISPLAY_HEIGHT][x % DISPLAY_WIDTH] = on;
    }

    /// XOR a pixel on; returns true if it was already on (i.e. it just got
    /// erased)
    pub fn toggle(&mut self, x: usize, y: usize) -> bool {
        let px = &mut self.pixels[y % DISPLAY_HEIGHT][x % DISPLAY_WIDTH];
        let was_on = *px;
        *px = !was_on;
        was_on
    }

    pub fn rows(&self) -> impl Iterator<Item = &[bool; DISPLAY_WIDTH]> {
        self.pixels.iter()
    }

    /// (x, y) of every pixel in the given state
    pub fn points(&self, on: bool) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.pixels.iter().enumerate().flat_map(move |(y, row)| {
            row.iter()
                .enumerate()
                .filter(move |(_, px)| **px == on)
                .map(move |(x, _)| (x, y))
        })
    }

    pub fn is_blank(&self) -> bool {
        self.points(true).next().is_none()
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.rows() {
            let line: String = row.iter().map(|px| if *px { '#' } else { '.' }).collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// the 16-key hex keypad, 0x0-0xf
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Keypad {
    pressed: [bool; 16],
}

impl Keypad {
    pub fn press(&mut self, key: u8) {
        self.pressed[(key & 0x0f) as usize] = true;
    }

    pub fn release(&mut self, key: u8) {
        self.pressed[(key & 0x0f) as usize] = false;
    }

    pub fn is_pressed(&self, key: u8) -> bool {
        self.pressed[(key & 0x0f) as usize]
    }
}

/// Return addresses for 2NNN/00EE. Running out of room (or popping an
/// empty stack) means the program or the interpreter is broken, so both
/// panic.
#[derive(Debug, Default, Clone)]
pub struct CallStack {
    frames: Vec<u16>,
}

impl CallStack {
    pub fn new() -> Self {
        CallStack {
            frames: Vec::with_capacity(STACK_DEPTH),
        }
    }

    pub fn push(&mut self, addr: u16) {
        assert!(
            self.frames.len() < STACK_DEPTH,
            "call stack overflow: more than {} nested calls",
            STACK_DEPTH
        );
        self.frames.push(addr);
    }

    pub fn pop(&mut self) -> u16 {
        match self.frames.pop() {
            Some(addr) => addr,
            None => panic!("call stack underflow: return with no matching call"),
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// The whole CHIP-8 machine. Owned by exactly one interpreter and mutated
/// in place.
pub struct Machine {
    pub memory: Chip8MemoryMap,
    /// V0..VF; VF doubles as carry/borrow/collision flag
    pub v: [u8; 16],
    /// I
    pub index: u16,
    pub program_counter: u16,
    pub stack: CallStack,
    pub delay_timer: u8,
    pub sound_timer: u8,
    pub framebuffer: Framebuffer,
    pub keypad: Keypad,
    /// set by FX0A: the register that receives the next key press
    pub awaiting_key: Option<usize>,
}

impl Machine {
    pub fn new() -> Self {
        let memory = Chip8MemoryMap::new();
        let program_counter = memory.program_addr;
        Machine {
            memory,
            v: [0; 16],
            index: 0,
            program_counter,
            stack: CallStack::new(),
            delay_timer: 0,
            sound_timer: 0,
            framebuffer: Framebuffer::new(),
            keypad: Keypad::default(),
            awaiting_key: None,
        }
    }

    /// one 60Hz tick for both timers
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryMap;

    #[test]
    fn test_new_machine_state() {
        let m = Machine::new();
        assert_eq!(m.program_counter, 0x200);
        assert_eq!(m.index, 0);
        assert_eq!(m.v, [0; 16]);
        assert_eq!(m.stack.depth(), 0);
        assert!(m.framebuffer.is_blank());
        assert_eq!(m.memory.get_byte(0x50), 0xf0);
        assert_eq!(m.awaiting_key, None);
    }

    #[test]
    fn test_framebuffer_wraps() {
        let mut fb = Framebuffer::new();
        fb.set(64 + 3, 32 + 1, true);
        assert!(fb.get(3, 1));
        assert_eq!(fb.points(true).collect::<Vec<_>>(), vec![(3, 1)]);
    }

    #[test]
    fn test_framebuffer_toggle() {
        let mut fb = Framebuffer::new();
        assert!(!fb.toggle(10, 10));
        assert!(fb.get(10, 10));
        assert!(fb.toggle(10, 10));
        assert!(!fb.get(10, 10));
    }

    #[test]
    fn test_framebuffer_points_count() {
        let fb = Framebuffer::new();
        assert_eq!(fb.points(false).count(), 2048);
        assert_eq!(fb.points(true).count(), 0);
    }

    #[test]
    fn test_keypad() {
        let mut k = Keypad::default();
        k.press(0xa);
        assert!(k.is_pressed(0xa));
        assert!(!k.is_pressed(0xb));
        k.release(0xa);
        assert!(!k.is_pressed(0xa));
    }

    #[test]
    fn test_stack_push_pop() {
        let mut s = CallStack::new();
        s.push(0x202);
        s.push(0x304);
        assert_eq!(s.depth(), 2);
        assert_eq!(s.pop(), 0x304);
        assert_eq!(s.pop(), 0x202);
    }

    #[test]
    fn test_stack_holds_full_depth() {
        let mut s = CallStack::new();
        for n in 0..STACK_DEPTH {
            s.push(n as u16);
        }
        assert_eq!(s.depth(), STACK_DEPTH);
    }

    #[test]
    #[should_panic(expected = "call stack overflow")]
    fn test_stack_overflow_panics() {
        let mut s = CallStack::new();
        for n in 0..=STACK_DEPTH {
            s.push(n as u16);
        }
    }

    #[test]
    #[should_panic(expected = "call stack underflow")]
    fn test_stack_underflow_panics() {
        CallStack::new().pop();
    }

    #[test]
    fn test_timers_stop_at_zero() {
        let mut m = Machine::new();
        m.delay_timer = 2;
        m.sound_timer = 1;
        m.tick_timers();
        assert_eq!((m.delay_timer, m.sound_timer), (1, 0));
        m.tick_timers();
        m.tick_timers();
        assert_eq!((m.delay_timer, m.sound_timer), (0, 0));
    }
}
