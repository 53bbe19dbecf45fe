use std::io;
use std::io::Read;

use crate::error::{Chip8Error, MAX_ROM_SIZE};

// NB. addresses are u16 as per the chip-8; lengths are usize to stop endless casting

/// Represents the flat address space the interpreter fetches from and draws
/// sprites out of. Every access is bounds-checked: going past the top of RAM
/// is a bug in the interpreter, so it panics rather than wrapping.
pub trait MemoryMap {
    /// write a chunk of bytes into "RAM"
    fn write(&mut self, data: &[u8], addr: u16) {
        self.get_rw_slice(addr, data.len()).copy_from_slice(data);
    }

    /// get a big-endian two-byte word (instructions)
    fn get_word(&self, addr: u16) -> u16 {
        let word = self.get_ro_slice(addr, 2);
        u16::from_be_bytes([word[0], word[1]])
    }

    /// get a single byte
    fn get_byte(&self, addr: u16) -> u8 {
        self.get_ro_slice(addr, 1)[0]
    }

    /// get a r/w slice of the underlying memory (heap)
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> &mut [u8];

    /// get a r/o slice of the underlying memory (heap)
    fn get_ro_slice(&self, addr: u16, len: usize) -> &[u8];
}

/// Defines the CHIP-8 memory map used here:
///   0x0000-0x004f  unused (zero)
///   0x0050-0x009f  hex digit glyphs
///   0x00a0-0x01ff  unused (zero)
///   0x0200-0x0fff  program, then free workspace
///
/// the call stack and display live outside of RAM, in the machine state
pub struct Chip8MemoryMap {
    bytes: Box<[u8]>,
    pub program_addr: u16,
    pub glyph_addr: u16,
}

impl MemoryMap for Chip8MemoryMap {
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> &mut [u8] {
        let a = addr as usize;
        &mut self.bytes[a..(a + len)]
    }
    fn get_ro_slice(&self, addr: u16, len: usize) -> &[u8] {
        let a = addr as usize;
        &self.bytes[a..(a + len)]
    }
}

/// how much RAM we have
pub const CHIP8_RAM_SIZE_BYTES: u16 = 4096;

/// where the program is loaded
pub const CHIP8_PROGRAM_ADDR: u16 = 0x0200;

/// where the hex digit glyphs live, and how many bytes each one takes
pub const CHIP8_GLYPH_ADDR: u16 = 0x050;
pub const CHIP8_GLYPH_HEIGHT: u16 = 5;

impl Chip8MemoryMap {
    /// zeroed RAM with the glyphs baked in
    pub fn new() -> Self {
        let mut mm = Chip8MemoryMap {
            bytes: Box::new([0u8; CHIP8_RAM_SIZE_BYTES as usize]),
            program_addr: CHIP8_PROGRAM_ADDR,
            glyph_addr: CHIP8_GLYPH_ADDR,
        };
        mm.load_glyphs();
        mm
    }

    /// (re)write the glyph table; harmless to call more than once
    pub fn load_glyphs(&mut self) {
        self.write(&CHIP8_GLYPHS, self.glyph_addr);
    }

    /// address of the glyph for the low nibble of `digit`
    pub fn glyph_addr_for(&self, digit: u8) -> u16 {
        self.glyph_addr + CHIP8_GLYPH_HEIGHT * (digit & 0x0f) as u16
    }

    /// load a CHIP-8 program at 0x200
    pub fn load_program(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        if rom.len() > MAX_ROM_SIZE {
            return Err(Chip8Error::RomTooLarge {
                size: rom.len(),
                max: MAX_ROM_SIZE,
            });
        }
        self.write(rom, self.program_addr);
        Ok(())
    }

    /// read a whole ROM from somewhere, then load it at 0x200
    pub fn load_program_from(&mut self, reader: &mut impl io::Read) -> Result<usize, Chip8Error> {
        let mut buf = Vec::new();
        // read one byte past the limit so we can tell the ROM is too big
        // without slurping an arbitrarily large file
        let len = reader
            .take(MAX_ROM_SIZE as u64 + 1)
            .read_to_end(&mut buf)
            .map_err(Chip8Error::RomUnreadable)?;
        self.load_program(&buf)?;
        Ok(len)
    }

    /// hex dump `len` bytes from `addr`, sixteen to a line, each line
    /// prefixed with its address
    pub fn dump(&self, out: &mut impl io::Write, addr: u16, len: usize) -> io::Result<()> {
        for (n, line) in self.get_ro_slice(addr, len).chunks(16).enumerate() {
            write!(out, "{:04x}:", addr as usize + n * 16)?;
            for b in line {
                write!(out, " {:02x}", b)?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

impl Default for Chip8MemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

/// 4x5 hex digit glyphs, one byte per scanline, high nibble only
pub const CHIP8_GLYPHS: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];
