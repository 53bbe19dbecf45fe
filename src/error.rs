use std::io;
use thiserror::Error;

use crate::memory::{CHIP8_PROGRAM_ADDR, CHIP8_RAM_SIZE_BYTES};

/// largest ROM that fits between the program address and the top of RAM
pub const MAX_ROM_SIZE: usize = (CHIP8_RAM_SIZE_BYTES - CHIP8_PROGRAM_ADDR) as usize;

/// Everything that can stop the interpreter from starting or running. Bad
/// instructions are not in here: they get logged and skipped.
#[derive(Debug, Error)]
pub enum Chip8Error {
    #[error("ROM is {size} bytes but only {max} bytes fit above 0x200")]
    RomTooLarge { size: usize, max: usize },

    #[error("unable to read ROM: {0}")]
    RomUnreadable(#[source] io::Error),

    #[error("display error: {0}")]
    Display(#[source] io::Error),

    #[error("input error: {0}")]
    Input(#[source] io::Error),
}
