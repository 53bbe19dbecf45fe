//! # instruction
//!
//! Turns a raw 16-bit word into a decoded CHIP-8 instruction. Operand
//! fields are pulled out the same way for every family:
//!
//!  X   -- bits 11-8, first register
//!  Y   -- bits 7-4, second register
//!  N   -- bits 3-0, 4-bit immediate
//!  NN  -- bits 7-0, 8-bit immediate
//!  NNN -- bits 11-0, 12-bit address
//!
//! Anything that isn't a known pattern decodes to `Unknown`, which the
//! interpreter reports and skips.
use std::fmt;

/// a single decoded instruction; registers are already usize for indexing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 00E0
    ClearScreen,
    /// 00EE
    Return,
    /// 1NNN
    Jump { addr: u16 },
    /// 2NNN
    Call { addr: u16 },
    /// 3XNN
    SkipIfEqImm { x: usize, nn: u8 },
    /// 4XNN
    SkipIfNeImm { x: usize, nn: u8 },
    /// 5XY0
    SkipIfEqReg { x: usize, y: usize },
    /// 6XNN
    SetImm { x: usize, nn: u8 },
    /// 7XNN, never touches VF
    AddImm { x: usize, nn: u8 },
    /// 8XY0
    Copy { x: usize, y: usize },
    /// 8XY1
    Or { x: usize, y: usize },
    /// 8XY2
    And { x: usize, y: usize },
    /// 8XY3
    Xor { x: usize, y: usize },
    /// 8XY4, VF = carry
    AddReg { x: usize, y: usize },
    /// 8XY5, VX = VX - VY, VF = not borrow
    Sub { x: usize, y: usize },
    /// 8XY6, VF = bit shifted out
    ShiftRight { x: usize, y: usize },
    /// 8XY7, VX = VY - VX, VF = not borrow
    SubReverse { x: usize, y: usize },
    /// 8XYE, VF = bit shifted out
    ShiftLeft { x: usize, y: usize },
    /// 9XY0
    SkipIfNeReg { x: usize, y: usize },
    /// ANNN
    SetIndex { addr: u16 },
    /// BNNN
    JumpOffset { addr: u16 },
    /// CXNN
    Random { x: usize, nn: u8 },
    /// DXYN, VF = collision
    Draw { x: usize, y: usize, n: u8 },
    /// EX9E
    SkipIfKey { x: usize },
    /// EXA1
    SkipIfNotKey { x: usize },
    /// FX07
    GetDelay { x: usize },
    /// FX0A
    WaitKey { x: usize },
    /// FX15
    SetDelay { x: usize },
    /// FX18
    SetSound { x: usize },
    /// FX1E
    AddIndex { x: usize },
    /// FX29
    Glyph { x: usize },
    /// FX33
    Bcd { x: usize },
    /// FX55
    Store { x: usize },
    /// FX65
    Load { x: usize },
    /// anything else, kept raw so it can be reported
    Unknown(u16),
}

impl Instruction {
    pub fn decode(word: u16) -> Instruction {
        use Instruction::*;

        let x = ((word & 0x0f00) >> 8) as usize;
        let y = ((word & 0x00f0) >> 4) as usize;
        let n = (word & 0x000f) as u8;
        let nn = (word & 0x00ff) as u8;
        let addr = word & 0x0fff;

        match (word & 0xf000) >> 12 {
            0x0 => match word {
                0x00e0 => ClearScreen,
                0x00ee => Return,
                _ => Unknown(word),
            },
            0x1 => Jump { addr },
            0x2 => Call { addr },
            0x3 => SkipIfEqImm { x, nn },
            0x4 => SkipIfNeImm { x, nn },
            0x5 if n == 0 => SkipIfEqReg { x, y },
            0x6 => SetImm { x, nn },
            0x7 => AddImm { x, nn },
            0x8 => match n {
                0x0 => Copy { x, y },
                0x1 => Or { x, y },
                0x2 => And { x, y },
                0x3 => Xor { x, y },
                0x4 => AddReg { x, y },
                0x5 => Sub { x, y },
                0x6 => ShiftRight { x, y },
                0x7 => SubReverse { x, y },
                0xe => ShiftLeft { x, y },
                _ => Unknown(word),
            },
            0x9 if n == 0 => SkipIfNeReg { x, y },
            0xa => SetIndex { addr },
            0xb => JumpOffset { addr },
            0xc => Random { x, nn },
            0xd => Draw { x, y, n },
            0xe => match nn {
                0x9e => SkipIfKey { x },
                0xa1 => SkipIfNotKey { x },
                _ => Unknown(word),
            },
            0xf => match nn {
                0x07 => GetDelay { x },
                0x0a => WaitKey { x },
                0x15 => SetDelay { x },
                0x18 => SetSound { x },
                0x1e => AddIndex { x },
                0x29 => Glyph { x },
                0x33 => Bcd { x },
                0x55 => Store { x },
                0x65 => Load { x },
                _ => Unknown(word),
            },
            _ => Unknown(word),
        }
    }
}

impl From<u16> for Instruction {
    fn from(word: u16) -> Self {
        Instruction::decode(word)
    }
}

/// disassembly, roughly in the traditional mnemonics
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;
        match *self {
            ClearScreen => write!(f, "CLS"),
            Return => write!(f, "RET"),
            Jump { addr } => write!(f, "JP 0x{:03x}", addr),
            Call { addr } => write!(f, "CALL 0x{:03x}", addr),
            SkipIfEqImm { x, nn } => write!(f, "SE V{:X}, 0x{:02x}", x, nn),
            SkipIfNeImm { x, nn } => write!(f, "SNE V{:X}, 0x{:02x}", x, nn),
            SkipIfEqReg { x, y } => write!(f, "SE V{:X}, V{:X}", x, y),
            SetImm { x, nn } => write!(f, "LD V{:X}, 0x{:02x}", x, nn),
            AddImm { x, nn } => write!(f, "ADD V{:X}, 0x{:02x}", x, nn),
            Copy { x, y } => write!(f, "LD V{:X}, V{:X}", x, y),
            Or { x, y } => write!(f, "OR V{:X}, V{:X}", x, y),
            And { x, y } => write!(f, "AND V{:X}, V{:X}", x, y),
            Xor { x, y } => write!(f, "XOR V{:X}, V{:X}", x, y),
            AddReg { x, y } => write!(f, "ADD V{:X}, V{:X}", x, y),
            Sub { x, y } => write!(f, "SUB V{:X}, V{:X}", x, y),
            ShiftRight { x, y } => write!(f, "SHR V{:X}, V{:X}", x, y),
            SubReverse { x, y } => write!(f, "SUBN V{:X}, V{:X}", x, y),
            ShiftLeft { x, y } => write!(f, "SHL V{:X}, V{:X}", x, y),
            SkipIfNeReg { x, y } => write!(f, "SNE V{:X}, V{:X}", x, y),
            SetIndex { addr } => write!(f, "LD I, 0x{:03x}", addr),
            JumpOffset { addr } => write!(f, "JP V0, 0x{:03x}", addr),
            Random { x, nn } => write!(f, "RND V{:X}, 0x{:02x}", x, nn),
            Draw { x, y, n } => write!(f, "DRW V{:X}, V{:X}, {}", x, y, n),
            SkipIfKey { x } => write!(f, "SKP V{:X}", x),
            SkipIfNotKey { x } => write!(f, "SKNP V{:X}", x),
            GetDelay { x } => write!(f, "LD V{:X}, DT", x),
            WaitKey { x } => write!(f, "LD V{:X}, K", x),
            SetDelay { x } => write!(f, "LD DT, V{:X}", x),
            SetSound { x } => write!(f, "LD ST, V{:X}", x),
            AddIndex { x } => write!(f, "ADD I, V{:X}", x),
            Glyph { x } => write!(f, "LD F, V{:X}", x),
            Bcd { x } => write!(f, "LD B, V{:X}", x),
            Store { x } => write!(f, "LD [I], V{:X}", x),
            Load { x } => write!(f, "LD V{:X}, [I]", x),
            Unknown(word) => write!(f, "??? 0x{:04x}", word),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Instruction::*;
    use super::*;

    #[test]
    fn test_decode_minimal_set() {
        assert_eq!(Instruction::decode(0x00e0), ClearScreen);
        assert_eq!(Instruction::decode(0x1228), Jump { addr: 0x228 });
        assert_eq!(Instruction::decode(0x6a15), SetImm { x: 0xa, nn: 0x15 });
        assert_eq!(Instruction::decode(0x7f01), AddImm { x: 0xf, nn: 0x01 });
        assert_eq!(Instruction::decode(0xa23f), SetIndex { addr: 0x23f });
        assert_eq!(
            Instruction::decode(0xd01f),
            Draw { x: 0, y: 1, n: 0xf }
        );
    }

    #[test]
    fn test_decode_sub_variants() {
        assert_eq!(Instruction::decode(0x00ee), Return);
        assert_eq!(Instruction::decode(0x8ab4), AddReg { x: 0xa, y: 0xb });
        assert_eq!(Instruction::decode(0x812e), ShiftLeft { x: 1, y: 2 });
        assert_eq!(Instruction::decode(0xe39e), SkipIfKey { x: 3 });
        assert_eq!(Instruction::decode(0xe4a1), SkipIfNotKey { x: 4 });
        assert_eq!(Instruction::decode(0xf50a), WaitKey { x: 5 });
        assert_eq!(Instruction::decode(0xf665), Load { x: 6 });
        assert_eq!(Instruction::decode(0xb300), JumpOffset { addr: 0x300 });
    }

    #[test]
    fn test_decode_unknown() {
        // machine code routines aren't supported
        assert_eq!(Instruction::decode(0x0123), Unknown(0x0123));
        assert_eq!(Instruction::decode(0x5121), Unknown(0x5121));
        assert_eq!(Instruction::decode(0x8128), Unknown(0x8128));
        assert_eq!(Instruction::decode(0x9121), Unknown(0x9121));
        assert_eq!(Instruction::decode(0xe1ff), Unknown(0xe1ff));
        assert_eq!(Instruction::decode(0xf1ff), Unknown(0xf1ff));
    }

    #[test]
    fn test_disassembly() {
        assert_eq!(Instruction::decode(0xa23f).to_string(), "LD I, 0x23f");
        assert_eq!(Instruction::decode(0xd015).to_string(), "DRW V0, V1, 5");
        assert_eq!(Instruction::decode(0xfa33).to_string(), "LD B, VA");
        assert_eq!(Instruction::decode(0xffff).to_string(), "??? 0xffff");
    }
}
