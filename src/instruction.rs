/// # instruction set
///
/// Every 16-bit word decodes to exactly one variant; words that mean nothing
/// in the base CHIP-8 set (including the old 0NNN machine-code calls and the
/// SUPER-CHIP extensions) become `Invalid`.
///
/// Fields are named after the nibbles of the word `aXYN`:
///  X    bits 8-11   register index
///  Y    bits 4-7    register index
///  N    bits 0-3    sprite height
///  NN   bits 0-7    immediate byte
///  NNN  bits 0-11   address
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 00E0
    ClearScreen,
    /// 00EE
    Return,
    /// 1NNN
    Jump(u16),
    /// 2NNN
    Call(u16),
    /// 3XNN
    SkipIfEqualImm { x: usize, nn: u8 },
    /// 4XNN
    SkipIfNotEqualImm { x: usize, nn: u8 },
    /// 5XY0
    SkipIfEqualReg { x: usize, y: usize },
    /// 6XNN
    LoadImm { x: usize, nn: u8 },
    /// 7XNN
    AddImm { x: usize, nn: u8 },
    /// 8XY0
    Move { x: usize, y: usize },
    /// 8XY1
    Or { x: usize, y: usize },
    /// 8XY2
    And { x: usize, y: usize },
    /// 8XY3
    Xor { x: usize, y: usize },
    /// 8XY4
    AddReg { x: usize, y: usize },
    /// 8XY5
    Sub { x: usize, y: usize },
    /// 8XY6; Y is ignored
    ShiftRight { x: usize, y: usize },
    /// 8XY7
    SubReverse { x: usize, y: usize },
    /// 8XYE; Y is ignored
    ShiftLeft { x: usize, y: usize },
    /// 9XY0
    SkipIfNotEqualReg { x: usize, y: usize },
    /// ANNN
    SetAddress(u16),
    /// BNNN
    JumpOffset(u16),
    /// CXNN
    Random { x: usize, nn: u8 },
    /// DXYN
    Draw { x: usize, y: usize, n: u8 },
    /// EX9E
    SkipIfKey { x: usize },
    /// EXA1
    SkipIfNotKey { x: usize },
    /// FX07
    ReadDelay { x: usize },
    /// FX0A
    WaitKey { x: usize },
    /// FX15
    WriteDelay { x: usize },
    /// FX18
    WriteSound { x: usize },
    /// FX1E
    AddAddress { x: usize },
    /// FX29
    GlyphAddress { x: usize },
    /// FX33
    StoreBcd { x: usize },
    /// FX55
    Dump { x: usize },
    /// FX65
    Restore { x: usize },
    Invalid(u16),
}

impl Instruction {
    pub fn decode(word: u16) -> Self {
        use Instruction::*;

        let op = (word >> 12) & 0xf;
        let x = ((word >> 8) & 0xf) as usize;
        let y = ((word >> 4) & 0xf) as usize;
        let n = (word & 0xf) as u8;
        let nn = (word & 0xff) as u8;
        let nnn = word & 0x0fff;

        match (op, n) {
            (0x0, _) => match nnn {
                0x0e0 => ClearScreen,
                0x0ee => Return,
                _ => Invalid(word),
            },
            (0x1, _) => Jump(nnn),
            (0x2, _) => Call(nnn),
            (0x3, _) => SkipIfEqualImm { x, nn },
            (0x4, _) => SkipIfNotEqualImm { x, nn },
            (0x5, 0x0) => SkipIfEqualReg { x, y },
            (0x6, _) => LoadImm { x, nn },
            (0x7, _) => AddImm { x, nn },
            (0x8, 0x0) => Move { x, y },
            (0x8, 0x1) => Or { x, y },
            (0x8, 0x2) => And { x, y },
            (0x8, 0x3) => Xor { x, y },
            (0x8, 0x4) => AddReg { x, y },
            (0x8, 0x5) => Sub { x, y },
            (0x8, 0x6) => ShiftRight { x, y },
            (0x8, 0x7) => SubReverse { x, y },
            (0x8, 0xe) => ShiftLeft { x, y },
            (0x9, 0x0) => SkipIfNotEqualReg { x, y },
            (0xa, _) => SetAddress(nnn),
            (0xb, _) => JumpOffset(nnn),
            (0xc, _) => Random { x, nn },
            (0xd, _) => Draw { x, y, n },
            (0xe, _) => match nn {
                0x9e => SkipIfKey { x },
                0xa1 => SkipIfNotKey { x },
                _ => Invalid(word),
            },
            (0xf, _) => match nn {
                0x07 => ReadDelay { x },
                0x0a => WaitKey { x },
                0x15 => WriteDelay { x },
                0x18 => WriteSound { x },
                0x1e => AddAddress { x },
                0x29 => GlyphAddress { x },
                0x33 => StoreBcd { x },
                0x55 => Dump { x },
                0x65 => Restore { x },
                _ => Invalid(word),
            },
            _ => Invalid(word),
        }
    }
}

impl From<u16> for Instruction {
    fn from(word: u16) -> Self {
        Instruction::decode(word)
    }
}

/// conventional (Cowgod-style) mnemonics, for tracing
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;

        match *self {
            ClearScreen => write!(f, "CLS"),
            Return => write!(f, "RET"),
            Jump(nnn) => write!(f, "JP {:#05x}", nnn),
            Call(nnn) => write!(f, "CALL {:#05x}", nnn),
            SkipIfEqualImm { x, nn } => write!(f, "SE V{:X}, {:#04x}", x, nn),
            SkipIfNotEqualImm { x, nn } => write!(f, "SNE V{:X}, {:#04x}", x, nn),
            SkipIfEqualReg { x, y } => write!(f, "SE V{:X}, V{:X}", x, y),
            LoadImm { x, nn } => write!(f, "LD V{:X}, {:#04x}", x, nn),
            AddImm { x, nn } => write!(f, "ADD V{:X}, {:#04x}", x, nn),
            Move { x, y } => write!(f, "LD V{:X}, V{:X}", x, y),
            Or { x, y } => write!(f, "OR V{:X}, V{:X}", x, y),
            And { x, y } => write!(f, "AND V{:X}, V{:X}", x, y),
            Xor { x, y } => write!(f, "XOR V{:X}, V{:X}", x, y),
            AddReg { x, y } => write!(f, "ADD V{:X}, V{:X}", x, y),
            Sub { x, y } => write!(f, "SUB V{:X}, V{:X}", x, y),
            ShiftRight { x, .. } => write!(f, "SHR V{:X}", x),
            SubReverse { x, y } => write!(f, "SUBN V{:X}, V{:X}", x, y),
            ShiftLeft { x, .. } => write!(f, "SHL V{:X}", x),
            SkipIfNotEqualReg { x, y } => write!(f, "SNE V{:X}, V{:X}", x, y),
            SetAddress(nnn) => write!(f, "LD I, {:#05x}", nnn),
            JumpOffset(nnn) => write!(f, "JP V0, {:#05x}", nnn),
            Random { x, nn } => write!(f, "RND V{:X}, {:#04x}", x, nn),
            Draw { x, y, n } => write!(f, "DRW V{:X}, V{:X}, {}", x, y, n),
            SkipIfKey { x } => write!(f, "SKP V{:X}", x),
            SkipIfNotKey { x } => write!(f, "SKNP V{:X}", x),
            ReadDelay { x } => write!(f, "LD V{:X}, DT", x),
            WaitKey { x } => write!(f, "LD V{:X}, K", x),
            WriteDelay { x } => write!(f, "LD DT, V{:X}", x),
            WriteSound { x } => write!(f, "LD ST, V{:X}", x),
            AddAddress { x } => write!(f, "ADD I, V{:X}", x),
            GlyphAddress { x } => write!(f, "LD F, V{:X}", x),
            StoreBcd { x } => write!(f, "LD B, V{:X}", x),
            Dump { x } => write!(f, "LD [I], V{:X}", x),
            Restore { x } => write!(f, "LD V{:X}, [I]", x),
            Invalid(word) => write!(f, "??? {:#06x}", word),
        }
    }
}
