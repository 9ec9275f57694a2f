use std::io;
use thiserror::Error;

/// Everything that can go wrong loading or running a CHIP-8 program
#[derive(Debug, Error)]
pub enum Chip8Error {
    #[error("program image is empty")]
    EmptyProgram,

    #[error("program image is too large ({size} bytes), max size is {max} bytes")]
    ProgramTooLarge { size: usize, max: usize },

    #[error("failed to read program image: {0}")]
    Io(#[from] io::Error),

    #[error("invalid opcode {opcode:#06x} at {addr:#05x}")]
    InvalidOpcode { opcode: u16, addr: u16 },

    #[error("stack overflow: call at {addr:#05x} with a full return stack")]
    StackOverflow { addr: u16 },

    #[error("stack underflow: return at {addr:#05x} with an empty return stack")]
    StackUnderflow { addr: u16 },

    #[error("address {addr:#06x} is outside of memory")]
    AddressOutOfRange { addr: usize },

    #[error("address {addr:#05x} is reserved for the interpreter")]
    ProtectedAddress { addr: usize },

    #[error("no such key: {key:#04x}")]
    InvalidKey { key: usize },
}

impl Chip8Error {
    /// an invalid opcode is skipped over; everything else means the program
    /// (or the host) is broken and running on is pointless
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Chip8Error::InvalidOpcode { .. })
    }
}
