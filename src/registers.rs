use crate::error::Chip8Error;
use crate::memory::CHIP8_PROGRAM_ADDR;

/// how many return addresses the stack holds
pub const CHIP8_STACK_DEPTH: usize = 16;

/// index of the register doubling as carry/borrow/collision flag
pub const FLAG_REGISTER: usize = 0xf;

/// V0-VF, the address register I and the program counter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registers {
    v: [u8; 16],
    pub i: u16,
    pub pc: u16,
}

impl Registers {
    pub fn new() -> Self {
        Registers {
            v: [0; 16],
            i: 0,
            pc: CHIP8_PROGRAM_ADDR,
        }
    }

    /// value of Vx; callers only ever pass a nibble
    pub fn get(&self, x: usize) -> u8 {
        self.v[x]
    }

    pub fn set(&mut self, x: usize, value: u8) {
        self.v[x] = value;
    }

    /// VF. This is the same storage as `get(0xf)`; a program is free to use
    /// it as a general register, but arithmetic, shifts and draws clobber it
    pub fn flag(&self) -> u8 {
        self.v[FLAG_REGISTER]
    }

    pub fn set_flag(&mut self, set: bool) {
        self.v[FLAG_REGISTER] = set as u8;
    }

    /// hop over the next instruction
    pub fn skip_next_if(&mut self, cond: bool) {
        if cond {
            self.pc += 2;
        }
    }

    /// V0..=Vx, for dumping to memory
    pub fn range(&self, x: usize) -> &[u8] {
        &self.v[..=x]
    }

    /// V0..=Vx, for loading from memory
    pub fn range_mut(&mut self, x: usize) -> &mut [u8] {
        &mut self.v[..=x]
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-size stack of return addresses. `depth == 0` is the empty stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack {
    slots: [u16; CHIP8_STACK_DEPTH],
    depth: usize,
}

impl Stack {
    pub fn new() -> Self {
        Stack {
            slots: [0; CHIP8_STACK_DEPTH],
            depth: 0,
        }
    }

    /// `addr` is where the offending call lives, for reporting
    pub fn push(&mut self, ret: u16, addr: u16) -> Result<(), Chip8Error> {
        if self.depth == CHIP8_STACK_DEPTH {
            return Err(Chip8Error::StackOverflow { addr });
        }
        self.slots[self.depth] = ret;
        self.depth += 1;
        Ok(())
    }

    pub fn pop(&mut self, addr: u16) -> Result<u16, Chip8Error> {
        if self.depth == 0 {
            return Err(Chip8Error::StackUnderflow { addr });
        }
        self.depth -= 1;
        Ok(self.slots[self.depth])
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// most recent return address, if any
    pub fn top(&self) -> Option<u16> {
        self.depth.checked_sub(1).map(|d| self.slots[d])
    }

    pub fn clear(&mut self) {
        self.slots = [0; CHIP8_STACK_DEPTH];
        self.depth = 0;
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}
