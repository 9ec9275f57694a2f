use crate::error::Chip8Error;
use std::io;

// NB. addresses are u16 as per the chip-8; lengths are usize to stop endless casting

/// how much RAM we have
pub const CHIP8_RAM_SIZE_BYTES: usize = 4096;

/// where the program is loaded; everything below belongs to the interpreter
pub const CHIP8_PROGRAM_ADDR: u16 = 0x0200;

/// biggest program image that fits above the interpreter area
pub const CHIP8_MAX_PROGRAM_BYTES: usize = CHIP8_RAM_SIZE_BYTES - CHIP8_PROGRAM_ADDR as usize;

/// where the hex digit glyphs live, and how tall each one is
pub const CHIP8_FONT_ADDR: u16 = 0x050;
pub const CHIP8_GLYPH_BYTES: u16 = 5;

/// Represents a memory map with bounds-checked access
pub trait MemoryMap {
    /// get a r/o slice of the underlying memory
    fn get_ro_slice(&self, addr: u16, len: usize) -> Result<&[u8], Chip8Error>;

    /// get a r/w slice of the underlying memory, for the running program
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> Result<&mut [u8], Chip8Error>;

    /// write a chunk of bytes into "RAM"
    fn write(&mut self, data: &[u8], addr: u16) -> Result<(), Chip8Error> {
        self.get_rw_slice(addr, data.len())?.copy_from_slice(data);
        Ok(())
    }

    /// get a single byte
    fn get_byte(&self, addr: u16) -> Result<u8, Chip8Error> {
        Ok(self.get_ro_slice(addr, 1)?[0])
    }

    /// get a big-endian two-byte word (instructions)
    fn get_word(&self, addr: u16) -> Result<u16, Chip8Error> {
        let word = self.get_ro_slice(addr, 2)?;
        Ok(u16::from_be_bytes([word[0], word[1]]))
    }
}

/// The CHIP-8 memory map, 4K configuration:
///   0x0000-0x004f  unused
///   0x0050-0x009f  font, 16 glyphs of 5 bytes
///   0x00a0-0x01ff  unused
///   0x0200-0x0fff  program
///
/// the interpreter area is read-only to the running program; the stack and
/// display buffer live outside of addressable memory
pub struct Chip8MemoryMap {
    bytes: Box<[u8]>,
}

impl MemoryMap for Chip8MemoryMap {
    fn get_ro_slice(&self, addr: u16, len: usize) -> Result<&[u8], Chip8Error> {
        let a = Self::checked_range(addr, len)?;
        Ok(&self.bytes[a..(a + len)])
    }

    fn get_rw_slice(&mut self, addr: u16, len: usize) -> Result<&mut [u8], Chip8Error> {
        let a = Self::checked_range(addr, len)?;
        if addr < CHIP8_PROGRAM_ADDR {
            return Err(Chip8Error::ProtectedAddress { addr: a });
        }
        Ok(&mut self.bytes[a..(a + len)])
    }
}

impl Chip8MemoryMap {
    /// initialises CHIP-8 with the font baked in and everything else zeroed
    pub fn new() -> Self {
        let mut mm = Chip8MemoryMap {
            bytes: vec![0u8; CHIP8_RAM_SIZE_BYTES].into_boxed_slice(),
        };
        mm.install_font();
        mm
    }

    /// back to power-on contents
    pub fn reset(&mut self) {
        self.bytes.fill(0);
        self.install_font();
    }

    /// load a CHIP-8 program at 0x200; nothing is written unless all of it fits
    pub fn load_program(&mut self, data: &[u8]) -> Result<(), Chip8Error> {
        if data.is_empty() {
            return Err(Chip8Error::EmptyProgram);
        }
        if data.len() > CHIP8_MAX_PROGRAM_BYTES {
            return Err(Chip8Error::ProgramTooLarge {
                size: data.len(),
                max: CHIP8_MAX_PROGRAM_BYTES,
            });
        }
        self.write(data, CHIP8_PROGRAM_ADDR)
    }

    /// load a program of unknown length from a reader
    pub fn load_program_from(&mut self, reader: &mut impl io::Read) -> Result<usize, Chip8Error> {
        let mut buf = Vec::new();
        let len = reader.read_to_end(&mut buf)?;
        self.load_program(&buf)?;
        Ok(len)
    }

    /// address of the glyph for `digit`. nothing stops a program asking for
    /// digit 0x10 and up; it just gets whatever follows the font
    pub fn glyph_addr(digit: u8) -> u16 {
        CHIP8_FONT_ADDR + digit as u16 * CHIP8_GLYPH_BYTES
    }

    fn install_font(&mut self) {
        let a = CHIP8_FONT_ADDR as usize;
        self.bytes[a..(a + CHIP8_CONTEMPORARY_FONT.len())].copy_from_slice(&CHIP8_CONTEMPORARY_FONT);
    }

    // first address past the end is reported, so a read straddling the top
    // of RAM names 0x1000 rather than where it started
    fn checked_range(addr: u16, len: usize) -> Result<usize, Chip8Error> {
        let a = addr as usize;
        if a + len > CHIP8_RAM_SIZE_BYTES {
            return Err(Chip8Error::AddressOutOfRange {
                addr: a.max(CHIP8_RAM_SIZE_BYTES),
            });
        }
        Ok(a)
    }
}

impl Default for Chip8MemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

const CHIP8_CONTEMPORARY_FONT: [u8; 80] = [
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
