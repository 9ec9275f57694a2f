/// # interpreter
///
/// The CHIP-8 execution engine. It owns all machine state: memory, V0-VF,
/// I, PC, the return stack, both timers and the framebuffer. The keypad
/// lives here too but only the host writes it, through `set_key`.
///
/// Two clocks drive it, kept apart:
///  * `step()` runs exactly one instruction, as often as the host likes
///  * `tick()` decays the timers and must be called at 60Hz
///
/// Nothing in here touches the outside world; drawing, beeping and reading
/// the keyboard are the host's job (see `environment`).
use crate::display::Framebuffer;
use crate::error::Chip8Error;
use crate::input::Keypad;
use crate::instruction::Instruction;
use crate::memory::{Chip8MemoryMap, MemoryMap, CHIP8_RAM_SIZE_BYTES};
use crate::registers::{Registers, Stack};
use crate::timer::Timers;
use log::{info, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io;

/// what a successful `step()` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Executed(Instruction),
    /// FX0A with no key down; PC still points at it
    WaitingForKey,
}

pub struct Chip8Interpreter {
    memory: Chip8MemoryMap,
    registers: Registers,
    stack: Stack,
    timers: Timers,
    framebuffer: Framebuffer,
    keypad: Keypad,
    rng: StdRng,
    redraw: bool,
}

impl Chip8Interpreter {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// same as `new`, but CXNN produces a repeatable sequence
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Chip8Interpreter {
            memory: Chip8MemoryMap::new(),
            registers: Registers::new(),
            stack: Stack::new(),
            timers: Timers::new(),
            framebuffer: Framebuffer::new(),
            keypad: Keypad::new(),
            rng,
            redraw: false,
        }
    }

    /// back to power-on state, program included. the keypad belongs to the
    /// host and is left alone
    pub fn reset(&mut self) {
        self.memory.reset();
        self.registers = Registers::new();
        self.stack.clear();
        self.timers.clear();
        self.framebuffer.clear();
        self.redraw = true;
    }

    /// load a chip8 program image at 0x200. execution state is untouched, so
    /// `reset()` first for a clean run
    pub fn load(&mut self, program: &[u8]) -> Result<(), Chip8Error> {
        self.memory.load_program(program)?;
        info!("loaded {} byte program", program.len());
        Ok(())
    }

    /// load a chip8 program from a file or whatever
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<(), Chip8Error> {
        let len = self.memory.load_program_from(reader)?;
        info!("loaded {} byte program", len);
        Ok(())
    }

    /// fetch, decode and execute one instruction. PC moves past the word
    /// before it runs, so a failed instruction is skipped if the host decides
    /// to carry on; nothing else changes when an instruction fails
    pub fn step(&mut self) -> Result<StepOutcome, Chip8Error> {
        let addr = self.registers.pc;
        let word = self.memory.get_word(addr)?;
        self.registers.pc = addr + 2;
        let instr = Instruction::from(word);
        trace!("{:#05x}: {:04x}  {}", addr, word, instr);
        self.execute(instr, addr)
    }

    /// one 60Hz timer tick. returns true when the host should sound a tone
    pub fn tick(&mut self) -> bool {
        self.timers.tick()
    }

    pub fn sound_active(&self) -> bool {
        self.timers.sound_active()
    }

    /// host side of the keypad
    pub fn set_key(&mut self, key: usize, pressed: bool) -> Result<(), Chip8Error> {
        self.keypad.set(key, pressed)
    }

    pub fn release_keys(&mut self) {
        self.keypad.release_all();
    }

    /// true if the screen changed since the last time anyone asked
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.redraw)
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }

    pub fn memory(&self) -> &impl MemoryMap {
        &self.memory
    }

    fn execute(&mut self, instr: Instruction, addr: u16) -> Result<StepOutcome, Chip8Error> {
        use Instruction::*;

        let r = &mut self.registers;
        match instr {
            ClearScreen => {
                self.framebuffer.clear();
                self.redraw = true;
            }
            Return => r.pc = self.stack.pop(addr)?,
            Jump(nnn) => r.pc = nnn,
            Call(nnn) => {
                self.stack.push(r.pc, addr)?;
                r.pc = nnn;
            }
            SkipIfEqualImm { x, nn } => r.skip_next_if(r.get(x) == nn),
            SkipIfNotEqualImm { x, nn } => r.skip_next_if(r.get(x) != nn),
            SkipIfEqualReg { x, y } => r.skip_next_if(r.get(x) == r.get(y)),
            SkipIfNotEqualReg { x, y } => r.skip_next_if(r.get(x) != r.get(y)),
            LoadImm { x, nn } => r.set(x, nn),
            AddImm { x, nn } => r.set(x, r.get(x).wrapping_add(nn)),
            Move { x, y } => r.set(x, r.get(y)),
            Or { x, y } => r.set(x, r.get(x) | r.get(y)),
            And { x, y } => r.set(x, r.get(x) & r.get(y)),
            Xor { x, y } => r.set(x, r.get(x) ^ r.get(y)),
            // VF goes last in all of these so it holds the flag even when X is F
            AddReg { x, y } => {
                let (sum, carry) = r.get(x).overflowing_add(r.get(y));
                r.set(x, sum);
                r.set_flag(carry);
            }
            Sub { x, y } => {
                let (diff, borrow) = r.get(x).overflowing_sub(r.get(y));
                r.set(x, diff);
                r.set_flag(!borrow);
            }
            SubReverse { x, y } => {
                let (diff, borrow) = r.get(y).overflowing_sub(r.get(x));
                r.set(x, diff);
                r.set_flag(!borrow);
            }
            ShiftRight { x, .. } => {
                let vx = r.get(x);
                r.set(x, vx >> 1);
                r.set_flag(vx & 0x01 != 0);
            }
            ShiftLeft { x, .. } => {
                let vx = r.get(x);
                r.set(x, vx << 1);
                r.set_flag(vx & 0x80 != 0);
            }
            SetAddress(nnn) => r.i = nnn,
            // may land past the end of memory; the next fetch reports it
            JumpOffset(nnn) => r.pc = nnn + r.get(0) as u16,
            Random { x, nn } => r.set(x, self.rng.gen::<u8>() & nn),
            Draw { x, y, n } => {
                let sprite = self.memory.get_ro_slice(r.i, n as usize)?;
                let collision =
                    self.framebuffer
                        .draw_sprite(r.get(x) as usize, r.get(y) as usize, sprite);
                r.set_flag(collision);
                self.redraw = true;
            }
            SkipIfKey { x } => {
                let down = self.keypad.is_pressed(r.get(x) as usize)?;
                r.skip_next_if(down);
            }
            SkipIfNotKey { x } => {
                let down = self.keypad.is_pressed(r.get(x) as usize)?;
                r.skip_next_if(!down);
            }
            ReadDelay { x } => r.set(x, self.timers.delay),
            WaitKey { x } => match self.keypad.first_pressed() {
                Some(key) => r.set(x, key),
                None => {
                    r.pc = addr;
                    return Ok(StepOutcome::WaitingForKey);
                }
            },
            WriteDelay { x } => self.timers.delay = r.get(x),
            WriteSound { x } => self.timers.sound = r.get(x),
            AddAddress { x } => {
                let i = r.i as usize + r.get(x) as usize;
                if i >= CHIP8_RAM_SIZE_BYTES {
                    return Err(Chip8Error::AddressOutOfRange { addr: i });
                }
                r.i = i as u16;
            }
            GlyphAddress { x } => r.i = Chip8MemoryMap::glyph_addr(r.get(x)),
            StoreBcd { x } => {
                let vx = r.get(x);
                self.memory.write(&[vx / 100, vx / 10 % 10, vx % 10], r.i)?;
            }
            Dump { x } => self.memory.write(r.range(x), r.i)?,
            Restore { x } => {
                let src = self.memory.get_ro_slice(r.i, x + 1)?;
                r.range_mut(x).copy_from_slice(src);
            }
            Invalid(opcode) => return Err(Chip8Error::InvalidOpcode { opcode, addr }),
        }
        Ok(StepOutcome::Executed(instr))
    }
}

impl Default for Chip8Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_program(prog: &[u8]) -> Chip8Interpreter {
        let mut c = Chip8Interpreter::with_seed(0x0c0ffee);
        c.load(prog).unwrap();
        c
    }

    fn run(c: &mut Chip8Interpreter, steps: usize) -> Result<(), Chip8Error> {
        for _ in 0..steps {
            c.step()?;
        }
        Ok(())
    }

    #[test]
    fn test_initial_state() {
        let c = Chip8Interpreter::new();
        assert_eq!(c.registers().pc, 0x200);
        assert_eq!(c.registers().i, 0);
        assert_eq!(c.stack().depth(), 0);
        assert_eq!(c.timers(), &Timers::new());
        assert_eq!(c.framebuffer().lit_count(), 0);
        assert_eq!(c.keypad().first_pressed(), None);
    }

    #[test]
    fn test_program_load_ok() -> Result<(), Chip8Error> {
        let mut c = Chip8Interpreter::new();
        let mut prog: &[u8] = &[0x00, 0xe0]; // clear screen
        c.load_program(&mut prog)?;
        assert_eq!(c.memory().get_word(0x200)?, 0x00e0);
        assert_eq!(c.registers().pc, 0x200);
        Ok(())
    }

    #[test]
    fn test_load_does_not_reset() -> Result<(), Chip8Error> {
        let mut c = with_program(&[0x60, 0x07, 0x12, 0x00]);
        c.step()?;
        c.load(&[0x00, 0xe0])?;
        assert_eq!(c.registers().pc, 0x202);
        assert_eq!(c.registers().get(0), 7);
        Ok(())
    }

    #[test]
    fn test_failed_load_leaves_state() -> Result<(), Chip8Error> {
        let mut c = with_program(&[0xa2, 0x22]);
        assert!(matches!(c.load(&[]), Err(Chip8Error::EmptyProgram)));
        assert!(matches!(
            c.load(&vec![0xff; 0xe01]),
            Err(Chip8Error::ProgramTooLarge { .. })
        ));
        assert_eq!(c.memory().get_word(0x200)?, 0xa222);
        assert_eq!(c.memory().get_byte(0x202)?, 0);
        Ok(())
    }

    #[test]
    fn test_reset() -> Result<(), Chip8Error> {
        let mut c = with_program(&[0x60, 0x05, 0xf0, 0x15, 0x22, 0x00]);
        run(&mut c, 3)?;
        c.set_key(4, true)?;
        c.reset();
        assert_eq!(c.registers(), &Registers::new());
        assert_eq!(c.stack().depth(), 0);
        assert_eq!(c.timers().delay, 0);
        assert_eq!(c.memory().get_word(0x200)?, 0);
        assert_eq!(c.memory().get_byte(0x050)?, 0xf0);
        // host owns the keypad
        assert!(c.keypad().is_pressed(4)?);
        Ok(())
    }

    #[test]
    fn test_clear_screen() -> Result<(), Chip8Error> {
        // draw glyph 0, then clear
        let mut c = with_program(&[0xf0, 0x29, 0xd0, 0x05, 0x00, 0xe0]);
        run(&mut c, 2)?;
        assert!(c.take_redraw());
        assert_eq!(c.framebuffer().lit_count(), 14);
        assert_eq!(c.step()?, StepOutcome::Executed(Instruction::ClearScreen));
        assert_eq!(c.framebuffer().lit_count(), 0);
        assert!(c.take_redraw());
        assert!(!c.take_redraw());
        Ok(())
    }

    #[test]
    fn test_jump() -> Result<(), Chip8Error> {
        let mut c = with_program(&[0x1a, 0xbc]);
        c.step()?;
        assert_eq!(c.registers().pc, 0xabc);
        Ok(())
    }

    #[test]
    fn test_call_and_return() -> Result<(), Chip8Error> {
        let mut prog = vec![0u8; 0x102];
        prog[..2].copy_from_slice(&[0x23, 0x00]); // 0x200: CALL 0x300
        prog[0x100..].copy_from_slice(&[0x00, 0xee]); // 0x300: RET
        let mut c = with_program(&prog);
        c.step()?;
        assert_eq!(c.registers().pc, 0x300);
        assert_eq!(c.stack().top(), Some(0x202));
        c.step()?;
        assert_eq!(c.registers().pc, 0x202);
        assert_eq!(c.stack().depth(), 0);
        Ok(())
    }

    #[test]
    fn test_return_on_empty_stack() {
        let mut c = with_program(&[0x00, 0xee]);
        assert!(matches!(
            c.step(),
            Err(Chip8Error::StackUnderflow { addr: 0x200 })
        ));
    }

    #[test]
    fn test_runaway_recursion_overflows() -> Result<(), Chip8Error> {
        let mut c = with_program(&[0x22, 0x00]); // CALL 0x200, forever
        run(&mut c, 16)?;
        assert!(matches!(
            c.step(),
            Err(Chip8Error::StackOverflow { addr: 0x200 })
        ));
        assert_eq!(c.stack().depth(), 16);
        Ok(())
    }

    #[test]
    fn test_skip_immediate() -> Result<(), Chip8Error> {
        let mut c = with_program(&[
            0x60, 0x42, // LD V0, 0x42
            0x30, 0x42, // SE V0, 0x42
            0x00, 0x00,
            0x30, 0x41, // SE V0, 0x41
            0x40, 0x41, // SNE V0, 0x41
            0x00, 0x00,
            0x40, 0x42, // SNE V0, 0x42
        ]);
        c.step()?;
        c.step()?;
        assert_eq!(c.registers().pc, 0x206);
        c.step()?;
        assert_eq!(c.registers().pc, 0x208);
        c.step()?;
        assert_eq!(c.registers().pc, 0x20c);
        c.step()?;
        assert_eq!(c.registers().pc, 0x20e);
        Ok(())
    }

    #[test]
    fn test_skip_registers() -> Result<(), Chip8Error> {
        let mut c = with_program(&[
            0x60, 0x09, // LD V0, 0x09
            0x61, 0x09, // LD V1, 0x09
            0x62, 0x07, // LD V2, 0x07
            0x50, 0x10, // SE V0, V1
            0x00, 0x00,
            0x50, 0x20, // SE V0, V2
            0x90, 0x20, // SNE V0, V2
            0x00, 0x00,
            0x90, 0x10, // SNE V0, V1
        ]);
        run(&mut c, 4)?;
        assert_eq!(c.registers().pc, 0x20a);
        c.step()?;
        assert_eq!(c.registers().pc, 0x20c);
        c.step()?;
        assert_eq!(c.registers().pc, 0x210);
        c.step()?;
        assert_eq!(c.registers().pc, 0x212);
        Ok(())
    }

    #[test]
    fn test_add_immediate_wraps_without_flag() -> Result<(), Chip8Error> {
        let mut c = with_program(&[0x6f, 0x00, 0x63, 0xff, 0x73, 0x02]);
        run(&mut c, 3)?;
        assert_eq!(c.registers().get(3), 0x01);
        assert_eq!(c.registers().flag(), 0);
        Ok(())
    }

    #[test]
    fn test_logic_ops_leave_flag() -> Result<(), Chip8Error> {
        // V0 = 0b1100, V1 = 0b1010, VF = 7
        let base = [0x60, 0x0c, 0x61, 0x0a, 0x6f, 0x07];
        for (op, expect) in [(0x80, 0x0a), (0x81, 0x0e), (0x82, 0x08), (0x83, 0x06)] {
            let mut prog = base.to_vec();
            prog.extend_from_slice(&[0x80, op & 0x0f | 0x10]);
            let mut c = with_program(&prog);
            run(&mut c, 4)?;
            assert_eq!(c.registers().get(0), expect, "op 8XY{:X}", op & 0x0f);
            assert_eq!(c.registers().flag(), 7);
        }
        Ok(())
    }

    #[test]
    fn test_add_registers_carry() -> Result<(), Chip8Error> {
        let mut c = with_program(&[0x60, 0xff, 0x61, 0x01, 0x80, 0x14]);
        run(&mut c, 3)?;
        assert_eq!(c.registers().get(0), 0x00);
        assert_eq!(c.registers().flag(), 1);

        let mut c = with_program(&[0x60, 0x01, 0x61, 0x01, 0x6f, 0x01, 0x80, 0x14]);
        run(&mut c, 4)?;
        assert_eq!(c.registers().get(0), 0x02);
        assert_eq!(c.registers().flag(), 0);
        Ok(())
    }

    #[test]
    fn test_subtract() -> Result<(), Chip8Error> {
        let mut c = with_program(&[0x60, 0x05, 0x61, 0x03, 0x80, 0x15]);
        run(&mut c, 3)?;
        assert_eq!(c.registers().get(0), 2);
        assert_eq!(c.registers().flag(), 1);

        let mut c = with_program(&[0x60, 0x03, 0x61, 0x05, 0x80, 0x15]);
        run(&mut c, 3)?;
        assert_eq!(c.registers().get(0), 254);
        assert_eq!(c.registers().flag(), 0);

        // equal operands don't borrow
        let mut c = with_program(&[0x60, 0x05, 0x61, 0x05, 0x80, 0x15]);
        run(&mut c, 3)?;
        assert_eq!(c.registers().get(0), 0);
        assert_eq!(c.registers().flag(), 1);
        Ok(())
    }

    #[test]
    fn test_subtract_reverse() -> Result<(), Chip8Error> {
        let mut c = with_program(&[0x60, 0x03, 0x61, 0x05, 0x80, 0x17]);
        run(&mut c, 3)?;
        assert_eq!(c.registers().get(0), 2);
        assert_eq!(c.registers().flag(), 1);

        let mut c = with_program(&[0x60, 0x05, 0x61, 0x03, 0x80, 0x17]);
        run(&mut c, 3)?;
        assert_eq!(c.registers().get(0), 254);
        assert_eq!(c.registers().flag(), 0);
        Ok(())
    }

    #[test]
    fn test_flag_wins_when_x_is_vf() -> Result<(), Chip8Error> {
        // VF = 0xff; VF += 1 -> result 0, but VF ends up holding the carry
        let mut c = with_program(&[0x6f, 0xff, 0x61, 0x01, 0x8f, 0x14]);
        run(&mut c, 3)?;
        assert_eq!(c.registers().flag(), 1);
        Ok(())
    }

    #[test]
    fn test_shift_right() -> Result<(), Chip8Error> {
        let mut c = with_program(&[0x62, 0b0000_0011, 0x82, 0x06, 0x82, 0x06, 0x82, 0x06]);
        run(&mut c, 2)?;
        assert_eq!(c.registers().get(2), 0b0000_0001);
        assert_eq!(c.registers().flag(), 1);
        run(&mut c, 2)?;
        assert_eq!(c.registers().get(2), 0);
        assert_eq!(c.registers().flag(), 0);
        Ok(())
    }

    #[test]
    fn test_shift_left() -> Result<(), Chip8Error> {
        let mut c = with_program(&[0x62, 0b1100_0001, 0x82, 0x0e, 0x82, 0x0e, 0x82, 0x0e]);
        run(&mut c, 2)?;
        assert_eq!(c.registers().get(2), 0b1000_0010);
        assert_eq!(c.registers().flag(), 1);
        run(&mut c, 2)?;
        assert_eq!(c.registers().get(2), 0b0000_1000);
        assert_eq!(c.registers().flag(), 0);
        Ok(())
    }

    #[test]
    fn test_set_address_and_jump_offset() -> Result<(), Chip8Error> {
        let mut c = with_program(&[0xa1, 0x23, 0x60, 0x10, 0xb3, 0x00]);
        run(&mut c, 3)?;
        assert_eq!(c.registers().i, 0x123);
        assert_eq!(c.registers().pc, 0x310);
        Ok(())
    }

    #[test]
    fn test_jump_offset_past_memory_fails_on_fetch() -> Result<(), Chip8Error> {
        let mut c = with_program(&[0x60, 0xff, 0xbf, 0xff]);
        run(&mut c, 2)?;
        assert_eq!(c.registers().pc, 0x10fe);
        assert!(matches!(
            c.step(),
            Err(Chip8Error::AddressOutOfRange { addr: 0x10fe })
        ));
        Ok(())
    }

    #[test]
    fn test_fetch_straddling_end_fails() {
        let mut c = with_program(&[0x1f, 0xff]);
        c.step().unwrap();
        assert!(matches!(
            c.step(),
            Err(Chip8Error::AddressOutOfRange { addr: 0x1000 })
        ));
        assert_eq!(c.registers().pc, 0xfff);
    }

    #[test]
    fn test_random_masked_and_seeded() -> Result<(), Chip8Error> {
        let prog = [0xc0, 0x0f, 0xc1, 0xff, 0xc2, 0x00];
        let mut a = with_program(&prog);
        let mut b = with_program(&prog);
        run(&mut a, 3)?;
        run(&mut b, 3)?;
        assert_eq!(a.registers().get(0) & 0xf0, 0);
        assert_eq!(a.registers().get(2), 0);
        assert_eq!(a.registers(), b.registers());
        Ok(())
    }

    #[test]
    fn test_draw_twice_restores_and_collides() -> Result<(), Chip8Error> {
        // V0 = 0xa, I = glyph(V0), V1 = 60, V2 = 30 then draw twice; wraps
        let mut c = with_program(&[
            0x60, 0x0a, 0xf0, 0x29, 0x61, 0x3c, 0x62, 0x1e, 0xd1, 0x25, 0xd1, 0x25,
        ]);
        run(&mut c, 5)?;
        let drawn = c.framebuffer().clone();
        assert_eq!(drawn.lit_count(), 14);
        assert!(drawn.get(60, 30));
        assert!(drawn.get(60, 2));
        assert_eq!(c.registers().flag(), 0);
        c.step()?;
        assert_eq!(c.framebuffer(), &Framebuffer::new());
        assert_eq!(c.registers().flag(), 1);
        Ok(())
    }

    #[test]
    fn test_draw_origin_wraps() -> Result<(), Chip8Error> {
        // 0x48 % 64 = 8, 0x25 % 32 = 5
        let mut c = with_program(&[0x60, 0x48, 0x61, 0x25, 0xa0, 0x50, 0xd0, 0x11]);
        run(&mut c, 4)?;
        assert!(c.framebuffer().get(8, 5));
        assert_eq!(c.framebuffer().lit_count(), 4);
        Ok(())
    }

    #[test]
    fn test_draw_past_memory_fails_cleanly() -> Result<(), Chip8Error> {
        let mut c = with_program(&[0x6f, 0x05, 0xaf, 0xff, 0xd0, 0x02]);
        run(&mut c, 2)?;
        assert!(matches!(
            c.step(),
            Err(Chip8Error::AddressOutOfRange { addr: 0x1000 })
        ));
        assert_eq!(c.framebuffer().lit_count(), 0);
        assert_eq!(c.registers().flag(), 5);
        assert_eq!(c.registers().pc, 0x206);
        Ok(())
    }

    #[test]
    fn test_skip_on_keys() -> Result<(), Chip8Error> {
        // LD V5, 0xe; SKP V5; LD V0, 0; SKNP V5
        let prog = [0x65, 0x0e, 0xe5, 0x9e, 0x60, 0x00, 0xe5, 0xa1];
        let mut c = with_program(&prog);
        run(&mut c, 2)?;
        assert_eq!(c.registers().pc, 0x204);
        run(&mut c, 2)?;
        assert_eq!(c.registers().pc, 0x20a);

        let mut c = with_program(&prog);
        c.set_key(0xe, true)?;
        run(&mut c, 2)?;
        assert_eq!(c.registers().pc, 0x206);
        c.step()?;
        assert_eq!(c.registers().pc, 0x208);
        Ok(())
    }

    #[test]
    fn test_skip_on_bad_key() {
        let mut c = with_program(&[0x65, 0x10, 0xe5, 0x9e]);
        c.step().unwrap();
        assert!(matches!(c.step(), Err(Chip8Error::InvalidKey { key: 0x10 })));
    }

    #[test]
    fn test_timer_registers() -> Result<(), Chip8Error> {
        let mut c = with_program(&[0x60, 0x03, 0xf0, 0x15, 0xf0, 0x18, 0xf1, 0x07]);
        run(&mut c, 3)?;
        assert_eq!(c.timers(), &Timers { delay: 3, sound: 3 });
        assert!(!c.tick());
        assert!(!c.tick());
        c.step()?;
        assert_eq!(c.registers().get(1), 1);
        assert!(c.tick());
        assert!(!c.sound_active());
        assert_eq!(c.timers().delay, 0);
        Ok(())
    }

    #[test]
    fn test_steps_never_touch_timers() -> Result<(), Chip8Error> {
        let mut c = with_program(&[0x60, 0x09, 0xf0, 0x15, 0x12, 0x04]);
        run(&mut c, 100)?;
        assert_eq!(c.timers().delay, 9);
        Ok(())
    }

    #[test]
    fn test_add_to_address() -> Result<(), Chip8Error> {
        let mut c = with_program(&[0xaf, 0x00, 0x60, 0xff, 0xf0, 0x1e, 0xf0, 0x1e]);
        run(&mut c, 3)?;
        assert_eq!(c.registers().i, 0xfff);
        assert!(matches!(
            c.step(),
            Err(Chip8Error::AddressOutOfRange { addr: 0x10fe })
        ));
        assert_eq!(c.registers().i, 0xfff);
        Ok(())
    }

    #[test]
    fn test_glyph_address() -> Result<(), Chip8Error> {
        let mut c = with_program(&[0x6e, 0x07, 0xfe, 0x29]);
        run(&mut c, 2)?;
        assert_eq!(c.registers().i, 0x050 + 7 * 5);
        assert_eq!(
            c.memory().get_ro_slice(c.registers().i, 5)?,
            &[0xF0, 0x10, 0x20, 0x40, 0x40]
        );
        Ok(())
    }

    #[test]
    fn test_store_bcd() -> Result<(), Chip8Error> {
        let mut c = with_program(&[0x63, 0xea, 0xa3, 0x00, 0xf3, 0x33]);
        run(&mut c, 3)?;
        assert_eq!(c.memory().get_ro_slice(0x300, 3)?, &[2, 3, 4]);
        assert_eq!(c.registers().i, 0x300);
        Ok(())
    }

    #[test]
    fn test_store_bcd_into_font_refused() -> Result<(), Chip8Error> {
        let mut c = with_program(&[0x63, 0xea, 0xa0, 0x50, 0xf3, 0x33]);
        run(&mut c, 2)?;
        assert!(matches!(
            c.step(),
            Err(Chip8Error::ProtectedAddress { addr: 0x050 })
        ));
        assert_eq!(c.memory().get_byte(0x050)?, 0xF0);
        Ok(())
    }

    #[test]
    fn test_dump_and_restore() -> Result<(), Chip8Error> {
        let mut c = with_program(&[
            0x60, 0x11, 0x61, 0x22, 0x62, 0x33, 0xa4, 0x00, 0xf2, 0x55, // dump V0-V2
            0x60, 0x00, 0x61, 0x00, 0x62, 0x00, 0x63, 0x44, 0xf3, 0x65, // restore V0-V3
        ]);
        run(&mut c, 5)?;
        assert_eq!(c.memory().get_ro_slice(0x400, 4)?, &[0x11, 0x22, 0x33, 0x00]);
        assert_eq!(c.registers().i, 0x400);
        run(&mut c, 5)?;
        assert_eq!(c.registers().range(3), &[0x11, 0x22, 0x33, 0x00]);
        assert_eq!(c.registers().i, 0x400);
        Ok(())
    }

    #[test]
    fn test_dump_past_memory_refused() -> Result<(), Chip8Error> {
        let mut c = with_program(&[0xaf, 0xfe, 0xf2, 0x55]);
        c.step()?;
        assert!(matches!(
            c.step(),
            Err(Chip8Error::AddressOutOfRange { addr: 0x1000 })
        ));
        assert_eq!(c.memory().get_ro_slice(0xffe, 2)?, &[0, 0]);
        Ok(())
    }

    #[test]
    fn test_wait_for_key() -> Result<(), Chip8Error> {
        let mut c = with_program(&[0xf4, 0x0a, 0x00, 0xe0]);
        for _ in 0..5 {
            assert_eq!(c.step()?, StepOutcome::WaitingForKey);
            assert_eq!(c.registers().pc, 0x200);
        }
        c.set_key(0xc, true)?;
        c.set_key(0x9, true)?;
        assert_eq!(
            c.step()?,
            StepOutcome::Executed(Instruction::WaitKey { x: 4 })
        );
        assert_eq!(c.registers().get(4), 0x9);
        assert_eq!(c.registers().pc, 0x202);
        Ok(())
    }

    #[test]
    fn test_invalid_opcode_skipped() -> Result<(), Chip8Error> {
        let mut c = with_program(&[0x51, 0x21, 0x60, 0x2a]);
        assert!(matches!(
            c.step(),
            Err(Chip8Error::InvalidOpcode { opcode: 0x5121, addr: 0x200 })
        ));
        assert_eq!(c.registers().pc, 0x202);
        c.step()?;
        assert_eq!(c.registers().get(0), 0x2a);
        Ok(())
    }
}
