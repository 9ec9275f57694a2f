//! A CHIP-8 interpreter.
//!
//! ## Design
//!
//! * the interpreter is a pure state machine: memory, V0-VF, I, PC, stack,
//!   timers, framebuffer and keypad. it never does any I/O itself
//! * two clocks, kept apart:
//!    - `step()` runs one instruction; the host picks the rate
//!    - `tick()` decays the timers and is called at 60Hz regardless
//! * instructions decode into a closed enum first, so every opcode family
//!   has exactly one arm and junk falls into `Instruction::Invalid`
//! * VF is both a general register and the flag; `Registers::flag()` is
//!   just another name for V[0xf]
//! * everything that can go wrong is a `Chip8Error`. only an invalid opcode
//!   is worth carrying on from, and that's the host's call
//! * address arithmetic never wraps: reads and writes past 0xfff, and
//!   `ADD I, Vx` leaving memory, are reported as errors. so are writes into
//!   the interpreter area below 0x200, which keeps the font intact
//! * display, input device and audio device sit behind traits so the host
//!   can plug alternatives; the terminal ones use TUI/crossterm and `beep`
//!
//! Model
//!
//! Environment
//!  |-- display, input, sound, config
//!  |-- interpreter
//!  |    |-- memory (font + program)
//!  |    |-- registers, stack, timers
//!  |    `-- framebuffer, keypad
//!  `-- main loop, one pass per 60Hz frame
pub mod config;
pub mod display;
pub mod environment;
pub mod error;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod memory;
pub mod registers;
pub mod sound;
pub mod timer;

pub use error::Chip8Error;
pub use instruction::Instruction;
pub use interpreter::{Chip8Interpreter, StepOutcome};
