use crate::timer::CHIP8_TIMER_HZ;
use clap::Parser;
use std::path::PathBuf;

/// Run a CHIP-8 program in the terminal
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "chip8vm", version, about)]
pub struct Config {
    /// program image, loaded at 0x200
    pub rom: PathBuf,

    /// instructions executed per second
    #[arg(long, default_value_t = 700)]
    pub ips: u32,

    /// don't make any noise
    #[arg(long)]
    pub mute: bool,

    /// stop after this many 60Hz frames
    #[arg(long)]
    pub frames: Option<u64>,

    /// how many frames a tone lasts once the sound timer runs out
    #[arg(long, default_value_t = 6)]
    pub tone_frames: u32,

    /// seed for CXNN, for repeatable runs
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Config {
    /// instructions to run between timer ticks, rounded to nearest; never 0
    pub fn instructions_per_frame(&self) -> u32 {
        (self.ips.saturating_add(CHIP8_TIMER_HZ / 2) / CHIP8_TIMER_HZ).max(1)
    }
}
