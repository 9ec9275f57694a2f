/// rate the host should call `tick` at
pub const CHIP8_TIMER_HZ: u32 = 60;

/// The delay and sound timers. Only `tick` counts them down; running
/// instructions never does
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Timers {
    pub delay: u8,
    pub sound: u8,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// count both timers down by one, stopping at zero. returns true when
    /// the sound timer runs out on this tick, i.e. the host should beep
    pub fn tick(&mut self) -> bool {
        self.delay = self.delay.saturating_sub(1);
        let tone = self.sound == 1;
        self.sound = self.sound.saturating_sub(1);
        tone
    }

    pub fn sound_active(&self) -> bool {
        self.sound > 0
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
