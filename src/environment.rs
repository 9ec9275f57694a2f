/// # environment
///
/// The host side: owns the interpreter and runs the main loop against a
/// display, an input device and a sound device.
///
/// One pass of the loop is one 60Hz frame:
///  |-- apply whatever the keyboard did to the keypad
///  |-- step() up to instructions_per_frame times (less if waiting on a key)
///  |-- tick() the timers, starting/stopping the tone
///  |-- redraw if the framebuffer changed
///  `-- sleep off the rest of the frame
use crate::config::Config;
use crate::display::Display;
use crate::error::Chip8Error;
use crate::input::{Input, KeyEvent};
use crate::interpreter::{Chip8Interpreter, StepOutcome};
use crate::sound::Sound;
use crate::timer::CHIP8_TIMER_HZ;
use log::{debug, error, info, warn};
use std::error::Error;
use std::time::{Duration, Instant};

/// why `run` came back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Quit,
    FrameLimit,
}

pub struct Environment<'a> {
    interpreter: Chip8Interpreter,
    display: &'a mut dyn Display,
    input: &'a mut dyn Input,
    sound: &'a mut dyn Sound,
    instructions_per_frame: u32,
    tone_frames: u32,
    frame_limit: Option<u64>,
    frame_time: Option<Duration>,
    tone_left: u32,
}

impl<'a> Environment<'a> {
    pub fn new(
        interpreter: Chip8Interpreter,
        display: &'a mut dyn Display,
        input: &'a mut dyn Input,
        sound: &'a mut dyn Sound,
    ) -> Self {
        Environment {
            interpreter,
            display,
            input,
            sound,
            instructions_per_frame: 12,
            tone_frames: 6,
            frame_limit: None,
            frame_time: Some(Duration::from_secs(1) / CHIP8_TIMER_HZ),
            tone_left: 0,
        }
    }

    pub fn with_config(self, config: &Config) -> Self {
        self.instructions_per_frame(config.instructions_per_frame())
            .tone_frames(config.tone_frames)
            .frame_limit(config.frames)
    }

    pub fn instructions_per_frame(mut self, n: u32) -> Self {
        self.instructions_per_frame = n;
        self
    }

    pub fn tone_frames(mut self, n: u32) -> Self {
        self.tone_frames = n;
        self
    }

    pub fn frame_limit(mut self, frames: Option<u64>) -> Self {
        self.frame_limit = frames;
        self
    }

    /// run frames back to back instead of at 60Hz
    pub fn unpaced(mut self) -> Self {
        self.frame_time = None;
        self
    }

    pub fn interpreter(&self) -> &Chip8Interpreter {
        &self.interpreter
    }

    /// main loop; comes back on quit, frame limit or a fatal error
    pub fn run(&mut self) -> Result<Exit, Box<dyn Error>> {
        info!(
            "running at {} instructions per frame",
            self.instructions_per_frame
        );
        self.display.draw(self.interpreter.framebuffer())?;

        let mut frames = 0u64;
        let exit = loop {
            if self.frame_limit.map_or(false, |limit| frames >= limit) {
                break Exit::FrameLimit;
            }
            let started = Instant::now();
            if self.handle_input()? {
                break Exit::Quit;
            }
            self.run_frame()?;
            self.tick_timers()?;
            if self.interpreter.take_redraw() {
                self.display.draw(self.interpreter.framebuffer())?;
            }
            frames += 1;

            if let Some(rest) = self
                .frame_time
                .and_then(|frame| frame.checked_sub(started.elapsed()))
            {
                spin_sleep::sleep(rest);
            }
        };

        if self.sound.is_beeping() {
            self.sound.stop()?;
        }
        // nothing will release them now
        self.interpreter.release_keys();
        info!("stopped after {} frames: {:?}", frames, exit);
        Ok(exit)
    }

    /// true if the user asked to quit
    fn handle_input(&mut self) -> Result<bool, Box<dyn Error>> {
        for event in self.input.poll_events()? {
            debug!("{:?}", event);
            match event {
                KeyEvent::Down(key) => self.interpreter.set_key(key as usize, true)?,
                KeyEvent::Up(key) => self.interpreter.set_key(key as usize, false)?,
                KeyEvent::Quit => return Ok(true),
            }
        }
        Ok(false)
    }

    fn run_frame(&mut self) -> Result<(), Chip8Error> {
        for _ in 0..self.instructions_per_frame {
            match self.interpreter.step() {
                Ok(StepOutcome::Executed(_)) => {}
                // nothing changes until the keypad does
                Ok(StepOutcome::WaitingForKey) => break,
                Err(e) if !e.is_fatal() => warn!("{}", e),
                Err(e) => {
                    error!("{}", e);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn tick_timers(&mut self) -> Result<(), Box<dyn Error>> {
        if self.interpreter.tick() {
            self.sound.beep()?;
            self.tone_left = self.tone_frames;
        } else if self.sound.is_beeping() {
            self.tone_left = self.tone_left.saturating_sub(1);
            if self.tone_left == 0 {
                self.sound.stop()?;
            }
        }
        Ok(())
    }
}
