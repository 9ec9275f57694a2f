use beep::beep;
use log::debug;
use std::error::Error;

/// Where the interpreter's tone goes. The interpreter only says when; the
/// sink decides what it sounds like
pub trait Sound {
    fn beep(&mut self) -> Result<(), Box<dyn Error>>;
    fn stop(&mut self) -> Result<(), Box<dyn Error>>;
    fn is_beeping(&self) -> bool;
}

const SIMPLEBEEP_PITCH: u16 = 2093; // C

/// PC speaker tone via the `beep` crate
pub struct SimpleBeep {
    is_beeping: bool,
}

impl SimpleBeep {
    pub fn new() -> Self {
        SimpleBeep { is_beeping: false }
    }
}

impl Default for SimpleBeep {
    fn default() -> Self {
        Self::new()
    }
}

impl Sound for SimpleBeep {
    fn beep(&mut self) -> Result<(), Box<dyn Error>> {
        debug!("tone on at {}Hz", SIMPLEBEEP_PITCH);
        beep(SIMPLEBEEP_PITCH)?;
        self.is_beeping = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        debug!("tone off");
        beep(0)?;
        self.is_beeping = false;
        Ok(())
    }

    fn is_beeping(&self) -> bool {
        self.is_beeping
    }
}

/// silent sink; counts the beeps it swallowed
#[derive(Default)]
pub struct Mute {
    pub beeps: usize,
    is_beeping: bool,
}

impl Mute {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sound for Mute {
    fn beep(&mut self) -> Result<(), Box<dyn Error>> {
        self.beeps += 1;
        self.is_beeping = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        self.is_beeping = false;
        Ok(())
    }

    fn is_beeping(&self) -> bool {
        self.is_beeping
    }
}
