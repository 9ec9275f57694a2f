use crate::error::Chip8Error;
use crossterm::event::{poll, read, Event, KeyCode, KeyModifiers};
use crossterm::terminal;
use log::debug;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::time::{Duration, Instant};

pub const CHIP8_KEY_COUNT: usize = 16;

/// left-hand side of a qwerty keyboard laid over the COSMAC hex keypad:
///   1 2 3 4      1 2 3 C
///   q w e r  =>  4 5 6 D
///   a s d f      7 8 9 E
///   z x c v      A 0 B F
const CHIP8_CONVENTIONAL_KEYMAP: [(char, u8); 16] = [
    ('x', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('q', 0x04),
    ('w', 0x05),
    ('e', 0x06),
    ('a', 0x07),
    ('s', 0x08),
    ('d', 0x09),
    ('z', 0x0a),
    ('c', 0x0b),
    ('4', 0x0c),
    ('r', 0x0d),
    ('f', 0x0e),
    ('v', 0x0f),
];

/// terminals only report presses (and autorepeat), so a key counts as held
/// for this long after the last press seen. has to outlast the usual
/// 250-500ms autorepeat delay or a held key flickers up and down once
const KEY_HOLD: Duration = Duration::from_millis(600);

/// State of the sixteen hex keys. The host writes it, the interpreter reads it
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Keypad {
    keys: [bool; CHIP8_KEY_COUNT],
}

impl Keypad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: usize, pressed: bool) -> Result<(), Chip8Error> {
        let slot = self.keys.get_mut(key).ok_or(Chip8Error::InvalidKey { key })?;
        *slot = pressed;
        Ok(())
    }

    pub fn is_pressed(&self, key: usize) -> Result<bool, Chip8Error> {
        self.keys
            .get(key)
            .copied()
            .ok_or(Chip8Error::InvalidKey { key })
    }

    /// lowest-numbered key that is down
    pub fn first_pressed(&self) -> Option<u8> {
        self.keys.iter().position(|&k| k).map(|k| k as u8)
    }

    pub fn release_all(&mut self) {
        self.keys = [false; CHIP8_KEY_COUNT];
    }
}

/// something the host keyboard did, already mapped onto the hex keypad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Down(u8),
    Up(u8),
    Quit,
}

/// reads keypresses
pub trait Input {
    /// everything that happened since the last poll; never blocks
    fn poll_events(&mut self) -> Result<Vec<KeyEvent>, io::Error>;
}

/// simple implementation of Input, using the terminal in raw mode
pub struct StdinInput {
    keymap: HashMap<char, u8>,
    held: [Option<Instant>; CHIP8_KEY_COUNT],
}

impl StdinInput {
    pub fn new() -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(StdinInput {
            keymap: HashMap::from(CHIP8_CONVENTIONAL_KEYMAP),
            held: [None; CHIP8_KEY_COUNT],
        })
    }

    fn press(&mut self, key: u8, now: Instant, events: &mut Vec<KeyEvent>) {
        if self.held[key as usize].replace(now).is_none() {
            events.push(KeyEvent::Down(key));
        }
    }

    fn expire(&mut self, now: Instant, events: &mut Vec<KeyEvent>) {
        for (key, held) in self.held.iter_mut().enumerate() {
            if matches!(held, Some(t) if now.duration_since(*t) >= KEY_HOLD) {
                *held = None;
                events.push(KeyEvent::Up(key as u8));
            }
        }
    }
}

impl Drop for StdinInput {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

impl Input for StdinInput {
    fn poll_events(&mut self) -> Result<Vec<KeyEvent>, io::Error> {
        let mut events = Vec::new();
        let now = Instant::now();
        while poll(Duration::from_millis(0))? {
            match read()? {
                Event::Key(evt) => match evt.code {
                    KeyCode::Esc => events.push(KeyEvent::Quit),
                    KeyCode::Char('c') if evt.modifiers.contains(KeyModifiers::CONTROL) => {
                        events.push(KeyEvent::Quit)
                    }
                    KeyCode::Char(c) => match self.keymap.get(&c.to_ascii_lowercase()) {
                        Some(&key) => self.press(key, now, &mut events),
                        None => debug!("can't map {:?} to a COSMAC key", c),
                    },
                    other => debug!("ignoring key {:?}", other),
                },
                other => debug!("ignoring event {:?}", other),
            }
        }
        self.expire(now, &mut events);
        Ok(events)
    }
}

/// dummy Input implementation for testing; hands out one batch per poll
pub struct DummyInput {
    batches: VecDeque<Vec<KeyEvent>>,
}

impl DummyInput {
    pub fn new(batches: Vec<Vec<KeyEvent>>) -> Self {
        DummyInput {
            batches: VecDeque::from(batches),
        }
    }
}

impl Input for DummyInput {
    fn poll_events(&mut self) -> Result<Vec<KeyEvent>, io::Error> {
        Ok(self.batches.pop_front().unwrap_or_default())
    }
}
