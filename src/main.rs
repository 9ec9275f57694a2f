use clap::Parser;
use log::info;
use std::error::Error;
use std::fs::File;

use chip8vm::config::Config;
use chip8vm::display::MonoTermDisplay;
use chip8vm::environment::Environment;
use chip8vm::input::StdinInput;
use chip8vm::interpreter::Chip8Interpreter;
use chip8vm::sound::{Mute, SimpleBeep, Sound};

fn main() -> Result<(), Box<dyn Error>> {
    // the terminal belongs to the display, so logs go to stderr
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let config = Config::parse();

    // load a program
    let mut interpreter = match config.seed {
        Some(seed) => Chip8Interpreter::with_seed(seed),
        None => Chip8Interpreter::new(),
    };
    let mut f = File::open(&config.rom)?;
    interpreter.load_program(&mut f)?;
    info!("running {}", config.rom.display());

    let exit = {
        let mut input = StdinInput::new()?;
        let mut display = MonoTermDisplay::new()?;
        let mut beeper = SimpleBeep::new();
        let mut mute = Mute::new();
        let sound: &mut dyn Sound = if config.mute { &mut mute } else { &mut beeper };

        let mut env =
            Environment::new(interpreter, &mut display, &mut input, sound).with_config(&config);
        env.run()
    };

    // shove some junk on stdout to stop the cli messing up the last frame
    for _ in 0..(chip8vm::display::CHIP8_DISPLAY_HEIGHT / 2) {
        println!();
    }
    info!("exit: {:?}", exit?);
    Ok(())
}
