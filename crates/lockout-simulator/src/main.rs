//! Desktop simulator for the lockout demonstrator.
//!
//! Runs the lockout core against virtual peripherals in real time. The
//! device's serial output is printed to stdout; the EEPROM image is kept in
//! a file so the timeout count survives between runs, just as it survives a
//! reset on the board.
//!
//! # Commands (type and press Enter)
//!
//! | Input   | Action                            |
//! |---------|-----------------------------------|
//! | (empty) | Press and release the button      |
//! | r       | Processor reset                   |
//! | e       | Erase EEPROM and reset            |
//! | s       | Print status                      |
//! | q       | Quit                              |
//!
//! The image path comes from `LOCKOUT_SIM_IMAGE` (default `lockout-nv.bin`).

mod board;
mod nv_image;
mod simulation;

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use log::{error, info};

use lockout_core::storage::MemoryStorage;
use lockout_core::LockoutError;

use crate::simulation::Simulation;

/// Wall-clock interval between simulation steps.
const TICK: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Click,
    Reset,
    Erase,
    Status,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    match line.trim() {
        "" => Some(Command::Click),
        "r" | "R" => Some(Command::Reset),
        "e" | "E" => Some(Command::Erase),
        "s" | "S" => Some(Command::Status),
        "q" | "Q" => Some(Command::Quit),
        _ => None,
    }
}

/// Read commands from stdin on a background thread
fn spawn_input() -> Receiver<Command> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line) {
                Some(command) => {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
                None => println!("Unknown command {:?}", line.trim()),
            }
        }
        // Closed stdin ends the run
        let _ = tx.send(Command::Quit);
    });
    rx
}

fn print_serial(sim: &mut Simulation) {
    let output = sim.take_serial();
    for line in output.lines() {
        println!("[serial] {}", line);
    }
}

fn print_status(sim: &Simulation) {
    let lockout = sim.lockout();
    println!(
        "t={}ms mode={} timeouts={}/{} suppressed={} dropped={} led={}",
        sim.now_ms(),
        lockout.mode().label(),
        lockout.timeout_count(),
        lockout.config().max_timeouts,
        lockout.is_button_suppressed(),
        sim.dropped_edges(),
        if sim.led_is_on() { "on" } else { "off" },
    );
}

fn run(image_path: PathBuf) -> Result<(), LockoutError> {
    let commands = spawn_input();
    let mut sim = Simulation::power_on(nv_image::load(&image_path))?;
    print_serial(&mut sim);

    let mut last_step = Instant::now();

    loop {
        let command = match commands.try_recv() {
            Ok(command) => Some(command),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Command::Quit),
        };

        match command {
            Some(Command::Click) => {
                if sim.press().is_none() {
                    println!("(button interrupt is off, press dropped)");
                }
                sim.release();
            }
            Some(Command::Reset) => sim = sim.reset()?,
            Some(Command::Erase) => {
                let mut storage: MemoryStorage = sim.into_storage();
                storage.erase();
                info!("EEPROM erased");
                sim = Simulation::power_on(storage)?;
            }
            Some(Command::Status) => print_status(&sim),
            Some(Command::Quit) => break,
            None => {}
        }

        let elapsed = last_step.elapsed();
        last_step = Instant::now();
        sim.advance(elapsed.as_millis() as u64);
        print_serial(&mut sim);

        thread::sleep(TICK);
    }

    if let Err(e) = nv_image::save(&image_path, &sim.into_storage()) {
        error!("Failed to save NV image {}: {}", image_path.display(), e);
    }
    Ok(())
}

fn main() {
    env_logger::init();

    let image_path = std::env::var_os(nv_image::IMAGE_PATH_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(nv_image::DEFAULT_IMAGE_PATH));

    info!("Starting lockout simulator");
    info!("NV image: {}", image_path.display());
    info!("Commands: Enter=press  r=reset  e=erase  s=status  q=quit");

    if let Err(e) = run(image_path) {
        error!("Simulator stopped: {}", e);
        std::process::exit(1);
    }

    info!("Simulator exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command(""), Some(Command::Click));
        assert_eq!(parse_command("  r "), Some(Command::Reset));
        assert_eq!(parse_command("E"), Some(Command::Erase));
        assert_eq!(parse_command("q"), Some(Command::Quit));
        assert_eq!(parse_command("x"), None);
    }
}
