mod clock;
mod config;
mod error;
mod food;
mod food_system;
mod game;
mod grid;
mod movement;
mod port;
mod registry;
mod snake;
mod snake_system;
mod term;
mod vector;

use std::fs::File;
use std::thread;

use anyhow::{anyhow, Context};
use clap::Parser;
use log::{error, info};
use simplelog::{Config, WriteLogger};

use crate::clock::SystemClock;
use crate::config::Args;
use crate::game::{GameLoop, SessionEnd};
use crate::port::PortClient;
use crate::term::TerminalPresenter;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // The terminal is taken by the game, so logs go to a file
    let log_file = File::create(&args.log_file)
        .with_context(|| format!("cannot create log file {}", args.log_file.display()))?;
    WriteLogger::init(args.log_level, Config::default(), log_file).context("cannot initialize logger")?;

    let config = args.game_config();
    info!("Starting with {:?}", config);

    let (mut port, requests, quit) = PortClient::new();
    let presenter = TerminalPresenter::new(config.segment_size, quit).context("cannot start terminal")?;
    let presentation = thread::Builder::new()
        .name("presentation".into())
        .spawn(move || presenter.serve(requests))
        .context("cannot spawn presentation thread")?;

    let played = play(&mut port, &config);

    // Whatever happened, let the presenter restore the terminal
    let _ = port.shutdown();
    let served = presentation.join().map_err(|_| anyhow!("presentation thread panicked"))?;

    if let Err(e) = &served {
        error!("Presentation failed: {}", e);
    }
    served?;
    played
}

fn play(port: &mut PortClient, config: &config::GameConfig) -> anyhow::Result<()> {
    if !port.show_intro()? {
        return Ok(());
    }

    let clock = SystemClock::new();
    loop {
        // Nothing carries over between sessions
        let outcome = GameLoop::new(config.clone()).run(port, &clock)?;
        info!("Session ended: {:?}", outcome);

        if outcome.end == SessionEnd::Quit || !port.await_retry()? {
            break;
        }
    }

    info!("Bye");
    Ok(())
}
