use std::{path::PathBuf, time::Duration};

use clap::Parser;
use log::LevelFilter;

pub const DEFAULT_SEGMENT_SIZE: i32 = 20;
pub const DEFAULT_TICKS_PER_SECOND: u32 = 10;
pub const DEFAULT_FRAME_RATE: u32 = 100;
pub const DEFAULT_FOOD_SCORE: u32 = 5;

/// Engine settings for one session.
#[derive(Clone, Debug, PartialEq)]
pub struct GameConfig {
    /// Edge length of a grid cell, in position units.
    pub segment_size: i32,
    /// How often the snake actually steps.
    pub ticks_per_second: u32,
    /// Upper bound on frames per second.
    pub frame_rate: u32,
    pub food_score: u32,
    /// Seed for food placement. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl GameConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(1000 / self.ticks_per_second.max(1) as u64)
    }

    pub fn frame_budget(&self) -> Duration {
        Duration::from_millis(1000 / self.frame_rate.max(1) as u64)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            segment_size: DEFAULT_SEGMENT_SIZE,
            ticks_per_second: DEFAULT_TICKS_PER_SECOND,
            frame_rate: DEFAULT_FRAME_RATE,
            food_score: DEFAULT_FOOD_SCORE,
            seed: None,
        }
    }
}

/// Terminal snake.
#[derive(Parser, Debug)]
#[command(name = "snaek", version, about)]
pub struct Args {
    /// Edge length of one grid cell in position units.
    #[arg(
        long,
        value_name = "UNITS",
        default_value_t = DEFAULT_SEGMENT_SIZE,
        value_parser = clap::value_parser!(i32).range(1..=1000)
    )]
    pub segment_size: i32,
    /// Snake steps per second.
    #[arg(
        long,
        value_name = "N",
        default_value_t = DEFAULT_TICKS_PER_SECOND,
        value_parser = clap::value_parser!(u32).range(1..=1000)
    )]
    pub ticks_per_second: u32,
    /// Maximum frames per second. Frames that finish early sleep the remainder.
    #[arg(
        long,
        value_name = "N",
        default_value_t = DEFAULT_FRAME_RATE,
        value_parser = clap::value_parser!(u32).range(1..=1000)
    )]
    pub frame_rate: u32,
    /// Points multiplied by the number of food eaten.
    #[arg(
        long,
        value_name = "POINTS",
        default_value_t = DEFAULT_FOOD_SCORE,
        value_parser = clap::value_parser!(u32).range(1..=1_000_000)
    )]
    pub food_score: u32,
    /// Seed for food placement, for reproducible games.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,
    /// Where log output goes. The terminal itself is busy drawing the game.
    #[arg(long, value_name = "PATH", default_value = "snaek.log")]
    pub log_file: PathBuf,
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    pub log_level: LevelFilter,
}

impl Args {
    pub fn game_config(&self) -> GameConfig {
        GameConfig {
            segment_size: self.segment_size,
            ticks_per_second: self.ticks_per_second,
            frame_rate: self.frame_rate,
            food_score: self.food_score,
            seed: self.seed,
        }
    }
}
