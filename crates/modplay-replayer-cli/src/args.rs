//! Command-line argument parsing for the MOD replayer CLI.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use modplay::{Mode, PlayerConfig};

/// Playback mode selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Play the song once and stop.
    Once,
    /// Honor one backward jump, then stop.
    LoopOnce,
}

impl From<ModeArg> for Mode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Once => Mode::PlayOnce,
            ModeArg::LoopOnce => Mode::LoopOnce,
        }
    }
}

/// Render Amiga Protracker MOD files to WAV.
#[derive(Debug, Parser)]
#[command(name = "modplay", version, about)]
pub struct Args {
    /// MOD file to render.
    pub input: PathBuf,

    /// Output WAV path. Defaults to the input path with `.wav` appended.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Mixing frequency in Hertz.
    #[arg(long, default_value_t = 31_250)]
    pub rate: u32,

    /// Playback mode.
    #[arg(long, value_enum, default_value_t = ModeArg::Once)]
    pub mode: ModeArg,

    /// Clamp periods to the Amiga Paula chip limits.
    #[arg(long)]
    pub amiga_periods: bool,

    /// Stop playback on an F00 command.
    #[arg(long)]
    pub stop_on_f00: bool,

    /// Print the pattern grid while rendering.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Resolve the output path.
    pub fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            let mut path = self.input.clone().into_os_string();
            path.push(".wav");
            PathBuf::from(path)
        })
    }

    /// Build the player configuration.
    pub fn player_config(&self) -> PlayerConfig {
        PlayerConfig {
            mixing_freq: self.rate,
            amiga_periods: self.amiga_periods,
            stop_on_f00: self.stop_on_f00,
            ..PlayerConfig::default()
        }
    }
}
