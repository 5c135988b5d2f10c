//! Protracker MOD to WAV renderer.
//!
//! Loads a MOD file, runs the playback engine offline at the configured
//! mixing frequency and writes the stereo output as a 16-bit WAV file,
//! optionally printing the pattern grid as it plays.

mod args;
mod trace;
mod wav;

use std::process::ExitCode;

use clap::Parser;

use args::Args;
use modplay::Player;
use trace::TraceSink;

fn main() -> ExitCode {
    let args = Args::parse();

    let data = match std::fs::read(&args.input) {
        Ok(data) => data,
        Err(err) => {
            eprintln!("Unable to read {}: {err}", args.input.display());
            return ExitCode::FAILURE;
        }
    };

    let sink = TraceSink::new(args.verbose, args.rate);
    let mut player = Player::new(args.player_config(), sink);
    player.init();

    if let Err(err) = player.load(&data) {
        eprintln!("Parse error in {}: {err}", args.input.display());
        return ExitCode::FAILURE;
    }

    player.set_mode(args.mode.into());

    let output = args.output_path();
    match wav::render(&mut player, args.rate, &output) {
        Ok(frames) => {
            let stats = player.stats();
            let seconds = frames as f64 / args.rate as f64;
            println!(
                "Wrote {} ({frames} frames, {seconds:.1}s, max {} BPM)",
                output.display(),
                stats.max_bpm
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Unable to write {}: {err}", output.display());
            ExitCode::FAILURE
        }
    }
}
