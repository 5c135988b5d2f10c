//! Amiga Protracker MOD playback engine.
//!
//! A real-time player for 4-channel MOD files (`M.K.`, `4CHN`, `FLT4`) built
//! for severely constrained targets: all DSP is integer fixed point, nothing
//! allocates during playback, and the sample table borrows straight from the
//! caller's song buffer. On hosted platforms the same core renders songs
//! offline, e.g. into WAV files.
//!
//! # Architecture
//!
//! - [`Sampler`] - one playback voice: 16.16 fixed-point phase advance over
//!   PCM8 data with loop wraparound.
//! - [`Channel`] - the per-voice Protracker effect state machine (slides,
//!   vibrato, tremolo, arpeggio, portamento, note cut/delay/retrigger).
//! - [`Player`] - song/pattern/row/tick scheduling, effect dispatch and
//!   four-channel stereo mixing.
//! - [`TickTimer`] - divides the audio clock down to tracker ticks.
//! - [`EventSink`] - pluggable notification surface for hosts.
//!
//! Playback runs on two clocks: the audio interrupt calls [`Player::tick`]
//! once per output sample, the foreground pumps [`Player::update`] to advance
//! the musical state machine.
//!
//! # Quick start
//!
//! ```no_run
//! use modplay::{Player, PlayerConfig, NullSink, UpdateResult};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = std::fs::read("song.mod")?;
//!
//! let mut player = Player::new(PlayerConfig::default(), NullSink);
//! player.init();
//! player.load(&data)?;
//!
//! while player.update() != UpdateResult::Inactive {
//!     player.tick();
//!     let (left, right) = (player.output_left(), player.output_right());
//!     // ... hand the sample pair to the audio device
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod channel;
pub mod config;
pub mod error;
pub mod events;
pub mod fixed;
pub mod format;
pub mod player;
pub mod sampler;
pub mod song;
pub mod tables;
pub mod timer;

pub use channel::Channel;
pub use config::{PlayerConfig, Tuning};
pub use error::{LoadError, Result};
pub use events::{EventSink, Message, NullSink};
pub use player::{Mode, Player, Stats, UpdateResult};
pub use sampler::{Sample, Sampler};
pub use song::SongInfo;
pub use timer::TickTimer;
