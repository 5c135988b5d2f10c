//! Playback event surface.
//!
//! The engine reports everything observable (song metadata, pattern and row
//! progression, per-cell notes, validation findings) through the
//! [`EventSink`] trait. Hosts plug in a sink at construction time; every
//! method has a no-op default so a sink only implements what it cares about,
//! and [`NullSink`] implements nothing at all.
//!
//! The real-time `tick()` path never calls the sink: all conditions it could
//! hit are validated at load time.

use crate::sampler::Sample;
use crate::song::SongInfo;

/// Diagnostic codes reported via [`EventSink::on_message`].
///
/// These are soft findings unless the load path also returns an error:
/// playback clamps the value or skips the effect and keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Message {
    /// Format tag is not one of the supported 4-channel tags.
    UnsupportedFormat = 0x1,
    /// Effect is recognized but not executed (args: effect, param).
    UnsupportedEffect = 0x2,
    /// Sample body or loop region lies outside the file (args: sample, which).
    OutOfRangeSampleBoundaries = 0x3,
    /// Sample finetune above 15, clamped (args: sample, finetune).
    OutOfRangeSampleFinetune = 0x4,
    /// Sample volume above 64, clamped (args: sample, volume).
    OutOfRangeSampleVolume = 0x5,
    /// Sample loop shorter than the engine minimum (args: sample, length, min).
    OutOfRangeSampleLoopLength = 0x6,
    /// Cell references a sample number above 31.
    OutOfRangeSample = 0x7,
    /// Non-zero cell period outside the configured clamp range.
    OutOfRangePeriod = 0x8,
    /// Order list entry beyond the counted patterns.
    OutOfRangePattern = 0x9,
    /// Effect parameter outside its legal range (args: effect, param).
    OutOfRangeEffectParam = 0xA,
    /// Song exceeds the supported size on hosted platforms.
    SongSizeTooBig = 0xB,
}

/// Receiver for playback and validation events.
///
/// All methods default to no-ops. The sink is owned by the player and invoked
/// from the foreground context only (`load`/`update`/`stop`), never from the
/// audio interrupt.
#[allow(unused_variables)]
pub trait EventSink {
    /// A song header passed validation; samples follow.
    fn on_song_load(&mut self, song: &SongInfo) {}

    /// A song failed to load. A [`Message`] with details precedes this call.
    fn on_song_load_error(&mut self, song: &SongInfo) {}

    /// One sample table entry was constructed. `index` is 1-based.
    fn on_sample_load(&mut self, index: u8, sample: &Sample) {}

    /// Playback entered a pattern at the given order position.
    fn on_play_pattern(&mut self, order: u8, pattern: u8) {}

    /// A row is about to be parsed and dispatched.
    fn on_play_row_begin(&mut self, row: u8) {}

    /// One decoded pattern cell, before effect dispatch.
    fn on_play_note(&mut self, channel: u8, period: u16, sample: u8, effect: u8, param: u8) {}

    /// All four cells of the current row have been dispatched.
    fn on_play_row_end(&mut self) {}

    /// Playback stopped, either by reaching the end or via `stop()`.
    fn on_play_song_end(&mut self, song: &SongInfo) {}

    /// A validation or compatibility finding with its raw arguments.
    fn on_message(&mut self, message: Message, args: &[u16]) {}
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {}
