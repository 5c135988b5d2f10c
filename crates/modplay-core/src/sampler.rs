//! Per-voice sample playback.
//!
//! A [`Sampler`] advances a 16.16 fixed-point phase through one sample's PCM8
//! data, one step per audio interrupt, wrapping into the loop region when the
//! end is reached. All offsets are relative to the sample's base position in
//! the song buffer, so the voice itself never holds a reference and the hot
//! path is a handful of integer operations.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::Tuning;
use crate::fixed::u8_to_i8;
use crate::format::song_byte;

/// One loaded sample, as byte offsets into the song buffer.
///
/// Invariant: `begin <= loop_begin <= loop_end <= end <= song.len()`, except
/// for silent samples where all four offsets are equal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sample {
    /// First byte of PCM data.
    pub begin: u32,
    /// One past the last byte of PCM data.
    pub end: u32,
    /// First byte of the loop region.
    pub loop_begin: u32,
    /// One past the last byte of the loop region.
    pub loop_end: u32,
    /// Finetune, 0..=15.
    pub finetune: u8,
    /// Default volume, 0..=64.
    pub volume: i8,
}

impl Sample {
    /// A sample with no PCM data plays as silence.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }
}

/// Pitched playback of a single voice.
///
/// `fetch_sample` runs in the audio interrupt; everything else runs in the
/// foreground. The `active`/`sampling` pair is the handshake that lets the
/// foreground tear the voice down without racing a fetch in flight.
#[derive(Debug)]
pub struct Sampler {
    // Sync
    active: AtomicBool,
    sampling: AtomicBool,

    // Changeable params
    finetune: u8,
    volume: i8,

    // Cache
    cached_period: u16,
    cached_finetune: u8,

    loopless: bool,

    // Sample data
    sample_base: u32,

    // Fixed-point 16.16, relative to `sample_base`
    end: u32,
    loop_begin: u32,
    loop_end: u32,

    // State
    phase: u32,
    phase_increment: u32,

    // Output
    output: i16,

    tuning: Tuning,
}

impl Sampler {
    /// Create an inactive voice.
    pub fn new(tuning: Tuning) -> Self {
        Self {
            active: AtomicBool::new(false),
            sampling: AtomicBool::new(false),
            finetune: 0,
            volume: 0,
            cached_period: 0,
            cached_finetune: 0,
            loopless: false,
            sample_base: 0,
            end: 0,
            loop_begin: 0,
            loop_end: 0,
            phase: 0,
            phase_increment: 0,
            output: 0,
            tuning,
        }
    }

    /// Initialize the smallest subset of state that gates everything else.
    pub fn init(&mut self) {
        self.active.store(false, Ordering::Release);
        self.sampling.store(false, Ordering::Release);
        self.output = 0;
        self.cached_period = 0;
        self.cached_finetune = 0;
    }

    /// Return to the initial state, waiting out any fetch in flight.
    pub fn reset(&mut self) {
        if self.active.load(Ordering::Acquire) {
            // Activates the bypass in fetch_sample first, then waits for a
            // concurrent fetch to leave the critical section.
            self.active.store(false, Ordering::Release);
            while self.sampling.load(Ordering::Acquire) {
                std::hint::spin_loop();
            }
        }

        self.init();
    }

    /// Re-arm playback.
    ///
    /// `period` must lie in the configured clamp range, `sample_offset` is in
    /// 256-byte units and `volume` in `[0, 64]`. A missing or empty sample
    /// still applies the volume but leaves the voice inactive.
    pub fn retrig(&mut self, sample: Option<&Sample>, period: u16, sample_offset: u8, volume: i8) {
        self.reset();
        self.set_volume(volume);

        let Some(sample) = sample else {
            return;
        };

        if sample.is_empty() {
            return;
        }

        self.finetune = sample.finetune;
        self.internal_set_period(period);

        // Sample data boundaries, in bytes relative to the sample start.
        self.sample_base = sample.begin;
        let mut phase = 0u32;
        let end = sample.end - sample.begin;
        let loop_begin = sample.loop_begin - sample.begin;
        let mut loop_end = sample.loop_end - sample.begin;

        // If the looped section is too short, don't play it. Correct handling
        // of short loops costs more cycles than the interrupt budget allows.
        if loop_end - loop_begin < self.tuning.min_loop_length as u32 {
            self.loopless = true;
            loop_end = loop_begin + 1;
        } else {
            self.loopless = false;
        }

        if sample_offset != 0 {
            phase += sample_offset as u32 * 256;
            if phase > end {
                phase = end;
            }
        }

        // Convert to fixed point 16.16.
        self.phase = phase << 16;
        self.end = end << 16;
        self.loop_begin = loop_begin << 16;
        self.loop_end = loop_end << 16;

        self.active.store(true, Ordering::Release);
    }

    /// Set playback volume, `[0, 64]`.
    #[inline]
    pub fn set_volume(&mut self, volume: i8) {
        self.volume = volume >> self.tuning.volume_attenuation_log2;
    }

    /// Set the sampling period in Amiga units.
    pub fn set_period(&mut self, period: u16) {
        if self.active.load(Ordering::Acquire) {
            self.internal_set_period(period);
        }
    }

    /// Fetch the next sample. Time-critical, called from the interrupt.
    #[inline]
    pub fn fetch_sample(&mut self, song: &[u8]) {
        if !self.active.load(Ordering::Acquire) {
            return;
        }

        self.sampling.store(true, Ordering::Release);

        // pcm ∈ [-128; 127], volume ∈ [0; 64], output ∈ [-8192; 8128]
        let pcm = u8_to_i8(song_byte(song, (self.sample_base + (self.phase >> 16)) as usize));
        self.output = self.volume as i16 * pcm as i16;

        self.phase = self.phase.wrapping_add(self.phase_increment);

        if self.phase >= self.end {
            if !self.loopless {
                self.phase -= self.end - self.loop_begin;
            } else {
                self.phase = self.loop_begin;
            }

            self.end = self.loop_end;
        }

        self.sampling.store(false, Ordering::Release);
    }

    /// Most recent output value, `[-8192, 8128]`.
    #[inline]
    pub fn output(&self) -> i16 {
        self.output
    }

    /// Whether the voice is producing samples.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Recompute the phase increment for a period.
    fn internal_set_period(&mut self, period: u16) {
        let period = self.tuning.clamp_period(period);

        // Skip the expensive division if nothing has changed.
        if period == self.cached_period && self.finetune == self.cached_finetune {
            return;
        }

        self.cached_period = period;
        self.cached_finetune = self.finetune;

        // Fixed-point 18.14
        let speed_constant = self.tuning.speed_table[self.finetune as usize];

        // Fixed-point 18.14 / 16.0 -> 2.14
        let speed = (speed_constant / period as u32) as u16;

        // Fixed-point 2.14 -> 16.16
        self.phase_increment = (speed as u32) << 2;
    }
}
