//! Player configuration and the tuning constants derived from it.
//!
//! The original hardware target fixes everything at compile time; here the
//! host picks a [`PlayerConfig`] when constructing the player and the engine
//! resolves it once into a [`Tuning`] value that the samplers and channels
//! carry by copy. Nothing is recomputed on the real-time path.

use crate::format::{
    AMIGA_MAX_PERIOD, AMIGA_MIN_PERIOD, MAX_PERIOD, MIN_PERIOD_BASE, NUM_FINETUNES,
};
use crate::tables::{self, MAX_SPEED_INDEX};

/// Amiga Paula chip clock frequency (PAL version, in Hertz).
pub const AMIGA_PAULA_CLOCK_FREQ: u32 = 3_546_894;

/// Amiga VBLANK interrupt frequency (PAL version, in Hertz).
pub const AMIGA_VBLANK_INT_FREQ: u32 = 50;

/// Default mixing frequency: phase-correct PWM rate of a 16 MHz ATmega.
pub const DEFAULT_MIXING_FREQ: u32 = 16_000_000 / 256 / 2;

/// Construction-time playback options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerConfig {
    /// Audio interrupt rate in Hertz. `tick()` must be called this often.
    pub mixing_freq: u32,
    /// Binary logarithm of the downsampling factor. 0 or 1.
    pub downsampling_factor_log2: u8,
    /// Blend output samples linearly when downsampling is enabled.
    pub downsampling_with_lerp: bool,
    /// Binary logarithm of the output volume attenuation.
    pub volume_attenuation_log2: u8,
    /// Clamp periods to the Amiga Paula chip limits instead of the extended
    /// range.
    pub amiga_periods: bool,
    /// Treat the `F00` command as end of song.
    pub stop_on_f00: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            mixing_freq: DEFAULT_MIXING_FREQ,
            downsampling_factor_log2: 0,
            downsampling_with_lerp: true,
            volume_attenuation_log2: 0,
            amiga_periods: false,
            stop_on_f00: false,
        }
    }
}

/// Constants resolved from a [`PlayerConfig`], copied into every voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tuning {
    /// Player sampling frequency: mixing frequency over downsampling factor.
    pub sampling_freq: u32,
    /// Downsampling factor, 1 or 2.
    pub downsampling_factor: u8,
    /// Linear interpolation between downsampled output values.
    pub downsampling_with_lerp: bool,
    /// Right-shift applied to channel volumes.
    pub volume_attenuation_log2: u8,
    /// `F00` stops playback instead of being ignored.
    pub stop_on_f00: bool,
    /// Lowest (fastest) accepted period.
    pub min_period: u16,
    /// Highest (slowest) accepted period.
    pub max_period: u16,
    /// Loops shorter than this many bytes are not followed.
    pub min_loop_length: u16,
    /// Audio samples per tracker tick at the default 125 BPM (50 Hz).
    pub samples_per_vblank: u16,
    /// Finetune-indexed 18.14 speed constants.
    pub speed_table: [u32; NUM_FINETUNES as usize],
}

impl Tuning {
    /// Resolve a configuration.
    pub fn new(config: &PlayerConfig) -> Self {
        debug_assert!(config.downsampling_factor_log2 <= 1);

        let downsampling_factor = 1u8 << config.downsampling_factor_log2;
        let sampling_freq = config.mixing_freq / downsampling_factor as u32;

        let (min_period, max_period) = if config.amiga_periods {
            (AMIGA_MIN_PERIOD, AMIGA_MAX_PERIOD)
        } else {
            (MIN_PERIOD_BASE * downsampling_factor as u16, MAX_PERIOD)
        };

        let speed_table = tables::speed_table(sampling_freq);

        // The fastest voice must not be able to step across a loop this
        // short in a single phase advance.
        let min_loop_length =
            (speed_table[MAX_SPEED_INDEX] / min_period as u32 / 16384) as u16 + 1;

        Self {
            sampling_freq,
            downsampling_factor,
            downsampling_with_lerp: config.downsampling_with_lerp,
            volume_attenuation_log2: config.volume_attenuation_log2,
            stop_on_f00: config.stop_on_f00,
            min_period,
            max_period,
            min_loop_length,
            samples_per_vblank: (sampling_freq / AMIGA_VBLANK_INT_FREQ) as u16,
            speed_table,
        }
    }

    /// Clamp a period into the configured range.
    #[inline]
    pub fn clamp_period(&self, period: u16) -> u16 {
        period.clamp(self.min_period, self.max_period)
    }
}

impl Default for Tuning {
    fn default() -> Self {
        Self::new(&PlayerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tuning() {
        let tuning = Tuning::default();
        assert_eq!(tuning.sampling_freq, 31_250);
        assert_eq!(tuning.samples_per_vblank, 625);
        assert_eq!(tuning.min_period, 28);
        assert_eq!(tuning.max_period, 3424);
        assert_eq!(tuning.min_loop_length, 5);
    }

    #[test]
    fn test_amiga_period_clamp() {
        let tuning = Tuning::new(&PlayerConfig {
            amiga_periods: true,
            ..PlayerConfig::default()
        });
        assert_eq!(tuning.min_period, 113);
        assert_eq!(tuning.max_period, 856);
        assert_eq!(tuning.clamp_period(100), 113);
        assert_eq!(tuning.clamp_period(1000), 856);
    }

    #[test]
    fn test_downsampling_halves_sampling_freq() {
        let tuning = Tuning::new(&PlayerConfig {
            downsampling_factor_log2: 1,
            ..PlayerConfig::default()
        });
        assert_eq!(tuning.downsampling_factor, 2);
        assert_eq!(tuning.sampling_freq, 15_625);
        assert_eq!(tuning.min_period, 56);
    }
}
