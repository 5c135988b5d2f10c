//! The MOD player: song position, pattern, row and tick scheduling, effect
//! dispatch and four-channel mixing.
//!
//! Control runs on two clocks. The host's audio interrupt calls
//! [`Player::tick`] at the mixing frequency; each call advances the voice
//! samplers one step, sums them into the stereo outputs (channels 0+3 left,
//! 1+2 right, the classic Amiga panning) and clocks the tick timer. The
//! host's foreground loop calls [`Player::update`]; when the timer has fired
//! it advances the tracker state machine: tick, maybe a new row, maybe a new
//! pattern, maybe the end of the song.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::channel::Channel;
use crate::config::{PlayerConfig, Tuning};
use crate::error::Result;
use crate::events::{EventSink, Message, NullSink};
use crate::fixed::{hi_byte, hi_nibble, lo_nibble};
use crate::format::{
    Cell, HEADER_SIZE, INITIAL_BPM, INITIAL_SPEED, MAX_TICKS_PER_ROW, NUM_CHANNELS, NUM_ROWS,
    NUM_SAMPLES, ORDERS_OFFSET, PATTERN_SIZE, cell_offset, song_byte,
};
use crate::sampler::Sample;
use crate::song::{self, SongInfo};
use crate::timer::TickTimer;

// Pending row-transition requests raised by effects.
const ACTION_JUMP_TO_ROW: u8 = 1;
const ACTION_STOP: u8 = 2;
const ACTION_JUMP_TO_ORDER: u8 = 4;
const ACTION_PATTERN_BREAK: u8 = 8;

/// Playback mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Play the song once and stop.
    #[default]
    PlayOnce,
    /// Play the song, honor one backward jump, then stop.
    LoopOnce,
    /// Loop the song forever.
    LoopSong,
    /// Repeat the current pattern forever.
    LoopPattern,
}

/// Outcome of one [`Player::update`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateResult {
    /// Nothing is playing.
    Inactive,
    /// Playing, but no tracker tick was due.
    Idle,
    /// One tracker tick was processed.
    Tick,
}

/// Playback statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Highest BPM requested by the song.
    pub max_bpm: u8,
    /// Elapsed playback time in mixing-clock samples.
    pub playback_duration: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SongState {
    mode: Mode,
    loop_counter: u8,
    order: u8,
    row: u8,
    ticks_per_row: u8,
}

impl Default for SongState {
    fn default() -> Self {
        Self {
            mode: Mode::PlayOnce,
            loop_counter: 0,
            order: 0,
            row: 0,
            ticks_per_row: INITIAL_SPEED,
        }
    }
}

/// Per-channel `E6x` pattern-loop state.
#[derive(Debug, Clone, Copy, Default)]
struct PatternLoopState {
    loop_start_row: u8,
    loop_counter: u8,
}

impl PatternLoopState {
    #[inline]
    fn reset(&mut self) {
        self.loop_start_row = 0;
        self.loop_counter = 0;
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct RowState {
    tick: u8,
    delay: u8,
}

#[derive(Debug, Clone, Copy, Default)]
struct RowActions {
    actions: u8,
    jump_to_order: u8,
    jump_to_row: u8,
}

/// Player for 4-channel Amiga Protracker MOD tunes.
///
/// The player borrows the song bytes for its whole playing lifetime and
/// allocates nothing: samples are offset ranges into the borrowed buffer.
/// Construct once, then `load` a song and pump `update` from the foreground
/// while `tick` runs at the mixing frequency.
#[derive(Debug)]
pub struct Player<'a, S: EventSink = NullSink> {
    playing: AtomicBool,

    output_left: i16,
    output_right: i16,

    mixing_counter: u8,
    slope_left: i16,
    slope_right: i16,

    tick_timer: TickTimer,

    song_info: SongInfo,
    samples: [Sample; NUM_SAMPLES as usize],
    channels: [Channel; NUM_CHANNELS as usize],

    song_data: Option<&'a [u8]>,
    pattern_offset: usize,

    song_state: SongState,
    pattern_state: [PatternLoopState; NUM_CHANNELS as usize],
    row_state: RowState,
    row_actions: RowActions,

    stats: Stats,
    tuning: Tuning,
    sink: S,
}

impl<'a> Player<'a, NullSink> {
    /// Create a player with the default configuration and no event sink.
    pub fn new_default() -> Self {
        Self::new(PlayerConfig::default(), NullSink)
    }
}

impl<'a, S: EventSink> Player<'a, S> {
    /// Create a player with the given configuration and event sink.
    pub fn new(config: PlayerConfig, sink: S) -> Self {
        let tuning = Tuning::new(&config);

        Self {
            playing: AtomicBool::new(false),
            output_left: 0,
            output_right: 0,
            mixing_counter: tuning.downsampling_factor,
            slope_left: 0,
            slope_right: 0,
            tick_timer: TickTimer::new(tuning.samples_per_vblank),
            song_info: SongInfo::default(),
            samples: [Sample::default(); NUM_SAMPLES as usize],
            channels: std::array::from_fn(|_| Channel::new(tuning)),
            song_data: None,
            pattern_offset: HEADER_SIZE,
            song_state: SongState::default(),
            pattern_state: [PatternLoopState::default(); NUM_CHANNELS as usize],
            row_state: RowState::default(),
            row_actions: RowActions::default(),
            stats: Stats::default(),
            tuning,
            sink,
        }
    }

    /// Initialize the minimum subset of state. Call once before first use.
    pub fn init(&mut self) {
        for channel in &mut self.channels {
            channel.init();
        }

        self.playing.store(false, Ordering::Release);
    }

    /// Parse a song and arm playback.
    ///
    /// The buffer must stay alive until playback has stopped; the sample
    /// table references into it. On error the player stays inactive and can
    /// be re-loaded.
    pub fn load(&mut self, data: &'a [u8]) -> Result<()> {
        self.playing.store(false, Ordering::Release);

        for channel in &mut self.channels {
            channel.reset();
        }

        for state in &mut self.pattern_state {
            state.reset();
        }

        self.output_left = 0;
        self.output_right = 0;
        self.mixing_counter = self.tuning.downsampling_factor;
        self.slope_left = 0;
        self.slope_right = 0;

        self.song_info = SongInfo::default();
        self.samples = [Sample::default(); NUM_SAMPLES as usize];
        self.song_data = None;

        let parsed = song::parse(data, &self.tuning, &mut self.sink)?;
        self.song_data = Some(data);
        self.song_info = parsed.info;
        self.samples = parsed.samples;

        self.song_state = SongState::default();
        self.row_state = RowState::default();
        self.row_actions = RowActions::default();
        self.stats = Stats {
            max_bpm: INITIAL_BPM,
            playback_duration: 0,
        };

        self.tick_timer.reset(self.tuning.samples_per_vblank);

        self.fetch_pattern();
        self.fetch_row();

        self.playing.store(true, Ordering::Release);
        Ok(())
    }

    /// Select the playback mode.
    pub fn set_mode(&mut self, mode: Mode) {
        self.song_state.mode = mode;
    }

    /// Advance one audio sample. Called from the interrupt at the mixing
    /// frequency.
    pub fn tick(&mut self) {
        if !self.playing.load(Ordering::Acquire) {
            return;
        }

        let Some(song) = self.song_data else {
            return;
        };

        let downsampling = self.tuning.downsampling_factor > 1;
        let lerp = downsampling && self.tuning.downsampling_with_lerp;

        if lerp {
            self.output_left = self.output_left.wrapping_add(self.slope_left);
            self.output_right = self.output_right.wrapping_add(self.slope_right);
        }

        if downsampling {
            // Two voices per call, interleaved by pan side, so each call
            // stays within the interrupt budget.
            if self.mixing_counter & 1 != 0 {
                self.channels[0].fetch_sample(song);
                self.channels[3].fetch_sample(song);
            } else {
                self.channels[1].fetch_sample(song);
                self.channels[2].fetch_sample(song);
            }

            self.mixing_counter -= 1;
            if self.mixing_counter != 0 {
                return;
            }

            self.mixing_counter = self.tuning.downsampling_factor;
        } else {
            self.channels[0].fetch_sample(song);
            self.channels[1].fetch_sample(song);
            self.channels[2].fetch_sample(song);
            self.channels[3].fetch_sample(song);
        }

        // Range [-16384; 16256]
        let new_left = self.channels[0].output() + self.channels[3].output();
        let new_right = self.channels[1].output() + self.channels[2].output();

        if lerp {
            self.slope_left = (new_left - self.output_left) / self.tuning.downsampling_factor as i16;
            self.slope_right =
                (new_right - self.output_right) / self.tuning.downsampling_factor as i16;
        } else {
            // Range [-32768; 32512]
            self.output_left = new_left * 2;
            self.output_right = new_right * 2;
        }

        self.tick_timer.clock();
    }

    /// Pump the tracker state machine. Non-blocking; call from the
    /// foreground loop.
    pub fn update(&mut self) -> UpdateResult {
        if !self.playing.load(Ordering::Acquire) {
            return UpdateResult::Inactive;
        }

        if !self.tick_timer.is_fired() {
            return UpdateResult::Idle;
        }

        self.stats.playback_duration +=
            self.tick_timer.period() as u32 * self.tuning.downsampling_factor as u32;

        self.row_state.tick += 1;
        if self.row_state.tick >= self.song_state.ticks_per_row {
            self.row_state.tick = 0;

            if self.row_state.delay != 0 {
                self.row_state.delay -= 1;
            } else if !self.fetch_next_row() {
                self.stop();
                return UpdateResult::Tick;
            }
        }

        for channel in &mut self.channels {
            channel.tick();
        }

        UpdateResult::Tick
    }

    /// Abort playback and release the voices.
    pub fn stop(&mut self) {
        for channel in &mut self.channels {
            channel.reset();
        }

        self.playing.store(false, Ordering::Release);

        self.sink.on_play_song_end(&self.song_info);
    }

    /// Whether a song is armed and playing.
    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    /// Most recent left output sample.
    #[inline]
    pub fn output_left(&self) -> i16 {
        self.output_left
    }

    /// Most recent right output sample.
    #[inline]
    pub fn output_right(&self) -> i16 {
        self.output_right
    }

    /// High byte of the left output, for 8-bit DAC hosts.
    #[inline]
    pub fn output_left_u8(&self) -> u8 {
        hi_byte(self.output_left as u16)
    }

    /// High byte of the right output, for 8-bit DAC hosts.
    #[inline]
    pub fn output_right_u8(&self) -> u8 {
        hi_byte(self.output_right as u16)
    }

    /// Loaded song metadata.
    #[inline]
    pub fn song(&self) -> &SongInfo {
        &self.song_info
    }

    /// Playback statistics.
    #[inline]
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Current tracker tick period in audio samples.
    #[inline]
    pub fn tick_period(&self) -> u16 {
        self.tick_timer.period()
    }

    /// The event sink.
    #[inline]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The event sink, mutably.
    #[inline]
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    // -------------------------------------------------------------------

    /// Advance to the next row, honoring pending jump/break/stop requests.
    /// Returns false when the song has ended.
    fn fetch_next_row(&mut self) -> bool {
        if self.row_actions.actions & ACTION_STOP != 0 {
            return false;
        }

        if self.row_actions.actions & ACTION_JUMP_TO_ROW != 0 {
            self.song_state.row = self.row_actions.jump_to_row;
        } else {
            self.song_state.row += 1;

            if self.song_state.row == NUM_ROWS
                || self.row_actions.actions & (ACTION_PATTERN_BREAK | ACTION_JUMP_TO_ORDER) != 0
            {
                if self.song_state.mode != Mode::LoopPattern {
                    if self.row_actions.actions & ACTION_JUMP_TO_ORDER != 0 {
                        if self.row_actions.jump_to_order <= self.song_state.order {
                            // A backward jump wraps the song.
                            if self.song_state.mode == Mode::PlayOnce {
                                return false;
                            }

                            if self.song_state.mode == Mode::LoopOnce {
                                let wraps = self.song_state.loop_counter;
                                self.song_state.loop_counter += 1;
                                if wraps == 1 {
                                    return false;
                                }
                            }
                        } else if self.row_actions.jump_to_order >= self.song_info.order_count {
                            return false;
                        }

                        self.song_state.order = self.row_actions.jump_to_order;
                    } else {
                        self.song_state.order += 1;
                        if self.song_state.order == self.song_info.order_count {
                            self.song_state.order = 0;
                            if self.song_state.mode != Mode::LoopSong {
                                return false;
                            }
                        }
                    }
                }

                for state in &mut self.pattern_state {
                    state.reset();
                }

                if self.row_actions.actions & ACTION_PATTERN_BREAK != 0 {
                    if self.row_actions.jump_to_row >= NUM_ROWS {
                        return false;
                    }

                    self.song_state.row = self.row_actions.jump_to_row;
                } else {
                    self.song_state.row = 0;
                }

                self.fetch_pattern();
            }
        }

        self.row_actions.actions = 0;
        self.fetch_row();
        true
    }

    /// Resolve the current order entry into a pattern data offset.
    fn fetch_pattern(&mut self) {
        let song = self.song_data.unwrap_or(&[]);
        let pattern = song_byte(song, ORDERS_OFFSET + self.song_state.order as usize);

        if pattern >= self.song_info.pattern_count {
            self.sink
                .on_message(Message::OutOfRangePattern, &[pattern as u16]);
        }

        self.pattern_offset = HEADER_SIZE + pattern as usize * PATTERN_SIZE;

        self.sink.on_play_pattern(self.song_state.order, pattern);
    }

    /// Parse the current row's four cells and dispatch their effects.
    fn fetch_row(&mut self) {
        self.sink.on_play_row_begin(self.song_state.row);

        let song = self.song_data.unwrap_or(&[]);
        let row = self.song_state.row;

        for i in 0..NUM_CHANNELS {
            let offset = cell_offset(self.pattern_offset, row, i);
            let cell = Cell::decode(
                song_byte(song, offset),
                song_byte(song, offset + 1),
                song_byte(song, offset + 2),
                song_byte(song, offset + 3),
            );

            self.sink
                .on_play_note(i, cell.period, cell.sample, cell.effect, cell.param);

            let idx = i as usize;
            self.channels[idx].reset_row();

            if cell.sample == 0 {
                self.channels[idx].set_sample(None);
            } else if cell.sample <= NUM_SAMPLES {
                let sample = self.samples[cell.sample as usize - 1];
                self.channels[idx].set_sample(Some(sample));
            } else {
                self.sink
                    .on_message(Message::OutOfRangeSample, &[cell.sample as u16]);
            }

            if cell.period != 0
                && (cell.period < self.tuning.min_period || cell.period > self.tuning.max_period)
            {
                self.sink
                    .on_message(Message::OutOfRangePeriod, &[cell.period]);
            }
            self.channels[idx].set_period(cell.period);

            self.dispatch_effect(idx, cell);
        }

        self.sink.on_play_row_end();
    }

    fn dispatch_effect(&mut self, idx: usize, cell: Cell) {
        let param = cell.param;

        match cell.effect {
            // Normal play or Arpeggio
            0x0 => {
                if param != 0 {
                    self.channels[idx].use_arpeggio(hi_nibble(param), lo_nibble(param));
                }
            }

            // Porta Up
            0x1 => self.channels[idx].use_period_dec(param),

            // Porta Down
            0x2 => self.channels[idx].use_period_inc(param),

            // Porta To Note
            0x3 => self.channels[idx].use_period_portamento(param),

            // Vibrato
            0x4 => self.channels[idx].use_period_vibrato(hi_nibble(param), lo_nibble(param)),

            // Porta + Volume Slide
            0x5 => {
                self.channels[idx].use_volume_dec(lo_nibble(param));
                self.channels[idx].use_volume_inc(hi_nibble(param));
                self.channels[idx].use_period_portamento(0);
            }

            // Vibrato + Volume Slide
            0x6 => {
                self.channels[idx].use_volume_dec(lo_nibble(param));
                self.channels[idx].use_volume_inc(hi_nibble(param));
                self.channels[idx].use_period_vibrato(0, 0);
            }

            // Tremolo
            0x7 => self.channels[idx].use_volume_tremolo(hi_nibble(param), lo_nibble(param)),

            // Sample Offset
            0x9 => self.channels[idx].set_sample_offset(param),

            // Volume Slide
            0xA => {
                self.channels[idx].use_volume_dec(lo_nibble(param));
                self.channels[idx].use_volume_inc(hi_nibble(param));
            }

            // Position Jump: playback continues at order xx, row 0.
            0xB => {
                if param >= self.song_info.order_count {
                    self.sink
                        .on_message(Message::OutOfRangeEffectParam, &[cell.effect as u16, param as u16]);
                }
                self.row_actions.actions |= ACTION_JUMP_TO_ORDER;
                self.row_actions.jump_to_order = param;
            }

            // Set Volume
            0xC => self.channels[idx].set_volume(param),

            // Pattern Break: row x*10+y of the next pattern. Decimal, not hex.
            0xD => {
                let pos = hi_nibble(param) * 10 + lo_nibble(param);

                if pos >= NUM_ROWS {
                    self.sink
                        .on_message(Message::OutOfRangeEffectParam, &[cell.effect as u16, param as u16]);
                }

                self.row_actions.actions |= ACTION_PATTERN_BREAK;
                self.row_actions.jump_to_row = pos;
            }

            0xE => self.dispatch_extended_effect(idx, param),

            // Set Speed / BPM
            0xF => {
                if param == 0 {
                    if self.tuning.stop_on_f00 {
                        self.row_actions.actions |= ACTION_STOP;
                    }
                } else if param <= MAX_TICKS_PER_ROW {
                    self.song_state.ticks_per_row = param;
                } else {
                    // TPS = BPM * 2 / 5, so the tick period in samples is
                    // SAMPLING_FREQ * 5 / (2 * BPM). The default 125 BPM at
                    // 31250 Hz gives 625 samples per tick = 50 Hz, the PAL
                    // VBLANK rate.
                    self.stats.max_bpm = self.stats.max_bpm.max(param);

                    let tick_period = (5 * self.tuning.sampling_freq / param as u32 / 2) as u16;
                    self.tick_timer.set_period(tick_period);
                }
            }

            // Panning and anything else the format grew later.
            _ => {
                self.sink.on_message(
                    Message::UnsupportedEffect,
                    &[cell.effect as u16, param as u16],
                );
            }
        }
    }

    fn dispatch_extended_effect(&mut self, idx: usize, param: u8) {
        let ext_param = lo_nibble(param);

        match param & 0xF0 {
            // Fine Portamento Up
            0x10 => self.channels[idx].dec_period(ext_param),

            // Fine Portamento Down
            0x20 => self.channels[idx].inc_period(ext_param),

            // Pattern Loop: E60 marks the loop start; E6x replays the marked
            // section x times. The loop cannot span patterns.
            0x60 => {
                let state = &mut self.pattern_state[idx];

                if ext_param == 0 {
                    state.loop_start_row = self.song_state.row;
                } else if state.loop_counter == 0 {
                    state.loop_counter = ext_param;
                    self.row_actions.actions |= ACTION_JUMP_TO_ROW;
                    self.row_actions.jump_to_row = state.loop_start_row;
                } else {
                    state.loop_counter -= 1;
                    if state.loop_counter != 0 {
                        self.row_actions.actions |= ACTION_JUMP_TO_ROW;
                        self.row_actions.jump_to_row = state.loop_start_row;
                    }
                }
            }

            // Retrig Note
            0x90 => self.channels[idx].use_note_repeat(ext_param),

            // Fine Volume Slide Up
            0xA0 => self.channels[idx].inc_volume(ext_param),

            // Fine Volume Slide Down
            0xB0 => self.channels[idx].dec_volume(ext_param),

            // Cut Note
            0xC0 => self.channels[idx].use_note_cut(ext_param),

            // Delay Note
            0xD0 => self.channels[idx].use_note_delay(ext_param),

            // Pattern Delay
            0xE0 => self.row_state.delay = ext_param,

            // Set Filter, Glissando Control, Set Vibrato Waveform, Set
            // Finetune, Set Tremolo Waveform, Set Panning, Invert Loop.
            _ => {
                self.sink
                    .on_message(Message::UnsupportedEffect, &[0xE, param as u16]);
            }
        }
    }
}
