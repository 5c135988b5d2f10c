//! Song header parsing and sample table construction.
//!
//! A load is one pass over the fixed-layout header: validate the format tag,
//! count the patterns actually referenced by the order list, then walk the 31
//! sample headers collecting byte ranges into the caller's buffer. Nothing is
//! copied; the resulting [`Sample`]s are offsets into the song bytes.
//!
//! Out-of-range finetune and volume values are clamped and reported as soft
//! messages. Loop regions outside the file and loops shorter than the engine
//! can follow are fatal.

use crate::config::Tuning;
use crate::error::{LoadError, Result};
use crate::events::{EventSink, Message};
use crate::format::{
    self, HEADER_SIZE, MAX_FINETUNE, MAX_SONG_SIZE, MAX_VOLUME, NUM_ORDERS, NUM_SAMPLES,
    ORDER_COUNT_OFFSET, ORDERS_OFFSET, PATTERN_SIZE, SONG_NAME_LEN, SUPPORTED_TAGS, TAG_OFFSET,
};
use crate::sampler::Sample;

/// Song metadata collected at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SongInfo {
    /// Song name as stored, NUL-padded ASCII.
    pub name: [u8; SONG_NAME_LEN],
    /// Format tag from offset 1080.
    pub tag: [u8; 4],
    /// Number of order list entries in use, 1..=128.
    pub order_count: u8,
    /// Number of pattern slots present in the file.
    pub pattern_count: u8,
}

impl SongInfo {
    /// Song name with trailing NULs removed, lossily decoded.
    pub fn name(&self) -> String {
        let end = self
            .name
            .iter()
            .position(|&byte| byte == 0)
            .unwrap_or(self.name.len());
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }
}

impl Default for SongInfo {
    fn default() -> Self {
        Self {
            name: [0; SONG_NAME_LEN],
            tag: [0; 4],
            order_count: 0,
            pattern_count: 0,
        }
    }
}

/// Result of a successful parse: metadata plus the runtime sample table.
#[derive(Debug, Clone)]
pub struct ParsedSong {
    /// Header metadata.
    pub info: SongInfo,
    /// Runtime sample table; silent slots have collapsed offsets.
    pub samples: [Sample; NUM_SAMPLES as usize],
}

/// Parse one MOD file.
///
/// Emits `on_song_load`, `on_sample_load` and soft messages into the sink as
/// it goes. Header-level failures emit `on_song_load_error` plus the
/// matching message before the error returns; sample-table failures happen
/// after `on_song_load` has already fired and report through `on_message`
/// only.
pub fn parse<S: EventSink>(data: &[u8], tuning: &Tuning, sink: &mut S) -> Result<ParsedSong> {
    let mut info = SongInfo::default();

    if data.len() < HEADER_SIZE {
        sink.on_song_load_error(&info);
        return Err(LoadError::FileTooShort {
            size: data.len(),
            min: HEADER_SIZE,
        });
    }

    info.name.copy_from_slice(&data[..SONG_NAME_LEN]);
    info.tag.copy_from_slice(&data[TAG_OFFSET..TAG_OFFSET + 4]);

    if !SUPPORTED_TAGS.contains(&info.tag) {
        sink.on_song_load_error(&info);
        sink.on_message(
            Message::UnsupportedFormat,
            &[
                info.tag[0] as u16,
                info.tag[1] as u16,
                info.tag[2] as u16,
                info.tag[3] as u16,
            ],
        );
        return Err(LoadError::UnsupportedFormat { tag: info.tag });
    }

    if data.len() > MAX_SONG_SIZE {
        sink.on_song_load_error(&info);
        sink.on_message(Message::SongSizeTooBig, &[]);
        return Err(LoadError::SongTooBig {
            size: data.len(),
            max: MAX_SONG_SIZE,
        });
    }

    info.order_count = data[ORDER_COUNT_OFFSET];

    // Some trackers leave unused patterns in the file, so every order entry
    // is scanned, not just the ones in use.
    let mut max_pattern = 0u8;
    for &order in &data[ORDERS_OFFSET..ORDERS_OFFSET + NUM_ORDERS as usize] {
        if order > max_pattern {
            max_pattern = order;
        }
    }
    info.pattern_count = max_pattern.wrapping_add(1);

    sink.on_song_load(&info);

    let samples = parse_samples(data, &info, tuning, sink)?;

    Ok(ParsedSong { info, samples })
}

fn parse_samples<S: EventSink>(
    data: &[u8],
    info: &SongInfo,
    tuning: &Tuning,
    sink: &mut S,
) -> Result<[Sample; NUM_SAMPLES as usize]> {
    let data_end = data.len() as u32;
    let mut samples = [Sample::default(); NUM_SAMPLES as usize];

    // Sample bodies follow the patterns, in declaration order.
    let mut cursor = (HEADER_SIZE + info.pattern_count as usize * PATTERN_SIZE) as u32;

    for (i, sample) in samples.iter_mut().enumerate() {
        let number = i as u16 + 1;
        let header = format::sample_header(data, i as u8);
        let sample_end = cursor.saturating_add(header.length);

        // Some songs carry empty samples or bodies past the end of the file;
        // both decay to a silent slot.
        if header.length > 2 && sample_end <= data_end {
            sample.begin = cursor;
            sample.end = sample_end;

            let mut finetune = header.finetune;
            if finetune > MAX_FINETUNE {
                sink.on_message(
                    Message::OutOfRangeSampleFinetune,
                    &[number, finetune as u16],
                );
                finetune = MAX_FINETUNE;
            }
            sample.finetune = finetune;

            sample.volume = clamp_volume(header.volume, number, sink);

            sample.loop_begin = sample.begin + header.loop_start;
            if sample.loop_begin > data_end {
                sink.on_message(Message::OutOfRangeSampleBoundaries, &[number, 2]);
                return Err(LoadError::SampleOutOfBounds { index: number as u8 });
            }

            sample.loop_end = sample.loop_begin + header.loop_length;
            if sample.loop_end > data_end {
                sink.on_message(Message::OutOfRangeSampleBoundaries, &[number, 3]);
                return Err(LoadError::SampleOutOfBounds { index: number as u8 });
            }

            if header.loop_length < tuning.min_loop_length as u32 && header.loop_start != 0 {
                sink.on_message(
                    Message::OutOfRangeSampleLoopLength,
                    &[number, header.loop_length as u16, tuning.min_loop_length],
                );
                return Err(LoadError::LoopTooShort {
                    index: number as u8,
                    length: header.loop_length as u16,
                    min: tuning.min_loop_length,
                });
            }

            cursor = sample.end;
            sink.on_sample_load(number as u8, sample);
        } else {
            if header.length > 2 {
                sink.on_message(Message::OutOfRangeSampleBoundaries, &[number, 1]);
            }

            sample.begin = cursor;
            sample.end = cursor;
            sample.loop_begin = cursor;
            sample.loop_end = cursor;
            sample.volume = clamp_volume(header.volume, number, sink);

            if sample.volume != 0 {
                sink.on_sample_load(number as u8, sample);
            }
        }
    }

    Ok(samples)
}

fn clamp_volume<S: EventSink>(volume: u8, number: u16, sink: &mut S) -> i8 {
    if volume > MAX_VOLUME as u8 {
        sink.on_message(Message::OutOfRangeSampleVolume, &[number, volume as u16]);
        MAX_VOLUME
    } else {
        volume as i8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullSink;

    fn empty_mod() -> Vec<u8> {
        let mut data = vec![0u8; HEADER_SIZE + PATTERN_SIZE];
        data[ORDER_COUNT_OFFSET] = 1;
        data[TAG_OFFSET..TAG_OFFSET + 4].copy_from_slice(b"M.K.");
        data
    }

    #[test]
    fn test_rejects_unknown_tag() {
        let mut data = empty_mod();
        data[TAG_OFFSET..TAG_OFFSET + 4].copy_from_slice(b"M!K!");

        let result = parse(&data, &Tuning::default(), &mut NullSink);
        assert_eq!(
            result.unwrap_err(),
            LoadError::UnsupportedFormat { tag: *b"M!K!" }
        );
    }

    #[test]
    fn test_rejects_truncated_header() {
        let result = parse(&[0u8; 100], &Tuning::default(), &mut NullSink);
        assert!(matches!(result, Err(LoadError::FileTooShort { .. })));
    }

    #[test]
    fn test_pattern_count_from_order_scan() {
        let mut data = empty_mod();
        // Order list references pattern 2 beyond the in-use range.
        data[ORDERS_OFFSET] = 0;
        data[ORDERS_OFFSET + 5] = 2;
        data.resize(HEADER_SIZE + 3 * PATTERN_SIZE, 0);

        let parsed = parse(&data, &Tuning::default(), &mut NullSink).unwrap();
        assert_eq!(parsed.info.pattern_count, 3);
    }

    #[test]
    fn test_accepts_all_supported_tags() {
        for tag in [b"M.K.", b"4CHN", b"FLT4"] {
            let mut data = empty_mod();
            data[TAG_OFFSET..TAG_OFFSET + 4].copy_from_slice(tag);
            assert!(parse(&data, &Tuning::default(), &mut NullSink).is_ok());
        }
    }

    #[test]
    fn test_sample_table_offsets() {
        let mut data = empty_mod();
        // Sample 1: 64 bytes, full loop; sample 2: 32 bytes, no loop.
        data[20 + 23] = 32; // length 32 words = 64 bytes
        data[20 + 25] = 40; // volume
        data[20 + 29] = 32; // loop length 32 words
        data[50 + 23] = 16; // length 16 words = 32 bytes
        data[50 + 25] = 64;
        data[50 + 29] = 1; // loop length 1 word, loop start 0: silent loop
        let body_start = data.len();
        data.resize(body_start + 96, 0x11);

        let parsed = parse(&data, &Tuning::default(), &mut NullSink).unwrap();

        let first = parsed.samples[0];
        assert_eq!(first.begin, body_start as u32);
        assert_eq!(first.end, body_start as u32 + 64);
        assert_eq!(first.loop_begin, first.begin);
        assert_eq!(first.loop_end, first.end);
        assert_eq!(first.volume, 40);

        let second = parsed.samples[1];
        assert_eq!(second.begin, first.end);
        assert_eq!(second.end, second.begin + 32);
        // Loop of one word with start 0 is accepted but too short to follow.
        assert_eq!(second.loop_end, second.begin + 2);

        // Remaining slots are silent and pinned at the cursor.
        let third = parsed.samples[2];
        assert!(third.is_empty());
        assert_eq!(third.begin, second.end);
    }

    #[test]
    fn test_finetune_and_volume_clamped() {
        let mut data = empty_mod();
        data[20 + 23] = 2; // 4 bytes
        data[20 + 24] = 30; // finetune out of range
        data[20 + 25] = 100; // volume out of range
        let body_start = data.len();
        data.resize(body_start + 4, 0);

        let parsed = parse(&data, &Tuning::default(), &mut NullSink).unwrap();
        assert_eq!(parsed.samples[0].finetune, 15);
        assert_eq!(parsed.samples[0].volume, 64);
    }

    #[test]
    fn test_rejects_loop_outside_file() {
        let mut data = empty_mod();
        data[20 + 23] = 2; // 4 bytes
        data[20 + 27] = 200; // loop start 400 bytes, way past the body
        let body_start = data.len();
        data.resize(body_start + 4, 0);

        let result = parse(&data, &Tuning::default(), &mut NullSink);
        assert_eq!(
            result.unwrap_err(),
            LoadError::SampleOutOfBounds { index: 1 }
        );
    }

    #[test]
    fn test_rejects_short_loop_with_nonzero_start() {
        let mut data = empty_mod();
        data[20 + 23] = 8; // 16 bytes
        data[20 + 27] = 1; // loop start 2 bytes
        data[20 + 29] = 1; // loop length 2 bytes, below minimum
        let body_start = data.len();
        data.resize(body_start + 16, 0);

        let result = parse(&data, &Tuning::default(), &mut NullSink);
        assert_eq!(
            result.unwrap_err(),
            LoadError::LoopTooShort {
                index: 1,
                length: 2,
                min: 5
            }
        );
    }

    #[derive(Default)]
    struct CountingSink {
        loads: u32,
        load_errors: u32,
        messages: Vec<Message>,
    }

    impl EventSink for CountingSink {
        fn on_song_load(&mut self, _song: &SongInfo) {
            self.loads += 1;
        }

        fn on_song_load_error(&mut self, _song: &SongInfo) {
            self.load_errors += 1;
        }

        fn on_message(&mut self, message: Message, _args: &[u16]) {
            self.messages.push(message);
        }
    }

    #[test]
    fn test_header_failure_fires_load_error_only() {
        let mut data = empty_mod();
        data[TAG_OFFSET..TAG_OFFSET + 4].copy_from_slice(b"M!K!");

        let mut sink = CountingSink::default();
        assert!(parse(&data, &Tuning::default(), &mut sink).is_err());
        assert_eq!(sink.loads, 0);
        assert_eq!(sink.load_errors, 1);
    }

    #[test]
    fn test_sample_failure_reports_message_only() {
        // A song that fails on its sample table has already announced itself
        // via on_song_load; the failure is reported through on_message alone.
        let mut data = empty_mod();
        data[20 + 23] = 2; // 4 bytes
        data[20 + 27] = 200; // loop start far outside the body
        let body_start = data.len();
        data.resize(body_start + 4, 0);

        let mut sink = CountingSink::default();
        assert!(parse(&data, &Tuning::default(), &mut sink).is_err());
        assert_eq!(sink.loads, 1);
        assert_eq!(sink.load_errors, 0);
        assert!(
            sink.messages
                .contains(&Message::OutOfRangeSampleBoundaries)
        );
    }

    #[test]
    fn test_song_name_decoding() {
        let mut data = empty_mod();
        data[..9].copy_from_slice(b"testsong\0");

        let parsed = parse(&data, &Tuning::default(), &mut NullSink).unwrap();
        assert_eq!(parsed.info.name(), "testsong");
        assert_eq!(parsed.info.order_count, 1);
    }
}
