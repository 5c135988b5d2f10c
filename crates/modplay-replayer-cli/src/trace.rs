//! Console event sink: song info, pattern grids and validation findings.

use modplay::{EventSink, Message, Sample, SongInfo};

const RULER_THICK: &str = "==============================================================";
const RULER_THIN: &str = "--------------------------------------------------------------";

/// Sink printing playback progress the way the classic tracker test
/// harnesses did: one line per row, one column per channel.
pub struct TraceSink {
    verbose: bool,
    mixing_freq: u32,
}

impl TraceSink {
    /// Create a sink. With `verbose` off only song metadata and findings
    /// are printed.
    pub fn new(verbose: bool, mixing_freq: u32) -> Self {
        Self {
            verbose,
            mixing_freq,
        }
    }
}

fn print_padded(value: u16, digits: usize) {
    if value == 0 {
        print!("{}", ".".repeat(digits));
    } else {
        print!("{value:0digits$}");
    }
}

impl EventSink for TraceSink {
    fn on_song_load(&mut self, song: &SongInfo) {
        println!("{RULER_THICK}");
        println!("MIXF: {} [Hz]", self.mixing_freq);
        println!("{RULER_THIN}");
        println!("SONG: {}", song.name());
        println!("{RULER_THIN}");
        println!("ORDS: {}", song.order_count);
        println!("PATS: {}", song.pattern_count);
        println!(
            "FMTG: {}{}{}{}",
            song.tag[0] as char, song.tag[1] as char, song.tag[2] as char, song.tag[3] as char
        );
    }

    fn on_song_load_error(&mut self, song: &SongInfo) {
        println!("-ERROR-");
        println!("{}", song.name());
    }

    fn on_sample_load(&mut self, index: u8, sample: &Sample) {
        if !self.verbose {
            return;
        }

        println!("{RULER_THIN}");
        println!("SMPL: #{index:02}");
        println!("ADDR: ${:04X}", sample.begin);
        println!("LNGT: ${:04X}", sample.end - sample.begin);
        println!("FNTN: ${:01X}", sample.finetune);
        println!("VOLM: ${:02X}", sample.volume);
        println!("LPST: ${:04X}", sample.loop_begin - sample.begin);
        println!("LPLN: ${:04X}", sample.loop_end - sample.loop_begin);
    }

    fn on_play_pattern(&mut self, _order: u8, pattern: u8) {
        if self.verbose {
            println!("{RULER_THIN}");
            println!("PTRN #{pattern}");
            println!("{RULER_THIN}");
        }
    }

    fn on_play_row_begin(&mut self, row: u8) {
        if self.verbose {
            print!("{row:02} ");
        }
    }

    fn on_play_note(&mut self, _channel: u8, period: u16, sample: u8, effect: u8, param: u8) {
        if !self.verbose {
            return;
        }

        print!("| ");
        print_padded(period, 5);
        print!(" ");
        print_padded(sample as u16, 2);
        if effect != 0 || param != 0 {
            print!(" {effect:01X}{param:02X} ");
        } else {
            print!(" ... ");
        }
    }

    fn on_play_row_end(&mut self) {
        if self.verbose {
            println!();
        }
    }

    fn on_play_song_end(&mut self, _song: &SongInfo) {
        if self.verbose {
            println!("{RULER_THICK}");
        }
    }

    fn on_message(&mut self, message: Message, args: &[u16]) {
        eprint!("{:02X}", message as u8);
        for arg in args {
            eprint!(":{arg:02X}");
        }
        eprintln!();
    }
}
