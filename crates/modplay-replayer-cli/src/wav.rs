//! WAV rendering: pump the player and write the stereo output.

use std::error::Error;
use std::path::Path;

use modplay::{EventSink, Player, UpdateResult};

/// Render the loaded song to a 16-bit stereo WAV file.
///
/// Drives `update()` and `tick()` exactly like a device host would, one
/// audio sample per iteration, until the player reports the end of the
/// song. Returns the number of sample pairs written.
pub fn render<S: EventSink>(
    player: &mut Player<S>,
    sample_rate: u32,
    path: &Path,
) -> Result<u64, Box<dyn Error>> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    let mut frames = 0u64;

    while player.update() != UpdateResult::Inactive {
        player.tick();

        writer.write_sample(player.output_left())?;
        writer.write_sample(player.output_right())?;
        frames += 1;
    }

    writer.finalize()?;
    Ok(frames)
}
