//! Error types for MOD loading.

use thiserror::Error;

/// Result type for load-time operations.
pub type Result<T> = std::result::Result<T, LoadError>;

/// Fatal errors detected while parsing a MOD file.
///
/// Soft problems (out-of-range finetune or volume, unsupported effects) are
/// clamped or ignored and reported through [`crate::EventSink::on_message`];
/// only the conditions below abort a load. The player stays inactive and can
/// be re-loaded with a different file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The buffer is shorter than the fixed 1084-byte header.
    #[error("file too short: {size} bytes, need at least {min}")]
    FileTooShort {
        /// Size of the supplied buffer.
        size: usize,
        /// Minimum size of a 4-channel MOD header.
        min: usize,
    },

    /// The format tag at offset 1080 is not a supported 4-channel tag.
    #[error("unsupported format tag {tag:?}")]
    UnsupportedFormat {
        /// The four tag bytes as found in the file.
        tag: [u8; 4],
    },

    /// Hosted builds refuse songs larger than the 16-bit address space the
    /// engine is dimensioned for.
    #[error("song size {size} exceeds {max} bytes")]
    SongTooBig {
        /// Size of the supplied buffer.
        size: usize,
        /// Largest supported song.
        max: usize,
    },

    /// A sample's loop region points past the end of the file.
    #[error("sample {index} loop region ends outside the file")]
    SampleOutOfBounds {
        /// 1-based sample number.
        index: u8,
    },

    /// A sample declares a loop shorter than the engine can follow.
    #[error("sample {index} loop length {length} below minimum {min}")]
    LoopTooShort {
        /// 1-based sample number.
        index: u8,
        /// Loop length in bytes.
        length: u16,
        /// Minimum playable loop length in bytes.
        min: u16,
    },
}
