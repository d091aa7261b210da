use thiserror::Error;

pub type Result<T> = std::result::Result<T, TranscodeError>;

/// Failures of the transcode pipeline, one per setup step or loop stage.
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("could not open source {uri}: {reason}")]
    Open { uri: String, reason: String },

    #[error("could not find stream info for {uri}: {reason}")]
    Probe { uri: String, reason: String },

    #[error("no video stream found in {uri}")]
    NoVideoStream { uri: String },

    #[error("could not open decoder for stream {index}: {reason}")]
    DecoderOpen { index: usize, reason: String },

    #[error("could not create container for {path}: {reason}")]
    ContainerCreate { path: String, reason: String },

    #[error("encoder not found: {0}")]
    EncoderNotFound(String),

    #[error("could not open encoder {codec}: {reason} (code {code})")]
    EncoderOpen {
        codec: String,
        code: i32,
        reason: String,
    },

    #[error("could not open {path} for writing: {reason}")]
    SinkOpen { path: String, reason: String },

    #[error("error writing container header: {0}")]
    HeaderWrite(String),

    #[error("error decoding packet: {0}")]
    Decode(String),

    #[error("error encoding frame: {0}")]
    Encode(String),

    #[error("error muxing packet: {0}")]
    Write(String),

    #[error("error writing container trailer: {0}")]
    Trailer(String),

    #[error("invalid argument {0:?}")]
    InvalidArgument(String),

    #[error("transcoder already released")]
    Released,
}

impl TranscodeError {
    /// Interleaved write failures are the only ones the loop may recover from.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TranscodeError::Write(_))
    }
}

/// Human readable text for a negative FFmpeg status code.
pub(crate) fn av_reason(code: i32) -> String {
    ffmpeg_next::Error::from(code).to_string()
}
