/// Registers FFmpeg components (formats, codecs, lavfi and capture devices).
/// Call once at startup before opening any source.
pub fn init() -> anyhow::Result<()> {
    ffmpeg_next::init().map_err(|e| anyhow::anyhow!("ffmpeg_next init: {}", e))
}

pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod input;
pub mod metadata;
pub mod output;
pub mod packet;
pub mod pipeline;
pub mod scaler;
pub mod shutdown;
pub mod state;
pub mod stream;
pub mod timer;
pub mod timestamp;
pub mod transcoder;
pub mod tuning;

pub use config::{TranscodeConfig, WritePolicy};
pub use error::{Result, TranscodeError};
pub use metadata::probe;
pub use shutdown::TranscodeReport;
pub use state::RunState;
pub use transcoder::{EndReason, Step, Transcoder, transcode};
