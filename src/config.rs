use clap::Parser;
use ffmpeg_transcode::{TranscodeConfig, WritePolicy};

#[derive(Parser, Debug)]
#[command(name = "rtsp-transcode", version)]
#[command(about = "Transcode the video track of a live stream or file into a container file")]
pub struct Args {
    /// Source URI: rtsp://..., a file path, or a lavfi graph with --format lavfi
    pub input_source: String,

    /// Destination file; the container is picked from its extension
    pub output_path: String,

    /// Encoder name
    #[arg(long, default_value = "libx264")]
    pub codec: String,

    /// Quality factor, 0-51 (lower is better)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=51))]
    pub crf: Option<u8>,

    #[arg(long)]
    pub preset: Option<String>,

    #[arg(long)]
    pub tune: Option<String>,

    /// Fixed keyframe interval in frames
    #[arg(long)]
    pub gop: Option<u32>,

    /// Force the input demuxer (e.g. lavfi, v4l2)
    #[arg(short = 'f', long = "format")]
    pub input_format: Option<String>,

    #[arg(long, default_value = "tcp")]
    pub rtsp_transport: String,

    /// Abort on the first rejected packet instead of logging and continuing
    #[arg(long)]
    pub strict_write: bool,
}

impl Args {
    pub fn transcode_config(&self) -> TranscodeConfig {
        let write_policy = if self.strict_write {
            WritePolicy::Abort
        } else {
            WritePolicy::LogAndContinue
        };
        TranscodeConfig::builder()
            .codec(self.codec.as_str())
            .crf(self.crf)
            .preset(self.preset.clone())
            .tune(self.tune.clone())
            .keyframe_interval(self.gop)
            .input_format(self.input_format.clone())
            .rtsp_transport(self.rtsp_transport.as_str())
            .write_policy(write_policy)
            .build()
    }
}
