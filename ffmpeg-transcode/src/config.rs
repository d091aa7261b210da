/// What the engine does when an interleaved write is rejected by the muxer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WritePolicy {
    /// Log the failure, drop the packet and keep going (no retry).
    #[default]
    LogAndContinue,
    /// Treat the failure as fatal and stop the run.
    Abort,
}

/// Settings for one transcode run.
#[derive(Debug, Clone)]
pub struct TranscodeConfig {
    /// Encoder name, e.g. "libx264", "libx265".
    pub codec: String,
    /// Overrides the tuning profile's quality factor (0-51, lower = better).
    pub crf: Option<u8>,
    // "ultrafast", "veryfast", etc.
    pub preset: Option<String>,
    // "zerolatency", "film", etc.
    pub tune: Option<String>,
    /// Overrides the tuning profile's fixed keyframe interval.
    pub keyframe_interval: Option<u32>,
    pub write_policy: WritePolicy,
    /// Transport forced on RTSP sources.
    pub rtsp_transport: String,
    /// Container used when the destination extension is not recognised.
    pub fallback_format: String,
    /// Explicit demuxer name (e.g. "lavfi", "v4l2"); None = probe.
    pub input_format: Option<String>,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            codec: "libx264".to_string(),
            crf: None,
            preset: None,
            tune: None,
            keyframe_interval: None,
            write_policy: WritePolicy::default(),
            rtsp_transport: "tcp".to_string(),
            fallback_format: "mp4".to_string(),
            input_format: None,
        }
    }
}

impl TranscodeConfig {
    pub fn builder() -> TranscodeConfigBuilder {
        TranscodeConfigBuilder::default()
    }
}

#[derive(Default)]
pub struct TranscodeConfigBuilder {
    config: TranscodeConfig,
}

impl TranscodeConfigBuilder {
    pub fn codec(mut self, codec: impl Into<String>) -> Self {
        self.config.codec = codec.into();
        self
    }

    pub fn crf(mut self, crf: Option<u8>) -> Self {
        self.config.crf = crf;
        self
    }

    pub fn preset(mut self, preset: Option<String>) -> Self {
        self.config.preset = preset;
        self
    }

    pub fn tune(mut self, tune: Option<String>) -> Self {
        self.config.tune = tune;
        self
    }

    pub fn keyframe_interval(mut self, interval: Option<u32>) -> Self {
        self.config.keyframe_interval = interval;
        self
    }

    pub fn write_policy(mut self, policy: WritePolicy) -> Self {
        self.config.write_policy = policy;
        self
    }

    pub fn rtsp_transport(mut self, transport: impl Into<String>) -> Self {
        self.config.rtsp_transport = transport.into();
        self
    }

    pub fn fallback_format(mut self, format: impl Into<String>) -> Self {
        self.config.fallback_format = format.into();
        self
    }

    /// Force a demuxer, e.g. "lavfi" for virtual test sources.
    pub fn input_format(mut self, format: Option<String>) -> Self {
        self.config.input_format = format;
        self
    }

    pub fn build(self) -> TranscodeConfig {
        self.config
    }
}
