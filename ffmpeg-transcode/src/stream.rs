use ffmpeg_next::{Rational, codec::Parameters, format::stream};

/// Snapshot of one elementary stream of an opened source.
pub struct AvStream {
    index: usize,
    parameters: Parameters,
    time_base: Rational,
    rate: Rational,
    guessed_rate: Rational,
}

impl AvStream {
    pub fn index(&self) -> usize {
        self.index
    }
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }
    pub fn time_base(&self) -> Rational {
        self.time_base
    }
    pub fn rate(&self) -> Rational {
        self.rate
    }

    /// Frame rate as guessed by the demuxer; falls back to the average rate.
    pub fn guessed_rate(&self) -> Rational {
        self.guessed_rate
    }

    pub fn codec_id(&self) -> ffmpeg_next::codec::Id {
        self.parameters.id()
    }

    pub fn medium(&self) -> ffmpeg_next::media::Type {
        self.parameters.medium()
    }

    pub fn is_video(&self) -> bool {
        self.medium() == ffmpeg_next::media::Type::Video
    }

    pub fn width(&self) -> u32 {
        unsafe {
            let ptr = self.parameters.as_ptr() as *const ffmpeg_next::ffi::AVCodecParameters;
            (*ptr).width.max(0) as u32
        }
    }

    pub fn height(&self) -> u32 {
        unsafe {
            let ptr = self.parameters.as_ptr() as *const ffmpeg_next::ffi::AVCodecParameters;
            (*ptr).height.max(0) as u32
        }
    }

    pub fn fps(&self) -> f32 {
        if self.guessed_rate.denominator() == 0 {
            return 0.0;
        }
        self.guessed_rate.numerator() as f32 / self.guessed_rate.denominator() as f32
    }

    pub(crate) fn with_guessed_rate(mut self, guessed: Rational) -> Self {
        if guessed.numerator() > 0 && guessed.denominator() > 0 {
            self.guessed_rate = guessed;
        }
        self
    }
}

impl From<stream::Stream<'_>> for AvStream {
    fn from(stream: stream::Stream<'_>) -> Self {
        let rate = stream.avg_frame_rate();
        let guessed_rate = if rate.numerator() > 0 && rate.denominator() > 0 {
            rate
        } else {
            stream.rate()
        };
        Self {
            index: stream.index(),
            parameters: stream.parameters(),
            time_base: stream.time_base(),
            rate,
            guessed_rate,
        }
    }
}

impl Clone for AvStream {
    fn clone(&self) -> Self {
        Self {
            index: self.index,
            parameters: self.parameters.clone(),
            time_base: self.time_base,
            rate: self.rate,
            guessed_rate: self.guessed_rate,
        }
    }
}

impl std::fmt::Display for AvStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "stream #{}: {:?} {:?}, {}x{}, time_base {}/{}, {:.2} fps",
            self.index,
            self.medium(),
            self.codec_id(),
            self.width(),
            self.height(),
            self.time_base.numerator(),
            self.time_base.denominator(),
            self.fps()
        )
    }
}
