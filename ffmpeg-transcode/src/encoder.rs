use ffmpeg_next::{Packet, Rational, codec, format::Pixel, frame};

use crate::{
    config::TranscodeConfig,
    error::{Result, TranscodeError},
    output::AvOutput,
    scaler::Scaler,
    tuning::{CodecFamily, ResolvedTuning},
};

/// Decode-side properties the encoder is configured from.
#[derive(Debug, Clone, Copy)]
pub struct SourceVideo {
    pub width: u32,
    pub height: u32,
    pub pixel_format: Pixel,
    pub frame_rate: Rational,
}

const FALLBACK_FRAME_RATE: Rational = Rational(25, 1);

pub struct Encoder {
    inner: ffmpeg_next::codec::encoder::Video,
    codec_name: String,
    family: CodecFamily,
    time_base: Rational,
    width: u32,
    height: u32,
    format: Pixel,
    scaler: Option<Scaler>,
}

impl Encoder {
    /// Finds the encoder by name, configures it from `source` and the
    /// codec family's tuning profile, then opens it and mirrors its
    /// parameters onto the output's video stream.
    pub fn configure(
        output: &mut AvOutput,
        source: SourceVideo,
        config: &TranscodeConfig,
    ) -> Result<Self> {
        let codec = ffmpeg_next::encoder::find_by_name(&config.codec)
            .ok_or_else(|| TranscodeError::EncoderNotFound(config.codec.clone()))?;
        let open_err = |e: ffmpeg_next::Error| TranscodeError::EncoderOpen {
            codec: config.codec.clone(),
            reason: e.to_string(),
            code: i32::from(e),
        };

        let mut encoder = ffmpeg_next::codec::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(open_err)?;

        encoder.set_width(source.width);
        encoder.set_height(source.height);

        let preferred = codec
            .video()
            .ok()
            .and_then(|video| video.formats())
            .and_then(|mut formats| formats.next());
        let pixel_format = preferred.unwrap_or(source.pixel_format);
        encoder.set_format(pixel_format);

        let frame_rate = if source.frame_rate.numerator() > 0 && source.frame_rate.denominator() > 0
        {
            source.frame_rate
        } else {
            log::warn!(
                "could not guess input frame rate, assuming {}/{}",
                FALLBACK_FRAME_RATE.numerator(),
                FALLBACK_FRAME_RATE.denominator()
            );
            FALLBACK_FRAME_RATE
        };
        let time_base = frame_rate.invert();
        encoder.set_frame_rate(Some(frame_rate));
        encoder.set_time_base(time_base);
        output.set_stream_time_base(time_base)?;

        let family = CodecFamily::from_id(codec.id());
        let tuning = ResolvedTuning::resolve(family, config);
        if let Some(gop) = tuning.gop {
            encoder.set_gop(gop);
        }

        if output.needs_global_header() {
            encoder.set_flags(codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder
            .open_as_with(codec, tuning.to_dictionary())
            .map_err(open_err)?;
        output.set_stream_parameters(&encoder)?;

        let time_base: Rational = unsafe { (*encoder.0.as_ptr()).time_base.into() };
        log::info!(
            "encoder opened: {} {}x{} {:?}, time_base {}/{}, options {:?}",
            codec.name(),
            source.width,
            source.height,
            pixel_format,
            time_base.numerator(),
            time_base.denominator(),
            tuning.options
        );

        Ok(Self {
            inner: encoder,
            codec_name: codec.name().to_string(),
            family,
            time_base,
            width: source.width,
            height: source.height,
            format: pixel_format,
            scaler: None,
        })
    }

    /// Submits a frame, or the end-of-stream marker when `frame` is None.
    ///
    /// Frames whose layout differs from the encoder's are converted first.
    pub fn send_frame(&mut self, frame: Option<&frame::Video>) -> Result<()> {
        let Some(frame) = frame else {
            return match self.inner.send_eof() {
                Ok(()) | Err(ffmpeg_next::Error::Eof) => Ok(()),
                Err(e) => Err(TranscodeError::Encode(e.to_string())),
            };
        };

        let matches = frame.format() == self.format
            && frame.width() == self.width
            && frame.height() == self.height;

        let result = if matches {
            self.inner.send_frame(frame)
        } else {
            let scaler = match self.scaler.take() {
                Some(scaler) if scaler.accepts(frame) => self.scaler.insert(scaler),
                _ => self.scaler.insert(
                    Scaler::new(frame, self.format, self.width, self.height)
                        .map_err(|e| TranscodeError::Encode(e.to_string()))?,
                ),
            };
            let converted = scaler
                .run(frame)
                .map_err(|e| TranscodeError::Encode(e.to_string()))?;
            self.inner.send_frame(converted)
        };

        result.map_err(|e| TranscodeError::Encode(e.to_string()))
    }

    /// Pulls one encoded packet. Returns false when the encoder needs more
    /// input or has emitted everything after end-of-stream.
    pub fn receive_packet(&mut self, packet: &mut Packet) -> Result<bool> {
        match self.inner.receive_packet(packet) {
            Ok(()) => Ok(true),
            Err(ffmpeg_next::Error::Eof) => Ok(false),
            Err(ffmpeg_next::Error::Other { errno }) if errno == ffmpeg_next::util::error::EAGAIN => {
                Ok(false)
            }
            Err(e) => Err(TranscodeError::Encode(e.to_string())),
        }
    }

    pub fn time_base(&self) -> Rational {
        self.time_base
    }

    pub fn codec_name(&self) -> &str {
        &self.codec_name
    }

    pub fn family(&self) -> CodecFamily {
        self.family
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> Pixel {
        self.format
    }
}
