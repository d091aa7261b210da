use ffmpeg_next::{Packet, Rational, format::Pixel, frame};

use crate::{
    error::{Result, TranscodeError},
    input::AvInput,
    stream::AvStream,
};

/// Video decoder bound to one input stream's codec parameters.
pub struct Decoder {
    stream: AvStream,
    inner: ffmpeg_next::codec::decoder::Video,
}

impl Decoder {
    /// Copies the stream's parameters into a fresh context and opens it with
    /// the decoder resolved during stream selection.
    pub fn open(input: &AvInput, stream_index: usize) -> Result<Self> {
        let open_err = |reason: String| TranscodeError::DecoderOpen {
            index: stream_index,
            reason,
        };

        let stream = input
            .stream(stream_index)
            .ok_or_else(|| open_err("stream not found".to_string()))?
            .clone();
        let codec = input.decoder_for(stream_index).ok_or_else(|| {
            open_err(format!("no decoder for codec {:?}", stream.codec_id()))
        })?;

        let mut decoder_ctx = ffmpeg_next::codec::Context::new_with_codec(codec);
        unsafe {
            (*decoder_ctx.as_mut_ptr()).time_base = stream.time_base().into();
            (*decoder_ctx.as_mut_ptr()).pkt_timebase = stream.time_base().into();
        }
        decoder_ctx
            .set_parameters(stream.parameters().clone())
            .map_err(|e| open_err(e.to_string()))?;

        let video_decoder = decoder_ctx
            .decoder()
            .open_as(codec)
            .and_then(|opened| opened.video())
            .map_err(|e| open_err(e.to_string()))?;

        if video_decoder.format() == Pixel::None
            || video_decoder.width() == 0
            || video_decoder.height() == 0
        {
            return Err(open_err("missing codec parameters".to_string()));
        }

        log::info!(
            "decoder opened: {} {}x{} {:?}",
            codec.name(),
            video_decoder.width(),
            video_decoder.height(),
            video_decoder.format()
        );

        Ok(Self {
            stream,
            inner: video_decoder,
        })
    }

    pub fn send_packet(&mut self, packet: &Packet) -> Result<()> {
        match self.inner.send_packet(packet) {
            Ok(()) | Err(ffmpeg_next::Error::Eof) => Ok(()),
            Err(e) => Err(TranscodeError::Decode(e.to_string())),
        }
    }

    pub fn send_eof(&mut self) -> Result<()> {
        match self.inner.send_eof() {
            Ok(()) | Err(ffmpeg_next::Error::Eof) => Ok(()),
            Err(e) => Err(TranscodeError::Decode(e.to_string())),
        }
    }

    /// Pulls one decoded frame into `frame`. Returns false when the decoder
    /// needs more input or has been fully drained.
    pub fn receive_frame(&mut self, frame: &mut frame::Video) -> Result<bool> {
        match self.inner.receive_frame(frame) {
            Ok(()) => Ok(true),
            Err(ffmpeg_next::Error::Eof) => Ok(false),
            Err(ffmpeg_next::Error::Other { errno }) if errno == ffmpeg_next::util::error::EAGAIN => {
                Ok(false)
            }
            Err(e) => Err(TranscodeError::Decode(e.to_string())),
        }
    }

    pub fn stream_index(&self) -> usize {
        self.stream.index()
    }

    pub fn stream(&self) -> &AvStream {
        &self.stream
    }

    pub fn time_base(&self) -> Rational {
        self.stream.time_base()
    }

    pub fn width(&self) -> u32 {
        self.inner.width()
    }

    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    pub fn format(&self) -> Pixel {
        self.inner.format()
    }
}
