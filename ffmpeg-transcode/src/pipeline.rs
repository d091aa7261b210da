//! Input and output halves of a transcode run.
//!
//! Field order matters: codec contexts are declared before the format context
//! that feeds them so they are dropped first.

use ffmpeg_next::{Packet, Rational, frame};

use crate::{
    config::TranscodeConfig,
    decoder::Decoder,
    encoder::{Encoder, SourceVideo},
    error::Result,
    input::AvInput,
    output::AvOutput,
};

/// Opened source, its selected video stream and the decoder bound to it.
pub struct InputPipeline {
    decoder: Decoder,
    input: AvInput,
    stream_index: usize,
}

impl InputPipeline {
    /// open -> select_video_stream -> open_decoder.
    pub fn open(uri: &str, config: &TranscodeConfig) -> Result<Self> {
        let mut input = AvInput::open(uri, config)?;
        let stream_index = input.select_video_stream()?;
        let decoder = Decoder::open(&input, stream_index)?;
        Ok(Self {
            decoder,
            input,
            stream_index,
        })
    }

    pub fn uri(&self) -> &str {
        self.input.uri()
    }

    pub fn stream_index(&self) -> usize {
        self.stream_index
    }

    /// Time-base of the selected stream.
    pub fn time_base(&self) -> Rational {
        self.decoder.time_base()
    }

    pub fn read_packet(&mut self, packet: &mut Packet) -> bool {
        self.input.read_packet(packet)
    }

    pub fn send_packet(&mut self, packet: &Packet) -> Result<()> {
        self.decoder.send_packet(packet)
    }

    pub fn send_eof(&mut self) -> Result<()> {
        self.decoder.send_eof()
    }

    pub fn receive_frame(&mut self, frame: &mut frame::Video) -> Result<bool> {
        self.decoder.receive_frame(frame)
    }

    /// Geometry, pixel format and guessed frame rate the encoder is built from.
    pub fn source_video(&self) -> SourceVideo {
        SourceVideo {
            width: self.decoder.width(),
            height: self.decoder.height(),
            pixel_format: self.decoder.format(),
            frame_rate: self.decoder.stream().guessed_rate(),
        }
    }

    /// Splits into decoder and demuxer so they can be released separately.
    pub fn into_parts(self) -> (Decoder, AvInput) {
        (self.decoder, self.input)
    }
}

/// Destination container, its video stream and the encoder feeding it.
pub struct OutputPipeline {
    encoder: Encoder,
    output: AvOutput,
}

impl OutputPipeline {
    /// create_container -> add_output_stream -> configure_encoder -> open_for_write.
    pub fn open(dest: &str, input: &InputPipeline, config: &TranscodeConfig) -> Result<Self> {
        let mut output = AvOutput::create(dest, &config.fallback_format)?;
        output.add_video_stream()?;
        let encoder = Encoder::configure(&mut output, input.source_video(), config)?;
        output.open_for_write()?;
        Ok(Self { encoder, output })
    }

    pub fn path(&self) -> &str {
        self.output.path()
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn send_frame(&mut self, frame: Option<&frame::Video>) -> Result<()> {
        self.encoder.send_frame(frame)
    }

    pub fn receive_packet(&mut self, packet: &mut Packet) -> Result<bool> {
        self.encoder.receive_packet(packet)
    }

    /// Writes an encoded packet, rescaling it from the encoder's time-base.
    pub fn write(&mut self, packet: &mut Packet) -> Result<()> {
        let time_base = self.encoder.time_base();
        self.output.write_packet(packet, time_base)
    }

    pub fn stream_time_base(&self) -> Option<Rational> {
        self.output.stream_time_base()
    }

    pub fn finish(&mut self) -> Result<()> {
        self.output.finish()
    }

    #[cfg(test)]
    pub(crate) fn output_mut(&mut self) -> &mut AvOutput {
        &mut self.output
    }

    pub fn into_parts(self) -> (Encoder, AvOutput) {
        (self.encoder, self.output)
    }
}
