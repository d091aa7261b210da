//! The decode -> encode -> mux loop.

use ffmpeg_next::{Packet, frame::Video};

use crate::{
    config::{TranscodeConfig, WritePolicy},
    error::Result,
    frame,
    packet,
    pipeline::{InputPipeline, OutputPipeline},
    shutdown::TranscodeReport,
    state::RunState,
    timestamp,
};

/// Outcome of one READ iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A video packet went through the decoder (zero or more frames encoded).
    Continue,
    /// The packet belonged to another stream and was dropped.
    Skipped,
    EndOfInput,
}

/// Why [`Transcoder::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    StopRequested,
    EndOfInput,
}

/// Everything the loop owns. Output is declared first so the encoder is
/// released before the decoder.
pub(crate) struct Resources {
    pub(crate) output: OutputPipeline,
    pub(crate) input: InputPipeline,
    pub(crate) frame: Video,
    pub(crate) packet: Packet,
    pub(crate) encoded: Packet,
}

pub struct Transcoder {
    pub(crate) resources: Option<Resources>,
    pub(crate) write_policy: WritePolicy,
    pub(crate) failed: bool,
    pub(crate) end: Option<EndReason>,
    pub(crate) report: Option<TranscodeReport>,
}

impl Transcoder {
    /// Sets up both pipelines. The destination is not touched until the
    /// source has been opened and its video stream decoded-ready.
    pub fn open(source: &str, dest: &str, config: &TranscodeConfig) -> Result<Self> {
        let input = InputPipeline::open(source, config)?;
        let output = OutputPipeline::open(dest, &input, config)?;
        log::info!(
            "transcoding {} -> {} with {}",
            input.uri(),
            output.path(),
            output.encoder().codec_name()
        );
        Ok(Self {
            resources: Some(Resources {
                output,
                input,
                frame: Video::empty(),
                packet: Packet::empty(),
                encoded: Packet::empty(),
            }),
            write_policy: config.write_policy,
            failed: false,
            end: None,
            report: None,
        })
    }

    /// Runs one READ -> DECODE -> ENCODE -> WRITE iteration.
    ///
    /// Any error returned here is fatal; the transcoder is marked failed and
    /// shutdown will skip the decoder drain.
    pub fn step(&mut self, state: &mut RunState) -> Result<Step> {
        let policy = self.write_policy;
        let Some(resources) = self.resources.as_mut() else {
            return Ok(Step::EndOfInput);
        };
        let result = resources.step(state, policy);
        if let Err(e) = &result {
            log::error!("transcode loop failed: {}", e);
            self.failed = true;
        }
        result
    }

    /// Loops until the input ends or a stop is requested. The stop flag is
    /// checked once per iteration, never in the middle of one.
    pub fn run(&mut self, state: &mut RunState) -> Result<EndReason> {
        loop {
            if state.stop_requested() {
                log::info!("stop requested after {} frames", state.frames_decoded());
                self.end = Some(EndReason::StopRequested);
                return Ok(EndReason::StopRequested);
            }
            if self.step(state)? == Step::EndOfInput {
                self.end = Some(EndReason::EndOfInput);
                return Ok(EndReason::EndOfInput);
            }
        }
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn is_closed(&self) -> bool {
        self.resources.is_none()
    }
}

impl Resources {
    fn step(&mut self, state: &mut RunState, policy: WritePolicy) -> Result<Step> {
        state.stopwatch.start();
        if !self.input.read_packet(&mut self.packet) {
            state.stopwatch.stop();
            return Ok(Step::EndOfInput);
        }
        if self.packet.stream() != self.input.stream_index() {
            packet::reset(&mut self.packet);
            state.stopwatch.stop();
            return Ok(Step::Skipped);
        }

        let sent = self.input.send_packet(&self.packet);
        packet::reset(&mut self.packet);
        sent?;

        if self.decode_pending(state, policy)? == 0 {
            let elapsed = state.stopwatch.stop();
            state.latency.record_noop();
            log::debug!(
                "decoder buffering, no frame ({:.3} ms)",
                elapsed.as_secs_f64() * 1000.0
            );
        }
        Ok(Step::Continue)
    }

    /// Encodes every frame the decoder can hand out right now.
    pub(crate) fn decode_pending(
        &mut self,
        state: &mut RunState,
        policy: WritePolicy,
    ) -> Result<usize> {
        let mut produced = 0;
        while self.input.receive_frame(&mut self.frame)? {
            produced += 1;
            state.frames_decoded += 1;
            if !state.stopwatch.is_running() {
                state.stopwatch.start();
            }
            self.encode_frame(state, policy)?;
            let ms = state.latency.record(state.stopwatch.stop());
            log::debug!("frame {} written in {:.3} ms", state.frames_encoded, ms);
        }
        Ok(produced)
    }

    fn encode_frame(&mut self, state: &mut RunState, policy: WritePolicy) -> Result<()> {
        let input_tb = self.input.time_base();
        let encoder_tb = self.output.encoder().time_base();

        frame::clear_picture_type(&mut self.frame);
        let pts = self.frame.pts().or_else(|| self.frame.timestamp());
        let corrected = state
            .pts
            .correct(timestamp::rescale(pts, input_tb, encoder_tb));
        if let Some(original) = corrected.replaced {
            log::warn!(
                "pts {:?} is not increasing, using {}",
                original,
                corrected.pts
            );
        }
        self.frame.set_pts(Some(corrected.pts));
        frame::rescale_frame_duration(&mut self.frame, input_tb, encoder_tb);

        let sent = self.output.send_frame(Some(&self.frame));
        frame::reset(&mut self.frame);
        sent?;
        state.frames_encoded += 1;

        self.drain_encoder(state, policy)
    }

    /// Writes every packet the encoder is willing to emit.
    pub(crate) fn drain_encoder(&mut self, state: &mut RunState, policy: WritePolicy) -> Result<()> {
        while self.output.receive_packet(&mut self.encoded)? {
            let written = self.output.write(&mut self.encoded);
            packet::reset(&mut self.encoded);
            match written {
                Ok(()) => state.packets_written += 1,
                Err(e) => {
                    state.write_failures += 1;
                    if e.is_fatal() || policy == WritePolicy::Abort {
                        return Err(e);
                    }
                    log::warn!("dropping packet: {}", e);
                }
            }
        }
        Ok(())
    }

    /// Submits end-of-stream to the decoder and encodes what it still holds.
    pub(crate) fn drain_decoder(&mut self, state: &mut RunState, policy: WritePolicy) -> Result<()> {
        self.input.send_eof()?;
        let drained = self.decode_pending(state, policy)?;
        if drained > 0 {
            log::info!("decoder drained: {} buffered frames", drained);
        }
        Ok(())
    }

    /// Submits end-of-stream to the encoder and writes the packets it flushes.
    pub(crate) fn flush_encoder(&mut self, state: &mut RunState, policy: WritePolicy) -> Result<()> {
        self.output.send_frame(None)?;
        self.drain_encoder(state, policy)
    }
}

/// Opens both pipelines, runs until end of input or stop, then shuts down.
///
/// Shutdown runs even when the loop fails; the loop's error wins over a
/// trailer error.
pub fn transcode(
    source: &str,
    dest: &str,
    config: &TranscodeConfig,
    state: &mut RunState,
) -> Result<TranscodeReport> {
    let mut transcoder = Transcoder::open(source, dest, config)?;
    let run = transcoder.run(state);
    let report = transcoder.shutdown(state);
    run?;
    report
}

#[cfg(test)]
#[path = "transcoder_test.rs"]
mod transcoder_test;
