use ffmpeg_next::Rational;

use crate::{
    error::{Result, TranscodeError},
    state::RunState,
    transcoder::{EndReason, Resources, Transcoder},
};

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct TranscodeReport {
    pub frames_decoded: u64,
    /// Frames submitted to the encoder.
    pub frames_encoded: u64,
    /// Packets accepted by the muxer, flush included.
    pub packets_written: u64,
    pub write_failures: u64,
    pub pts_corrections: u64,
    /// `None` when fewer than two frames were encoded.
    pub average_latency_ms: Option<f64>,
    pub stop_requested: bool,
    pub end: Option<EndReason>,
    /// False after a failed run.
    pub decoder_drained: bool,
    /// False after a run that failed before encoding anything.
    pub encoder_flushed: bool,
    pub trailer_written: bool,
    pub encoder_time_base: Rational,
    pub output_time_base: Option<Rational>,
    pub width: u32,
    pub height: u32,
}

impl Transcoder {
    /// Drains the decoder, flushes the encoder, writes the trailer and
    /// releases every resource.
    ///
    /// Safe to call more than once; later calls return the first report.
    /// A failed run skips the decoder drain, and skips the encoder flush if
    /// nothing was encoded before the failure.
    pub fn shutdown(&mut self, state: &mut RunState) -> Result<TranscodeReport> {
        let Some(mut resources) = self.resources.take() else {
            return self.report.clone().ok_or(TranscodeError::Released);
        };
        let policy = self.write_policy;

        let decoder_drained = !self.failed;
        if decoder_drained {
            if let Err(e) = resources.drain_decoder(state, policy) {
                log::error!("decoder drain failed: {}", e);
            }
        }
        let encoder_flushed = !self.failed || state.frames_encoded > 0;
        if encoder_flushed {
            if let Err(e) = resources.flush_encoder(state, policy) {
                log::error!("encoder flush failed: {}", e);
            }
        }
        let trailer = resources.output.finish();

        let encoder = resources.output.encoder();
        let report = TranscodeReport {
            frames_decoded: state.frames_decoded,
            frames_encoded: state.frames_encoded,
            packets_written: state.packets_written,
            write_failures: state.write_failures,
            pts_corrections: state.pts.corrections(),
            average_latency_ms: state.latency.average_ms(state.frames_encoded),
            stop_requested: state.stop_requested(),
            end: self.end,
            decoder_drained,
            encoder_flushed,
            trailer_written: trailer.is_ok(),
            encoder_time_base: encoder.time_base(),
            output_time_base: resources.output.stream_time_base(),
            width: encoder.width(),
            height: encoder.height(),
        };

        release(resources);

        match report.average_latency_ms {
            Some(avg) => log::info!(
                "{} frames encoded, {} packets written, average write latency {:.3} ms",
                report.frames_encoded,
                report.packets_written,
                avg
            ),
            None => log::info!(
                "{} frames encoded, {} packets written, average write latency n/a",
                report.frames_encoded,
                report.packets_written
            ),
        }
        if report.write_failures > 0 {
            log::warn!("{} packets dropped on write", report.write_failures);
        }

        self.report = Some(report.clone());
        trailer?;
        Ok(report)
    }
}

/// Encoder, decoder, frame, packets, then the demuxer and muxer.
fn release(resources: Resources) {
    let Resources {
        output,
        input,
        frame,
        packet,
        encoded,
    } = resources;
    let (encoder, muxer) = output.into_parts();
    let (decoder, demuxer) = input.into_parts();
    drop(encoder);
    drop(decoder);
    drop(frame);
    drop(packet);
    drop(encoded);
    drop(demuxer);
    drop(muxer);
    log::debug!("transcode resources released");
}
