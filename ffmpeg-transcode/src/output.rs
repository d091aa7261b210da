use std::ffi::CString;

use ffmpeg_next::{Packet, Rational, ffi, format};

use crate::error::{Result, TranscodeError, av_reason};

/// Destination container: format context, one video stream and its sink.
pub struct AvOutput {
    path: String,
    inner: format::context::Output,
    stream_index: Option<usize>,
    have_written_header: bool,
    have_written_trailer: bool,
    #[cfg(test)]
    rejected_writes: std::ops::Range<u64>,
    #[cfg(test)]
    write_attempts: u64,
}

impl AvOutput {
    /// Allocates a container for `path`, inferring the format from the
    /// extension and falling back to `fallback_format` when that fails.
    /// Nothing is written to disk yet.
    pub fn create(path: &str, fallback_format: &str) -> Result<Self> {
        let cpath =
            CString::new(path).map_err(|_| TranscodeError::InvalidArgument(path.to_string()))?;
        let cfallback = CString::new(fallback_format)
            .map_err(|_| TranscodeError::InvalidArgument(fallback_format.to_string()))?;

        let inner = unsafe {
            let mut ps = std::ptr::null_mut();
            ffi::avformat_alloc_output_context2(
                &mut ps,
                std::ptr::null_mut(),
                std::ptr::null(),
                cpath.as_ptr(),
            );
            if ps.is_null() {
                log::warn!(
                    "could not deduce output format from '{}', using {}",
                    path,
                    fallback_format
                );
                let ret = ffi::avformat_alloc_output_context2(
                    &mut ps,
                    std::ptr::null_mut(),
                    cfallback.as_ptr(),
                    cpath.as_ptr(),
                );
                if ps.is_null() {
                    return Err(TranscodeError::ContainerCreate {
                        path: path.to_string(),
                        reason: av_reason(ret),
                    });
                }
            }
            format::context::Output::wrap(ps)
        };

        Ok(Self {
            path: path.to_string(),
            inner,
            stream_index: None,
            have_written_header: false,
            have_written_trailer: false,
            #[cfg(test)]
            rejected_writes: 0..0,
            #[cfg(test)]
            write_attempts: 0,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn format_name(&self) -> &str {
        self.inner.format().name()
    }

    /// Adds the stream that carries the video track.
    pub fn add_video_stream(&mut self) -> Result<usize> {
        let stream = self
            .inner
            .add_stream(ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::None))
            .map_err(|e| TranscodeError::ContainerCreate {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        let index = stream.index();
        self.stream_index = Some(index);
        Ok(index)
    }

    pub fn stream_index(&self) -> Option<usize> {
        self.stream_index
    }

    fn stream_mut(&mut self) -> Result<format::stream::StreamMut<'_>> {
        let index = self.stream_index.ok_or_else(|| TranscodeError::ContainerCreate {
            path: self.path.clone(),
            reason: "no output stream".to_string(),
        })?;
        let path = self.path.clone();
        self.inner
            .stream_mut(index)
            .ok_or(TranscodeError::ContainerCreate {
                path,
                reason: format!("output stream {} not found", index),
            })
    }

    /// The container wants codec headers out of band (e.g. mp4, mkv).
    pub fn needs_global_header(&self) -> bool {
        self.inner
            .format()
            .flags()
            .contains(format::Flags::GLOBAL_HEADER)
    }

    pub fn set_stream_time_base(&mut self, time_base: Rational) -> Result<()> {
        self.stream_mut()?.set_time_base(time_base);
        Ok(())
    }

    pub fn set_stream_parameters(
        &mut self,
        encoder: &ffmpeg_next::codec::encoder::Video,
    ) -> Result<()> {
        self.stream_mut()?.set_parameters(encoder);
        Ok(())
    }

    /// Time-base of the output stream; the muxer may change it when the
    /// header is written.
    pub fn stream_time_base(&self) -> Option<Rational> {
        self.stream_index
            .and_then(|index| self.inner.stream(index))
            .map(|stream| stream.time_base())
    }

    /// Opens the sink (unless the format does its own I/O) and writes the header.
    pub fn open_for_write(&mut self) -> Result<()> {
        let no_file = self.inner.format().flags().contains(format::Flags::NO_FILE);
        if !no_file {
            let cpath = CString::new(self.path.as_str())
                .map_err(|_| TranscodeError::InvalidArgument(self.path.clone()))?;
            let ret = unsafe {
                let ctx = self.inner.as_mut_ptr();
                ffi::avio_open(&mut (*ctx).pb, cpath.as_ptr(), ffi::AVIO_FLAG_WRITE as i32)
            };
            if ret < 0 {
                return Err(TranscodeError::SinkOpen {
                    path: self.path.clone(),
                    reason: av_reason(ret),
                });
            }
        }

        self.inner
            .write_header()
            .map_err(|e| TranscodeError::HeaderWrite(e.to_string()))?;
        self.have_written_header = true;

        if let Some(index) = self.stream_index {
            if let Some(stream) = self.inner.stream(index) {
                let tb = stream.time_base();
                log::info!(
                    "output #0, {}, to '{}': stream #{} time_base {}/{}",
                    self.format_name(),
                    self.path,
                    index,
                    tb.numerator(),
                    tb.denominator()
                );
            }
        }
        Ok(())
    }

    /// Routes `packet` to the video stream, rescales pts, dts and duration
    /// from `time_base` to the stream's, and writes it interleaved.
    pub fn write_packet(&mut self, packet: &mut Packet, time_base: Rational) -> Result<()> {
        let Some(index) = self.stream_index else {
            return Err(TranscodeError::Write("stream not found".to_string()));
        };
        let Some(out_time_base) = self.stream_time_base() else {
            return Err(TranscodeError::Write("stream not found".to_string()));
        };
        if !self.have_written_header {
            return Err(TranscodeError::Write("header not written".to_string()));
        }
        #[cfg(test)]
        {
            let attempt = self.write_attempts;
            self.write_attempts += 1;
            if self.rejected_writes.contains(&attempt) {
                return Err(TranscodeError::Write(format!("write {} rejected", attempt)));
            }
        }

        packet.set_stream(index);
        packet.set_position(-1);
        packet.rescale_ts(time_base, out_time_base);
        log::debug!(
            "writing packet: pts {:?}, dts {:?}, duration {}, key {}",
            packet.pts(),
            packet.dts(),
            packet.duration(),
            packet.is_key()
        );
        packet
            .write_interleaved(&mut self.inner)
            .map_err(|e| TranscodeError::Write(e.to_string()))
    }

    pub fn header_written(&self) -> bool {
        self.have_written_header
    }

    pub fn trailer_written(&self) -> bool {
        self.have_written_trailer
    }

    /// Makes the write attempts numbered in `attempts` (0-based) fail.
    #[cfg(test)]
    pub(crate) fn reject_writes(&mut self, attempts: std::ops::Range<u64>) {
        self.rejected_writes = attempts;
    }

    /// Writes the trailer once; later calls do nothing.
    pub fn finish(&mut self) -> Result<()> {
        if self.have_written_header && !self.have_written_trailer {
            self.have_written_trailer = true;
            self.inner
                .write_trailer()
                .map_err(|e| TranscodeError::Trailer(e.to_string()))?;
            log::info!("trailer written: {}", self.path);
        }
        Ok(())
    }
}
