use std::ffi::CString;

use ffmpeg_next::{Dictionary, Packet, ffi, media};

use crate::{
    config::TranscodeConfig,
    error::{Result, TranscodeError, av_reason},
    stream::AvStream,
};

/// An opened source: demuxer context plus a snapshot of its streams.
pub struct AvInput {
    uri: String,
    inner: ffmpeg_next::format::context::Input,
    streams: Vec<AvStream>,
    decoders: Vec<Option<ffmpeg_next::Codec>>,
}

impl AvInput {
    /// Resolve input format by name (e.g. "lavfi", "v4l2") via FFmpeg's av_find_input_format.
    fn find_input_format(uri: &str, name: &str) -> Result<ffmpeg_next::format::format::Input> {
        let cname =
            CString::new(name).map_err(|_| TranscodeError::InvalidArgument(name.to_string()))?;
        let ptr = unsafe { ffi::av_find_input_format(cname.as_ptr()) };
        if ptr.is_null() {
            return Err(TranscodeError::Open {
                uri: uri.to_string(),
                reason: format!("input format not found: {}", name),
            });
        }
        Ok(unsafe { ffmpeg_next::format::format::Input::wrap(ptr as *mut _) })
    }

    pub fn is_rtsp(uri: &str) -> bool {
        let lower = uri.to_ascii_lowercase();
        lower.starts_with("rtsp://") || lower.starts_with("rtsps://")
    }

    /// Opens the source and reads enough of it to know its streams.
    ///
    /// RTSP sources are forced onto `config.rtsp_transport` (tcp by default).
    pub fn open(uri: &str, config: &TranscodeConfig) -> Result<Self> {
        let curi = CString::new(uri).map_err(|_| TranscodeError::InvalidArgument(uri.to_string()))?;
        let format = match config.input_format.as_deref() {
            Some(name) => Some(Self::find_input_format(uri, name)?),
            None => None,
        };

        let mut options = Dictionary::new();
        if Self::is_rtsp(uri) {
            log::info!("forcing rtsp transport: {}", config.rtsp_transport);
            options.set("rtsp_transport", &config.rtsp_transport);
        }

        let mut inner = unsafe {
            let mut ps = std::ptr::null_mut();
            let fmt = format
                .as_ref()
                .map(|f| f.as_ptr())
                .unwrap_or(std::ptr::null());
            let mut opts = options.disown();
            let ret = ffi::avformat_open_input(&mut ps, curi.as_ptr(), fmt as _, &mut opts);
            Dictionary::own(opts);
            if ret < 0 {
                return Err(TranscodeError::Open {
                    uri: uri.to_string(),
                    reason: av_reason(ret),
                });
            }

            let ret = ffi::avformat_find_stream_info(ps, std::ptr::null_mut());
            if ret < 0 {
                ffi::avformat_close_input(&mut ps);
                return Err(TranscodeError::Probe {
                    uri: uri.to_string(),
                    reason: av_reason(ret),
                });
            }
            ffmpeg_next::format::context::Input::wrap(ps)
        };

        let ctx = unsafe { inner.as_mut_ptr() };
        let mut streams = Vec::with_capacity(inner.nb_streams() as usize);
        for stream in inner.streams() {
            let guessed = unsafe {
                ffi::av_guess_frame_rate(ctx, stream.as_ptr() as *mut _, std::ptr::null_mut())
            };
            streams.push(AvStream::from(stream).with_guessed_rate(guessed.into()));
        }

        log::info!("input #0, {}, from '{}':", inner.format().name(), uri);
        for stream in &streams {
            log::info!("  {}", stream);
        }

        let decoders = vec![None; streams.len()];
        Ok(Self {
            uri: uri.to_string(),
            inner,
            streams,
            decoders,
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn streams(&self) -> &[AvStream] {
        &self.streams
    }

    pub fn stream(&self, index: usize) -> Option<&AvStream> {
        self.streams.get(index)
    }

    /// Scans streams in declaration order and returns the first video stream.
    ///
    /// Every scanned stream gets its decoder resolved by codec id on the way.
    pub fn select_video_stream(&mut self) -> Result<usize> {
        let index = first_video(self.streams.iter().map(|s| s.medium())).ok_or_else(|| {
            TranscodeError::NoVideoStream {
                uri: self.uri.clone(),
            }
        })?;
        for (slot, stream) in self.decoders.iter_mut().zip(&self.streams).take(index + 1) {
            *slot = ffmpeg_next::decoder::find(stream.codec_id());
        }
        log::info!("selected video stream: {}", self.streams[index]);
        Ok(index)
    }

    /// Decoder resolved for `index` by [`AvInput::select_video_stream`].
    pub fn decoder_for(&self, index: usize) -> Option<ffmpeg_next::Codec> {
        self.decoders.get(index).cloned().flatten()
    }

    /// Reads the next packet into `packet`. Returns false at end of input;
    /// read failures are treated the same way.
    pub fn read_packet(&mut self, packet: &mut Packet) -> bool {
        match packet.read(&mut self.inner) {
            Ok(()) => true,
            Err(ffmpeg_next::Error::Eof) => {
                log::info!("end of input stream: {}", self.uri);
                false
            }
            Err(e) => {
                log::warn!("read from {} failed, treating as end of stream: {}", self.uri, e);
                false
            }
        }
    }
}

/// Position of the first video entry in `kinds`.
pub fn first_video(kinds: impl IntoIterator<Item = media::Type>) -> Option<usize> {
    kinds.into_iter().position(|m| m == media::Type::Video)
}
