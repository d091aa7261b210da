//! ffprobe-like summary of a written container.

use std::fmt;

use ffmpeg_next::Packet;

use crate::{packet::PacketTiming, stream::AvStream};

#[derive(Debug, Clone)]
pub struct FormatInfo {
    /// e.g. "mov,mp4,m4a,3gp,3g2,mj2"
    pub format_name: String,
    /// None if unknown (e.g. raw h264).
    pub duration_sec: Option<f64>,
    pub bit_rate: i64,
    pub nb_streams: u32,
}

#[derive(Debug, Clone)]
pub struct StreamInfo {
    pub index: usize,
    /// "video" | "audio" | "subtitle" etc.
    pub codec_type: String,
    pub codec_name: String,
    pub time_base: String,
    /// In time_base units; None if unknown.
    pub duration_ts: Option<i64>,
    pub frames: Option<i64>,
    pub rate: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct MediaInfo {
    pub format: FormatInfo,
    pub streams: Vec<StreamInfo>,
}

impl MediaInfo {
    pub fn video_streams(&self) -> impl Iterator<Item = &StreamInfo> {
        self.streams.iter().filter(|s| s.codec_type == "video")
    }
}

impl fmt::Display for MediaInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format.format_name)?;
        match self.format.duration_sec {
            Some(d) => write!(f, ", duration {:.3}s", d)?,
            None => write!(f, ", duration N/A")?,
        }
        write!(f, ", bitrate {} b/s", self.format.bit_rate)?;
        for s in &self.streams {
            write!(
                f,
                "\n  stream #{}: {} {}, time_base {}, rate {}",
                s.index, s.codec_type, s.codec_name, s.time_base, s.rate
            )?;
            if let (Some(w), Some(h)) = (s.width, s.height) {
                write!(f, ", {}x{}", w, h)?;
            }
            if let Some(n) = s.frames {
                write!(f, ", {} frames", n)?;
            }
        }
        Ok(())
    }
}

fn known(value: i64) -> Option<i64> {
    if value == ffmpeg_next::ffi::AV_NOPTS_VALUE as i64 || value <= 0 {
        None
    } else {
        Some(value)
    }
}

/// Opens a container and describes its format and streams.
pub fn probe(path: &str) -> anyhow::Result<MediaInfo> {
    let input = ffmpeg_next::format::input(path)?;

    let nb_streams = input.nb_streams();
    // duration is in AV_TIME_BASE (microsecond) units
    let duration_sec = known(input.duration()).map(|d| d as f64 / 1_000_000.0);

    let mut streams = Vec::with_capacity(nb_streams as usize);
    for stream in input.streams() {
        let duration_ts = known(stream.duration());
        let frames = known(stream.frames());
        let av_stream = AvStream::from(stream);
        let time_base = av_stream.time_base();
        let rate = av_stream.rate();
        let (width, height) = if av_stream.is_video() {
            (Some(av_stream.width()), Some(av_stream.height()))
        } else {
            (None, None)
        };

        streams.push(StreamInfo {
            index: av_stream.index(),
            codec_type: format!("{:?}", av_stream.medium()).to_lowercase(),
            codec_name: format!("{:?}", av_stream.codec_id()).to_lowercase(),
            time_base: format!("{}/{}", time_base.numerator(), time_base.denominator()),
            duration_ts,
            frames,
            rate: format!("{}/{}", rate.numerator(), rate.denominator()),
            width,
            height,
        });
    }

    Ok(MediaInfo {
        format: FormatInfo {
            format_name: input.format().name().to_string(),
            duration_sec,
            bit_rate: input.bit_rate(),
            nb_streams,
        },
        streams,
    })
}

/// Timing of every packet of the first video stream, in file order.
pub fn read_video_packets(path: &str) -> anyhow::Result<Vec<PacketTiming>> {
    let mut input = ffmpeg_next::format::input(path)?;
    let index = input
        .streams()
        .best(ffmpeg_next::media::Type::Video)
        .map(|s| s.index())
        .ok_or_else(|| anyhow::anyhow!("no video stream in {}", path))?;

    let mut timings = Vec::new();
    let mut packet = Packet::empty();
    loop {
        match packet.read(&mut input) {
            Ok(()) => {
                if packet.stream() == index {
                    timings.push(PacketTiming::from(&packet));
                }
            }
            Err(ffmpeg_next::Error::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(timings)
}

/// Number of packets in the first video stream.
pub fn count_video_packets(path: &str) -> anyhow::Result<usize> {
    Ok(read_video_packets(path)?.len())
}
