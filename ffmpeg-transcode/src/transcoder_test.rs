use std::path::Path;

use ffmpeg_next::Rational;

use crate::config::{TranscodeConfig, WritePolicy};
use crate::error::TranscodeError;
use crate::metadata::{count_video_packets, probe, read_video_packets};
use crate::pipeline::InputPipeline;
use crate::state::RunState;
use crate::transcoder::{EndReason, Step, Transcoder, transcode};
use crate::tuning::CodecFamily;

fn lavfi(codec: &str) -> TranscodeConfig {
    TranscodeConfig::builder()
        .codec(codec)
        .input_format(Some("lavfi".to_string()))
        .build()
}

/// Fresh path under the temp dir; removes leftovers from earlier runs.
fn temp_output(name: &str) -> String {
    let path = std::env::temp_dir().join(format!(
        "ffmpeg-transcode-{}-{}",
        std::process::id(),
        name
    ));
    if path.exists() {
        std::fs::remove_file(&path).unwrap();
    }
    path.to_string_lossy().into_owned()
}

fn has_encoder(name: &str) -> bool {
    if ffmpeg_next::encoder::find_by_name(name).is_none() {
        eprintln!("skip: encoder {} not available", name);
        return false;
    }
    true
}

/// 10 frames at 25 fps.
const RED_10: &str = "color=c=red:s=320x240:r=25:d=0.4";

#[test]
fn test_ten_frames_h264() -> anyhow::Result<()> {
    crate::init()?;
    if !has_encoder("libx264") {
        return Ok(());
    }
    let out = temp_output("ten.mp4");
    let mut state = RunState::default();

    let report = transcode(RED_10, &out, &lavfi("libx264"), &mut state)?;

    assert_eq!(report.frames_decoded, 10);
    assert_eq!(report.frames_encoded, 10);
    assert_eq!(report.packets_written, 10);
    assert_eq!(report.write_failures, 0);
    assert_eq!(report.encoder_time_base, Rational(1, 25));
    assert_eq!(report.end, Some(EndReason::EndOfInput));
    assert!(!report.stop_requested);
    assert!(report.average_latency_ms.is_some());

    let info = probe(&out)?;
    assert_eq!(info.streams.len(), 1);
    let video = info.video_streams().next().expect("video stream");
    assert_eq!(video.codec_name, "h264");
    assert_eq!(video.width, Some(320));
    assert_eq!(video.height, Some(240));
    assert_eq!(count_video_packets(&out)?, 10);

    let timings = read_video_packets(&out)?;
    assert!(timings[0].is_key);

    std::fs::remove_file(&out)?;
    Ok(())
}

#[test]
fn test_stop_after_three_frames() -> anyhow::Result<()> {
    crate::init()?;
    if !has_encoder("libx264") {
        return Ok(());
    }
    let out = temp_output("stopped.mp4");
    let mut state = RunState::default();
    let stop = state.stop_handle();

    let mut transcoder = Transcoder::open(RED_10, &out, &lavfi("libx264"))?;
    while state.frames_decoded() < 3 {
        assert_ne!(transcoder.step(&mut state)?, Step::EndOfInput);
    }
    stop.cancel();
    assert_eq!(transcoder.run(&mut state)?, EndReason::StopRequested);
    let report = transcoder.shutdown(&mut state)?;

    assert!(report.stop_requested);
    assert_eq!(report.end, Some(EndReason::StopRequested));
    assert_eq!(report.frames_encoded, 3);
    assert_eq!(report.packets_written, 3);
    // probing only succeeds with the trailer (moov) in place
    assert_eq!(count_video_packets(&out)?, 3);

    std::fs::remove_file(&out)?;
    Ok(())
}

#[test]
fn test_single_frame_source() -> anyhow::Result<()> {
    crate::init()?;
    if !has_encoder("libx264") {
        return Ok(());
    }
    let out = temp_output("single.mkv");
    let mut state = RunState::default();

    let report = transcode(
        "color=c=blue:s=64x48:r=25:d=0.04",
        &out,
        &lavfi("libx264"),
        &mut state,
    )?;

    assert_eq!(report.frames_encoded, 1);
    assert_eq!(report.packets_written, 1);
    assert_eq!(report.average_latency_ms, None);
    assert_eq!(probe(&out)?.format.format_name, "matroska,webm");
    assert_eq!(count_video_packets(&out)?, 1);

    std::fs::remove_file(&out)?;
    Ok(())
}

#[test]
fn test_output_pts_non_decreasing() -> anyhow::Result<()> {
    crate::init()?;
    if !has_encoder("libx264") {
        return Ok(());
    }
    // testsrc is rgb24, so every frame goes through the scaler
    let out = temp_output("pattern.mp4");
    let mut state = RunState::default();

    let report = transcode(
        "testsrc=s=160x120:r=25:d=1",
        &out,
        &lavfi("libx264"),
        &mut state,
    )?;
    assert_eq!(report.packets_written, 25);
    assert_eq!(report.pts_corrections, 0);

    let timings = read_video_packets(&out)?;
    assert_eq!(timings.len(), 25);
    for pair in timings.windows(2) {
        assert!(
            pair[1].pts >= pair[0].pts,
            "pts went backwards: {:?} -> {:?}",
            pair[0],
            pair[1]
        );
    }

    std::fs::remove_file(&out)?;
    Ok(())
}

#[test]
fn test_ten_frames_h265() -> anyhow::Result<()> {
    crate::init()?;
    if !has_encoder("libx265") {
        return Ok(());
    }
    let out = temp_output("ten-hevc.mkv");
    let mut state = RunState::default();

    let mut transcoder = Transcoder::open(RED_10, &out, &lavfi("libx265"))?;
    if let Some(resources) = &transcoder.resources {
        assert_eq!(resources.output.encoder().family(), CodecFamily::H265);
    }
    transcoder.run(&mut state)?;
    let report = transcoder.shutdown(&mut state)?;

    assert_eq!(report.packets_written, 10);
    assert_eq!(report.encoder_time_base, Rational(1, 25));
    assert_eq!(count_video_packets(&out)?, 10);

    std::fs::remove_file(&out)?;
    Ok(())
}

#[test]
fn test_audio_only_source_has_no_video() -> anyhow::Result<()> {
    crate::init()?;
    let out = temp_output("audio-only.mp4");
    let mut state = RunState::default();

    let err = transcode("anullsrc=d=0.2", &out, &lavfi("libx264"), &mut state)
        .err()
        .expect("transcode should fail");
    assert!(matches!(err, TranscodeError::NoVideoStream { .. }), "{:?}", err);
    assert!(!Path::new(&out).exists());
    Ok(())
}

#[test]
fn test_selects_first_video_stream() -> anyhow::Result<()> {
    crate::init()?;
    let graph = "anullsrc=d=0.2 [out0]; testsrc=d=0.2:s=160x120 [out1]";

    let input = InputPipeline::open(graph, &lavfi("libx264"))?;
    assert_eq!(input.stream_index(), 1);
    let source = input.source_video();
    assert_eq!((source.width, source.height), (160, 120));
    assert_eq!(source.frame_rate, Rational(25, 1));
    Ok(())
}

#[test]
fn test_other_streams_are_skipped() -> anyhow::Result<()> {
    crate::init()?;
    if !has_encoder("libx264") {
        return Ok(());
    }
    let graph = "anullsrc=d=0.2 [out0]; testsrc=d=0.2:s=160x120 [out1]";
    let out = temp_output("mixed.mp4");
    let mut state = RunState::default();

    let mut transcoder = Transcoder::open(graph, &out, &lavfi("libx264"))?;
    let mut skipped = 0;
    loop {
        match transcoder.step(&mut state)? {
            Step::Skipped => skipped += 1,
            Step::Continue => {}
            Step::EndOfInput => break,
        }
    }
    let report = transcoder.shutdown(&mut state)?;

    assert!(skipped > 0);
    assert_eq!(report.packets_written, 5);
    let info = probe(&out)?;
    assert_eq!(info.streams.len(), 1);
    assert_eq!(info.streams[0].codec_type, "video");

    std::fs::remove_file(&out)?;
    Ok(())
}

#[test]
fn test_unreachable_source_creates_no_output() -> anyhow::Result<()> {
    crate::init()?;
    let out = temp_output("never.mp4");
    let mut state = RunState::default();

    let err = transcode(
        "/nonexistent/dir/input.mp4",
        &out,
        &TranscodeConfig::default(),
        &mut state,
    )
    .err()
    .expect("transcode should fail");
    assert!(matches!(err, TranscodeError::Open { .. }), "{:?}", err);
    assert!(!Path::new(&out).exists());
    Ok(())
}

#[test]
fn test_unknown_encoder() -> anyhow::Result<()> {
    crate::init()?;
    let out = temp_output("no-encoder.mp4");

    let err = Transcoder::open(RED_10, &out, &lavfi("no-such-encoder"))
        .err()
        .expect("open should fail");
    assert!(matches!(err, TranscodeError::EncoderNotFound(_)), "{:?}", err);
    Ok(())
}

#[test]
fn test_shutdown_twice() -> anyhow::Result<()> {
    crate::init()?;
    if !has_encoder("libx264") {
        return Ok(());
    }
    let out = temp_output("twice.mp4");
    let mut state = RunState::default();

    let mut transcoder = Transcoder::open(RED_10, &out, &lavfi("libx264"))?;
    transcoder.run(&mut state)?;
    let first = transcoder.shutdown(&mut state)?;
    assert!(transcoder.is_closed());
    let second = transcoder.shutdown(&mut state)?;

    assert_eq!(first.packets_written, second.packets_written);
    assert_eq!(first.frames_encoded, second.frames_encoded);
    assert_eq!(transcoder.step(&mut state)?, Step::EndOfInput);

    std::fs::remove_file(&out)?;
    Ok(())
}

fn reject_writes(transcoder: &mut Transcoder, attempts: std::ops::Range<u64>) {
    transcoder
        .resources
        .as_mut()
        .expect("transcoder is open")
        .output
        .output_mut()
        .reject_writes(attempts);
}

#[test]
fn test_rejected_writes_are_logged_and_skipped() -> anyhow::Result<()> {
    crate::init()?;
    if !has_encoder("libx264") {
        return Ok(());
    }
    let out = temp_output("rejected.mp4");
    let mut state = RunState::default();

    let mut transcoder = Transcoder::open(RED_10, &out, &lavfi("libx264"))?;
    reject_writes(&mut transcoder, 0..2);
    assert_eq!(transcoder.run(&mut state)?, EndReason::EndOfInput);
    assert!(!transcoder.is_failed());
    let report = transcoder.shutdown(&mut state)?;

    assert_eq!(report.frames_encoded, 10);
    assert_eq!(report.write_failures, 2);
    assert_eq!(report.packets_written, 8);
    assert!(report.decoder_drained);
    assert!(report.trailer_written);
    assert_eq!(count_video_packets(&out)?, 8);

    std::fs::remove_file(&out)?;
    Ok(())
}

#[test]
fn test_rejected_write_aborts_under_strict_policy() -> anyhow::Result<()> {
    crate::init()?;
    if !has_encoder("libx264") {
        return Ok(());
    }
    let out = temp_output("aborted.mp4");
    let mut state = RunState::default();
    let config = TranscodeConfig::builder()
        .input_format(Some("lavfi".to_string()))
        .write_policy(WritePolicy::Abort)
        .build();

    let mut transcoder = Transcoder::open(RED_10, &out, &config)?;
    reject_writes(&mut transcoder, 3..4);
    let err = transcoder.run(&mut state).err().expect("run should fail");
    assert!(matches!(err, TranscodeError::Write(_)), "{:?}", err);
    assert!(transcoder.is_failed());

    let report = transcoder.shutdown(&mut state)?;
    assert_eq!(report.frames_encoded, 4);
    assert_eq!(report.packets_written, 3);
    assert_eq!(report.write_failures, 1);
    assert!(!report.decoder_drained);
    assert!(report.encoder_flushed);
    assert!(report.trailer_written);
    assert_eq!(count_video_packets(&out)?, 3);

    std::fs::remove_file(&out)?;
    Ok(())
}

#[test]
fn test_failure_before_first_frame_skips_flush() -> anyhow::Result<()> {
    crate::init()?;
    if !has_encoder("libx264") {
        return Ok(());
    }
    let out = temp_output("failed-early.mkv");
    let mut state = RunState::default();

    let mut transcoder = Transcoder::open(RED_10, &out, &lavfi("libx264"))?;
    transcoder.failed = true;
    let report = transcoder.shutdown(&mut state)?;

    assert_eq!(report.frames_decoded, 0);
    assert_eq!(report.frames_encoded, 0);
    assert!(!report.decoder_drained);
    assert!(!report.encoder_flushed);
    assert!(report.trailer_written);
    assert_eq!(count_video_packets(&out)?, 0);

    std::fs::remove_file(&out)?;
    Ok(())
}

#[test]
fn test_jittered_pts_are_corrected() -> anyhow::Result<()> {
    crate::init()?;
    if !has_encoder("libx264") {
        return Ok(());
    }
    // frame 5 is stamped two ticks back, behind frame 4
    let graph = "testsrc=s=160x120:r=25:d=1,setpts='if(eq(N,5),PTS-2,PTS)'";
    let out = temp_output("jitter.mp4");
    let mut state = RunState::default();

    let report = transcode(graph, &out, &lavfi("libx264"), &mut state)?;
    assert!(report.pts_corrections > 0);
    assert_eq!(report.packets_written, 25);

    let timings = read_video_packets(&out)?;
    assert_eq!(timings.len(), 25);
    for pair in timings.windows(2) {
        assert!(
            pair[1].pts >= pair[0].pts,
            "pts went backwards: {:?} -> {:?}",
            pair[0],
            pair[1]
        );
    }

    std::fs::remove_file(&out)?;
    Ok(())
}

#[test]
fn test_shutdown_without_resources() -> anyhow::Result<()> {
    crate::init()?;
    if !has_encoder("libx264") {
        return Ok(());
    }
    let out = temp_output("released.mp4");
    let mut state = RunState::default();

    let mut transcoder = Transcoder::open(RED_10, &out, &lavfi("libx264"))?;
    drop(transcoder.resources.take());
    let err = transcoder.shutdown(&mut state).err().expect("shutdown should fail");
    assert!(matches!(err, TranscodeError::Released), "{:?}", err);

    let _ = std::fs::remove_file(&out);
    Ok(())
}
