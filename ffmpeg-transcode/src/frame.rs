//! Helpers for the decoded-picture buffer reused across loop iterations.

use ffmpeg_next::{Rational, frame, picture};

use crate::timestamp::rescale_duration;

/// Drops the picture type set by the decoder so the encoder picks its own.
pub fn clear_picture_type(frame: &mut frame::Video) {
    frame.set_kind(picture::Type::None);
}

/// Releases the frame's data references, keeping the buffer for reuse.
pub fn reset(frame: &mut frame::Video) {
    unsafe { ffmpeg_next::ffi::av_frame_unref(frame.as_mut_ptr()) };
}

pub fn duration(frame: &frame::Video) -> i64 {
    unsafe { (*frame.as_ptr()).duration }
}

/// Moves the frame's duration from one time-base to another.
pub fn rescale_frame_duration(frame: &mut frame::Video, from: Rational, to: Rational) {
    let rescaled = rescale_duration(duration(frame), from, to);
    unsafe { (*frame.as_mut_ptr()).duration = rescaled };
}
