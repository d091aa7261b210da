//! Time-base rescaling and pts correction.

use ffmpeg_next::Rational;
use ffmpeg_next::util::mathematics::rescale::Rescale;

/// Rescale a timestamp between time-bases, passing unset values through.
pub fn rescale(value: Option<i64>, from: Rational, to: Rational) -> Option<i64> {
    value.map(|v| v.rescale(from, to))
}

/// Rescale a duration; zero stays zero.
pub fn rescale_duration(duration: i64, from: Rational, to: Rational) -> i64 {
    if duration <= 0 {
        return 0;
    }
    duration.rescale(from, to)
}

/// Keeps timestamps fed to the encoder strictly increasing.
///
/// A missing pts, or one that does not move past the last accepted value,
/// is replaced with `last + 1`.
#[derive(Debug, Default, Clone)]
pub struct PtsCorrector {
    last: Option<i64>,
    corrections: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Corrected {
    pub pts: i64,
    /// The value that was replaced, if any.
    pub replaced: Option<Option<i64>>,
}

impl PtsCorrector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn correct(&mut self, pts: Option<i64>) -> Corrected {
        let next = match (pts, self.last) {
            (Some(pts), Some(last)) if pts > last => Corrected {
                pts,
                replaced: None,
            },
            (Some(pts), None) => Corrected {
                pts,
                replaced: None,
            },
            (original, last) => {
                self.corrections += 1;
                Corrected {
                    pts: last.map(|l| l + 1).unwrap_or(0),
                    replaced: Some(original),
                }
            }
        };
        self.last = Some(next.pts);
        next
    }

    pub fn last(&self) -> Option<i64> {
        self.last
    }

    pub fn corrections(&self) -> u64 {
        self.corrections
    }
}
