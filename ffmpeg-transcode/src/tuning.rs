//! Codec-family tuning profiles.
//!
//! Each encoder family maps to one profile: fixed GOP, scene-cut detection,
//! quality factor, tune and preset. Families without a profile are opened
//! with the encoder's own defaults.

use ffmpeg_next::{Dictionary, codec};

use crate::config::TranscodeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecFamily {
    H264,
    H265,
    Other,
}

impl CodecFamily {
    pub fn from_id(id: codec::Id) -> Self {
        match id {
            codec::Id::H264 => CodecFamily::H264,
            codec::Id::HEVC => CodecFamily::H265,
            _ => CodecFamily::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuningProfile {
    /// Private option carrying the encoder-library parameter string.
    pub params_key: &'static str,
    pub keyframe_interval: u32,
    pub scene_cut: bool,
    // 0-51, lower = higher quality / larger output
    pub crf: u8,
    pub tune: &'static str,
    pub preset: &'static str,
}

const TUNING_TABLE: &[(CodecFamily, TuningProfile)] = &[
    (
        CodecFamily::H265,
        TuningProfile {
            params_key: "x265-params",
            keyframe_interval: 60,
            scene_cut: false,
            crf: 28,
            tune: "zerolatency",
            preset: "veryfast",
        },
    ),
    (
        CodecFamily::H264,
        TuningProfile {
            params_key: "x264-params",
            keyframe_interval: 60,
            scene_cut: false,
            crf: 23,
            tune: "zerolatency",
            preset: "veryfast",
        },
    ),
];

pub fn profile_for(family: CodecFamily) -> Option<&'static TuningProfile> {
    TUNING_TABLE
        .iter()
        .find(|(f, _)| *f == family)
        .map(|(_, profile)| profile)
}

/// Encoder options resolved from a profile and the run's overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTuning {
    pub gop: Option<u32>,
    pub options: Vec<(String, String)>,
}

impl ResolvedTuning {
    pub fn resolve(family: CodecFamily, config: &TranscodeConfig) -> Self {
        let Some(profile) = profile_for(family) else {
            return Self {
                gop: config.keyframe_interval,
                options: Vec::new(),
            };
        };

        let keyint = config
            .keyframe_interval
            .unwrap_or(profile.keyframe_interval);
        let mut params = format!("keyint={}:min-keyint={}", keyint, keyint);
        if !profile.scene_cut {
            params.push_str(":scenecut=0");
        }

        let crf = config.crf.unwrap_or(profile.crf).min(51);
        let tune = config.tune.as_deref().unwrap_or(profile.tune);
        let preset = config.preset.as_deref().unwrap_or(profile.preset);

        Self {
            gop: Some(keyint),
            options: vec![
                (profile.params_key.to_string(), params),
                ("crf".to_string(), crf.to_string()),
                ("tune".to_string(), tune.to_string()),
                ("preset".to_string(), preset.to_string()),
            ],
        }
    }

    pub fn to_dictionary(&self) -> Dictionary<'static> {
        let mut dict = Dictionary::new();
        for (key, value) in &self.options {
            dict.set(key, value);
        }
        dict
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}
