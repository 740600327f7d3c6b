//! Named streaming resolution caps.

use super::StreamError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum output resolution for a transcoded stream, named by the shorter
/// frame dimension it caps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamingResolution {
    Low,
    Standard,
    StandardHd,
    FullHd,
    FourK,
    /// No cap, keep the source resolution.
    #[default]
    Original,
}

impl StreamingResolution {
    pub const ALL: [StreamingResolution; 6] = [
        StreamingResolution::Low,
        StreamingResolution::Standard,
        StreamingResolution::StandardHd,
        StreamingResolution::FullHd,
        StreamingResolution::FourK,
        StreamingResolution::Original,
    ];

    /// Cap on the shorter frame dimension, 0 for no cap.
    pub fn max_resolution(&self) -> u32 {
        match self {
            StreamingResolution::Low => 240,
            StreamingResolution::Standard => 480,
            StreamingResolution::StandardHd => 720,
            StreamingResolution::FullHd => 1080,
            StreamingResolution::FourK => 2160,
            StreamingResolution::Original => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamingResolution::Low => "LOW",
            StreamingResolution::Standard => "STANDARD",
            StreamingResolution::StandardHd => "STANDARD_HD",
            StreamingResolution::FullHd => "FULL_HD",
            StreamingResolution::FourK => "FOUR_K",
            StreamingResolution::Original => "ORIGINAL",
        }
    }
}

impl fmt::Display for StreamingResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamingResolution {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| StreamError::InvalidResolution(s.to_string()))
    }
}
