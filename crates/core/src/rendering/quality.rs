//! Render quality presets.
//!
//! The rendering tool picks its output sub-directory from the quality
//! flag it was invoked with, so the flag and the profile directory are
//! derived from the same preset and can never drift apart.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Quality preset passed to the rendering tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderQuality {
    Low,
    #[default]
    Medium,
    High,
    Production,
    FourK,
}

/// Accepted names, in ascending quality order.
pub const QUALITY_NAMES: &[&str] = &["low", "medium", "high", "production", "fourk"];

impl RenderQuality {
    /// Command-line flag selecting this preset.
    pub fn flag(self) -> &'static str {
        match self {
            Self::Low => "-ql",
            Self::Medium => "-qm",
            Self::High => "-qh",
            Self::Production => "-qp",
            Self::FourK => "-qk",
        }
    }

    /// Name of the directory the tool writes videos into for this preset.
    pub fn profile_dir(self) -> &'static str {
        match self {
            Self::Low => "480p15",
            Self::Medium => "720p30",
            Self::High => "1080p60",
            Self::Production => "1440p60",
            Self::FourK => "2160p60",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Production => "production",
            Self::FourK => "fourk",
        }
    }
}

impl fmt::Display for RenderQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RenderQuality {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "production" => Ok(Self::Production),
            "fourk" | "4k" => Ok(Self::FourK),
            other => Err(CoreError::Validation(format!(
                "Unknown render quality '{other}'. Must be one of: {QUALITY_NAMES:?}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
