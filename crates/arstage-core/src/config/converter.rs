//! GLB to USDZ converter configuration.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Configuration for the model converter.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ConverterConfig {
    /// GLB input file.
    pub input: PathBuf,
    /// USDZ output file.
    pub output: PathBuf,
    /// Largest texture edge in pixels; bigger textures are downscaled.
    #[validate(range(min = 16, max = 16384))]
    pub max_texture_size: u32,
    /// Quick Look anchoring type written into the root layer.
    pub anchoring: Anchoring,
    /// Plane alignment used when anchoring to a plane.
    pub plane_alignment: PlaneAlignment,
    /// Per-image decode timeout in seconds.
    #[validate(range(min = 1, max = 600))]
    pub decode_timeout_seconds: u64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("public/assets/models/CSE-front-ar-ios-safe.glb"),
            output: PathBuf::from("public/assets/models/CSE-front-ar.usdz"),
            max_texture_size: 1024,
            anchoring: Anchoring::default(),
            plane_alignment: PlaneAlignment::default(),
            decode_timeout_seconds: 30,
        }
    }
}

/// AR Quick Look anchoring type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchoring {
    /// Anchor to a detected plane.
    #[default]
    Plane,
    /// Anchor to a reference image.
    Image,
    /// Anchor to a face.
    Face,
    /// Leave anchoring to the viewer.
    None,
}

impl fmt::Display for Anchoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plane => write!(f, "plane"),
            Self::Image => write!(f, "image"),
            Self::Face => write!(f, "face"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Plane alignment for plane anchoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaneAlignment {
    /// Floors and tables.
    #[default]
    Horizontal,
    /// Walls.
    Vertical,
    /// Either.
    Any,
}

impl fmt::Display for PlaneAlignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Horizontal => write!(f, "horizontal"),
            Self::Vertical => write!(f, "vertical"),
            Self::Any => write!(f, "any"),
        }
    }
}
