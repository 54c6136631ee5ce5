use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Every fine-tune dial on the camera accepts this closed range.
pub const PARAMETER_RANGE: RangeInclusive<i64> = -4..=4;

pub const KNOWN_BASE_MODES: &[&str] = &[
    "Standard",
    "Vivid",
    "Monotone",
    "Soft Monotone",
    "Hard Monotone",
    "Hi-Contrast B&W",
    "Negative Film",
    "Positive Film",
    "Bleach Bypass",
    "Retro",
    "Cross Process",
];

/// Names of the nine `parameters` dials, in schema order.
pub const PARAMETER_FIELDS: [&str; 9] = [
    "saturation",
    "hue",
    "high_low_key",
    "contrast",
    "contrast_highlight",
    "contrast_shadow",
    "sharpness",
    "shading",
    "clarity",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSettings {
    pub exposure_recommendation: String,
    pub wb_setting: String,
    /// Amber (+) / blue (-) axis.
    pub wb_shift_a: i64,
    /// Green (+) / magenta (-) axis.
    pub wb_shift_g: i64,
    pub hdf_recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameters {
    pub saturation: i64,
    pub hue: i64,
    pub high_low_key: i64,
    pub contrast: i64,
    pub contrast_highlight: i64,
    pub contrast_shadow: i64,
    pub sharpness: i64,
    pub shading: i64,
    pub clarity: i64,
}

impl Parameters {
    pub fn from_values(values: [i64; 9]) -> Self {
        let [saturation, hue, high_low_key, contrast, contrast_highlight, contrast_shadow, sharpness, shading, clarity] =
            values;
        Parameters {
            saturation,
            hue,
            high_low_key,
            contrast,
            contrast_highlight,
            contrast_shadow,
            sharpness,
            shading,
            clarity,
        }
    }
}

/// A validated camera recipe, as returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub vibe_match: String,
    pub base_mode: String,
    pub global_settings: GlobalSettings,
    pub parameters: Parameters,
    pub note: String,
}

/// Case-insensitive; tolerates a qualifier after the mode name, e.g.
/// "Negative Film (cinematic)".
pub fn is_known_base_mode(value: &str) -> bool {
    let lowered = value.trim().to_lowercase();
    KNOWN_BASE_MODES.iter().any(|mode| {
        let mode = mode.to_lowercase();
        lowered == mode
            || lowered
                .strip_prefix(&mode)
                .is_some_and(|rest| rest.starts_with([' ', '(', '/', '-']))
    })
}
