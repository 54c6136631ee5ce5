use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use tracing::{info, warn};
use url::Url;

pub const SERVICE_NAME: &str = "Ricoh GR Series Recipe Generator";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub logs_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub openai_temperature: f32,
    pub openai_timeout_seconds: u64,
    pub result_dir: PathBuf,
    /// Problems found while loading, reported once logging is running.
    pub load_warnings: Vec<String>,
}

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_f32(name: &str, default: f32) -> f32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<f32>().ok())
        .unwrap_or(default)
}

fn env_u16(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u16>().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

/// Trims the value and drops a trailing slash so `/chat/completions` can be appended.
pub fn normalize_base_url(value: &str) -> Result<String> {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(DEFAULT_BASE_URL.to_string());
    }
    let parsed = Url::parse(trimmed).map_err(|err| anyhow!("Invalid base URL '{trimmed}': {err}"))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(anyhow!(
            "Base URL '{trimmed}' must use http or https, got '{}'",
            parsed.scheme()
        ));
    }
    Ok(trimmed.to_string())
}

fn resolve_result_dir() -> PathBuf {
    if let Ok(value) = env::var("RESULT_DIR") {
        if !value.trim().is_empty() {
            return PathBuf::from(value.trim());
        }
    }

    let candidates = [PathBuf::from("..").join("result"), PathBuf::from("result")];
    for candidate in &candidates {
        if candidate.is_dir() {
            return candidate.clone();
        }
    }

    PathBuf::from("result")
}

fn base_url_or_default(raw: &str, warnings: &mut Vec<String>) -> String {
    normalize_base_url(raw).unwrap_or_else(|err| {
        warnings.push(format!("{err}; falling back to {DEFAULT_BASE_URL}"));
        DEFAULT_BASE_URL.to_string()
    })
}

fn timeout_or_default(seconds: u64, warnings: &mut Vec<String>) -> u64 {
    if seconds == 0 {
        warnings.push("OPENAI_TIMEOUT_SECONDS must be positive; using 60".to_string());
        return 60;
    }
    seconds
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut load_warnings = Vec::new();
        let openai_base_url = base_url_or_default(
            &env_string("OPENAI_BASE_URL", DEFAULT_BASE_URL),
            &mut load_warnings,
        );
        let openai_timeout_seconds =
            timeout_or_default(env_u64("OPENAI_TIMEOUT_SECONDS", 60), &mut load_warnings);

        let config = Config {
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            logs_dir: PathBuf::from(env_string("LOGS_DIR", "logs")),
            host: env_string("HOST", "0.0.0.0"),
            port: env_u16("PORT", 8000),
            openai_api_key: env_string("OPENAI_API_KEY", "").trim().to_string(),
            openai_base_url,
            openai_model: env_string("OPENAI_MODEL", "").trim().to_string(),
            openai_temperature: env_f32("OPENAI_TEMPERATURE", 0.7),
            openai_timeout_seconds,
            result_dir: resolve_result_dir(),
            load_warnings,
        };
        Ok(config)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse::<SocketAddr>()
            .map_err(|err| anyhow!("Invalid HOST/PORT '{}:{}': {}", self.host, self.port, err))
    }

    pub fn log_summary(&self) {
        for warning in &self.load_warnings {
            warn!("{warning}");
        }
        info!(
            "Configuration: bind={}:{} base_url={} model={} timeout_s={} result_dir={} env_api_key={}",
            self.host,
            self.port,
            self.openai_base_url,
            if self.openai_model.is_empty() {
                DEFAULT_MODEL
            } else {
                &self.openai_model
            },
            self.openai_timeout_seconds,
            self.result_dir.display(),
            if self.openai_api_key.is_empty() {
                "missing"
            } else {
                "set"
            }
        );
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests(result_dir: PathBuf) -> Self {
        Config {
            log_level: "info".to_string(),
            logs_dir: PathBuf::from("logs"),
            host: "127.0.0.1".to_string(),
            port: 0,
            openai_api_key: String::new(),
            openai_base_url: DEFAULT_BASE_URL.to_string(),
            openai_model: String::new(),
            openai_temperature: 0.7,
            openai_timeout_seconds: 5,
            result_dir,
            load_warnings: Vec::new(),
        }
    }
}

pub const RECIPE_SYSTEM_PROMPT: &str = r#"
You are an expert Digital Colorist and Ricoh GR Series specialist (GR III, GR IIIx, HDF).
Your task is to analyze the user's input (a text description, an image, or both) and translate that visual aesthetic into a precise Ricoh GR JPEG Recipe.

# Analysis Protocol
1. **Multimodal Analysis**:
   - If an **Image** is provided: Analyze its color palette, highlight/shadow distribution, dominant color casts (White Balance), and texture. Use it as the primary reference for the "look".
   - If **Text** is provided: Use it to understand the emotional intent, specific film simulations requested, or environmental context (e.g., "Golden Hour", "Cyberpunk").
   - If **Both** are provided: Synthesize them. Text provides the goal, the Image provides the color reference.

2. **Parameter Mapping**:
   - Translate the visual analysis into the specific Ricoh GR parameter range (-4 to +4).
   - Use 'Image Control' as the film stock foundation.
   - Use 'White Balance Shift' (A-B / G-M) as the primary tool for color grading and matching the image's temperature/tint.

# Ricoh GR Parameter Logic

## 1. Global Settings
| Parameter | Logic |
| :--- | :--- |
| **HDF Effect** | **ON:** For dreamy, soft, vintage, or glowing lights. **OFF:** For maximum sharpness. |
| **Exposure (EV)** | **Negative (-0.3 to -0.7):** Deep Ricoh colors. **Positive (0 to +0.3):** Airy, high-key Japanese style. |
| **White Balance** | Select from: AWB, Daylight, Shade, Cloudy, Tungsten, Fluorescent, CTE. Use shifts to fine-tune. |

## 2. Base Image Control (The "Film Stock")
- **Standard / Vivid**: Neutral or high impact.
- **Monotone / Soft Monotone / Hard Monotone / Hi-Contrast B&W**: Grayscale options.
- **Negative Film**: The "gold standard" for cinematic, desaturated looks with teal highlights.
- **Positive Film**: High saturation, deep blues, classic travel look.
- **Bleach Bypass / Retro / Cross Process**: Specific artistic shifts.

## 3. Fine-tuning Parameters (-4 to +4)
- **Saturation**: Color intensity.
- **Hue**: + (Yellow/Green), - (Red/Purple).
- **High/Low Key**: Overall brightness balance.
- **Contrast / Highlight / Shadow**: Sculpting the light curve.
- **Sharpness / Clarity**: Controlling texture and structure.
- **Shading**: Vignetting level.

# Output Instruction
1. Deconstruct the vibe/image into specific color grading choices.
2. Select the best matching **Base Mode**.
3. Tune all **Parameters** to fit the aesthetic. Every parameter MUST be an integer between -4 and 4.
4. Provide a professional explanation in the `note` field.
5. Return JSON only.

## JSON Output Schema
```json
{
  "vibe_match": "string (e.g., 'Tokyo Neon Noir')",
  "base_mode": "string (e.g., 'Negative Film')",
  "global_settings": {
    "exposure_recommendation": "string",
    "wb_setting": "string",
    "wb_shift_a": integer,
    "wb_shift_g": integer,
    "hdf_recommendation": "string ('ON' or 'OFF')"
  },
  "parameters": {
    "saturation": integer,
    "hue": integer,
    "high_low_key": integer,
    "contrast": integer,
    "contrast_highlight": integer,
    "contrast_shadow": integer,
    "sharpness": integer,
    "shading": integer,
    "clarity": integer
  },
  "note": "string (explanation of how the settings match the input/image)"
}
```
"#;
