use std::fmt;
use std::ops::RangeInclusive;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use super::schema::{
    is_known_base_mode, GlobalSettings, Parameters, Recipe, PARAMETER_FIELDS, PARAMETER_RANGE,
};

static THINK_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*<think>.*?</think>").expect("valid think regex"));
static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$").expect("valid code fence regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub reason: String,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("Failed to parse AI response as JSON: {0}")]
    MalformedOutput(#[source] serde_json::Error),
    #[error("AI response validation error: {}", join_violations(.0))]
    SchemaViolation(Vec<FieldViolation>),
}

impl RecipeError {
    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            RecipeError::SchemaViolation(violations) => violations,
            RecipeError::MalformedOutput(_) => &[],
        }
    }
}

/// The recipe handed back to the caller plus the model's mapping exactly as
/// parsed, extra keys included, for the history log.
#[derive(Debug, Clone)]
pub struct ValidatedRecipe {
    pub recipe: Recipe,
    pub raw: Map<String, Value>,
}

/// Drops a leading `<think>` block and a surrounding Markdown code fence.
pub fn extract_json_payload(text: &str) -> &str {
    let without_think = match THINK_BLOCK.find(text) {
        Some(found) => &text[found.end()..],
        None => text,
    };
    match CODE_FENCE
        .captures(without_think)
        .and_then(|caps| caps.get(1))
    {
        Some(inner) => inner.as_str(),
        None => without_think.trim(),
    }
}

struct Checker {
    violations: Vec<FieldViolation>,
}

impl Checker {
    fn violation(&mut self, field: String, reason: impl Into<String>) {
        self.violations.push(FieldViolation {
            field,
            reason: reason.into(),
        });
    }

    fn path(prefix: &str, key: &str) -> String {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        }
    }

    fn object<'a>(
        &mut self,
        map: &'a Map<String, Value>,
        key: &str,
        prefix: &str,
    ) -> Option<&'a Map<String, Value>> {
        match map.get(key) {
            None => {
                self.violation(Self::path(prefix, key), "field required");
                None
            }
            Some(Value::Object(inner)) => Some(inner),
            Some(_) => {
                self.violation(Self::path(prefix, key), "expected an object");
                None
            }
        }
    }

    fn string(&mut self, map: &Map<String, Value>, key: &str, prefix: &str) -> Option<String> {
        match map.get(key) {
            None => {
                self.violation(Self::path(prefix, key), "field required");
                None
            }
            Some(Value::String(value)) => Some(value.clone()),
            Some(_) => {
                self.violation(Self::path(prefix, key), "expected a string");
                None
            }
        }
    }

    fn integer(
        &mut self,
        map: &Map<String, Value>,
        key: &str,
        prefix: &str,
        range: Option<&RangeInclusive<i64>>,
    ) -> Option<i64> {
        let value = match map.get(key) {
            None => {
                self.violation(Self::path(prefix, key), "field required");
                return None;
            }
            Some(value) => value,
        };
        let Some(number) = coerce_integer(value) else {
            self.violation(Self::path(prefix, key), "expected an integer");
            return None;
        };
        if let Some(range) = range {
            if !range.contains(&number) {
                self.violation(
                    Self::path(prefix, key),
                    format!(
                        "must be between {} and {}, got {}",
                        range.start(),
                        range.end(),
                        number
                    ),
                );
                return None;
            }
        }
        Some(number)
    }

    fn global_settings(&mut self, map: &Map<String, Value>) -> Option<GlobalSettings> {
        let prefix = "global_settings";
        let exposure_recommendation = self.string(map, "exposure_recommendation", prefix);
        let wb_setting = self.string(map, "wb_setting", prefix);
        let wb_shift_a = self.integer(map, "wb_shift_a", prefix, None);
        let wb_shift_g = self.integer(map, "wb_shift_g", prefix, None);
        let hdf_recommendation = self.string(map, "hdf_recommendation", prefix);

        Some(GlobalSettings {
            exposure_recommendation: exposure_recommendation?,
            wb_setting: wb_setting?,
            wb_shift_a: wb_shift_a?,
            wb_shift_g: wb_shift_g?,
            hdf_recommendation: hdf_recommendation?,
        })
    }

    fn parameters(&mut self, map: &Map<String, Value>) -> Option<Parameters> {
        let mut values = [0i64; 9];
        let mut complete = true;
        for (slot, field) in values.iter_mut().zip(PARAMETER_FIELDS) {
            match self.integer(map, field, "parameters", Some(&PARAMETER_RANGE)) {
                Some(value) => *slot = value,
                None => complete = false,
            }
        }
        complete.then(|| Parameters::from_values(values))
    }

    fn recipe(&mut self, root: &Map<String, Value>) -> Option<Recipe> {
        let vibe_match = self.string(root, "vibe_match", "");
        let base_mode = self.string(root, "base_mode", "");
        let global_settings = self
            .object(root, "global_settings", "")
            .and_then(|map| self.global_settings(map));
        let parameters = self
            .object(root, "parameters", "")
            .and_then(|map| self.parameters(map));
        let note = self.string(root, "note", "");

        Some(Recipe {
            vibe_match: vibe_match?,
            base_mode: base_mode?,
            global_settings: global_settings?,
            parameters: parameters?,
            note: note?,
        })
    }
}

/// Whole numbers arrive as `2`, `2.0`, `"2"` or `"2.0"` depending on the model;
/// all of them read as 2. Fractions, booleans and other strings do not.
fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(text) => {
            let text = text.trim();
            let whole = match text.split_once('.') {
                Some((whole, zeros)) if !zeros.is_empty() && zeros.bytes().all(|b| b == b'0') => {
                    whole
                }
                Some(_) => return None,
                None => text,
            };
            whole.parse::<i64>().ok()
        }
        _ => None,
    }
}

/// Checks an already-parsed value against the recipe schema, collecting every
/// violated field rather than stopping at the first.
pub fn validate_value(value: Value) -> Result<ValidatedRecipe, RecipeError> {
    let Value::Object(raw) = value else {
        return Err(RecipeError::SchemaViolation(vec![FieldViolation {
            field: "$".to_string(),
            reason: "expected a JSON object".to_string(),
        }]));
    };

    let mut checker = Checker {
        violations: Vec::new(),
    };
    let recipe = checker.recipe(&raw);

    match recipe {
        Some(recipe) if checker.violations.is_empty() => {
            if !is_known_base_mode(&recipe.base_mode) {
                warn!(
                    "Model returned unrecognized base mode '{}' for '{}'",
                    recipe.base_mode, recipe.vibe_match
                );
            }
            Ok(ValidatedRecipe { recipe, raw })
        }
        _ => Err(RecipeError::SchemaViolation(checker.violations)),
    }
}

pub fn parse_recipe(text: &str) -> Result<ValidatedRecipe, RecipeError> {
    let payload = extract_json_payload(text);
    let value: Value = serde_json::from_str(payload).map_err(RecipeError::MalformedOutput)?;
    validate_value(value)
}
