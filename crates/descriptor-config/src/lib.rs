//! Turns a flat option map (or an optional TOML file) into a validated
//! [`GeneratorSettings`], rejecting bad input without disturbing whatever
//! settings the caller already had.

use std::collections::HashMap;
use std::path::Path;

use descriptor_model::{DescriptorError, GeneratorSettings};
use serde::Deserialize;

/// Mirrors [`GeneratorSettings`] with every field optional, so a TOML file
/// only needs to name the options it wants to override.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ConfigFile {
    pub thread_count: Option<usize>,
    pub sampling_rate: Option<u64>,
    pub frame_buffer_length: Option<usize>,
    pub run_in_safe_mode: Option<bool>,
    pub process_tracks: Option<bool>,
    pub buffer_content_copy: Option<bool>,
    pub append_modality: Option<bool>,
}

impl ConfigFile {
    fn apply_to(self, settings: &mut GeneratorSettings) {
        if let Some(v) = self.thread_count {
            settings.thread_count = v;
        }
        if let Some(v) = self.sampling_rate {
            settings.sampling_rate = v;
        }
        if let Some(v) = self.frame_buffer_length {
            settings.frame_buffer_length = v;
        }
        if let Some(v) = self.run_in_safe_mode {
            settings.run_in_safe_mode = v;
        }
        if let Some(v) = self.process_tracks {
            settings.process_tracks = v;
        }
        if let Some(v) = self.buffer_content_copy {
            settings.buffer_content_copy = v;
        }
        if let Some(v) = self.append_modality {
            settings.append_modality = v;
        }
    }
}

/// Builds settings from a flat string-keyed option map. Unknown keys are
/// logged and skipped; a malformed value for a recognized key, or a value
/// outside its valid range, aborts the whole call with `Err` and returns the
/// defaults untouched to the caller: nothing is ever partially applied.
pub fn from_options(options: &HashMap<String, String>) -> Result<GeneratorSettings, DescriptorError> {
    let mut settings = GeneratorSettings::default();

    for (key, value) in options {
        match key.as_str() {
            "thread_count" => settings.thread_count = parse_usize(key, value)?,
            "sampling_rate" => settings.sampling_rate = parse_u64(key, value)?,
            "frame_buffer_length" => settings.frame_buffer_length = parse_usize(key, value)?,
            "run_in_safe_mode" => settings.run_in_safe_mode = parse_bool(key, value)?,
            "process_tracks" => settings.process_tracks = parse_bool(key, value)?,
            "buffer_content_copy" => settings.buffer_content_copy = parse_bool(key, value)?,
            "append_modality" => settings.append_modality = parse_bool(key, value)?,
            unknown => {
                tracing::warn!(target: "descriptor.config", key = unknown, "unrecognized_option_ignored");
            }
        }
    }

    validate(&settings)?;
    Ok(settings)
}

/// Loads settings from a TOML file, falling back to defaults when the file
/// does not exist. A file that exists but fails to parse, or that names
/// out-of-range values, is a configuration error.
pub fn load_from(path: &Path) -> Result<GeneratorSettings, DescriptorError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => {
            tracing::warn!(target: "descriptor.config", path = %path.display(), "config_file_missing_using_defaults");
            return Ok(GeneratorSettings::default());
        }
    };

    let file: ConfigFile = toml::from_str(&raw)
        .map_err(|e| DescriptorError::Configuration(format!("malformed config file: {e}")))?;

    let mut settings = GeneratorSettings::default();
    file.apply_to(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &GeneratorSettings) -> Result<(), DescriptorError> {
    if settings.thread_count < 1 {
        return Err(DescriptorError::Configuration(
            "thread_count must be at least 1".to_string(),
        ));
    }
    if settings.sampling_rate < 1 {
        return Err(DescriptorError::Configuration(
            "sampling_rate must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn parse_usize(key: &str, value: &str) -> Result<usize, DescriptorError> {
    value
        .parse::<usize>()
        .map_err(|_| DescriptorError::Configuration(format!("{key} must be a non-negative integer, got {value:?}")))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, DescriptorError> {
    value
        .parse::<u64>()
        .map_err(|_| DescriptorError::Configuration(format!("{key} must be a non-negative integer, got {value:?}")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, DescriptorError> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(DescriptorError::Configuration(format!(
            "{key} must be a boolean, got {other:?}"
        ))),
    }
}
