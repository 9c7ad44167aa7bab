use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::ids::{SceneId, NO_SCENE};

/// Engine-wide tunables. The defaults mirror the constants baked into the
/// BBDOU executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Scene that stays at the bottom of the stack for the whole session.
    pub global_scene_id: SceneId,
    /// Scene pushed when a script asks for a scene the resource lacks.
    pub error_scene_id: SceneId,
    /// Pump freshly started script threads to their first blocking point.
    pub immediate_script_init: bool,
    pub talk: TalkTiming,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            global_scene_id: 0x0001_0003,
            error_scene_id: 0x0001_0010,
            immediate_script_init: false,
            talk: TalkTiming::default(),
        }
    }
}

/// How long a line of dialogue stays up when no explicit duration is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TalkTiming {
    pub ms_per_char: u32,
    pub min_line_ms: u32,
    pub max_line_ms: u32,
}

impl Default for TalkTiming {
    fn default() -> Self {
        TalkTiming {
            ms_per_char: 60,
            min_line_ms: 1_000,
            max_line_ms: 8_000,
        }
    }
}

impl TalkTiming {
    pub fn line_duration(&self, text: &str) -> u32 {
        let chars = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
        chars
            .saturating_mul(self.ms_per_char)
            .clamp(self.min_line_ms, self.max_line_ms)
    }
}

impl EngineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: EngineConfig =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.error_scene_id == NO_SCENE {
            return Err(ConfigError::Invalid(
                "error_scene_id must name a real scene".to_string(),
            ));
        }
        if self.talk.min_line_ms > self.talk.max_line_ms {
            return Err(ConfigError::Invalid(format!(
                "talk.min_line_ms ({}) exceeds talk.max_line_ms ({})",
                self.talk.min_line_ms, self.talk.max_line_ms
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "error_scene_id": 42, "talk": {{ "ms_per_char": 10 }} }}"#)
            .expect("write config");
        let config = EngineConfig::from_json_file(file.path()).expect("config parsed");
        assert_eq!(config.error_scene_id, 42);
        assert_eq!(config.global_scene_id, EngineConfig::default().global_scene_id);
        assert_eq!(config.talk.ms_per_char, 10);
        assert_eq!(config.talk.min_line_ms, 1_000);
    }

    #[test]
    fn zero_error_scene_is_rejected() {
        let config = EngineConfig {
            error_scene_id: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("missing.json");
        let err = EngineConfig::from_json_file(&path).unwrap_err();
        assert!(err.to_string().contains("missing.json"));
    }

    #[test]
    fn line_duration_is_clamped() {
        let timing = TalkTiming::default();
        assert_eq!(timing.line_duration("hi"), 1_000);
        assert_eq!(timing.line_duration(&"x".repeat(50)), 3_000);
        assert_eq!(timing.line_duration(&"x".repeat(500)), 8_000);
    }
}
