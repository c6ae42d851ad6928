use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum FileExtensionError {
    #[error("Failed to get file extension")]
    MissingFileExtension,
    #[error("Unsupported file extension for file: {0}")]
    UnsupportedFileExtension(String),
}

pub type FileFormatResult<T> = Result<T, FileExtensionError>;

pub fn get_file_extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|os_str| os_str.to_str())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SerdeFormat {
    Yaml,
    Json,
}

impl SerdeFormat {
    pub fn from_path(path: &Path) -> FileFormatResult<Self> {
        let ext = get_file_extension(path).ok_or(FileExtensionError::MissingFileExtension)?;

        if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") {
            Ok(Self::Yaml)
        } else if ext.eq_ignore_ascii_case("json") {
            Ok(Self::Json)
        } else {
            Err(FileExtensionError::UnsupportedFileExtension(
                path.display().to_string(),
            ))
        }
    }

    pub fn serialize<T: Serialize>(self, value: &T) -> Result<String> {
        Ok(match self {
            Self::Yaml => serde_yml::to_string(value)?,
            Self::Json => serde_json::to_string_pretty(value)?,
        })
    }

    pub fn deserialize<T: DeserializeOwned + 'static>(self, text: &str) -> Result<T> {
        Ok(match self {
            Self::Yaml => serde_yml::from_str(text)?,
            Self::Json => serde_json::from_str(text)?,
        })
    }
}

/// Reads `path` and deserializes it with the format implied by its extension.
pub fn load_file<T: DeserializeOwned + 'static>(path: &Path) -> Result<T> {
    let format = SerdeFormat::from_path(path)?;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    format
        .deserialize(&text)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Serializes `value` with the format implied by the extension of `path`.
pub fn save_file<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let format = SerdeFormat::from_path(path)?;
    let text = format.serialize(value)?;
    std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
}
