use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::storage;

/// Text size preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
    #[serde(rename = "Extra Large")]
    ExtraLarge,
}

impl FontSize {
    pub const ALL: [Self; 4] = [Self::Small, Self::Medium, Self::Large, Self::ExtraLarge];

    /// Scale applied to base point sizes.
    #[must_use]
    pub fn multiplier(self) -> f32 {
        match self {
            Self::Small => 0.85,
            Self::Medium => 1.0,
            Self::Large => 1.15,
            Self::ExtraLarge => 1.3,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub dark_mode: bool,
    #[serde(default)]
    pub font_size: FontSize,
}

/// Preferences backed by a JSON file, written on every change.
#[derive(Debug)]
pub struct PreferenceStore {
    path: PathBuf,
    current: Preferences,
}

impl PreferenceStore {
    /// Loads preferences from `path`; missing or undecodable files give defaults.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let current = storage::read_json_or_default(&path);
        Self { path, current }
    }

    #[must_use]
    pub fn get(&self) -> Preferences {
        self.current
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// # Errors
    ///
    /// Returns the I/O or serialization error; the in-memory value is updated regardless.
    pub fn set_dark_mode(&mut self, enabled: bool) -> Result<(), StoreError> {
        self.current.dark_mode = enabled;
        self.save()
    }

    /// # Errors
    ///
    /// Returns the I/O or serialization error; the in-memory value is updated regardless.
    pub fn set_font_size(&mut self, size: FontSize) -> Result<(), StoreError> {
        self.current.font_size = size;
        self.save()
    }

    fn save(&self) -> Result<(), StoreError> {
        storage::write_json_atomically(&self.path, &self.current)
    }
}
