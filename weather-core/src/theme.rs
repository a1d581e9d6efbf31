use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    error::StorageError,
    storage::{Storage, THEME_KEY, read_json, write_json},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Theme {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(anyhow::anyhow!("Unknown theme '{value}'. Supported themes: light, dark.")),
        }
    }
}

/// Persisted theme preference.
#[derive(Debug, Clone)]
pub struct ThemeStore {
    storage: Arc<dyn Storage>,
}

impl ThemeStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// The saved theme, or `fallback` when nothing usable is stored.
    pub fn load_or(&self, fallback: Theme) -> Theme {
        read_json(self.storage.as_ref(), THEME_KEY).unwrap_or(fallback)
    }

    pub fn save(&self, theme: Theme) -> Result<(), StorageError> {
        write_json(self.storage.as_ref(), THEME_KEY, &theme)
    }

    pub fn toggle(&self, fallback: Theme) -> Result<Theme, StorageError> {
        let next = self.load_or(fallback).toggled();
        self.save(next)?;
        Ok(next)
    }
}
