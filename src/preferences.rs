use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::storage::KeyValueStore;
use crate::tmdb::QueryParams;

pub const LANGUAGE_KEY: &str = "cinestream-language";
pub const THEME_KEY: &str = "cinestream-theme";
pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
    pub region: Option<&'static str>,
}

pub const LANGUAGES: &[Language] = &[
    Language { code: "en", name: "English", region: None },
    Language { code: "hi", name: "Hindi", region: Some("IN") },
    Language { code: "es", name: "Spanish", region: None },
    Language { code: "fr", name: "French", region: None },
    Language { code: "de", name: "German", region: None },
    Language { code: "it", name: "Italian", region: None },
    Language { code: "pt", name: "Portuguese", region: None },
    Language { code: "ja", name: "Japanese", region: None },
    Language { code: "ko", name: "Korean", region: None },
    Language { code: "zh", name: "Chinese", region: None },
    Language { code: "ar", name: "Arabic", region: None },
    Language { code: "ru", name: "Russian", region: None },
];

impl Language {
    pub fn find(code: &str) -> Option<&'static Language> {
        LANGUAGES.iter().find(|l| l.code.eq_ignore_ascii_case(code.trim()))
    }

    pub fn default_language() -> &'static Language {
        &LANGUAGES[0]
    }

    /// Listing filters for this language. English browses the unfiltered catalog.
    pub fn discover_params(&self) -> QueryParams {
        let mut params = QueryParams::new();
        if self.code != DEFAULT_LANGUAGE {
            params.push("with_original_language", self.code);
            if let Some(region) = self.region {
                params.push("region", region);
            }
        }
        params
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PreferenceSnapshot {
    pub language: &'static Language,
    pub theme: Theme,
}

/// Display language and theme, each persisted under its own key.
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn language(&self) -> &'static Language {
        let Some(code) = self.load(LANGUAGE_KEY) else {
            return Language::default_language();
        };
        match Language::find(&code) {
            Some(lang) => lang,
            None => {
                warn!("Unknown stored language '{}', using default", code);
                Language::default_language()
            }
        }
    }

    pub fn set_language(&self, code: &str) -> Result<&'static Language> {
        let lang = Language::find(code)
            .ok_or_else(|| anyhow::anyhow!("unsupported language '{}'", code))?;
        self.store
            .save(LANGUAGE_KEY, lang.code)
            .context("Failed to persist language")?;
        Ok(lang)
    }

    pub fn theme(&self) -> Theme {
        match self.load(THEME_KEY).as_deref() {
            None => Theme::default(),
            Some("light") => Theme::Light,
            Some("dark") => Theme::Dark,
            Some(other) => {
                warn!("Unknown stored theme '{}', using default", other);
                Theme::default()
            }
        }
    }

    pub fn set_theme(&self, theme: Theme) -> Result<()> {
        let value = match theme {
            Theme::Light => "light",
            Theme::Dark => "dark",
        };
        self.store
            .save(THEME_KEY, value)
            .context("Failed to persist theme")
    }

    pub fn snapshot(&self) -> PreferenceSnapshot {
        PreferenceSnapshot {
            language: self.language(),
            theme: self.theme(),
        }
    }

    fn load(&self, key: &str) -> Option<String> {
        match self.store.load(key) {
            Ok(v) => v.map(|s| s.trim().to_string()),
            Err(e) => {
                warn!("Failed to load preference {}: {:#}", key, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn english_has_no_discover_filter() {
        assert!(Language::default_language().discover_params().is_empty());
    }

    #[test]
    fn hindi_adds_language_and_region() {
        let params = Language::find("hi").expect("hindi").discover_params();
        let pairs: Vec<(&str, &str)> = params.iter().collect();
        assert_eq!(
            pairs,
            vec![("with_original_language", "hi"), ("region", "IN")]
        );
    }

    #[test]
    fn defaults_then_persists_choices() {
        let prefs = Preferences::new(Arc::new(MemoryStore::new()));
        assert_eq!(prefs.language().code, "en");
        assert_eq!(prefs.theme(), Theme::Light);

        prefs.set_language("ja").unwrap();
        prefs.set_theme(Theme::Dark).unwrap();
        let snap = prefs.snapshot();
        assert_eq!(snap.language.code, "ja");
        assert_eq!(snap.theme, Theme::Dark);
    }

    #[test]
    fn rejects_unknown_language_and_tolerates_bad_stored_values() {
        let store = Arc::new(MemoryStore::with_value(LANGUAGE_KEY, "xx"));
        store.save(THEME_KEY, "sepia").unwrap();
        let prefs = Preferences::new(store);
        assert!(prefs.set_language("klingon").is_err());
        assert_eq!(prefs.language().code, "en");
        assert_eq!(prefs.theme(), Theme::Light);
    }
}
