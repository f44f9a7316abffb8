use std::path::{Path, PathBuf};

use serde::Deserialize;
use wardrobe_types::{SynthesisOptions, Vocabulary};

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default, Clone)]
struct ConfigFile {
    #[serde(default)]
    synthesis: SynthesisConfig,
    #[serde(default)]
    menu: MenuConfig,
    #[serde(default)]
    classifier: ClassifierConfig,
    #[serde(default)]
    storage: StorageConfig,
}

#[derive(Deserialize, Default, Clone)]
struct SynthesisConfig {
    layer_name: Option<String>,
    parameter_name: Option<String>,
    neutral_name: Option<String>,
}

#[derive(Deserialize, Default, Clone)]
struct MenuConfig {
    include_reset_entry: Option<bool>,
    reset_label: Option<String>,
}

#[derive(Deserialize, Default, Clone)]
struct ClassifierConfig {
    extra_system_keywords: Option<Vec<String>>,
    extra_clothing_terms: Option<Vec<String>>,
    extra_body_terms: Option<Vec<String>>,
    exclude_patterns: Option<Vec<String>>,
}

#[derive(Deserialize, Default, Clone)]
struct StorageConfig {
    database: Option<String>,
}

#[derive(Clone)]
pub struct Config {
    synthesis: SynthesisConfig,
    menu: MenuConfig,
    classifier: ClassifierConfig,
    storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_file(embedded())
    }
}

fn embedded() -> ConfigFile {
    toml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded config.toml")
}

impl Config {
    /// Embedded defaults overlaid with the user's config file, if any.
    pub fn load() -> Self {
        match user_config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Embedded defaults overlaid with `path`. A missing or malformed file is
    /// logged and ignored.
    pub fn load_from(path: &Path) -> Self {
        let mut base = embedded();
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                    Ok(user) => merge(&mut base, user),
                    Err(e) => {
                        log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                    }
                },
                Err(e) => {
                    log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                }
            }
        }
        Self::from_file(base)
    }

    /// Embedded defaults overlaid with TOML text.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        let mut base = embedded();
        merge(&mut base, toml::from_str(text)?);
        Ok(Self::from_file(base))
    }

    fn from_file(file: ConfigFile) -> Self {
        Config {
            synthesis: file.synthesis,
            menu: file.menu,
            classifier: file.classifier,
            storage: file.storage,
        }
    }

    pub fn synthesis_options(&self) -> SynthesisOptions {
        let fallback = SynthesisOptions::default();
        SynthesisOptions {
            layer_name: non_blank(&self.synthesis.layer_name).unwrap_or(fallback.layer_name),
            parameter_name: non_blank(&self.synthesis.parameter_name)
                .unwrap_or(fallback.parameter_name),
            neutral_name: non_blank(&self.synthesis.neutral_name).unwrap_or(fallback.neutral_name),
        }
    }

    /// Label of the menu entry that resets the selector, or `None` when the
    /// reset entry is disabled.
    pub fn reset_label(&self) -> Option<&str> {
        if !self.menu.include_reset_entry.unwrap_or(true) {
            return None;
        }
        Some(
            self.menu
                .reset_label
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or("None"),
        )
    }

    /// Built-in classifier vocabulary extended with configured terms.
    /// Invalid exclude patterns are logged and skipped.
    pub fn vocabulary(&self) -> Vocabulary {
        let mut vocab = Vocabulary::default();
        let c = &self.classifier;
        if let Some(terms) = &c.extra_system_keywords {
            vocab.add_system_keywords(terms);
        }
        if let Some(terms) = &c.extra_clothing_terms {
            vocab.add_clothing_terms(terms);
        }
        if let Some(terms) = &c.extra_body_terms {
            vocab.add_body_terms(terms);
        }
        for pattern in c.exclude_patterns.iter().flatten() {
            if let Err(e) = vocab.add_exclude_pattern(pattern) {
                log::warn!(target: "config", "skipping invalid exclude pattern '{}': {}", pattern, e);
            }
        }
        vocab
    }

    pub fn database_file_name(&self) -> &str {
        self.storage
            .database
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("wardrobe.sqlite")
    }

    /// Default database location under the platform data directory.
    pub fn database_path(&self) -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("wardrobe").join(self.database_file_name()))
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wardrobe").join("config.toml"))
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn merge(base: &mut ConfigFile, user: ConfigFile) {
    merge_synthesis(&mut base.synthesis, user.synthesis);
    merge_menu(&mut base.menu, user.menu);
    merge_classifier(&mut base.classifier, user.classifier);
    if user.storage.database.is_some() {
        base.storage.database = user.storage.database;
    }
}

fn merge_synthesis(base: &mut SynthesisConfig, user: SynthesisConfig) {
    if user.layer_name.is_some() {
        base.layer_name = user.layer_name;
    }
    if user.parameter_name.is_some() {
        base.parameter_name = user.parameter_name;
    }
    if user.neutral_name.is_some() {
        base.neutral_name = user.neutral_name;
    }
}

fn merge_menu(base: &mut MenuConfig, user: MenuConfig) {
    if user.include_reset_entry.is_some() {
        base.include_reset_entry = user.include_reset_entry;
    }
    if user.reset_label.is_some() {
        base.reset_label = user.reset_label;
    }
}

fn merge_classifier(base: &mut ClassifierConfig, user: ClassifierConfig) {
    if user.extra_system_keywords.is_some() {
        base.extra_system_keywords = user.extra_system_keywords;
    }
    if user.extra_clothing_terms.is_some() {
        base.extra_clothing_terms = user.extra_clothing_terms;
    }
    if user.extra_body_terms.is_some() {
        base.extra_body_terms = user.extra_body_terms;
    }
    if user.exclude_patterns.is_some() {
        base.exclude_patterns = user.exclude_patterns;
    }
}
