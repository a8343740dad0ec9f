//! Configuration loading.

pub mod settings;

pub use settings::{CacheSettings, Settings, SettingsError, TemplateSettings};
