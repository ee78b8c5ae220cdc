//! persisted `section -> key -> value` settings
//!
//! Settings live in two yaml files: a global one in the home directory and a local one in the
//! work directory. Both are optional; local values win.
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

const GLOBAL_DIRECTORY: &str = ".vapor";
const GLOBAL_FILE_NAME: &str = "config.yaml";
const LOCAL_FILE_NAME: &str = ".vapor.yaml";

#[derive(Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Settings {
    sections: IndexMap<String, IndexMap<String, String>>,
}

impl Settings {
    /// Load global and local settings
    pub fn load() -> Result<Self, SettingsError> {
        let mut paths: Vec<PathBuf> = global_path().into_iter().collect();
        paths.push(local_path());
        Self::load_files(&paths)
    }

    /// Load and combine files, later files override earlier ones. Missing files are skipped.
    pub fn load_files(paths: &[PathBuf]) -> Result<Self, SettingsError> {
        let mut settings = Settings::default();
        for path in paths {
            if !path.is_file() {
                tracing::trace!(path = %path.display(), "no settings file");
                continue;
            }

            for (section, entries) in Self::load_file(path)?.sections {
                for (key, value) in entries {
                    settings.set(&section, &key, value);
                }
            }
        }

        Ok(settings)
    }

    pub fn load_file(path: &Path) -> Result<Self, SettingsError> {
        tracing::debug!(path = %path.display(), "loading settings");
        let contents = std::fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(Settings::default());
        }

        Ok(serde_yaml::from_str(&contents)?)
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|entries| entries.get(key))
            .map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, section: &str, key: &str, default: &'a str) -> &'a str {
        self.get(section, key).unwrap_or(default)
    }

    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
    }

    pub fn sections(&self) -> impl Iterator<Item = (&String, &IndexMap<String, String>)> {
        self.sections.iter()
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        tracing::info!(path = %path.display(), "saving settings");
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }
}

pub fn global_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| {
        PathBuf::from(home)
            .join(GLOBAL_DIRECTORY)
            .join(GLOBAL_FILE_NAME)
    })
}

pub fn local_path() -> PathBuf {
    PathBuf::from(LOCAL_FILE_NAME)
}

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("no home directory to store global settings in")]
    NoHomeDirectory,
    #[error("IO error")]
    IoError(#[from] std::io::Error),
    #[error("Unable to parse settings file")]
    YamlError(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scratch_file(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("vapor-settings-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn get_with_default() {
        let mut settings = Settings::default();
        settings.set("defaults", "recipes", "add-parameter");

        assert_eq!(settings.get("defaults", "recipes"), Some("add-parameter"));
        assert_eq!(settings.get("defaults", "missing"), None);
        assert_eq!(settings.get_or("other", "recipes", "none"), "none");
    }

    #[test]
    fn save_and_load_with_override() {
        let global = scratch_file("global.yaml");
        let local = scratch_file("local.yaml");

        let mut settings = Settings::default();
        settings.set("defaults", "recipes", "add-parameter");
        settings.set("defaults", "format", "json");
        settings.save(&global).unwrap();

        let mut settings = Settings::default();
        settings.set("defaults", "recipes", "add-mapping");
        settings.save(&local).unwrap();

        let loaded =
            Settings::load_files(&[global.clone(), local.clone(), scratch_file("absent.yaml")])
                .unwrap();
        assert_eq!(loaded.get("defaults", "recipes"), Some("add-mapping"));
        assert_eq!(loaded.get("defaults", "format"), Some("json"));

        std::fs::remove_file(global).unwrap();
        std::fs::remove_file(local).unwrap();
    }
}
