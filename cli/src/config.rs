use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

use shadal_core::manager::validate_selector;

pub struct Config {
    pub data_dir: PathBuf,
    pub server_url: Option<String>,
    /// Campus forced for this run, taking precedence over the remembered one.
    pub campus_override: Option<String>,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    pub fn load() -> Result<Self> {
        let data_dir = match env_var("SHADAL_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => ProjectDirs::from("", "", "shadal")
                .context("Could not determine home directory")?
                .data_dir()
                .to_path_buf(),
        };
        Self::at(
            data_dir,
            env_var("SHADAL_SERVER_URL"),
            env_var("SHADAL_CAMPUS"),
        )
    }

    pub fn at(
        data_dir: PathBuf,
        server_url: Option<String>,
        campus_override: Option<String>,
    ) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
        Ok(Config {
            data_dir,
            server_url,
            campus_override,
        })
    }

    /// Server ids bookmarked by the previous version of the app.
    pub fn legacy_bookmarks_path(&self) -> PathBuf {
        self.data_dir.join("legacy_bookmarks.json")
    }

    fn campus_path(&self) -> PathBuf {
        self.data_dir.join("campus")
    }

    /// The campus to work on: the override if set, else the remembered one.
    pub fn selected_campus(&self) -> Result<Option<String>> {
        if let Some(campus) = &self.campus_override {
            return Ok(Some(validate_selector(campus)?.to_string()));
        }
        read_campus(&self.campus_path())
    }

    pub fn remember_campus(&self, campus: &str) -> Result<()> {
        let campus = validate_selector(campus)?;
        let path = self.campus_path();
        std::fs::write(&path, campus)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn server_url(&self) -> Result<&str> {
        self.server_url
            .as_deref()
            .context("No server configured. Set SHADAL_SERVER_URL or pass --server")
    }
}

fn read_campus(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let campus = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let campus = campus.trim();
    if campus.is_empty() {
        return Ok(None);
    }
    Ok(Some(validate_selector(campus)?.to_string()))
}
