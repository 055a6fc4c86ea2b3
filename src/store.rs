use std::fs;
use std::path::{Path, PathBuf};

use crate::config::EngineConfig;
use crate::engine::DrawingDocument;
use crate::error::{PersistenceError, PersistenceResult};

const AUTOSAVE_PREFIX: &str = "autosave_";
const EXTENSION: &str = "json";

/// Get a timestamp in seconds since the UNIX epoch
pub fn timestamp_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Keeps named drawings and rotating autosaves as JSON files in one directory
#[derive(Debug, Clone)]
pub struct DrawingStore {
    /// Directory where drawing files are stored
    dir: PathBuf,
    /// Maximum number of auto-save files to keep
    max_autosaves: usize,
    /// Interval between auto-saves in seconds
    autosave_interval: u64,
    /// Last auto-save timestamp
    last_autosave: u64,
}

impl DrawingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_autosaves: 5,
            autosave_interval: 300, // 5 minutes
            last_autosave: 0,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            max_autosaves: config.max_autosaves,
            autosave_interval: config.autosave_interval_secs,
            ..Self::new(&config.drawings_dir)
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PersistenceResult<PathBuf> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(|c: char| c == '/' || c == '\\' || c.is_control());
        if !valid {
            return Err(PersistenceError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(format!("{}.{}", name, EXTENSION)))
    }

    /// Save a drawing under `name`, replacing any drawing of that name
    pub fn save(&self, name: &str, document: &DrawingDocument) -> PersistenceResult<()> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.dir)?;

        let json = serde_json::to_string_pretty(document)?;
        fs::write(&path, json)?;
        log::info!("saved drawing to {}", path.display());
        Ok(())
    }

    pub fn load(&self, name: &str) -> PersistenceResult<DrawingDocument> {
        let json = fs::read_to_string(self.path_for(name)?)?;
        DrawingDocument::from_json(&json)
    }

    pub fn delete(&self, name: &str) -> PersistenceResult<()> {
        fs::remove_file(self.path_for(name)?)?;
        Ok(())
    }

    /// Names of saved drawings, autosaves excluded, sorted
    pub fn list(&self) -> PersistenceResult<Vec<String>> {
        let mut names: Vec<String> = self
            .drawing_names()?
            .into_iter()
            .filter(|name| !name.starts_with(AUTOSAVE_PREFIX))
            .collect();
        names.sort();
        Ok(names)
    }

    fn drawing_names(&self) -> PersistenceResult<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let names = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == EXTENSION))
            .filter_map(|path| path.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
            .collect();
        Ok(names)
    }

    /// Check if we should auto-save based on the interval
    pub fn should_autosave(&self, now: u64) -> bool {
        now.saturating_sub(self.last_autosave) >= self.autosave_interval
    }

    /// Auto-save if the interval has elapsed. Returns the name written, if any.
    pub fn try_autosave(&mut self, document: &DrawingDocument) -> PersistenceResult<Option<String>> {
        self.autosave_at(document, timestamp_secs())
    }

    pub fn autosave_at(&mut self, document: &DrawingDocument, now: u64) -> PersistenceResult<Option<String>> {
        if !self.should_autosave(now) {
            return Ok(None);
        }

        let name = format!("{}{}", AUTOSAVE_PREFIX, now);
        self.save(&name, document)?;
        self.last_autosave = now;
        self.cleanup_old_autosaves()?;
        Ok(Some(name))
    }

    /// Autosave names with their timestamps, oldest first
    fn autosaves(&self) -> PersistenceResult<Vec<(u64, String)>> {
        let mut autosaves: Vec<(u64, String)> = self
            .drawing_names()?
            .into_iter()
            .filter_map(|name| {
                let stamp = name.strip_prefix(AUTOSAVE_PREFIX)?.parse().ok()?;
                Some((stamp, name))
            })
            .collect();
        autosaves.sort();
        Ok(autosaves)
    }

    fn cleanup_old_autosaves(&self) -> PersistenceResult<()> {
        let autosaves = self.autosaves()?;
        let excess = autosaves.len().saturating_sub(self.max_autosaves);
        for (_, name) in autosaves.into_iter().take(excess) {
            log::debug!("removing old autosave {}", name);
            self.delete(&name)?;
        }
        Ok(())
    }

    /// Find the most recent auto-save
    pub fn find_latest_autosave(&self) -> PersistenceResult<Option<String>> {
        Ok(self.autosaves()?.pop().map(|(_, name)| name))
    }
}
