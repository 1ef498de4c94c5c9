//! Session libraries: recordings on disk and in memory

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{Manifest, Recording, RecordingSource, SessionDescriptor, SessionLibrary};
use crate::constants::{EVENTS_FILE, MANIFEST_FILE};

/// Recordings stored as `<root>/<folder>/manifest.toml` + `events.evlog`.
///
/// The directory is scanned on every lookup, so recordings added while the
/// runner is alive are picked up.
#[derive(Debug, Clone)]
pub struct DirectoryLibrary {
    root: PathBuf,
}

impl DirectoryLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every readable recording under the root, sorted by folder name
    fn scan(&self) -> Vec<SessionDescriptor> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot read recordings directory {}: {}", self.root.display(), e);
                return Vec::new();
            }
        };

        let mut folders: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        folders.sort();

        let mut sessions = Vec::new();
        for folder in folders {
            let manifest_path = folder.join(MANIFEST_FILE);
            if !manifest_path.exists() {
                debug!("Skipping {}: no {}", folder.display(), MANIFEST_FILE);
                continue;
            }
            match Manifest::from_file(&manifest_path) {
                Ok(manifest) => sessions.push(SessionDescriptor::from_manifest(
                    manifest,
                    RecordingSource::File(folder.join(EVENTS_FILE)),
                )),
                Err(e) => warn!("Skipping recording: {}", e),
            }
        }
        sessions
    }
}

impl SessionLibrary for DirectoryLibrary {
    fn resolve(&self, title: &str) -> Option<SessionDescriptor> {
        self.scan().into_iter().find(|s| s.title == title)
    }

    fn titles(&self) -> Vec<String> {
        let mut titles: Vec<String> = self.scan().into_iter().map(|s| s.title).collect();
        titles.sort();
        titles
    }
}

/// Sessions held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryLibrary {
    sessions: Vec<SessionDescriptor>,
}

impl MemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, manifest: Manifest, recording: Recording) {
        self.sessions.retain(|s| s.title != manifest.title);
        self.sessions.push(SessionDescriptor::from_manifest(
            manifest,
            RecordingSource::Inline(Arc::new(recording)),
        ));
    }

    pub fn with_session(mut self, manifest: Manifest, recording: Recording) -> Self {
        self.insert(manifest, recording);
        self
    }
}

impl SessionLibrary for MemoryLibrary {
    fn resolve(&self, title: &str) -> Option<SessionDescriptor> {
        self.sessions.iter().find(|s| s.title == title).cloned()
    }

    fn titles(&self) -> Vec<String> {
        let mut titles: Vec<String> = self.sessions.iter().map(|s| s.title.clone()).collect();
        titles.sort();
        titles
    }
}
