use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::index::{GalleryEntry, GallerySource};
use crate::service::GalleryWriter;

const GALLERY_FILE: &str = "gallery.bin";

/// File-backed gallery: every entry in one postcard blob
pub struct GalleryStore {
    dir: PathBuf,
    // serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl GalleryStore {
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file(&self) -> PathBuf {
        self.dir.join(GALLERY_FILE)
    }

    pub fn load(&self) -> Result<Vec<GalleryEntry>> {
        let file = self.file();
        if !file.exists() {
            return Ok(vec![]);
        }
        let data = std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
        postcard::from_bytes(&data).with_context(|| format!("decoding {}", file.display()))
    }

    /// Insert or replace the entry with the same identity key
    pub fn upsert(&self, entry: GalleryEntry) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.load()?;
        match entries.iter_mut().find(|e| e.identity_key == entry.identity_key) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
        self.write(&entries)
    }

    /// Returns whether the identity existed
    pub fn remove(&self, identity_key: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.load()?;
        let before = entries.len();
        entries.retain(|e| e.identity_key != identity_key);
        if entries.len() == before {
            return Ok(false);
        }
        self.write(&entries)?;
        Ok(true)
    }

    pub fn purge(&self) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let file = self.file();
        if file.exists() {
            std::fs::remove_file(&file).with_context(|| format!("removing {}", file.display()))?;
        }
        Ok(())
    }

    fn write(&self, entries: &[GalleryEntry]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let data = postcard::to_allocvec(entries)?;
        // readers only ever see a complete file
        let tmp = self.dir.join(format!("{}.tmp", GALLERY_FILE));
        std::fs::write(&tmp, data).with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, self.file()).context("replacing gallery file")?;
        Ok(())
    }
}

impl GallerySource for GalleryStore {
    fn list_entries(&self) -> Result<Vec<GalleryEntry>> {
        self.load()
    }
}

impl GalleryWriter for GalleryStore {
    fn upsert(&self, entry: GalleryEntry) -> Result<()> {
        GalleryStore::upsert(self, entry)
    }

    fn remove(&self, identity_key: &str) -> Result<bool> {
        GalleryStore::remove(self, identity_key)
    }
}
