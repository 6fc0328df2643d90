//! Enrollment and recognition on top of a gallery store and a live index.
//!
//! Writes go to the store first and then dispatch a background rebuild; they
//! do not wait for it. Until that rebuild installs its snapshot, recognition
//! keeps answering from the previous gallery, so a lookup issued right after
//! an enrollment may not see it yet.

use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::enroll::{self, EnrollOptions};
use crate::fusion::FusedIdentityVector;
use crate::index::{GalleryEntry, GallerySource, IndexHandle, SearchHit};
use crate::matcher::{Match, Matcher};
use crate::FaceObservation;

pub struct FaceService<S> {
    store: Arc<S>,
    index: Arc<IndexHandle>,
    matcher: Matcher,
    options: EnrollOptions,
}

/// Store-side writes the service needs besides listing
pub trait GalleryWriter: GallerySource {
    fn upsert(&self, entry: GalleryEntry) -> Result<()>;
    fn remove(&self, identity_key: &str) -> Result<bool>;
}

impl<S: GalleryWriter + 'static> FaceService<S> {
    /// Creates the index handle and loads the current gallery synchronously.
    pub fn new(store: Arc<S>, config: &Config) -> Result<Self> {
        let index = Arc::new(IndexHandle::new(config.index_backend));
        let entries = store.list_entries().context("loading gallery")?;
        index.rebuild(&entries);
        Ok(Self {
            matcher: Matcher::new(Arc::clone(&index), config.threshold),
            store,
            index,
            options: config.enroll_options(),
        })
    }

    pub fn index(&self) -> &Arc<IndexHandle> {
        &self.index
    }

    /// Fuse `observations`, persist the result under `identity_key` and
    /// schedule an index rebuild.
    pub fn enroll(&self, identity_key: &str, observations: &[FaceObservation]) -> Result<FusedIdentityVector> {
        let fused = enroll::fuse_observations(observations, &self.options)?;
        self.store
            .upsert(GalleryEntry {
                identity_key: identity_key.to_string(),
                vector: fused.vector.clone(),
                version_tag: fused.version.clone(),
            })
            .with_context(|| format!("storing identity {}", identity_key))?;
        self.schedule_rebuild();
        Ok(fused)
    }

    pub fn remove(&self, identity_key: &str) -> Result<bool> {
        let removed = self.store.remove(identity_key)?;
        if removed {
            self.schedule_rebuild();
        }
        Ok(removed)
    }

    pub fn recognize(&self, query: &[f32]) -> Option<Match> {
        self.matcher.match_one(query)
    }

    pub fn search(&self, query: &[f32], k: usize) -> Vec<SearchHit> {
        self.index.query(query, k)
    }

    /// Returns the rebuild's join handle for callers that do want to wait.
    pub fn schedule_rebuild(&self) -> Option<JoinHandle<()>> {
        match self.index.spawn_rebuild(Arc::clone(&self.store)) {
            Ok(job) => Some(job),
            Err(e) => {
                log::error!("could not start index rebuild: {}", e);
                None
            }
        }
    }
}
