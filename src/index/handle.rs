use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::JoinHandle;

use anyhow::Result;

use super::{build, Backend, GalleryEntry, SearchHit, VectorIndex};

/// Where a rebuild reads the gallery from
pub trait GallerySource: Send + Sync {
    fn list_entries(&self) -> Result<Vec<GalleryEntry>>;
}

impl GallerySource for Vec<GalleryEntry> {
    fn list_entries(&self) -> Result<Vec<GalleryEntry>> {
        Ok(self.clone())
    }
}

struct Installed {
    ticket: u64,
    index: Arc<dyn VectorIndex>,
}

/// Owner of the active snapshot.
///
/// Readers clone the current `Arc` and query it without holding any lock, so a
/// rebuild in progress never blocks them and they never see a half-built index.
/// Each rebuild takes a ticket when it is requested; a snapshot is only
/// installed if its ticket is newer than the active one.
pub struct IndexHandle {
    backend: Backend,
    active: RwLock<Installed>,
    tickets: AtomicU64,
}

impl IndexHandle {
    /// Backend is resolved here, once.
    pub fn new(backend: Backend) -> Self {
        let backend = backend.resolve();
        log::debug!("similarity index backend: {:?}", backend);
        Self {
            backend,
            active: RwLock::new(Installed {
                ticket: 0,
                index: build(backend, &[]),
            }),
            tickets: AtomicU64::new(0),
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn snapshot(&self) -> Arc<dyn VectorIndex> {
        let guard = self.active.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard.index)
    }

    /// Ticket of the installed snapshot, 0 before the first rebuild
    pub fn generation(&self) -> u64 {
        self.active.read().unwrap_or_else(PoisonError::into_inner).ticket
    }

    pub fn query(&self, vector: &[f32], k: usize) -> Vec<SearchHit> {
        self.snapshot().query(vector, k)
    }

    /// Build a snapshot from `entries` on the calling thread and install it.
    ///
    /// Returns false if a newer rebuild finished first.
    pub fn rebuild(&self, entries: &[GalleryEntry]) -> bool {
        let ticket = self.next_ticket();
        self.install(ticket, build(self.backend, entries))
    }

    /// Rebuild from `source` on a background thread.
    ///
    /// The caller does not need to wait: until the new snapshot is installed,
    /// queries keep answering from the previous one. If the source fails, the
    /// previous snapshot stays active.
    pub fn spawn_rebuild<S>(self: &Arc<Self>, source: Arc<S>) -> std::io::Result<JoinHandle<()>>
    where
        S: GallerySource + ?Sized + 'static,
    {
        let ticket = self.next_ticket();
        let handle = Arc::clone(self);
        std::thread::Builder::new()
            .name("facefuse-rebuild".into())
            .spawn(move || match source.list_entries() {
                Ok(entries) => {
                    handle.install(ticket, build(handle.backend, &entries));
                }
                Err(e) => log::error!("index rebuild #{} aborted, gallery unreadable: {:#}", ticket, e),
            })
    }

    fn next_ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn install(&self, ticket: u64, index: Arc<dyn VectorIndex>) -> bool {
        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
        if ticket <= active.ticket {
            log::debug!(
                "dropping stale snapshot #{} (active is #{})",
                ticket,
                active.ticket
            );
            return false;
        }
        log::info!(
            "installed index snapshot #{}: {} row(s), dim {}, {:?}",
            ticket,
            index.len(),
            index.dimension(),
            index.backend()
        );
        *active = Installed { ticket, index };
        true
    }
}

impl Default for IndexHandle {
    fn default() -> Self {
        Self::new(Backend::Auto)
    }
}
