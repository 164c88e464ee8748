use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

use crate::models::video::VideoFile;

/// Tracks local preview handles for selected files.
///
/// A handle is live from [`acquire`](Self::acquire) until its guard is
/// dropped, whichever way the owning operation exits.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    live: Arc<Mutex<HashMap<Uuid, String>>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, file: &VideoFile) -> PreviewGuard {
        let id = Uuid::new_v4();
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, file.name.clone());

        tracing::debug!(preview = %id, file = %file.name, "Preview acquired");

        PreviewGuard {
            id,
            live: Arc::clone(&self.live),
        }
    }

    /// Number of previews not yet released.
    pub fn live(&self) -> usize {
        self.live.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Releases its preview on drop.
#[derive(Debug)]
pub struct PreviewGuard {
    id: Uuid,
    live: Arc<Mutex<HashMap<Uuid, String>>>,
}

impl PreviewGuard {
    /// Handle a presentation layer can resolve to the local preview.
    pub fn handle(&self) -> String {
        format!("preview:{}", self.id)
    }
}

impl Drop for PreviewGuard {
    fn drop(&mut self) {
        let released = self
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);

        if let Some(name) = released {
            tracing::debug!(preview = %self.id, file = %name, "Preview released");
        }
    }
}
