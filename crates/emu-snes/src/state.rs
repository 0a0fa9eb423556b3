//! State snapshots: freeze/thaw through the core, a rewind ring, and file
//! persistence.

use std::collections::VecDeque;
use std::io;
use std::path::Path;

use emu_core::{Core, UnfreezeStatus};
use thiserror::Error;
use tracing::warn;

use crate::Engine;

/// Query the blob size, allocate and freeze. Empty on any failure.
pub(crate) fn freeze<C: Core>(core: &C) -> Vec<u8> {
    let size = core.freeze_size();
    if size == 0 {
        return Vec::new();
    }
    let mut blob = vec![0; size];
    if core.freeze(&mut blob) {
        blob
    } else {
        warn!(size, "core refused to freeze");
        Vec::new()
    }
}

/// Hand `data` to the core unexamined.
pub(crate) fn thaw<C: Core>(core: &mut C, data: &[u8]) -> bool {
    match core.unfreeze(data) {
        UnfreezeStatus::Success => true,
        status => {
            warn!(?status, len = data.len(), "state blob rejected");
            false
        }
    }
}

/// Bounded ring of state blobs, newest last.
#[derive(Debug, Clone)]
pub struct Rewind {
    snapshots: VecDeque<Vec<u8>>,
    capacity: usize,
}

impl Rewind {
    /// A ring holding at most `capacity` snapshots (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            snapshots: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Store a snapshot, evicting the oldest when full. Empty blobs (a
    /// failed save) are not stored.
    pub fn push(&mut self, blob: Vec<u8>) {
        if blob.is_empty() {
            return;
        }
        if self.snapshots.len() == self.capacity {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(blob);
    }

    /// Take the newest snapshot.
    pub fn pop(&mut self) -> Option<Vec<u8>> {
        self.snapshots.pop_back()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}

#[derive(Debug, Error)]
pub enum StateFileError {
    #[error("no ROM is loaded")]
    NotLoaded,
    #[error("the core produced no state")]
    Empty,
    #[error("the core rejected the state")]
    Rejected,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Write a snapshot to `path`. Returns the blob size.
pub fn save_state_file<C: Core>(engine: &Engine<C>, path: &Path) -> Result<usize, StateFileError> {
    if !engine.is_initialized() {
        return Err(StateFileError::NotLoaded);
    }
    let blob = engine.save_state();
    if blob.is_empty() {
        return Err(StateFileError::Empty);
    }
    std::fs::write(path, &blob)?;
    Ok(blob.len())
}

/// Restore a snapshot from `path`.
pub fn load_state_file<C: Core>(engine: &mut Engine<C>, path: &Path) -> Result<(), StateFileError> {
    if !engine.is_initialized() {
        return Err(StateFileError::NotLoaded);
    }
    let blob = std::fs::read(path)?;
    if engine.load_state(&blob) {
        Ok(())
    } else {
        Err(StateFileError::Rejected)
    }
}
