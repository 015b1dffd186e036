//! Shared, synchronized ownership of one `NodeDetails`.
//!
//! Every read and write goes through a closure that runs while the lock is
//! held. The closure receives a borrow whose lifetime ends with the call, so
//! no caller can keep a reference into the guarded value afterwards.

use std::sync::{Arc, RwLock};

use crate::node::{EntryPoint, NodeDetails, PublicKey};

#[derive(Debug, Clone, Default)]
pub struct SharedNodeDetails {
    inner: Arc<RwLock<NodeDetails>>,
}

impl SharedNodeDetails {
    pub fn new(details: NodeDetails) -> Self {
        Self {
            inner: Arc::new(RwLock::new(details)),
        }
    }

    /// Run `f` with exclusive mutable access. Other accessors block until it returns.
    ///
    /// Keep `f` short and free of I/O.
    pub fn with_details<R>(&self, f: impl FnOnce(&mut NodeDetails) -> R) -> R {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    /// Run `f` with shared read access.
    pub fn read<R>(&self, f: impl FnOnce(&NodeDetails) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }

    /// Consistent snapshot.
    pub fn details(&self) -> NodeDetails {
        self.read(NodeDetails::clone)
    }

    pub fn public_key(&self) -> PublicKey {
        self.read(|d| d.public_key.clone())
    }

    pub fn default_port(&self) -> u16 {
        self.read(|d| d.default_port)
    }

    pub fn default_http_port(&self) -> u16 {
        self.read(|d| d.default_http_port)
    }

    pub fn add_entry_point(&self, entry: EntryPoint) {
        self.with_details(|d| d.add_entry_point(entry));
    }
}
