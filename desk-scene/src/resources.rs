//! Geometry/material resources backing drawable nodes.

use std::collections::HashMap;
use std::fmt;

use desk_core::MeshSpec;

/// Opaque handle to one mesh resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceHandle(u64);

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "res#{}", self.0)
    }
}

/// Hands out handles per mesh and releases them synchronously.
#[derive(Debug, Default)]
pub struct ResourcePool {
    next_id: u64,
    live: HashMap<ResourceHandle, MeshSpec>,
}

impl ResourcePool {
    /// An empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a resource for `spec`.
    pub fn acquire(&mut self, spec: MeshSpec) -> ResourceHandle {
        let handle = ResourceHandle(self.next_id);
        self.next_id += 1;
        self.live.insert(handle, spec);
        handle
    }

    /// Free a resource. Returns `false` for unknown or already released handles.
    pub fn release(&mut self, handle: ResourceHandle) -> bool {
        let released = self.live.remove(&handle).is_some();
        if !released {
            tracing::trace!("release of unknown resource {handle}");
        }
        released
    }

    /// The mesh a handle was created for.
    #[must_use]
    pub fn get(&self, handle: ResourceHandle) -> Option<&MeshSpec> {
        self.live.get(&handle)
    }

    /// Resources currently held.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Handles ever allocated.
    #[must_use]
    pub fn total_acquired(&self) -> u64 {
        self.next_id
    }
}
