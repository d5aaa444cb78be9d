// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Per-item operation context cache.
//!
//! Every sampled read runs under the context of the session that created the
//! item. The cache keeps the last context per item id until it is older than
//! the configured TTL or the item's session or identity changed.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use uanode_core::NodeId;

use crate::context::OperationContext;

#[derive(Debug, Clone)]
struct CachedContext {
    context: OperationContext,
    created_at: Instant,
}

/// Contexts keyed by monitored item id.
#[derive(Debug)]
pub struct ContextCache {
    ttl: Duration,
    entries: HashMap<u32, CachedContext>,
}

impl ContextCache {
    /// Creates a cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Configured time to live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached context for `item_id`, refreshing it from `owner`
    /// when missing, expired or stale.
    pub fn get(&mut self, item_id: u32, owner: &OperationContext) -> OperationContext {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(&item_id) {
            let fresh = now.duration_since(entry.created_at) < self.ttl;
            let same_owner = entry.context.session_id == owner.session_id
                && entry.context.identity == owner.identity;
            if fresh && same_owner {
                return entry.context.clone();
            }
        }

        tracing::trace!(item_id, "Refreshing cached operation context");
        self.entries.insert(
            item_id,
            CachedContext {
                context: owner.clone(),
                created_at: now,
            },
        );
        owner.clone()
    }

    /// Forgets the context of one item.
    pub fn remove(&mut self, item_id: u32) -> bool {
        self.entries.remove(&item_id).is_some()
    }

    /// Forgets every context of `session_id`. Returns how many were dropped.
    pub fn remove_session(&mut self, session_id: &NodeId) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.context.session_id.as_ref() != Some(session_id));
        before - self.entries.len()
    }

    /// Drops expired entries.
    pub fn purge_expired(&mut self) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.created_at.elapsed() < ttl);
        before - self.entries.len()
    }

    /// Number of cached contexts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
