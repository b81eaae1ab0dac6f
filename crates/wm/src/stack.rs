// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stacking engine: six ordered layers whose concatenation is the global
//! stack, bottom to top.
//!
//! List membership is mirrored into each client's hot record
//! (`layer`, `stacking_index`), so the mapped⇔stacked invariant is checkable
//! from either side. Restacks only mark `Dirty::STACK`; the commit phase
//! emits the minimal configure masks.

use crate::client::{ClientSet, Dirty, Layer};
use crate::slotmap::Handle;

/// Transient chains are short; anything deeper is treated as corrupt.
const MAX_TRANSIENT_DEPTH: u32 = 32;

#[derive(Debug, Default)]
pub struct StackSet {
    layers: [Vec<Handle>; 6],
}

impl StackSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layer(&self, layer: Layer) -> &[Handle] {
        &self.layers[layer as usize]
    }

    pub fn contains(&self, h: Handle) -> bool {
        self.layers.iter().any(|l| l.contains(&h))
    }

    /// Global stacking order, bottom to top. This is exactly the order
    /// published as `_NET_CLIENT_LIST_STACKING`.
    pub fn global_order(&self) -> Vec<Handle> {
        self.layers.iter().flatten().copied().collect()
    }

    /// The handle immediately below `h` in global order, if any.
    pub fn predecessor(&self, h: Handle) -> Option<Handle> {
        let order = self.global_order();
        let pos = order.iter().position(|x| *x == h)?;
        (pos > 0).then(|| order[pos - 1])
    }

    /// Add a client to the top of its configured layer.
    pub fn insert(&mut self, clients: &mut ClientSet, h: Handle) {
        if self.contains(h) {
            return;
        }
        let Some(hot) = clients.hot(h) else { return };
        let layer = hot.layer;
        self.layers[layer as usize].push(h);
        self.reindex(clients, layer);
        if let Some(hot) = clients.hot_mut(h) {
            hot.dirty |= Dirty::STACK;
        }
    }

    /// Move a client to the top of its layer, then restack its transient
    /// children above it, most recently raised on top.
    pub fn raise(&mut self, clients: &mut ClientSet, h: Handle) {
        self.raise_at_depth(clients, h, 0);
    }

    fn raise_at_depth(&mut self, clients: &mut ClientSet, h: Handle, depth: u32) {
        if depth >= MAX_TRANSIENT_DEPTH {
            return;
        }
        let Some(hot) = clients.hot(h) else { return };
        let layer = hot.layer;
        let mut child = hot.transients_head;
        let list = &mut self.layers[layer as usize];
        let Some(pos) = list.iter().position(|x| *x == h) else { return };
        list.remove(pos);
        list.push(h);
        self.reindex(clients, layer);
        if let Some(hot) = clients.hot_mut(h) {
            hot.dirty |= Dirty::STACK;
        }
        while child.is_valid() {
            let next = clients.hot(child).map(|c| c.transient_next).unwrap_or(Handle::INVALID);
            self.raise_at_depth(clients, child, depth + 1);
            child = next;
        }
    }

    /// Move a client to the bottom of its layer.
    pub fn lower(&mut self, clients: &mut ClientSet, h: Handle) {
        let Some(hot) = clients.hot(h) else { return };
        let layer = hot.layer;
        let list = &mut self.layers[layer as usize];
        let Some(pos) = list.iter().position(|x| *x == h) else { return };
        list.remove(pos);
        list.insert(0, h);
        self.reindex(clients, layer);
        if let Some(hot) = clients.hot_mut(h) {
            hot.dirty |= Dirty::STACK;
        }
    }

    /// Re-home a client whose type or state implies a different layer.
    ///
    /// A client that is not currently stacked (not mapped) only has its
    /// layer field updated; it enters the new layer when it maps.
    pub fn move_to_layer(&mut self, clients: &mut ClientSet, h: Handle, layer: Layer) {
        let Some(hot) = clients.hot(h) else { return };
        if hot.layer == layer && self.contains(h) {
            return;
        }
        let mut was_stacked = false;
        for old in Layer::ALL {
            if let Some(pos) = self.layers[old as usize].iter().position(|x| *x == h) {
                self.layers[old as usize].remove(pos);
                self.reindex(clients, old);
                was_stacked = true;
                break;
            }
        }
        if let Some(hot) = clients.hot_mut(h) {
            hot.layer = layer;
        }
        if !was_stacked {
            return;
        }
        self.layers[layer as usize].push(h);
        self.reindex(clients, layer);
        if let Some(hot) = clients.hot_mut(h) {
            hot.dirty |= Dirty::STACK;
        }
    }

    /// Remove on unmanage.
    pub fn remove(&mut self, clients: &mut ClientSet, h: Handle) {
        for layer in Layer::ALL {
            let list = &mut self.layers[layer as usize];
            if let Some(pos) = list.iter().position(|x| *x == h) {
                list.remove(pos);
                self.reindex(clients, layer);
                return;
            }
        }
    }

    fn reindex(&self, clients: &mut ClientSet, layer: Layer) {
        for (i, h) in self.layers[layer as usize].iter().enumerate() {
            if let Some(hot) = clients.hot_mut(*h) {
                hot.stacking_index = i as u32;
            }
        }
    }
}

#[cfg(test)]
#[path = "stack_tests.rs"]
mod tests;
