// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Focus engine: the MRU history list and the focus policy.
//!
//! History is an intrusive doubly-linked list threaded through client hot
//! records, so unlink is O(1) and a freed slot can never be reached through
//! a stale link: handles are validated on every hop.

use tracing::debug;

use crate::client::{ClientState, Dirty, WindowType};
use crate::proto::{Atom, FocusRevert, Request, CURRENT_TIME};
use crate::slotmap::Handle;
use crate::wm::{RootDirty, Wm};

/// MRU focus history; `head` is the most recently focused client.
#[derive(Debug, Default)]
pub struct FocusHistory {
    pub head: Handle,
}

impl FocusHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Wm {
    /// Insert a freshly adopted client at the head of the history.
    pub fn focus_history_insert(&mut self, h: Handle) {
        if !self.clients.live(h) {
            return;
        }
        self.focus_history_unlink(h);
        let old_head = self.focus.head;
        if let Some(hot) = self.clients.hot_mut(h) {
            hot.focus_prev = Handle::INVALID;
            hot.focus_next = old_head;
        }
        if let Some(hot) = self.clients.hot_mut(old_head) {
            hot.focus_prev = h;
        }
        self.focus.head = h;
    }

    pub fn focus_history_unlink(&mut self, h: Handle) {
        let Some(hot) = self.clients.hot(h) else { return };
        let (prev, next) = (hot.focus_prev, hot.focus_next);
        if self.focus.head == h {
            self.focus.head = next;
        }
        if let Some(p) = self.clients.hot_mut(prev) {
            p.focus_next = next;
        }
        if let Some(n) = self.clients.hot_mut(next) {
            n.focus_prev = prev;
        }
        if let Some(hot) = self.clients.hot_mut(h) {
            hot.focus_prev = Handle::INVALID;
            hot.focus_next = Handle::INVALID;
        }
    }

    /// History in MRU order. Bounded by the slot count to survive link
    /// corruption.
    pub fn focus_history(&self) -> Vec<Handle> {
        let mut out = Vec::new();
        let mut cur = self.focus.head;
        let cap = self.clients.len() + 1;
        while cur.is_valid() && out.len() < cap {
            out.push(cur);
            cur = self.clients.hot(cur).map(|c| c.focus_next).unwrap_or(Handle::INVALID);
        }
        out
    }

    /// Whether a client may receive focus right now: mapped, on the current
    /// desktop, not hidden, not a reserved type, and not hidden by
    /// show-desktop mode.
    pub fn focusable(&self, h: Handle) -> bool {
        let Some(hot) = self.clients.hot(h) else { return false };
        hot.state == ClientState::Mapped
            && hot.on_desktop(self.root.current_desktop)
            && !hot.net_state.contains(crate::client::NetState::HIDDEN)
            && !hot.wtype.reserved()
            && !(self.root.showing_desktop && hot.wtype != WindowType::Desktop)
    }

    /// Focus policy entry point.
    ///
    /// `INVALID` reverts input focus to the root and clears
    /// `_NET_ACTIVE_WINDOW`; anything not currently mapped is a no-op.
    pub fn set_focus(&mut self, h: Handle) {
        if !h.is_valid() {
            let root = self.root.window;
            self.submit(Request::SetInputFocus { focus: root, revert: FocusRevert::PointerRoot });
            self.focused = Handle::INVALID;
            self.mark_root_dirty(RootDirty::ACTIVE_WINDOW);
            return;
        }
        let Some(hot) = self.clients.hot(h).copied() else { return };
        if hot.state != ClientState::Mapped {
            return;
        }

        self.focus_history_insert(h);

        let cold = self.clients.cold(h);
        let protocols = cold.map(|c| c.protocols).unwrap_or_default();
        let colormap = cold.map(|c| c.colormap).unwrap_or(crate::proto::Xid::NONE);
        let input_hint = hot.flags.contains(crate::client::ClientFlags::INPUT_HINT);
        let take_focus = protocols.contains(crate::client::Protocols::TAKE_FOCUS);

        if input_hint {
            self.submit(Request::SetInputFocus {
                focus: hot.window,
                revert: FocusRevert::PointerRoot,
            });
        }
        if take_focus {
            let time = if hot.user_time != 0 { hot.user_time } else { CURRENT_TIME };
            self.submit(Request::SendClientMessage {
                window: hot.window,
                message_type: Atom::WmProtocols,
                data: [Atom::WmTakeFocus.word(), time, 0, 0, 0],
            });
        }
        if !colormap.is_none() {
            self.submit(Request::InstallColormap { colormap });
        }

        self.focused = h;
        self.mark_dirty(h, Dirty::FOCUS);
        self.mark_root_dirty(RootDirty::ACTIVE_WINDOW);

        if self.config.focus_raise {
            let mut stack = std::mem::take(&mut self.stack);
            stack.raise(&mut self.clients, h);
            self.stack = stack;
        }
    }

    /// Replacement focus after the focused client goes away: the transient
    /// parent chain first, then the MRU history, then nothing.
    pub fn focus_after_unmanage(&mut self, gone: Handle) {
        if self.focused != gone {
            return;
        }
        let mut candidate = self
            .clients
            .hot(gone)
            .map(|c| c.transient_for)
            .unwrap_or(Handle::INVALID);
        let mut depth = 0;
        while candidate.is_valid() && depth < 32 {
            if self.focusable(candidate) {
                debug!(parent = candidate.index(), "focus falls back to transient parent");
                self.set_focus(candidate);
                return;
            }
            candidate = self
                .clients
                .hot(candidate)
                .map(|c| c.transient_for)
                .unwrap_or(Handle::INVALID);
            depth += 1;
        }
        let mru = self.focus_history();
        for h in mru {
            if h != gone && self.focusable(h) {
                self.set_focus(h);
                return;
            }
        }
        self.set_focus(Handle::INVALID);
    }

    /// Walk the history from the current head and return the next focusable
    /// entry in the requested direction. O(N) with a safety cap.
    pub fn cycle_focus(&mut self, forward: bool) -> Handle {
        let mut order = self.focus_history();
        if order.is_empty() {
            return Handle::INVALID;
        }
        if !forward {
            order.reverse();
        }
        let start = order.iter().position(|h| *h == self.focused).unwrap_or(0);
        let n = order.len();
        for step in 1..=n {
            let h = order[(start + step) % n];
            if self.focusable(h) {
                return h;
            }
        }
        Handle::INVALID
    }
}

#[cfg(test)]
#[path = "focus_tests.rs"]
mod tests;
