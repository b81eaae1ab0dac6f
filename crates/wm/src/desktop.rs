// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspaces: the current-desktop switch, per-client desktop assignment,
//! sticky clients, show-desktop mode, and strut-derived workareas.

use tracing::debug;

use crate::client::{ClientHot, ClientState, Dirty, NetState, WindowType};
use crate::geom::Rect;
use crate::proto::STICKY_DESKTOP;
use crate::slotmap::Handle;
use crate::wm::{RootDirty, Wm};

impl Wm {
    /// The visibility predicate: a client should be on screen iff it sits on
    /// the current desktop (or is sticky), is not hidden, and show-desktop
    /// mode does not cover it.
    pub fn visible_now(&self, hot: &ClientHot) -> bool {
        if hot.net_state.contains(NetState::HIDDEN) {
            return false;
        }
        if self.root.showing_desktop
            && !matches!(hot.wtype, WindowType::Desktop | WindowType::Dock)
        {
            return false;
        }
        hot.on_desktop(self.root.current_desktop)
    }

    /// Re-evaluate visibility for every adopted client; commit performs the
    /// actual map/unmap transitions.
    pub fn apply_visibility_all(&mut self) {
        for h in self.clients.handles() {
            self.apply_visibility(h);
        }
    }

    pub fn apply_visibility(&mut self, h: Handle) {
        let Some(hot) = self.clients.hot(h) else { return };
        let target = self.visible_now(hot);
        let mismatch = match hot.state {
            ClientState::Mapped => !target,
            ClientState::Unmapped => target,
            // First commit always decides.
            ClientState::Ready => true,
            _ => false,
        };
        if mismatch {
            self.mark_dirty(h, Dirty::STATE);
        }
    }

    /// Switch the current desktop. Out-of-range indices are clamped.
    pub fn switch_desktop(&mut self, desktop: u32) {
        let desktop = desktop.min(self.root.desktops - 1);
        if desktop == self.root.current_desktop {
            return;
        }
        debug!(from = self.root.current_desktop, to = desktop, "desktop switch");
        self.root.current_desktop = desktop;
        self.mark_root_dirty(RootDirty::CURRENT_DESKTOP | RootDirty::WORKAREA);
        self.apply_visibility_all();
        if !self.focusable(self.focused) {
            let mru = self.focus_history();
            let next = mru.into_iter().find(|h| {
                self.clients
                    .hot(*h)
                    .map(|c| c.on_desktop(desktop) && !c.net_state.contains(NetState::HIDDEN))
                    .unwrap_or(false)
            });
            // The replacement is only mapped by this tick's commit, and
            // set_focus no-ops on unmapped clients; route it through the
            // pending-focus slot commit resolves after the map transitions.
            self.pending_focus = Some(next.unwrap_or(Handle::INVALID));
        }
    }

    /// Move a client to a desktop; `STICKY_DESKTOP` pins it everywhere,
    /// out-of-range indices clamp to the last desktop.
    pub fn set_client_desktop(&mut self, h: Handle, desktop: u32) {
        let desktop =
            if desktop == STICKY_DESKTOP { desktop } else { desktop.min(self.root.desktops - 1) };
        let Some(hot) = self.clients.hot_mut(h) else { return };
        if hot.desktop == desktop {
            return;
        }
        hot.desktop = desktop;
        if desktop == STICKY_DESKTOP {
            hot.net_state |= NetState::STICKY;
        } else {
            hot.net_state -= NetState::STICKY;
        }
        let has_strut = self.clients.cold(h).map(|c| c.strut.is_some()).unwrap_or(false);
        self.mark_dirty(h, Dirty::STATE);
        if has_strut {
            self.mark_root_dirty(RootDirty::WORKAREA);
        }
        self.apply_visibility(h);
    }

    /// Toggle show-desktop mode.
    pub fn show_desktop(&mut self, on: bool) {
        if self.root.showing_desktop == on {
            return;
        }
        self.root.showing_desktop = on;
        self.mark_root_dirty(RootDirty::SHOWING_DESKTOP);
        self.apply_visibility_all();
        if on {
            self.set_focus(Handle::INVALID);
        }
    }

    /// Iconify: hidden-state add, commit unmaps and writes `WM_STATE` Iconic.
    pub fn iconify(&mut self, h: Handle) {
        let Some(hot) = self.clients.hot_mut(h) else { return };
        if hot.net_state.contains(NetState::HIDDEN) {
            return;
        }
        hot.net_state |= NetState::HIDDEN;
        self.mark_dirty(h, Dirty::STATE);
        if self.focused == h {
            self.focus_after_unmanage(h);
        }
    }

    /// Restore an iconified client.
    pub fn deiconify(&mut self, h: Handle) {
        let Some(hot) = self.clients.hot_mut(h) else { return };
        if !hot.net_state.contains(NetState::HIDDEN) {
            return;
        }
        hot.net_state -= NetState::HIDDEN;
        self.mark_dirty(h, Dirty::STATE);
    }

    /// Workarea per desktop: the screen minus strut reservations of mapped
    /// clients visible on that desktop.
    pub fn compute_workareas(&self) -> Vec<Rect> {
        let mut areas = Vec::with_capacity(self.root.desktops as usize);
        for d in 0..self.root.desktops {
            let mut left = 0u32;
            let mut right = 0u32;
            let mut top = 0u32;
            let mut bottom = 0u32;
            for (_, hot, cold) in self.clients.iter() {
                if hot.state != ClientState::Mapped || !hot.on_desktop(d) {
                    continue;
                }
                if let Some(strut) = cold.strut {
                    left = left.max(strut.left);
                    right = right.max(strut.right);
                    top = top.max(strut.top);
                    bottom = bottom.max(strut.bottom);
                }
            }
            let w = self.screen.w.saturating_sub(left + right).max(1);
            let h = self.screen.h.saturating_sub(top + bottom).max(1);
            areas.push(Rect::new(self.screen.x + left as i32, self.screen.y + top as i32, w, h));
        }
        areas
    }

    /// Workarea of the current desktop, for placement.
    pub fn current_workarea(&self) -> Rect {
        self.compute_workareas()
            .get(self.root.current_desktop as usize)
            .copied()
            .unwrap_or(self.screen)
    }
}

#[cfg(test)]
#[path = "desktop_tests.rs"]
mod tests;
