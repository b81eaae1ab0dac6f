// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Phase (d): flush dirty clients and root properties, then the transport.
//!
//! Sub-passes run in a fixed order: map/unmap transitions (with the
//! first-map focus decision), deferred focus, geometry, stacking, per-client
//! properties and chrome, root properties, transport flush, arena reset.
//! After commit every dirty bit is zero.

use std::time::Instant;

use tracing::{error, trace};

use crate::client::{ClientFlags, ClientState, Dirty, WindowType};
use crate::proto::{
    Atom, ConfigureValues, PropValue, Request, StackMode, WM_STATE_ICONIC, WM_STATE_NORMAL,
};
use crate::slotmap::Handle;
use crate::wm::Wm;

impl Wm {
    pub(crate) fn commit(&mut self, _now: Instant) {
        // (1) Visibility transitions.
        for h in self.clients.handles() {
            let Some(hot) = self.clients.hot(h).copied() else { continue };
            if !hot.dirty.contains(Dirty::STATE) && hot.state != ClientState::Ready {
                continue;
            }
            let visible = self.visible_now(&hot);
            match (hot.state, visible) {
                (ClientState::Ready, true) | (ClientState::Unmapped, true) => self.do_map(h),
                (ClientState::Ready, false) => {
                    if let Some(hot) = self.clients.hot_mut(h) {
                        hot.state = ClientState::Unmapped;
                    }
                }
                (ClientState::Mapped, false) => self.do_unmap(h),
                _ => {}
            }
        }

        // (2) Focus deferred until its target is mapped.
        if let Some(pending) = self.pending_focus.take() {
            if !pending.is_valid() {
                self.set_focus(Handle::INVALID);
            } else if self.focusable(pending) {
                self.set_focus(pending);
            }
        }

        // (3) Geometry.
        for h in self.clients.handles() {
            self.flush_geometry(h);
        }

        // (4) Stacking, bottom to top so siblings are already placed. Each
        // client restacks at most once per tick.
        for h in self.stack.global_order() {
            let dirty = self.clients.hot(h).map(|c| c.dirty).unwrap_or_default();
            if dirty.contains(Dirty::STACK) {
                self.flush_stacking(h);
            }
        }

        // (5) Per-client properties and chrome.
        for h in self.clients.handles() {
            self.flush_client_props(h);
        }

        // (6) Root properties.
        self.publish_root();

        // (7) Transport flush; would-block marks the tick for retry.
        match self.transport.flush() {
            Ok(true) => self.pending_flush = false,
            Ok(false) => self.pending_flush = true,
            Err(e) => {
                error!(err = %e, "transport flush failed");
                self.shutdown = true;
            }
        }

        // (8) Arena reset.
        self.buckets.reset();

        #[cfg(debug_assertions)]
        for (_, hot, _) in self.clients.iter() {
            debug_assert!(hot.dirty.is_empty(), "dirty bits survived commit");
        }
    }

    fn do_map(&mut self, h: Handle) {
        let Some(hot) = self.clients.hot(h).copied() else { return };
        self.submit(Request::MapWindow { window: hot.frame });
        self.submit(Request::MapWindow { window: hot.window });
        if let Some(hot) = self.clients.hot_mut(h) {
            hot.state = ClientState::Mapped;
            hot.dirty |= Dirty::STATE;
        }
        // Mapped clients and only mapped clients occupy a layer slot.
        let mut stack = std::mem::take(&mut self.stack);
        stack.insert(&mut self.clients, h);
        self.stack = stack;
        self.mark_root_dirty(crate::wm::RootDirty::CLIENT_LIST_STACKING);
        let first = !hot.flags.contains(ClientFlags::FIRST_MAP_DONE);
        if first {
            if let Some(hot) = self.clients.hot_mut(h) {
                hot.flags |= ClientFlags::FIRST_MAP_DONE;
            }
            if self.focus_on_map(h) {
                self.set_focus(h);
            }
        }
    }

    fn do_unmap(&mut self, h: Handle) {
        let Some(hot) = self.clients.hot(h).copied() else { return };
        self.submit(Request::UnmapWindow { window: hot.frame });
        self.submit(Request::UnmapWindow { window: hot.window });
        if let Some(hot) = self.clients.hot_mut(h) {
            hot.state = ClientState::Unmapped;
            // Swallow the UnmapNotify our own unmap generates.
            hot.ignore_unmaps += 1;
            hot.dirty |= Dirty::STATE;
        }
        let mut stack = std::mem::take(&mut self.stack);
        stack.remove(&mut self.clients, h);
        self.stack = stack;
        self.mark_root_dirty(crate::wm::RootDirty::CLIENT_LIST_STACKING);
        if self.focused == h {
            self.focused = Handle::INVALID;
            self.mark_root_dirty(crate::wm::RootDirty::ACTIVE_WINDOW);
        }
    }

    /// Focus-on-map: rules override, then the dialog/transient heuristic;
    /// reserved types never take focus.
    fn focus_on_map(&self, h: Handle) -> bool {
        let Some(hot) = self.clients.hot(h) else { return false };
        match hot.focus_override {
            crate::client::FocusOverride::Never => false,
            crate::client::FocusOverride::Always => true,
            crate::client::FocusOverride::Auto => {
                if hot.wtype.reserved() {
                    return false;
                }
                hot.wtype == WindowType::Dialog || self.clients.live(hot.transient_for)
            }
        }
    }

    fn flush_geometry(&mut self, h: Handle) {
        let Some(hot) = self.clients.hot(h).copied() else { return };
        if !hot.dirty.contains(Dirty::GEOM) {
            return;
        }
        let synth_only = hot.flags.contains(ClientFlags::SYNTH_CONFIGURE);
        let extents = self.config.extents(hot.flags.contains(ClientFlags::UNDECORATED));
        let changed = hot.desired != hot.current;

        if changed {
            let frame_rect = extents.frame_rect(hot.desired);
            self.submit(Request::ConfigureWindow {
                window: hot.frame,
                values: ConfigureValues::rect(frame_rect),
            });
            if hot.desired.w != hot.current.w || hot.desired.h != hot.current.h {
                self.submit(Request::ConfigureWindow {
                    window: hot.window,
                    values: ConfigureValues::size(hot.desired.w, hot.desired.h),
                });
            }
        }
        if changed || synth_only {
            // ICCCM: the client learns its absolute position from us.
            self.submit(Request::SendConfigureNotify {
                window: hot.window,
                rect: hot.desired,
                border: 0,
            });
        }
        if let Some(hot) = self.clients.hot_mut(h) {
            hot.current = hot.desired;
            hot.flags -= ClientFlags::SYNTH_CONFIGURE;
        }
    }

    /// Emit the minimal restack mask: the sibling immediately below in
    /// global order when one exists, bare raise otherwise.
    fn flush_stacking(&mut self, h: Handle) {
        let Some(hot) = self.clients.hot(h).copied() else { return };
        let below = self.stack.predecessor(h);
        let sibling = below
            .and_then(|p| self.clients.hot(p))
            .map(|p| if p.frame.is_none() { p.window } else { p.frame });
        let values = match sibling {
            Some(sibling) => ConfigureValues {
                sibling: Some(sibling),
                stack_mode: Some(StackMode::Above),
                ..Default::default()
            },
            None => {
                ConfigureValues { stack_mode: Some(StackMode::Above), ..Default::default() }
            }
        };
        let subject = if hot.frame.is_none() { hot.window } else { hot.frame };
        self.submit(Request::ConfigureWindow { window: subject, values });
        self.mark_root_dirty(crate::wm::RootDirty::CLIENT_LIST_STACKING);
    }

    fn flush_client_props(&mut self, h: Handle) {
        let Some(hot) = self.clients.hot(h).copied() else { return };
        if hot.dirty.is_empty() {
            return;
        }
        let window = hot.window;

        if hot.dirty.contains(Dirty::STATE) {
            let wm_state = match hot.state {
                ClientState::Mapped => WM_STATE_NORMAL,
                _ => WM_STATE_ICONIC,
            };
            self.submit(Request::ChangeProperty {
                window,
                atom: Atom::WmState,
                type_: Atom::WmState,
                value: PropValue::Cardinals(vec![wm_state, 0]),
            });
            self.submit(Request::ChangeProperty {
                window,
                atom: Atom::NetWmState,
                type_: Atom::AtomType,
                value: PropValue::Atoms(net_state_atoms(hot.net_state)),
            });
            self.submit(Request::ChangeProperty {
                window,
                atom: Atom::NetWmDesktop,
                type_: Atom::Cardinal,
                value: PropValue::Cardinals(vec![hot.desktop]),
            });
        }
        if hot.dirty.contains(Dirty::HINTS) {
            self.submit(Request::ChangeProperty {
                window,
                atom: Atom::NetWmAllowedActions,
                type_: Atom::AtomType,
                value: PropValue::Atoms(allowed_actions(&hot)),
            });
        }
        if hot.dirty.contains(Dirty::FRAME_STYLE) {
            let extents = self.config.extents(hot.flags.contains(ClientFlags::UNDECORATED));
            self.submit(Request::ChangeProperty {
                window,
                atom: Atom::NetFrameExtents,
                type_: Atom::Cardinal,
                value: PropValue::Cardinals(vec![
                    extents.left,
                    extents.right,
                    extents.top,
                    extents.bottom,
                ]),
            });
        }
        if hot.dirty.intersects(Dirty::TITLE | Dirty::FRAME_STYLE) {
            let exposed = self.buckets.exposes.get(&hot.frame).copied();
            let damaged = self.buckets.damages.get(&hot.window).copied();
            let region = match (exposed, damaged) {
                (Some(e), Some(d)) => Some(e.union(d)),
                (region, None) | (None, region) => region,
            };
            let title = self.clients.cold(h).map(|c| c.title.clone()).unwrap_or_default();
            self.chrome.frame_dirty(h, &title, hot.dirty, region);
        }
        if let Some(hot) = self.clients.hot_mut(h) {
            trace!(%window, dirty = ?hot.dirty, "committed");
            hot.dirty = Dirty::empty();
        }
    }
}

/// `_NET_WM_STATE` atom list for the current bits.
pub fn net_state_atoms(state: crate::client::NetState) -> Vec<Atom> {
    use crate::client::NetState;
    let mut atoms = Vec::new();
    let table = [
        (NetState::FULLSCREEN, Atom::NetWmStateFullscreen),
        (NetState::ABOVE, Atom::NetWmStateAbove),
        (NetState::BELOW, Atom::NetWmStateBelow),
        (NetState::STICKY, Atom::NetWmStateSticky),
        (NetState::HIDDEN, Atom::NetWmStateHidden),
        (NetState::DEMANDS_ATTENTION, Atom::NetWmStateDemandsAttention),
        (NetState::SKIP_TASKBAR, Atom::NetWmStateSkipTaskbar),
        (NetState::SKIP_PAGER, Atom::NetWmStateSkipPager),
    ];
    for (bit, atom) in table {
        if state.contains(bit) {
            atoms.push(atom);
        }
    }
    atoms
}

/// `_NET_WM_ALLOWED_ACTIONS` derived from hints and type.
fn allowed_actions(hot: &crate::client::ClientHot) -> Vec<Atom> {
    let mut actions = vec![Atom::NetWmActionClose];
    if !hot.wtype.fixed() {
        actions.push(Atom::NetWmActionMove);
    }
    let resizable = !(hot.hints.fixed_w() && hot.hints.fixed_h());
    if resizable && !hot.wtype.fixed() {
        actions.push(Atom::NetWmActionResize);
        actions.push(Atom::NetWmActionFullscreen);
    }
    if !hot.hints.fixed_w() && !hot.wtype.fixed() {
        actions.push(Atom::NetWmActionMaximizeHorz);
    }
    if !hot.hints.fixed_h() && !hot.wtype.fixed() {
        actions.push(Atom::NetWmActionMaximizeVert);
    }
    if !hot.wtype.reserved() {
        actions.push(Atom::NetWmActionMinimize);
    }
    actions
}

#[cfg(test)]
#[path = "commit_tests.rs"]
mod tests;
