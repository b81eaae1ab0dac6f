// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client lifecycle: the multi-step asynchronous adoption, the cookie
//! dispatch that drives it, and unmanage.
//!
//! Adoption never blocks: `begin_manage` fires the whole query set through
//! the cookie jar and the client sits in `NEW` until `pending_replies`
//! settles to zero. A `BadWindow` on any reply means the window died
//! mid-query and the adoption unwinds without ever creating a frame.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::client::{ClientFlags, ClientState, Dirty, Layer, NetState};
use crate::cookie::{CookieKind, CookieSlot, Outcome};
use crate::error::ProtoErrorKind;
use crate::geom::Rect;
use crate::proto::{
    Atom, EventMask, MapState, Mods, Reply, Request, SaveSetMode, WindowClass, Xid,
};
use crate::slotmap::Handle;
use crate::wm::Wm;

impl Wm {
    /// Start adopting a window: allocate the record and fire the initial
    /// attribute, geometry, and property queries.
    pub fn begin_manage(&mut self, window: Xid, now: Instant) {
        if let Some(h) = self.clients.by_window(window) {
            // A MapRequest for a managed window is a restore request.
            self.deiconify(h);
            return;
        }
        let Some(h) = self.clients.adopt(window) else {
            warn!(%window, "cannot manage: client table full");
            return;
        };
        let current_desktop = self.root.current_desktop;
        let policy = self.config.focus_new_policy();
        if let Some(hot) = self.clients.hot_mut(h) {
            hot.desktop = current_desktop;
            hot.focus_override = policy;
        }

        let mut pending = 0u32;
        let seq = self.submit(Request::GetWindowAttributes { window });
        pending += u32::from(self.jar.push(seq, CookieKind::Attributes, h, window, now));
        let seq = self.submit(Request::GetGeometry { window });
        pending += u32::from(self.jar.push(seq, CookieKind::Geometry, h, window, now));
        for atom in Atom::ADOPTION_PROPERTIES {
            let seq = self.submit(Request::GetProperty { window, atom });
            pending += u32::from(self.jar.push(seq, CookieKind::Property(atom), h, window, now));
        }
        if let Some(hot) = self.clients.hot_mut(h) {
            hot.pending_replies = pending;
        }
        debug!(%window, pending, "adoption started");
    }

    /// Scan existing children of the root at startup and adopt the viewable,
    /// non-override-redirect ones.
    pub fn begin_adoption_scan(&mut self, now: Instant) {
        let root = self.root.window;
        let seq = self.submit(Request::QueryTree { window: root });
        self.jar.push(seq, CookieKind::Tree, Handle::INVALID, root, now);
    }

    /// Route one settled cookie to its handler. This is the tagged dispatch
    /// the jar's `kind` field exists for.
    pub fn handle_cookie(&mut self, slot: CookieSlot, outcome: Outcome, now: Instant) {
        match slot.kind {
            CookieKind::Attributes => self.on_attributes(slot.client, outcome),
            CookieKind::Geometry => self.on_geometry(slot.client, outcome),
            CookieKind::Property(atom) => self.on_property(slot.client, atom, outcome),
            CookieKind::Tree => self.on_tree(outcome, now),
            CookieKind::ScanAttributes => self.on_scan_attributes(slot.payload, outcome, now),
            CookieKind::Grab => self.on_grab(slot.client, outcome),
        }
    }

    fn on_attributes(&mut self, h: Handle, outcome: Outcome) {
        match outcome {
            Outcome::Reply(Reply::Attributes { override_redirect, colormap, .. }) => {
                if override_redirect {
                    debug!("window turned override-redirect mid-adoption");
                    self.abort_manage(h);
                } else if let Some(cold) = self.clients.cold_mut(h) {
                    cold.colormap = colormap;
                }
            }
            Outcome::Error(err) => self.soft_reply_error(h, err.kind),
            Outcome::Timeout | Outcome::Reply(_) => {}
        }
        self.settle_pending(h);
    }

    fn on_geometry(&mut self, h: Handle, outcome: Outcome) {
        match outcome {
            Outcome::Reply(Reply::Geometry { rect, .. }) => {
                if let Some(hot) = self.clients.hot_mut(h) {
                    hot.current = rect;
                    hot.desired = rect;
                }
            }
            Outcome::Error(err) => self.soft_reply_error(h, err.kind),
            Outcome::Timeout | Outcome::Reply(_) => {}
        }
        self.settle_pending(h);
    }

    fn on_property(&mut self, h: Handle, atom: Atom, outcome: Outcome) {
        match outcome {
            Outcome::Reply(Reply::Property(reply)) => {
                self.apply_property(h, atom, reply.as_ref());
            }
            Outcome::Error(err) => self.soft_reply_error(h, err.kind),
            Outcome::Timeout | Outcome::Reply(_) => {}
        }
        self.settle_pending(h);
    }

    fn on_tree(&mut self, outcome: Outcome, now: Instant) {
        let Outcome::Reply(Reply::Tree { children }) = outcome else { return };
        for child in children {
            if child == self.root.window || self.clients.find(child).is_some() {
                continue;
            }
            let seq = self.submit(Request::GetWindowAttributes { window: child });
            self.jar.push(seq, CookieKind::ScanAttributes, Handle::INVALID, child, now);
        }
    }

    fn on_scan_attributes(&mut self, window: Xid, outcome: Outcome, now: Instant) {
        let Outcome::Reply(Reply::Attributes { override_redirect, map_state, .. }) = outcome
        else {
            return;
        };
        if !override_redirect && map_state == MapState::Viewable {
            self.begin_manage(window, now);
        }
    }

    fn on_grab(&mut self, _h: Handle, outcome: Outcome) {
        let ok = matches!(outcome, Outcome::Reply(Reply::GrabStatus { success: true }));
        if !ok {
            debug!("grab refused, cancelling interaction");
            self.cancel_interaction();
        }
    }

    /// A protocol error on a reply is soft; during adoption a `BadWindow`
    /// means the window vanished and the adoption unwinds.
    fn soft_reply_error(&mut self, h: Handle, kind: ProtoErrorKind) {
        let state = self.clients.hot(h).map(|c| c.state);
        if state == Some(ClientState::New) && kind == ProtoErrorKind::BadWindow {
            self.abort_manage(h);
        } else if state.is_some() {
            debug!(error = %kind, "reply error, no state change");
        }
    }

    fn settle_pending(&mut self, h: Handle) {
        let Some(hot) = self.clients.hot_mut(h) else { return };
        if hot.state != ClientState::New {
            return;
        }
        hot.pending_replies = hot.pending_replies.saturating_sub(1);
        if hot.pending_replies > 0 {
            return;
        }
        if hot.flags.contains(ClientFlags::MANAGE_ABORTED) {
            self.clients.release(h);
            return;
        }
        self.finish_manage(h);
    }

    /// Mark the adoption dead; the record is released once the outstanding
    /// replies settle, so late replies still find a live slot to no-op on.
    pub fn abort_manage(&mut self, h: Handle) {
        let Some(hot) = self.clients.hot_mut(h) else { return };
        if hot.state != ClientState::New {
            return;
        }
        hot.flags |= ClientFlags::MANAGE_ABORTED;
        if hot.pending_replies == 0 {
            self.clients.release(h);
        }
    }

    /// All initial replies are in: apply rules, place, frame, reparent, and
    /// enter the stacking and focus structures.
    fn finish_manage(&mut self, h: Handle) {
        self.apply_rules(h);

        let Some(hot) = self.clients.hot(h).copied() else { return };
        let window = hot.window;

        let undecorated = hot.flags.contains(ClientFlags::UNDECORATED)
            || !hot.wtype.decorated()
            || hot.net_state.contains(NetState::FULLSCREEN);
        let extents = self.config.extents(undecorated);

        let mut desired = hot.desired;
        if !hot.hints.positioned() && !hot.wtype.fixed() && desired.origin() == Default::default()
        {
            desired = self.cascade_place(desired);
        }
        let (w, height) = hot.hints.constrain(desired.w, desired.h);
        desired.w = w;
        desired.h = height;

        let frame = self.transport.generate_id();
        let root = self.root.window;
        self.submit(Request::CreateWindow {
            window: frame,
            parent: root,
            rect: extents.frame_rect(desired),
            class: WindowClass::InputOutput,
            events: EventMask::SUBSTRUCTURE_REDIRECT
                | EventMask::SUBSTRUCTURE_NOTIFY
                | EventMask::EXPOSURE
                | EventMask::BUTTON_PRESS
                | EventMask::BUTTON_RELEASE
                | EventMask::POINTER_MOTION
                | EventMask::ENTER_WINDOW,
        });
        // Save-set first: if we die between here and reparent the server
        // still knows to hand the window back to the root.
        self.submit(Request::ChangeSaveSet { window, mode: SaveSetMode::Add });
        self.submit(Request::ReparentWindow {
            window,
            parent: frame,
            x: extents.left as i32,
            y: extents.top as i32,
        });
        self.submit(Request::ConfigureWindow {
            window,
            values: crate::proto::ConfigureValues {
                border: Some(0),
                ..Default::default()
            },
        });
        self.submit(Request::ChangeAttributes {
            window,
            events: EventMask::PROPERTY_CHANGE
                | EventMask::STRUCTURE_NOTIFY
                | EventMask::FOCUS_CHANGE
                | EventMask::COLORMAP_CHANGE,
        });
        self.submit(Request::GrabButton { window: frame, button: 1, mods: Mods::MOD1 });
        self.submit(Request::GrabButton { window: frame, button: 3, mods: Mods::MOD1 });

        self.clients.bind_frame(h, frame);

        if let Some(hot) = self.clients.hot_mut(h) {
            hot.desired = desired;
            hot.current = desired;
            hot.state = ClientState::Ready;
            hot.flags.set(ClientFlags::UNDECORATED, undecorated);
            if hot.flags.contains(ClientFlags::START_ICONIC) {
                hot.net_state |= NetState::HIDDEN;
            }
            hot.layer = Layer::for_client(hot.wtype, hot.net_state);
            hot.dirty |= Dirty::GEOM
                | Dirty::STACK
                | Dirty::STATE
                | Dirty::TITLE
                | Dirty::HINTS
                | Dirty::FRAME_STYLE;
        }

        self.focus_history_insert(h);
        self.resolve_transients_for(window, h);
        self.client_lists_dirty();
        self.apply_visibility(h);

        let title = self.clients.cold(h).map(|c| c.title.clone()).unwrap_or_default();
        info!(%window, %frame, title = %title, "managed");
    }

    fn apply_rules(&mut self, h: Handle) {
        let (class, instance) = match self.clients.cold(h) {
            Some(cold) => (cold.class.clone(), cold.instance.clone()),
            None => return,
        };
        let matched: Vec<crate::config::WindowRule> = self
            .rules
            .iter()
            .filter(|r| r.matches(&class, &instance))
            .cloned()
            .collect();
        let desktops = self.root.desktops;
        for rule in matched {
            let Some(hot) = self.clients.hot_mut(h) else { return };
            if let Some(focus) = rule.focus {
                hot.focus_override = focus;
            }
            if let Some(desktop) = rule.desktop {
                hot.desktop = if desktop == crate::proto::STICKY_DESKTOP {
                    desktop
                } else {
                    desktop.min(desktops - 1)
                };
            }
            if rule.undecorated {
                hot.flags |= ClientFlags::UNDECORATED;
            }
        }
    }

    /// Clients that named this window in `WM_TRANSIENT_FOR` before it was
    /// managed get their dangling reference resolved now.
    fn resolve_transients_for(&mut self, window: Xid, parent: Handle) {
        let orphans: Vec<Handle> = self
            .clients
            .iter()
            .filter(|(other, hot, cold)| {
                *other != parent
                    && !hot.transient_for.is_valid()
                    && cold.transient_for_xid == window
            })
            .map(|(other, _, _)| other)
            .collect();
        for child in orphans {
            if !self.transient_chain_contains(parent, child) {
                let reply = crate::proto::PropReply::cardinals(Atom::Window, &[window.0]);
                self.apply_property(child, Atom::WmTransientFor, Some(&reply));
            }
        }
    }

    /// Cascade placement inside the current workarea.
    fn cascade_place(&self, rect: Rect) -> Rect {
        let area = self.current_workarea();
        let step = (self.config.title_height + self.config.border_width).max(8);
        let occupied = self
            .clients
            .iter()
            .filter(|(_, hot, _)| {
                hot.state == ClientState::Mapped && hot.on_desktop(self.root.current_desktop)
            })
            .count() as u32;
        let offset = (occupied % 8) * step;
        let mut placed = rect;
        placed.x = area.x + offset as i32;
        placed.y = area.y + offset as i32;
        if placed.x + placed.w as i32 > area.x + area.w as i32 {
            placed.x = area.x;
        }
        if placed.y + placed.h as i32 > area.y + area.h as i32 {
            placed.y = area.y;
        }
        placed
    }

    /// Tear a client down: out of the layers, maps, and focus history; the
    /// frame is destroyed and the client window handed back to the root.
    pub fn unmanage(&mut self, h: Handle, window_destroyed: bool) {
        let Some(hot) = self.clients.hot(h).copied() else { return };
        debug!(window = %hot.window, destroyed = window_destroyed, "unmanage");

        self.cancel_interaction_for(h);
        if let Some(hot) = self.clients.hot_mut(h) {
            hot.state = ClientState::Unmanaging;
        }
        self.focus_after_unmanage(h);

        self.transient_unlink(h);
        self.transient_orphan_children(h);
        let mut stack = std::mem::take(&mut self.stack);
        stack.remove(&mut self.clients, h);
        self.stack = stack;
        self.focus_history_unlink(h);

        if !hot.frame.is_none() {
            for button in [1u8, 3] {
                self.submit(Request::UngrabButton {
                    window: hot.frame,
                    button,
                    mods: Mods::MOD1,
                });
            }
            if !window_destroyed {
                self.submit(Request::ReparentWindow {
                    window: hot.window,
                    parent: self.root.window,
                    x: hot.current.x,
                    y: hot.current.y,
                });
                self.submit(Request::ChangeSaveSet {
                    window: hot.window,
                    mode: SaveSetMode::Delete,
                });
                self.submit(Request::DeleteProperty { window: hot.window, atom: Atom::WmState });
            }
            self.submit(Request::DestroyWindow { window: hot.frame });
        }

        self.clients.release(h);
        self.client_lists_dirty();
    }

    /// Close request path: `WM_DELETE_WINDOW` when advertised, `KillClient`
    /// otherwise. A second close on the same client escalates to kill; the
    /// user is the grace timer.
    pub fn close_client(&mut self, h: Handle) {
        let Some(hot) = self.clients.hot(h).copied() else { return };
        let supports_delete = self
            .clients
            .cold(h)
            .map(|c| c.protocols.contains(crate::client::Protocols::DELETE_WINDOW))
            .unwrap_or(false);
        let escalate = hot.flags.contains(ClientFlags::CLOSE_REQUESTED);
        if supports_delete && !escalate {
            self.submit(Request::SendClientMessage {
                window: hot.window,
                message_type: Atom::WmProtocols,
                data: [Atom::WmDeleteWindow.word(), crate::proto::CURRENT_TIME, 0, 0, 0],
            });
            if let Some(hot) = self.clients.hot_mut(h) {
                hot.flags |= ClientFlags::CLOSE_REQUESTED;
            }
        } else {
            let window = hot.window;
            info!(%window, "killing unresponsive client");
            self.submit(Request::KillClient { resource: window });
        }
    }
}

#[cfg(test)]
#[path = "manage_tests.rs"]
mod tests;
