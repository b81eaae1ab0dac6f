// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validating property ingestion.
//!
//! Every `GetProperty` reply funnels through [`Wm::apply_property`]. A reply
//! that fails validation (wrong format, byte length not a multiple of the
//! unit size, values past the sanity bounds) leaves the previous value
//! unchanged. A `None` reply means the property is unset and resets the
//! field to its default.

use tracing::{debug, trace};

use crate::client::{ClientFlags, ClientState, Dirty, Icon, NetState, Strut, WindowType};
use crate::geom::SizeHints;
use crate::proto::{Atom, PropReply, Request, Xid, STICKY_DESKTOP, WM_STATE_ICONIC};
use crate::slotmap::Handle;
use crate::wm::{RootDirty, Wm};

/// Titles and class strings are truncated to this many bytes.
pub const MAX_NAME_LEN: usize = 4096;
/// Icons larger than this on either axis are rejected.
pub const MAX_ICON_DIM: u32 = 4096;

// WM_HINTS flag bits.
const HINT_INPUT: u32 = 1 << 0;
const HINT_STATE: u32 = 1 << 1;
const HINT_URGENCY: u32 = 1 << 8;

impl Wm {
    /// Re-issue a property query through the cookie jar (PropertyNotify
    /// coalescing lands here once per `(window, atom)` per tick).
    pub fn requery_property(&mut self, h: Handle, atom: Atom, now: std::time::Instant) {
        let Some(hot) = self.clients.hot(h) else { return };
        let window = hot.window;
        let seq = self.submit(Request::GetProperty { window, atom });
        if !self.jar.push(seq, crate::cookie::CookieKind::Property(atom), h, window, now) {
            debug!(%window, %atom, "cookie jar refused property query");
        }
    }

    /// Apply one property reply to a client. `reply` is `None` when the
    /// property is unset or was deleted.
    pub fn apply_property(&mut self, h: Handle, atom: Atom, reply: Option<&PropReply>) {
        if !self.clients.live(h) {
            return;
        }
        match atom {
            Atom::WmName => self.apply_wm_name(h, reply),
            Atom::NetWmName => self.apply_net_wm_name(h, reply),
            Atom::WmClass => self.apply_wm_class(h, reply),
            Atom::WmNormalHints => self.apply_normal_hints(h, reply),
            Atom::WmHints => self.apply_wm_hints(h, reply),
            Atom::WmProtocols => self.apply_protocols(h, reply),
            Atom::WmTransientFor => self.apply_transient_for(h, reply),
            Atom::NetWmWindowType => self.apply_window_type(h, reply),
            Atom::NetWmState => self.apply_initial_net_state(h, reply),
            Atom::NetWmDesktop => self.apply_net_desktop(h, reply),
            Atom::NetWmStrutPartial => self.apply_strut(h, reply),
            Atom::NetWmIcon => self.apply_icon(h, reply),
            Atom::WmColormapWindows => self.apply_colormap_windows(h, reply),
            Atom::GtkFrameExtents => self.apply_gtk_extents(h, reply),
            other => trace!(atom = %other, "ignoring property"),
        }
    }

    fn apply_wm_name(&mut self, h: Handle, reply: Option<&PropReply>) {
        let Some((hot, cold)) = self.clients.pair_mut(h) else { return };
        // A UTF-8 title from _NET_WM_NAME is sticky; the legacy name no
        // longer overwrites it.
        if hot.flags.contains(ClientFlags::NET_NAME) {
            return;
        }
        let title = reply
            .and_then(|r| r.as_bytes())
            .map(|b| String::from_utf8_lossy(truncate(b, MAX_NAME_LEN)).into_owned())
            .unwrap_or_default();
        if cold.title != title {
            cold.title = title;
            hot.dirty |= Dirty::TITLE;
        }
    }

    fn apply_net_wm_name(&mut self, h: Handle, reply: Option<&PropReply>) {
        let Some((hot, cold)) = self.clients.pair_mut(h) else { return };
        match reply.and_then(|r| r.as_bytes()) {
            Some(bytes) => match std::str::from_utf8(truncate(bytes, MAX_NAME_LEN)) {
                Ok(name) => {
                    hot.flags |= ClientFlags::NET_NAME;
                    if cold.title != name {
                        cold.title = name.to_string();
                        hot.dirty |= Dirty::TITLE;
                    }
                }
                Err(_) => debug!(window = %hot.window, "rejecting non-UTF-8 _NET_WM_NAME"),
            },
            None => {
                hot.flags -= ClientFlags::NET_NAME;
            }
        }
    }

    fn apply_wm_class(&mut self, h: Handle, reply: Option<&PropReply>) {
        let Some((hot, cold)) = self.clients.pair_mut(h) else { return };
        let Some(bytes) = reply.and_then(|r| r.as_bytes()) else {
            cold.instance.clear();
            cold.class.clear();
            return;
        };
        let mut parts = truncate(bytes, MAX_NAME_LEN).split(|b| *b == 0);
        cold.instance = String::from_utf8_lossy(parts.next().unwrap_or_default()).into_owned();
        cold.class = String::from_utf8_lossy(parts.next().unwrap_or_default()).into_owned();
        hot.dirty |= Dirty::TITLE;
    }

    fn apply_normal_hints(&mut self, h: Handle, reply: Option<&PropReply>) {
        let Some(hot) = self.clients.hot_mut(h) else { return };
        let parsed = reply.and_then(|r| r.as_u32s()).and_then(|words| decode_size_hints(&words));
        match (reply, parsed) {
            (Some(_), Some(hints)) => {
                if hot.hints != hints {
                    hot.hints = hints;
                    hot.dirty |= Dirty::HINTS;
                }
            }
            (Some(_), None) => debug!(window = %hot.window, "malformed WM_NORMAL_HINTS"),
            (None, _) => {
                hot.hints = SizeHints::default();
                hot.dirty |= Dirty::HINTS;
            }
        }
    }

    fn apply_wm_hints(&mut self, h: Handle, reply: Option<&PropReply>) {
        let Some(hot) = self.clients.hot_mut(h) else { return };
        let Some(words) = reply.and_then(|r| r.as_u32s()) else {
            hot.flags |= ClientFlags::INPUT_HINT;
            hot.flags -= ClientFlags::URGENT;
            return;
        };
        if words.len() < 9 {
            debug!(window = %hot.window, len = words.len(), "malformed WM_HINTS");
            return;
        }
        let flags = words[0];
        if flags & HINT_INPUT != 0 {
            hot.flags.set(ClientFlags::INPUT_HINT, words[1] != 0);
        }
        if flags & HINT_STATE != 0
            && words[2] == WM_STATE_ICONIC
            && hot.state == ClientState::New
        {
            hot.flags |= ClientFlags::START_ICONIC;
        }
        let urgent = flags & HINT_URGENCY != 0;
        if urgent != hot.flags.contains(ClientFlags::URGENT) {
            hot.flags.set(ClientFlags::URGENT, urgent);
            hot.net_state.set(NetState::DEMANDS_ATTENTION, urgent);
            hot.dirty |= Dirty::STATE;
        }
    }

    fn apply_protocols(&mut self, h: Handle, reply: Option<&PropReply>) {
        let Some(cold) = self.clients.cold_mut(h) else { return };
        let atoms = reply.and_then(|r| r.as_atoms()).unwrap_or_default();
        cold.protocols = crate::client::Protocols::empty();
        for atom in atoms {
            match atom {
                Atom::WmDeleteWindow => cold.protocols |= crate::client::Protocols::DELETE_WINDOW,
                Atom::WmTakeFocus => cold.protocols |= crate::client::Protocols::TAKE_FOCUS,
                _ => {}
            }
        }
    }

    /// `WM_TRANSIENT_FOR`: self-references, cycles, and dangling ids degrade
    /// to `INVALID`; the raw id is kept for later re-resolution.
    fn apply_transient_for(&mut self, h: Handle, reply: Option<&PropReply>) {
        let raw = reply
            .and_then(|r| r.as_u32s())
            .and_then(|words| words.first().copied())
            .map(Xid)
            .unwrap_or(Xid::NONE);

        self.transient_unlink(h);

        let Some(cold) = self.clients.cold_mut(h) else { return };
        cold.transient_for_xid = raw;

        let own_window = self.clients.hot(h).map(|c| c.window).unwrap_or(Xid::NONE);
        if raw.is_none() || raw == own_window {
            return;
        }
        let Some(parent) = self.clients.by_window(raw) else { return };
        if parent == h || self.transient_chain_contains(parent, h) {
            debug!(window = %own_window, "rejecting WM_TRANSIENT_FOR cycle");
            return;
        }
        self.transient_link(h, parent);
    }

    fn apply_window_type(&mut self, h: Handle, reply: Option<&PropReply>) {
        let atoms = reply.and_then(|r| r.as_atoms()).unwrap_or_default();
        let wtype = atoms
            .into_iter()
            .find_map(WindowType::from_atom)
            .unwrap_or(WindowType::Normal);
        let Some(hot) = self.clients.hot_mut(h) else { return };
        if hot.wtype == wtype {
            return;
        }
        hot.wtype = wtype;
        hot.dirty |= Dirty::STATE | Dirty::FRAME_STYLE;
        if !hot.flags.contains(ClientFlags::UNDECORATED) && !wtype.decorated() {
            hot.flags |= ClientFlags::UNDECORATED;
        }
        let layer = crate::client::Layer::for_client(wtype, hot.net_state);
        let state = hot.state;
        if state != ClientState::New {
            let mut stack = std::mem::take(&mut self.stack);
            stack.move_to_layer(&mut self.clients, h, layer);
            self.stack = stack;
        } else if let Some(hot) = self.clients.hot_mut(h) {
            hot.layer = layer;
        }
    }

    /// Initial `_NET_WM_STATE` is honoured during adoption only; once
    /// managed, state changes arrive as client messages.
    fn apply_initial_net_state(&mut self, h: Handle, reply: Option<&PropReply>) {
        let Some(hot) = self.clients.hot(h) else { return };
        if hot.state != ClientState::New {
            trace!(window = %hot.window, "ignoring client-set _NET_WM_STATE after adoption");
            return;
        }
        let atoms = reply.and_then(|r| r.as_atoms()).unwrap_or_default();
        let Some(hot) = self.clients.hot_mut(h) else { return };
        for atom in atoms {
            match atom {
                Atom::NetWmStateFullscreen => hot.net_state |= NetState::FULLSCREEN,
                Atom::NetWmStateAbove => hot.net_state |= NetState::ABOVE,
                Atom::NetWmStateBelow => hot.net_state |= NetState::BELOW,
                Atom::NetWmStateSticky => {
                    hot.net_state |= NetState::STICKY;
                    hot.desktop = STICKY_DESKTOP;
                }
                Atom::NetWmStateHidden => hot.net_state |= NetState::HIDDEN,
                Atom::NetWmStateDemandsAttention => {
                    hot.net_state |= NetState::DEMANDS_ATTENTION
                }
                Atom::NetWmStateSkipTaskbar => hot.net_state |= NetState::SKIP_TASKBAR,
                Atom::NetWmStateSkipPager => hot.net_state |= NetState::SKIP_PAGER,
                _ => {}
            }
        }
        hot.layer = crate::client::Layer::for_client(hot.wtype, hot.net_state);
    }

    fn apply_net_desktop(&mut self, h: Handle, reply: Option<&PropReply>) {
        let Some(words) = reply.and_then(|r| r.as_u32s()) else { return };
        let Some(&desktop) = words.first() else { return };
        let Some(hot) = self.clients.hot(h) else { return };
        if hot.state == ClientState::New {
            let desktops = self.root.desktops;
            if let Some(hot) = self.clients.hot_mut(h) {
                hot.desktop =
                    if desktop == STICKY_DESKTOP { desktop } else { desktop.min(desktops - 1) };
                if desktop == STICKY_DESKTOP {
                    hot.net_state |= NetState::STICKY;
                }
            }
        } else {
            self.set_client_desktop(h, desktop);
        }
    }

    fn apply_strut(&mut self, h: Handle, reply: Option<&PropReply>) {
        let parsed = reply.and_then(|r| r.as_u32s()).filter(|w| w.len() >= 12).map(|w| Strut {
            left: w[0],
            right: w[1],
            top: w[2],
            bottom: w[3],
        });
        if reply.is_some() && parsed.is_none() {
            debug!("malformed _NET_WM_STRUT_PARTIAL");
            return;
        }
        let Some((hot, cold)) = self.clients.pair_mut(h) else { return };
        if cold.strut == parsed {
            return;
        }
        cold.strut = parsed;
        hot.dirty |= Dirty::STRUT;
        self.root.dirty |= RootDirty::WORKAREA;
    }

    fn apply_icon(&mut self, h: Handle, reply: Option<&PropReply>) {
        let Some((hot, cold)) = self.clients.pair_mut(h) else { return };
        let Some(words) = reply.and_then(|r| r.as_u32s()) else {
            cold.icon = None;
            return;
        };
        if words.len() < 2 {
            return;
        }
        let (w, height) = (words[0], words[1]);
        if w == 0 || height == 0 || w > MAX_ICON_DIM || height > MAX_ICON_DIM {
            debug!(window = %hot.window, w, h = height, "rejecting _NET_WM_ICON dimensions");
            return;
        }
        let pixels = (w as usize) * (height as usize);
        let Some(argb) = words.get(2..2 + pixels) else {
            debug!(window = %hot.window, "truncated _NET_WM_ICON");
            return;
        };
        // First image block wins; panels read the raw property themselves,
        // the chrome only needs one.
        cold.icon = Some(Icon { width: w, height, argb: argb.to_vec() });
        hot.dirty |= Dirty::FRAME_STYLE;
    }

    fn apply_colormap_windows(&mut self, h: Handle, reply: Option<&PropReply>) {
        let Some(cold) = self.clients.cold_mut(h) else { return };
        cold.colormap_windows = reply.and_then(|r| r.as_windows()).unwrap_or_default();
    }

    fn apply_gtk_extents(&mut self, h: Handle, reply: Option<&PropReply>) {
        let parsed = reply
            .and_then(|r| r.as_u32s())
            .filter(|w| w.len() >= 4)
            .map(|w| [w[0], w[1], w[2], w[3]]);
        let Some((hot, cold)) = self.clients.pair_mut(h) else { return };
        if cold.gtk_extents != parsed {
            cold.gtk_extents = parsed;
            hot.dirty |= Dirty::HINTS;
        }
    }

    // -- transient list maintenance -------------------------------------------

    /// Detach `h` from its current transient parent's child list.
    pub fn transient_unlink(&mut self, h: Handle) {
        let Some(hot) = self.clients.hot(h) else { return };
        let parent = hot.transient_for;
        if !parent.is_valid() {
            return;
        }
        let head = self.clients.hot(parent).map(|p| p.transients_head).unwrap_or(Handle::INVALID);
        if head == h {
            let next = self.clients.hot(h).map(|c| c.transient_next).unwrap_or(Handle::INVALID);
            if let Some(p) = self.clients.hot_mut(parent) {
                p.transients_head = next;
            }
        } else {
            let mut cur = head;
            let mut depth = 0;
            while cur.is_valid() && depth < 64 {
                let next =
                    self.clients.hot(cur).map(|c| c.transient_next).unwrap_or(Handle::INVALID);
                if next == h {
                    let after =
                        self.clients.hot(h).map(|c| c.transient_next).unwrap_or(Handle::INVALID);
                    if let Some(c) = self.clients.hot_mut(cur) {
                        c.transient_next = after;
                    }
                    break;
                }
                cur = next;
                depth += 1;
            }
        }
        if let Some(hot) = self.clients.hot_mut(h) {
            hot.transient_for = Handle::INVALID;
            hot.transient_next = Handle::INVALID;
        }
    }

    fn transient_link(&mut self, h: Handle, parent: Handle) {
        let head = self.clients.hot(parent).map(|p| p.transients_head).unwrap_or(Handle::INVALID);
        if let Some(hot) = self.clients.hot_mut(h) {
            hot.transient_for = parent;
            hot.transient_next = head;
        }
        if let Some(p) = self.clients.hot_mut(parent) {
            p.transients_head = h;
        }
    }

    /// True when `needle` appears on the transient-parent chain above `from`.
    pub fn transient_chain_contains(&self, from: Handle, needle: Handle) -> bool {
        let mut cur = from;
        let mut depth = 0;
        while cur.is_valid() && depth < 64 {
            if cur == needle {
                return true;
            }
            cur = self.clients.hot(cur).map(|c| c.transient_for).unwrap_or(Handle::INVALID);
            depth += 1;
        }
        false
    }

    /// When a parent unmanages, its transients degrade to `INVALID` but keep
    /// the raw id for re-resolution if the parent maps again.
    pub fn transient_orphan_children(&mut self, parent: Handle) {
        let mut child =
            self.clients.hot(parent).map(|p| p.transients_head).unwrap_or(Handle::INVALID);
        let mut depth = 0;
        while child.is_valid() && depth < 64 {
            let next =
                self.clients.hot(child).map(|c| c.transient_next).unwrap_or(Handle::INVALID);
            if let Some(hot) = self.clients.hot_mut(child) {
                hot.transient_for = Handle::INVALID;
                hot.transient_next = Handle::INVALID;
            }
            child = next;
            depth += 1;
        }
        if let Some(p) = self.clients.hot_mut(parent) {
            p.transients_head = Handle::INVALID;
        }
    }
}

fn truncate(bytes: &[u8], cap: usize) -> &[u8] {
    &bytes[..bytes.len().min(cap)]
}

/// `WM_NORMAL_HINTS` is 18 CARDINAL32 fields.
fn decode_size_hints(words: &[u32]) -> Option<SizeHints> {
    if words.len() < 18 {
        return None;
    }
    Some(SizeHints {
        flags: words[0],
        min_w: words[5],
        min_h: words[6],
        max_w: words[7],
        max_h: words[8],
        inc_w: words[9].max(1),
        inc_h: words[10].max(1),
        min_aspect: (words[11], words[12]),
        max_aspect: (words[13], words[14]),
        base_w: words[15],
        base_h: words[16],
    })
}

#[cfg(test)]
#[path = "property_tests.rs"]
mod tests;
