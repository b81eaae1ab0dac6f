// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client records: the hot/cold field split, dirty bits, layers, and the
//! window-id registry.
//!
//! Hot fields are touched by the per-tick scan; cold fields only move on
//! property updates. Cross-references between clients are handles, never
//! ids, and are validated through the slotmap on every use.

use bitflags::bitflags;
use indexmap::IndexMap;
use std::collections::HashMap;

use crate::geom::{Rect, SizeHints};
use crate::proto::{Atom, Xid, STICKY_DESKTOP};
use crate::slotmap::{Handle, Slotmap};

/// Lifecycle states. `NEW → READY → MAPPED ↔ UNMAPPED → UNMANAGING`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClientState {
    /// Adoption queries in flight.
    #[default]
    New,
    /// Adopted and framed, first commit pending.
    Ready,
    Mapped,
    Unmapped,
    Unmanaging,
}

bitflags! {
    /// Deferred commit actions for one client.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Dirty: u16 {
        const GEOM = 1 << 0;
        const STACK = 1 << 1;
        const FOCUS = 1 << 2;
        const TITLE = 1 << 3;
        const HINTS = 1 << 4;
        const STATE = 1 << 5;
        const FRAME_STYLE = 1 << 6;
        const STRUT = 1 << 7;
    }
}

impl Default for Dirty {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// `_NET_WM_STATE` bits mirrored on the client.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NetState: u16 {
        const FULLSCREEN = 1 << 0;
        const ABOVE = 1 << 1;
        const BELOW = 1 << 2;
        const STICKY = 1 << 3;
        const HIDDEN = 1 << 4;
        const DEMANDS_ATTENTION = 1 << 5;
        const SKIP_TASKBAR = 1 << 6;
        const SKIP_PAGER = 1 << 7;
    }
}

bitflags! {
    /// `WM_PROTOCOLS` the client advertises.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Protocols: u8 {
        const DELETE_WINDOW = 1 << 0;
        const TAKE_FOCUS = 1 << 1;
    }
}

impl Default for Protocols {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClientFlags: u16 {
        /// No frame chrome (fullscreen, or rule-driven).
        const UNDECORATED = 1 << 0;
        /// `WM_HINTS` input field; focus via `SetInputFocus`.
        const INPUT_HINT = 1 << 1;
        /// `WM_HINTS` urgency.
        const URGENT = 1 << 2;
        /// Adoption failed mid-query; free when the counter settles.
        const MANAGE_ABORTED = 1 << 3;
        /// `_NET_WM_NAME` seen; `WM_NAME` no longer overwrites the title.
        const NET_NAME = 1 << 4;
        /// The first map (and its focus decision) already happened.
        const FIRST_MAP_DONE = 1 << 5;
        /// `WM_HINTS` initial state requested iconic.
        const START_ICONIC = 1 << 6;
        /// A close was already requested; the next one escalates to kill.
        const CLOSE_REQUESTED = 1 << 7;
        /// Send a synthetic ConfigureNotify even though nothing moved.
        const SYNTH_CONFIGURE = 1 << 8;
    }
}

/// Focus-on-map override from window rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusOverride {
    Never,
    Always,
    #[default]
    Auto,
}

/// `_NET_WM_WINDOW_TYPE`, first known atom wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WindowType {
    #[default]
    Normal,
    Dialog,
    Desktop,
    Dock,
    Toolbar,
    Menu,
    Utility,
    Splash,
    DropdownMenu,
    PopupMenu,
    Tooltip,
    Notification,
    Combo,
    Dnd,
}

impl WindowType {
    pub fn from_atom(atom: Atom) -> Option<Self> {
        Some(match atom {
            Atom::NetWmWindowTypeNormal => Self::Normal,
            Atom::NetWmWindowTypeDialog => Self::Dialog,
            Atom::NetWmWindowTypeDesktop => Self::Desktop,
            Atom::NetWmWindowTypeDock => Self::Dock,
            Atom::NetWmWindowTypeToolbar => Self::Toolbar,
            Atom::NetWmWindowTypeMenu => Self::Menu,
            Atom::NetWmWindowTypeUtility => Self::Utility,
            Atom::NetWmWindowTypeSplash => Self::Splash,
            Atom::NetWmWindowTypeDropdownMenu => Self::DropdownMenu,
            Atom::NetWmWindowTypePopupMenu => Self::PopupMenu,
            Atom::NetWmWindowTypeTooltip => Self::Tooltip,
            Atom::NetWmWindowTypeNotification => Self::Notification,
            Atom::NetWmWindowTypeCombo => Self::Combo,
            Atom::NetWmWindowTypeDnd => Self::Dnd,
            _ => return None,
        })
    }

    /// Types that never take focus and are skipped by the switcher.
    pub fn reserved(&self) -> bool {
        matches!(
            self,
            Self::Dock
                | Self::Notification
                | Self::Desktop
                | Self::Menu
                | Self::DropdownMenu
                | Self::PopupMenu
                | Self::Tooltip
                | Self::Combo
                | Self::Dnd
        )
    }

    /// Types that keep their position and never enter move/resize.
    pub fn fixed(&self) -> bool {
        matches!(self, Self::Dock | Self::Desktop)
    }

    pub fn decorated(&self) -> bool {
        matches!(self, Self::Normal | Self::Dialog | Self::Utility)
    }
}

/// Stacking bands, bottom to top.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Layer {
    Desktop = 0,
    Below = 1,
    #[default]
    Normal = 2,
    Above = 3,
    Fullscreen = 4,
    Overlay = 5,
}

impl Layer {
    pub const ALL: [Layer; 6] = [
        Layer::Desktop,
        Layer::Below,
        Layer::Normal,
        Layer::Above,
        Layer::Fullscreen,
        Layer::Overlay,
    ];

    /// The layer a client belongs in given its type and state bits.
    pub fn for_client(wtype: WindowType, state: NetState) -> Layer {
        if state.contains(NetState::FULLSCREEN) {
            return Layer::Fullscreen;
        }
        if state.contains(NetState::ABOVE) {
            return Layer::Above;
        }
        if state.contains(NetState::BELOW) {
            return Layer::Below;
        }
        match wtype {
            WindowType::Desktop => Layer::Desktop,
            WindowType::Dock => Layer::Above,
            WindowType::Tooltip | WindowType::Notification | WindowType::Dnd => Layer::Overlay,
            _ => Layer::Normal,
        }
    }
}

/// Geometry, layer, and decoration snapshot taken when fullscreen is added,
/// restored bit-exact on remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedGeometry {
    pub rect: Rect,
    pub layer: Layer,
    pub undecorated: bool,
}

/// Per-tick hot state.
#[derive(Debug, Clone, Copy)]
pub struct ClientHot {
    pub state: ClientState,
    pub window: Xid,
    pub frame: Xid,
    pub layer: Layer,
    pub stacking_index: u32,
    pub current: Rect,
    pub desired: Rect,
    pub hints: SizeHints,
    pub dirty: Dirty,
    pub wtype: WindowType,
    pub desktop: u32,
    pub net_state: NetState,
    pub flags: ClientFlags,
    pub focus_override: FocusOverride,
    pub focus_prev: Handle,
    pub focus_next: Handle,
    pub transient_for: Handle,
    pub transients_head: Handle,
    pub transient_next: Handle,
    pub pending_replies: u32,
    pub ignore_unmaps: u32,
    pub user_time: u32,
    pub saved: Option<SavedGeometry>,
}

impl Default for ClientHot {
    fn default() -> Self {
        Self {
            state: ClientState::New,
            window: Xid::NONE,
            frame: Xid::NONE,
            layer: Layer::Normal,
            stacking_index: 0,
            current: Rect::default(),
            desired: Rect::default(),
            hints: SizeHints::default(),
            dirty: Dirty::empty(),
            wtype: WindowType::Normal,
            desktop: 0,
            net_state: NetState::empty(),
            // Input defaults to true until WM_HINTS says otherwise.
            flags: ClientFlags::INPUT_HINT,
            focus_override: FocusOverride::Auto,
            focus_prev: Handle::INVALID,
            focus_next: Handle::INVALID,
            transient_for: Handle::INVALID,
            transients_head: Handle::INVALID,
            transient_next: Handle::INVALID,
            pending_replies: 0,
            ignore_unmaps: 0,
            user_time: 0,
            saved: None,
        }
    }
}

impl ClientHot {
    pub fn sticky(&self) -> bool {
        self.desktop == STICKY_DESKTOP
    }

    pub fn on_desktop(&self, desktop: u32) -> bool {
        self.sticky() || self.desktop == desktop
    }
}

/// `_NET_WM_STRUT_PARTIAL` reservation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Strut {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

/// Decoded `_NET_WM_ICON` image, pixels in ARGB rows.
#[derive(Debug, Clone, Default)]
pub struct Icon {
    pub width: u32,
    pub height: u32,
    pub argb: Vec<u32>,
}

/// Property-driven cold state. Strings are owned here and live exactly as
/// long as the client's slot.
#[derive(Debug, Clone, Default)]
pub struct ClientCold {
    pub title: String,
    pub instance: String,
    pub class: String,
    pub protocols: Protocols,
    pub strut: Option<Strut>,
    pub icon: Option<Icon>,
    pub colormap: Xid,
    pub colormap_windows: Vec<Xid>,
    /// Raw `WM_TRANSIENT_FOR` id, kept for re-resolution after the parent
    /// maps or unmanages.
    pub transient_for_xid: Xid,
    pub gtk_extents: Option<[u32; 4]>,
}

/// Which side of a managed pair an id resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowRole {
    Client,
    Frame,
}

/// The slotmap plus the id registries.
///
/// `by_window` is insertion-ordered; that order is the creation order
/// published as `_NET_CLIENT_LIST`.
#[derive(Debug)]
pub struct ClientSet {
    slots: Slotmap<ClientHot, ClientCold>,
    by_window: IndexMap<Xid, Handle>,
    by_frame: HashMap<Xid, Handle>,
}

impl ClientSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Slotmap::with_capacity(capacity),
            by_window: IndexMap::new(),
            by_frame: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Allocate a record for a client window. `None` when the table is full.
    pub fn adopt(&mut self, window: Xid) -> Option<Handle> {
        if self.by_window.contains_key(&window) {
            return None;
        }
        let h = self.slots.alloc()?;
        if let Some(hot) = self.slots.hot_mut(h) {
            hot.window = window;
        }
        self.by_window.insert(window, h);
        Some(h)
    }

    /// Register the frame id once it exists.
    pub fn bind_frame(&mut self, h: Handle, frame: Xid) {
        if let Some(hot) = self.slots.hot_mut(h) {
            hot.frame = frame;
            self.by_frame.insert(frame, h);
        }
    }

    /// Drop the record and both registry entries.
    pub fn release(&mut self, h: Handle) {
        let Some(hot) = self.slots.hot(h) else { return };
        let window = hot.window;
        let frame = hot.frame;
        self.by_window.shift_remove(&window);
        if !frame.is_none() {
            self.by_frame.remove(&frame);
        }
        self.slots.free(h);
    }

    pub fn by_window(&self, window: Xid) -> Option<Handle> {
        self.by_window.get(&window).copied()
    }

    pub fn by_frame(&self, frame: Xid) -> Option<Handle> {
        self.by_frame.get(&frame).copied()
    }

    /// Resolve an id against both registries.
    pub fn find(&self, id: Xid) -> Option<(Handle, WindowRole)> {
        if let Some(h) = self.by_window(id) {
            return Some((h, WindowRole::Client));
        }
        self.by_frame(id).map(|h| (h, WindowRole::Frame))
    }

    /// Client window ids in creation order (`_NET_CLIENT_LIST`).
    pub fn creation_order(&self) -> Vec<Xid> {
        self.by_window.keys().copied().collect()
    }

    pub fn live(&self, h: Handle) -> bool {
        self.slots.live(h)
    }

    pub fn hot(&self, h: Handle) -> Option<&ClientHot> {
        self.slots.hot(h)
    }

    pub fn hot_mut(&mut self, h: Handle) -> Option<&mut ClientHot> {
        self.slots.hot_mut(h)
    }

    pub fn cold(&self, h: Handle) -> Option<&ClientCold> {
        self.slots.cold(h)
    }

    pub fn cold_mut(&mut self, h: Handle) -> Option<&mut ClientCold> {
        self.slots.cold_mut(h)
    }

    pub fn pair_mut(&mut self, h: Handle) -> Option<(&mut ClientHot, &mut ClientCold)> {
        self.slots.pair_mut(h)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle, &ClientHot, &ClientCold)> {
        self.slots.iter()
    }

    pub fn handles(&self) -> Vec<Handle> {
        self.slots.handles()
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
