// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Root-window conformance properties.
//!
//! Panels and taskbars read these; each one is written at most once per
//! tick, when its dirty bit is set.

use crate::client::ClientState;
use crate::proto::{Atom, PropValue, Request, Xid};
use crate::wm::{RootDirty, Wm};

/// Everything advertised in `_NET_SUPPORTED`.
pub const SUPPORTED: [Atom; 29] = [
    Atom::NetSupported,
    Atom::NetSupportingWmCheck,
    Atom::NetClientList,
    Atom::NetClientListStacking,
    Atom::NetNumberOfDesktops,
    Atom::NetCurrentDesktop,
    Atom::NetDesktopNames,
    Atom::NetWorkarea,
    Atom::NetActiveWindow,
    Atom::NetShowingDesktop,
    Atom::NetCloseWindow,
    Atom::NetWmName,
    Atom::NetWmDesktop,
    Atom::NetWmStrutPartial,
    Atom::NetFrameExtents,
    Atom::NetWmAllowedActions,
    Atom::NetWmState,
    Atom::NetWmStateFullscreen,
    Atom::NetWmStateAbove,
    Atom::NetWmStateBelow,
    Atom::NetWmStateSticky,
    Atom::NetWmStateHidden,
    Atom::NetWmStateDemandsAttention,
    Atom::NetWmStateSkipTaskbar,
    Atom::NetWmStateSkipPager,
    Atom::NetWmWindowType,
    Atom::NetWmWindowTypeDialog,
    Atom::NetWmWindowTypeDock,
    Atom::NetWmWindowTypeNormal,
];

impl Wm {
    /// Announce the window manager: the supporting check window and the
    /// startup property set. Called once from setup; the per-tick dirty
    /// machinery keeps everything current afterwards.
    pub fn announce(&mut self) {
        let check = self.transport.generate_id();
        let root = self.root.window;
        self.submit(Request::CreateWindow {
            window: check,
            parent: root,
            rect: crate::geom::Rect::new(-1, -1, 1, 1),
            class: crate::proto::WindowClass::InputOnly,
            events: crate::proto::EventMask::empty(),
        });
        for target in [root, check] {
            self.submit(Request::ChangeProperty {
                window: target,
                atom: Atom::NetSupportingWmCheck,
                type_: Atom::Window,
                value: PropValue::Windows(vec![check]),
            });
        }
        self.submit(Request::ChangeProperty {
            window: check,
            atom: Atom::NetWmName,
            type_: Atom::Utf8String,
            value: PropValue::Utf8("casement".into()),
        });
        self.root.check = check;
        self.root.dirty = RootDirty::all();
    }

    /// Write the dirty subset of the root properties.
    pub fn publish_root(&mut self) {
        let dirty = std::mem::take(&mut self.root.dirty);
        if dirty.is_empty() {
            return;
        }
        let root = self.root.window;

        if dirty.contains(RootDirty::SUPPORTED) {
            self.submit(Request::ChangeProperty {
                window: root,
                atom: Atom::NetSupported,
                type_: Atom::AtomType,
                value: PropValue::Atoms(SUPPORTED.to_vec()),
            });
        }
        if dirty.contains(RootDirty::CLIENT_LIST) {
            let list = self.managed_creation_order();
            self.submit(Request::ChangeProperty {
                window: root,
                atom: Atom::NetClientList,
                type_: Atom::Window,
                value: PropValue::Windows(list),
            });
        }
        if dirty.contains(RootDirty::CLIENT_LIST_STACKING) {
            let list: Vec<Xid> = self
                .stack
                .global_order()
                .into_iter()
                .filter_map(|h| self.clients.hot(h).map(|c| c.window))
                .collect();
            self.submit(Request::ChangeProperty {
                window: root,
                atom: Atom::NetClientListStacking,
                type_: Atom::Window,
                value: PropValue::Windows(list),
            });
        }
        if dirty.contains(RootDirty::ACTIVE_WINDOW) {
            match self.clients.hot(self.focused).map(|c| c.window) {
                Some(window) => {
                    self.submit(Request::ChangeProperty {
                        window: root,
                        atom: Atom::NetActiveWindow,
                        type_: Atom::Window,
                        value: PropValue::Windows(vec![window]),
                    });
                }
                None => {
                    self.submit(Request::DeleteProperty {
                        window: root,
                        atom: Atom::NetActiveWindow,
                    });
                }
            }
        }
        if dirty.contains(RootDirty::DESKTOP_COUNT) {
            let count = self.root.desktops;
            self.submit(Request::ChangeProperty {
                window: root,
                atom: Atom::NetNumberOfDesktops,
                type_: Atom::Cardinal,
                value: PropValue::Cardinals(vec![count]),
            });
        }
        if dirty.contains(RootDirty::CURRENT_DESKTOP) {
            let current = self.root.current_desktop;
            self.submit(Request::ChangeProperty {
                window: root,
                atom: Atom::NetCurrentDesktop,
                type_: Atom::Cardinal,
                value: PropValue::Cardinals(vec![current]),
            });
        }
        if dirty.contains(RootDirty::DESKTOP_NAMES) {
            let joined = self.root.names.join("\0");
            self.submit(Request::ChangeProperty {
                window: root,
                atom: Atom::NetDesktopNames,
                type_: Atom::Utf8String,
                value: PropValue::Utf8(joined),
            });
        }
        if dirty.contains(RootDirty::WORKAREA) {
            let mut words = Vec::with_capacity(self.root.desktops as usize * 4);
            for area in self.compute_workareas() {
                words.push(area.x.max(0) as u32);
                words.push(area.y.max(0) as u32);
                words.push(area.w);
                words.push(area.h);
            }
            self.submit(Request::ChangeProperty {
                window: root,
                atom: Atom::NetWorkarea,
                type_: Atom::Cardinal,
                value: PropValue::Cardinals(words),
            });
        }
        if dirty.contains(RootDirty::SHOWING_DESKTOP) {
            let showing = u32::from(self.root.showing_desktop);
            self.submit(Request::ChangeProperty {
                window: root,
                atom: Atom::NetShowingDesktop,
                type_: Atom::Cardinal,
                value: PropValue::Cardinals(vec![showing]),
            });
        }
    }

    /// Creation-order window list, restricted to clients that completed
    /// adoption.
    fn managed_creation_order(&self) -> Vec<Xid> {
        self.clients
            .creation_order()
            .into_iter()
            .filter(|xid| {
                self.clients
                    .by_window(*xid)
                    .and_then(|h| self.clients.hot(h))
                    .map(|hot| {
                        !matches!(hot.state, ClientState::New | ClientState::Unmanaging)
                    })
                    .unwrap_or(false)
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "ewmh_tests.rs"]
mod tests;
