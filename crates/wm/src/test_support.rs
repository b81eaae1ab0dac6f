// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: engine builders, scripted windows, and
//! request assertions.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use crate::chrome::{FrameChrome, RecordingChrome};
use crate::client::Dirty;
use crate::config::Config;
use crate::geom::Rect;
use crate::proto::fake::{ScriptTransport, ScriptWindow};
use crate::proto::{Atom, Event, MapState, PropReply, Request, Xid};
use crate::slotmap::Handle;
use crate::wm::Wm;

/// A [`RecordingChrome`] the test keeps a handle to while the engine owns
/// the other.
#[derive(Debug, Clone, Default)]
pub struct SharedChrome(pub Rc<RefCell<RecordingChrome>>);

impl FrameChrome for SharedChrome {
    fn frame_dirty(&mut self, client: Handle, title: &str, style: Dirty, exposed: Option<Rect>) {
        self.0.borrow_mut().frame_dirty(client, title, style, exposed);
    }

    fn menu_visible(&mut self, visible: bool) {
        self.0.borrow_mut().menu_visible(visible);
    }
}

/// Engine plus handles onto its scripted display and recording chrome.
pub struct Fixture {
    pub wm: Wm,
    pub script: ScriptTransport,
    pub chrome: SharedChrome,
    pub t0: Instant,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let script = ScriptTransport::new();
        let chrome = SharedChrome::default();
        let wm = Wm::new(config, Box::new(script.clone()), Box::new(chrome.clone()));
        Self { wm, script, chrome, t0: Instant::now() }
    }

    /// Script a window, deliver its MapRequest, and run the adoption to
    /// completion: one tick to begin the queries, one to drain the replies
    /// and commit. The scripted display answers at submit time, so no more
    /// ticks are ever needed.
    pub fn manage(&mut self, xid: Xid, win: ScriptWindow) -> Handle {
        self.script.add_window(xid, win);
        self.script.deliver(Event::MapRequest { window: xid });
        self.wm.tick(self.t0);
        self.wm.tick(self.t0);
        self.wm.clients.by_window(xid).unwrap_or(Handle::INVALID)
    }

    /// Drop recorded requests so later assertions see a clean slate.
    pub fn clear_requests(&mut self) {
        let _ = self.script.take_requests();
    }

    /// Requests recorded since the last drain.
    pub fn requests(&mut self) -> Vec<Request> {
        self.script.take_requests().into_iter().map(|(_, r)| r).collect()
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A viewable, decorated, normal scripted window.
pub fn plain_window(rect: Rect) -> ScriptWindow {
    ScriptWindow { rect, map_state: MapState::Unmapped, ..ScriptWindow::default() }
}

/// Builder-style helpers on top of [`ScriptWindow`].
pub fn with_prop(mut win: ScriptWindow, atom: Atom, reply: PropReply) -> ScriptWindow {
    win.props.insert(atom, reply);
    win
}

pub fn with_class(win: ScriptWindow, instance: &str, class: &str) -> ScriptWindow {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(instance.as_bytes());
    bytes.push(0);
    bytes.extend_from_slice(class.as_bytes());
    bytes.push(0);
    with_prop(win, Atom::WmClass, PropReply::latin1(&bytes))
}

pub fn with_title(win: ScriptWindow, title: &str) -> ScriptWindow {
    with_prop(win, Atom::NetWmName, PropReply::utf8(title))
}

pub fn with_protocols(win: ScriptWindow, protocols: &[Atom]) -> ScriptWindow {
    with_prop(win, Atom::WmProtocols, PropReply::atoms(protocols))
}

pub fn with_window_type(win: ScriptWindow, type_atom: Atom) -> ScriptWindow {
    with_prop(win, Atom::NetWmWindowType, PropReply::atoms(&[type_atom]))
}

pub fn with_transient_for(win: ScriptWindow, parent: Xid) -> ScriptWindow {
    with_prop(win, Atom::WmTransientFor, PropReply::cardinals(Atom::Window, &[parent.0]))
}

pub fn with_desktop(win: ScriptWindow, desktop: u32) -> ScriptWindow {
    with_prop(win, Atom::NetWmDesktop, PropReply::cardinals(Atom::Cardinal, &[desktop]))
}

/// Extract the windows a request list mapped, in order.
pub fn mapped_windows(requests: &[Request]) -> Vec<Xid> {
    requests
        .iter()
        .filter_map(|r| match r {
            Request::MapWindow { window } => Some(*window),
            _ => None,
        })
        .collect()
}

/// Extract the windows a request list unmapped, in order.
pub fn unmapped_windows(requests: &[Request]) -> Vec<Xid> {
    requests
        .iter()
        .filter_map(|r| match r {
            Request::UnmapWindow { window } => Some(*window),
            _ => None,
        })
        .collect()
}
