// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted display transport.
//!
//! Backs the unit and scenario suites and the binary's `loopback` backend. The
//! transport keeps a table of scripted windows; reply-expecting requests are
//! answered from that table at submit time, so a full adoption round-trip
//! completes within a single tick's drain phase, the same shape a warm
//! server connection has.
//!
//! Cloning yields a second handle onto the same scripted display, which is
//! how tests keep an inspection handle while the engine owns the transport.

use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::os::fd::BorrowedFd;
use std::rc::Rc;

use indexmap::IndexMap;

use super::{
    Event, MapState, PollReply, PropReply, Reply, Request, Seq, Transport, Xid,
};
use crate::error::{ProtoError, ProtoErrorKind, WmError};
use crate::geom::Rect;

/// The root window id of the scripted display.
pub const ROOT: Xid = Xid(1);

/// Scripted per-window state.
#[derive(Debug, Clone)]
pub struct ScriptWindow {
    pub override_redirect: bool,
    pub map_state: MapState,
    pub rect: Rect,
    pub border: u32,
    pub parent: Xid,
    pub colormap: Xid,
    pub props: HashMap<super::Atom, PropReply>,
}

impl Default for ScriptWindow {
    fn default() -> Self {
        Self {
            override_redirect: false,
            map_state: MapState::Unmapped,
            rect: Rect::new(0, 0, 640, 480),
            border: 0,
            parent: ROOT,
            colormap: Xid::NONE,
            props: HashMap::new(),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    seq: Seq,
    next_id: u32,
    windows: IndexMap<Xid, ScriptWindow>,
    /// Property values written by the engine, kept structured for
    /// inspection; `DeleteProperty` removes the entry.
    published: HashMap<(Xid, super::Atom), super::PropValue>,
    requests: Vec<(Seq, Request)>,
    events: VecDeque<Event>,
    replies: HashMap<Seq, PollReply>,
    /// When set, reply-expecting submits are left unanswered.
    swallow_replies: bool,
    block_flush: bool,
    flushes: u64,
    extensions: HashMap<&'static str, bool>,
    selection_owner: Xid,
    grab_refused: bool,
}

/// Cloneable handle onto a scripted display.
#[derive(Debug, Clone, Default)]
pub struct ScriptTransport(Rc<RefCell<Inner>>);

impl ScriptTransport {
    pub fn new() -> Self {
        let t = Self::default();
        {
            let mut inner = t.0.borrow_mut();
            inner.next_id = 0x60_0000;
            inner.windows.insert(
                ROOT,
                ScriptWindow {
                    map_state: MapState::Viewable,
                    rect: Rect::new(0, 0, 1280, 800),
                    parent: Xid::NONE,
                    ..ScriptWindow::default()
                },
            );
            inner.extensions.insert("RANDR", true);
            inner.extensions.insert("DAMAGE", true);
        }
        t
    }

    // -- scripting ------------------------------------------------------------

    /// Add a client window to the scripted display.
    pub fn add_window(&self, window: Xid, win: ScriptWindow) {
        self.0.borrow_mut().windows.insert(window, win);
    }

    /// Set a property on a scripted window.
    pub fn set_window_property(&self, window: Xid, atom: super::Atom, reply: PropReply) {
        if let Some(w) = self.0.borrow_mut().windows.get_mut(&window) {
            w.props.insert(atom, reply);
        }
    }

    /// Remove a window so every later query about it fails with `BadWindow`.
    pub fn vanish(&self, window: Xid) {
        self.0.borrow_mut().windows.shift_remove(&window);
    }

    /// Queue an event for the next ingest.
    pub fn deliver(&self, event: Event) {
        self.0.borrow_mut().events.push_back(event);
    }

    /// Stop auto-answering reply-expecting requests (timeout tests).
    pub fn swallow_replies(&self, on: bool) {
        self.0.borrow_mut().swallow_replies = on;
    }

    /// Inject a reply for a swallowed sequence, e.g. a late reply after the
    /// cookie deadline fired.
    pub fn inject_reply(&self, seq: Seq, reply: Reply) {
        self.0.borrow_mut().replies.insert(seq, PollReply::Reply(reply));
    }

    /// Inject a protocol error for a swallowed sequence.
    pub fn inject_error(&self, seq: Seq, kind: ProtoErrorKind) {
        self.0.borrow_mut().replies.insert(seq, PollReply::Error(ProtoError { kind, seq }));
    }

    /// Make the next flushes report would-block.
    pub fn block_flush(&self, on: bool) {
        self.0.borrow_mut().block_flush = on;
    }

    pub fn refuse_grabs(&self, on: bool) {
        self.0.borrow_mut().grab_refused = on;
    }

    pub fn set_selection_owner_scripted(&self, owner: Xid) {
        self.0.borrow_mut().selection_owner = owner;
    }

    // -- inspection -----------------------------------------------------------

    /// Drain and return every request submitted since the last call.
    pub fn take_requests(&self) -> Vec<(Seq, Request)> {
        std::mem::take(&mut self.0.borrow_mut().requests)
    }

    pub fn flush_count(&self) -> u64 {
        self.0.borrow().flushes
    }

    /// Current value of a property as maintained by `ChangeProperty` and
    /// `DeleteProperty` submissions from the engine.
    pub fn published(&self, window: Xid, atom: super::Atom) -> Option<super::PropValue> {
        self.0.borrow().published.get(&(window, atom)).cloned()
    }

    pub fn window(&self, window: Xid) -> Option<ScriptWindow> {
        self.0.borrow().windows.get(&window).cloned()
    }

    pub fn window_exists(&self, window: Xid) -> bool {
        self.0.borrow().windows.contains_key(&window)
    }

    pub fn pending_events(&self) -> usize {
        self.0.borrow().events.len()
    }

    fn answer(inner: &mut Inner, seq: Seq, req: &Request) {
        if inner.swallow_replies {
            return;
        }
        let reply = match req {
            Request::GetProperty { window, atom } => match inner.windows.get(window) {
                Some(w) => PollReply::Reply(Reply::Property(w.props.get(atom).cloned())),
                None => PollReply::Error(ProtoError { kind: ProtoErrorKind::BadWindow, seq }),
            },
            Request::GetWindowAttributes { window } => match inner.windows.get(window) {
                Some(w) => PollReply::Reply(Reply::Attributes {
                    override_redirect: w.override_redirect,
                    map_state: w.map_state,
                    colormap: w.colormap,
                }),
                None => PollReply::Error(ProtoError { kind: ProtoErrorKind::BadWindow, seq }),
            },
            Request::GetGeometry { window } => match inner.windows.get(window) {
                Some(w) => PollReply::Reply(Reply::Geometry { rect: w.rect, border: w.border }),
                None => PollReply::Error(ProtoError { kind: ProtoErrorKind::BadDrawable, seq }),
            },
            Request::QueryTree { window } => {
                let children: Vec<Xid> = inner
                    .windows
                    .iter()
                    .filter(|(_, w)| w.parent == *window)
                    .map(|(id, _)| *id)
                    .collect();
                PollReply::Reply(Reply::Tree { children })
            }
            Request::QueryExtension { name } => PollReply::Reply(Reply::Extension {
                present: inner.extensions.get(name).copied().unwrap_or(false),
            }),
            Request::GetSelectionOwner { .. } => {
                PollReply::Reply(Reply::SelectionOwner { owner: inner.selection_owner })
            }
            Request::GrabPointer { .. } | Request::GrabKeyboard { .. } => {
                PollReply::Reply(Reply::GrabStatus { success: !inner.grab_refused })
            }
            _ => return,
        };
        inner.replies.insert(seq, reply);
    }

    fn apply(inner: &mut Inner, req: &Request) {
        match req {
            Request::CreateWindow { window, parent, rect, .. } => {
                inner.windows.insert(
                    *window,
                    ScriptWindow { rect: *rect, parent: *parent, ..ScriptWindow::default() },
                );
            }
            Request::DestroyWindow { window } => {
                inner.windows.shift_remove(window);
            }
            Request::ReparentWindow { window, parent, x, y } => {
                if let Some(w) = inner.windows.get_mut(window) {
                    w.parent = *parent;
                    w.rect.x = *x;
                    w.rect.y = *y;
                }
            }
            Request::MapWindow { window } => {
                if let Some(w) = inner.windows.get_mut(window) {
                    w.map_state = MapState::Viewable;
                }
            }
            Request::UnmapWindow { window } => {
                if let Some(w) = inner.windows.get_mut(window) {
                    w.map_state = MapState::Unmapped;
                }
            }
            Request::ConfigureWindow { window, values } => {
                if let Some(w) = inner.windows.get_mut(window) {
                    if let Some(x) = values.x {
                        w.rect.x = x;
                    }
                    if let Some(y) = values.y {
                        w.rect.y = y;
                    }
                    if let Some(width) = values.w {
                        w.rect.w = width;
                    }
                    if let Some(height) = values.h {
                        w.rect.h = height;
                    }
                    if let Some(border) = values.border {
                        w.border = border;
                    }
                }
            }
            Request::ChangeProperty { window, atom, value, .. } => {
                inner.published.insert((*window, *atom), value.clone());
            }
            Request::DeleteProperty { window, atom } => {
                inner.published.remove(&(*window, *atom));
            }
            Request::SetSelectionOwner { owner, .. } => {
                inner.selection_owner = *owner;
            }
            _ => {}
        }
    }
}

impl Transport for ScriptTransport {
    fn fd(&self) -> Option<BorrowedFd<'_>> {
        None
    }

    fn root(&self) -> Xid {
        ROOT
    }

    fn screen_size(&self) -> Rect {
        self.0.borrow().windows.get(&ROOT).map(|w| w.rect).unwrap_or_default()
    }

    fn generate_id(&mut self) -> Xid {
        let mut inner = self.0.borrow_mut();
        inner.next_id += 1;
        Xid(inner.next_id)
    }

    fn submit(&mut self, req: Request) -> Seq {
        let mut inner = self.0.borrow_mut();
        inner.seq += 1;
        let seq = inner.seq;
        if req.expects_reply() {
            Self::answer(&mut inner, seq, &req);
        } else {
            Self::apply(&mut inner, &req);
        }
        inner.requests.push((seq, req));
        seq
    }

    fn poll_event(&mut self) -> Option<Event> {
        self.0.borrow_mut().events.pop_front()
    }

    fn poll_reply(&mut self, seq: Seq) -> PollReply {
        self.0.borrow_mut().replies.remove(&seq).unwrap_or(PollReply::Pending)
    }

    fn wait_reply(&mut self, seq: Seq) -> PollReply {
        self.poll_reply(seq)
    }

    fn flush(&mut self) -> Result<bool, WmError> {
        let mut inner = self.0.borrow_mut();
        if inner.block_flush {
            return Ok(false);
        }
        inner.flushes += 1;
        Ok(true)
    }
}
