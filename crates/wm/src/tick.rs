// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The tick scheduler: ingest → drain replies → process → commit.
//!
//! Ingest classifies and coalesces raw events into per-tick buckets; the
//! process phase applies the buckets to the model in a fixed order; commit
//! flushes dirty state. No phase ever blocks on a display-server reply.
//!
//! Bucket containers are cleared but keep their capacity across ticks;
//! that reuse is the tick arena. Nothing drained from a bucket survives
//! `reset`.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Instant;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::client::{ClientState, Dirty};
use crate::geom::Rect;
use crate::proto::{
    Atom, ButtonEvent, ClientMessage, ConfigMask, ConfigureRequest, Event, KeyEvent, MotionEvent,
    StackMode, Xid,
};
use crate::wm::{RootDirty, Wm};

/// Per-tick event buckets.
///
/// Ordered queues preserve arrival order because lifecycle events do not
/// commute; keyed maps coalesce to the latest value per window (or per
/// window+atom); regions union.
#[derive(Debug, Default)]
pub struct Buckets {
    pub map_requests: VecDeque<Xid>,
    pub unmaps: VecDeque<Xid>,
    pub destroys: VecDeque<Xid>,
    pub reparented_away: VecDeque<Xid>,
    pub keys: VecDeque<(bool, KeyEvent)>,
    pub buttons: VecDeque<(bool, ButtonEvent)>,
    pub messages: VecDeque<ClientMessage>,
    pub colormaps: VecDeque<Xid>,
    pub focus_lost: VecDeque<Xid>,
    pub configure_requests: IndexMap<Xid, ConfigureRequest>,
    pub configure_notifies: IndexMap<Xid, (Rect, u32)>,
    pub property_notifies: IndexMap<(Xid, Atom), ()>,
    pub motions: IndexMap<Xid, MotionEvent>,
    pub exposes: HashMap<Xid, Rect>,
    pub damages: HashMap<Xid, Rect>,
    /// Windows destroyed this tick; later events about them are discarded.
    pub destroyed: HashSet<Xid>,
}

impl Buckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// The arena reset: clear everything, keep capacity.
    pub fn reset(&mut self) {
        self.map_requests.clear();
        self.unmaps.clear();
        self.destroys.clear();
        self.reparented_away.clear();
        self.keys.clear();
        self.buttons.clear();
        self.messages.clear();
        self.colormaps.clear();
        self.focus_lost.clear();
        self.configure_requests.clear();
        self.configure_notifies.clear();
        self.property_notifies.clear();
        self.motions.clear();
        self.exposes.clear();
        self.damages.clear();
        self.destroyed.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.map_requests.is_empty()
            && self.unmaps.is_empty()
            && self.destroys.is_empty()
            && self.reparented_away.is_empty()
            && self.keys.is_empty()
            && self.buttons.is_empty()
            && self.messages.is_empty()
            && self.colormaps.is_empty()
            && self.focus_lost.is_empty()
            && self.configure_requests.is_empty()
            && self.configure_notifies.is_empty()
            && self.property_notifies.is_empty()
            && self.motions.is_empty()
            && self.exposes.is_empty()
            && self.damages.is_empty()
    }

    /// Merge a configure request: last writer wins per field, masks union.
    fn merge_configure(&mut self, req: ConfigureRequest) {
        let entry = self.configure_requests.entry(req.window).or_insert(req);
        entry.mask |= req.mask;
        if req.mask.contains(ConfigMask::X) {
            entry.x = req.x;
        }
        if req.mask.contains(ConfigMask::Y) {
            entry.y = req.y;
        }
        if req.mask.contains(ConfigMask::WIDTH) {
            entry.w = req.w;
        }
        if req.mask.contains(ConfigMask::HEIGHT) {
            entry.h = req.h;
        }
        if req.mask.contains(ConfigMask::BORDER) {
            entry.border = req.border;
        }
        if req.mask.contains(ConfigMask::SIBLING) {
            entry.sibling = req.sibling;
        }
        if req.mask.contains(ConfigMask::STACK_MODE) {
            entry.stack_mode = req.stack_mode;
        }
    }
}

impl Wm {
    /// One full tick. The only caller-provided input is the clock, which
    /// keeps every phase deterministic under test.
    pub fn tick(&mut self, now: Instant) {
        self.ingest(now);
        self.drain_replies(now);
        self.process(now);
        self.commit(now);
    }

    /// Phase (a): drain the transport into buckets, up to the event budget.
    fn ingest(&mut self, _now: Instant) {
        let budget = self.config.event_budget;
        for _ in 0..budget {
            let Some(event) = self.transport.poll_event() else { break };
            self.classify(event);
        }
    }

    fn classify(&mut self, event: Event) {
        // Tombstoning: a destroyed window's remaining events are noise.
        if let Some(window) = event.window() {
            if self.buckets.destroyed.contains(&window)
                && !matches!(event, Event::DestroyNotify { .. })
            {
                trace!(%window, "dropping event for destroyed window");
                return;
            }
        }
        match event {
            Event::MapRequest { window } => self.buckets.map_requests.push_back(window),
            Event::ConfigureRequest(req) => self.buckets.merge_configure(req),
            Event::ConfigureNotify { window, rect, border } => {
                self.buckets.configure_notifies.insert(window, (rect, border));
            }
            Event::UnmapNotify { window } => self.buckets.unmaps.push_back(window),
            Event::DestroyNotify { window } => {
                self.buckets.destroyed.insert(window);
                self.buckets.destroys.push_back(window);
            }
            Event::ReparentNotify { window, parent } => {
                // Reparent-to-self is noise, as is the notify generated by
                // our own frame reparent.
                if parent == window || self.clients.by_frame(parent).is_some() {
                    return;
                }
                if self.clients.by_window(window).is_some() {
                    self.buckets.reparented_away.push_back(window);
                }
            }
            Event::PropertyNotify { window, atom, .. } => {
                self.buckets.property_notifies.insert((window, atom), ());
            }
            Event::ClientMessage(msg) => self.buckets.messages.push_back(msg),
            Event::KeyPress(key) => self.buckets.keys.push_back((true, key)),
            Event::KeyRelease(key) => self.buckets.keys.push_back((false, key)),
            Event::ButtonPress(b) => self.buckets.buttons.push_back((true, b)),
            Event::ButtonRelease(b) => self.buckets.buttons.push_back((false, b)),
            Event::MotionNotify(m) => {
                self.buckets.motions.insert(m.window, m);
            }
            Event::Expose { window, rect } => {
                let entry = self.buckets.exposes.entry(window).or_default();
                *entry = entry.union(rect);
            }
            Event::Damage { window, rect } => {
                let entry = self.buckets.damages.entry(window).or_default();
                *entry = entry.union(rect);
            }
            Event::ColormapNotify { window } => self.buckets.colormaps.push_back(window),
            Event::FocusOut { window } => self.buckets.focus_lost.push_back(window),
            Event::SelectionClear { .. } => {
                debug!("selection lost, shutting down");
                self.shutdown = true;
            }
            Event::Error(err) => {
                // Reply errors arrive through the jar; a void-request error
                // is soft and only worth a log line.
                debug!(error = %err, "asynchronous protocol error");
            }
        }
    }

    /// Phase (b): drain replies through the cookie jar, then fire timeouts.
    fn drain_replies(&mut self, now: Instant) {
        let mut settled = Vec::new();
        let mut jar = std::mem::take(&mut self.jar);
        jar.drain(&mut *self.transport, self.config.reply_budget, &mut settled);
        jar.timeout_scan(now, &mut settled);
        self.jar = jar;
        for (slot, outcome) in settled {
            self.handle_cookie(slot, outcome, now);
        }
    }

    /// Phase (c): apply buckets in the documented commit order.
    fn process(&mut self, now: Instant) {
        // 1. Lifecycle. Destroys retire clients, unmaps withdraw or are
        //    swallowed, map requests begin adoption.
        while let Some(window) = self.buckets.destroys.pop_front() {
            match self.clients.find(window) {
                Some((h, crate::client::WindowRole::Client)) => {
                    let state = self.clients.hot(h).map(|c| c.state);
                    if state == Some(ClientState::New) {
                        self.abort_manage(h);
                        self.clients.release(h);
                    } else {
                        self.unmanage(h, true);
                    }
                }
                _ => trace!(%window, "destroy for unmanaged window"),
            }
        }
        while let Some(window) = self.buckets.unmaps.pop_front() {
            if self.buckets.destroyed.contains(&window) {
                continue;
            }
            let Some(h) = self.clients.by_window(window) else { continue };
            let swallowed = self
                .clients
                .hot_mut(h)
                .map(|hot| {
                    if hot.ignore_unmaps > 0 {
                        hot.ignore_unmaps -= 1;
                        true
                    } else {
                        false
                    }
                })
                .unwrap_or(true);
            if !swallowed {
                // A client-initiated unmap is a withdrawal.
                self.unmanage(h, false);
            }
        }
        while let Some(window) = self.buckets.reparented_away.pop_front() {
            if let Some(h) = self.clients.by_window(window) {
                self.unmanage(h, false);
            }
        }
        while let Some(window) = self.buckets.map_requests.pop_front() {
            if self.buckets.destroyed.contains(&window) {
                continue;
            }
            self.begin_manage(window, now);
        }

        // 2. Coalesced property notifies re-query through the jar.
        let notifies: Vec<(Xid, Atom)> =
            self.buckets.property_notifies.drain(..).map(|(k, _)| k).collect();
        for (window, atom) in notifies {
            if let Some(h) = self.clients.by_window(window) {
                self.requery_property(h, atom, now);
            }
        }

        // 3. Input.
        while let Some((press, key)) = self.buckets.keys.pop_front() {
            if press {
                self.handle_key_press(key, now);
            } else {
                self.handle_key_release(key);
            }
        }
        while let Some((press, button)) = self.buckets.buttons.pop_front() {
            if press {
                self.handle_button_press(button, now);
            } else {
                self.handle_button_release(button);
            }
        }
        while let Some(msg) = self.buckets.messages.pop_front() {
            self.handle_client_message(msg);
        }
        while let Some(window) = self.buckets.colormaps.pop_front() {
            self.handle_colormap_notify(window);
        }
        while let Some(_window) = self.buckets.focus_lost.pop_front() {
            if self.mode.active() {
                self.cancel_interaction();
            }
        }

        // 4. Geometry: configure requests against rules and hints, the
        //    latest motion for an active drag, root size changes.
        let requests: Vec<ConfigureRequest> =
            self.buckets.configure_requests.drain(..).map(|(_, r)| r).collect();
        for req in requests {
            match self.clients.by_window(req.window) {
                Some(h) => self.reconcile_configure(h, req),
                None => self.forward_configure(req),
            }
        }
        let root_resize = self.buckets.configure_notifies.shift_remove(&self.root.window);
        if let Some((rect, _)) = root_resize {
            if self.screen != rect {
                debug!(?rect, "screen geometry changed");
                self.screen = rect;
                self.mark_root_dirty(RootDirty::WORKAREA);
            }
        }
        self.buckets.configure_notifies.clear();
        if self.mode.active() {
            if let Some((_, motion)) = self.buckets.motions.last().map(|(k, v)| (*k, *v)) {
                self.apply_motion(motion);
            }
        }
        self.buckets.motions.clear();

        // 5. Stacking and focus side-effects of the above are dirty bits
        //    commit resolves.
    }

    /// Reconcile a client's configure request. Fullscreen clients are
    /// pinned; everything else gets hint-constrained geometry. A request
    /// that changes nothing still earns a synthetic ConfigureNotify.
    fn reconcile_configure(&mut self, h: crate::slotmap::Handle, req: ConfigureRequest) {
        let Some(hot) = self.clients.hot(h).copied() else { return };
        if hot.net_state.contains(crate::client::NetState::FULLSCREEN) {
            self.mark_synth_configure(h);
            return;
        }
        let mut rect = hot.desired;
        if req.mask.contains(ConfigMask::X) {
            rect.x = req.x;
        }
        if req.mask.contains(ConfigMask::Y) {
            rect.y = req.y;
        }
        if req.mask.contains(ConfigMask::WIDTH) {
            rect.w = req.w;
        }
        if req.mask.contains(ConfigMask::HEIGHT) {
            rect.h = req.h;
        }
        let (w, hgt) = hot.hints.constrain(rect.w, rect.h);
        rect.w = w;
        rect.h = hgt;
        if rect != hot.desired {
            if let Some(hot) = self.clients.hot_mut(h) {
                hot.desired = rect;
                hot.dirty |= Dirty::GEOM;
            }
        } else {
            self.mark_synth_configure(h);
        }
        if req.mask.contains(ConfigMask::STACK_MODE) {
            let mut stack = std::mem::take(&mut self.stack);
            match req.stack_mode {
                StackMode::Above => stack.raise(&mut self.clients, h),
                StackMode::Below => stack.lower(&mut self.clients, h),
            }
            self.stack = stack;
        }
    }

    fn mark_synth_configure(&mut self, h: crate::slotmap::Handle) {
        if let Some(hot) = self.clients.hot_mut(h) {
            hot.flags |= crate::client::ClientFlags::SYNTH_CONFIGURE;
            hot.dirty |= Dirty::GEOM;
        }
    }

    /// Configure requests for windows we do not manage pass through as-is.
    fn forward_configure(&mut self, req: ConfigureRequest) {
        let mut values = crate::proto::ConfigureValues::default();
        if req.mask.contains(ConfigMask::X) {
            values.x = Some(req.x);
        }
        if req.mask.contains(ConfigMask::Y) {
            values.y = Some(req.y);
        }
        if req.mask.contains(ConfigMask::WIDTH) {
            values.w = Some(req.w);
        }
        if req.mask.contains(ConfigMask::HEIGHT) {
            values.h = Some(req.h);
        }
        if req.mask.contains(ConfigMask::BORDER) {
            values.border = Some(req.border);
        }
        if req.mask.contains(ConfigMask::SIBLING) {
            values.sibling = Some(req.sibling);
        }
        if req.mask.contains(ConfigMask::STACK_MODE) {
            values.stack_mode = Some(req.stack_mode);
        }
        self.submit(crate::proto::Request::ConfigureWindow { window: req.window, values });
    }
}

#[cfg(test)]
#[path = "tick_tests.rs"]
mod tests;
