// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interaction state machine: move, resize, root menu, and the alt-tab
//! switcher.
//!
//! Entering a mode grabs pointer and keyboard; `cancel` releases the grabs
//! and restores the original geometry. Motion is coalesced by the tick
//! buckets, so pending geometry moves at most once per tick no matter the
//! event rate.

use std::time::Instant;

use tracing::debug;

use crate::client::{ClientState, Dirty, NetState};
use crate::cookie::CookieKind;
use crate::geom::{Point, Rect};
use crate::proto::{
    ButtonEvent, KeyEvent, MotionEvent, Mods, Request, KEY_ESCAPE, KEY_RETURN, KEY_TAB,
};
use crate::slotmap::Handle;
use crate::wm::Wm;

/// Corner or edge being dragged, as `(-1|0|1, -1|0|1)` per axis.
pub type ResizeEdge = (i8, i8);

#[derive(Debug, Clone, Copy)]
pub struct Drag {
    pub target: Handle,
    pub start: Point,
    pub orig: Rect,
    pub edge: ResizeEdge,
}

#[derive(Debug, Clone, Copy)]
pub struct Switcher {
    pub candidate: Handle,
}

/// Interaction modes. `None` is steady state.
#[derive(Debug, Clone, Copy, Default)]
pub enum Mode {
    #[default]
    None,
    Move(Drag),
    Resize(Drag),
    Menu,
    Switcher(Switcher),
}

impl Mode {
    pub fn target(&self) -> Handle {
        match self {
            Mode::Move(d) | Mode::Resize(d) => d.target,
            Mode::Switcher(s) => s.candidate,
            _ => Handle::INVALID,
        }
    }

    pub fn active(&self) -> bool {
        !matches!(self, Mode::None)
    }
}

impl Wm {
    fn grab_input(&mut self, now: Instant) {
        let root = self.root.window;
        let seq = self.submit(Request::GrabPointer { window: root });
        self.jar.push(seq, CookieKind::Grab, Handle::INVALID, root, now);
        let seq = self.submit(Request::GrabKeyboard { window: root });
        self.jar.push(seq, CookieKind::Grab, Handle::INVALID, root, now);
    }

    fn ungrab_input(&mut self) {
        self.submit(Request::UngrabPointer);
        self.submit(Request::UngrabKeyboard);
    }

    /// Start a pointer move. Docks and fullscreen windows are pinned.
    pub fn begin_move(&mut self, h: Handle, at: Point, now: Instant) {
        if self.mode.active() {
            return;
        }
        let Some(hot) = self.clients.hot(h) else { return };
        if hot.state != ClientState::Mapped
            || hot.wtype.fixed()
            || hot.net_state.contains(NetState::FULLSCREEN)
        {
            return;
        }
        let drag = Drag { target: h, start: at, orig: hot.desired, edge: (0, 0) };
        let window = hot.window;
        self.grab_input(now);
        self.mode = Mode::Move(drag);
        debug!(window = %window, "move begins");
    }

    /// Start a pointer resize; the dragged corner is the quadrant of the
    /// press position.
    pub fn begin_resize(&mut self, h: Handle, at: Point, now: Instant) {
        if self.mode.active() {
            return;
        }
        let Some(hot) = self.clients.hot(h) else { return };
        if hot.state != ClientState::Mapped
            || hot.wtype.fixed()
            || hot.net_state.contains(NetState::FULLSCREEN)
            || (hot.hints.fixed_w() && hot.hints.fixed_h())
        {
            return;
        }
        let rect = hot.desired;
        let cx = rect.x + rect.w as i32 / 2;
        let cy = rect.y + rect.h as i32 / 2;
        let edge = (if at.x < cx { -1 } else { 1 }, if at.y < cy { -1 } else { 1 });
        let drag = Drag { target: h, start: at, orig: rect, edge };
        let window = hot.window;
        self.grab_input(now);
        self.mode = Mode::Resize(drag);
        debug!(window = %window, ?edge, "resize begins");
    }

    pub fn open_menu(&mut self, now: Instant) {
        if self.mode.active() {
            return;
        }
        self.grab_input(now);
        self.mode = Mode::Menu;
        self.chrome.menu_visible(true);
    }

    pub fn begin_switcher(&mut self, forward: bool, now: Instant) {
        if self.mode.active() {
            return;
        }
        let candidate = self.cycle_focus(forward);
        if !candidate.is_valid() {
            return;
        }
        self.grab_input(now);
        self.mode = Mode::Switcher(Switcher { candidate });
    }

    /// Abandon the current mode; a drag restores the original geometry.
    pub fn cancel_interaction(&mut self) {
        match self.mode {
            Mode::None => return,
            Mode::Move(drag) | Mode::Resize(drag) => {
                if let Some(hot) = self.clients.hot_mut(drag.target) {
                    hot.desired = drag.orig;
                    hot.dirty |= Dirty::GEOM;
                }
            }
            Mode::Menu => self.chrome.menu_visible(false),
            Mode::Switcher(_) => {}
        }
        self.ungrab_input();
        self.mode = Mode::None;
    }

    /// Cancel only when the vanished client is the interaction target.
    pub fn cancel_interaction_for(&mut self, h: Handle) {
        if self.mode.target() == h {
            self.cancel_interaction();
        }
    }

    /// Finish a drag, keeping the dragged geometry.
    fn end_drag(&mut self) {
        if matches!(self.mode, Mode::Move(_) | Mode::Resize(_)) {
            self.ungrab_input();
            self.mode = Mode::None;
        }
    }

    fn commit_switcher(&mut self) {
        if let Mode::Switcher(s) = self.mode {
            self.ungrab_input();
            self.mode = Mode::None;
            self.set_focus(s.candidate);
            if let Some(hot) = self.clients.hot(s.candidate) {
                let rect = hot.desired;
                self.submit(Request::WarpPointer {
                    x: rect.x + rect.w as i32 / 2,
                    y: rect.y + rect.h as i32 / 2,
                });
            }
        }
    }

    pub fn handle_key_press(&mut self, key: KeyEvent, now: Instant) {
        match self.mode {
            Mode::None => {
                if key.mods.contains(Mods::MOD1) && key.sym == KEY_TAB {
                    self.begin_switcher(!key.mods.contains(Mods::SHIFT), now);
                }
            }
            Mode::Switcher(s) => match key.sym {
                KEY_ESCAPE => self.cancel_interaction(),
                KEY_RETURN => self.commit_switcher(),
                KEY_TAB => {
                    let forward = !key.mods.contains(Mods::SHIFT);
                    let next = self.cycle_from(s.candidate, forward);
                    if let Mode::Switcher(ref mut sw) = self.mode {
                        sw.candidate = next;
                    }
                }
                _ => {}
            },
            Mode::Menu => {
                if key.sym == KEY_ESCAPE {
                    self.cancel_interaction();
                }
            }
            Mode::Move(_) | Mode::Resize(_) => {
                if key.sym == KEY_ESCAPE {
                    self.cancel_interaction();
                }
            }
        }
    }

    pub fn handle_key_release(&mut self, key: KeyEvent) {
        // The switcher commits when the modifier is released.
        if matches!(self.mode, Mode::Switcher(_)) && !key.mods.contains(Mods::MOD1) {
            self.commit_switcher();
        }
    }

    pub fn handle_button_press(&mut self, event: ButtonEvent, now: Instant) {
        if let Mode::Menu = self.mode {
            // Any click dismisses the menu; the selection itself is the
            // renderer's concern.
            self.cancel_interaction();
            return;
        }
        if self.mode.active() {
            return;
        }
        if event.window == self.root.window {
            if event.button == 3 {
                self.open_menu(now);
            }
            return;
        }
        let Some((h, _)) = self.clients.find(event.window) else { return };
        if let Some(hot) = self.clients.hot_mut(h) {
            hot.user_time = event.time;
        }
        let at = Point::new(event.root_x, event.root_y);
        if event.mods.contains(Mods::MOD1) {
            match event.button {
                1 => self.begin_move(h, at, now),
                3 => self.begin_resize(h, at, now),
                _ => {}
            }
            return;
        }
        // Click-to-focus on the frame.
        if self.focusable(h) {
            self.set_focus(h);
        }
    }

    pub fn handle_button_release(&mut self, _event: ButtonEvent) {
        self.end_drag();
    }

    /// Apply the tick's coalesced motion to the pending geometry.
    pub fn apply_motion(&mut self, motion: MotionEvent) {
        let at = Point::new(motion.root_x, motion.root_y);
        match self.mode {
            Mode::Move(drag) => {
                let dx = at.x - drag.start.x;
                let dy = at.y - drag.start.y;
                if let Some(hot) = self.clients.hot_mut(drag.target) {
                    let moved = drag.orig.translate(dx, dy);
                    if hot.desired != moved {
                        hot.desired = moved;
                        hot.dirty |= Dirty::GEOM;
                    }
                }
            }
            Mode::Resize(drag) => {
                let dx = at.x - drag.start.x;
                let dy = at.y - drag.start.y;
                let Some(hot) = self.clients.hot_mut(drag.target) else { return };
                let mut rect = drag.orig;
                if drag.edge.0 > 0 {
                    rect.w = (rect.w as i32 + dx).max(1) as u32;
                } else if drag.edge.0 < 0 {
                    rect.w = (rect.w as i32 - dx).max(1) as u32;
                }
                if drag.edge.1 > 0 {
                    rect.h = (rect.h as i32 + dy).max(1) as u32;
                } else if drag.edge.1 < 0 {
                    rect.h = (rect.h as i32 - dy).max(1) as u32;
                }
                let (w, h) = hot.hints.constrain(rect.w, rect.h);
                rect.w = w;
                rect.h = h;
                if drag.edge.0 < 0 {
                    rect.x = drag.orig.x + drag.orig.w as i32 - rect.w as i32;
                }
                if drag.edge.1 < 0 {
                    rect.y = drag.orig.y + drag.orig.h as i32 - rect.h as i32;
                }
                if hot.desired != rect {
                    hot.desired = rect;
                    hot.dirty |= Dirty::GEOM;
                }
            }
            _ => {}
        }
    }

    /// Next focusable entry after `from` in MRU order, for switcher cycling.
    fn cycle_from(&self, from: Handle, forward: bool) -> Handle {
        let mut order = self.focus_history();
        if order.is_empty() {
            return from;
        }
        if !forward {
            order.reverse();
        }
        let start = order.iter().position(|h| *h == from).unwrap_or(0);
        let n = order.len();
        for step in 1..=n {
            let h = order[(start + step) % n];
            if self.focusable(h) {
                return h;
            }
        }
        from
    }
}

#[cfg(test)]
#[path = "interact_tests.rs"]
mod tests;
