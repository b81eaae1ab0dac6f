// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Renderer seam.
//!
//! Frame chrome (title bars, borders, the menu surface) is drawn outside the
//! core; the commit phase hands the renderer one notification per dirty
//! client per tick. The engine never waits on the renderer.

use crate::client::Dirty;
use crate::geom::Rect;
use crate::slotmap::Handle;

pub trait FrameChrome {
    /// A client's chrome needs repainting. `style` carries the dirty bits
    /// that triggered the repaint (title, frame style); `exposed` is the
    /// unioned expose region for the tick, when any.
    fn frame_dirty(&mut self, client: Handle, title: &str, style: Dirty, exposed: Option<Rect>);

    /// The root menu opened or closed.
    fn menu_visible(&mut self, visible: bool);
}

/// Renderer used when no drawing stack is wired in.
#[derive(Debug, Default)]
pub struct NullChrome;

impl FrameChrome for NullChrome {
    fn frame_dirty(&mut self, _client: Handle, _title: &str, _style: Dirty, _exposed: Option<Rect>) {}

    fn menu_visible(&mut self, _visible: bool) {}
}

/// Test renderer recording every notification.
#[derive(Debug, Default)]
pub struct RecordingChrome {
    pub frames: Vec<(Handle, String, Dirty)>,
    pub menu_events: Vec<bool>,
}

impl FrameChrome for RecordingChrome {
    fn frame_dirty(&mut self, client: Handle, title: &str, style: Dirty, _exposed: Option<Rect>) {
        self.frames.push((client, title.to_string(), style));
    }

    fn menu_visible(&mut self, visible: bool) {
        self.menu_events.push(visible);
    }
}
