// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Display-server events as delivered by the transport.

use bitflags::bitflags;

use super::{Atom, Xid};
use crate::error::ProtoError;
use crate::geom::Rect;

bitflags! {
    /// Modifier state on input events.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Mods: u16 {
        const SHIFT = 1 << 0;
        const CONTROL = 1 << 2;
        const MOD1 = 1 << 3;
        const MOD4 = 1 << 6;
    }
}

bitflags! {
    /// Fields named by a `ConfigureRequest`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ConfigMask: u16 {
        const X = 1 << 0;
        const Y = 1 << 1;
        const WIDTH = 1 << 2;
        const HEIGHT = 1 << 3;
        const BORDER = 1 << 4;
        const SIBLING = 1 << 5;
        const STACK_MODE = 1 << 6;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackMode {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigureRequest {
    pub window: Xid,
    pub mask: ConfigMask,
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
    pub border: u32,
    pub sibling: Xid,
    pub stack_mode: StackMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub window: Xid,
    pub sym: u32,
    pub mods: Mods,
    pub time: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub window: Xid,
    pub button: u8,
    pub mods: Mods,
    pub root_x: i32,
    pub root_y: i32,
    pub time: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionEvent {
    pub window: Xid,
    pub root_x: i32,
    pub root_y: i32,
    pub time: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientMessage {
    pub window: Xid,
    pub message_type: Atom,
    pub data: [u32; 5],
}

/// Events the tick scheduler classifies into buckets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    MapRequest { window: Xid },
    ConfigureRequest(ConfigureRequest),
    ConfigureNotify { window: Xid, rect: Rect, border: u32 },
    UnmapNotify { window: Xid },
    DestroyNotify { window: Xid },
    ReparentNotify { window: Xid, parent: Xid },
    PropertyNotify { window: Xid, atom: Atom, deleted: bool },
    ClientMessage(ClientMessage),
    KeyPress(KeyEvent),
    KeyRelease(KeyEvent),
    ButtonPress(ButtonEvent),
    ButtonRelease(ButtonEvent),
    MotionNotify(MotionEvent),
    Expose { window: Xid, rect: Rect },
    Damage { window: Xid, rect: Rect },
    ColormapNotify { window: Xid },
    FocusOut { window: Xid },
    SelectionClear { selection: Atom },
    Error(ProtoError),
}

impl Event {
    /// The window the event is about, for tombstone filtering.
    pub fn window(&self) -> Option<Xid> {
        match self {
            Self::MapRequest { window }
            | Self::ConfigureNotify { window, .. }
            | Self::UnmapNotify { window }
            | Self::DestroyNotify { window }
            | Self::ReparentNotify { window, .. }
            | Self::PropertyNotify { window, .. }
            | Self::Expose { window, .. }
            | Self::Damage { window, .. }
            | Self::ColormapNotify { window }
            | Self::FocusOut { window } => Some(*window),
            Self::ConfigureRequest(r) => Some(r.window),
            Self::ClientMessage(m) => Some(m.window),
            Self::KeyPress(k) | Self::KeyRelease(k) => Some(k.window),
            Self::ButtonPress(b) | Self::ButtonRelease(b) => Some(b.window),
            Self::MotionNotify(m) => Some(m.window),
            Self::SelectionClear { .. } | Self::Error(_) => None,
        }
    }
}
