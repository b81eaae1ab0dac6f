// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Requests the engine submits to the transport.

use bitflags::bitflags;

use super::{Atom, PropValue, StackMode, Xid};
use crate::geom::Rect;

bitflags! {
    /// Event selection masks for `CreateWindow`/`ChangeAttributes`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EventMask: u32 {
        const SUBSTRUCTURE_REDIRECT = 1 << 0;
        const SUBSTRUCTURE_NOTIFY = 1 << 1;
        const STRUCTURE_NOTIFY = 1 << 2;
        const PROPERTY_CHANGE = 1 << 3;
        const ENTER_WINDOW = 1 << 4;
        const FOCUS_CHANGE = 1 << 5;
        const EXPOSURE = 1 << 6;
        const BUTTON_PRESS = 1 << 7;
        const BUTTON_RELEASE = 1 << 8;
        const POINTER_MOTION = 1 << 9;
        const KEY_PRESS = 1 << 10;
        const KEY_RELEASE = 1 << 11;
        const COLORMAP_CHANGE = 1 << 12;
    }
}

/// Partial window configuration; unset fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigureValues {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub w: Option<u32>,
    pub h: Option<u32>,
    pub border: Option<u32>,
    pub sibling: Option<Xid>,
    pub stack_mode: Option<StackMode>,
}

impl ConfigureValues {
    pub fn rect(r: Rect) -> Self {
        Self { x: Some(r.x), y: Some(r.y), w: Some(r.w), h: Some(r.h), ..Self::default() }
    }

    pub fn size(w: u32, h: u32) -> Self {
        Self { w: Some(w), h: Some(h), ..Self::default() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowClass {
    InputOutput,
    InputOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveSetMode {
    Add,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusRevert {
    PointerRoot,
    Parent,
}

/// Everything the engine can ask of the display server.
///
/// Requests marked *reply* are registered in the cookie jar by the caller;
/// the rest are fire-and-forget voids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    CreateWindow {
        window: Xid,
        parent: Xid,
        rect: Rect,
        class: WindowClass,
        events: EventMask,
    },
    DestroyWindow { window: Xid },
    MapWindow { window: Xid },
    UnmapWindow { window: Xid },
    ReparentWindow { window: Xid, parent: Xid, x: i32, y: i32 },
    ConfigureWindow { window: Xid, values: ConfigureValues },
    ChangeAttributes { window: Xid, events: EventMask },
    /// reply: [`super::PropReply`] or property-missing
    GetProperty { window: Xid, atom: Atom },
    ChangeProperty { window: Xid, atom: Atom, type_: Atom, value: PropValue },
    DeleteProperty { window: Xid, atom: Atom },
    /// reply: window attributes
    GetWindowAttributes { window: Xid },
    /// reply: drawable geometry
    GetGeometry { window: Xid },
    /// reply: children bottom-to-top
    QueryTree { window: Xid },
    /// reply: extension presence
    QueryExtension { name: &'static str },
    /// reply: current owner
    GetSelectionOwner { selection: Atom },
    SetSelectionOwner { selection: Atom, owner: Xid },
    /// reply: grab status
    GrabPointer { window: Xid },
    UngrabPointer,
    /// reply: grab status
    GrabKeyboard { window: Xid },
    UngrabKeyboard,
    GrabButton { window: Xid, button: u8, mods: super::Mods },
    UngrabButton { window: Xid, button: u8, mods: super::Mods },
    GrabKey { window: Xid, sym: u32, mods: super::Mods },
    UngrabKey { window: Xid, sym: u32, mods: super::Mods },
    SendClientMessage { window: Xid, message_type: Atom, data: [u32; 5] },
    /// ICCCM synthetic `ConfigureNotify` carrying absolute coordinates.
    SendConfigureNotify { window: Xid, rect: Rect, border: u32 },
    WarpPointer { x: i32, y: i32 },
    InstallColormap { colormap: Xid },
    KillClient { resource: Xid },
    SetInputFocus { focus: Xid, revert: FocusRevert },
    ChangeSaveSet { window: Xid, mode: SaveSetMode },
}

impl Request {
    /// True when the server answers this request with a reply.
    pub fn expects_reply(&self) -> bool {
        matches!(
            self,
            Self::GetProperty { .. }
                | Self::GetWindowAttributes { .. }
                | Self::GetGeometry { .. }
                | Self::QueryTree { .. }
                | Self::QueryExtension { .. }
                | Self::GetSelectionOwner { .. }
                | Self::GrabPointer { .. }
                | Self::GrabKeyboard { .. }
        )
    }
}

/// Map state reported by `GetWindowAttributes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapState {
    Unmapped,
    Unviewable,
    Viewable,
}

/// Typed reply payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `GetProperty`; `None` when the property is not set.
    Property(Option<super::PropReply>),
    Attributes { override_redirect: bool, map_state: MapState, colormap: Xid },
    Geometry { rect: Rect, border: u32 },
    Tree { children: Vec<Xid> },
    Extension { present: bool },
    SelectionOwner { owner: Xid },
    GrabStatus { success: bool },
}
