// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire model for the display transport: resource ids, atoms, property
//! payloads, events, and requests.
//!
//! The engine talks to the display server exclusively through the
//! [`Transport`] trait; the concrete protocol library is an out-of-tree
//! adapter. Atoms are carried symbolically; a wire backend maps them to
//! interned server atoms at connect time.

pub mod event;
pub mod fake;
pub mod request;
pub mod transport;

pub use event::*;
pub use request::*;
pub use transport::{PollReply, Seq, Transport};

use bytes::Bytes;
use std::fmt;

/// A server-side resource id (window, colormap).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Xid(pub u32);

impl Xid {
    pub const NONE: Xid = Xid(0);

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Xid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// `WM_STATE` values.
pub const WM_STATE_WITHDRAWN: u32 = 0;
pub const WM_STATE_NORMAL: u32 = 1;
pub const WM_STATE_ICONIC: u32 = 3;

/// `_NET_WM_DESKTOP` sentinel for a client visible on all desktops.
pub const STICKY_DESKTOP: u32 = 0xFFFF_FFFF;

/// `CurrentTime` stand-in for client messages without a timestamp.
pub const CURRENT_TIME: u32 = 0;

// Keysyms for the built-in bindings.
pub const KEY_TAB: u32 = 0xff09;
pub const KEY_RETURN: u32 = 0xff0d;
pub const KEY_ESCAPE: u32 = 0xff1b;

/// The atoms the engine reads or writes.
///
/// `Other` carries atoms outside the known set so property-notify coalescing
/// keys stay exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Atom {
    // ICCCM
    WmName,
    WmClass,
    WmNormalHints,
    WmHints,
    WmProtocols,
    WmDeleteWindow,
    WmTakeFocus,
    WmState,
    WmChangeState,
    WmTransientFor,
    WmColormapWindows,
    WmSelection,
    Manager,
    // property types
    Utf8String,
    String_,
    Cardinal,
    AtomType,
    Window,
    // EWMH root
    NetSupported,
    NetSupportingWmCheck,
    NetClientList,
    NetClientListStacking,
    NetNumberOfDesktops,
    NetCurrentDesktop,
    NetDesktopNames,
    NetWorkarea,
    NetActiveWindow,
    NetShowingDesktop,
    NetCloseWindow,
    // EWMH per-client
    NetWmName,
    NetWmDesktop,
    NetWmStrutPartial,
    NetWmIcon,
    NetFrameExtents,
    NetWmAllowedActions,
    NetWmState,
    NetWmStateFullscreen,
    NetWmStateAbove,
    NetWmStateBelow,
    NetWmStateSticky,
    NetWmStateHidden,
    NetWmStateDemandsAttention,
    NetWmStateSkipTaskbar,
    NetWmStateSkipPager,
    NetWmWindowType,
    NetWmWindowTypeDesktop,
    NetWmWindowTypeDock,
    NetWmWindowTypeToolbar,
    NetWmWindowTypeMenu,
    NetWmWindowTypeUtility,
    NetWmWindowTypeSplash,
    NetWmWindowTypeDialog,
    NetWmWindowTypeDropdownMenu,
    NetWmWindowTypePopupMenu,
    NetWmWindowTypeTooltip,
    NetWmWindowTypeNotification,
    NetWmWindowTypeCombo,
    NetWmWindowTypeDnd,
    NetWmWindowTypeNormal,
    NetWmActionMove,
    NetWmActionResize,
    NetWmActionMinimize,
    NetWmActionMaximizeHorz,
    NetWmActionMaximizeVert,
    NetWmActionFullscreen,
    NetWmActionClose,
    GtkFrameExtents,
    Other(u32),
}

impl Atom {
    pub fn name(&self) -> &'static str {
        match self {
            Self::WmName => "WM_NAME",
            Self::WmClass => "WM_CLASS",
            Self::WmNormalHints => "WM_NORMAL_HINTS",
            Self::WmHints => "WM_HINTS",
            Self::WmProtocols => "WM_PROTOCOLS",
            Self::WmDeleteWindow => "WM_DELETE_WINDOW",
            Self::WmTakeFocus => "WM_TAKE_FOCUS",
            Self::WmState => "WM_STATE",
            Self::WmChangeState => "WM_CHANGE_STATE",
            Self::WmTransientFor => "WM_TRANSIENT_FOR",
            Self::WmColormapWindows => "WM_COLORMAP_WINDOWS",
            Self::WmSelection => "WM_S0",
            Self::Manager => "MANAGER",
            Self::Utf8String => "UTF8_STRING",
            Self::String_ => "STRING",
            Self::Cardinal => "CARDINAL",
            Self::AtomType => "ATOM",
            Self::Window => "WINDOW",
            Self::NetSupported => "_NET_SUPPORTED",
            Self::NetSupportingWmCheck => "_NET_SUPPORTING_WM_CHECK",
            Self::NetClientList => "_NET_CLIENT_LIST",
            Self::NetClientListStacking => "_NET_CLIENT_LIST_STACKING",
            Self::NetNumberOfDesktops => "_NET_NUMBER_OF_DESKTOPS",
            Self::NetCurrentDesktop => "_NET_CURRENT_DESKTOP",
            Self::NetDesktopNames => "_NET_DESKTOP_NAMES",
            Self::NetWorkarea => "_NET_WORKAREA",
            Self::NetActiveWindow => "_NET_ACTIVE_WINDOW",
            Self::NetShowingDesktop => "_NET_SHOWING_DESKTOP",
            Self::NetCloseWindow => "_NET_CLOSE_WINDOW",
            Self::NetWmName => "_NET_WM_NAME",
            Self::NetWmDesktop => "_NET_WM_DESKTOP",
            Self::NetWmStrutPartial => "_NET_WM_STRUT_PARTIAL",
            Self::NetWmIcon => "_NET_WM_ICON",
            Self::NetFrameExtents => "_NET_FRAME_EXTENTS",
            Self::NetWmAllowedActions => "_NET_WM_ALLOWED_ACTIONS",
            Self::NetWmState => "_NET_WM_STATE",
            Self::NetWmStateFullscreen => "_NET_WM_STATE_FULLSCREEN",
            Self::NetWmStateAbove => "_NET_WM_STATE_ABOVE",
            Self::NetWmStateBelow => "_NET_WM_STATE_BELOW",
            Self::NetWmStateSticky => "_NET_WM_STATE_STICKY",
            Self::NetWmStateHidden => "_NET_WM_STATE_HIDDEN",
            Self::NetWmStateDemandsAttention => "_NET_WM_STATE_DEMANDS_ATTENTION",
            Self::NetWmStateSkipTaskbar => "_NET_WM_STATE_SKIP_TASKBAR",
            Self::NetWmStateSkipPager => "_NET_WM_STATE_SKIP_PAGER",
            Self::NetWmWindowType => "_NET_WM_WINDOW_TYPE",
            Self::NetWmWindowTypeDesktop => "_NET_WM_WINDOW_TYPE_DESKTOP",
            Self::NetWmWindowTypeDock => "_NET_WM_WINDOW_TYPE_DOCK",
            Self::NetWmWindowTypeToolbar => "_NET_WM_WINDOW_TYPE_TOOLBAR",
            Self::NetWmWindowTypeMenu => "_NET_WM_WINDOW_TYPE_MENU",
            Self::NetWmWindowTypeUtility => "_NET_WM_WINDOW_TYPE_UTILITY",
            Self::NetWmWindowTypeSplash => "_NET_WM_WINDOW_TYPE_SPLASH",
            Self::NetWmWindowTypeDialog => "_NET_WM_WINDOW_TYPE_DIALOG",
            Self::NetWmWindowTypeDropdownMenu => "_NET_WM_WINDOW_TYPE_DROPDOWN_MENU",
            Self::NetWmWindowTypePopupMenu => "_NET_WM_WINDOW_TYPE_POPUP_MENU",
            Self::NetWmWindowTypeTooltip => "_NET_WM_WINDOW_TYPE_TOOLTIP",
            Self::NetWmWindowTypeNotification => "_NET_WM_WINDOW_TYPE_NOTIFICATION",
            Self::NetWmWindowTypeCombo => "_NET_WM_WINDOW_TYPE_COMBO",
            Self::NetWmWindowTypeDnd => "_NET_WM_WINDOW_TYPE_DND",
            Self::NetWmWindowTypeNormal => "_NET_WM_WINDOW_TYPE_NORMAL",
            Self::NetWmActionMove => "_NET_WM_ACTION_MOVE",
            Self::NetWmActionResize => "_NET_WM_ACTION_RESIZE",
            Self::NetWmActionMinimize => "_NET_WM_ACTION_MINIMIZE",
            Self::NetWmActionMaximizeHorz => "_NET_WM_ACTION_MAXIMIZE_HORZ",
            Self::NetWmActionMaximizeVert => "_NET_WM_ACTION_MAXIMIZE_VERT",
            Self::NetWmActionFullscreen => "_NET_WM_ACTION_FULLSCREEN",
            Self::NetWmActionClose => "_NET_WM_ACTION_CLOSE",
            Self::GtkFrameExtents => "_GTK_FRAME_EXTENTS",
            Self::Other(_) => "(other)",
        }
    }

    /// Every atom the engine knows, in a fixed order that doubles as the
    /// symbolic wire numbering (`word`/`from_word`). A real backend swaps
    /// this for server-interned values at connect time.
    pub const KNOWN: [Atom; 67] = [
        Atom::WmName,
        Atom::WmClass,
        Atom::WmNormalHints,
        Atom::WmHints,
        Atom::WmProtocols,
        Atom::WmDeleteWindow,
        Atom::WmTakeFocus,
        Atom::WmState,
        Atom::WmChangeState,
        Atom::WmTransientFor,
        Atom::WmColormapWindows,
        Atom::WmSelection,
        Atom::Manager,
        Atom::Utf8String,
        Atom::String_,
        Atom::Cardinal,
        Atom::AtomType,
        Atom::Window,
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
        Atom::NetWmIcon,
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
        Atom::NetWmWindowTypeDesktop,
        Atom::NetWmWindowTypeDock,
        Atom::NetWmWindowTypeToolbar,
        Atom::NetWmWindowTypeMenu,
        Atom::NetWmWindowTypeUtility,
        Atom::NetWmWindowTypeSplash,
        Atom::NetWmWindowTypeDialog,
        Atom::NetWmWindowTypeDropdownMenu,
        Atom::NetWmWindowTypePopupMenu,
        Atom::NetWmWindowTypeTooltip,
        Atom::NetWmWindowTypeNotification,
        Atom::NetWmWindowTypeCombo,
        Atom::NetWmWindowTypeDnd,
        Atom::NetWmWindowTypeNormal,
        Atom::NetWmActionMove,
        Atom::NetWmActionResize,
        Atom::NetWmActionMinimize,
        Atom::NetWmActionMaximizeHorz,
        Atom::NetWmActionMaximizeVert,
        Atom::NetWmActionFullscreen,
        Atom::NetWmActionClose,
        Atom::GtkFrameExtents,
    ];

    /// Symbolic wire value for this atom.
    pub fn word(self) -> u32 {
        match self {
            Self::Other(v) => v,
            _ => Self::KNOWN
                .iter()
                .position(|a| *a == self)
                .map(|i| 0x100 + i as u32)
                .unwrap_or(0),
        }
    }

    pub fn from_word(word: u32) -> Atom {
        let index = word.wrapping_sub(0x100) as usize;
        Self::KNOWN.get(index).copied().unwrap_or(Atom::Other(word))
    }

    /// The initial adoption query set, in issue order.
    pub const ADOPTION_PROPERTIES: [Atom; 14] = [
        Atom::WmName,
        Atom::NetWmName,
        Atom::WmClass,
        Atom::WmNormalHints,
        Atom::WmHints,
        Atom::WmProtocols,
        Atom::WmTransientFor,
        Atom::NetWmWindowType,
        Atom::NetWmState,
        Atom::NetWmDesktop,
        Atom::NetWmStrutPartial,
        Atom::NetWmIcon,
        Atom::WmColormapWindows,
        Atom::GtkFrameExtents,
    ];
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(v) => write!(f, "atom#{v}"),
            _ => f.write_str(self.name()),
        }
    }
}

/// Raw property payload as returned by `GetProperty`.
///
/// `type_` of `Xid::NONE`-like absence is modelled by `None` at the reply
/// level; an existing reply always carries type, format, and bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropReply {
    pub type_: Atom,
    pub format: u8,
    pub data: Bytes,
}

impl PropReply {
    pub fn cardinals(type_: Atom, values: &[u32]) -> Self {
        let mut data = Vec::with_capacity(values.len() * 4);
        for v in values {
            data.extend_from_slice(&v.to_ne_bytes());
        }
        Self { type_, format: 32, data: Bytes::from(data) }
    }

    pub fn utf8(text: &str) -> Self {
        Self { type_: Atom::Utf8String, format: 8, data: Bytes::copy_from_slice(text.as_bytes()) }
    }

    pub fn latin1(bytes: &[u8]) -> Self {
        Self { type_: Atom::String_, format: 8, data: Bytes::copy_from_slice(bytes) }
    }

    pub fn atoms(atoms: &[Atom]) -> Self {
        let words: Vec<u32> = atoms.iter().map(|a| a.word()).collect();
        Self::cardinals(Atom::AtomType, &words)
    }

    pub fn windows(windows: &[Xid]) -> Self {
        let words: Vec<u32> = windows.iter().map(|x| x.0).collect();
        Self::cardinals(Atom::Window, &words)
    }

    /// Decode a format-32 payload, rejecting replies whose byte length is not
    /// a multiple of the unit size.
    pub fn as_u32s(&self) -> Option<Vec<u32>> {
        if self.format != 32 || self.data.len() % 4 != 0 {
            return None;
        }
        Some(
            self.data
                .chunks_exact(4)
                .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        )
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        (self.format == 8).then_some(&self.data[..])
    }

    pub fn as_atoms(&self) -> Option<Vec<Atom>> {
        Some(self.as_u32s()?.into_iter().map(Atom::from_word).collect())
    }

    pub fn as_windows(&self) -> Option<Vec<Xid>> {
        Some(self.as_u32s()?.into_iter().map(Xid).collect())
    }
}

/// Property data as submitted by `ChangeProperty`.
///
/// Kept structured on the write side so the scripted transport and tests can
/// inspect published values without a byte-level decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropValue {
    Cardinals(Vec<u32>),
    Atoms(Vec<Atom>),
    Windows(Vec<Xid>),
    Utf8(String),
    Latin1(Vec<u8>),
}
