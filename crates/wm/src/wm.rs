// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine aggregate: one owned value holding every component, passed by
//! reference everywhere. No locks; the core is single-threaded cooperative.

use bitflags::bitflags;

use crate::chrome::FrameChrome;
use crate::client::{ClientSet, Dirty};
use crate::config::{Config, WindowRule};
use crate::cookie::CookieJar;
use crate::focus::FocusHistory;
use crate::geom::Rect;
use crate::interact::Mode;
use crate::proto::{Request, Seq, Transport, Xid};
use crate::slotmap::Handle;
use crate::stack::StackSet;
use crate::tick::Buckets;

bitflags! {
    /// Deferred root-window property writes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RootDirty: u16 {
        const SUPPORTED = 1 << 0;
        const CLIENT_LIST = 1 << 1;
        const CLIENT_LIST_STACKING = 1 << 2;
        const ACTIVE_WINDOW = 1 << 3;
        const CURRENT_DESKTOP = 1 << 4;
        const DESKTOP_COUNT = 1 << 5;
        const DESKTOP_NAMES = 1 << 6;
        const WORKAREA = 1 << 7;
        const SHOWING_DESKTOP = 1 << 8;
    }
}

impl Default for RootDirty {
    fn default() -> Self {
        Self::empty()
    }
}

/// Root-scope state.
#[derive(Debug)]
pub struct RootState {
    pub window: Xid,
    /// `_NET_SUPPORTING_WM_CHECK` child, stable for the process lifetime.
    pub check: Xid,
    pub current_desktop: u32,
    pub desktops: u32,
    pub names: Vec<String>,
    pub showing_desktop: bool,
    pub dirty: RootDirty,
}

/// Extension capabilities probed at startup.
#[derive(Debug, Clone, Copy, Default)]
pub struct Caps {
    pub randr: bool,
    pub damage: bool,
}

pub struct Wm {
    pub config: Config,
    pub rules: Vec<WindowRule>,
    pub transport: Box<dyn Transport>,
    pub chrome: Box<dyn FrameChrome>,
    pub clients: ClientSet,
    pub jar: CookieJar,
    pub stack: StackSet,
    pub focus: FocusHistory,
    pub focused: Handle,
    /// Focus to apply after this tick's map transitions; `Some(INVALID)`
    /// reverts to the root.
    pub pending_focus: Option<Handle>,
    pub root: RootState,
    pub buckets: Buckets,
    pub mode: Mode,
    pub screen: Rect,
    pub caps: Caps,
    pub pending_flush: bool,
    pub shutdown: bool,
    pub reload_rules: bool,
    pub restart: bool,
}

impl Wm {
    pub fn new(config: Config, transport: Box<dyn Transport>, chrome: Box<dyn FrameChrome>) -> Self {
        let root_window = transport.root();
        let screen = transport.screen_size();
        let names = config.desktop_name_list();
        let desktops = config.desktops;
        let clients = ClientSet::new(config.client_capacity);
        Self {
            rules: Vec::new(),
            transport,
            chrome,
            clients,
            jar: CookieJar::new(),
            stack: StackSet::new(),
            focus: FocusHistory::new(),
            focused: Handle::INVALID,
            pending_focus: None,
            root: RootState {
                window: root_window,
                check: Xid::NONE,
                current_desktop: 0,
                desktops,
                names,
                showing_desktop: false,
                dirty: RootDirty::all(),
            },
            buckets: Buckets::new(),
            mode: Mode::None,
            screen,
            caps: Caps::default(),
            pending_flush: false,
            shutdown: false,
            reload_rules: false,
            restart: false,
            config,
        }
    }

    pub fn submit(&mut self, req: Request) -> Seq {
        self.transport.submit(req)
    }

    pub fn mark_dirty(&mut self, h: Handle, bits: Dirty) {
        if let Some(hot) = self.clients.hot_mut(h) {
            hot.dirty |= bits;
        }
    }

    pub fn mark_root_dirty(&mut self, bits: RootDirty) {
        self.root.dirty |= bits;
    }

    /// Both client lists changed (manage/unmanage).
    pub fn client_lists_dirty(&mut self) {
        self.mark_root_dirty(RootDirty::CLIENT_LIST | RootDirty::CLIENT_LIST_STACKING);
    }
}
