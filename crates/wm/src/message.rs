// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client messages accepted from pagers, taskbars, and applications.

use tracing::{debug, trace};

use crate::client::{ClientFlags, ClientState, Dirty, Layer, NetState, SavedGeometry};
use crate::proto::{Atom, ClientMessage, STICKY_DESKTOP, WM_STATE_ICONIC};
use crate::slotmap::Handle;
use crate::wm::Wm;

const NET_WM_STATE_REMOVE: u32 = 0;
const NET_WM_STATE_ADD: u32 = 1;
const NET_WM_STATE_TOGGLE: u32 = 2;

/// `_NET_ACTIVE_WINDOW` source indication.
const SOURCE_PAGER: u32 = 2;

impl Wm {
    pub fn handle_client_message(&mut self, msg: ClientMessage) {
        match msg.message_type {
            Atom::NetCurrentDesktop => self.switch_desktop(msg.data[0]),
            Atom::NetShowingDesktop => self.show_desktop(msg.data[0] != 0),
            Atom::NetActiveWindow => self.on_activate_request(msg),
            Atom::NetWmState => self.on_state_message(msg),
            Atom::NetWmDesktop => {
                if let Some(h) = self.clients.by_window(msg.window) {
                    self.set_client_desktop(h, msg.data[0]);
                }
            }
            Atom::NetCloseWindow => {
                if let Some(h) = self.clients.by_window(msg.window) {
                    self.close_client(h);
                }
            }
            Atom::WmChangeState => {
                if msg.data[0] == WM_STATE_ICONIC {
                    if let Some(h) = self.clients.by_window(msg.window) {
                        self.iconify(h);
                    }
                }
            }
            other => trace!(atom = %other, "unhandled client message"),
        }
    }

    /// Focus-stealing policy: pager requests are honoured; application
    /// requests only before the window's first map has been focused once.
    fn on_activate_request(&mut self, msg: ClientMessage) {
        let Some(h) = self.clients.by_window(msg.window) else { return };
        let source = msg.data[0];
        debug!(window = %msg.window, source, "_NET_ACTIVE_WINDOW");
        if source != SOURCE_PAGER {
            let first_mapped = self
                .clients
                .hot(h)
                .map(|c| c.flags.contains(ClientFlags::FIRST_MAP_DONE))
                .unwrap_or(true);
            if first_mapped {
                // Applications do not get to steal focus; surface the
                // request as demands-attention instead.
                if let Some(hot) = self.clients.hot_mut(h) {
                    hot.net_state |= NetState::DEMANDS_ATTENTION;
                    hot.dirty |= Dirty::STATE;
                }
                return;
            }
        }
        self.deiconify(h);
        if self.focusable(h) {
            self.set_focus(h);
        } else {
            self.pending_focus = Some(h);
        }
    }

    /// `_NET_WM_STATE`: `{action, atom1, atom2}`.
    fn on_state_message(&mut self, msg: ClientMessage) {
        let Some(h) = self.clients.by_window(msg.window) else { return };
        let action = msg.data[0];
        for atom in [Atom::from_word(msg.data[1]), Atom::from_word(msg.data[2])] {
            let Some(bit) = state_bit(atom) else { continue };
            let current = self
                .clients
                .hot(h)
                .map(|c| c.net_state.contains(bit))
                .unwrap_or(false);
            let target = match action {
                NET_WM_STATE_ADD => true,
                NET_WM_STATE_REMOVE => false,
                NET_WM_STATE_TOGGLE => !current,
                _ => {
                    debug!(action, "bad _NET_WM_STATE action");
                    return;
                }
            };
            if target != current {
                self.set_state_bit(h, bit, target);
            }
        }
    }

    /// Apply one `_NET_WM_STATE` bit change and reconcile layer, geometry,
    /// and visibility. Applying the same change twice is a no-op.
    pub fn set_state_bit(&mut self, h: Handle, bit: NetState, on: bool) {
        if bit == NetState::FULLSCREEN {
            self.set_fullscreen(h, on);
        } else if bit == NetState::HIDDEN {
            if on {
                self.iconify(h);
            } else {
                self.deiconify(h);
            }
        } else if bit == NetState::STICKY {
            let desktop = if on { STICKY_DESKTOP } else { self.root.current_desktop };
            self.set_client_desktop(h, desktop);
        } else if bit == NetState::ABOVE || bit == NetState::BELOW {
            let Some(hot) = self.clients.hot_mut(h) else { return };
            hot.net_state.set(bit, on);
            if on {
                // Above and below are mutually exclusive bands.
                hot.net_state -= if bit == NetState::ABOVE {
                    NetState::BELOW
                } else {
                    NetState::ABOVE
                };
            }
            hot.dirty |= Dirty::STATE;
            let layer = Layer::for_client(hot.wtype, hot.net_state);
            let mut stack = std::mem::take(&mut self.stack);
            stack.move_to_layer(&mut self.clients, h, layer);
            self.stack = stack;
        } else {
            let Some(hot) = self.clients.hot_mut(h) else { return };
            hot.net_state.set(bit, on);
            hot.dirty |= Dirty::STATE;
        }
    }

    /// Fullscreen promotion saves layer, geometry, and decoration; removal
    /// restores them bit-exact.
    fn set_fullscreen(&mut self, h: Handle, on: bool) {
        let Some(hot) = self.clients.hot(h).copied() else { return };
        if on == hot.net_state.contains(NetState::FULLSCREEN) {
            return;
        }
        if on {
            let saved = SavedGeometry {
                rect: hot.desired,
                layer: hot.layer,
                undecorated: hot.flags.contains(ClientFlags::UNDECORATED),
            };
            let screen = self.screen;
            if let Some(hot) = self.clients.hot_mut(h) {
                hot.saved = Some(saved);
                hot.net_state |= NetState::FULLSCREEN;
                hot.flags |= ClientFlags::UNDECORATED;
                hot.desired = screen;
                hot.dirty |= Dirty::GEOM | Dirty::STATE | Dirty::FRAME_STYLE;
            }
            let mut stack = std::mem::take(&mut self.stack);
            stack.move_to_layer(&mut self.clients, h, Layer::Fullscreen);
            self.stack = stack;
        } else {
            let saved = hot.saved.unwrap_or(SavedGeometry {
                rect: hot.desired,
                layer: Layer::Normal,
                undecorated: false,
            });
            if let Some(hot) = self.clients.hot_mut(h) {
                hot.saved = None;
                hot.net_state -= NetState::FULLSCREEN;
                hot.flags.set(ClientFlags::UNDECORATED, saved.undecorated);
                hot.desired = saved.rect;
                hot.dirty |= Dirty::GEOM | Dirty::STATE | Dirty::FRAME_STYLE;
            }
            let mut stack = std::mem::take(&mut self.stack);
            stack.move_to_layer(&mut self.clients, h, saved.layer);
            self.stack = stack;
        }
    }

    /// Colormap handling fires on both notify and focus change; a colormap
    /// notify for the focused client reinstalls immediately.
    pub fn handle_colormap_notify(&mut self, window: crate::proto::Xid) {
        let Some((h, _)) = self.clients.find(window) else { return };
        if h != self.focused {
            return;
        }
        let Some(hot) = self.clients.hot(h) else { return };
        if hot.state != ClientState::Mapped {
            return;
        }
        let colormap = self.clients.cold(h).map(|c| c.colormap).unwrap_or_default();
        if !colormap.is_none() {
            self.submit(crate::proto::Request::InstallColormap { colormap });
        }
    }
}

fn state_bit(atom: Atom) -> Option<NetState> {
    Some(match atom {
        Atom::NetWmStateFullscreen => NetState::FULLSCREEN,
        Atom::NetWmStateAbove => NetState::ABOVE,
        Atom::NetWmStateBelow => NetState::BELOW,
        Atom::NetWmStateSticky => NetState::STICKY,
        Atom::NetWmStateHidden => NetState::HIDDEN,
        Atom::NetWmStateDemandsAttention => NetState::DEMANDS_ATTENTION,
        Atom::NetWmStateSkipTaskbar => NetState::SKIP_TASKBAR,
        Atom::NetWmStateSkipPager => NetState::SKIP_PAGER,
        _ => return None,
    })
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
