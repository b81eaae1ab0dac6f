// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

use crate::client::{ClientState, Layer};
use crate::geom::Rect;
use crate::proto::{Event, Request, Xid};
use crate::test_support::{plain_window, Fixture};

fn state_message(window: Xid, action: u32, atom: Atom) -> Event {
    Event::ClientMessage(ClientMessage {
        window,
        message_type: Atom::NetWmState,
        data: [action, atom.word(), 0, 0, 0],
    })
}

#[test]
fn fullscreen_round_trip_restores_geometry_bit_exact() {
    let mut f = Fixture::new();
    let rect = Rect::new(100, 100, 400, 300);
    let h = f.manage(Xid(0x100), plain_window(rect));
    assert_eq!(f.wm.clients.hot(h).map(|c| c.desired), Some(rect));

    f.script.deliver(state_message(Xid(0x100), NET_WM_STATE_ADD, Atom::NetWmStateFullscreen));
    f.wm.tick(f.t0);
    let hot = f.wm.clients.hot(h).copied();
    assert_eq!(hot.map(|c| c.layer), Some(Layer::Fullscreen));
    assert_eq!(hot.map(|c| c.net_state.contains(NetState::FULLSCREEN)), Some(true));
    assert_eq!(
        hot.map(|c| c.flags.contains(ClientFlags::UNDECORATED)),
        Some(true)
    );
    assert_eq!(hot.map(|c| c.desired), Some(f.wm.screen));
    assert_eq!(hot.and_then(|c| c.saved).map(|s| s.rect), Some(rect));

    f.script.deliver(state_message(Xid(0x100), NET_WM_STATE_REMOVE, Atom::NetWmStateFullscreen));
    f.wm.tick(f.t0);
    let hot = f.wm.clients.hot(h).copied();
    assert_eq!(hot.map(|c| c.desired), Some(rect));
    assert_eq!(hot.map(|c| c.layer), Some(Layer::Normal));
    assert_eq!(
        hot.map(|c| c.flags.contains(ClientFlags::UNDECORATED)),
        Some(false)
    );
    assert_eq!(hot.and_then(|c| c.saved), None);
}

#[test]
fn adding_the_same_state_twice_is_idempotent() {
    let mut f = Fixture::new();
    let h = f.manage(Xid(0x100), plain_window(Rect::new(10, 10, 200, 150)));
    f.script.deliver(state_message(Xid(0x100), NET_WM_STATE_ADD, Atom::NetWmStateFullscreen));
    f.wm.tick(f.t0);
    let once = f.wm.clients.hot(h).copied().map(|c| (c.net_state, c.desired, c.saved));
    f.script.deliver(state_message(Xid(0x100), NET_WM_STATE_ADD, Atom::NetWmStateFullscreen));
    f.wm.tick(f.t0);
    let twice = f.wm.clients.hot(h).copied().map(|c| (c.net_state, c.desired, c.saved));
    assert_eq!(once, twice);
}

#[test]
fn toggle_flips_the_state_bit() {
    let mut f = Fixture::new();
    let h = f.manage(Xid(0x100), plain_window(Rect::new(0, 0, 100, 100)));
    f.script.deliver(state_message(Xid(0x100), NET_WM_STATE_TOGGLE, Atom::NetWmStateSkipTaskbar));
    f.wm.tick(f.t0);
    assert_eq!(
        f.wm.clients.hot(h).map(|c| c.net_state.contains(NetState::SKIP_TASKBAR)),
        Some(true)
    );
    f.script.deliver(state_message(Xid(0x100), NET_WM_STATE_TOGGLE, Atom::NetWmStateSkipTaskbar));
    f.wm.tick(f.t0);
    assert_eq!(
        f.wm.clients.hot(h).map(|c| c.net_state.contains(NetState::SKIP_TASKBAR)),
        Some(false)
    );
}

#[test]
fn hidden_add_unmaps_a_visible_client() {
    let mut f = Fixture::new();
    let h = f.manage(Xid(0x100), plain_window(Rect::new(0, 0, 100, 100)));
    assert_eq!(f.wm.clients.hot(h).map(|c| c.state), Some(ClientState::Mapped));
    f.script.deliver(state_message(Xid(0x100), NET_WM_STATE_ADD, Atom::NetWmStateHidden));
    f.wm.tick(f.t0);
    assert_eq!(f.wm.clients.hot(h).map(|c| c.state), Some(ClientState::Unmapped));
    f.script.deliver(state_message(Xid(0x100), NET_WM_STATE_REMOVE, Atom::NetWmStateHidden));
    f.wm.tick(f.t0);
    assert_eq!(f.wm.clients.hot(h).map(|c| c.state), Some(ClientState::Mapped));
}

#[test]
fn above_and_below_are_mutually_exclusive() {
    let mut f = Fixture::new();
    let h = f.manage(Xid(0x100), plain_window(Rect::new(0, 0, 100, 100)));
    f.script.deliver(state_message(Xid(0x100), NET_WM_STATE_ADD, Atom::NetWmStateAbove));
    f.wm.tick(f.t0);
    assert_eq!(f.wm.clients.hot(h).map(|c| c.layer), Some(Layer::Above));
    f.script.deliver(state_message(Xid(0x100), NET_WM_STATE_ADD, Atom::NetWmStateBelow));
    f.wm.tick(f.t0);
    let hot = f.wm.clients.hot(h).copied();
    assert_eq!(hot.map(|c| c.layer), Some(Layer::Below));
    assert_eq!(hot.map(|c| c.net_state.contains(NetState::ABOVE)), Some(false));
}

#[test]
fn sticky_message_pins_to_all_desktops() {
    let mut f = Fixture::new();
    let h = f.manage(Xid(0x100), plain_window(Rect::new(0, 0, 100, 100)));
    f.script.deliver(state_message(Xid(0x100), NET_WM_STATE_ADD, Atom::NetWmStateSticky));
    f.wm.tick(f.t0);
    assert_eq!(f.wm.clients.hot(h).map(|c| c.sticky()), Some(true));
    f.script.deliver(state_message(Xid(0x100), NET_WM_STATE_REMOVE, Atom::NetWmStateSticky));
    f.wm.tick(f.t0);
    assert_eq!(f.wm.clients.hot(h).map(|c| c.desktop), Some(0));
}

#[test]
fn desktop_message_moves_and_clamps() {
    let mut f = Fixture::new();
    let h = f.manage(Xid(0x100), plain_window(Rect::new(0, 0, 100, 100)));
    f.script.deliver(Event::ClientMessage(ClientMessage {
        window: Xid(0x100),
        message_type: Atom::NetWmDesktop,
        data: [99, 0, 0, 0, 0],
    }));
    f.wm.tick(f.t0);
    // Clamped to the last desktop (4 configured).
    assert_eq!(f.wm.clients.hot(h).map(|c| c.desktop), Some(3));

    f.script.deliver(Event::ClientMessage(ClientMessage {
        window: Xid(0x100),
        message_type: Atom::NetWmDesktop,
        data: [STICKY_DESKTOP, 0, 0, 0, 0],
    }));
    f.wm.tick(f.t0);
    assert_eq!(f.wm.clients.hot(h).map(|c| c.sticky()), Some(true));
}

#[test]
fn close_message_sends_exactly_one_delete() {
    let mut f = Fixture::new();
    let win = crate::test_support::with_protocols(
        plain_window(Rect::new(0, 0, 100, 100)),
        &[Atom::WmDeleteWindow],
    );
    let _h = f.manage(Xid(0x100), win);
    f.clear_requests();
    f.script.deliver(Event::ClientMessage(ClientMessage {
        window: Xid(0x100),
        message_type: Atom::NetCloseWindow,
        data: [0; 5],
    }));
    f.wm.tick(f.t0);
    let reqs = f.requests();
    let deletes = reqs
        .iter()
        .filter(|r| matches!(
            r,
            Request::SendClientMessage { message_type: Atom::WmProtocols, data, .. }
                if data[0] == Atom::WmDeleteWindow.word()
        ))
        .count();
    assert_eq!(deletes, 1);
    assert!(!reqs.iter().any(|r| matches!(r, Request::KillClient { .. })));
}

#[test]
fn wm_change_state_iconifies() {
    let mut f = Fixture::new();
    let h = f.manage(Xid(0x100), plain_window(Rect::new(0, 0, 100, 100)));
    f.script.deliver(Event::ClientMessage(ClientMessage {
        window: Xid(0x100),
        message_type: Atom::WmChangeState,
        data: [WM_STATE_ICONIC, 0, 0, 0, 0],
    }));
    f.wm.tick(f.t0);
    assert_eq!(f.wm.clients.hot(h).map(|c| c.state), Some(ClientState::Unmapped));
    assert_eq!(
        f.wm.clients.hot(h).map(|c| c.net_state.contains(NetState::HIDDEN)),
        Some(true)
    );
}

#[test]
fn current_desktop_message_switches() {
    let mut f = Fixture::new();
    f.script.deliver(Event::ClientMessage(ClientMessage {
        window: crate::proto::fake::ROOT,
        message_type: Atom::NetCurrentDesktop,
        data: [2, 0, 0, 0, 0],
    }));
    f.wm.tick(f.t0);
    assert_eq!(f.wm.root.current_desktop, 2);
}

#[test]
fn app_activation_is_demands_attention_not_focus_steal() {
    let mut f = Fixture::new();
    let a = f.manage(Xid(0x100), plain_window(Rect::new(0, 0, 100, 100)));
    let b = f.manage(Xid(0x200), plain_window(Rect::new(0, 0, 100, 100)));
    f.wm.set_focus(a);

    // Source 1 = application; the window has already had its first map.
    f.script.deliver(Event::ClientMessage(ClientMessage {
        window: Xid(0x200),
        message_type: Atom::NetActiveWindow,
        data: [1, 0, 0, 0, 0],
    }));
    f.wm.tick(f.t0);
    assert_eq!(f.wm.focused, a);
    assert_eq!(
        f.wm.clients.hot(b).map(|c| c.net_state.contains(NetState::DEMANDS_ATTENTION)),
        Some(true)
    );
}

#[test]
fn pager_activation_focuses() {
    let mut f = Fixture::new();
    let a = f.manage(Xid(0x100), plain_window(Rect::new(0, 0, 100, 100)));
    let b = f.manage(Xid(0x200), plain_window(Rect::new(0, 0, 100, 100)));
    f.wm.set_focus(a);
    f.script.deliver(Event::ClientMessage(ClientMessage {
        window: Xid(0x200),
        message_type: Atom::NetActiveWindow,
        data: [SOURCE_PAGER, 0, 0, 0, 0],
    }));
    f.wm.tick(f.t0);
    assert_eq!(f.wm.focused, b);
}

#[test]
fn unknown_state_action_is_ignored() {
    let mut f = Fixture::new();
    let h = f.manage(Xid(0x100), plain_window(Rect::new(0, 0, 100, 100)));
    f.script.deliver(state_message(Xid(0x100), 9, Atom::NetWmStateSkipPager));
    f.wm.tick(f.t0);
    assert_eq!(
        f.wm.clients.hot(h).map(|c| c.net_state.contains(NetState::SKIP_PAGER)),
        Some(false)
    );
    let _ = h;
}
