// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios: a scripted display, the whole engine, and the
//! property/request stream a panel or client would observe.

use std::time::Duration;

use casement::client::ClientState;
use casement::config::Config;
use casement::geom::Rect;
use casement::proto::fake::ROOT;
use casement::proto::{Atom, ClientMessage, Event, PropReply, PropValue, Request, Xid};
use casement::slotmap::Handle;
use casement::test_support::{
    plain_window, with_class, with_desktop, with_protocols, with_transient_for, Fixture,
};

const WIN: Xid = Xid(0x100);

/// Scenario: a normal client maps and shows up everywhere a panel looks.
#[test]
fn map_and_list() {
    let mut config = Config::default();
    config.border_width = 1;
    config.title_height = 18;
    config.handle_height = 4;
    let mut f = Fixture::with_config(config);

    let win = with_class(plain_window(Rect::new(80, 80, 400, 300)), "listtest", "ListTest");
    let h = f.manage(WIN, win);
    assert!(h.is_valid());

    // Reparented into a frame.
    let frame = f.wm.clients.hot(h).map(|c| c.frame).unwrap_or_default();
    assert!(!frame.is_none());
    assert_eq!(f.script.window(WIN).map(|w| w.parent), Some(frame));

    // Listed in both client lists.
    assert_eq!(
        f.script.published(ROOT, Atom::NetClientList),
        Some(PropValue::Windows(vec![WIN]))
    );
    assert_eq!(
        f.script.published(ROOT, Atom::NetClientListStacking),
        Some(PropValue::Windows(vec![WIN]))
    );

    // WM_STATE is Normal, frame extents match the theme.
    assert_eq!(
        f.script.published(WIN, Atom::WmState),
        Some(PropValue::Cardinals(vec![1, 0]))
    );
    assert_eq!(
        f.script.published(WIN, Atom::NetFrameExtents),
        Some(PropValue::Cardinals(vec![1, 1, 19, 4]))
    );

    // And the class strings survived ingestion.
    assert_eq!(
        f.wm.clients.cold(h).map(|c| (c.instance.clone(), c.class.clone())),
        Some(("listtest".into(), "ListTest".into()))
    );
}

/// Scenario: desktop switch maps and unmaps exactly the right clients.
#[test]
fn workspace_switch_visibility() {
    let mut f = Fixture::new();
    let d0 = f.manage(Xid(0x1), plain_window(Rect::new(0, 0, 100, 100)));
    let d1 = f.manage(Xid(0x2), with_desktop(plain_window(Rect::new(0, 0, 100, 100)), 1));
    let d0b = f.manage(Xid(0x3), plain_window(Rect::new(0, 0, 100, 100)));
    let sticky = f.manage(
        Xid(0x4),
        with_desktop(plain_window(Rect::new(0, 0, 100, 100)), 0xFFFF_FFFF),
    );

    f.script.deliver(Event::ClientMessage(ClientMessage {
        window: ROOT,
        message_type: Atom::NetCurrentDesktop,
        data: [1, 0, 0, 0, 0],
    }));
    f.wm.tick(f.t0);

    let state = |f: &Fixture, h: Handle| f.wm.clients.hot(h).map(|c| c.state);
    assert_eq!(state(&f, d0), Some(ClientState::Unmapped));
    assert_eq!(state(&f, d0b), Some(ClientState::Unmapped));
    assert_eq!(state(&f, d1), Some(ClientState::Mapped));
    assert_eq!(state(&f, sticky), Some(ClientState::Mapped));
    assert_eq!(
        f.script.published(ROOT, Atom::NetCurrentDesktop),
        Some(PropValue::Cardinals(vec![1]))
    );
}

/// Scenario: fullscreen add/remove restores geometry bit-exact.
#[test]
fn fullscreen_round_trip() {
    let mut f = Fixture::new();
    let rect = Rect::new(100, 100, 400, 300);
    let h = f.manage(WIN, plain_window(rect));

    f.script.deliver(Event::ClientMessage(ClientMessage {
        window: WIN,
        message_type: Atom::NetWmState,
        data: [1, Atom::NetWmStateFullscreen.word(), 0, 0, 0],
    }));
    f.wm.tick(f.t0);

    let hot = f.wm.clients.hot(h).copied();
    assert_eq!(hot.map(|c| c.layer), Some(casement::client::Layer::Fullscreen));
    assert_eq!(
        hot.map(|c| c.flags.contains(casement::client::ClientFlags::UNDECORATED)),
        Some(true)
    );
    assert_eq!(hot.map(|c| c.current), Some(f.wm.screen));
    // The scripted display saw the frame fill the screen.
    let frame = hot.map(|c| c.frame).unwrap_or_default();
    assert_eq!(f.script.window(frame).map(|w| w.rect), Some(f.wm.screen));

    f.script.deliver(Event::ClientMessage(ClientMessage {
        window: WIN,
        message_type: Atom::NetWmState,
        data: [0, Atom::NetWmStateFullscreen.word(), 0, 0, 0],
    }));
    f.wm.tick(f.t0);

    let hot = f.wm.clients.hot(h).copied();
    assert_eq!(hot.map(|c| c.current), Some(rect));
    assert_eq!(hot.map(|c| c.layer), Some(casement::client::Layer::Normal));
    assert_eq!(
        hot.map(|c| c.flags.contains(casement::client::ClientFlags::UNDECORATED)),
        Some(false)
    );
}

/// Scenario: a cookie whose reply never arrives times out once; the late
/// reply afterwards is dead.
#[test]
fn cookie_timeout_then_late_reply() {
    let mut f = Fixture::new();
    let h = f.manage(WIN, plain_window(Rect::new(0, 0, 200, 100)));

    // A property query whose reply the server never sends.
    f.clear_requests();
    f.script.swallow_replies(true);
    f.wm.requery_property(h, Atom::NetWmName, f.t0);
    let pending: Vec<u64> = f
        .script
        .take_requests()
        .into_iter()
        .filter(|(_, r)| r.expects_reply())
        .map(|(seq, _)| seq)
        .collect();
    assert_eq!(pending.len(), 1);
    assert_eq!(f.wm.jar.len(), 1);

    // Under the 5s deadline: still waiting.
    f.wm.tick(f.t0 + Duration::from_secs(4));
    assert_eq!(f.wm.jar.len(), 1);

    // Past the deadline: the cookie is retired.
    f.wm.tick(f.t0 + Duration::from_secs(6));
    assert_eq!(f.wm.jar.len(), 0);

    // A reply at t+7s is ignored; the title stays untouched.
    f.script.inject_reply(pending[0], casement::proto::Reply::Property(Some(PropReply::utf8("late"))));
    f.wm.tick(f.t0 + Duration::from_secs(7));
    assert_eq!(f.wm.clients.cold(h).map(|c| c.title.clone()), Some(String::new()));
}

/// Scenario: mutual WM_TRANSIENT_FOR degrades to INVALID instead of looping.
#[test]
fn transient_cycle_rejection() {
    let mut f = Fixture::new();
    let a = f.manage(Xid(0x1), plain_window(Rect::new(0, 0, 100, 100)));
    let b = f.manage(
        Xid(0x2),
        with_transient_for(plain_window(Rect::new(10, 10, 100, 100)), Xid(0x1)),
    );
    assert_eq!(f.wm.clients.hot(b).map(|c| c.transient_for), Some(a));

    // A now claims B as its parent: cycle, rejected.
    f.script.set_window_property(
        Xid(0x1),
        Atom::WmTransientFor,
        PropReply::cardinals(Atom::Window, &[0x2]),
    );
    f.script.deliver(Event::PropertyNotify {
        window: Xid(0x1),
        atom: Atom::WmTransientFor,
        deleted: false,
    });
    f.wm.tick(f.t0);
    f.wm.tick(f.t0);

    assert_eq!(f.wm.clients.hot(a).map(|c| c.transient_for), Some(Handle::INVALID));
    assert_eq!(f.wm.clients.hot(b).map(|c| c.transient_for), Some(a));

    // Neither transient list loops back on itself.
    let a_children = f.wm.clients.hot(a).map(|c| c.transients_head).unwrap_or(Handle::INVALID);
    assert_eq!(a_children, b);
    let b_children = f.wm.clients.hot(b).map(|c| c.transients_head).unwrap_or(Handle::INVALID);
    assert_eq!(b_children, Handle::INVALID);
}

/// Scenario: close goes through WM_DELETE_WINDOW when advertised.
#[test]
fn wm_delete_window_close() {
    let mut f = Fixture::new();
    let win = with_protocols(plain_window(Rect::new(0, 0, 200, 150)), &[Atom::WmDeleteWindow]);
    let _h = f.manage(WIN, win);
    f.clear_requests();

    f.script.deliver(Event::ClientMessage(ClientMessage {
        window: WIN,
        message_type: Atom::NetCloseWindow,
        data: [0, 0, 0, 0, 0],
    }));
    f.wm.tick(f.t0);

    let reqs = f.requests();
    let deletes: Vec<_> = reqs
        .iter()
        .filter(|r| matches!(
            r,
            Request::SendClientMessage { window, message_type: Atom::WmProtocols, data }
                if *window == WIN && data[0] == Atom::WmDeleteWindow.word()
        ))
        .collect();
    assert_eq!(deletes.len(), 1);
    assert!(!reqs.iter().any(|r| matches!(r, Request::KillClient { .. })));
}

/// Universal invariant: a client is MAPPED iff it sits in exactly one layer
/// list, at its recorded stacking index.
#[test]
fn mapped_iff_stacked_at_recorded_index() {
    let mut f = Fixture::new();
    let a = f.manage(Xid(0x1), plain_window(Rect::new(0, 0, 100, 100)));
    let b = f.manage(Xid(0x2), with_desktop(plain_window(Rect::new(0, 0, 100, 100)), 2));
    let c = f.manage(Xid(0x3), plain_window(Rect::new(0, 0, 100, 100)));
    f.wm.iconify(a);
    f.wm.tick(f.t0);
    let _ = (b, c);

    for (h, hot, _) in f.wm.clients.iter() {
        let memberships = casement::client::Layer::ALL
            .iter()
            .filter(|l| f.wm.stack.layer(**l).contains(&h))
            .count();
        if hot.state == ClientState::Mapped {
            assert_eq!(memberships, 1);
            let layer = f.wm.stack.layer(hot.layer);
            assert_eq!(layer.get(hot.stacking_index as usize), Some(&h));
        } else {
            assert_eq!(memberships, 0);
        }
    }
}

/// Universal invariant: the id registry tracks liveness exactly.
#[test]
fn window_registry_matches_liveness() {
    let mut f = Fixture::new();
    let a = f.manage(Xid(0x1), plain_window(Rect::new(0, 0, 100, 100)));
    assert_eq!(f.wm.clients.by_window(Xid(0x1)), Some(a));
    f.script.vanish(Xid(0x1));
    f.script.deliver(Event::DestroyNotify { window: Xid(0x1) });
    f.wm.tick(f.t0);
    assert_eq!(f.wm.clients.by_window(Xid(0x1)), None);
    assert!(!f.wm.clients.live(a));
}

/// A smoke check that the engine can requery every adoption property
/// through the jar and settle them all in one drain.
#[test]
fn requery_every_adoption_property() {
    let mut f = Fixture::new();
    let h = f.manage(WIN, plain_window(Rect::new(0, 0, 100, 100)));
    for atom in Atom::ADOPTION_PROPERTIES {
        f.wm.requery_property(h, atom, f.t0);
    }
    assert_eq!(f.wm.jar.len(), Atom::ADOPTION_PROPERTIES.len());
    f.wm.tick(f.t0);
    assert!(f.wm.jar.is_empty());
    // All settled without aborting the client.
    assert!(f.wm.clients.live(h));
}
