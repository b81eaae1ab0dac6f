// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

use crate::client::ClientState;
use crate::geom::Rect;
use crate::proto::fake::ROOT;
use crate::proto::{Atom, Event, Request, Xid};
use crate::test_support::{plain_window, Fixture};

fn press(window: Xid, button: u8, mods: Mods, x: i32, y: i32) -> Event {
    Event::ButtonPress(ButtonEvent { window, button, mods, root_x: x, root_y: y, time: 1 })
}

fn release(window: Xid) -> Event {
    Event::ButtonRelease(ButtonEvent {
        window,
        button: 1,
        mods: Mods::empty(),
        root_x: 0,
        root_y: 0,
        time: 2,
    })
}

fn motion(window: Xid, x: i32, y: i32) -> Event {
    Event::MotionNotify(MotionEvent { window, root_x: x, root_y: y, time: 3 })
}

fn key(sym: u32, mods: Mods) -> Event {
    Event::KeyPress(KeyEvent { window: ROOT, sym, mods, time: 4 })
}

fn managed(f: &mut Fixture) -> (crate::slotmap::Handle, Xid) {
    let h = f.manage(Xid(0x100), plain_window(Rect::new(100, 100, 300, 200)));
    let frame = f.wm.clients.hot(h).map(|c| c.frame).unwrap_or_default();
    (h, frame)
}

#[test]
fn mod_drag_moves_the_window_once_per_tick() {
    let mut f = Fixture::new();
    let (h, frame) = managed(&mut f);
    f.script.deliver(press(frame, 1, Mods::MOD1, 150, 150));
    // A burst of motion coalesces to the latest position.
    for step in 1..=20 {
        f.script.deliver(motion(frame, 150 + step, 150 + step * 2));
    }
    f.clear_requests();
    f.wm.tick(f.t0);

    assert!(matches!(f.wm.mode, Mode::Move(_)));
    let hot = f.wm.clients.hot(h).copied();
    assert_eq!(hot.map(|c| (c.current.x, c.current.y)), Some((120, 140)));

    let reqs = f.requests();
    let frame_configs = reqs
        .iter()
        .filter(|r| matches!(
            r,
            Request::ConfigureWindow { window, values } if *window == frame && values.x.is_some()
        ))
        .count();
    assert_eq!(frame_configs, 1);

    f.script.deliver(release(frame));
    f.wm.tick(f.t0);
    assert!(!f.wm.mode.active());
}

#[test]
fn escape_cancels_a_move_and_restores_geometry() {
    let mut f = Fixture::new();
    let (h, frame) = managed(&mut f);
    f.script.deliver(press(frame, 1, Mods::MOD1, 150, 150));
    f.script.deliver(motion(frame, 400, 400));
    f.wm.tick(f.t0);
    assert_ne!(f.wm.clients.hot(h).map(|c| c.current.x), Some(100));

    f.script.deliver(key(KEY_ESCAPE, Mods::empty()));
    f.wm.tick(f.t0);
    assert!(!f.wm.mode.active());
    assert_eq!(
        f.wm.clients.hot(h).map(|c| (c.current.x, c.current.y)),
        Some((100, 100))
    );
}

#[test]
fn resize_respects_size_hints() {
    let mut f = Fixture::new();
    let mut words = vec![0u32; 18];
    words[0] = crate::geom::P_MIN_SIZE;
    words[5] = 200;
    words[6] = 150;
    let win = crate::test_support::with_prop(
        plain_window(Rect::new(100, 100, 300, 200)),
        Atom::WmNormalHints,
        crate::proto::PropReply::cardinals(Atom::WmNormalHints, &words),
    );
    let h = f.manage(Xid(0x100), win);
    let frame = f.wm.clients.hot(h).map(|c| c.frame).unwrap_or_default();

    // Grab the bottom-right corner and drag far past the minimum.
    f.script.deliver(press(frame, 3, Mods::MOD1, 390, 290));
    f.script.deliver(motion(frame, 90, 40));
    f.wm.tick(f.t0);
    assert!(matches!(f.wm.mode, Mode::Resize(_)));
    assert_eq!(f.wm.clients.hot(h).map(|c| (c.current.w, c.current.h)), Some((200, 150)));
}

#[test]
fn docks_and_fullscreen_windows_do_not_drag() {
    let mut f = Fixture::new();
    let dock = f.manage(
        Xid(0x100),
        crate::test_support::with_window_type(
            plain_window(Rect::new(0, 0, 1280, 30)),
            Atom::NetWmWindowTypeDock,
        ),
    );
    let frame = f.wm.clients.hot(dock).map(|c| c.frame).unwrap_or_default();
    f.script.deliver(press(frame, 1, Mods::MOD1, 10, 10));
    f.wm.tick(f.t0);
    assert!(!f.wm.mode.active());
}

#[test]
fn switcher_cycles_and_commits_on_return() {
    let mut f = Fixture::new();
    let a = f.manage(Xid(0x100), plain_window(Rect::new(0, 0, 100, 100)));
    let b = f.manage(Xid(0x200), plain_window(Rect::new(0, 0, 100, 100)));
    f.wm.set_focus(a);

    f.script.deliver(key(KEY_TAB, Mods::MOD1));
    f.wm.tick(f.t0);
    let Mode::Switcher(s) = f.wm.mode else {
        assert!(matches!(f.wm.mode, Mode::Switcher(_)));
        return;
    };
    assert_eq!(s.candidate, b);

    f.script.deliver(key(KEY_RETURN, Mods::MOD1));
    f.wm.tick(f.t0);
    assert!(!f.wm.mode.active());
    assert_eq!(f.wm.focused, b);
}

#[test]
fn switcher_commits_on_modifier_release() {
    let mut f = Fixture::new();
    let a = f.manage(Xid(0x100), plain_window(Rect::new(0, 0, 100, 100)));
    let b = f.manage(Xid(0x200), plain_window(Rect::new(0, 0, 100, 100)));
    f.wm.set_focus(a);
    f.script.deliver(key(KEY_TAB, Mods::MOD1));
    f.wm.tick(f.t0);
    f.script.deliver(Event::KeyRelease(KeyEvent {
        window: ROOT,
        sym: 0xffe9,
        mods: Mods::empty(),
        time: 9,
    }));
    f.wm.tick(f.t0);
    assert_eq!(f.wm.focused, b);
}

#[test]
fn switcher_escape_leaves_focus_alone() {
    let mut f = Fixture::new();
    let a = f.manage(Xid(0x100), plain_window(Rect::new(0, 0, 100, 100)));
    let _b = f.manage(Xid(0x200), plain_window(Rect::new(0, 0, 100, 100)));
    f.wm.set_focus(a);
    f.script.deliver(key(KEY_TAB, Mods::MOD1));
    f.script.deliver(key(KEY_ESCAPE, Mods::empty()));
    f.wm.tick(f.t0);
    assert!(!f.wm.mode.active());
    assert_eq!(f.wm.focused, a);
}

#[test]
fn destroying_the_drag_target_cancels_the_mode() {
    let mut f = Fixture::new();
    let (_h, frame) = managed(&mut f);
    f.script.deliver(press(frame, 1, Mods::MOD1, 150, 150));
    f.wm.tick(f.t0);
    assert!(f.wm.mode.active());
    f.script.vanish(Xid(0x100));
    f.script.deliver(Event::DestroyNotify { window: Xid(0x100) });
    f.wm.tick(f.t0);
    assert!(!f.wm.mode.active());
}

#[test]
fn refused_grab_aborts_the_interaction() {
    let mut f = Fixture::new();
    let (_h, frame) = managed(&mut f);
    f.script.refuse_grabs(true);
    f.script.deliver(press(frame, 1, Mods::MOD1, 150, 150));
    f.wm.tick(f.t0);
    // The grab reply lands on the next drain and cancels.
    f.wm.tick(f.t0);
    assert!(!f.wm.mode.active());
}

#[test]
fn root_menu_opens_on_button_three_and_escape_closes() {
    let mut f = Fixture::new();
    f.script.deliver(press(ROOT, 3, Mods::empty(), 400, 400));
    f.wm.tick(f.t0);
    assert!(matches!(f.wm.mode, Mode::Menu));
    assert_eq!(f.chrome.0.borrow().menu_events.as_slice(), &[true]);

    f.script.deliver(key(KEY_ESCAPE, Mods::empty()));
    f.wm.tick(f.t0);
    assert!(!f.wm.mode.active());
    assert_eq!(f.chrome.0.borrow().menu_events.as_slice(), &[true, false]);
}

#[test]
fn plain_click_on_a_frame_focuses_the_client() {
    let mut f = Fixture::new();
    let (h, frame) = managed(&mut f);
    assert_eq!(f.wm.focused, crate::slotmap::Handle::INVALID);
    f.script.deliver(press(frame, 1, Mods::empty(), 150, 150));
    f.wm.tick(f.t0);
    assert_eq!(f.wm.focused, h);
}

#[test]
fn focus_loss_cancels_an_active_mode() {
    let mut f = Fixture::new();
    let (_h, frame) = managed(&mut f);
    f.script.deliver(press(frame, 1, Mods::MOD1, 150, 150));
    f.wm.tick(f.t0);
    assert!(f.wm.mode.active());
    f.script.deliver(Event::FocusOut { window: ROOT });
    f.wm.tick(f.t0);
    assert!(!f.wm.mode.active());
}
