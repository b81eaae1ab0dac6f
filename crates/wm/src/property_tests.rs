// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

use crate::client::{NetState, Protocols};
use crate::geom::Rect;
use crate::proto::{Event, PropReply, Xid};
use crate::slotmap::Handle;
use crate::test_support::{plain_window, with_title, Fixture};

fn managed() -> (Fixture, Handle) {
    let mut f = Fixture::new();
    let h = f.manage(Xid(0x100), plain_window(Rect::new(0, 0, 300, 200)));
    assert!(h.is_valid());
    (f, h)
}

#[test]
fn wm_name_fills_the_title() {
    let (mut f, h) = managed();
    let reply = PropReply::latin1(b"legacy title");
    f.wm.apply_property(h, Atom::WmName, Some(&reply));
    assert_eq!(f.wm.clients.cold(h).map(|c| c.title.clone()), Some("legacy title".into()));
}

#[test]
fn net_wm_name_is_sticky_over_wm_name() {
    let (mut f, h) = managed();
    let utf8 = PropReply::utf8("modern");
    f.wm.apply_property(h, Atom::NetWmName, Some(&utf8));
    let legacy = PropReply::latin1(b"legacy");
    f.wm.apply_property(h, Atom::WmName, Some(&legacy));
    assert_eq!(f.wm.clients.cold(h).map(|c| c.title.clone()), Some("modern".into()));

    // Deleting _NET_WM_NAME lifts the stickiness.
    f.wm.apply_property(h, Atom::NetWmName, None);
    f.wm.apply_property(h, Atom::WmName, Some(&legacy));
    assert_eq!(f.wm.clients.cold(h).map(|c| c.title.clone()), Some("legacy".into()));
}

#[test]
fn invalid_utf8_net_name_is_rejected() {
    let (mut f, h) = managed();
    let bad = PropReply { type_: Atom::Utf8String, format: 8, data: vec![0xff, 0xfe].into() };
    f.wm.apply_property(h, Atom::NetWmName, Some(&bad));
    assert_eq!(f.wm.clients.cold(h).map(|c| c.title.clone()), Some(String::new()));
}

#[test]
fn oversized_titles_are_truncated() {
    let (mut f, h) = managed();
    let long = "x".repeat(MAX_NAME_LEN + 100);
    let reply = PropReply::utf8(&long);
    f.wm.apply_property(h, Atom::NetWmName, Some(&reply));
    assert_eq!(f.wm.clients.cold(h).map(|c| c.title.len()), Some(MAX_NAME_LEN));
}

#[test]
fn wm_class_splits_instance_and_class() {
    let (mut f, h) = managed();
    let reply = PropReply::latin1(b"listtest\0ListTest\0");
    f.wm.apply_property(h, Atom::WmClass, Some(&reply));
    let cold = f.wm.clients.cold(h);
    assert_eq!(cold.map(|c| (c.instance.clone(), c.class.clone())),
        Some(("listtest".into(), "ListTest".into())));
}

#[test]
fn malformed_size_hints_keep_the_previous_value() {
    let (mut f, h) = managed();
    let mut words = vec![0u32; 18];
    words[0] = crate::geom::P_MIN_SIZE;
    words[5] = 120;
    words[6] = 90;
    let good = PropReply::cardinals(Atom::WmNormalHints, &words);
    f.wm.apply_property(h, Atom::WmNormalHints, Some(&good));
    assert_eq!(f.wm.clients.hot(h).map(|c| (c.hints.min_w, c.hints.min_h)), Some((120, 90)));

    // Truncated payload: rejected, previous hints survive.
    let bad = PropReply::cardinals(Atom::WmNormalHints, &[1, 2, 3]);
    f.wm.apply_property(h, Atom::WmNormalHints, Some(&bad));
    assert_eq!(f.wm.clients.hot(h).map(|c| (c.hints.min_w, c.hints.min_h)), Some((120, 90)));
}

#[test]
fn reply_with_misaligned_length_is_rejected() {
    let (mut f, h) = managed();
    let bad = PropReply { type_: Atom::Cardinal, format: 32, data: vec![1, 2, 3].into() };
    assert_eq!(bad.as_u32s(), None);
    f.wm.apply_property(h, Atom::NetWmDesktop, Some(&bad));
    assert_eq!(f.wm.clients.hot(h).map(|c| c.desktop), Some(0));
}

#[test]
fn urgency_hint_sets_demands_attention() {
    let (mut f, h) = managed();
    let words = [1 << 8, 0, 0, 0, 0, 0, 0, 0, 0];
    let reply = PropReply::cardinals(Atom::WmHints, &words);
    f.wm.apply_property(h, Atom::WmHints, Some(&reply));
    assert_eq!(
        f.wm.clients.hot(h).map(|c| c.net_state.contains(NetState::DEMANDS_ATTENTION)),
        Some(true)
    );
}

#[test]
fn protocols_decode_into_the_bitset() {
    let (mut f, h) = managed();
    let reply = PropReply::atoms(&[Atom::WmDeleteWindow, Atom::WmTakeFocus]);
    f.wm.apply_property(h, Atom::WmProtocols, Some(&reply));
    assert_eq!(
        f.wm.clients.cold(h).map(|c| c.protocols),
        Some(Protocols::DELETE_WINDOW | Protocols::TAKE_FOCUS)
    );
}

#[test]
fn transient_for_self_reference_is_rejected() {
    let (mut f, h) = managed();
    let reply = PropReply::cardinals(Atom::Window, &[0x100]);
    f.wm.apply_property(h, Atom::WmTransientFor, Some(&reply));
    assert_eq!(f.wm.clients.hot(h).map(|c| c.transient_for), Some(Handle::INVALID));
}

#[test]
fn transient_cycle_degrades_to_invalid() {
    let mut f = Fixture::new();
    let a = f.manage(Xid(0x100), plain_window(Rect::new(0, 0, 100, 100)));
    let b = f.manage(Xid(0x200), plain_window(Rect::new(0, 0, 100, 100)));

    let to_b = PropReply::cardinals(Atom::Window, &[0x200]);
    f.wm.apply_property(a, Atom::WmTransientFor, Some(&to_b));
    assert_eq!(f.wm.clients.hot(a).map(|c| c.transient_for), Some(b));

    // B claiming A as parent would close the loop.
    let to_a = PropReply::cardinals(Atom::Window, &[0x100]);
    f.wm.apply_property(b, Atom::WmTransientFor, Some(&to_a));
    assert_eq!(f.wm.clients.hot(b).map(|c| c.transient_for), Some(Handle::INVALID));
    // The raw id is retained for later re-resolution.
    assert_eq!(f.wm.clients.cold(b).map(|c| c.transient_for_xid), Some(Xid(0x100)));
}

#[test]
fn dangling_transient_keeps_the_raw_id() {
    let (mut f, h) = managed();
    let reply = PropReply::cardinals(Atom::Window, &[0x999]);
    f.wm.apply_property(h, Atom::WmTransientFor, Some(&reply));
    assert_eq!(f.wm.clients.hot(h).map(|c| c.transient_for), Some(Handle::INVALID));
    assert_eq!(f.wm.clients.cold(h).map(|c| c.transient_for_xid), Some(Xid(0x999)));
}

#[test]
fn strut_updates_mark_the_workarea_dirty() {
    let (mut f, h) = managed();
    f.wm.tick(f.t0);
    let words = [0, 0, 30, 0, 0, 0, 0, 0, 0, 1280, 0, 0];
    let reply = PropReply::cardinals(Atom::Cardinal, &words);
    f.wm.apply_property(h, Atom::NetWmStrutPartial, Some(&reply));
    assert_eq!(
        f.wm.clients.cold(h).and_then(|c| c.strut).map(|s| s.top),
        Some(30)
    );
    assert!(f.wm.root.dirty.contains(crate::wm::RootDirty::WORKAREA));
}

#[test]
fn icon_dimension_bound_is_enforced() {
    let (mut f, h) = managed();
    let huge = [5000u32, 2, 0, 0];
    let reply = PropReply::cardinals(Atom::Cardinal, &huge);
    f.wm.apply_property(h, Atom::NetWmIcon, Some(&reply));
    assert!(f.wm.clients.cold(h).map(|c| c.icon.is_none()).unwrap_or(false));

    let ok = [2u32, 2, 1, 2, 3, 4];
    let reply = PropReply::cardinals(Atom::Cardinal, &ok);
    f.wm.apply_property(h, Atom::NetWmIcon, Some(&reply));
    assert_eq!(
        f.wm.clients.cold(h).and_then(|c| c.icon.as_ref()).map(|i| (i.width, i.height)),
        Some((2, 2))
    );
}

#[test]
fn truncated_icon_payload_is_rejected() {
    let (mut f, h) = managed();
    let truncated = [4u32, 4, 1, 2, 3];
    let reply = PropReply::cardinals(Atom::Cardinal, &truncated);
    f.wm.apply_property(h, Atom::NetWmIcon, Some(&reply));
    assert!(f.wm.clients.cold(h).map(|c| c.icon.is_none()).unwrap_or(false));
}

#[test]
fn property_notify_triggers_a_requery() {
    let mut f = Fixture::new();
    let h = f.manage(Xid(0x100), with_title(plain_window(Rect::new(0, 0, 100, 100)), "one"));
    assert_eq!(f.wm.clients.cold(h).map(|c| c.title.clone()), Some("one".into()));

    f.script.set_window_property(Xid(0x100), Atom::NetWmName, PropReply::utf8("two"));
    f.script.deliver(Event::PropertyNotify {
        window: Xid(0x100),
        atom: Atom::NetWmName,
        deleted: false,
    });
    // One tick to re-issue the query, one to drain the reply.
    f.wm.tick(f.t0);
    f.wm.tick(f.t0);
    assert_eq!(f.wm.clients.cold(h).map(|c| c.title.clone()), Some("two".into()));
}
