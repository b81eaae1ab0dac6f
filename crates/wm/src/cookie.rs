// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cookie jar: the asynchronous reply dispatcher.
//!
//! Every request that expects a reply is registered here with a tagged kind;
//! the tick loop drains ready replies with a per-call budget instead of ever
//! blocking on the server. The table is open-addressing keyed by the request
//! sequence, deletes by backward shift (no tombstones), and persists a scan
//! cursor across drains so sparse replies cannot starve late residents.

use std::time::{Duration, Instant};

use crate::proto::{Atom, PollReply, Reply, Seq, Transport, Xid};
use crate::slotmap::Handle;

/// Default reply deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Hard table bound; `push` refuses beyond this.
const MAX_CAPACITY: usize = 1 << 16;

/// Tagged reply dispatch. The engine matches exhaustively on this in
/// `manage::handle_cookie`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieKind {
    /// Window attributes during adoption.
    Attributes,
    /// Initial geometry during adoption.
    Geometry,
    /// A `GetProperty`; fired both during adoption and on `PropertyNotify`.
    Property(Atom),
    /// Root `QueryTree` for the startup scan.
    Tree,
    /// Attributes of a startup-scan child; `payload` carries the child id.
    ScanAttributes,
    /// Pointer or keyboard grab status for an interaction mode.
    Grab,
}

/// One outstanding request.
#[derive(Debug, Clone, Copy)]
pub struct CookieSlot {
    pub seq: Seq,
    pub kind: CookieKind,
    pub client: Handle,
    pub payload: Xid,
    pub deadline: Instant,
}

/// What the drain observed for a slot. Timeout delivers neither reply nor
/// error; handlers treat it as a soft failure.
#[derive(Debug, Clone)]
pub enum Outcome {
    Reply(Reply),
    Error(crate::error::ProtoError),
    Timeout,
}

const EMPTY: Seq = 0;

#[derive(Debug)]
pub struct CookieJar {
    slots: Vec<CookieSlot>,
    live: usize,
    cursor: usize,
}

impl Default for CookieJar {
    fn default() -> Self {
        Self::new()
    }
}

impl CookieJar {
    pub fn new() -> Self {
        Self { slots: vec![CookieSlot::empty(); 64], live: 0, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Register an outstanding sequence.
    ///
    /// A duplicate sequence replaces the resident slot atomically. Returns
    /// `false` only when the table is at its hard bound.
    pub fn push(
        &mut self,
        seq: Seq,
        kind: CookieKind,
        client: Handle,
        payload: Xid,
        now: Instant,
    ) -> bool {
        self.push_with_deadline(seq, kind, client, payload, now + DEFAULT_TIMEOUT)
    }

    pub fn push_with_deadline(
        &mut self,
        seq: Seq,
        kind: CookieKind,
        client: Handle,
        payload: Xid,
        deadline: Instant,
    ) -> bool {
        if seq == EMPTY {
            return false;
        }
        if (self.live + 1) * 10 >= self.slots.len() * 7 {
            if self.slots.len() >= MAX_CAPACITY {
                return false;
            }
            self.grow();
        }
        let mask = self.slots.len() - 1;
        let mut i = self.home(seq);
        loop {
            if self.slots[i].seq == EMPTY {
                self.slots[i] = CookieSlot { seq, kind, client, payload, deadline };
                self.live += 1;
                return true;
            }
            if self.slots[i].seq == seq {
                self.slots[i] = CookieSlot { seq, kind, client, payload, deadline };
                return true;
            }
            i = (i + 1) & mask;
        }
    }

    /// Remove and return the slot for a sequence, if resident.
    pub fn take(&mut self, seq: Seq) -> Option<CookieSlot> {
        let i = self.find(seq)?;
        let slot = self.slots[i];
        self.remove_index(i);
        self.live -= 1;
        Some(slot)
    }

    pub fn contains(&self, seq: Seq) -> bool {
        self.find(seq).is_some()
    }

    /// Poll the transport for each resident sequence, up to `budget` ready
    /// replies. Ready slots are removed before their outcome is surfaced, so
    /// a handler can never be invoked twice for one sequence.
    ///
    /// Scanning starts at the persisted cursor for fairness.
    pub fn drain(
        &mut self,
        transport: &mut dyn Transport,
        budget: usize,
        out: &mut Vec<(CookieSlot, Outcome)>,
    ) {
        if self.live == 0 || budget == 0 {
            return;
        }
        let len = self.slots.len();
        let start = self.cursor.min(len - 1);
        let mut ready: Vec<Seq> = Vec::new();
        for step in 0..len {
            if ready.len() >= budget {
                break;
            }
            let i = (start + step) & (len - 1);
            let seq = self.slots[i].seq;
            if seq == EMPTY {
                continue;
            }
            match transport.poll_reply(seq) {
                PollReply::Pending => {}
                PollReply::Reply(reply) => {
                    ready.push(seq);
                    // Stash the decoded reply alongside; resolved below once
                    // the slot is removed.
                    out.push((self.slots[i], Outcome::Reply(reply)));
                }
                PollReply::Error(err) => {
                    ready.push(seq);
                    out.push((self.slots[i], Outcome::Error(err)));
                }
            }
            self.cursor = (i + 1) & (len - 1);
        }
        for seq in ready {
            let _ = self.take(seq);
        }
    }

    /// Fire timeouts for slots whose deadline has elapsed. A late reply on a
    /// retired sequence is never polled again, so it cannot resurrect the
    /// slot.
    pub fn timeout_scan(&mut self, now: Instant, out: &mut Vec<(CookieSlot, Outcome)>) {
        if self.live == 0 {
            return;
        }
        let expired: Vec<Seq> = self
            .slots
            .iter()
            .filter(|s| s.seq != EMPTY && s.deadline <= now)
            .map(|s| s.seq)
            .collect();
        for seq in expired {
            if let Some(slot) = self.take(seq) {
                out.push((slot, Outcome::Timeout));
            }
        }
    }

    /// Earliest pending deadline, for arming the wakeup timer.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.slots.iter().filter(|s| s.seq != EMPTY).map(|s| s.deadline).min()
    }

    fn home(&self, seq: Seq) -> usize {
        let mask = self.slots.len() - 1;
        (seq.wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 32) as usize & mask
    }

    fn find(&self, seq: Seq) -> Option<usize> {
        if seq == EMPTY {
            return None;
        }
        let mask = self.slots.len() - 1;
        let mut i = self.home(seq);
        loop {
            if self.slots[i].seq == EMPTY {
                return None;
            }
            if self.slots[i].seq == seq {
                return Some(i);
            }
            i = (i + 1) & mask;
        }
    }

    /// Backward-shift deletion keeps probe chains intact without tombstones.
    fn remove_index(&mut self, mut i: usize) {
        let mask = self.slots.len() - 1;
        let mut j = i;
        loop {
            self.slots[i].seq = EMPTY;
            loop {
                j = (j + 1) & mask;
                if self.slots[j].seq == EMPTY {
                    return;
                }
                let home = self.home(self.slots[j].seq);
                let movable = if i <= j {
                    home <= i || home > j
                } else {
                    home <= i && home > j
                };
                if movable {
                    self.slots[i] = self.slots[j];
                    i = j;
                    break;
                }
            }
        }
    }

    fn grow(&mut self) {
        let grown = (self.slots.len() * 2).min(MAX_CAPACITY);
        let old = std::mem::replace(&mut self.slots, vec![CookieSlot::empty(); grown]);
        self.live = 0;
        self.cursor = 0;
        for slot in old {
            if slot.seq != EMPTY {
                self.push_with_deadline(
                    slot.seq,
                    slot.kind,
                    slot.client,
                    slot.payload,
                    slot.deadline,
                );
            }
        }
    }
}

impl CookieSlot {
    fn empty() -> Self {
        Self {
            seq: EMPTY,
            kind: CookieKind::Attributes,
            client: Handle::INVALID,
            payload: Xid::NONE,
            deadline: Instant::now(),
        }
    }
}

#[cfg(test)]
#[path = "cookie_tests.rs"]
mod tests;
