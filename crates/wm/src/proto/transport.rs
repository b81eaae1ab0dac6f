// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The abstract display connection.
//!
//! One connection, one writer. Requests are queued locally by `submit` and
//! hit the wire on `flush`; events and replies are drained non-blocking.
//! `wait_reply` is the single sanctioned blocking call, used only for the
//! startup probes.

use std::os::fd::BorrowedFd;

use super::{Event, Reply, Request, Xid};
use crate::error::{ProtoError, WmError};

/// Monotonic per-request sequence number.
pub type Seq = u64;

/// Outcome of a non-blocking reply poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollReply {
    /// The reply has not arrived yet.
    Pending,
    Reply(Reply),
    Error(ProtoError),
}

pub trait Transport {
    /// Readable file descriptor for the multiplex wait, when the backend has
    /// one. The scripted transport has none and is ticked explicitly.
    fn fd(&self) -> Option<BorrowedFd<'_>>;

    /// The root window of the managed screen.
    fn root(&self) -> Xid;

    /// Root window geometry.
    fn screen_size(&self) -> crate::geom::Rect;

    /// Allocate a fresh resource id (frame and helper windows).
    fn generate_id(&mut self) -> Xid;

    /// Queue a request; returns its sequence number.
    fn submit(&mut self, req: Request) -> Seq;

    /// Next pending event, if any.
    fn poll_event(&mut self) -> Option<Event>;

    /// Non-blocking reply check for a submitted sequence.
    fn poll_reply(&mut self, seq: Seq) -> PollReply;

    /// Blocking reply wait. Startup-only sync boundary.
    fn wait_reply(&mut self, seq: Seq) -> PollReply;

    /// Push queued requests to the server. `Ok(false)` means the write would
    /// block; the caller marks the tick `pending_flush` and retries.
    fn flush(&mut self) -> Result<bool, WmError>;
}
