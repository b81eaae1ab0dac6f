// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol-level error codes reported by the display server.
///
/// These are soft failures: a reply handler that receives one logs it,
/// settles the client's in-flight counter, and moves on. Only `BadWindow`
/// during adoption has a structural effect (the adoption is aborted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtoErrorKind {
    BadWindow,
    BadMatch,
    BadDrawable,
    BadValue,
    Other(u8),
}

impl ProtoErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadWindow => "BAD_WINDOW",
            Self::BadMatch => "BAD_MATCH",
            Self::BadDrawable => "BAD_DRAWABLE",
            Self::BadValue => "BAD_VALUE",
            Self::Other(_) => "OTHER",
        }
    }
}

impl fmt::Display for ProtoErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A protocol error tied to the request sequence that triggered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtoError {
    pub kind: ProtoErrorKind,
    pub seq: u64,
}

impl fmt::Display for ProtoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (seq {})", self.kind, self.seq)
    }
}

/// Fatal and boot-time error taxonomy.
///
/// Everything else in the engine is localised: reply-handler errors stay with
/// their client, commit errors degrade a single property write, and no error
/// propagates out of a tick.
#[derive(Debug, thiserror::Error)]
pub enum WmError {
    /// The client slotmap is full and growth is bounded; the specific manage
    /// attempt is dropped.
    #[error("client table full")]
    CapacityExhausted,

    /// Another window manager owns the selection.
    #[error("another window manager is running")]
    SelectionHeld,

    /// The display connection dropped.
    #[error("display connection closed")]
    ConnectionClosed,

    /// The requested display backend is not compiled into this binary.
    #[error("unsupported display backend: {0}")]
    Unsupported(String),

    /// Configuration rejected at load time.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl WmError {
    /// Process exit code for boot-time failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::SelectionHeld => 1,
            Self::Config(_) | Self::Unsupported(_) => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, WmError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
