// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for the end-to-end window-management scenarios.
//!
//! Scenarios drive the full engine (ingest, cookie drain, process, commit)
//! against the scripted display transport, and assert on the requests and
//! properties the display server would observe.

use std::path::{Path, PathBuf};

pub use casement::test_support::Fixture;

/// Resolve the path to the compiled `casement` binary.
pub fn casement_binary() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    // tests/specs → tests → workspace root
    let workspace = manifest.parent().and_then(|p| p.parent()).unwrap_or(manifest);
    workspace.join("target").join("debug").join("casement")
}
