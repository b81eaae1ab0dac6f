// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Boot, the selection handshake, and the multiplex-wait main loop.
//!
//! The loop blocks in `poll(2)` on the transport fd, a signalfd, and a
//! timerfd armed from the earliest cookie deadline (and the flush-retry
//! backoff). Signals only set flags; everything runs on the loop thread.

use std::os::fd::AsFd;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::signal::{kill, sigprocmask, SigSet, SigmaskHow, Signal};
use nix::sys::signalfd::{SfdFlags, SignalFd};
use nix::sys::time::TimeSpec;
use nix::sys::timerfd::{ClockId, Expiration, TimerFd, TimerFlags, TimerSetTimeFlags};
use nix::unistd::Pid;
use tracing::{info, warn};

use crate::chrome::NullChrome;
use crate::config::Config;
use crate::error::{Result, WmError};
use crate::proto::fake::ScriptTransport;
use crate::proto::{Atom, EventMask, PollReply, Reply, Request, Transport};
use crate::wm::Wm;

/// How the main loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Exit,
    /// SIGUSR1: the caller should re-exec the binary.
    Restart,
}

/// Retry interval while the transport reports write back-pressure.
const FLUSH_RETRY: Duration = Duration::from_millis(10);

pub fn pidfile_path(config: &Config) -> PathBuf {
    config
        .pidfile
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("casement.pid"))
}

/// Handle `--reconfigure` / `--restart` / `--exit` by signalling the
/// instance named in the pidfile.
pub fn control(config: &Config) -> Result<()> {
    let signal = if config.reconfigure {
        Signal::SIGHUP
    } else if config.restart {
        Signal::SIGUSR1
    } else {
        Signal::SIGTERM
    };
    let path = pidfile_path(config);
    let raw = std::fs::read_to_string(&path)
        .map_err(|_| WmError::Config(format!("no running instance ({} missing)", path.display())))?;
    let pid: i32 = raw
        .trim()
        .parse()
        .map_err(|_| WmError::Config(format!("malformed pidfile {}", path.display())))?;
    kill(Pid::from_raw(pid), signal)
        .map_err(|e| WmError::Transport(format!("signalling pid {pid}: {e}")))?;
    info!(pid, ?signal, "signalled running instance");
    Ok(())
}

/// Construct the configured transport.
pub fn connect(config: &Config) -> Result<Box<dyn Transport>> {
    match config.backend.as_str() {
        "loopback" => Ok(Box::new(ScriptTransport::new())),
        other => Err(WmError::Unsupported(other.to_string())),
    }
}

/// Run the window manager until shutdown.
pub fn run(config: Config) -> Result<RunOutcome> {
    let transport = connect(&config)?;
    let rules = config.load_rules()?;
    let mut wm = Wm::new(config, transport, Box::new(NullChrome));
    wm.rules = rules;

    let now = Instant::now();
    setup(&mut wm, now)?;

    let pidfile = pidfile_path(&wm.config);
    std::fs::write(&pidfile, format!("{}\n", std::process::id()))?;

    let outcome = if wm.transport.fd().is_some() {
        run_loop(&mut wm)
    } else {
        run_loopback(&mut wm)
    };

    teardown(&mut wm);
    let _ = std::fs::remove_file(&pidfile);
    outcome
}

/// Startup: selection, redirect, probes, adoption scan. The `wait_reply`
/// calls here are the process's only sanctioned blocking round-trips.
pub fn setup(wm: &mut Wm, now: Instant) -> Result<()> {
    wm.announce();
    let check = wm.root.check;

    let seq = wm.submit(Request::GetSelectionOwner { selection: Atom::WmSelection });
    if let PollReply::Reply(Reply::SelectionOwner { owner }) = wm.transport.wait_reply(seq) {
        if !owner.is_none() && owner != check {
            return Err(WmError::SelectionHeld);
        }
    }
    wm.submit(Request::SetSelectionOwner { selection: Atom::WmSelection, owner: check });
    let seq = wm.submit(Request::GetSelectionOwner { selection: Atom::WmSelection });
    if let PollReply::Reply(Reply::SelectionOwner { owner }) = wm.transport.wait_reply(seq) {
        if owner != check {
            return Err(WmError::SelectionHeld);
        }
    }

    // Claim the redirect on the root; only one client may.
    let root = wm.root.window;
    wm.submit(Request::ChangeAttributes {
        window: root,
        events: EventMask::SUBSTRUCTURE_REDIRECT
            | EventMask::SUBSTRUCTURE_NOTIFY
            | EventMask::STRUCTURE_NOTIFY
            | EventMask::PROPERTY_CHANGE
            | EventMask::BUTTON_PRESS
            | EventMask::COLORMAP_CHANGE,
    });

    for name in ["RANDR", "DAMAGE"] {
        let seq = wm.submit(Request::QueryExtension { name });
        let present = matches!(
            wm.transport.wait_reply(seq),
            PollReply::Reply(Reply::Extension { present: true })
        );
        match name {
            "RANDR" => wm.caps.randr = present,
            _ => wm.caps.damage = present,
        }
    }
    info!(randr = wm.caps.randr, damage = wm.caps.damage, "extensions probed");

    // Built-in bindings: the switcher.
    wm.submit(Request::GrabKey {
        window: root,
        sym: crate::proto::KEY_TAB,
        mods: crate::proto::Mods::MOD1,
    });
    wm.submit(Request::GrabKey {
        window: root,
        sym: crate::proto::KEY_TAB,
        mods: crate::proto::Mods::MOD1 | crate::proto::Mods::SHIFT,
    });

    wm.begin_adoption_scan(now);
    wm.tick(now);
    Ok(())
}

/// Unmanage everything so clients survive us, then drop the selection.
fn teardown(wm: &mut Wm) {
    let root = wm.root.window;
    for mods in [crate::proto::Mods::MOD1, crate::proto::Mods::MOD1 | crate::proto::Mods::SHIFT]
    {
        wm.submit(Request::UngrabKey { window: root, sym: crate::proto::KEY_TAB, mods });
    }
    for h in wm.clients.handles() {
        wm.unmanage(h, false);
    }
    let check = wm.root.check;
    if !check.is_none() {
        wm.submit(Request::DestroyWindow { window: check });
    }
    let _ = wm.transport.flush();
    info!("shut down");
}

fn block_signals() -> Result<SigSet> {
    let mut mask = SigSet::empty();
    mask.add(Signal::SIGTERM);
    mask.add(Signal::SIGINT);
    mask.add(Signal::SIGHUP);
    mask.add(Signal::SIGUSR1);
    sigprocmask(SigmaskHow::SIG_BLOCK, Some(&mask), None)
        .map_err(|e| WmError::Transport(format!("sigprocmask: {e}")))?;
    Ok(mask)
}

fn read_signals(wm: &mut Wm, sfd: &mut SignalFd) {
    while let Ok(Some(info)) = sfd.read_signal() {
        match Signal::try_from(info.ssi_signo as i32) {
            Ok(Signal::SIGTERM) | Ok(Signal::SIGINT) => wm.shutdown = true,
            Ok(Signal::SIGHUP) => wm.reload_rules = true,
            Ok(Signal::SIGUSR1) => {
                wm.restart = true;
                wm.shutdown = true;
            }
            _ => {}
        }
    }
}

/// The fd-driven multiplex loop, for transports backed by a connection.
fn run_loop(wm: &mut Wm) -> Result<RunOutcome> {
    let mask = block_signals()?;
    let mut sfd = SignalFd::with_flags(&mask, SfdFlags::SFD_NONBLOCK | SfdFlags::SFD_CLOEXEC)
        .map_err(|e| WmError::Transport(format!("signalfd: {e}")))?;
    let timer = TimerFd::new(ClockId::CLOCK_MONOTONIC, TimerFlags::TFD_NONBLOCK)
        .map_err(|e| WmError::Transport(format!("timerfd: {e}")))?;

    while !wm.shutdown {
        let now = Instant::now();

        // Arm the wakeup timer from the earliest deferred deadline; setting
        // it also discards any pending expirations.
        let wake = next_wakeup(wm, now);
        match wake {
            Some(delay) => {
                let delay = delay.max(Duration::from_millis(1));
                timer
                    .set(
                        Expiration::OneShot(TimeSpec::from_duration(delay)),
                        TimerSetTimeFlags::empty(),
                    )
                    .map_err(|e| WmError::Transport(format!("timerfd set: {e}")))?;
            }
            None => {
                let _ = timer.unset();
            }
        }

        {
            let Some(tfd) = wm.transport.fd() else { break };
            let mut fds = [
                PollFd::new(tfd, PollFlags::POLLIN),
                PollFd::new(sfd.as_fd(), PollFlags::POLLIN),
                PollFd::new(timer.as_fd(), PollFlags::POLLIN),
            ];
            match poll(&mut fds, PollTimeout::NONE) {
                Ok(_) => {}
                Err(nix::errno::Errno::EINTR) => continue,
                Err(e) => return Err(WmError::Transport(format!("poll: {e}"))),
            }
            if fds[0].revents().is_some_and(|r| r.contains(PollFlags::POLLHUP)) {
                return Err(WmError::ConnectionClosed);
            }
        }

        read_signals(wm, &mut sfd);
        if wm.reload_rules {
            wm.reload_rules = false;
            reload_rules(wm);
        }
        wm.tick(Instant::now());
    }

    Ok(if wm.restart { RunOutcome::Restart } else { RunOutcome::Exit })
}

/// Loopback transports have no fd: tick until the model quiesces. Used by
/// the `loopback` backend as a smoke run and by the scenario suite.
fn run_loopback(wm: &mut Wm) -> Result<RunOutcome> {
    let mut idle_ticks = 0;
    while !wm.shutdown && idle_ticks < 3 {
        let before = wm.jar.len();
        wm.tick(Instant::now());
        let quiescent = wm.jar.is_empty() && wm.buckets.is_empty() && before == 0;
        idle_ticks = if quiescent { idle_ticks + 1 } else { 0 };
    }
    Ok(if wm.restart { RunOutcome::Restart } else { RunOutcome::Exit })
}

fn next_wakeup(wm: &Wm, now: Instant) -> Option<Duration> {
    let mut wake: Option<Instant> = wm.jar.next_deadline();
    if wm.pending_flush {
        let retry = now + FLUSH_RETRY;
        wake = Some(wake.map_or(retry, |w| w.min(retry)));
    }
    wake.map(|w| w.saturating_duration_since(now))
}

fn reload_rules(wm: &mut Wm) {
    match wm.config.load_rules() {
        Ok(rules) => {
            info!(count = rules.len(), "rules reloaded");
            wm.rules = rules;
            for h in wm.clients.handles() {
                wm.mark_dirty(h, crate::client::Dirty::FRAME_STYLE);
            }
        }
        Err(e) => warn!(err = %e, "keeping previous rules"),
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
