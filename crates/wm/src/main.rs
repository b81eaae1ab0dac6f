// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tracing::error;

use casement::config::Config;
use casement::run::{self, RunOutcome};

fn main() {
    let config = Config::parse();
    init_logging(&config);

    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    if config.reconfigure || config.restart || config.exit {
        match run::control(&config) {
            Ok(()) => std::process::exit(0),
            Err(e) => {
                eprintln!("error: {e}");
                std::process::exit(e.exit_code());
            }
        }
    }

    match run::run(config) {
        Ok(RunOutcome::Exit) => std::process::exit(0),
        Ok(RunOutcome::Restart) => restart_self(),
        Err(e) => {
            error!("fatal: {e}");
            std::process::exit(e.exit_code());
        }
    }
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.clone()));
    if config.log_format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Re-exec the same binary with the same arguments (SIGUSR1 restart).
fn restart_self() -> ! {
    use std::os::unix::process::CommandExt;
    let args: Vec<String> = std::env::args().skip(1).collect();
    let exe = std::env::current_exe().unwrap_or_else(|_| "casement".into());
    let err = std::process::Command::new(exe).args(args).exec();
    eprintln!("error: restart failed: {err}");
    std::process::exit(1);
}
