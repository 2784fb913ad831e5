/* This file is part of DarkFi (https://dark.fi)
 *
 * Copyright (C) 2020-2026 Dyne.org foundation
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! Daemon scaffolding shared by the command line tools: config file
//! bootstrapping, logger setup, executor threads and signal handling.

use std::{fs, io::Write, path::Path};

use log::{debug, info};
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook_async_std::{Handle, Signals};
use simplelog::{ConfigBuilder, LevelFilter};
use smol::{channel, stream::StreamExt, Task};

use crate::{system::ExecutorPtr, Error, Result};

/// Write `contents` to `path` unless a file is already there.
pub fn spawn_config(path: &Path, contents: &[u8]) -> Result<()> {
    if path.exists() {
        return Ok(())
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = fs::File::create(path)?;
    file.write_all(contents)?;
    println!("Config file created in {path:?}. Please review it and try again.");

    Ok(())
}

/// Map the `-v` occurrence count to a log level.
pub fn get_log_level(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Logger config for the given verbosity. Below trace level the noisy
/// HTTP client internals are filtered out.
pub fn get_log_config(verbosity: u8) -> simplelog::Config {
    let mut cfg = ConfigBuilder::new();
    cfg.set_target_level(LevelFilter::Error);

    if verbosity < 3 {
        cfg.add_filter_ignore_str("alloy_transport_http");
        cfg.add_filter_ignore_str("alloy_rpc_client");
        cfg.add_filter_ignore_str("reqwest");
        cfg.add_filter_ignore_str("hyper_util");
        cfg.add_filter_ignore_str("async_io");
        cfg.add_filter_ignore_str("polling");
    }

    cfg.build()
}

#[macro_export]
macro_rules! cli_desc {
    () => {{
        let desc = format!(
            "{} {}\n{}\n",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            env!("CARGO_PKG_DESCRIPTION"),
        );
        Box::leak(desc.into_boxed_str()) as &'static str
    }};
}

/// Generate a `main` that parses `Args` (command line merged over the
/// TOML config at `CONFIG_FILE`), sets up logging, spins up an executor
/// thread pool and runs `$realmain(args, executor)` on it.
///
/// The calling crate must define `Args` with `config`, `verbose` and
/// `log` fields, plus the `CONFIG_FILE` and `CONFIG_FILE_CONTENTS`
/// constants.
#[macro_export]
macro_rules! async_daemonize {
    ($realmain:ident) => {
        fn main() -> $crate::Result<()> {
            let args = match Args::from_args_with_toml("") {
                Ok(v) => v,
                Err(e) => {
                    eprintln!("Unable to parse arguments: {e}");
                    return Err($crate::Error::Custom(e.to_string()))
                }
            };

            let cfg_path = $crate::util::path::get_config_path(args.config, CONFIG_FILE)?;
            $crate::util::cli::spawn_config(&cfg_path, CONFIG_FILE_CONTENTS.as_bytes())?;

            let args = match Args::from_args_with_toml(&std::fs::read_to_string(&cfg_path)?) {
                Ok(v) => v,
                Err(e) => {
                    eprintln!("Unable to parse config file {cfg_path:?}: {e}");
                    return Err($crate::Error::Custom(e.to_string()))
                }
            };

            let log_level = $crate::util::cli::get_log_level(args.verbose);
            let log_config = $crate::util::cli::get_log_config(args.verbose);

            match &args.log {
                Some(path) => {
                    let log_file = std::fs::File::create($crate::util::path::expand_path(path)?)?;
                    simplelog::CombinedLogger::init(vec![
                        simplelog::TermLogger::new(
                            log_level,
                            log_config.clone(),
                            simplelog::TerminalMode::Mixed,
                            simplelog::ColorChoice::Auto,
                        ),
                        simplelog::WriteLogger::new(log_level, log_config, log_file),
                    ])?;
                }

                None => simplelog::TermLogger::init(
                    log_level,
                    log_config,
                    simplelog::TerminalMode::Mixed,
                    simplelog::ColorChoice::Auto,
                )?,
            }

            let n_threads = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
            let ex = std::sync::Arc::new(smol::Executor::new());
            let (signal, shutdown) = smol::channel::unbounded::<()>();
            let (_, result) = easy_parallel::Parallel::new()
                .each(0..n_threads, |_| smol::future::block_on(ex.run(shutdown.recv())))
                // Run the main future on the current thread.
                .finish(|| {
                    smol::future::block_on(async {
                        let result = $realmain(args, ex.clone()).await;
                        drop(signal);
                        result
                    })
                });

            result
        }
    };
}

/// Waits for termination signals on behalf of a daemon.
pub struct SignalHandler {
    /// Receives a message on SIGINT, SIGTERM or SIGQUIT
    pub term_rx: channel::Receiver<()>,
    handle: Handle,
}

impl SignalHandler {
    /// Register the signal handlers and spawn the task forwarding them.
    pub fn new(ex: ExecutorPtr) -> Result<(Self, Task<Result<()>>)> {
        let (term_tx, term_rx) = channel::bounded::<()>(1);
        let signals = Signals::new([SIGHUP, SIGTERM, SIGINT, SIGQUIT])?;
        let handle = signals.handle();
        let task = ex.spawn(handle_signals(signals, term_tx));

        Ok((Self { term_rx, handle }, task))
    }

    /// Block until a termination signal arrives, then tear down the handlers.
    pub async fn wait_termination(&self, signals_task: Task<Result<()>>) -> Result<()> {
        if let Err(e) = self.term_rx.recv().await {
            return Err(Error::Custom(format!("Signal channel closed: {e}")))
        }

        self.handle.close();
        signals_task.await
    }
}

async fn handle_signals(mut signals: Signals, term_tx: channel::Sender<()>) -> Result<()> {
    while let Some(signal) = signals.next().await {
        match signal {
            SIGHUP => {
                info!(target: "util::cli::handle_signals", "Caught SIGHUP, ignoring");
            }

            SIGTERM | SIGINT | SIGQUIT => {
                debug!(target: "util::cli::handle_signals", "Caught termination signal {signal}");
                if term_tx.send(()).await.is_err() {
                    break
                }
            }

            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(get_log_level(0), LevelFilter::Info);
        assert_eq!(get_log_level(1), LevelFilter::Debug);
        assert_eq!(get_log_level(2), LevelFilter::Trace);
        assert_eq!(get_log_level(9), LevelFilter::Trace);
    }

    #[test]
    fn config_is_written_once() {
        let dir = std::env::temp_dir().join(format!("dlp-cli-test-{}", std::process::id()));
        let path = dir.join("nested/config.toml");

        spawn_config(&path, b"poll_interval = 30\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "poll_interval = 30\n");

        spawn_config(&path, b"overwritten\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "poll_interval = 30\n");

        fs::remove_dir_all(dir).unwrap();
    }
}
