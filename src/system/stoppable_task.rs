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

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use futures::{Future, FutureExt};
use smol::channel;

use super::ExecutorPtr;

pub type StoppableTaskPtr = Arc<StoppableTask>;

/// A background task that can be cancelled from the outside.
///
/// The main future races against a stop signal. Whichever finishes first
/// decides the result handed to the stop handler. A stopped main future is
/// dropped at its current suspension point, so it cannot make any further
/// progress afterwards.
pub struct StoppableTask {
    stop_send: channel::Sender<()>,
    stop_recv: channel::Receiver<()>,
    /// Closed once the stop handler has returned
    done_send: channel::Sender<()>,
    done_recv: channel::Receiver<()>,
    started: AtomicBool,
}

impl StoppableTask {
    pub fn new() -> Arc<Self> {
        let (stop_send, stop_recv) = channel::unbounded();
        let (done_send, done_recv) = channel::bounded(1);
        Arc::new(Self { stop_send, stop_recv, done_send, done_recv, started: AtomicBool::new(false) })
    }

    /// Signal the task to stop and wait until its stop handler has run.
    /// Returns immediately if the task was never started or already finished.
    pub async fn stop(&self) {
        if !self.started.load(Ordering::SeqCst) {
            return
        }

        // Ignore any errors from this send
        let _ = self.stop_send.send(()).await;

        // The channel never carries messages, recv() errors out once closed
        let _ = self.done_recv.recv().await;
    }

    pub fn start<MainFut, StopFut, StopFn, Error>(
        self: Arc<Self>,
        main: MainFut,
        stop_handler: StopFn,
        stop_value: Error,
        executor: ExecutorPtr,
    ) where
        MainFut: Future<Output = std::result::Result<(), Error>> + Send + 'static,
        StopFut: Future<Output = ()> + Send,
        StopFn: FnOnce(std::result::Result<(), Error>) -> StopFut + Send + 'static,
        Error: std::error::Error + Send + 'static,
    {
        self.started.store(true, Ordering::SeqCst);

        executor
            .spawn(async move {
                let result = futures::select! {
                    _ = self.stop_recv.recv().fuse() => Err(stop_value),
                    result = main.fuse() => result
                };

                stop_handler(result).await;
                self.done_send.close();
            })
            .detach();
    }
}
