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

//! Async runtime helpers shared by the tracker and the CLI.

use std::{sync::Arc, time::Duration};

use smol::{Executor, Timer};

/// Implementation of async background task spawning which are stoppable
/// using channel signalling.
pub mod stoppable_task;
pub use stoppable_task::{StoppableTask, StoppableTaskPtr};

/// Simple broadcast (publish-subscribe) class
pub mod publisher;
pub use publisher::{Publisher, PublisherPtr, Subscription, SubscriptionId};

pub type ExecutorPtr = Arc<Executor<'static>>;

/// Sleep for any number of seconds.
pub async fn sleep(seconds: u64) {
    Timer::after(Duration::from_secs(seconds)).await;
}

/// Sleep for any number of milliseconds.
pub async fn sleep_ms(millis: u64) {
    Timer::after(Duration::from_millis(millis)).await;
}
