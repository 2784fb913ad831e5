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

use std::{collections::HashMap, sync::Arc};

use log::debug;
use rand::{rngs::OsRng, Rng};
use smol::{channel, lock::Mutex};

use crate::{Error, Result};

pub type PublisherPtr<T> = Arc<Publisher<T>>;
pub type SubscriptionId = u64;

/// A receiving end of a [`Publisher`]
pub struct Subscription<T> {
    id: SubscriptionId,
    recv_queue: channel::Receiver<T>,
    parent: Arc<Publisher<T>>,
}

impl<T: Clone> Subscription<T> {
    pub fn get_id(&self) -> SubscriptionId {
        self.id
    }

    /// Wait for the next published message. Fails only if the
    /// publisher side went away.
    pub async fn receive(&self) -> Result<T> {
        match self.recv_queue.recv().await {
            Ok(message) => Ok(message),
            Err(e) => Err(Error::Custom(format!("Subscription {} closed: {e}", self.id))),
        }
    }

    /// Non-blocking variant of [`Subscription::receive`]
    pub fn try_receive(&self) -> Option<T> {
        self.recv_queue.try_recv().ok()
    }

    // Must be called manually since async Drop is not possible in Rust
    pub async fn unsubscribe(&self) {
        self.parent.clone().unsubscribe(self.id).await
    }
}

/// Simple broadcast (publish-subscribe) class
pub struct Publisher<T> {
    subs: Mutex<HashMap<SubscriptionId, channel::Sender<T>>>,
}

impl<T: Clone> Publisher<T> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { subs: Mutex::new(HashMap::new()) })
    }

    pub async fn subscribe(self: Arc<Self>) -> Subscription<T> {
        let (sender, recvr) = channel::unbounded();

        let mut subs = self.subs.lock().await;
        let mut sub_id: SubscriptionId = OsRng.gen();
        while subs.contains_key(&sub_id) {
            sub_id = OsRng.gen();
        }
        subs.insert(sub_id, sender);
        drop(subs);

        Subscription { id: sub_id, recv_queue: recvr, parent: self.clone() }
    }

    async fn unsubscribe(self: Arc<Self>, sub_id: SubscriptionId) {
        self.subs.lock().await.remove(&sub_id);
    }

    /// Send `message` to every subscription. Subscriptions whose receiving
    /// end was dropped without unsubscribing are removed.
    pub async fn notify(&self, message: T) {
        self.subs.lock().await.retain(|id, sub| match sub.try_send(message.clone()) {
            Ok(()) => true,
            Err(e) => {
                debug!(
                    target: "system::publisher",
                    "[system::publisher] Dropping subscription {id}: {e}",
                );
                false
            }
        });
    }

    #[cfg(test)]
    async fn subscription_count(&self) -> usize {
        self.subs.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use smol::future;

    use super::*;

    #[test]
    fn publish_to_all_subscribers() {
        future::block_on(async {
            let publisher = Publisher::<u32>::new();
            let sub_a = publisher.clone().subscribe().await;
            let sub_b = publisher.clone().subscribe().await;
            assert_ne!(sub_a.get_id(), sub_b.get_id());

            publisher.notify(7).await;
            assert_eq!(sub_a.receive().await.unwrap(), 7);
            assert_eq!(sub_b.receive().await.unwrap(), 7);

            sub_b.unsubscribe().await;
            publisher.notify(8).await;
            assert_eq!(sub_a.receive().await.unwrap(), 8);
            assert!(sub_b.try_receive().is_none());
        });
    }

    #[test]
    fn dropped_subscription_is_pruned() {
        future::block_on(async {
            let publisher = Publisher::<u32>::new();
            let sub_a = publisher.clone().subscribe().await;
            let sub_b = publisher.clone().subscribe().await;
            assert_eq!(publisher.subscription_count().await, 2);

            drop(sub_b);
            publisher.notify(1).await;
            assert_eq!(publisher.subscription_count().await, 1);
            assert_eq!(sub_a.receive().await.unwrap(), 1);

            // Further notifications keep reaching the live subscription
            publisher.notify(2).await;
            assert_eq!(publisher.subscription_count().await, 1);
            assert_eq!(sub_a.receive().await.unwrap(), 2);
        });
    }
}
