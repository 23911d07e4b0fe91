use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::account::GeoPoint;

/// Event fanned out to a group. Fire-and-forget: nothing is buffered for
/// clients that are not subscribed at send time.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelEvent {
    LocationUpdate { order_id: Uuid, location: GeoPoint },
}

/// Publish/subscribe hub addressing subscribers by an opaque group key:
/// a user ID, a rider ID, or an order ID. Groups are created on first
/// subscribe and pruned once the last receiver is gone.
pub struct Hub {
    groups: DashMap<Uuid, broadcast::Sender<ChannelEvent>>,
    buffer: usize,
}

impl Hub {
    pub fn new(buffer: usize) -> Self {
        Self {
            groups: DashMap::new(),
            buffer,
        }
    }

    pub fn subscribe(&self, group: Uuid) -> broadcast::Receiver<ChannelEvent> {
        self.groups
            .entry(group)
            .or_insert_with(|| broadcast::channel(self.buffer).0)
            .subscribe()
    }

    /// Sends the event to every current subscriber of the group and
    /// returns how many received it. A group nobody watches swallows the
    /// event silently.
    pub fn publish(&self, group: Uuid, event: ChannelEvent) -> usize {
        match self.groups.get(&group) {
            Some(tx) => tx.send(event).unwrap_or(0),
            None => 0,
        }
    }

    /// Drops the group's channel if no receivers remain. Called when a
    /// connection unregisters from the group.
    pub fn prune(&self, group: Uuid) {
        self.groups
            .remove_if(&group, |_, tx| tx.receiver_count() == 0);
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{ChannelEvent, Hub};
    use crate::models::account::GeoPoint;

    fn location_event(order_id: Uuid) -> ChannelEvent {
        ChannelEvent::LocationUpdate {
            order_id,
            location: GeoPoint {
                lat: 1.0,
                lng: 2.0,
            },
        }
    }

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let hub = Hub::new(16);
        let order_id = Uuid::new_v4();
        let mut rx = hub.subscribe(order_id);

        let delivered = hub.publish(order_id, location_event(order_id));
        assert_eq!(delivered, 1);

        match rx.recv().await.unwrap() {
            ChannelEvent::LocationUpdate { order_id: got, .. } => assert_eq!(got, order_id),
        }
    }

    #[test]
    fn publish_without_subscribers_reaches_nobody() {
        let hub = Hub::new(16);
        let order_id = Uuid::new_v4();
        assert_eq!(hub.publish(order_id, location_event(order_id)), 0);
    }

    #[test]
    fn groups_are_scoped_by_key() {
        let hub = Hub::new(16);
        let watched = Uuid::new_v4();
        let other = Uuid::new_v4();
        let _rx = hub.subscribe(watched);

        assert_eq!(hub.publish(other, location_event(other)), 0);
        assert_eq!(hub.publish(watched, location_event(watched)), 1);
    }

    #[test]
    fn prune_removes_empty_groups_only() {
        let hub = Hub::new(16);
        let group = Uuid::new_v4();

        let rx = hub.subscribe(group);
        hub.prune(group);
        assert_eq!(hub.group_count(), 1);

        drop(rx);
        hub.prune(group);
        assert_eq!(hub.group_count(), 0);
    }
}
