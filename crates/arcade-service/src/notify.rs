//! Best-effort event publishing.

use tracing::{debug, warn};

use arcade_core::traits::store::{EphemeralStore, StoreExt};
use arcade_entity::event::{LobbyEvent, user_topic};

/// Publish an event, logging and swallowing failures.
pub(crate) async fn publish(store: &dyn EphemeralStore, topic: &str, event: &LobbyEvent) {
    match store.publish_json(topic, event).await {
        Ok(receivers) => {
            debug!(topic, event = event.event_type(), receivers, "Published event");
        }
        Err(e) => {
            warn!(topic, event = event.event_type(), error = %e, "Failed to publish event");
        }
    }
}

/// Publish an event to the personal topic of every listed user.
pub(crate) async fn publish_to_users<'a, I>(store: &dyn EphemeralStore, users: I, event: &LobbyEvent)
where
    I: IntoIterator<Item = &'a String>,
{
    for user_id in users {
        publish(store, &user_topic(user_id), event).await;
    }
}
