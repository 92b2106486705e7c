//! LiveSyncHub (C5): a process-wide registry of push channels keyed by an
//! opaque client id. Publishing to one client never blocks publishing to
//! another — a send that fails (dead/slow channel) evicts that client and
//! fan-out continues for the rest.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use fretcore_domain::trace::TraceEvent;

/// Pre-serialized JSON strings, one message per send — keeps this module
/// free of any transport-level (axum) dependency so it can be tested
/// without spinning up a socket.
pub type ClientSink = mpsc::UnboundedSender<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Created,
    Updated,
    Deleted,
    Refresh,
}

impl ChangeAction {
    fn as_str(self) -> &'static str {
        match self {
            ChangeAction::Created => "created",
            ChangeAction::Updated => "updated",
            ChangeAction::Deleted => "deleted",
            ChangeAction::Refresh => "refresh",
        }
    }
}

struct Client {
    username: String,
    session_id: String,
    sink: ClientSink,
}

#[derive(Default)]
pub struct LiveSyncHub {
    clients: RwLock<HashMap<String, Client>>,
}

impl LiveSyncHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connected client, replies with the `welcome` envelope,
    /// and broadcasts `user_connected` to everyone else. Returns the
    /// assigned opaque client id.
    pub fn attach(&self, client_id: &str, username: &str, session_id: &str, sink: ClientSink) {
        {
            let mut clients = self.clients.write();
            clients.insert(
                client_id.to_string(),
                Client { username: username.to_string(), session_id: session_id.to_string(), sink },
            );
        }
        let connected_users = self.connected_usernames();
        self.send_to(
            client_id,
            json!({"type": "welcome", "client_id": client_id, "connected_users": connected_users}),
        );
        self.broadcast_except(
            client_id,
            json!({"type": "user_connected", "data": {"username": username}, "timestamp": Utc::now()}),
        );
    }

    /// Removes a client (close, error, or shutdown) and notifies the rest.
    pub fn detach(&self, client_id: &str) {
        let removed = self.clients.write().remove(client_id);
        if let Some(c) = removed {
            self.broadcast_except(
                client_id,
                json!({"type": "user_disconnected", "data": {"username": c.username}, "timestamp": Utc::now()}),
            );
        }
    }

    pub fn connected_usernames(&self) -> Vec<String> {
        self.clients.read().values().map(|c| c.username.clone()).collect()
    }

    /// Reply to an explicit `get_users` ping — bespoke shape, no `data` wrapper.
    pub fn reply_connected_users(&self, client_id: &str) {
        let users = self.connected_usernames();
        self.send_to(client_id, json!({"type": "connected_users", "users": users}));
    }

    /// Reply to a client `ping` (keep-alive).
    pub fn reply_pong(&self, client_id: &str, timestamp: Option<Value>) {
        self.send_to(client_id, json!({"type": "pong", "timestamp": timestamp}));
    }

    /// Broadcast to every client including the originator; clients suppress
    /// self-echo using `changed_by`.
    pub fn publish_data_changed(
        &self,
        entity: &str,
        action: ChangeAction,
        entity_id: Option<i64>,
        changed_by: &str,
    ) {
        let envelope = json!({
            "type": "data_changed",
            "data": {
                "entity": entity,
                "action": action.as_str(),
                "entity_id": entity_id,
                "changed_by": changed_by,
            },
            "timestamp": Utc::now(),
        });
        let recipients = self.broadcast_all(&envelope);
        TraceEvent::ChangeBroadcast {
            entity: entity.to_string(),
            action: action.as_str().to_string(),
            entity_id,
            recipients,
        }
        .emit();
    }

    /// Hints every client to invalidate and re-read (all, or one kind).
    pub fn publish_refresh_required(&self, entity: Option<&str>) {
        let envelope = json!({
            "type": "refresh_required",
            "data": {"entity": entity},
            "timestamp": Utc::now(),
        });
        self.broadcast_all(&envelope);
    }

    /// Relays a user-sourced message to every other connected client.
    pub fn publish_user_message(&self, from_client_id: &str, from_username: &str, body: Value) {
        let envelope = json!({
            "type": "user_message",
            "data": {"from": from_username, "body": body},
            "timestamp": Utc::now(),
        });
        self.broadcast_except(from_client_id, envelope);
    }

    /// Closes every push channel owned by the given sessions (force
    /// disconnect, §8 scenario 6). Closing the sender causes the owning
    /// attach task's reader/writer loop to observe the channel drop.
    pub fn evict_sessions(&self, session_ids: &[String]) {
        let mut clients = self.clients.write();
        let dead: Vec<String> = clients
            .iter()
            .filter(|(_, c)| session_ids.iter().any(|s| s == &c.session_id))
            .map(|(id, _)| id.clone())
            .collect();
        for id in dead {
            clients.remove(&id);
            TraceEvent::ClientEvicted { client_id: id, reason: "force_disconnect".into() }.emit();
        }
    }

    pub fn size(&self) -> usize {
        self.clients.read().len()
    }

    fn send_to(&self, client_id: &str, envelope: Value) {
        let text = envelope.to_string();
        let sink = { self.clients.read().get(client_id).map(|c| c.sink.clone()) };
        if let Some(sink) = sink {
            if sink.send(text).is_err() {
                self.evict(client_id, "send_failed");
            }
        }
    }

    /// Returns the number of clients the envelope was sent to.
    fn broadcast_all(&self, envelope: &Value) -> usize {
        let text = envelope.to_string();
        let targets: Vec<(String, ClientSink)> =
            self.clients.read().iter().map(|(id, c)| (id.clone(), c.sink.clone())).collect();
        let count = targets.len();
        for (id, sink) in targets {
            if sink.send(text.clone()).is_err() {
                self.evict(&id, "send_failed");
            }
        }
        count
    }

    fn broadcast_except(&self, except: &str, envelope: Value) {
        let text = envelope.to_string();
        let targets: Vec<(String, ClientSink)> = self
            .clients
            .read()
            .iter()
            .filter(|(id, _)| id.as_str() != except)
            .map(|(id, c)| (id.clone(), c.sink.clone()))
            .collect();
        for (id, sink) in targets {
            if sink.send(text.clone()).is_err() {
                self.evict(&id, "send_failed");
            }
        }
    }

    fn evict(&self, client_id: &str, reason: &str) {
        if self.clients.write().remove(client_id).is_some() {
            TraceEvent::ClientEvicted { client_id: client_id.to_string(), reason: reason.to_string() }.emit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (ClientSink, mpsc::UnboundedReceiver<String>) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn welcome_lists_already_connected_users() {
        let hub = LiveSyncHub::new();
        let (tx_a, mut rx_a) = channel();
        hub.attach("c1", "ALICE", "s1", tx_a);
        let _ = rx_a.try_recv().unwrap(); // welcome to c1, empty list

        let (tx_b, mut rx_b) = channel();
        hub.attach("c2", "BOB", "s2", tx_b);
        let welcome: Value = serde_json::from_str(&rx_b.try_recv().unwrap()).unwrap();
        assert_eq!(welcome["type"], "welcome");
        assert_eq!(welcome["connected_users"], json!(["ALICE"]));

        let presence: Value = serde_json::from_str(&rx_a.try_recv().unwrap()).unwrap();
        assert_eq!(presence["type"], "user_connected");
        assert_eq!(presence["data"]["username"], "BOB");
    }

    #[test]
    fn data_changed_broadcasts_to_originator_too() {
        let hub = LiveSyncHub::new();
        let (tx_a, mut rx_a) = channel();
        hub.attach("c1", "ALICE", "s1", tx_a);
        let _ = rx_a.try_recv().unwrap(); // welcome

        hub.publish_data_changed("missions", ChangeAction::Created, Some(7), "ALICE");
        let msg: Value = serde_json::from_str(&rx_a.try_recv().unwrap()).unwrap();
        assert_eq!(msg["type"], "data_changed");
        assert_eq!(msg["data"]["entity"], "missions");
        assert_eq!(msg["data"]["action"], "created");
        assert_eq!(msg["data"]["entity_id"], 7);
        assert_eq!(msg["data"]["changed_by"], "ALICE");
    }

    #[test]
    fn dead_client_is_evicted_and_does_not_block_others() {
        let hub = LiveSyncHub::new();
        let (tx_a, rx_a) = channel();
        hub.attach("c1", "ALICE", "s1", tx_a);
        drop(rx_a); // simulate a dead receiver

        let (tx_b, mut rx_b) = channel();
        hub.attach("c2", "BOB", "s2", tx_b);
        let _ = rx_b.try_recv().unwrap(); // welcome to c2

        hub.publish_data_changed("missions", ChangeAction::Updated, Some(1), "BOB");
        // c1's dead channel is evicted; c2 still receives its message.
        let msg: Value = serde_json::from_str(&rx_b.try_recv().unwrap()).unwrap();
        assert_eq!(msg["type"], "data_changed");
        assert_eq!(hub.size(), 1);
    }

    #[test]
    fn evict_sessions_removes_matching_clients_only() {
        let hub = LiveSyncHub::new();
        let (tx_a, _rx_a) = channel();
        hub.attach("c1", "ALICE", "s1", tx_a);
        let (tx_b, _rx_b) = channel();
        hub.attach("c2", "BOB", "s2", tx_b);

        hub.evict_sessions(&["s1".to_string()]);
        assert_eq!(hub.size(), 1);
        assert_eq!(hub.connected_usernames(), vec!["BOB".to_string()]);
    }

    #[test]
    fn detach_broadcasts_user_disconnected() {
        let hub = LiveSyncHub::new();
        let (tx_a, mut rx_a) = channel();
        hub.attach("c1", "ALICE", "s1", tx_a);
        let _ = rx_a.try_recv().unwrap();

        let (tx_b, mut rx_b) = channel();
        hub.attach("c2", "BOB", "s2", tx_b);
        let _ = rx_b.try_recv().unwrap(); // welcome
        let _ = rx_a.try_recv().unwrap(); // user_connected for BOB

        hub.detach("c2");
        let msg: Value = serde_json::from_str(&rx_a.try_recv().unwrap()).unwrap();
        assert_eq!(msg["type"], "user_disconnected");
        assert_eq!(msg["data"]["username"], "BOB");
    }
}
