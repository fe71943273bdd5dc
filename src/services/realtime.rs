//! Realtime change hub: table-level change events pushed to sockets.
//!
//! ARCHITECTURE
//! ============
//! Every connected socket registers a bounded `mpsc` sender. Services call
//! [`RealtimeHub::publish`] after a successful write; the hub fans a
//! `<table>:<event>` frame out to each subscriber of that table. Clients
//! treat an event as a cue to refetch, so a full or closed channel simply
//! drops the event for that subscriber.
//!
//! Admins may subscribe to any known table. Guests may subscribe only to
//! `messages`, and only receive rows they sent or that were sent to them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::debug;
use uuid::Uuid;

use crate::frame::{Data, FRAME_ROW, Frame};

pub const CLIENT_CHANNEL_CAPACITY: usize = 256;

pub const TABLES: [&str; 7] = [
    "applications",
    "buy_requests",
    "sell_requests",
    "work_with_me_requests",
    "lead_notes",
    "messages",
    "social_links",
];

const GUEST_TABLES: [&str; 1] = ["messages"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    Insert,
    Update,
    Delete,
}

impl ChangeEvent {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    #[error("table is required")]
    MissingTable,
    #[error("unknown table: {0}")]
    UnknownTable(String),
    #[error("not allowed to subscribe to {0}")]
    Forbidden(String),
    #[error("client not connected")]
    NotConnected,
    #[error("unknown syscall: {0}")]
    UnknownSyscall(String),
}

impl crate::frame::ErrorCode for RealtimeError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingTable => "E_MISSING_TABLE",
            Self::UnknownTable(_) => "E_UNKNOWN_TABLE",
            Self::Forbidden(_) => "E_FORBIDDEN",
            Self::NotConnected => "E_NOT_CONNECTED",
            Self::UnknownSyscall(_) => "E_UNKNOWN_SYSCALL",
        }
    }
}

struct Subscriber {
    user_id: Uuid,
    is_admin: bool,
    tables: HashSet<String>,
    tx: mpsc::Sender<Frame>,
}

impl Subscriber {
    fn wants(&self, table: &str, owners: &[Uuid]) -> bool {
        self.tables.contains(table) && (self.is_admin || owners.contains(&self.user_id))
    }
}

/// Build the pushed frame for one change.
#[must_use]
pub fn change_frame(table: &str, event: ChangeEvent, row: serde_json::Value) -> Frame {
    let mut data = Data::new();
    data.insert(FRAME_ROW.into(), row);
    Frame::request(format!("{table}:{}", event.as_str()), data).with_channel(table)
}

/// Shared subscriber registry. Clone is cheap.
#[derive(Clone, Default)]
pub struct RealtimeHub {
    clients: Arc<RwLock<HashMap<Uuid, Subscriber>>>,
}

impl RealtimeHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn connect(&self, client_id: Uuid, user_id: Uuid, is_admin: bool, tx: mpsc::Sender<Frame>) {
        let subscriber = Subscriber { user_id, is_admin, tables: HashSet::new(), tx };
        self.clients.write().await.insert(client_id, subscriber);
    }

    pub async fn disconnect(&self, client_id: Uuid) {
        self.clients.write().await.remove(&client_id);
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// # Errors
    ///
    /// Unknown tables, guest access to admin tables, or an unregistered client.
    pub async fn subscribe(&self, client_id: Uuid, table: &str) -> Result<(), RealtimeError> {
        if !TABLES.contains(&table) {
            return Err(RealtimeError::UnknownTable(table.to_string()));
        }
        let mut clients = self.clients.write().await;
        let Some(client) = clients.get_mut(&client_id) else {
            return Err(RealtimeError::NotConnected);
        };
        if !client.is_admin && !GUEST_TABLES.contains(&table) {
            return Err(RealtimeError::Forbidden(table.to_string()));
        }
        client.tables.insert(table.to_string());
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`RealtimeError::NotConnected`] for an unregistered client.
    pub async fn unsubscribe(&self, client_id: Uuid, table: &str) -> Result<(), RealtimeError> {
        let mut clients = self.clients.write().await;
        let Some(client) = clients.get_mut(&client_id) else {
            return Err(RealtimeError::NotConnected);
        };
        client.tables.remove(table);
        Ok(())
    }

    /// Push a change to every interested subscriber. `owners` names the users
    /// a guest must be to see the row. Returns the number of deliveries.
    pub async fn publish(&self, table: &str, event: ChangeEvent, row: serde_json::Value, owners: &[Uuid]) -> usize {
        let frame = change_frame(table, event, row);
        let clients = self.clients.read().await;
        let mut delivered = 0;
        for (client_id, client) in clients.iter() {
            if !client.wants(table, owners) {
                continue;
            }
            match client.tx.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => debug!(%client_id, error = %e, "realtime: dropped change frame"),
            }
        }
        delivered
    }

    /// Serialize `row` and publish it; serialization failures are logged
    /// and dropped.
    pub async fn publish_row<T: serde::Serialize>(&self, table: &str, event: ChangeEvent, row: &T, owners: &[Uuid]) {
        match serde_json::to_value(row) {
            Ok(value) => {
                self.publish(table, event, value, owners).await;
            }
            Err(e) => tracing::warn!(table, error = %e, "realtime: row encode failed"),
        }
    }

    /// Handle one inbound request frame and return the reply.
    pub async fn handle_frame(&self, client_id: Uuid, req: &Frame) -> Frame {
        let table = req.data.get("table").and_then(serde_json::Value::as_str);
        let result = match (req.syscall.as_str(), table) {
            ("realtime:subscribe" | "realtime:unsubscribe", None) => Err(RealtimeError::MissingTable),
            ("realtime:subscribe", Some(table)) => self.subscribe(client_id, table).await,
            ("realtime:unsubscribe", Some(table)) => self.unsubscribe(client_id, table).await,
            (other, _) => Err(RealtimeError::UnknownSyscall(other.to_string())),
        };
        match (result, table) {
            (Ok(()), Some(table)) => req.clone().with_channel(table).done(),
            (Ok(()), None) => req.done(),
            (Err(e), _) => req.error_from(&e),
        }
    }
}

#[cfg(test)]
#[path = "realtime_test.rs"]
mod tests;
