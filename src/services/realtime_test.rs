use super::*;
use crate::frame::{FRAME_CODE, Status};
use serde_json::json;

async fn connected(hub: &RealtimeHub, is_admin: bool) -> (Uuid, Uuid, mpsc::Receiver<Frame>) {
    let client_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();
    let (tx, rx) = mpsc::channel(4);
    hub.connect(client_id, user_id, is_admin, tx).await;
    (client_id, user_id, rx)
}

fn subscribe_frame(table: &str) -> Frame {
    Frame::request("realtime:subscribe", Data::new()).with_data("table", table)
}

// =============================================================================
// subscribe
// =============================================================================

#[tokio::test]
async fn admin_may_subscribe_to_any_known_table() {
    let hub = RealtimeHub::new();
    let (client, _, _rx) = connected(&hub, true).await;
    for table in TABLES {
        hub.subscribe(client, table).await.unwrap();
    }
    assert!(matches!(hub.subscribe(client, "users").await, Err(RealtimeError::UnknownTable(_))));
}

#[tokio::test]
async fn guest_limited_to_messages() {
    let hub = RealtimeHub::new();
    let (client, _, _rx) = connected(&hub, false).await;
    hub.subscribe(client, "messages").await.unwrap();
    assert!(matches!(hub.subscribe(client, "applications").await, Err(RealtimeError::Forbidden(_))));
}

#[tokio::test]
async fn subscribe_requires_connection() {
    let hub = RealtimeHub::new();
    assert!(matches!(hub.subscribe(Uuid::new_v4(), "messages").await, Err(RealtimeError::NotConnected)));
}

// =============================================================================
// publish
// =============================================================================

#[tokio::test]
async fn publish_reaches_only_table_subscribers() {
    let hub = RealtimeHub::new();
    let (a, _, mut rx_a) = connected(&hub, true).await;
    let (_b, _, mut rx_b) = connected(&hub, true).await;
    hub.subscribe(a, "applications").await.unwrap();

    let delivered = hub
        .publish("applications", ChangeEvent::Update, json!({"id": "1", "status": "approved"}), &[])
        .await;
    assert_eq!(delivered, 1);

    let frame = rx_a.try_recv().unwrap();
    assert_eq!(frame.syscall, "applications:update");
    assert_eq!(frame.channel.as_deref(), Some("applications"));
    assert_eq!(frame.data[FRAME_ROW]["status"], "approved");
    assert!(rx_b.try_recv().is_err());
}

#[tokio::test]
async fn guest_sees_only_own_messages() {
    let hub = RealtimeHub::new();
    let (guest, guest_user, mut rx) = connected(&hub, false).await;
    hub.subscribe(guest, "messages").await.unwrap();

    hub.publish("messages", ChangeEvent::Insert, json!({"content": "other"}), &[Uuid::new_v4()])
        .await;
    assert!(rx.try_recv().is_err());

    hub.publish("messages", ChangeEvent::Insert, json!({"content": "mine"}), &[Uuid::new_v4(), guest_user])
        .await;
    assert_eq!(rx.try_recv().unwrap().data[FRAME_ROW]["content"], "mine");
}

#[tokio::test]
async fn full_channel_drops_without_blocking() {
    let hub = RealtimeHub::new();
    let (client, _, _rx) = connected(&hub, true).await;
    hub.subscribe(client, "lead_notes").await.unwrap();
    let mut delivered = 0;
    for _ in 0..10 {
        delivered += hub.publish("lead_notes", ChangeEvent::Insert, json!({}), &[]).await;
    }
    assert_eq!(delivered, 4);
}

#[tokio::test]
async fn disconnect_and_unsubscribe_stop_delivery() {
    let hub = RealtimeHub::new();
    let (a, _, mut rx) = connected(&hub, true).await;
    hub.subscribe(a, "messages").await.unwrap();
    hub.unsubscribe(a, "messages").await.unwrap();
    assert_eq!(hub.publish("messages", ChangeEvent::Insert, json!({}), &[]).await, 0);
    assert!(rx.try_recv().is_err());

    hub.disconnect(a).await;
    assert_eq!(hub.client_count().await, 0);
}

// =============================================================================
// handle_frame
// =============================================================================

#[tokio::test]
async fn handle_frame_replies_done_with_channel() {
    let hub = RealtimeHub::new();
    let (client, _, _rx) = connected(&hub, false).await;
    let req = subscribe_frame("messages");
    let reply = hub.handle_frame(client, &req).await;
    assert_eq!(reply.status, Status::Done);
    assert_eq!(reply.parent_id, Some(req.id));
    assert_eq!(reply.channel.as_deref(), Some("messages"));
}

#[tokio::test]
async fn handle_frame_reports_structured_errors() {
    let hub = RealtimeHub::new();
    let (client, _, _rx) = connected(&hub, false).await;

    let reply = hub.handle_frame(client, &subscribe_frame("applications")).await;
    assert_eq!(reply.status, Status::Error);
    assert_eq!(reply.data[FRAME_CODE], "E_FORBIDDEN");

    let reply = hub
        .handle_frame(client, &Frame::request("realtime:subscribe", Data::new()))
        .await;
    assert_eq!(reply.data[FRAME_CODE], "E_MISSING_TABLE");

    let reply = hub.handle_frame(client, &Frame::request("board:join", Data::new())).await;
    assert_eq!(reply.data[FRAME_CODE], "E_UNKNOWN_SYSCALL");
}
