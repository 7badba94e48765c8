use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use jobber_social::notifications::SourceRef;
use jobber_social::{MessageStore, NotificationService, SendOutcome};
use jobber_types::events::{GatewayCommand, GatewayEvent};
use jobber_types::models::{MessageKind, NotificationKind};

use crate::dispatcher::Dispatcher;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Everything a live channel needs to act on commands.
#[derive(Clone)]
pub struct GatewayContext {
    pub dispatcher: Dispatcher,
    pub messages: MessageStore,
    pub notifications: NotificationService,
}

/// Handle a pre-authenticated WebSocket connection. The bearer token was
/// already resolved at the HTTP upgrade layer, so the channel goes straight
/// into its own delivery room and the event loop.
pub async fn handle_connection(
    socket: WebSocket,
    ctx: GatewayContext,
    user_id: Uuid,
    username: String,
) {
    let (mut sender, mut receiver) = socket.split();

    info!("{} ({}) connected to gateway", username, user_id);

    // Send Ready event
    let ready = GatewayEvent::Ready {
        user_id,
        username: username.clone(),
    };
    let Ok(text) = serde_json::to_string(&ready) else {
        return;
    };
    if sender.send(Message::Text(text.into())).await.is_err() {
        return;
    }

    // Subscribe the channel to its own room and to relay broadcasts
    let (conn_id, own_tx, mut room_rx) = ctx.dispatcher.register(user_id).await;
    let mut broadcast_rx = ctx.dispatcher.subscribe();

    // Shared flag for heartbeat
    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward room events + relay broadcasts -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = broadcast_rx.recv() => {
                    let event = match result {
                        Ok(event) => event,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Broadcast receiver lagged by {} events", n);
                            continue;
                        }
                        Err(_) => break,
                    };
                    if forward(&mut sender, &event).await.is_err() {
                        break;
                    }
                }
                result = room_rx.recv() => {
                    let event = match result {
                        Some(event) => event,
                        None => break,
                    };
                    if forward(&mut sender, &event).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from client
    let ctx_recv = ctx.clone();
    let username_recv = username.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => {
                        handle_command(&ctx_recv, user_id, &username_recv, &own_tx, cmd).await;
                    }
                    Err(e) => {
                        let preview: String = text.chars().take(200).collect();
                        warn!(
                            "{} ({}) bad command: {} -- raw: {}",
                            username_recv, user_id, e, preview
                        );
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    ctx.dispatcher.unregister(user_id, conn_id).await;
    info!("{} ({}) disconnected from gateway", username, user_id);
}

async fn forward(
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    event: &GatewayEvent,
) -> Result<(), ()> {
    let text = serde_json::to_string(event).map_err(|_| ())?;
    sender.send(Message::Text(text.into())).await.map_err(|_| ())
}

async fn handle_command(
    ctx: &GatewayContext,
    user_id: Uuid,
    username: &str,
    own_tx: &mpsc::UnboundedSender<GatewayEvent>,
    cmd: GatewayCommand,
) {
    match cmd {
        GatewayCommand::Join { room_id } => {
            // A channel may only sit in its own room; anything else would be
            // eavesdropping. The connect-time subscription already covers
            // the legitimate case, so a matching Join is a no-op.
            if room_id != user_id {
                warn!(
                    "{} ({}) refused join to foreign room {}",
                    username, user_id, room_id
                );
            }
        }

        GatewayCommand::SendMessage {
            receiver_id,
            kind,
            text,
            url,
            post_id,
        } => {
            send_message(ctx, user_id, username, own_tx, receiver_id, kind, text, url, post_id)
                .await;
        }

        GatewayCommand::NewBid { payload } => {
            ctx.dispatcher
                .broadcast(GatewayEvent::ReceiveNewBid { user_id, payload });
        }

        GatewayCommand::NewComment { payload } => {
            ctx.dispatcher
                .broadcast(GatewayEvent::ReceiveNewComment { user_id, payload });
        }

        GatewayCommand::NewReply { payload } => {
            ctx.dispatcher
                .broadcast(GatewayEvent::ReceiveNewReply { user_id, payload });
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn send_message(
    ctx: &GatewayContext,
    user_id: Uuid,
    username: &str,
    own_tx: &mpsc::UnboundedSender<GatewayEvent>,
    receiver_id: Uuid,
    kind: MessageKind,
    text: Option<String>,
    url: Option<String>,
    post_id: Option<Uuid>,
) {
    let outcome = match ctx
        .messages
        .send(user_id, receiver_id, kind, text, url, post_id)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            // Failure goes back to the originating channel only
            let _ = own_tx.send(GatewayEvent::MessageError { error: e.to_string() });
            return;
        }
    };

    let SendOutcome {
        message,
        hidden_for_receiver,
        receiver_connection_created,
    } = outcome;

    // Success echo to the sending channel; the durable row already exists
    let _ = own_tx.send(GatewayEvent::ReceiveMessage { message: message.clone() });

    if hidden_for_receiver {
        // Silent drop: the receiver's room must not learn of the message
        return;
    }

    ctx.dispatcher
        .deliver_to(receiver_id, GatewayEvent::ReceiveMessage { message })
        .await;

    if receiver_connection_created {
        // First contact: persist a connection notification for the receiver
        match ctx
            .notifications
            .notify(
                receiver_id,
                NotificationKind::Connection,
                SourceRef::default(),
                user_id,
                format!("{} wants to connect", username),
            )
            .await
        {
            Ok(out) if out.push => {
                ctx.dispatcher
                    .deliver_to(
                        receiver_id,
                        GatewayEvent::ReceiveNotification { notification: out.notification },
                    )
                    .await;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Failed to record connection notification: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobber_db::Database;
    use jobber_social::PairLocks;

    fn context() -> (GatewayContext, Arc<Database>) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let ctx = GatewayContext {
            dispatcher: Dispatcher::new(),
            messages: MessageStore::new(db.clone(), PairLocks::new()),
            notifications: NotificationService::new(db.clone()),
        };
        (ctx, db)
    }

    fn seed_user(db: &Database, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        db.create_user(&id.to_string(), name, true, true).unwrap();
        id
    }

    fn text_send(receiver_id: Uuid, body: &str) -> GatewayCommand {
        GatewayCommand::SendMessage {
            receiver_id,
            kind: MessageKind::Text,
            text: Some(body.into()),
            url: None,
            post_id: None,
        }
    }

    #[tokio::test]
    async fn join_refuses_foreign_rooms() {
        let (ctx, db) = context();
        let a = seed_user(&db, "ana");
        let b = seed_user(&db, "bo");

        let (_, a_tx, mut a_rx) = ctx.dispatcher.register(a).await;

        handle_command(&ctx, a, "ana", &a_tx, GatewayCommand::Join { room_id: b }).await;

        // ana's channel must never become reachable through bo's room
        ctx.dispatcher
            .deliver_to(b, GatewayEvent::NotificationsMarkedSeen)
            .await;
        assert!(a_rx.try_recv().is_err());

        // her own room still delivers; the connect-time subscription stands
        ctx.dispatcher
            .deliver_to(a, GatewayEvent::NotificationsMarkedSeen)
            .await;
        assert!(a_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn send_echoes_to_sender_and_reaches_receiver_room() {
        let (ctx, db) = context();
        let a = seed_user(&db, "ana");
        let b = seed_user(&db, "bo");

        let (_, a_tx, mut a_rx) = ctx.dispatcher.register(a).await;
        let (_, _, mut b_rx) = ctx.dispatcher.register(b).await;

        handle_command(&ctx, a, "ana", &a_tx, text_send(b, "hello")).await;

        assert!(matches!(a_rx.try_recv(), Ok(GatewayEvent::ReceiveMessage { .. })));
        assert!(matches!(b_rx.try_recv(), Ok(GatewayEvent::ReceiveMessage { .. })));
        // First contact also pushes the connection notification
        assert!(matches!(
            b_rx.try_recv(),
            Ok(GatewayEvent::ReceiveNotification { .. })
        ));
    }

    #[tokio::test]
    async fn blocked_send_never_reaches_the_receiver_room() {
        let (ctx, db) = context();
        let a = seed_user(&db, "ana");
        let b = seed_user(&db, "bo");
        db.block_user(&a.to_string(), &b.to_string()).unwrap();

        let (_, b_tx, mut b_rx) = ctx.dispatcher.register(b).await;
        let (_, _, mut a_rx) = ctx.dispatcher.register(a).await;

        handle_command(&ctx, b, "bo", &b_tx, text_send(a, "let me in")).await;

        // The sender still sees a normal success echo
        assert!(matches!(b_rx.try_recv(), Ok(GatewayEvent::ReceiveMessage { .. })));
        assert!(b_rx.try_recv().is_err());
        // The receiver's room learns nothing, not even a notification
        assert!(a_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_send_errors_only_the_originating_channel() {
        let (ctx, db) = context();
        let a = seed_user(&db, "ana");
        let b = seed_user(&db, "bo");

        let (_, a_tx, mut a_rx) = ctx.dispatcher.register(a).await;
        // The sender's other device and the receiver stay quiet
        let (_, _, mut a_rx2) = ctx.dispatcher.register(a).await;
        let (_, _, mut b_rx) = ctx.dispatcher.register(b).await;

        let invalid = GatewayCommand::SendMessage {
            receiver_id: b,
            kind: MessageKind::Text,
            text: None,
            url: None,
            post_id: None,
        };
        handle_command(&ctx, a, "ana", &a_tx, invalid).await;

        assert!(matches!(a_rx.try_recv(), Ok(GatewayEvent::MessageError { .. })));
        assert!(a_rx2.try_recv().is_err());
        assert!(b_rx.try_recv().is_err());
    }
}
