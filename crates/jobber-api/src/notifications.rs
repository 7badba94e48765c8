use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
};
use serde_json::{Value, json};

use jobber_social::SourceRef;
use jobber_types::api::{Claims, NotificationResponse, NotifyRequest, UnseenNotificationsResponse};
use jobber_types::events::GatewayEvent;
use jobber_types::models::Notification;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /notifications: the caller's notifications, newest first, enriched
/// with source content where it still exists.
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<NotificationResponse>>, ApiError> {
    let notifications = state.notifications.list(claims.sub).await?;
    Ok(Json(notifications))
}

/// POST /notifications: record a notification for another user. The caller
/// is the actor; a live push goes out only if the recipient's preference
/// gate allows the kind.
pub async fn create_notification(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<NotifyRequest>,
) -> Result<(StatusCode, Json<Notification>), ApiError> {
    let source = SourceRef {
        post_id: req.post_id,
        bid_id: req.bid_id,
        comment_id: req.comment_id,
        reply_id: req.reply_id,
    };

    let out = state
        .notifications
        .notify(req.recipient_id, req.kind, source, claims.sub, req.snippet)
        .await?;

    if out.push {
        state
            .dispatcher
            .deliver_to(
                req.recipient_id,
                GatewayEvent::ReceiveNotification {
                    notification: out.notification.clone(),
                },
            )
            .await;
    }

    Ok((StatusCode::CREATED, Json(out.notification)))
}

/// POST /notifications/seen: clear the caller's badge everywhere, including
/// their other connected devices.
pub async fn mark_all_seen(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>, ApiError> {
    let marked = state.notifications.mark_all_seen(claims.sub).await?;

    state
        .dispatcher
        .deliver_to(claims.sub, GatewayEvent::NotificationsMarkedSeen)
        .await;

    Ok(Json(json!({ "marked_seen": marked })))
}

/// GET /notifications/unseen-count: badge count, preference-gated.
pub async fn unseen_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UnseenNotificationsResponse>, ApiError> {
    let count = state.notifications.unseen_count(claims.sub).await?;
    Ok(Json(UnseenNotificationsResponse { count }))
}
