use axum::{Extension, Json, extract::State};

use jobber_types::api::{Claims, ConnectionResponse};

use crate::error::ApiError;
use crate::state::AppState;

/// GET /connections: the caller's contact list, most recent activity first.
pub async fn list_connections(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ConnectionResponse>>, ApiError> {
    let connections = state.connections.list(claims.sub).await?;
    Ok(Json(connections))
}
