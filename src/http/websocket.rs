//! Real-time channel endpoint.
//!
//! Upgrades `/api/ws` and binds the socket to a [`Connection`]. Clients are not
//! expected to send anything; the server pushes `new_log` envelopes.

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{IntoResponse, Response},
};

use crate::broadcast::{BroadcastMessage, ChannelError, Connection};
use crate::capture::Filter;
use crate::http::server::AppState;

pub async fn ws_handler(
    State(state): State<AppState>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => {
            let err = ChannelError::Upgrade(rejection.body_text());
            tracing::warn!(error = %err, "Rejected live feed request");
            return rejection.into_response();
        }
    };

    upgrade
        .on_failed_upgrade(|e: axum::Error| {
            let err = ChannelError::Upgrade(e.to_string());
            tracing::warn!(error = %err, "Live feed upgrade failed");
        })
        .on_upgrade(move |socket| serve_observer(state, socket))
}

async fn serve_observer(state: AppState, socket: WebSocket) {
    let connection = Connection::new(state.hub.clone());
    let snapshot = state
        .config
        .broadcast
        .snapshot_on_connect
        .then(|| BroadcastMessage::ExchangeList(state.store.list(&Filter::default())));

    let outbound = connection.register(state.config.broadcast.outbound_capacity, snapshot);
    tracing::debug!(connection_id = %connection.id(), "Live feed connected");

    connection.serve(socket, outbound).await;
}
