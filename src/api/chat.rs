use actix_web::{web, HttpRequest, HttpResponse};
use actix_ws::{AggregatedMessage, Session};
use futures::StreamExt;
use tokio::sync::broadcast::error::RecvError;

use crate::middleware::AuthUser;
use crate::models::User;
use crate::services::chat_service::{ClientEvent, ServerEvent, DEFAULT_ROOM};
use crate::state::AppState;

const MAX_FRAME_BYTES: usize = 64 * 1024;

#[utoipa::path(
    get,
    path = "/api/chat",
    tag = "Chat",
    params(("token" = Option<String>, Query, description = "Session token, for clients that cannot set headers on upgrade")),
    responses(
        (status = 101, description = "Switching to the WebSocket chat protocol"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn chat_socket(
    req: HttpRequest,
    body: web::Payload,
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse, actix_web::Error> {
    let (response, session, stream) = actix_ws::handle(&req, body)?;
    let stream = stream
        .max_frame_size(MAX_FRAME_BYTES)
        .aggregate_continuations()
        .max_continuation_size(MAX_FRAME_BYTES);

    log::info!("💬 Chat connected: {} ({})", user.email, user.id);
    actix_rt::spawn(run_session(state, user.0, session, stream));

    Ok(response)
}

async fn send(session: &mut Session, event: &ServerEvent) -> bool {
    session.text(event.to_json()).await.is_ok()
}

/// Pumps one client: inbound frames to the hub, room broadcasts back out
async fn run_session(
    state: web::Data<AppState>,
    user: User,
    mut session: Session,
    mut stream: actix_ws::AggregatedMessageStream,
) {
    let _slot = state.chat.register_client();
    let mut room = state.chat.subscribe(DEFAULT_ROOM);

    if !send(&mut session, &ServerEvent::connected(&user)).await {
        return;
    }

    let close_reason = loop {
        tokio::select! {
            inbound = stream.next() => match inbound {
                Some(Ok(AggregatedMessage::Text(text))) => {
                    let replies = match ClientEvent::parse(&text) {
                        Ok(event) => state.chat.handle_event(&user, event),
                        Err(e) => vec![ServerEvent::error(e)],
                    };
                    let mut open = true;
                    for reply in &replies {
                        open = open && send(&mut session, reply).await;
                    }
                    if !open {
                        break None;
                    }
                }
                Some(Ok(AggregatedMessage::Ping(bytes))) => {
                    if session.pong(&bytes).await.is_err() {
                        break None;
                    }
                }
                Some(Ok(AggregatedMessage::Binary(_))) => {
                    if !send(&mut session, &ServerEvent::error("Binary frames are not supported.")).await {
                        break None;
                    }
                }
                Some(Ok(AggregatedMessage::Pong(_))) => {}
                Some(Ok(AggregatedMessage::Close(reason))) => break reason,
                Some(Err(e)) => {
                    log::warn!("❌ Chat protocol error for {}: {}", user.email, e);
                    break None;
                }
                None => break None,
            },
            outbound = room.recv() => match outbound {
                Ok(message) => {
                    if !send(&mut session, &ServerEvent::NewMessage(message)).await {
                        break None;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("⚠️  Chat client {} lagged, skipped {} message(s)", user.email, skipped);
                }
                Err(RecvError::Closed) => break None,
            },
        }
    };

    let _ = session.close(close_reason).await;
    log::info!("💬 Chat disconnected: {}", user.email);
}
