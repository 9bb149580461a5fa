use std::time::{Duration, Instant};

use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::validate_jwt;
use crate::error::ApiError;
use crate::event_hub::{Disconnect, EventHub, ServerEvent, Subscribe, Unsubscribe};
use crate::models::Notification;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "lowercase")]
enum ClientCommand {
    Join { room: String },
    Leave { room: String },
}

/// Whether `user_id` may listen on `room`. Per-user rooms are private.
pub fn can_join(user_id: Option<&str>, room: &str) -> bool {
    match room.strip_prefix("user-") {
        Some(owner) => user_id == Some(owner),
        None => !room.trim().is_empty(),
    }
}

pub struct WebSocketConnection {
    pub id: String,
    pub user_id: Option<String>,
    pub hb: Instant,
    pub hub: Addr<EventHub>,
}

impl WebSocketConnection {
    pub fn new(user_id: Option<String>, hub: Addr<EventHub>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            hb: Instant::now(),
            hub,
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                info!("WebSocket session {} missed its heartbeat, disconnecting", act.id);
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn join(&self, room: String, ctx: &mut ws::WebsocketContext<Self>) {
        if !can_join(self.user_id.as_deref(), &room) {
            warn!("Session {} may not join {}", self.id, room);
            send_frame(ctx, "error", json!({ "message": format!("Cannot join room {room}") }));
            return;
        }
        self.hub.do_send(Subscribe {
            session_id: self.id.clone(),
            room: room.clone(),
            addr: ctx.address().recipient(),
        });
        send_frame(ctx, "joined", json!({ "room": room }));
    }

    fn handle_text(&self, text: &str, ctx: &mut ws::WebsocketContext<Self>) {
        match serde_json::from_str::<ClientCommand>(text) {
            Ok(ClientCommand::Join { room }) => self.join(room, ctx),
            Ok(ClientCommand::Leave { room }) => {
                self.hub.do_send(Unsubscribe {
                    session_id: self.id.clone(),
                    room: room.clone(),
                });
                send_frame(ctx, "left", json!({ "room": room }));
            }
            Err(e) => {
                debug!("Unreadable frame from {}: {}", self.id, e);
                send_frame(ctx, "error", json!({ "message": "Unrecognised command" }));
            }
        }
    }
}

fn send_frame(
    ctx: &mut ws::WebsocketContext<WebSocketConnection>,
    event: &str,
    payload: serde_json::Value,
) {
    ctx.text(json!({ "event": event, "payload": payload }).to_string());
}

impl Actor for WebSocketConnection {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.hb(ctx);
        if let Some(user_id) = &self.user_id {
            self.hub.do_send(Subscribe {
                session_id: self.id.clone(),
                room: Notification::room_for(user_id),
                addr: ctx.address().recipient(),
            });
        }
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        self.hub.do_send(Disconnect {
            session_id: self.id.clone(),
        });
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WebSocketConnection {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.hb = Instant::now();
                self.handle_text(&text, ctx);
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                warn!("WebSocket error on {}: {}", self.id, e);
                ctx.stop();
            }
            _ => {}
        }
    }
}

impl Handler<ServerEvent> for WebSocketConnection {
    type Result = ();

    fn handle(&mut self, msg: ServerEvent, ctx: &mut ws::WebsocketContext<Self>) {
        match serde_json::to_string(&msg) {
            Ok(frame) => ctx.text(frame),
            Err(e) => warn!("Dropping {} for {}: {}", msg.event, self.id, e),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// `GET /ws?token=<jwt>`; anonymous sessions may only join entity rooms.
pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
    query: web::Query<WsQuery>,
) -> Result<HttpResponse, actix_web::Error> {
    let hub = data
        .events
        .hub()
        .cloned()
        .ok_or_else(|| ApiError::Internal("real-time channel is not running".to_string()))?;

    let user_id = match query.token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => Some(
            validate_jwt(token, &data.config.jwt_secret)
                .map_err(|_| ApiError::Unauthorized("Token is not valid".to_string()))?
                .sub,
        ),
        None => None,
    };

    ws::start(WebSocketConnection::new(user_id, hub), &req, stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_rooms_are_private() {
        assert!(can_join(Some("u1"), "user-u1"));
        assert!(!can_join(Some("u1"), "user-u2"));
        assert!(!can_join(None, "user-u1"));
        assert!(can_join(None, "leads"));
        assert!(!can_join(None, "  "));
    }

    #[test]
    fn commands_are_tagged_by_action() {
        let join: ClientCommand =
            serde_json::from_str(r#"{"action":"join","room":"leads"}"#).unwrap();
        assert_eq!(join, ClientCommand::Join { room: "leads".to_string() });
        assert!(serde_json::from_str::<ClientCommand>(r#"{"action":"shout","room":"x"}"#).is_err());
    }
}
