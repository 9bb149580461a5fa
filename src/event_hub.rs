use std::collections::HashMap;

use actix::prelude::*;
use log::{debug, error, info};
use serde::Serialize;
use serde_json::Value;

/// A frame pushed to every subscriber of a room.
#[derive(Debug, Clone, PartialEq, Message, Serialize)]
#[rtype(result = "()")]
pub struct ServerEvent {
    pub event: String,
    pub payload: Value,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Subscribe {
    pub session_id: String,
    pub room: String,
    pub addr: Recipient<ServerEvent>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Unsubscribe {
    pub session_id: String,
    pub room: String,
}

/// Drops a session from every room it joined.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub session_id: String,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Publish {
    pub room: String,
    pub event: ServerEvent,
}

/// Room membership and fan-out for live updates.
#[derive(Default)]
pub struct EventHub {
    rooms: HashMap<String, HashMap<String, Recipient<ServerEvent>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Actor for EventHub {
    type Context = Context<Self>;
}

impl Handler<Subscribe> for EventHub {
    type Result = ();

    fn handle(&mut self, msg: Subscribe, _: &mut Context<Self>) {
        debug!("Session {} joined room {}", msg.session_id, msg.room);
        self.rooms
            .entry(msg.room)
            .or_default()
            .insert(msg.session_id, msg.addr);
    }
}

impl Handler<Unsubscribe> for EventHub {
    type Result = ();

    fn handle(&mut self, msg: Unsubscribe, _: &mut Context<Self>) {
        debug!("Session {} left room {}", msg.session_id, msg.room);
        if let Some(members) = self.rooms.get_mut(&msg.room) {
            members.remove(&msg.session_id);
            if members.is_empty() {
                self.rooms.remove(&msg.room);
            }
        }
    }
}

impl Handler<Disconnect> for EventHub {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, _: &mut Context<Self>) {
        info!("Session {} disconnected", msg.session_id);
        self.rooms.retain(|_, members| {
            members.remove(&msg.session_id);
            !members.is_empty()
        });
    }
}

impl Handler<Publish> for EventHub {
    type Result = ();

    fn handle(&mut self, msg: Publish, _: &mut Context<Self>) {
        let Some(members) = self.rooms.get(&msg.room) else {
            return;
        };
        debug!(
            "Broadcasting {} to {} session(s) in {}",
            msg.event.event,
            members.len(),
            msg.room
        );
        for addr in members.values() {
            addr.do_send(msg.event.clone());
        }
    }
}

/// Fire-and-forget handle handlers use to announce changes.
///
/// Publishing never fails the caller: without a hub the event is dropped.
#[derive(Clone, Default)]
pub struct EventPublisher {
    hub: Option<Addr<EventHub>>,
}

impl EventPublisher {
    pub fn new(hub: Addr<EventHub>) -> Self {
        Self { hub: Some(hub) }
    }

    pub fn disabled() -> Self {
        Self { hub: None }
    }

    pub fn hub(&self) -> Option<&Addr<EventHub>> {
        self.hub.as_ref()
    }

    pub fn emit<T: Serialize>(&self, room: &str, event: String, payload: &T) {
        let Some(hub) = &self.hub else {
            return;
        };
        match serde_json::to_value(payload) {
            Ok(payload) => hub.do_send(Publish {
                room: room.to_string(),
                event: ServerEvent { event, payload },
            }),
            Err(e) => error!("Dropping {} event for {}: {}", event, room, e),
        }
    }
}
