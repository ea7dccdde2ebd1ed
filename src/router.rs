//! Routes decoded messages to handlers by `cmd`.

use openlive_client::Dispatch;
use openlive_protocol::message::cmd;
use openlive_protocol::ApplicationMessage;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;

type Handler = Box<dyn FnMut(ApplicationMessage) + Send>;

/// Maps `cmd` tags to handlers.
///
/// Messages with no registered handler go to the fallback, so nothing is
/// dropped silently.
pub struct EventRouter {
    routes: HashMap<String, Handler>,
    fallback: Handler,
}

impl EventRouter {
    pub fn new(fallback: impl FnMut(ApplicationMessage) + Send + 'static) -> Self {
        Self {
            routes: HashMap::new(),
            fallback: Box::new(fallback),
        }
    }

    /// Registers the handler for `cmd`, replacing any previous one.
    pub fn route(
        mut self,
        cmd: impl Into<String>,
        handler: impl FnMut(ApplicationMessage) + Send + 'static,
    ) -> Self {
        self.routes.insert(cmd.into(), Box::new(handler));
        self
    }

    pub fn is_routed(&self, cmd: &str) -> bool {
        self.routes.contains_key(cmd)
    }
}

impl Dispatch for EventRouter {
    fn dispatch(&mut self, message: ApplicationMessage) {
        match self.routes.get_mut(message.cmd.as_str()) {
            Some(handler) => handler(message),
            None => (self.fallback)(message),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Danmaku {
    uname: String,
    msg: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Gift {
    uname: String,
    gift_name: String,
    gift_num: u64,
    paid: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SuperChat {
    uname: String,
    message: String,
    rmb: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GuardUser {
    uname: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Guard {
    user_info: GuardUser,
    guard_level: u64,
    guard_num: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Like {
    uname: String,
    like_count: u64,
}

fn log_typed<T: DeserializeOwned>(
    message: &ApplicationMessage,
    log: impl FnOnce(T),
) {
    match message.data_as::<T>() {
        Ok(event) => log(event),
        Err(e) => tracing::warn!(cmd = %message.cmd, "Unexpected event payload: {}", e),
    }
}

/// Adds handlers that log the platform's well-known events.
pub fn with_logging_handlers(router: EventRouter) -> EventRouter {
    router
        .route(cmd::DANMAKU, |m: ApplicationMessage| {
            log_typed(&m, |d: Danmaku| {
                tracing::info!(user = %d.uname, "Danmaku: {}", d.msg)
            })
        })
        .route(cmd::SEND_GIFT, |m: ApplicationMessage| {
            log_typed(&m, |g: Gift| {
                tracing::info!(user = %g.uname, paid = g.paid, "Gift: {} x{}", g.gift_name, g.gift_num)
            })
        })
        .route(cmd::SUPER_CHAT, |m: ApplicationMessage| {
            log_typed(&m, |s: SuperChat| {
                tracing::info!(user = %s.uname, rmb = s.rmb, "Super chat: {}", s.message)
            })
        })
        .route(cmd::SUPER_CHAT_DEL, |m: ApplicationMessage| {
            tracing::info!("Super chat withdrawn: {}", m.data)
        })
        .route(cmd::GUARD, |m: ApplicationMessage| {
            log_typed(&m, |g: Guard| {
                tracing::info!(
                    user = %g.user_info.uname,
                    "Guard purchased: level {} x{}",
                    g.guard_level,
                    g.guard_num
                )
            })
        })
        .route(cmd::LIKE, |m: ApplicationMessage| {
            log_typed(&m, |l: Like| {
                tracing::info!(user = %l.uname, "Like x{}", l.like_count)
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_routes_by_cmd() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let unrouted = Arc::new(Mutex::new(Vec::new()));

        let danmaku = seen.clone();
        let gift = seen.clone();
        let fallback = unrouted.clone();

        let mut router = EventRouter::new(move |m: ApplicationMessage| {
            fallback.lock().unwrap().push(m.cmd)
        })
        .route("DM", move |m: ApplicationMessage| {
            danmaku.lock().unwrap().push(format!("dm:{}", m.data["msg"]))
        })
        .route("GIFT", move |_m: ApplicationMessage| {
            gift.lock().unwrap().push("gift".to_string())
        });

        router.dispatch(ApplicationMessage::new("DM", json!({"msg": "hi"})));
        router.dispatch(ApplicationMessage::new("OTHER", json!({})));
        router.dispatch(ApplicationMessage::new("GIFT", json!({})));

        assert_eq!(*seen.lock().unwrap(), vec!["dm:\"hi\"", "gift"]);
        assert_eq!(*unrouted.lock().unwrap(), vec!["OTHER"]);
    }

    #[test]
    fn test_route_replaces_handler() {
        let count = Arc::new(Mutex::new(0));
        let counter = count.clone();

        let mut router = EventRouter::new(|_m: ApplicationMessage| {})
            .route("X", |_m: ApplicationMessage| panic!("replaced handler called"))
            .route("X", move |_m: ApplicationMessage| *counter.lock().unwrap() += 1);

        router.dispatch(ApplicationMessage::new("X", json!(null)));
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn test_logging_handlers_registered() {
        let router = with_logging_handlers(EventRouter::new(|_m: ApplicationMessage| {}));
        for c in [
            cmd::DANMAKU,
            cmd::SEND_GIFT,
            cmd::SUPER_CHAT,
            cmd::SUPER_CHAT_DEL,
            cmd::GUARD,
            cmd::LIKE,
        ] {
            assert!(router.is_routed(c), "{} not routed", c);
        }
        assert!(!router.is_routed(cmd::INTERACTION_END));
    }

    #[test]
    fn test_logging_handlers_tolerate_payloads() {
        let mut router = with_logging_handlers(EventRouter::new(|_m: ApplicationMessage| {}));
        router.dispatch(ApplicationMessage::new(
            cmd::DANMAKU,
            json!({"uname": "viewer", "msg": "hello", "uid": 1}),
        ));
        router.dispatch(ApplicationMessage::new(
            cmd::GUARD,
            json!({"user_info": {"uname": "fan"}, "guard_level": 3, "guard_num": 1}),
        ));
        // Wrong shape is logged, not a panic.
        router.dispatch(ApplicationMessage::new(cmd::SEND_GIFT, json!({"gift_num": "many"})));
    }
}
