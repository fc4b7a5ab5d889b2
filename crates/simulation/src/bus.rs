//! In-process pub/sub bus.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rocon_production::{MessageHandler, Transport, TransportError};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

type SharedHandler = Arc<dyn Fn(Value) + Send + Sync>;

/// Delivers every publish synchronously, in order, to all subscribers of the
/// channel. Publishes with no subscriber are recorded and dropped.
#[derive(Default)]
pub struct InMemoryBus {
    subscribers: RwLock<HashMap<String, Vec<SharedHandler>>>,
    history: Mutex<Vec<(String, Value)>>,
}

impl InMemoryBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register `handler` for every future message on `channel`.
    pub fn listen(&self, channel: &str, handler: MessageHandler) {
        self.subscribers
            .write()
            .entry(channel.to_string())
            .or_default()
            .push(Arc::from(handler));
    }

    /// Record `payload` and hand it to the channel's subscribers.
    ///
    /// Handlers run on the caller's thread after the subscriber table is
    /// unlocked, so they may publish in turn.
    pub fn send(&self, channel: &str, payload: Value) {
        self.history
            .lock()
            .push((channel.to_string(), payload.clone()));

        let handlers = self
            .subscribers
            .read()
            .get(channel)
            .cloned()
            .unwrap_or_default();
        trace!(%channel, subscribers = handlers.len(), "Delivering message");

        for handler in handlers {
            handler(payload.clone());
        }
    }

    /// Every payload published on `channel` so far, oldest first.
    pub fn published_on(&self, channel: &str) -> Vec<Value> {
        self.history
            .lock()
            .iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    /// Number of messages published across all channels.
    pub fn message_count(&self) -> usize {
        self.history.lock().len()
    }
}

#[async_trait]
impl Transport for InMemoryBus {
    async fn publish(
        &self,
        channel: &str,
        _message_type: &str,
        payload: Value,
    ) -> Result<(), TransportError> {
        self.send(channel, payload);
        Ok(())
    }

    async fn subscribe(
        &self,
        channel: &str,
        _message_type: &str,
        handler: MessageHandler,
    ) -> Result<(), TransportError> {
        self.listen(channel, handler);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_delivers_to_every_subscriber() {
        let bus = InMemoryBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..2 {
            let hits = hits.clone();
            bus.listen(
                "/a",
                Box::new(move |_| {
                    hits.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }

        bus.send("/a", json!({"n": 1}));
        bus.send("/b", json!({"n": 2}));

        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(bus.published_on("/a"), vec![json!({"n": 1})]);
        assert_eq!(bus.message_count(), 2);
    }

    #[test]
    fn test_handler_may_publish() {
        let bus = InMemoryBus::new();
        let echo = bus.clone();
        bus.listen(
            "/ping",
            Box::new(move |payload| echo.send("/pong", payload)),
        );

        bus.send("/ping", json!("hello"));

        assert_eq!(bus.published_on("/pong"), vec![json!("hello")]);
    }
}
