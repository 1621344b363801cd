use tokio::sync::oneshot;

use crate::{config::PublishConfig, error::PublishError};

pub trait Broker: Send {
    fn is_connected(&self) -> bool;
    fn connect(&mut self);
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> bool;
    fn disconnect(&mut self);
}

struct PendingPublish {
    topic: String,
    payload: String,
    started_ms: u64,
    last_attempt_ms: Option<u64>,
    reconnects: u8,
    done: oneshot::Sender<bool>,
}

pub struct PublishClient<B> {
    broker: B,
    config: PublishConfig,
    pending: Option<PendingPublish>,
}

impl<B: Broker> PublishClient<B> {
    pub fn new(broker: B, config: PublishConfig) -> Self {
        Self {
            broker,
            config,
            pending: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn publish(
        &mut self,
        topic: &str,
        payload: &str,
        now_ms: u64,
    ) -> Result<oneshot::Receiver<bool>, PublishError> {
        if self.pending.is_some() {
            return Err(PublishError::Busy);
        }

        let (done, rx) = oneshot::channel();
        self.pending = Some(PendingPublish {
            topic: topic.to_string(),
            payload: payload.to_string(),
            started_ms: now_ms,
            last_attempt_ms: None,
            reconnects: 0,
            done,
        });
        Ok(rx)
    }

    /// Returns the outcome when the pending publish completed on this tick.
    pub fn tick(&mut self, now_ms: u64) -> Option<bool> {
        let pending = self.pending.as_mut()?;

        if self.broker.is_connected() {
            let published = self
                .broker
                .publish(&pending.topic, &pending.payload, true);
            self.broker.disconnect();
            return Some(self.finish(published));
        }

        if now_ms.saturating_sub(pending.started_ms) > self.config.publish_timeout_ms {
            return Some(self.finish(false));
        }

        let attempt_due = pending.last_attempt_ms.map_or(true, |last| {
            now_ms.saturating_sub(last) > self.config.connect_timeout_ms
        });
        if attempt_due {
            if pending.reconnects >= self.config.max_reconnects {
                return Some(self.finish(false));
            }
            pending.reconnects += 1;
            pending.last_attempt_ms = Some(now_ms);
            self.broker.connect();
        }

        None
    }

    fn finish(&mut self, published: bool) -> bool {
        if let Some(pending) = self.pending.take() {
            // The caller may have stopped listening.
            let _ = pending.done.send(published);
        }
        published
    }
}
