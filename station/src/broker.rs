use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use rumqttc::{AsyncClient, Event, EventLoop, Incoming, MqttOptions, Outgoing, QoS};
use station_common::{config::MqttConfig, Broker};
use tracing::{debug, info, warn};

const REQUEST_CAPACITY: usize = 10;

/// Short-lived broker session: one connection per publish, closed again
/// right after the message is handed over.
pub struct RumqttBroker {
    options: MqttOptions,
    session: Option<Session>,
}

struct Session {
    client: AsyncClient,
    connected: Arc<AtomicBool>,
}

impl RumqttBroker {
    pub fn new(config: &MqttConfig) -> Self {
        let mut options = MqttOptions::new(config.client_id.clone(), config.host.clone(), config.port);
        options.set_keep_alive(Duration::from_secs(15));
        if !config.user.is_empty() {
            options.set_credentials(config.user.clone(), config.pass.clone());
        }

        Self {
            options,
            session: None,
        }
    }
}

impl Broker for RumqttBroker {
    fn is_connected(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.connected.load(Ordering::Acquire))
    }

    fn connect(&mut self) {
        self.disconnect();

        let (client, eventloop) = AsyncClient::new(self.options.clone(), REQUEST_CAPACITY);
        let connected = Arc::new(AtomicBool::new(false));
        tokio::spawn(drive_session(eventloop, connected.clone()));
        debug!(host = %self.options.broker_address().0, "connecting to broker");

        self.session = Some(Session { client, connected });
    }

    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> bool {
        let Some(session) = self.session.as_ref() else {
            return false;
        };

        match session
            .client
            .try_publish(topic, QoS::AtMostOnce, retain, payload.as_bytes().to_vec())
        {
            Ok(()) => true,
            Err(err) => {
                warn!("mqtt publish failed: {err}");
                false
            }
        }
    }

    fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            session.connected.store(false, Ordering::Release);
            if let Err(err) = session.client.try_disconnect() {
                debug!("mqtt disconnect request dropped: {err}");
            }
        }
    }
}

/// Polls one session until it is closed or fails. Reconnecting is left to
/// the publish client.
async fn drive_session(mut eventloop: EventLoop, connected: Arc<AtomicBool>) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                info!("mqtt connected");
                connected.store(true, Ordering::Release);
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("mqtt session closed");
                break;
            }
            Ok(_) => {}
            Err(err) => {
                warn!("mqtt poll error: {err}");
                break;
            }
        }
    }
    connected.store(false, Ordering::Release);
}
