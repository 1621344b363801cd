use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use station_common::{Link, LinkEvents};
use tokio::{net::UdpSocket, task::JoinHandle};
use tracing::{debug, warn};

const CONNECT_PROBE_PERIOD: Duration = Duration::from_secs(1);
const MONITOR_PERIOD: Duration = Duration::from_secs(5);

/// Host stand-in for the radio link: the link is "up" while a route to the
/// probe address exists. No packets are sent.
pub struct HostLink {
    probe_addr: String,
    events: LinkEvents,
    up: Arc<AtomicBool>,
    monitor: Option<JoinHandle<()>>,
}

impl HostLink {
    pub fn new(probe_addr: String, events: LinkEvents) -> Self {
        Self {
            probe_addr,
            events,
            up: Arc::new(AtomicBool::new(false)),
            monitor: None,
        }
    }
}

impl Link for HostLink {
    fn begin_connect(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.abort();
        }
        self.up.store(false, Ordering::Release);

        let probe_addr = self.probe_addr.clone();
        let up = self.up.clone();
        let events = self.events.clone();
        self.monitor = Some(tokio::spawn(async move {
            while !probe(&probe_addr).await {
                tokio::time::sleep(CONNECT_PROBE_PERIOD).await;
            }
            debug!(%probe_addr, "link is up");
            up.store(true, Ordering::Release);

            loop {
                tokio::time::sleep(MONITOR_PERIOD).await;
                if !probe(&probe_addr).await {
                    warn!(%probe_addr, "link lost");
                    up.store(false, Ordering::Release);
                    events.link_lost();
                    return;
                }
            }
        }));
    }

    fn is_up(&self) -> bool {
        self.up.load(Ordering::Acquire)
    }

    fn rssi_dbm(&self) -> Option<i32> {
        None
    }
}

impl Drop for HostLink {
    fn drop(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.abort();
        }
    }
}

async fn probe(addr: &str) -> bool {
    match UdpSocket::bind("0.0.0.0:0").await {
        Ok(socket) => socket.connect(addr).await.is_ok(),
        Err(_) => false,
    }
}
