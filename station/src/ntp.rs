use std::{
    net::{IpAddr, SocketAddr},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use station_common::{
    codec::{decode_ntp_response, encode_ntp_request, ntp_to_unix, validate_ntp_reply},
    config::NtpConfig,
    TimeError, WallClock,
};
use tokio::{
    net::{lookup_host, UdpSocket},
    sync::{mpsc, oneshot},
    time::timeout,
};
use tracing::{debug, info, warn};

const RESOLVER_QUEUE_CAPACITY: usize = 16;

struct SlotGuard(Arc<AtomicBool>);

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct Resolution {
    server: String,
    addr: Result<SocketAddr, TimeError>,
    done: oneshot::Sender<bool>,
    slot: SlotGuard,
}

pub struct TimeSyncClient {
    config: NtpConfig,
    busy: Arc<AtomicBool>,
    queue: mpsc::Sender<Resolution>,
}

impl TimeSyncClient {
    pub fn spawn(config: NtpConfig, clock: WallClock) -> Self {
        let (queue, resolutions) = mpsc::channel(RESOLVER_QUEUE_CAPACITY);
        let reply_timeout = Duration::from_millis(config.reply_timeout_ms);
        tokio::spawn(run_worker(resolutions, clock, reply_timeout));

        Self {
            config,
            busy: Arc::new(AtomicBool::new(false)),
            queue,
        }
    }

    #[cfg(test)]
    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Starts an update. The receiver resolves to whether the wall clock was
    /// set; a second call while one is pending is rejected.
    pub fn update(&self) -> Result<oneshot::Receiver<bool>, TimeError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(TimeError::Busy);
        }
        let slot = SlotGuard(self.busy.clone());
        let (done, rx) = oneshot::channel();
        let server = self.config.server.clone();
        let port = self.config.port;

        // Literal addresses need no lookup and go straight to the worker.
        if let Ok(ip) = server.parse::<IpAddr>() {
            let resolution = Resolution {
                server,
                addr: Ok(SocketAddr::new(ip, port)),
                done,
                slot,
            };
            self.queue
                .try_send(resolution)
                .map_err(|err| TimeError::Send(err.to_string()))?;
            return Ok(rx);
        }

        let queue = self.queue.clone();
        tokio::spawn(async move {
            let addr = resolve(&server, port).await;
            let resolution = Resolution {
                server,
                addr,
                done,
                slot,
            };
            if queue.send(resolution).await.is_err() {
                warn!("time sync worker is gone");
            }
        });

        Ok(rx)
    }
}

async fn resolve(server: &str, port: u16) -> Result<SocketAddr, TimeError> {
    let mut addrs = lookup_host((server, port))
        .await
        .map_err(|err| TimeError::Resolve(format!("{server}: {err}")))?;
    addrs
        .next()
        .ok_or_else(|| TimeError::Resolve(server.to_string()))
}

async fn run_worker(
    mut resolutions: mpsc::Receiver<Resolution>,
    clock: WallClock,
    reply_timeout: Duration,
) {
    while let Some(resolution) = resolutions.recv().await {
        let Resolution {
            server,
            addr,
            done,
            slot,
        } = resolution;

        let outcome = match addr {
            Ok(addr) => {
                debug!(%server, %addr, "sending time request");
                exchange(addr, reply_timeout).await
            }
            Err(err) => Err(err),
        };

        let synced = match outcome {
            Ok(unix) => {
                clock.set(unix);
                info!(%server, unix, "time synchronized");
                true
            }
            Err(err) => {
                warn!(%server, "time sync failed: {err}");
                false
            }
        };

        drop(slot);
        let _ = done.send(synced);
    }
}

pub async fn exchange(addr: SocketAddr, reply_timeout: Duration) -> Result<u32, TimeError> {
    let bind: SocketAddr = if addr.is_ipv4() {
        ([0, 0, 0, 0], 0).into()
    } else {
        ([0_u16; 8], 0).into()
    };
    let send_error = |err: std::io::Error| TimeError::Send(err.to_string());

    let socket = UdpSocket::bind(bind).await.map_err(send_error)?;
    socket.connect(addr).await.map_err(send_error)?;
    socket
        .send(&encode_ntp_request())
        .await
        .map_err(send_error)?;

    // Room for one byte more than a packet so oversized replies are caught.
    let mut buf = [0_u8; 64];
    let len = timeout(reply_timeout, socket.recv(&mut buf))
        .await
        .map_err(|_| TimeError::Timeout(reply_timeout.as_millis() as u64))?
        .map_err(|err| TimeError::MalformedReply(err.to_string()))?;

    let packet = validate_ntp_reply(&buf[..len])?;
    Ok(ntp_to_unix(decode_ntp_response(&packet)))
}
