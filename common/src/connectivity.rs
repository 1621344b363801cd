use crate::{config::ConnectivityConfig, schedule::TickSignal};

pub trait Link: Send {
    fn begin_connect(&mut self);
    fn is_up(&self) -> bool;
    fn rssi_dbm(&self) -> Option<i32>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Sleeping,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "DISCONNECTED",
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
            Self::Sleeping => "SLEEPING",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LinkEvents {
    lost: TickSignal,
    retry: TickSignal,
}

impl LinkEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link_lost(&self) {
        self.lost.give();
    }

    /// Unrecoverable link fault: reconnect now, skipping the sleep back-off.
    pub fn force_retry(&self) {
        self.retry.give();
    }
}

pub fn signal_quality(dbm: i32) -> u8 {
    if dbm <= -100 {
        0
    } else if dbm >= -50 {
        100
    } else {
        (2 * (dbm + 100)) as u8
    }
}

pub type ConnectedCallback = Box<dyn FnMut() + Send>;

pub struct ConnectivityManager<L> {
    link: L,
    config: ConnectivityConfig,
    events: LinkEvents,
    state: ConnectionState,
    started: bool,
    attempt_started_ms: u64,
    sleep_started_ms: u64,
    last_rssi: Option<i32>,
    callbacks: Vec<ConnectedCallback>,
}

impl<L: Link> ConnectivityManager<L> {
    pub fn new(link: L, config: ConnectivityConfig, events: LinkEvents) -> Self {
        Self {
            link,
            config,
            events,
            state: ConnectionState::Disconnected,
            started: false,
            attempt_started_ms: 0,
            sleep_started_ms: 0,
            last_rssi: None,
            callbacks: Vec::new(),
        }
    }

    pub fn events(&self) -> LinkEvents {
        self.events.clone()
    }

    /// Callbacks run once per `Connecting -> Connected` transition, in
    /// registration order.
    pub fn on_connected(&mut self, callback: impl FnMut() + Send + 'static) {
        self.callbacks.push(Box::new(callback));
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn last_rssi(&self) -> Option<i32> {
        self.last_rssi
    }

    /// 0 while not connected. A link without signal strength reports 100.
    pub fn link_quality(&self) -> u8 {
        if !self.is_connected() {
            return 0;
        }
        self.last_rssi.map(signal_quality).unwrap_or(100)
    }

    pub fn start(&mut self, now_ms: u64) {
        self.started = true;
        if self.state == ConnectionState::Disconnected {
            self.connect(now_ms);
        }
    }

    pub fn tick(&mut self, now_ms: u64) -> Option<ConnectionState> {
        let lost = self.events.lost.take();
        let retry = self.events.retry.take();

        if !self.started {
            return None;
        }

        let before = self.state;
        match self.state {
            ConnectionState::Disconnected => self.connect(now_ms),
            ConnectionState::Connecting => {
                if self.link.is_up() {
                    self.state = ConnectionState::Connected;
                    self.last_rssi = self.link.rssi_dbm();
                    for callback in self.callbacks.iter_mut() {
                        callback();
                    }
                } else if now_ms.saturating_sub(self.attempt_started_ms)
                    >= self.config.connect_window_ms
                {
                    self.state = ConnectionState::Sleeping;
                    self.sleep_started_ms = now_ms;
                }
            }
            ConnectionState::Connected => {
                if lost || !self.link.is_up() {
                    self.state = ConnectionState::Disconnected;
                    self.last_rssi = None;
                } else if retry {
                    self.connect(now_ms);
                } else {
                    self.last_rssi = self.link.rssi_dbm();
                }
            }
            ConnectionState::Sleeping => {
                if retry
                    || now_ms.saturating_sub(self.sleep_started_ms) >= self.config.sleep_ms
                {
                    self.connect(now_ms);
                }
            }
        }

        (self.state != before).then_some(self.state)
    }

    fn connect(&mut self, now_ms: u64) {
        self.state = ConnectionState::Connecting;
        self.attempt_started_ms = now_ms;
        self.last_rssi = None;
        self.link.begin_connect();
    }
}
