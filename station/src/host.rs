use std::{
    io::ErrorKind,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, OnceLock,
    },
    time::{Duration, Instant},
};

use anyhow::Context;
use station_common::{
    config::CadenceConfig, Cadence, CadenceSignals, Collaborators, Conditions,
    ConnectivityManager, Display, LinkEvents, NetworkServices, Orchestrator, PublishClient,
    SensorError, StationConfig, StationEvent, TimeError, WallClock, WeatherError,
};
use tokio::{sync::oneshot, task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::{
    broker::RumqttBroker,
    display::ConsoleDisplay,
    http::HttpClient,
    link::HostLink,
    ntp::TimeSyncClient,
    sensors::{SimulatedAirQuality, SimulatedEnvironment},
    store::FileStore,
    weather::WeatherClient,
};

const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(20);

struct HostServices {
    time: TimeSyncClient,
    weather: WeatherClient,
}

impl NetworkServices for HostServices {
    fn sync_time(&mut self) -> Result<oneshot::Receiver<bool>, TimeError> {
        self.time.update()
    }

    fn refresh_weather(
        &mut self,
    ) -> Result<oneshot::Receiver<Result<Conditions, WeatherError>>, WeatherError> {
        self.weather.refresh()
    }
}

#[derive(Clone)]
struct ConfigStore {
    data_dir: Arc<PathBuf>,
}

impl ConfigStore {
    fn new() -> Self {
        let data_dir = std::env::var("STATION_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.station"));

        Self {
            data_dir: Arc::new(data_dir),
        }
    }

    fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }

    fn store_path(&self) -> PathBuf {
        self.data_dir.join("store.json")
    }

    async fn load_config(&self) -> anyhow::Result<StationConfig> {
        match tokio::fs::read(self.config_path()).await {
            Ok(raw) => Ok(serde_json::from_slice::<StationConfig>(&raw)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(StationConfig::default()),
            Err(err) => Err(err.into()),
        }
    }
}

fn apply_overrides(config: &mut StationConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(host) = lookup("MQTT_HOST") {
        config.mqtt.host = host;
    }
    if let Some(port) = lookup("MQTT_PORT").and_then(|value| value.parse::<u16>().ok()) {
        config.mqtt.port = port;
    }
    if let Some(user) = lookup("MQTT_USER") {
        config.mqtt.user = user;
    }
    if let Some(pass) = lookup("MQTT_PASS") {
        config.mqtt.pass = pass;
    }
    if let Some(server) = lookup("NTP_SERVER") {
        config.ntp.server = server;
    }
    if let Some(key) = lookup("WEATHER_API_KEY") {
        config.weather.api_key = key;
    }
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let store = ConfigStore::new();
    let mut config = store.load_config().await.unwrap_or_else(|err| {
        warn!("failed to load station config: {err:#}");
        StationConfig::default()
    });
    apply_overrides(&mut config, |key| std::env::var(key).ok());
    config.sanitize();

    if config.weather.api_key.is_empty() {
        warn!("no weather api key configured, weather requests will be rejected upstream");
    }

    let clock = WallClock::default();

    let events = LinkEvents::new();
    let link = HostLink::new(config.network.probe_addr.clone(), events.clone());
    let connectivity = ConnectivityManager::new(link, config.connectivity.clone(), events);

    let publisher = PublishClient::new(RumqttBroker::new(&config.mqtt), config.publish.clone());

    let services = HostServices {
        time: TimeSyncClient::spawn(config.ntp.clone(), clock.clone()),
        weather: WeatherClient::new(HttpClient::new(config.http.clone()), &config.weather),
    };

    let file_store = FileStore::open(store.store_path()).unwrap_or_else(|err| {
        warn!("failed to open persistent store, starting empty: {err}");
        FileStore::empty(store.store_path())
    });

    let collaborators = Collaborators {
        environment: Box::new(SimulatedEnvironment::new(
            config.sensors.environment,
            config.sensors.timeout_every,
        )),
        air_quality: Box::new(SimulatedAirQuality::new(
            config.sensors.air_quality,
            config.sensors.timeout_every,
        )),
        store: Box::new(file_store),
    };

    let mut orchestrator = Orchestrator::new(
        connectivity,
        publisher,
        services,
        collaborators,
        clock.clone(),
        config.mqtt.topic.clone(),
    );

    for event in orchestrator.setup(monotonic_ms()) {
        log_event(&event);
    }

    spawn_cadence_timers(orchestrator.signals(), &config.cadence);

    let running = Arc::new(AtomicBool::new(true));
    let display = ConsoleDisplay::new(orchestrator.shared_state(), clock);
    spawn_display_loop(display, running.clone()).context("failed to start display loop")?;

    let manager = spawn_manager_loop(orchestrator, Duration::from_millis(config.tick_ms));

    info!(
        mqtt = %format!("{}:{}", config.mqtt.host, config.mqtt.port),
        topic = %config.mqtt.topic,
        ntp = %config.ntp.server,
        "weather station started"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("shutting down");
    running.store(false, Ordering::Release);
    manager.abort();
    Ok(())
}

fn spawn_cadence_timers(signals: CadenceSignals, config: &CadenceConfig) {
    for cadence in Cadence::ALL {
        let period = cadence.period(config);
        let signals = signals.clone();

        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                debug!(cadence = cadence.as_str(), "cadence fired");
                signals.signal(cadence).give();
            }
        });
    }
}

fn spawn_manager_loop<L, B, N>(
    mut orchestrator: Orchestrator<L, B, N>,
    tick: Duration,
) -> JoinHandle<()>
where
    L: station_common::Link + 'static,
    B: station_common::Broker + 'static,
    N: NetworkServices + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            for event in orchestrator.tick(monotonic_ms()) {
                log_event(&event);
            }
        }
    })
}

fn spawn_display_loop<D: Display + 'static>(
    mut display: D,
    running: Arc<AtomicBool>,
) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("display".to_string())
        .spawn(move || {
            while running.load(Ordering::Acquire) {
                let wait = display.update();
                std::thread::sleep(wait.max(MIN_FRAME_INTERVAL));
            }
        })
        .map(|_| ())
}

fn log_event(event: &StationEvent) {
    match event {
        StationEvent::Connectivity(state) => info!(state = state.as_str(), "connectivity changed"),
        StationEvent::SensorProbed { kind, enabled } => {
            info!(sensor = kind.as_str(), enabled, "sensor probed")
        }
        StationEvent::SensorFailed {
            kind,
            error: SensorError::NotFound,
        } => debug!(sensor = kind.as_str(), "sensor not present"),
        StationEvent::SensorFailed { kind, error } => {
            warn!(sensor = kind.as_str(), "sensor measurement failed: {error}")
        }
        StationEvent::BaselineRestored(baseline) => info!(
            eco2 = baseline.eco2,
            tvoc = baseline.tvoc,
            "air-quality baseline restored"
        ),
        StationEvent::BaselineSaved(baseline) => debug!(
            eco2 = baseline.eco2,
            tvoc = baseline.tvoc,
            "air-quality baseline saved"
        ),
        StationEvent::BaselineSaveFailed(err) => error!("failed to save air-quality baseline: {err}"),
        StationEvent::TimeSynced => debug!("time sync completed"),
        StationEvent::TimeSyncFailed(Some(err)) => warn!("time sync not started: {err}"),
        StationEvent::TimeSyncFailed(None) => warn!("time sync failed, retrying next tick"),
        StationEvent::WeatherUpdated => info!("weather report updated"),
        StationEvent::WeatherFailed(Some(err)) => warn!("weather refresh failed: {err}"),
        StationEvent::WeatherFailed(None) => warn!("weather refresh abandoned"),
        StationEvent::Published => info!("reading published"),
        StationEvent::PublishFailed(Some(err)) => warn!("reading publish not started: {err}"),
        StationEvent::PublishFailed(None) => warn!("reading publish failed, retrying next tick"),
    }
}

fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}
