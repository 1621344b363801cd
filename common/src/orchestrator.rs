use tokio::sync::oneshot::{self, error::TryRecvError};

use crate::{
    clock::WallClock,
    connectivity::{ConnectionState, ConnectivityManager, Link},
    display::Frame,
    error::{PublishError, SensorError, TimeError, WeatherError},
    publish::{Broker, PublishClient},
    schedule::{CadenceSignals, SharedWorkFlags, WorkFlags},
    sensors::{AirQualitySensor, EnvironmentSensor},
    state::SharedState,
    store::{self, KeyValueStore},
    types::{AirQualityBaseline, ReadingPayload},
    weather::Conditions,
};

/// Asynchronous network operations. Each returns a receiver that resolves
/// once, or fails synchronously when the operation cannot start.
pub trait NetworkServices: Send {
    fn sync_time(&mut self) -> Result<oneshot::Receiver<bool>, TimeError>;
    fn refresh_weather(
        &mut self,
    ) -> Result<oneshot::Receiver<Result<Conditions, WeatherError>>, WeatherError>;
}

pub struct Collaborators {
    pub environment: Box<dyn EnvironmentSensor>,
    pub air_quality: Box<dyn AirQualitySensor>,
    pub store: Box<dyn KeyValueStore>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    Environment,
    AirQuality,
}

impl SensorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Environment => "environment",
            Self::AirQuality => "air-quality",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StationEvent {
    Connectivity(ConnectionState),
    SensorProbed { kind: SensorKind, enabled: bool },
    SensorFailed { kind: SensorKind, error: SensorError },
    BaselineRestored(AirQualityBaseline),
    BaselineSaved(AirQualityBaseline),
    BaselineSaveFailed(String),
    TimeSynced,
    /// `None` when the exchange itself reported failure.
    TimeSyncFailed(Option<TimeError>),
    WeatherUpdated,
    WeatherFailed(Option<WeatherError>),
    Published,
    PublishFailed(Option<PublishError>),
}

pub struct Orchestrator<L, B, N> {
    connectivity: ConnectivityManager<L>,
    publisher: PublishClient<B>,
    services: N,
    sensors: Collaborators,
    flags: SharedWorkFlags,
    signals: CadenceSignals,
    state: SharedState,
    clock: WallClock,
    topic: String,

    pending_time: Option<oneshot::Receiver<bool>>,
    pending_weather: Option<oneshot::Receiver<Result<Conditions, WeatherError>>>,
    pending_push: Option<oneshot::Receiver<bool>>,
}

impl<L: Link, B: Broker, N: NetworkServices> Orchestrator<L, B, N> {
    pub fn new(
        mut connectivity: ConnectivityManager<L>,
        publisher: PublishClient<B>,
        services: N,
        sensors: Collaborators,
        clock: WallClock,
        topic: impl Into<String>,
    ) -> Self {
        let flags = SharedWorkFlags::new();
        let on_connected = flags.clone();
        connectivity.on_connected(move || on_connected.set(WorkFlags::ON_CONNECTED));

        Self {
            connectivity,
            publisher,
            services,
            sensors,
            flags,
            signals: CadenceSignals::new(),
            state: SharedState::new(),
            clock,
            topic: topic.into(),
            pending_time: None,
            pending_weather: None,
            pending_push: None,
        }
    }

    pub fn signals(&self) -> CadenceSignals {
        self.signals.clone()
    }

    pub fn shared_state(&self) -> SharedState {
        self.state.clone()
    }

    pub fn work_flags(&self) -> SharedWorkFlags {
        self.flags.clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connectivity.state()
    }

    pub fn setup(&mut self, now_ms: u64) -> Vec<StationEvent> {
        let mut events = Vec::new();

        let environment = self.sensors.environment.setup();
        events.push(StationEvent::SensorProbed {
            kind: SensorKind::Environment,
            enabled: environment,
        });

        let air_quality = self.sensors.air_quality.setup();
        events.push(StationEvent::SensorProbed {
            kind: SensorKind::AirQuality,
            enabled: air_quality,
        });

        if air_quality {
            if let Some(baseline) = store::load_baseline(self.sensors.store.as_ref()) {
                self.sensors.air_quality.set_baseline(baseline);
                events.push(StationEvent::BaselineRestored(baseline));
            }
        }

        self.connectivity.start(now_ms);
        events.push(StationEvent::Connectivity(self.connectivity.state()));
        events
    }

    pub fn tick(&mut self, now_ms: u64) -> Vec<StationEvent> {
        let mut events = Vec::new();

        if let Some(state) = self.connectivity.tick(now_ms) {
            events.push(StationEvent::Connectivity(state));
        }
        self.state.set_link_quality(self.connectivity.link_quality());

        self.flags.set(self.signals.drain());

        self.publisher.tick(now_ms);
        self.settle(&mut events);

        self.update_sensors(&mut events);
        if self.flags.take(WorkFlags::SAVE_BASELINE) {
            self.save_baseline(&mut events);
        }

        if !self.connectivity.is_connected() {
            return events;
        }

        self.update_time(&mut events);
        self.update_weather(&mut events);
        self.push_reading(now_ms, &mut events);

        events
    }

    fn settle(&mut self, events: &mut Vec<StationEvent>) {
        if let Some(rx) = self.pending_time.as_mut() {
            match rx.try_recv() {
                Err(TryRecvError::Empty) => {}
                Ok(true) => {
                    self.pending_time = None;
                    self.state.enable_frame(Frame::TimeAndDate);
                    events.push(StationEvent::TimeSynced);
                }
                Ok(false) | Err(TryRecvError::Closed) => {
                    self.pending_time = None;
                    self.flags.set(WorkFlags::UPDATE_TIME);
                    events.push(StationEvent::TimeSyncFailed(None));
                }
            }
        }

        if let Some(rx) = self.pending_weather.as_mut() {
            match rx.try_recv() {
                Err(TryRecvError::Empty) => {}
                Ok(Ok(conditions)) => {
                    self.pending_weather = None;
                    self.state.set_conditions(conditions);
                    self.state.enable_frame(Frame::WeatherReport);
                    events.push(StationEvent::WeatherUpdated);
                }
                Ok(Err(error)) => {
                    self.pending_weather = None;
                    self.flags.set(WorkFlags::UPDATE_WEATHER);
                    events.push(StationEvent::WeatherFailed(Some(error)));
                }
                Err(TryRecvError::Closed) => {
                    self.pending_weather = None;
                    self.flags.set(WorkFlags::UPDATE_WEATHER);
                    events.push(StationEvent::WeatherFailed(None));
                }
            }
        }

        if let Some(rx) = self.pending_push.as_mut() {
            match rx.try_recv() {
                Err(TryRecvError::Empty) => {}
                Ok(true) => {
                    self.pending_push = None;
                    events.push(StationEvent::Published);
                }
                Ok(false) | Err(TryRecvError::Closed) => {
                    self.pending_push = None;
                    self.flags.set(WorkFlags::PUSH_READING);
                    events.push(StationEvent::PublishFailed(None));
                }
            }
        }
    }

    fn update_sensors(&mut self, events: &mut Vec<StationEvent>) {
        if self.flags.take(WorkFlags::UPDATE_ENVIRONMENT) {
            let sensor = &mut self.sensors.environment;
            if sensor.is_enabled() || sensor.setup() {
                match sensor.measure() {
                    Ok(measurement) => {
                        self.state.set_environment(measurement);
                        self.state.enable_frame(Frame::IndoorSensors);
                        self.sensors
                            .air_quality
                            .set_humidity(measurement.humidity);
                    }
                    Err(error) => events.push(StationEvent::SensorFailed {
                        kind: SensorKind::Environment,
                        error,
                    }),
                }
            } else {
                events.push(StationEvent::SensorFailed {
                    kind: SensorKind::Environment,
                    error: SensorError::NotFound,
                });
            }
        }

        if self.flags.take(WorkFlags::UPDATE_AIR_QUALITY) {
            let sensor = &mut self.sensors.air_quality;
            if sensor.is_enabled() || sensor.setup() {
                match sensor.measure() {
                    Ok(measurement) => self.state.set_air_quality(measurement),
                    Err(error) => events.push(StationEvent::SensorFailed {
                        kind: SensorKind::AirQuality,
                        error,
                    }),
                }
            } else {
                events.push(StationEvent::SensorFailed {
                    kind: SensorKind::AirQuality,
                    error: SensorError::NotFound,
                });
            }
        }
    }

    fn save_baseline(&mut self, events: &mut Vec<StationEvent>) {
        if !self.sensors.air_quality.is_enabled() {
            return;
        }
        let Some(baseline) = self.sensors.air_quality.baseline() else {
            return;
        };

        match store::save_baseline(self.sensors.store.as_mut(), baseline) {
            Ok(()) => events.push(StationEvent::BaselineSaved(baseline)),
            Err(err) => events.push(StationEvent::BaselineSaveFailed(err.to_string())),
        }
    }

    fn update_time(&mut self, events: &mut Vec<StationEvent>) {
        if self.pending_time.is_some() || !self.flags.take(WorkFlags::UPDATE_TIME) {
            return;
        }

        match self.services.sync_time() {
            Ok(rx) => self.pending_time = Some(rx),
            Err(error) => {
                self.flags.set(WorkFlags::UPDATE_TIME);
                events.push(StationEvent::TimeSyncFailed(Some(error)));
            }
        }
    }

    fn update_weather(&mut self, events: &mut Vec<StationEvent>) {
        if self.pending_weather.is_some() || !self.flags.take(WorkFlags::UPDATE_WEATHER) {
            return;
        }

        match self.services.refresh_weather() {
            Ok(rx) => self.pending_weather = Some(rx),
            Err(error) => {
                self.flags.set(WorkFlags::UPDATE_WEATHER);
                events.push(StationEvent::WeatherFailed(Some(error)));
            }
        }
    }

    fn push_reading(&mut self, now_ms: u64, events: &mut Vec<StationEvent>) {
        if self.pending_push.is_some() || !self.flags.contains(WorkFlags::PUSH_READING) {
            return;
        }

        let environment = if self.sensors.environment.is_enabled() {
            self.state.environment()
        } else {
            None
        };
        let air_quality = if self.sensors.air_quality.is_enabled() {
            self.state.air_quality()
        } else {
            None
        };

        // Nothing to report yet, or no timestamp: keep the flag for a later tick.
        if environment.is_none() && air_quality.is_none() {
            return;
        }
        let Ok(time) = self.clock.unix_time() else {
            return;
        };

        self.flags.take(WorkFlags::PUSH_READING);
        let payload =
            ReadingPayload::new(time, environment.as_ref(), air_quality.as_ref()).to_json();

        match self.publisher.publish(&self.topic, &payload, now_ms) {
            Ok(rx) => self.pending_push = Some(rx),
            Err(error) => {
                self.flags.set(WorkFlags::PUSH_READING);
                events.push(StationEvent::PublishFailed(Some(error)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    };

    use super::*;
    use crate::{
        config::{ConnectivityConfig, PublishConfig},
        connectivity::LinkEvents,
        schedule::Cadence,
        store::MemoryStore,
        topics::{STORE_KEY_AQ_ECO2, STORE_KEY_AQ_TVOC},
        types::{AirQualityMeasurement, EnvironmentMeasurement},
    };
    use pretty_assertions::assert_eq;

    #[derive(Clone, Default)]
    struct FakeLink(Arc<AtomicBool>);

    impl Link for FakeLink {
        fn begin_connect(&mut self) {}

        fn is_up(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }

        fn rssi_dbm(&self) -> Option<i32> {
            Some(-60)
        }
    }

    #[derive(Default)]
    struct BrokerLog {
        connected: bool,
        published: Vec<String>,
    }

    #[derive(Clone, Default)]
    struct FakeBroker(Arc<Mutex<BrokerLog>>);

    impl Broker for FakeBroker {
        fn is_connected(&self) -> bool {
            self.0.lock().unwrap().connected
        }

        fn connect(&mut self) {
            self.0.lock().unwrap().connected = true;
        }

        fn publish(&mut self, _topic: &str, payload: &str, _retain: bool) -> bool {
            self.0.lock().unwrap().published.push(payload.to_string());
            true
        }

        fn disconnect(&mut self) {
            self.0.lock().unwrap().connected = false;
        }
    }

    #[derive(Default)]
    struct ServicesLog {
        time_calls: usize,
        weather_calls: usize,
        time_error: Option<TimeError>,
        time_replies: Vec<oneshot::Sender<bool>>,
        weather_replies: Vec<oneshot::Sender<Result<Conditions, WeatherError>>>,
    }

    #[derive(Clone, Default)]
    struct FakeServices(Arc<Mutex<ServicesLog>>);

    impl NetworkServices for FakeServices {
        fn sync_time(&mut self) -> Result<oneshot::Receiver<bool>, TimeError> {
            let mut log = self.0.lock().unwrap();
            log.time_calls += 1;
            if let Some(error) = log.time_error.clone() {
                return Err(error);
            }
            let (tx, rx) = oneshot::channel();
            log.time_replies.push(tx);
            Ok(rx)
        }

        fn refresh_weather(
            &mut self,
        ) -> Result<oneshot::Receiver<Result<Conditions, WeatherError>>, WeatherError> {
            let mut log = self.0.lock().unwrap();
            log.weather_calls += 1;
            let (tx, rx) = oneshot::channel();
            log.weather_replies.push(tx);
            Ok(rx)
        }
    }

    #[derive(Default)]
    struct SensorLog {
        present: bool,
        setups: usize,
        time_out_next: bool,
        measurements: usize,
        humidity: Option<f32>,
        baseline: Option<AirQualityBaseline>,
    }

    #[derive(Clone, Default)]
    struct FakeSensor {
        log: Arc<Mutex<SensorLog>>,
        enabled: bool,
    }

    impl FakeSensor {
        fn present() -> Self {
            let sensor = Self::default();
            sensor.log.lock().unwrap().present = true;
            sensor
        }

        fn measurements(&self) -> usize {
            self.log.lock().unwrap().measurements
        }
    }

    impl EnvironmentSensor for FakeSensor {
        fn setup(&mut self) -> bool {
            let mut log = self.log.lock().unwrap();
            log.setups += 1;
            self.enabled = log.present;
            self.enabled
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }

        fn measure(&mut self) -> Result<EnvironmentMeasurement, SensorError> {
            let mut log = self.log.lock().unwrap();
            if std::mem::take(&mut log.time_out_next) {
                self.enabled = false;
                return Err(SensorError::Timeout(3_000));
            }
            log.measurements += 1;
            Ok(EnvironmentMeasurement {
                temperature: 21.5,
                pressure: 1000.0,
                humidity: 40.0,
            })
        }
    }

    impl AirQualitySensor for FakeSensor {
        fn setup(&mut self) -> bool {
            self.enabled = self.log.lock().unwrap().present;
            self.enabled
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }

        fn measure(&mut self) -> Result<AirQualityMeasurement, SensorError> {
            self.log.lock().unwrap().measurements += 1;
            Ok(AirQualityMeasurement { eco2: 420, tvoc: 7 })
        }

        fn set_humidity(&mut self, relative_humidity: f32) {
            self.log.lock().unwrap().humidity = Some(relative_humidity);
        }

        fn baseline(&mut self) -> Option<AirQualityBaseline> {
            self.log.lock().unwrap().baseline
        }

        fn set_baseline(&mut self, baseline: AirQualityBaseline) {
            self.log.lock().unwrap().baseline = Some(baseline);
        }
    }

    struct Harness {
        orchestrator: Orchestrator<FakeLink, FakeBroker, FakeServices>,
        link: FakeLink,
        broker: FakeBroker,
        services: FakeServices,
        environment: FakeSensor,
        air_quality: FakeSensor,
        clock: WallClock,
    }

    fn harness(environment: FakeSensor, air_quality: FakeSensor, store: MemoryStore) -> Harness {
        let link = FakeLink::default();
        let broker = FakeBroker::default();
        let services = FakeServices::default();
        let clock = WallClock::default();

        let connectivity = ConnectivityManager::new(
            link.clone(),
            ConnectivityConfig::default(),
            LinkEvents::new(),
        );
        let publisher = PublishClient::new(broker.clone(), PublishConfig::default());
        let orchestrator = Orchestrator::new(
            connectivity,
            publisher,
            services.clone(),
            Collaborators {
                environment: Box::new(environment.clone()),
                air_quality: Box::new(air_quality.clone()),
                store: Box::new(store),
            },
            clock.clone(),
            "Sensor/Temperature/1",
        );

        Harness {
            orchestrator,
            link,
            broker,
            services,
            environment,
            air_quality,
            clock,
        }
    }

    fn default_harness() -> Harness {
        harness(FakeSensor::present(), FakeSensor::present(), MemoryStore::new())
    }

    fn connect(h: &mut Harness) -> Vec<StationEvent> {
        h.orchestrator.setup(0);
        h.link.0.store(true, Ordering::SeqCst);
        h.orchestrator.tick(100)
    }

    #[test]
    fn connecting_requests_all_work() {
        let mut h = default_harness();

        let events = connect(&mut h);

        assert!(events.contains(&StationEvent::Connectivity(ConnectionState::Connected)));
        assert_eq!(h.environment.measurements(), 1);
        assert_eq!(h.air_quality.measurements(), 1);
        assert_eq!(h.air_quality.log.lock().unwrap().humidity, Some(40.0));

        let services = h.services.0.lock().unwrap();
        assert_eq!(services.time_calls, 1);
        assert_eq!(services.weather_calls, 1);

        // Time is not synchronized yet, so the push waits.
        let flags = h.orchestrator.work_flags();
        assert!(flags.contains(WorkFlags::PUSH_READING));
        assert!(!flags.contains(WorkFlags::UPDATE_TIME));
        assert!(!flags.contains(WorkFlags::UPDATE_WEATHER));
        assert_eq!(h.orchestrator.shared_state().link_quality(), 80);
    }

    #[test]
    fn failed_time_sync_still_attempts_weather() {
        let mut h = default_harness();
        h.services.0.lock().unwrap().time_error = Some(TimeError::Resolve("pool.ntp.org".into()));

        let events = connect(&mut h);

        assert!(events.contains(&StationEvent::TimeSyncFailed(Some(TimeError::Resolve(
            "pool.ntp.org".into()
        )))));
        assert_eq!(h.services.0.lock().unwrap().weather_calls, 1);
        assert!(h.orchestrator.work_flags().contains(WorkFlags::UPDATE_TIME));

        // Retried on the next tick, not within the same one.
        h.orchestrator.tick(200);
        assert_eq!(h.services.0.lock().unwrap().time_calls, 2);
    }

    #[test]
    fn completed_failures_re_arm_their_flags() {
        let mut h = default_harness();
        connect(&mut h);

        {
            let mut services = h.services.0.lock().unwrap();
            let time = services.time_replies.pop().unwrap();
            time.send(false).unwrap();
            let weather = services.weather_replies.pop().unwrap();
            weather
                .send(Err(WeatherError::Status(500)))
                .unwrap();
            // Re-dispatch fails immediately so the flags stay visible.
            services.time_error = Some(TimeError::Busy);
        }

        let events = h.orchestrator.tick(200);

        assert!(events.contains(&StationEvent::TimeSyncFailed(None)));
        assert!(events.contains(&StationEvent::WeatherFailed(Some(WeatherError::Status(500)))));
        let services = h.services.0.lock().unwrap();
        assert_eq!(services.time_calls, 2);
        assert_eq!(services.weather_calls, 2);
    }

    #[test]
    fn successful_updates_fill_shared_state() {
        let mut h = default_harness();
        connect(&mut h);

        {
            let mut services = h.services.0.lock().unwrap();
            services.time_replies.pop().unwrap().send(true).unwrap();
            services
                .weather_replies
                .pop()
                .unwrap()
                .send(Ok(Conditions::default()))
                .unwrap();
        }

        let events = h.orchestrator.tick(200);

        assert!(events.contains(&StationEvent::TimeSynced));
        assert!(events.contains(&StationEvent::WeatherUpdated));
        let state = h.orchestrator.shared_state();
        assert_eq!(state.conditions(), Some(Conditions::default()));
        assert_eq!(
            state.frames(),
            vec![
                Frame::BootScreen,
                Frame::TimeAndDate,
                Frame::WeatherReport,
                Frame::IndoorSensors
            ]
        );
    }

    #[test]
    fn push_waits_for_time_then_publishes() {
        let mut h = default_harness();
        connect(&mut h);
        assert!(h.broker.0.lock().unwrap().published.is_empty());

        h.clock.set(1_768_478_400);
        h.orchestrator.tick(200);
        assert!(!h.orchestrator.work_flags().contains(WorkFlags::PUSH_READING));

        // Publisher connects on this tick and publishes on the next one.
        h.orchestrator.tick(300);
        let events = h.orchestrator.tick(400);

        assert!(events.contains(&StationEvent::Published));
        let published = h.broker.0.lock().unwrap().published.clone();
        assert_eq!(published.len(), 1);
        assert!(published[0].starts_with(r#"{"time":1768478400,"temperature":21.5"#));
        assert!(published[0].ends_with(r#""eco2":420,"tvoc":7}"#));
    }

    #[test]
    fn push_without_enabled_sensors_keeps_flag() {
        let mut h = harness(FakeSensor::default(), FakeSensor::default(), MemoryStore::new());
        h.clock.set(1_768_478_400);

        let events = connect(&mut h);

        assert!(events.contains(&StationEvent::SensorFailed {
            kind: SensorKind::Environment,
            error: SensorError::NotFound,
        }));
        h.orchestrator.tick(200);
        h.orchestrator.tick(300);

        assert!(h.orchestrator.work_flags().contains(WorkFlags::PUSH_READING));
        assert!(h.broker.0.lock().unwrap().published.is_empty());
    }

    #[test]
    fn sensors_run_while_offline_but_network_work_waits() {
        let mut h = default_harness();
        h.orchestrator.setup(0);

        h.orchestrator.signals().signal(Cadence::Fast).give();
        h.orchestrator.signals().signal(Cadence::Medium).give();
        h.orchestrator.tick(100);

        assert_eq!(h.environment.measurements(), 1);
        assert_eq!(h.services.0.lock().unwrap().weather_calls, 0);
        assert!(h.orchestrator.work_flags().contains(WorkFlags::UPDATE_WEATHER));
        assert_eq!(h.orchestrator.shared_state().link_quality(), 0);
    }

    #[test]
    fn sensor_is_re_probed_when_it_appears() {
        let environment = FakeSensor::default();
        let mut h = harness(environment.clone(), FakeSensor::present(), MemoryStore::new());
        h.orchestrator.setup(0);

        environment.log.lock().unwrap().present = true;
        h.orchestrator.signals().signal(Cadence::Fast).give();
        h.orchestrator.tick(100);

        assert_eq!(h.environment.measurements(), 1);
        assert!(h.orchestrator.shared_state().environment().is_some());
    }

    #[test]
    fn timed_out_sensor_is_re_probed_on_next_cadence() {
        let mut h = default_harness();
        h.orchestrator.setup(0);
        h.orchestrator.signals().signal(Cadence::Fast).give();
        h.orchestrator.tick(100);
        assert_eq!(h.environment.measurements(), 1);

        h.environment.log.lock().unwrap().time_out_next = true;
        h.orchestrator.signals().signal(Cadence::Fast).give();
        let events = h.orchestrator.tick(200);

        assert!(events.contains(&StationEvent::SensorFailed {
            kind: SensorKind::Environment,
            error: SensorError::Timeout(3_000),
        }));
        let setups = h.environment.log.lock().unwrap().setups;

        h.orchestrator.signals().signal(Cadence::Fast).give();
        let events = h.orchestrator.tick(300);

        assert!(events.is_empty());
        assert_eq!(h.environment.log.lock().unwrap().setups, setups + 1);
        assert_eq!(h.environment.measurements(), 2);
    }

    #[test]
    fn restores_and_saves_air_quality_baseline() {
        let mut entries = store::Entries::new();
        entries.insert(STORE_KEY_AQ_ECO2.to_string(), 35_000);
        entries.insert(STORE_KEY_AQ_TVOC.to_string(), 36_000);
        let mut h = harness(
            FakeSensor::present(),
            FakeSensor::present(),
            MemoryStore::with_entries(entries),
        );

        let restored = AirQualityBaseline {
            eco2: 35_000,
            tvoc: 36_000,
        };
        let events = h.orchestrator.setup(0);
        assert!(events.contains(&StationEvent::BaselineRestored(restored)));
        assert_eq!(h.air_quality.log.lock().unwrap().baseline, Some(restored));

        let drifted = AirQualityBaseline {
            eco2: 35_100,
            tvoc: 35_900,
        };
        h.air_quality.log.lock().unwrap().baseline = Some(drifted);
        h.orchestrator.signals().signal(Cadence::Long).give();
        let events = h.orchestrator.tick(100);

        assert!(events.contains(&StationEvent::BaselineSaved(drifted)));
    }
}
