pub mod clock;
pub mod codec;
pub mod config;
pub mod connectivity;
pub mod display;
pub mod error;
pub mod orchestrator;
pub mod publish;
pub mod schedule;
pub mod sensors;
pub mod state;
pub mod store;
pub mod topics;
pub mod types;
pub mod uri;
pub mod weather;

pub use clock::{Timezone, WallClock, CENTRAL_EUROPEAN};
pub use config::StationConfig;
pub use connectivity::{signal_quality, ConnectionState, ConnectivityManager, Link, LinkEvents};
pub use display::{Display, Frame, FrameRotation};
pub use error::{ParseError, PublishError, SensorError, StoreError, TimeError, UriError, WeatherError};
pub use orchestrator::{Collaborators, NetworkServices, Orchestrator, SensorKind, StationEvent};
pub use publish::{Broker, PublishClient};
pub use schedule::{Cadence, CadenceSignals, SharedWorkFlags, TickSignal, WorkFlags};
pub use sensors::{AirQualitySensor, EnvironmentSensor};
pub use state::SharedState;
pub use store::{KeyValueStore, MemoryStore};
pub use topics::*;
pub use types::{AirQualityBaseline, AirQualityMeasurement, EnvironmentMeasurement, ReadingPayload};
pub use uri::{Scheme, Uri};
pub use weather::{Conditions, Forecast, Observation};
