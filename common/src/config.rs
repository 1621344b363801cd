use serde::{Deserialize, Serialize};

use crate::topics::DEFAULT_READING_TOPIC;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NetworkConfig {
    pub probe_addr: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            probe_addr: "1.1.1.1:53".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub client_id: String,
    pub topic: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "192.168.1.100".to_string(),
            port: 1883,
            user: String::new(),
            pass: String::new(),
            client_id: "weather-station".to_string(),
            topic: DEFAULT_READING_TOPIC.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WeatherConfig {
    pub api_host: String,
    pub api_key: String,
    pub language: String,
    /// Either `lat,lon` or `country/city`.
    pub location: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_host: "api.wunderground.com".to_string(),
            api_key: String::new(),
            language: "EN".to_string(),
            location: "52.5200,13.4050".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NtpConfig {
    pub server: String,
    pub port: u16,
    pub reply_timeout_ms: u64,
}

impl Default for NtpConfig {
    fn default() -> Self {
        Self {
            server: "pool.ntp.org".to_string(),
            port: crate::codec::NTP_PORT,
            reply_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CadenceConfig {
    pub fast_ms: u64,
    pub short_ms: u64,
    pub medium_ms: u64,
    pub long_ms: u64,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            fast_ms: 10_000,
            short_ms: 60_000,
            medium_ms: 300_000,
            long_ms: 3_600_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConnectivityConfig {
    pub connect_window_ms: u64,
    pub sleep_ms: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            connect_window_ms: 15_000,
            sleep_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PublishConfig {
    pub publish_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub max_reconnects: u8,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            publish_timeout_ms: 5_000,
            connect_timeout_ms: 5_000,
            max_reconnects: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_ms: u64,
    pub receive_timeout_ms: u64,
    pub max_response_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            receive_timeout_ms: 10_000,
            max_response_bytes: 65_536,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SensorConfig {
    pub environment: bool,
    pub air_quality: bool,
    /// Simulated chips time out on every n-th measurement. 0 never.
    pub timeout_every: u32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            environment: true,
            air_quality: true,
            timeout_every: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StationConfig {
    pub network: NetworkConfig,
    pub mqtt: MqttConfig,
    pub weather: WeatherConfig,
    pub ntp: NtpConfig,
    pub cadence: CadenceConfig,
    pub connectivity: ConnectivityConfig,
    pub publish: PublishConfig,
    pub http: HttpConfig,
    pub sensors: SensorConfig,
    pub tick_ms: u64,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            mqtt: MqttConfig::default(),
            weather: WeatherConfig::default(),
            ntp: NtpConfig::default(),
            cadence: CadenceConfig::default(),
            connectivity: ConnectivityConfig::default(),
            publish: PublishConfig::default(),
            http: HttpConfig::default(),
            sensors: SensorConfig::default(),
            tick_ms: 100,
        }
    }
}

impl StationConfig {
    pub fn sanitize(&mut self) {
        self.tick_ms = self.tick_ms.clamp(10, 1_000);

        if self.mqtt.port == 0 {
            self.mqtt.port = 1883;
        }
        if self.mqtt.topic.trim().is_empty() {
            self.mqtt.topic = DEFAULT_READING_TOPIC.to_string();
        }

        if self.ntp.port == 0 {
            self.ntp.port = crate::codec::NTP_PORT;
        }
        self.ntp.reply_timeout_ms = self.ntp.reply_timeout_ms.clamp(500, 30_000);

        self.cadence.sanitize();

        self.connectivity.connect_window_ms = self.connectivity.connect_window_ms.clamp(1_000, 120_000);
        self.connectivity.sleep_ms = self.connectivity.sleep_ms.clamp(1_000, 3_600_000);

        self.publish.publish_timeout_ms = self.publish.publish_timeout_ms.clamp(500, 60_000);
        self.publish.connect_timeout_ms = self.publish.connect_timeout_ms.clamp(500, 60_000);
        self.publish.max_reconnects = self.publish.max_reconnects.clamp(1, 16);

        self.http.connect_timeout_ms = self.http.connect_timeout_ms.clamp(500, 60_000);
        self.http.receive_timeout_ms = self.http.receive_timeout_ms.clamp(500, 120_000);
        self.http.max_response_bytes = self.http.max_response_bytes.clamp(4_096, 1_048_576);
    }
}

impl CadenceConfig {
    pub fn sanitize(&mut self) {
        self.fast_ms = self.fast_ms.clamp(1_000, 600_000);
        self.short_ms = self.short_ms.clamp(self.fast_ms, 3_600_000);
        self.medium_ms = self.medium_ms.clamp(self.short_ms, 86_400_000);
        self.long_ms = self.long_ms.clamp(self.medium_ms, 86_400_000);
    }
}
