pub const DEFAULT_READING_TOPIC: &str = "Sensor/Temperature/1";

pub const STORE_KEY_AQ_ECO2: &str = "ws.aq.eco2";
pub const STORE_KEY_AQ_TVOC: &str = "ws.aq.tvoc";
