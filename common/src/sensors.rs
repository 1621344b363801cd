use crate::{
    error::SensorError,
    types::{AirQualityBaseline, AirQualityMeasurement, EnvironmentMeasurement},
};

pub trait EnvironmentSensor: Send {
    fn setup(&mut self) -> bool;
    fn is_enabled(&self) -> bool;
    /// Blocks for at most the driver's bounded wait. A timeout disables the
    /// sensor until the next successful `setup`.
    fn measure(&mut self) -> Result<EnvironmentMeasurement, SensorError>;
}

pub trait AirQualitySensor: Send {
    fn setup(&mut self) -> bool;
    fn is_enabled(&self) -> bool;
    fn measure(&mut self) -> Result<AirQualityMeasurement, SensorError>;
    fn set_humidity(&mut self, relative_humidity: f32);
    fn baseline(&mut self) -> Option<AirQualityBaseline>;
    fn set_baseline(&mut self, baseline: AirQualityBaseline);
}
