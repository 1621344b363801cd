use std::sync::{
    atomic::{AtomicU8, Ordering},
    Arc, PoisonError, RwLock,
};

use crate::{
    display::Frame,
    types::{AirQualityMeasurement, EnvironmentMeasurement},
    weather::Conditions,
};

#[derive(Debug, Default)]
struct Inner {
    environment: RwLock<Option<EnvironmentMeasurement>>,
    air_quality: RwLock<Option<AirQualityMeasurement>>,
    conditions: RwLock<Option<Conditions>>,
    link_quality: AtomicU8,
    frames: AtomicU8,
}

#[derive(Debug, Clone)]
pub struct SharedState(Arc<Inner>);

impl Default for SharedState {
    fn default() -> Self {
        let inner = Inner::default();
        inner.frames.store(Frame::BootScreen.bit(), Ordering::Release);
        Self(Arc::new(inner))
    }
}

fn read<T: Clone>(lock: &RwLock<Option<T>>) -> Option<T> {
    lock.read().unwrap_or_else(PoisonError::into_inner).clone()
}

fn write<T>(lock: &RwLock<Option<T>>, value: T) {
    *lock.write().unwrap_or_else(PoisonError::into_inner) = Some(value);
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_environment(&self, measurement: EnvironmentMeasurement) {
        write(&self.0.environment, measurement);
    }

    pub fn environment(&self) -> Option<EnvironmentMeasurement> {
        read(&self.0.environment)
    }

    pub fn set_air_quality(&self, measurement: AirQualityMeasurement) {
        write(&self.0.air_quality, measurement);
    }

    pub fn air_quality(&self) -> Option<AirQualityMeasurement> {
        read(&self.0.air_quality)
    }

    pub fn set_conditions(&self, conditions: Conditions) {
        write(&self.0.conditions, conditions);
    }

    pub fn conditions(&self) -> Option<Conditions> {
        read(&self.0.conditions)
    }

    pub fn set_link_quality(&self, quality: u8) {
        self.0.link_quality.store(quality, Ordering::Release);
    }

    pub fn link_quality(&self) -> u8 {
        self.0.link_quality.load(Ordering::Acquire)
    }

    pub fn enable_frame(&self, frame: Frame) {
        self.0.frames.fetch_or(frame.bit(), Ordering::AcqRel);
    }

    pub fn frames(&self) -> Vec<Frame> {
        let bits = self.0.frames.load(Ordering::Acquire);
        Frame::ALL
            .into_iter()
            .filter(|frame| bits & frame.bit() != 0)
            .collect()
    }
}
