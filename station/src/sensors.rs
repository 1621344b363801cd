//! Simulated sensor chips for host builds.

use station_common::{
    AirQualityBaseline, AirQualityMeasurement, AirQualitySensor, EnvironmentMeasurement,
    EnvironmentSensor, SensorError,
};

const MEASURE_WAIT_MS: u64 = 3_000;

/// Counts measurements and fails every `every`-th one. 0 never fails.
#[derive(Debug, Clone, Copy)]
struct FaultPlan {
    every: u32,
    count: u32,
}

impl FaultPlan {
    fn new(every: u32) -> Self {
        Self { every, count: 0 }
    }

    fn times_out(&mut self) -> bool {
        if self.every == 0 {
            return false;
        }
        self.count += 1;
        if self.count < self.every {
            return false;
        }
        self.count = 0;
        true
    }
}

pub struct SimulatedEnvironment {
    present: bool,
    enabled: bool,
    tick: u64,
    faults: FaultPlan,
}

impl SimulatedEnvironment {
    pub fn new(present: bool, timeout_every: u32) -> Self {
        Self {
            present,
            enabled: false,
            tick: 0,
            faults: FaultPlan::new(timeout_every),
        }
    }
}

impl EnvironmentSensor for SimulatedEnvironment {
    fn setup(&mut self) -> bool {
        self.enabled = self.present;
        self.enabled
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn measure(&mut self) -> Result<EnvironmentMeasurement, SensorError> {
        if !self.enabled {
            return Err(SensorError::NotFound);
        }
        if self.faults.times_out() {
            self.enabled = false;
            return Err(SensorError::Timeout(MEASURE_WAIT_MS));
        }
        self.tick = self.tick.wrapping_add(1);

        Ok(EnvironmentMeasurement {
            temperature: 20.0 + (self.tick % 8) as f32 * 0.25,
            pressure: 1013.0 + (self.tick % 5) as f32 * 0.5,
            humidity: 42.0 + (self.tick % 6) as f32 * 0.5,
        })
    }
}

pub struct SimulatedAirQuality {
    present: bool,
    enabled: bool,
    tick: u64,
    humidity: Option<f32>,
    baseline: AirQualityBaseline,
    faults: FaultPlan,
}

impl SimulatedAirQuality {
    pub fn new(present: bool, timeout_every: u32) -> Self {
        Self {
            present,
            enabled: false,
            tick: 0,
            faults: FaultPlan::new(timeout_every),
            humidity: None,
            baseline: AirQualityBaseline {
                eco2: 0x8A00,
                tvoc: 0x8B00,
            },
        }
    }
}

impl AirQualitySensor for SimulatedAirQuality {
    fn setup(&mut self) -> bool {
        self.enabled = self.present;
        self.enabled
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn measure(&mut self) -> Result<AirQualityMeasurement, SensorError> {
        if !self.enabled {
            return Err(SensorError::NotFound);
        }
        if self.faults.times_out() {
            self.enabled = false;
            return Err(SensorError::Timeout(MEASURE_WAIT_MS));
        }
        self.tick = self.tick.wrapping_add(1);

        // Drier air reads slightly higher.
        let humidity_bias = match self.humidity {
            Some(humidity) if humidity < 40.0 => 10,
            _ => 0,
        };
        let drift = (self.tick % 10) as u16;

        Ok(AirQualityMeasurement {
            eco2: 400 + drift * 5 + humidity_bias,
            tvoc: drift + humidity_bias / 2,
        })
    }

    fn set_humidity(&mut self, relative_humidity: f32) {
        self.humidity = Some(relative_humidity);
    }

    fn baseline(&mut self) -> Option<AirQualityBaseline> {
        self.enabled.then_some(self.baseline)
    }

    fn set_baseline(&mut self, baseline: AirQualityBaseline) {
        self.baseline = baseline;
    }
}
