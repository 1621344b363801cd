use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU8, Ordering},
        Arc,
    },
    time::Duration,
};

use crate::config::CadenceConfig;

/// Coalescing flag: any number of `give` calls between two `take` calls is
/// observed once.
#[derive(Debug, Clone, Default)]
pub struct TickSignal(Arc<AtomicBool>);

impl TickSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn give(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Fast,
    Short,
    Medium,
    Long,
}

impl Cadence {
    pub const ALL: [Cadence; 4] = [Self::Fast, Self::Short, Self::Medium, Self::Long];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }

    pub fn period(self, config: &CadenceConfig) -> Duration {
        let ms = match self {
            Self::Fast => config.fast_ms,
            Self::Short => config.short_ms,
            Self::Medium => config.medium_ms,
            Self::Long => config.long_ms,
        };
        Duration::from_millis(ms)
    }

    pub fn work(self) -> WorkFlags {
        match self {
            Self::Fast => WorkFlags::UPDATE_ENVIRONMENT | WorkFlags::UPDATE_AIR_QUALITY,
            Self::Short => WorkFlags::PUSH_READING,
            Self::Medium => WorkFlags::UPDATE_WEATHER,
            Self::Long => WorkFlags::UPDATE_TIME | WorkFlags::SAVE_BASELINE,
        }
    }
}

#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkFlags(u8);

impl WorkFlags {
    pub const NONE: Self = Self(0);
    pub const UPDATE_TIME: Self = Self(1 << 0);
    pub const UPDATE_WEATHER: Self = Self(1 << 1);
    pub const UPDATE_ENVIRONMENT: Self = Self(1 << 2);
    pub const UPDATE_AIR_QUALITY: Self = Self(1 << 3);
    pub const PUSH_READING: Self = Self(1 << 4);
    pub const SAVE_BASELINE: Self = Self(1 << 5);

    pub const ON_CONNECTED: Self = Self(
        Self::UPDATE_TIME.0
            | Self::UPDATE_WEATHER.0
            | Self::UPDATE_ENVIRONMENT.0
            | Self::UPDATE_AIR_QUALITY.0
            | Self::PUSH_READING.0,
    );

    const NAMES: [(Self, &'static str); 6] = [
        (Self::UPDATE_TIME, "time"),
        (Self::UPDATE_WEATHER, "weather"),
        (Self::UPDATE_ENVIRONMENT, "environment"),
        (Self::UPDATE_AIR_QUALITY, "air-quality"),
        (Self::PUSH_READING, "push"),
        (Self::SAVE_BASELINE, "baseline"),
    ];

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for WorkFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for WorkFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "WorkFlags[{}]", names.join("|"))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SharedWorkFlags(Arc<AtomicU8>);

impl SharedWorkFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, flags: WorkFlags) {
        self.0.fetch_or(flags.0, Ordering::AcqRel);
    }

    pub fn take(&self, flag: WorkFlags) -> bool {
        let previous = self.0.fetch_and(!flag.0, Ordering::AcqRel);
        previous & flag.0 == flag.0
    }

    pub fn contains(&self, flag: WorkFlags) -> bool {
        self.snapshot().contains(flag)
    }

    pub fn snapshot(&self) -> WorkFlags {
        WorkFlags(self.0.load(Ordering::Acquire))
    }
}

#[derive(Debug, Clone, Default)]
pub struct CadenceSignals {
    fast: TickSignal,
    short: TickSignal,
    medium: TickSignal,
    long: TickSignal,
}

impl CadenceSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&self, cadence: Cadence) -> &TickSignal {
        match cadence {
            Cadence::Fast => &self.fast,
            Cadence::Short => &self.short,
            Cadence::Medium => &self.medium,
            Cadence::Long => &self.long,
        }
    }

    pub fn drain(&self) -> WorkFlags {
        let mut work = WorkFlags::NONE;
        for cadence in Cadence::ALL {
            if self.signal(cadence).take() {
                work.insert(cadence.work());
            }
        }
        work
    }
}
