use std::{
    sync::{Arc, PoisonError, RwLock},
    time::Instant,
};

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Weekday};

use crate::error::TimeError;

/// "Last `weekday` of `month` at `hour`" transition, `hour` given in the
/// local time in force before the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeChangeRule {
    pub abbrev: &'static str,
    pub month: u32,
    pub weekday: Weekday,
    pub hour: u32,
    pub offset_minutes: i32,
}

impl TimeChangeRule {
    fn utc_change(&self, year: i32, offset_before_minutes: i32) -> Option<i64> {
        let day = NaiveDate::from_weekday_of_month_opt(year, self.month, self.weekday, 5)
            .or_else(|| NaiveDate::from_weekday_of_month_opt(year, self.month, self.weekday, 4))?;
        let local = day.and_hms_opt(self.hour, 0, 0)?;
        Some(local.and_utc().timestamp() - i64::from(offset_before_minutes) * 60)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone {
    pub dst: TimeChangeRule,
    pub std: TimeChangeRule,
}

pub const CENTRAL_EUROPEAN: Timezone = Timezone {
    dst: TimeChangeRule {
        abbrev: "CEST",
        month: 3,
        weekday: Weekday::Sun,
        hour: 2,
        offset_minutes: 120,
    },
    std: TimeChangeRule {
        abbrev: "CET",
        month: 10,
        weekday: Weekday::Sun,
        hour: 2,
        offset_minutes: 60,
    },
};

impl Timezone {
    pub fn is_dst(&self, unix: i64) -> bool {
        let Some(year) = DateTime::from_timestamp(unix, 0).map(|utc| utc.year()) else {
            return false;
        };
        let (Some(dst_start), Some(std_start)) = (
            self.dst.utc_change(year, self.std.offset_minutes),
            self.std.utc_change(year, self.dst.offset_minutes),
        ) else {
            return false;
        };

        if dst_start < std_start {
            unix >= dst_start && unix < std_start
        } else {
            !(unix >= std_start && unix < dst_start)
        }
    }

    fn rule_at(&self, unix: i64) -> &TimeChangeRule {
        if self.is_dst(unix) {
            &self.dst
        } else {
            &self.std
        }
    }

    pub fn offset_minutes(&self, unix: i64) -> i32 {
        self.rule_at(unix).offset_minutes
    }

    pub fn abbreviation(&self, unix: i64) -> &'static str {
        self.rule_at(unix).abbrev
    }

    pub fn to_local(&self, unix: i64) -> Option<NaiveDateTime> {
        let local = unix + i64::from(self.offset_minutes(unix)) * 60;
        DateTime::from_timestamp(local, 0).map(|dt| dt.naive_utc())
    }
}

pub fn format_time(local: &NaiveDateTime) -> String {
    local.format("%H:%M:%S").to_string()
}

pub fn format_date(local: &NaiveDateTime) -> String {
    local.format("%a, %d %b %Y").to_string()
}

#[derive(Debug, Clone, Copy)]
struct SyncPoint {
    unix: u32,
    at: Instant,
}

#[derive(Debug, Clone)]
pub struct WallClock {
    synced: Arc<RwLock<Option<SyncPoint>>>,
    timezone: Timezone,
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new(CENTRAL_EUROPEAN)
    }
}

impl WallClock {
    pub fn new(timezone: Timezone) -> Self {
        Self {
            synced: Arc::new(RwLock::new(None)),
            timezone,
        }
    }

    pub fn timezone(&self) -> &Timezone {
        &self.timezone
    }

    pub fn set(&self, unix: u32) {
        self.set_at(unix, Instant::now());
    }

    pub fn set_at(&self, unix: u32, at: Instant) {
        let mut synced = self.synced.write().unwrap_or_else(PoisonError::into_inner);
        *synced = Some(SyncPoint { unix, at });
    }

    pub fn is_synchronized(&self) -> bool {
        self.synced
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn unix_time(&self) -> Result<u32, TimeError> {
        self.unix_time_at(Instant::now())
    }

    pub fn unix_time_at(&self, now: Instant) -> Result<u32, TimeError> {
        let synced = *self.synced.read().unwrap_or_else(PoisonError::into_inner);
        let point = synced.ok_or(TimeError::NotSynchronized)?;
        let elapsed = now.saturating_duration_since(point.at).as_secs();
        Ok(point
            .unix
            .wrapping_add(u32::try_from(elapsed).unwrap_or(u32::MAX)))
    }

    pub fn local_time(&self) -> Result<NaiveDateTime, TimeError> {
        let unix = i64::from(self.unix_time()?);
        self.timezone
            .to_local(unix)
            .ok_or(TimeError::NotSynchronized)
    }

    pub fn formatted_time(&self) -> Result<String, TimeError> {
        self.local_time().map(|local| format_time(&local))
    }

    pub fn formatted_date(&self) -> Result<String, TimeError> {
        self.local_time().map(|local| format_date(&local))
    }
}
