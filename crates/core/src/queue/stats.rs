//! Daily queue statistics.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::ServiceType;

/// Aggregates for one service type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServiceStats {
    /// Tickets issued today.
    pub total: u32,
    pub served: u32,
    pub skipped: u32,
    /// Running mean of created → called, in minutes.
    pub avg_wait_minutes: f64,
}

/// Tickets issued during one hour of the local day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HourlyCount {
    pub hour: u32,
    pub count: u32,
}

/// Running aggregates for a single local day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueStats {
    /// Local date these statistics belong to (`YYYY-MM-DD`).
    pub date: NaiveDate,
    pub total_served: u32,
    pub total_skipped: u32,
    /// Running mean of created → called over served tickets, in minutes.
    pub average_wait_minutes: f64,
    /// Running mean of called → completed over served tickets, in minutes.
    pub average_service_minutes: f64,
    pub by_service: BTreeMap<ServiceType, ServiceStats>,
    /// Always 24 buckets, hour 0 through 23.
    pub hourly: Vec<HourlyCount>,
}

impl QueueStats {
    /// Zeroed statistics for `date`.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            total_served: 0,
            total_skipped: 0,
            average_wait_minutes: 0.0,
            average_service_minutes: 0.0,
            by_service: ServiceType::ALL
                .into_iter()
                .map(|service_type| (service_type, ServiceStats::default()))
                .collect(),
            hourly: (0..24).map(|hour| HourlyCount { hour, count: 0 }).collect(),
        }
    }

    pub fn is_for(&self, date: NaiveDate) -> bool {
        self.date == date
    }

    /// Breakdown for one service type.
    pub fn service(&self, service_type: ServiceType) -> ServiceStats {
        self.by_service
            .get(&service_type)
            .cloned()
            .unwrap_or_default()
    }

    fn service_mut(&mut self, service_type: ServiceType) -> &mut ServiceStats {
        self.by_service.entry(service_type).or_default()
    }

    /// Total tickets issued today across all services.
    pub fn total_issued(&self) -> u32 {
        self.by_service.values().map(|s| s.total).sum()
    }

    /// Count a newly issued ticket in its service total and hourly bucket.
    pub fn record_issued(&mut self, service_type: ServiceType, hour: u32) {
        self.service_mut(service_type).total += 1;
        match self.hourly.iter_mut().find(|bucket| bucket.hour == hour) {
            Some(bucket) => bucket.count += 1,
            None => {
                self.hourly.push(HourlyCount { hour, count: 1 });
                self.hourly.sort_by_key(|bucket| bucket.hour);
            }
        }
    }

    /// Fold a completed service into the totals and running means.
    pub fn record_completed(
        &mut self,
        service_type: ServiceType,
        wait_minutes: f64,
        service_minutes: f64,
    ) {
        let served = self.total_served;
        self.average_wait_minutes = running_mean(self.average_wait_minutes, served, wait_minutes);
        self.average_service_minutes =
            running_mean(self.average_service_minutes, served, service_minutes);
        self.total_served += 1;

        let service = self.service_mut(service_type);
        service.avg_wait_minutes = running_mean(service.avg_wait_minutes, service.served, wait_minutes);
        service.served += 1;
    }

    /// Count a skipped ticket. Averages are unaffected.
    pub fn record_skipped(&mut self, service_type: ServiceType) {
        self.total_skipped += 1;
        self.service_mut(service_type).skipped += 1;
    }
}

/// Incremental mean: fold `sample` into `average` over `count` prior samples.
pub fn running_mean(average: f64, count: u32, sample: f64) -> f64 {
    let count = f64::from(count);
    (average * count + sample) / (count + 1.0)
}

/// Minutes elapsed from `from` to `to` (fractional).
pub fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 60_000.0
}
