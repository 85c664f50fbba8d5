use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::Serialize;

use super::MetricSample;

pub const DEFAULT_HORIZON_HOURS: u32 = 24;

/// Label format for one bucket; lexical order equals time order.
const HOUR_LABEL: &str = "%Y-%m-%d %H:00";

/// Which identities feed a trend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrendScope {
    All,
    Identity(String),
}

/// One hour on the trend chart. `count == 0` marks an empty hour.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendBucket {
    pub hour: String,
    pub hour_start: DateTime<Utc>,
    pub avg: f64,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyTrend {
    pub horizon_hours: u32,
    /// Oldest first, always `horizon_hours` long
    pub buckets: Vec<TrendBucket>,
}

impl HourlyTrend {
    /// Bucket `samples` into the `horizon_hours` UTC-aligned hours ending
    /// with the hour that contains `now`.
    pub fn build<'a, I>(samples: I, now: DateTime<Utc>, horizon_hours: u32) -> Self
    where
        I: IntoIterator<Item = &'a MetricSample>,
    {
        if horizon_hours == 0 {
            return Self {
                horizon_hours,
                buckets: Vec::new(),
            };
        }

        let current_hour = now
            .duration_trunc(Duration::hours(1))
            .unwrap_or(now);
        let first_hour = current_hour - Duration::hours(i64::from(horizon_hours) - 1);

        let mut sums = vec![0u128; horizon_hours as usize];
        let mut counts = vec![0u64; horizon_hours as usize];

        for sample in samples {
            if sample.observed_at < first_hour || sample.observed_at > now {
                continue;
            }
            let idx = (sample.observed_at - first_hour).num_hours() as usize;
            if idx < sums.len() {
                sums[idx] += u128::from(sample.latency_millis);
                counts[idx] += 1;
            }
        }

        let buckets = (0..horizon_hours as usize)
            .map(|i| {
                let hour_start = first_hour + Duration::hours(i as i64);
                let count = counts[i];
                TrendBucket {
                    hour: hour_start.format(HOUR_LABEL).to_string(),
                    hour_start,
                    avg: if count == 0 {
                        0.0
                    } else {
                        sums[i] as f64 / count as f64
                    },
                    count,
                }
            })
            .collect();

        Self {
            horizon_hours,
            buckets,
        }
    }

    /// Label → average view for chart consumers.
    pub fn averages(&self) -> Vec<(&str, f64)> {
        self.buckets.iter().map(|b| (b.hour.as_str(), b.avg)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::test_support::sample;
    use chrono::TimeZone;

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 28, h, m, 0).single().expect("valid")
    }

    fn sample_at(latency: u64, when: DateTime<Utc>) -> MetricSample {
        let mut s = sample("GET /devices", latency, 200, 0);
        s.observed_at = when;
        s
    }

    #[test]
    fn always_returns_horizon_buckets() {
        let trend = HourlyTrend::build(std::iter::empty(), utc(13, 45), 24);
        assert_eq!(trend.buckets.len(), 24);
        assert!(trend.buckets.iter().all(|b| b.count == 0 && b.avg == 0.0));
        assert_eq!(trend.buckets[23].hour, "2025-01-28 13:00");
        assert_eq!(trend.buckets[0].hour, "2025-01-27 14:00");
    }

    #[test]
    fn samples_land_in_their_hour() {
        let now = utc(13, 45);
        let samples = vec![
            sample_at(100, utc(13, 5)),
            sample_at(300, utc(13, 40)),
            sample_at(50, utc(11, 59)),
            // outside the 3-hour window
            sample_at(9_999, utc(10, 59)),
        ];
        let trend = HourlyTrend::build(&samples, now, 3);
        let avgs = trend.averages();
        assert_eq!(
            avgs,
            vec![
                ("2025-01-28 11:00", 50.0),
                ("2025-01-28 12:00", 0.0),
                ("2025-01-28 13:00", 200.0)
            ]
        );
        assert_eq!(trend.buckets[2].count, 2);
        assert_eq!(trend.buckets[1].count, 0);
    }

    #[test]
    fn labels_are_ordered() {
        let trend = HourlyTrend::build(std::iter::empty(), utc(2, 0), 6);
        let labels: Vec<_> = trend.buckets.iter().map(|b| b.hour.clone()).collect();
        let mut sorted = labels.clone();
        sorted.sort();
        assert_eq!(labels, sorted);
    }

    #[test]
    fn zero_horizon_is_empty() {
        assert!(HourlyTrend::build(std::iter::empty(), utc(2, 0), 0)
            .buckets
            .is_empty());
    }
}
