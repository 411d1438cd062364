use std::collections::BTreeMap;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::error::{Error, Result};

pub const DAILY_RETENTION_DAYS: i64 = 90;
pub const WEEKLY_RETENTION_WEEKS: i64 = 12;

/// A single acknowledged break.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RestEvent {
    duration_minutes: u32,
}

impl RestEvent {
    pub fn new(duration_minutes: u32) -> Result<Self> {
        if duration_minutes == 0 {
            return Err(Error::invalid("rest duration must be a positive number of minutes"));
        }
        Ok(Self { duration_minutes })
    }

    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestRecord {
    pub time: DateTime<Utc>,
    pub duration: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyBucket {
    pub count: u64,
    pub minutes: u64,
    #[serde(default)]
    pub records: Vec<RestRecord>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyBucket {
    pub count: u64,
    pub minutes: u64,
}

/// Persisted aggregate root. Totals are lifetime counters; the daily and
/// weekly maps are rolling windows that shrink on every recording.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsStore {
    pub total_rest_count: u64,
    pub total_rest_minutes: u64,
    #[serde(default)]
    pub daily_records: BTreeMap<String, DailyBucket>,
    #[serde(default)]
    pub weekly_records: BTreeMap<String, WeeklyBucket>,
    pub first_use_date: DateTime<Utc>,
}

impl StatisticsStore {
    /// Zero state. Used on first run and as the result of a reset.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            total_rest_count: 0,
            total_rest_minutes: 0,
            daily_records: BTreeMap::new(),
            weekly_records: BTreeMap::new(),
            first_use_date: now,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalSummary {
    pub count: u64,
    pub minutes: u64,
    pub hours: u64,
    pub use_days: i64,
}

impl TotalSummary {
    /// Minutes left over after whole hours, for "N h M min" displays.
    pub fn remainder_minutes(&self) -> u64 {
        self.minutes % 60
    }

    pub fn average_per_day(&self) -> f64 {
        self.count as f64 / self.use_days.max(1) as f64
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DaySummary {
    pub date: String,
    pub count: u64,
    pub minutes: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: TotalSummary,
    pub today: DailyBucket,
    pub this_week: WeeklyBucket,
    pub last7_days: Vec<DaySummary>,
}

/// Folds rest events into a [`StatisticsStore`].
///
/// Date and week keys are computed in a fixed UTC offset chosen at
/// construction; UTC unless configured otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatsAggregator {
    offset: FixedOffset,
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::utc()
    }
}

impl StatsAggregator {
    pub fn utc() -> Self {
        Self::with_offset(Utc.fix())
    }

    pub fn with_offset(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn date_key(&self, at: DateTime<Utc>) -> String {
        calendar::date_key(self.local_date(at))
    }

    pub fn week_key(&self, at: DateTime<Utc>) -> String {
        calendar::week_key(self.local_date(at))
    }

    pub fn record_event(
        &self,
        store: &mut StatisticsStore,
        event: &RestEvent,
        now: DateTime<Utc>,
    ) {
        let minutes = u64::from(event.duration_minutes());
        let date_key = self.date_key(now);
        let week_key = self.week_key(now);

        store.total_rest_count = store.total_rest_count.saturating_add(1);
        store.total_rest_minutes = store.total_rest_minutes.saturating_add(minutes);

        let daily = store.daily_records.entry(date_key).or_default();
        daily.count = daily.count.saturating_add(1);
        daily.minutes = daily.minutes.saturating_add(minutes);
        daily.records.push(RestRecord {
            time: now,
            duration: event.duration_minutes(),
        });

        let weekly = store.weekly_records.entry(week_key).or_default();
        weekly.count = weekly.count.saturating_add(1);
        weekly.minutes = weekly.minutes.saturating_add(minutes);

        self.prune(store, now);
    }

    /// Drops buckets that fell out of the retention windows. Keys that do
    /// not parse are dropped as well.
    pub fn prune(&self, store: &mut StatisticsStore, now: DateTime<Utc>) {
        let daily_cutoff = self.local_date(now - Duration::days(DAILY_RETENTION_DAYS));
        let before = store.daily_records.len();
        store.daily_records.retain(|key, _| {
            calendar::parse_date_key(key).is_ok_and(|date| date > daily_cutoff)
        });

        let weekly_cutoff = self.local_date(now - Duration::days(WEEKLY_RETENTION_WEEKS * 7));
        let weekly_before = store.weekly_records.len();
        store.weekly_records.retain(|key, _| {
            calendar::week_start_of_key(key).is_ok_and(|start| start > weekly_cutoff)
        });

        let dropped_daily = before - store.daily_records.len();
        let dropped_weekly = weekly_before - store.weekly_records.len();
        if dropped_daily > 0 || dropped_weekly > 0 {
            tracing::debug!(dropped_daily, dropped_weekly, "pruned statistics buckets");
        }
    }

    pub fn summarize(&self, store: &StatisticsStore, now: DateTime<Utc>) -> Summary {
        let use_days = (now - store.first_use_date).num_days().max(0) + 1;
        let total = TotalSummary {
            count: store.total_rest_count,
            minutes: store.total_rest_minutes,
            hours: store.total_rest_minutes / 60,
            use_days,
        };

        let today = store
            .daily_records
            .get(&self.date_key(now))
            .cloned()
            .unwrap_or_default();
        let this_week = store
            .weekly_records
            .get(&self.week_key(now))
            .copied()
            .unwrap_or_default();

        let last7_days = (0..7)
            .rev()
            .map(|days_ago| {
                let date = self.date_key(now - Duration::days(days_ago));
                let (count, minutes) = store
                    .daily_records
                    .get(&date)
                    .map(|bucket| (bucket.count, bucket.minutes))
                    .unwrap_or((0, 0));
                DaySummary { date, count, minutes }
            })
            .collect();

        Summary {
            total,
            today,
            this_week,
            last7_days,
        }
    }

    fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        calendar::local_date(at, self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn rest(minutes: u32) -> RestEvent {
        RestEvent::new(minutes).unwrap()
    }

    #[test]
    fn first_rest_fills_daily_and_weekly_buckets() {
        let now = at(2024, 1, 1, 9);
        let mut store = StatisticsStore::new(now);
        StatsAggregator::utc().record_event(&mut store, &rest(30), now);

        assert_eq!(store.total_rest_count, 1);
        assert_eq!(store.total_rest_minutes, 30);
        assert_eq!(
            store.daily_records["2024-01-01"],
            DailyBucket {
                count: 1,
                minutes: 30,
                records: vec![RestRecord {
                    time: now,
                    duration: 30
                }],
            }
        );
        assert_eq!(
            store.weekly_records["2024-W01"],
            WeeklyBucket {
                count: 1,
                minutes: 30
            }
        );
    }

    #[test]
    fn persisted_shape_uses_camel_case_fields() {
        let now = at(2024, 1, 1, 9);
        let mut store = StatisticsStore::new(now);
        StatsAggregator::utc().record_event(&mut store, &rest(30), now);

        let json = serde_json::to_value(&store).unwrap();
        assert_eq!(json["totalRestCount"], 1);
        assert_eq!(json["totalRestMinutes"], 30);
        assert_eq!(json["weeklyRecords"]["2024-W01"]["minutes"], 30);
        let time = json["dailyRecords"]["2024-01-01"]["records"][0]["time"]
            .as_str()
            .unwrap();
        assert!(time.starts_with("2024-01-01T09:00:00"));
    }

    #[test]
    fn blob_without_records_field_still_loads() {
        let raw = r#"{
            "totalRestCount": 2,
            "totalRestMinutes": 60,
            "dailyRecords": {"2024-01-01": {"count": 2, "minutes": 60}},
            "weeklyRecords": {},
            "firstUseDate": "2023-12-01T08:00:00.000Z"
        }"#;
        let store: StatisticsStore = serde_json::from_str(raw).unwrap();
        assert!(store.daily_records["2024-01-01"].records.is_empty());
        assert_eq!(store.first_use_date, at(2023, 12, 1, 8));
    }

    #[test]
    fn totals_survive_pruning() {
        let aggregator = StatsAggregator::utc();
        let start = at(2024, 1, 1, 9);
        let mut store = StatisticsStore::new(start);
        let mut expected_minutes = 0;

        for day in 0..200 {
            let minutes = 5 + (day % 7) as u32;
            expected_minutes += u64::from(minutes);
            aggregator.record_event(&mut store, &rest(minutes), start + Duration::days(day));
            assert!(store.daily_records.len() <= 90);
            assert!(store.weekly_records.len() <= 12);
        }

        assert_eq!(store.total_rest_count, 200);
        assert_eq!(store.total_rest_minutes, expected_minutes);
        assert!(store.daily_records.values().all(|bucket| bucket.count >= 1));
        assert!(store.weekly_records.values().all(|bucket| bucket.count >= 1));
    }

    #[test]
    fn daily_window_keeps_most_recent_ninety_days() {
        let aggregator = StatsAggregator::utc();
        let day1 = at(2024, 1, 1, 9);
        let mut store = StatisticsStore::new(day1);
        for day in 0..91 {
            aggregator.record_event(&mut store, &rest(10), day1 + Duration::days(day));
        }

        let day92 = day1 + Duration::days(91);
        aggregator.record_event(&mut store, &rest(10), day92);

        assert_eq!(store.total_rest_count, 92);
        assert_eq!(store.daily_records.len(), 90);
        let oldest = aggregator.date_key(day1 + Duration::days(2));
        let newest = aggregator.date_key(day92);
        assert_eq!(store.daily_records.keys().next(), Some(&oldest));
        assert_eq!(store.daily_records.keys().last(), Some(&newest));
    }

    #[test]
    fn window_stays_bounded_at_midnight() {
        let aggregator = StatsAggregator::utc();
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
        let mut store = StatisticsStore::new(start);
        for day in 0..120 {
            aggregator.record_event(&mut store, &rest(10), start + Duration::days(day));
        }
        assert_eq!(store.daily_records.len(), 90);
        assert_eq!(store.weekly_records.len(), 12);
    }

    #[test]
    fn weekly_window_keeps_twelve_weeks_across_w53() {
        let aggregator = StatsAggregator::utc();
        // Mondays from 2020-W41 to 2021-W07, crossing 2020-W53.
        let first = at(2020, 10, 5, 12);
        let mut store = StatisticsStore::new(first);
        for week in 0..20 {
            aggregator.record_event(&mut store, &rest(10), first + Duration::weeks(week));
        }

        let now = first + Duration::weeks(19);
        assert_eq!(aggregator.week_key(now), "2021-W07");
        let kept: Vec<&str> = store.weekly_records.keys().map(String::as_str).collect();
        assert_eq!(
            kept,
            [
                "2020-W49", "2020-W50", "2020-W51", "2020-W52", "2020-W53", "2021-W01",
                "2021-W02", "2021-W03", "2021-W04", "2021-W05", "2021-W06", "2021-W07",
            ]
        );
        // 2020-W48 starts on 2020-11-23, exactly 84 days before `now`.
        assert!(!store.weekly_records.contains_key("2020-W48"));
        assert_eq!(store.total_rest_count, 20);
    }

    #[test]
    fn saturated_buckets_do_not_overflow() {
        let aggregator = StatsAggregator::utc();
        let now = at(2024, 1, 1, 9);
        let mut store = StatisticsStore::new(now);
        store.total_rest_minutes = u64::MAX;
        store.daily_records.insert(
            "2024-01-01".into(),
            DailyBucket {
                count: u64::MAX,
                minutes: u64::MAX - 5,
                records: Vec::new(),
            },
        );
        store.weekly_records.insert(
            "2024-W01".into(),
            WeeklyBucket {
                count: u64::MAX,
                minutes: u64::MAX,
            },
        );

        aggregator.record_event(&mut store, &rest(30), now);

        assert_eq!(store.total_rest_minutes, u64::MAX);
        assert_eq!(store.daily_records["2024-01-01"].count, u64::MAX);
        assert_eq!(store.daily_records["2024-01-01"].minutes, u64::MAX);
        assert_eq!(store.weekly_records["2024-W01"].count, u64::MAX);
    }

    #[test]
    fn each_recording_touches_one_daily_and_one_weekly_bucket() {
        let aggregator = StatsAggregator::utc();
        let now = at(2024, 5, 15, 14);
        let mut store = StatisticsStore::new(now);
        aggregator.record_event(&mut store, &rest(20), now);
        let before = store.clone();

        aggregator.record_event(&mut store, &rest(25), now);

        let day = aggregator.date_key(now);
        let week = aggregator.week_key(now);
        assert_eq!(store.daily_records[&day].count - before.daily_records[&day].count, 1);
        assert_eq!(store.daily_records[&day].minutes - before.daily_records[&day].minutes, 25);
        assert_eq!(store.weekly_records[&week].count - before.weekly_records[&week].count, 1);
        assert_eq!(store.weekly_records[&week].minutes - before.weekly_records[&week].minutes, 25);
        assert_eq!(store.daily_records.len(), before.daily_records.len());
        assert_eq!(store.weekly_records.len(), before.weekly_records.len());
    }

    #[test]
    fn sunday_new_year_lands_in_previous_iso_year() {
        let aggregator = StatsAggregator::utc();
        let now = at(2023, 1, 1, 12);
        let mut store = StatisticsStore::new(now);
        aggregator.record_event(&mut store, &rest(15), now);
        assert!(store.weekly_records.contains_key("2022-W52"));
        assert!(store.daily_records.contains_key("2023-01-01"));
    }

    #[test]
    fn offset_moves_late_evening_into_next_day() {
        let aggregator = StatsAggregator::with_offset(FixedOffset::east_opt(3 * 3600).unwrap());
        // Sunday 22:00 UTC is Monday 01:00 at +03:00.
        let now = Utc.with_ymd_and_hms(2024, 1, 7, 22, 0, 0).unwrap();
        let mut store = StatisticsStore::new(now);
        aggregator.record_event(&mut store, &rest(10), now);
        assert!(store.daily_records.contains_key("2024-01-08"));
        assert!(store.weekly_records.contains_key("2024-W02"));
    }

    #[test]
    fn malformed_keys_are_dropped_on_prune() {
        let aggregator = StatsAggregator::utc();
        let now = at(2024, 1, 10, 9);
        let mut store = StatisticsStore::new(now);
        store
            .daily_records
            .insert("not-a-date".into(), DailyBucket::default());
        store
            .weekly_records
            .insert("2024-Wxx".into(), WeeklyBucket::default());

        aggregator.record_event(&mut store, &rest(10), now);

        assert_eq!(store.daily_records.len(), 1);
        assert_eq!(store.weekly_records.len(), 1);
    }

    #[test]
    fn zero_duration_is_rejected() {
        assert!(matches!(RestEvent::new(0), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn summarize_reports_today_week_and_last_seven_days() {
        let aggregator = StatsAggregator::utc();
        let first = at(2024, 1, 1, 9);
        let mut store = StatisticsStore::new(first);
        aggregator.record_event(&mut store, &rest(30), first);
        aggregator.record_event(&mut store, &rest(30), at(2024, 1, 3, 10));
        aggregator.record_event(&mut store, &rest(45), at(2024, 1, 3, 15));

        let now = at(2024, 1, 3, 18);
        let summary = aggregator.summarize(&store, now);

        assert_eq!(summary.total.count, 3);
        assert_eq!(summary.total.minutes, 105);
        assert_eq!(summary.total.hours, 1);
        assert_eq!(summary.total.remainder_minutes(), 45);
        assert_eq!(summary.total.use_days, 3);
        assert_eq!(summary.today.count, 2);
        assert_eq!(summary.today.minutes, 75);
        assert_eq!(summary.this_week.count, 3);

        let dates: Vec<&str> = summary.last7_days.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(
            dates,
            [
                "2023-12-28",
                "2023-12-29",
                "2023-12-30",
                "2023-12-31",
                "2024-01-01",
                "2024-01-02",
                "2024-01-03"
            ]
        );
        assert_eq!(summary.last7_days[4].count, 1);
        assert_eq!(summary.last7_days[5].count, 0);
        assert_eq!(summary.last7_days[6].minutes, 75);
    }

    #[test]
    fn summarize_is_pure() {
        let aggregator = StatsAggregator::utc();
        let now = at(2024, 6, 1, 9);
        let mut store = StatisticsStore::new(now - Duration::days(10));
        aggregator.record_event(&mut store, &rest(30), now);
        let snapshot = store.clone();

        let first = aggregator.summarize(&store, now);
        let second = aggregator.summarize(&store, now);

        assert_eq!(first, second);
        assert_eq!(store, snapshot);
        assert_eq!(first.total.use_days, 11);
    }

    #[test]
    fn reset_store_summarizes_to_zero() {
        let now = at(2024, 6, 1, 9);
        let summary = StatsAggregator::utc().summarize(&StatisticsStore::new(now), now);

        assert_eq!(summary.total.count, 0);
        assert_eq!(summary.total.minutes, 0);
        assert_eq!(summary.total.use_days, 1);
        assert_eq!(summary.today, DailyBucket::default());
        assert_eq!(summary.this_week, WeeklyBucket::default());
        assert!(summary.last7_days.iter().all(|d| d.count == 0 && d.minutes == 0));
        assert_eq!(summary.total.average_per_day(), 0.0);
    }

    #[test]
    fn summary_serializes_like_the_statistics_panel_expects() {
        let now = at(2024, 6, 1, 9);
        let summary = StatsAggregator::utc().summarize(&StatisticsStore::new(now), now);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["total"]["useDays"], 1);
        assert!(json["thisWeek"].is_object());
        assert_eq!(json["last7Days"].as_array().unwrap().len(), 7);
    }
}
