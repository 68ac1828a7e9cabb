//! Read-side summaries for the popup and side panel.

use super::{day_key, DailyStore};
use crate::error::Result;
use crate::types::{DailyAggregate, SiteUsage, TrackedSite};
use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// One day of the weekly overview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekDay {
    /// Day key (`YYYY-MM-DD`)
    pub key: String,
    pub date: NaiveDate,
    pub weekday: Weekday,
    /// The day's totals; zero for days without a record and for future days
    pub total: SiteUsage,
    /// Whether the day is after `today`
    pub is_future: bool,
}

/// Summaries for the Sunday..Saturday week containing `today`.
///
/// Reads existing records only; days never visited are reported as zero
/// without being created.
pub fn week_summary(store: &DailyStore, today: NaiveDate) -> Result<Vec<WeekDay>> {
    let sunday = today - Duration::days(today.weekday().num_days_from_sunday() as i64);

    let mut days = Vec::with_capacity(7);
    for offset in 0..7 {
        let date = sunday + Duration::days(offset);
        let key = day_key(date);
        let is_future = date > today;

        let total = if is_future {
            SiteUsage::default()
        } else {
            store.get(&key)?.map(|r| r.total).unwrap_or_default()
        };

        days.push(WeekDay {
            key,
            date,
            weekday: date.weekday(),
            total,
            is_future,
        });
    }

    Ok(days)
}

/// Site with the most time on this record, if any site has time at all.
///
/// Ties go to the earlier site in [`TrackedSite::ALL`] order.
pub fn most_used_site(record: &DailyAggregate) -> Option<TrackedSite> {
    let mut best: Option<(TrackedSite, u64)> = None;
    for site in TrackedSite::ALL {
        let time = record.site(site).time;
        if time > best.map(|(_, t)| t).unwrap_or(0) {
            best = Some((site, time));
        }
    }
    best.map(|(site, _)| site)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn test_week_summary_sunday_to_saturday() {
        let kv = Arc::new(MemoryStore::new());
        let store = DailyStore::new(kv.clone());

        // Wednesday 2025-06-11; week runs Sunday 06-08 .. Saturday 06-14
        let today = NaiveDate::from_ymd_opt(2025, 6, 11).unwrap();
        store
            .increment_time("2025-06-09", TrackedSite::Claude, 120)
            .unwrap();
        store
            .increment_time("2025-06-11", TrackedSite::ChatGpt, 60)
            .unwrap();
        let writes_before = kv.write_count();

        let week = week_summary(&store, today).unwrap();

        assert_eq!(week.len(), 7);
        assert_eq!(week[0].key, "2025-06-08");
        assert_eq!(week[0].weekday, Weekday::Sun);
        assert_eq!(week[6].key, "2025-06-14");
        assert_eq!(week[1].total.time, 120);
        assert_eq!(week[3].total.time, 60);
        assert_eq!(week[2].total, SiteUsage::default());
        assert!(!week[3].is_future);
        assert!(week[4].is_future);
        // Reading the week never creates records
        assert_eq!(kv.write_count(), writes_before);
    }

    #[test]
    fn test_week_starts_on_today_when_sunday() {
        let store = DailyStore::new(Arc::new(MemoryStore::new()));
        let sunday = NaiveDate::from_ymd_opt(2025, 6, 8).unwrap();

        let week = week_summary(&store, sunday).unwrap();
        assert_eq!(week[0].date, sunday);
        assert!(week[1..].iter().all(|d| d.is_future));
    }

    #[test]
    fn test_most_used_site() {
        let mut record = DailyAggregate::zeroed("2025-06-11");
        assert_eq!(most_used_site(&record), None);

        record.add_time(TrackedSite::Claude, 40);
        record.add_time(TrackedSite::Gemini, 40);
        // Tie resolves to Gemini, which precedes Claude
        assert_eq!(most_used_site(&record), Some(TrackedSite::Gemini));

        record.add_time(TrackedSite::ChatGpt, 41);
        assert_eq!(most_used_site(&record), Some(TrackedSite::ChatGpt));
    }
}
