//! Daily urge outcome counts for the calendar heatmap.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use still_types::models::{DailyStatusCounts, EmotionMapData, StatusCounts, UrgeStatus};

/// `[now - weeks * 7 days, now]`
pub fn window(now: DateTime<Utc>, weeks: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    (now - Duration::days(i64::from(weeks) * 7), now)
}

/// Group `(created_at, status)` pairs by UTC calendar day.
///
/// Buckets come out in the order their date is first seen, so ascending
/// input gives ascending output. Days without urges get no bucket. Status
/// strings that are not a known `UrgeStatus` count as PENDING.
pub fn aggregate<'a, I>(urges: I) -> EmotionMapData
where
    I: IntoIterator<Item = (DateTime<Utc>, &'a str)>,
{
    let mut index: HashMap<NaiveDate, usize> = HashMap::new();
    let mut daily_data: Vec<DailyStatusCounts> = Vec::new();

    for (created_at, status) in urges {
        let day = created_at.date_naive();
        let slot = *index.entry(day).or_insert_with(|| {
            daily_data.push(DailyStatusCounts {
                date: day.format("%Y-%m-%d").to_string(),
                counts: StatusCounts::default(),
            });
            daily_data.len() - 1
        });

        let status = status.parse::<UrgeStatus>().unwrap_or_default();
        daily_data[slot].counts.record(status);
    }

    EmotionMapData {
        total_days: daily_data.len(),
        daily_data,
    }
}
