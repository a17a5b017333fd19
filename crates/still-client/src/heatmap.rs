use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate};

use still_types::api::MAX_EMOTION_MAP_WEEKS;

use crate::emotion::{DayEmotion, EMPTY_COLOR};

#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapCell {
    pub date: NaiveDate,
    pub intensity: f64,
    pub color: String,
}

/// Dense calendar grid: one row per weekday (Monday first), each row in
/// date order. Covers `weeks * 7` days ending on `today`, with `weeks`
/// capped at the largest window the server accepts.
pub fn build_grid(today: NaiveDate, weeks: u32, days: &[DayEmotion]) -> Vec<Vec<HeatmapCell>> {
    let by_date: HashMap<&str, &DayEmotion> =
        days.iter().map(|d| (d.date.as_str(), d)).collect();

    let weeks = weeks.min(MAX_EMOTION_MAP_WEEKS);
    let total_days = i64::from(weeks) * 7;
    let mut rows: Vec<Vec<HeatmapCell>> =
        (0..7).map(|_| Vec::with_capacity(weeks as usize)).collect();

    for offset in (0..total_days).rev() {
        // Out of calendar range near NaiveDate::MIN.
        let Some(date) = today.checked_sub_signed(Duration::days(offset)) else {
            continue;
        };
        let key = date.format("%Y-%m-%d").to_string();
        let cell = match by_date.get(key.as_str()) {
            Some(day) => HeatmapCell {
                date,
                intensity: day.intensity,
                color: day.color.clone(),
            },
            None => HeatmapCell {
                date,
                intensity: 0.0,
                color: EMPTY_COLOR.to_string(),
            },
        };
        rows[date.weekday().num_days_from_monday() as usize].push(cell);
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn day(date: &str, intensity: f64) -> DayEmotion {
        DayEmotion {
            date: date.to_string(),
            intensity,
            color: "#123456".to_string(),
        }
    }

    #[test]
    fn grid_covers_every_day_once() {
        // A Wednesday
        let today = NaiveDate::from_ymd_opt(2025, 6, 11).unwrap();
        let grid = build_grid(today, 7, &[]);

        assert_eq!(grid.len(), 7);
        assert!(grid.iter().all(|row| row.len() == 7));
        for (i, row) in grid.iter().enumerate() {
            for cell in row {
                assert_eq!(cell.date.weekday().num_days_from_monday() as usize, i);
                assert!(cell.date <= today);
                assert_eq!(cell.intensity, 0.0);
                assert_eq!(cell.color, EMPTY_COLOR);
            }
            assert!(row.windows(2).all(|w| w[0].date < w[1].date));
        }

        let wednesday = Weekday::Wed.num_days_from_monday() as usize;
        assert_eq!(grid[wednesday].last().unwrap().date, today);
        let earliest = grid.iter().flatten().map(|c| c.date).min().unwrap();
        assert_eq!(earliest, today - Duration::days(48));
    }

    #[test]
    fn known_days_are_filled() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 11).unwrap();
        let grid = build_grid(
            today,
            2,
            &[day("2025-06-09", 0.4), day("2025-06-11", 0.9), day("2024-01-01", 1.0)],
        );

        let filled: Vec<_> = grid
            .iter()
            .flatten()
            .filter(|c| c.intensity > 0.0)
            .map(|c| (c.date.to_string(), c.intensity))
            .collect();
        assert_eq!(filled.len(), 2);
        assert!(filled.contains(&("2025-06-09".to_string(), 0.4)));
        assert!(filled.contains(&("2025-06-11".to_string(), 0.9)));

        // 2025-06-09 is a Monday.
        assert_eq!(grid[0].last().unwrap().color, "#123456");
    }

    #[test]
    fn oversized_window_is_capped() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 11).unwrap();
        let grid = build_grid(today, u32::MAX, &[]);
        let cells: usize = grid.iter().map(Vec::len).sum();
        assert_eq!(cells, MAX_EMOTION_MAP_WEEKS as usize * 7);
    }

    #[test]
    fn window_near_calendar_start_is_truncated() {
        let grid = build_grid(NaiveDate::MIN, 2, &[]);
        let cells: Vec<_> = grid.iter().flatten().collect();
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].date, NaiveDate::MIN);
    }
}
