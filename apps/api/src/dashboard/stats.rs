use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::pipeline::status::PIPELINE_STAGES;
use crate::pipeline::ApplicationStatus;

/// Percentage of `part` in `whole`, rounded to 2 decimals. Zero when `whole` is zero.
pub fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    round2(part as f64 * 100.0 / whole as f64)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Builds a `{variant: count}` map with every variant present, absent ones at 0.
pub fn zero_filled<'a>(
    variants: impl IntoIterator<Item = &'a str>,
    rows: &[(String, i64)],
) -> BTreeMap<String, i64> {
    let mut counts: BTreeMap<String, i64> = variants.into_iter().map(|v| (v.to_string(), 0)).collect();
    for (key, count) in rows {
        if let Some(slot) = counts.get_mut(key) {
            *slot += count;
        }
    }
    counts
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelStage {
    pub stage: ApplicationStatus,
    /// Distinct applications that ever entered this stage.
    pub reached: i64,
    /// Share of the previous stage that made it here; `None` for the first stage.
    pub conversion_rate: Option<f64>,
}

/// Orders the per-stage counts along the pipeline and adds stage-to-stage conversion.
pub fn funnel(reached: &[(ApplicationStatus, i64)]) -> Vec<FunnelStage> {
    let count_for = |stage: ApplicationStatus| {
        reached
            .iter()
            .filter(|(s, _)| *s == stage)
            .map(|(_, c)| *c)
            .sum::<i64>()
    };

    let mut stages = Vec::with_capacity(PIPELINE_STAGES.len());
    let mut previous: Option<i64> = None;
    for stage in PIPELINE_STAGES {
        let count = count_for(stage);
        stages.push(FunnelStage {
            stage,
            reached: count,
            conversion_rate: previous.map(|p| percentage(count, p)),
        });
        previous = Some(count);
    }
    stages
}

/// One history row reduced to what stage timing needs.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HistoryPoint {
    pub application_id: Uuid,
    pub to_status: ApplicationStatus,
    pub changed_at: DateTime<Utc>,
}

/// Average days spent in each open pipeline stage.
///
/// `points` must be ordered by application, then `changed_at`. A stage lasts from
/// the row entering it to the application's next row; a stage the application is
/// still in is measured up to `now`. Terminal statuses are not timed.
pub fn average_days_in_stage(points: &[HistoryPoint], now: DateTime<Utc>) -> BTreeMap<String, f64> {
    let mut totals: HashMap<ApplicationStatus, (Duration, i64)> = HashMap::new();

    for (i, point) in points.iter().enumerate() {
        if point.to_status.is_terminal() {
            continue;
        }
        let left_at = match points.get(i + 1) {
            Some(next) if next.application_id == point.application_id => next.changed_at,
            _ => now,
        };
        let entry = totals.entry(point.to_status).or_insert((Duration::zero(), 0));
        entry.0 = entry.0 + (left_at - point.changed_at).max(Duration::zero());
        entry.1 += 1;
    }

    PIPELINE_STAGES
        .iter()
        .filter(|s| !s.is_terminal())
        .map(|stage| {
            let days = match totals.get(stage) {
                Some((total, samples)) if *samples > 0 => {
                    total.num_seconds() as f64 / 86_400.0 / *samples as f64
                }
                _ => 0.0,
            };
            (stage.as_str().to_string(), round2(days))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodCount {
    /// `YYYY-MM` for months, `YYYY-MM-DD` for days.
    pub period: String,
    pub count: i64,
}

/// First day of the last `months` calendar months, oldest first, ending with `today`'s month.
pub fn month_starts(today: NaiveDate, months: u32) -> Vec<NaiveDate> {
    let current = today.year() * 12 + today.month0() as i32;
    (0..months as i32)
        .rev()
        .filter_map(|back| {
            let index = current - back;
            NaiveDate::from_ymd_opt(index.div_euclid(12), index.rem_euclid(12) as u32 + 1, 1)
        })
        .collect()
}

/// The last `days` dates, oldest first, ending with `today`.
pub fn day_range(today: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (0..days as i64)
        .rev()
        .map(|back| today - Duration::days(back))
        .collect()
}

/// Pairs each period start with its count, zero when the query returned no row for it.
pub fn zero_fill_periods(
    starts: &[NaiveDate],
    rows: &[(NaiveDate, i64)],
    format: &str,
) -> Vec<PeriodCount> {
    starts
        .iter()
        .map(|start| PeriodCount {
            period: start.format(format).to_string(),
            count: rows
                .iter()
                .filter(|(d, _)| d == start)
                .map(|(_, c)| *c)
                .sum(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_percentage_rounds_and_guards_zero() {
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(5, 0), 0.0);
        assert_eq!(percentage(0, 10), 0.0);
    }

    #[test]
    fn test_zero_filled_includes_every_variant() {
        let rows = vec![("screening".to_string(), 4), ("bogus".to_string(), 9)];
        let map = zero_filled(["applied", "screening", "hired"], &rows);
        assert_eq!(map.len(), 3);
        assert_eq!(map["applied"], 0);
        assert_eq!(map["screening"], 4);
        assert!(!map.contains_key("bogus"));
    }

    #[test]
    fn test_funnel_conversions() {
        let stages = funnel(&[
            (ApplicationStatus::Applied, 10),
            (ApplicationStatus::Screening, 5),
            (ApplicationStatus::Interview, 2),
            (ApplicationStatus::Rejected, 7),
        ]);

        assert_eq!(stages.len(), 5);
        assert_eq!(stages[0].stage, ApplicationStatus::Applied);
        assert_eq!(stages[0].conversion_rate, None);
        assert_eq!(stages[1].conversion_rate, Some(50.0));
        assert_eq!(stages[2].conversion_rate, Some(40.0));
        assert_eq!(stages[3].reached, 0);
        assert_eq!(stages[3].conversion_rate, Some(0.0));
        // offer had nobody, so hired converts from zero
        assert_eq!(stages[4].conversion_rate, Some(0.0));
    }

    #[test]
    fn test_average_days_uses_consecutive_rows() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let points = vec![
            HistoryPoint { application_id: a, to_status: ApplicationStatus::Applied, changed_at: at(1, 0) },
            HistoryPoint { application_id: a, to_status: ApplicationStatus::Screening, changed_at: at(3, 0) },
            HistoryPoint { application_id: a, to_status: ApplicationStatus::Rejected, changed_at: at(4, 12) },
            HistoryPoint { application_id: b, to_status: ApplicationStatus::Applied, changed_at: at(5, 0) },
        ];
        let now = at(9, 0);

        let avg = average_days_in_stage(&points, now);
        // a: 2 days in applied; b: still applied, 4 days so far
        assert_eq!(avg["applied"], 3.0);
        assert_eq!(avg["screening"], 1.5);
        assert_eq!(avg["interview"], 0.0);
        assert!(!avg.contains_key("hired"));
        assert!(!avg.contains_key("rejected"));
    }

    #[test]
    fn test_month_starts_cross_year_boundary() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 17).unwrap();
        let starts = month_starts(today, 3);
        assert_eq!(
            starts,
            vec![
                NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            ]
        );
    }

    #[test]
    fn test_zero_fill_periods_keeps_order() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let starts = month_starts(today, 3);
        let rows = vec![(NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(), 7)];

        let trend = zero_fill_periods(&starts, &rows, "%Y-%m");
        let periods: Vec<_> = trend.iter().map(|p| p.period.as_str()).collect();
        assert_eq!(periods, vec!["2026-01", "2026-02", "2026-03"]);
        assert_eq!(trend.iter().map(|p| p.count).collect::<Vec<_>>(), vec![0, 7, 0]);
    }

    #[test]
    fn test_day_range_is_inclusive_of_today() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let days = day_range(today, 3);
        assert_eq!(days.first(), NaiveDate::from_ymd_opt(2026, 2, 28).as_ref());
        assert_eq!(days.last(), Some(&today));
    }
}
