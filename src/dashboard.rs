use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::models::{ActivityRecord, Category, ReadinessScore};
use crate::readiness;

const DAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayBreakdown {
    pub label: &'static str,
    pub date: NaiveDate,
    pub count: usize,
    pub total_minutes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBreakdown {
    pub category: Category,
    pub count: usize,
    pub total_minutes: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyDashboard {
    pub week_start: NaiveDate,
    pub days: Vec<DayBreakdown>,
    pub categories: Vec<CategoryBreakdown>,
    pub readiness: ReadinessScore,
    pub streak: u32,
    pub total_hours: f64,
    pub total_activities: usize,
}

/// The dashboard week runs Sunday through Saturday.
pub fn dashboard_week_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(i64::from(today.weekday().num_days_from_sunday()))
}

/// Builds the student's weekly dashboard.
///
/// Day and category breakdowns cover the week containing `today`. Readiness
/// and the streak look at the whole history.
pub fn build_weekly_dashboard(history: &[ActivityRecord], today: NaiveDate) -> WeeklyDashboard {
    let week_start = dashboard_week_start(today);
    let week_end = week_start + Duration::days(7);

    let this_week: Vec<&ActivityRecord> = history
        .iter()
        .filter(|activity| activity.occurred_on >= week_start && activity.occurred_on < week_end)
        .collect();

    let days = DAY_LABELS
        .into_iter()
        .zip(0i64..)
        .map(|(label, offset)| {
            let date = week_start + Duration::days(offset);
            let on_day = this_week.iter().filter(|activity| activity.occurred_on == date);
            DayBreakdown {
                label,
                date,
                count: on_day.clone().count(),
                total_minutes: on_day
                    .map(|activity| u64::from(activity.time_spent_minutes))
                    .sum(),
            }
        })
        .collect();

    let total_minutes: u64 = this_week
        .iter()
        .map(|activity| u64::from(activity.time_spent_minutes))
        .sum();

    WeeklyDashboard {
        week_start,
        days,
        categories: summarize_by_category(this_week.iter().copied()),
        readiness: readiness::score_activities(history),
        streak: current_streak(history, today),
        total_hours: total_minutes as f64 / 60.0,
        total_activities: this_week.len(),
    }
}

/// Count and minutes per category, busiest first.
pub fn summarize_by_category<'a>(
    activities: impl IntoIterator<Item = &'a ActivityRecord>,
) -> Vec<CategoryBreakdown> {
    let mut map: BTreeMap<Category, (usize, u64)> = BTreeMap::new();

    for activity in activities {
        let entry = map.entry(activity.category).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += u64::from(activity.time_spent_minutes);
    }

    let mut summaries: Vec<CategoryBreakdown> = map
        .into_iter()
        .map(|(category, (count, total_minutes))| CategoryBreakdown {
            category,
            count,
            total_minutes,
        })
        .collect();

    summaries.sort_by(|a, b| b.count.cmp(&a.count));
    summaries
}

/// Consecutive days with at least one activity, counting back from `today`.
/// Walks the whole history, so a run can reach back past the dashboard's Sunday.
pub fn current_streak(history: &[ActivityRecord], today: NaiveDate) -> u32 {
    let active_days: HashSet<NaiveDate> =
        history.iter().map(|activity| activity.occurred_on).collect();

    let mut streak = 0;
    let mut day = today;
    while active_days.contains(&day) {
        streak += 1;
        day -= Duration::days(1);
    }
    streak
}
