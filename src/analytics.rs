use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use uuid::Uuid;

use crate::dashboard::{summarize_by_category, CategoryBreakdown};
use crate::models::{ActivityRecord, ReadinessScore, ReadinessStatus, Student};
use crate::readiness;
use crate::week::{iso_week, IsoWeek};

const TOP_PERFORMERS: usize = 10;
const LOW_CONSISTENCY_LIMIT: usize = 10;
const LOW_CONSISTENCY_THRESHOLD: u8 = 30;
const ACTIVE_WINDOW_DAYS: i64 = 7;
const WEAK_CATEGORY_COUNT: usize = 3;
const PROFILE_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReadiness {
    pub student: Student,
    pub readiness: ReadinessScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: ReadinessStatus,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_students: usize,
    pub active_students: usize,
    pub average_readiness: u8,
    pub top_performers: Vec<StudentReadiness>,
    pub low_consistency: Vec<StudentReadiness>,
    pub distribution: Vec<StatusCount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekTrend {
    pub week: IsoWeek,
    pub count: usize,
    pub total_minutes: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub student: Student,
    pub readiness: ReadinessScore,
    pub total_activities: usize,
    pub recent_activities: Vec<ActivityRecord>,
    pub weak_categories: Vec<CategoryBreakdown>,
    pub performance_trend: Vec<WeekTrend>,
}

/// Scores every student independently, highest readiness first.
///
/// `activities` may hold records for any number of students; records whose
/// owner is not in `students` are ignored.
pub fn score_cohort(students: &[Student], activities: &[ActivityRecord]) -> Vec<StudentReadiness> {
    let mut by_student: HashMap<Uuid, Vec<ActivityRecord>> = HashMap::new();
    for activity in activities {
        by_student
            .entry(activity.student_id)
            .or_default()
            .push(activity.clone());
    }

    let mut ranked: Vec<StudentReadiness> = students
        .iter()
        .map(|student| {
            let history = by_student.remove(&student.id).unwrap_or_default();
            StudentReadiness {
                student: student.clone(),
                readiness: readiness::score_activities(&history),
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.readiness
            .score
            .cmp(&a.readiness.score)
            .then_with(|| a.student.name.cmp(&b.student.name))
    });
    ranked
}

pub fn dashboard_stats(
    students: &[Student],
    activities: &[ActivityRecord],
    today: NaiveDate,
) -> AdminStats {
    let active_since = today - Duration::days(ACTIVE_WINDOW_DAYS);
    let recently_active: HashSet<Uuid> = activities
        .iter()
        .filter(|activity| activity.occurred_on >= active_since)
        .map(|activity| activity.student_id)
        .collect();
    let active_students = students
        .iter()
        .filter(|student| recently_active.contains(&student.id))
        .count();

    let ranked = score_cohort(students, activities);

    let average_readiness = if ranked.is_empty() {
        0
    } else {
        let total: u32 = ranked
            .iter()
            .map(|entry| u32::from(entry.readiness.score))
            .sum();
        (f64::from(total) / ranked.len() as f64).round() as u8
    };

    let low_consistency = ranked
        .iter()
        .filter(|entry| entry.readiness.coding_consistency < LOW_CONSISTENCY_THRESHOLD)
        .take(LOW_CONSISTENCY_LIMIT)
        .cloned()
        .collect();

    AdminStats {
        total_students: students.len(),
        active_students,
        average_readiness,
        top_performers: ranked.iter().take(TOP_PERFORMERS).cloned().collect(),
        low_consistency,
        distribution: distribution(&ranked),
    }
}

/// Student count per status, every status listed even when empty.
pub fn distribution(ranked: &[StudentReadiness]) -> Vec<StatusCount> {
    ReadinessStatus::DESCENDING
        .into_iter()
        .map(|status| StatusCount {
            status,
            count: ranked
                .iter()
                .filter(|entry| entry.readiness.status == status)
                .count(),
        })
        .collect()
}

pub fn student_profile(student: Student, mut activities: Vec<ActivityRecord>) -> StudentProfile {
    let readiness = readiness::score_activities(&activities);

    let mut weak_categories = summarize_by_category(&activities);
    weak_categories.sort_by(|a, b| a.count.cmp(&b.count).then(a.category.cmp(&b.category)));
    weak_categories.truncate(WEAK_CATEGORY_COUNT);

    let performance_trend = weekly_trend(&activities);
    let total_activities = activities.len();

    activities.sort_by(|a, b| {
        b.occurred_on
            .cmp(&a.occurred_on)
            .then(b.logged_at.cmp(&a.logged_at))
    });
    activities.truncate(PROFILE_HISTORY_LIMIT);

    StudentProfile {
        student,
        readiness,
        total_activities,
        recent_activities: activities,
        weak_categories,
        performance_trend,
    }
}

/// Activity count and minutes per ISO week, oldest first.
pub fn weekly_trend(activities: &[ActivityRecord]) -> Vec<WeekTrend> {
    let mut weeks: BTreeMap<IsoWeek, (usize, u64)> = BTreeMap::new();
    for activity in activities {
        let entry = weeks.entry(iso_week(activity.occurred_on)).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += u64::from(activity.time_spent_minutes);
    }

    weeks
        .into_iter()
        .map(|(week, (count, total_minutes))| WeekTrend {
            week,
            count,
            total_minutes,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Difficulty};
    use chrono::Utc;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn student(name: &str) -> Student {
        Student {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            branch: "CSE".to_string(),
            section: "A".to_string(),
            registered_at: Utc::now(),
        }
    }

    fn activity(owner: &Student, category: Category, minutes: u32, on: NaiveDate) -> ActivityRecord {
        ActivityRecord {
            id: Uuid::new_v4(),
            student_id: owner.id,
            category,
            time_spent_minutes: minutes,
            difficulty: Difficulty::Medium,
            problems_solved: 0,
            notes: String::new(),
            occurred_on: on,
            logged_at: Utc::now(),
        }
    }

    fn busy_history(owner: &Student, start: NaiveDate) -> Vec<ActivityRecord> {
        let mut history: Vec<ActivityRecord> = (0..7)
            .map(|n| activity(owner, Category::Coding, 180, start + Duration::days(n)))
            .collect();
        history.extend(
            Category::ALL
                .into_iter()
                .map(|category| activity(owner, category, 10, start)),
        );
        history
    }

    #[test]
    fn cohort_is_ranked_by_score() {
        let avery = student("Avery");
        let jules = student("Jules");
        let kiara = student("Kiara");
        let mut activities = busy_history(&jules, date(2026, 9, 1));
        activities.push(activity(&kiara, Category::Coding, 60, date(2026, 9, 2)));

        let ranked = score_cohort(&[avery.clone(), jules.clone(), kiara.clone()], &activities);

        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].student.id, jules.id);
        assert_eq!(ranked[1].student.id, kiara.id);
        assert_eq!(ranked[2].student.id, avery.id);
        assert_eq!(ranked[2].readiness.status, ReadinessStatus::NotStarted);
    }

    #[test]
    fn stats_cover_activity_average_and_distribution() {
        let today = date(2026, 10, 14);
        let avery = student("Avery");
        let jules = student("Jules");
        let kiara = student("Kiara");

        let mut activities = busy_history(&jules, date(2026, 10, 1));
        activities.push(activity(&kiara, Category::Os, 30, date(2026, 10, 7)));
        activities.push(activity(&avery, Category::Os, 30, date(2026, 10, 6)));

        let stats = dashboard_stats(&[avery, jules.clone(), kiara.clone()], &activities, today);

        assert_eq!(stats.total_students, 3);
        // Kiara's activity sits exactly on the seven-day boundary, Avery's is a day older.
        assert_eq!(stats.active_students, 2);
        assert_eq!(stats.top_performers[0].student.id, jules.id);

        let jules_score = u32::from(stats.top_performers[0].readiness.score);
        let total: u32 = stats
            .top_performers
            .iter()
            .map(|entry| u32::from(entry.readiness.score))
            .sum();
        assert!(jules_score > 0);
        assert_eq!(
            stats.average_readiness,
            (f64::from(total) / 3.0).round() as u8
        );

        assert_eq!(stats.low_consistency.len(), 2);
        assert!(stats
            .low_consistency
            .iter()
            .all(|entry| entry.student.id != jules.id));

        assert_eq!(stats.distribution.len(), 5);
        let counted: usize = stats.distribution.iter().map(|entry| entry.count).sum();
        assert_eq!(counted, 3);
        let not_started = stats
            .distribution
            .iter()
            .find(|entry| entry.status == ReadinessStatus::NotStarted)
            .unwrap();
        assert_eq!(not_started.count, 2);
    }

    #[test]
    fn stats_for_empty_cohort_are_zero() {
        let stats = dashboard_stats(&[], &[], date(2026, 10, 14));
        assert_eq!(stats.total_students, 0);
        assert_eq!(stats.average_readiness, 0);
        assert!(stats.top_performers.is_empty());
        assert!(stats.distribution.iter().all(|entry| entry.count == 0));
    }

    #[test]
    fn profile_lists_weak_categories_and_trend() {
        let avery = student("Avery");
        let activities = vec![
            activity(&avery, Category::Coding, 60, date(2026, 10, 5)),
            activity(&avery, Category::Coding, 60, date(2026, 10, 6)),
            activity(&avery, Category::Coding, 60, date(2026, 10, 12)),
            activity(&avery, Category::Dbms, 30, date(2026, 10, 12)),
            activity(&avery, Category::Dbms, 30, date(2026, 10, 13)),
            activity(&avery, Category::Aptitude, 20, date(2026, 10, 13)),
            activity(&avery, Category::Cn, 20, date(2026, 10, 14)),
        ];

        let profile = student_profile(avery, activities);

        assert_eq!(profile.total_activities, 7);
        assert_eq!(profile.recent_activities[0].occurred_on, date(2026, 10, 14));
        let weak: Vec<Category> = profile
            .weak_categories
            .iter()
            .map(|summary| summary.category)
            .collect();
        assert_eq!(weak, vec![Category::Aptitude, Category::Cn, Category::Dbms]);

        assert_eq!(
            profile.performance_trend,
            vec![
                WeekTrend {
                    week: IsoWeek { year: 2026, week: 41 },
                    count: 2,
                    total_minutes: 120,
                },
                WeekTrend {
                    week: IsoWeek { year: 2026, week: 42 },
                    count: 5,
                    total_minutes: 160,
                },
            ]
        );
    }

    #[test]
    fn profile_history_is_capped() {
        let avery = student("Avery");
        let activities: Vec<ActivityRecord> = (0..60)
            .map(|n| activity(&avery, Category::Coding, 5, date(2026, 1, 1) + Duration::days(n)))
            .collect();

        let profile = student_profile(avery, activities);
        assert_eq!(profile.total_activities, 60);
        assert_eq!(profile.recent_activities.len(), 50);
        assert_eq!(
            profile.recent_activities[0].occurred_on,
            date(2026, 1, 1) + Duration::days(59)
        );
    }
}
