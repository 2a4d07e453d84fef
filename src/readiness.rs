use std::collections::HashSet;
use std::future::Future;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::TrackerError;
use crate::models::{ActivityRecord, Category, Difficulty, ReadinessScore, ReadinessStatus};

const CODING_DAYS_TARGET: f64 = 7.0;
const TIME_TARGET_MINUTES: f64 = 1200.0;
const HARD_APTITUDE_POINTS: f64 = 10.0;
const APTITUDE_POINTS: f64 = 5.0;
const MOCK_INTERVIEW_POINTS: f64 = 10.0;

const CONSISTENCY_WEIGHT: f64 = 0.30;
const CATEGORY_WEIGHT: f64 = 0.20;
const TIME_WEIGHT: f64 = 0.20;
const APTITUDE_WEIGHT: f64 = 0.15;
const MOCK_WEIGHT: f64 = 0.15;

/// Anything that can hand over one student's activity history.
pub trait ActivitySource {
    fn activities_for(
        &self,
        student_id: Uuid,
        since: Option<NaiveDate>,
    ) -> impl Future<Output = Result<Vec<ActivityRecord>, TrackerError>> + Send;
}

/// Which part of the history feeds the score. Defaults to the whole history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScoringWindow {
    #[default]
    AllTime,
    Since(NaiveDate),
}

impl ScoringWindow {
    fn since(self) -> Option<NaiveDate> {
        match self {
            ScoringWindow::AllTime => None,
            ScoringWindow::Since(date) => Some(date),
        }
    }
}

/// Unrounded sub-scores, each already clamped to `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubScores {
    pub coding_consistency: f64,
    pub category: f64,
    pub time: f64,
    pub aptitude: f64,
    pub mock: f64,
}

impl SubScores {
    pub fn from_activities(activities: &[ActivityRecord]) -> (Self, usize) {
        let coding_days = activities
            .iter()
            .filter(|activity| activity.category == Category::Coding)
            .map(|activity| activity.occurred_on)
            .collect::<HashSet<_>>()
            .len();

        let categories_used = activities
            .iter()
            .map(|activity| activity.category)
            .collect::<HashSet<_>>()
            .len();

        let total_minutes: u64 = activities
            .iter()
            .map(|activity| u64::from(activity.time_spent_minutes))
            .sum();

        let aptitude_points: f64 = activities
            .iter()
            .filter(|activity| activity.category == Category::Aptitude)
            .map(|activity| match activity.difficulty {
                Difficulty::Hard => HARD_APTITUDE_POINTS,
                _ => APTITUDE_POINTS,
            })
            .sum();

        let mock_interviews = activities
            .iter()
            .filter(|activity| activity.category == Category::MockInterview)
            .count();

        let scores = SubScores {
            coding_consistency: clamp_percent(coding_days as f64 / CODING_DAYS_TARGET * 100.0),
            category: clamp_percent(
                categories_used as f64 / Category::ALL.len() as f64 * 100.0,
            ),
            time: clamp_percent(total_minutes as f64 / TIME_TARGET_MINUTES * 100.0),
            aptitude: clamp_percent(aptitude_points),
            mock: clamp_percent(mock_interviews as f64 * MOCK_INTERVIEW_POINTS),
        };

        (scores, coding_days)
    }
}

pub fn composite(scores: &SubScores) -> u8 {
    let weighted = scores.coding_consistency * CONSISTENCY_WEIGHT
        + scores.category * CATEGORY_WEIGHT
        + scores.time * TIME_WEIGHT
        + scores.aptitude * APTITUDE_WEIGHT
        + scores.mock * MOCK_WEIGHT;

    clamp_percent(weighted).round() as u8
}

pub fn score_activities(activities: &[ActivityRecord]) -> ReadinessScore {
    let (scores, coding_days) = SubScores::from_activities(activities);
    let score = composite(&scores);

    ReadinessScore {
        score,
        coding_consistency: scores.coding_consistency.round() as u8,
        category_score: scores.category.round() as u8,
        time_score: scores.time.round() as u8,
        aptitude_score: scores.aptitude.round() as u8,
        mock_score: scores.mock.round() as u8,
        status: ReadinessStatus::from_score(score),
        total_activities: activities.len(),
        coding_days,
    }
}

/// Fetches a student's history and scores it.
///
/// A student with no activity gets a zero score. A failed fetch is returned
/// as an error so callers can tell "not started" from "could not compute".
pub async fn assess<S: ActivitySource>(
    source: &S,
    student_id: Uuid,
    window: ScoringWindow,
) -> Result<ReadinessScore, TrackerError> {
    let activities = source.activities_for(student_id, window.since()).await?;
    let readiness = score_activities(&activities);

    tracing::debug!(
        %student_id,
        score = readiness.score,
        status = %readiness.status,
        activities = readiness.total_activities,
        "readiness assessed"
    );

    Ok(readiness)
}

fn clamp_percent(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap() + Duration::days(offset)
    }

    fn activity(
        category: Category,
        minutes: u32,
        difficulty: Difficulty,
        on: NaiveDate,
    ) -> ActivityRecord {
        ActivityRecord {
            id: Uuid::new_v4(),
            student_id: Uuid::nil(),
            category,
            time_spent_minutes: minutes,
            difficulty,
            problems_solved: 0,
            notes: String::new(),
            occurred_on: on,
            logged_at: Utc::now(),
        }
    }

    fn many(category: Category, difficulty: Difficulty, count: usize) -> Vec<ActivityRecord> {
        (0..count)
            .map(|_| activity(category, 0, difficulty, day(0)))
            .collect()
    }

    #[test]
    fn empty_history_is_not_started() {
        let readiness = score_activities(&[]);
        assert_eq!(readiness.score, 0);
        assert_eq!(readiness.coding_consistency, 0);
        assert_eq!(readiness.category_score, 0);
        assert_eq!(readiness.time_score, 0);
        assert_eq!(readiness.aptitude_score, 0);
        assert_eq!(readiness.mock_score, 0);
        assert_eq!(readiness.status, ReadinessStatus::NotStarted);
        assert_eq!(readiness.total_activities, 0);
        assert_eq!(readiness.coding_days, 0);
    }

    #[test]
    fn consistency_counts_distinct_days_and_saturates_at_seven() {
        let mut activities = vec![
            activity(Category::Coding, 30, Difficulty::Easy, day(0)),
            activity(Category::Coding, 30, Difficulty::Easy, day(0)),
            activity(Category::Coding, 30, Difficulty::Easy, day(40)),
        ];
        let readiness = score_activities(&activities);
        assert_eq!(readiness.coding_days, 2);
        assert_eq!(readiness.coding_consistency, 29);

        // Dates spread over most of a year still count once seven are reached.
        activities = (0..10)
            .map(|n| activity(Category::Coding, 10, Difficulty::Easy, day(n * 35)))
            .collect();
        let readiness = score_activities(&activities);
        assert_eq!(readiness.coding_days, 10);
        assert_eq!(readiness.coding_consistency, 100);
    }

    #[test]
    fn non_coding_days_do_not_count_toward_consistency() {
        let activities = vec![
            activity(Category::Aptitude, 30, Difficulty::Easy, day(0)),
            activity(Category::Contest, 30, Difficulty::Easy, day(1)),
        ];
        let readiness = score_activities(&activities);
        assert_eq!(readiness.coding_days, 0);
        assert_eq!(readiness.coding_consistency, 0);
    }

    #[test]
    fn category_score_rewards_breadth() {
        let all: Vec<ActivityRecord> = Category::ALL
            .into_iter()
            .map(|category| activity(category, 0, Difficulty::Medium, day(0)))
            .collect();
        assert_eq!(score_activities(&all).category_score, 100);

        let expected = [0, 11, 22, 33, 44, 56, 67, 78, 89, 100];
        for k in 0..=Category::ALL.len() {
            let subset: Vec<ActivityRecord> = all.iter().take(k).cloned().collect();
            assert_eq!(score_activities(&subset).category_score, expected[k]);
        }

        let mut repeated = all.clone();
        repeated.extend(all);
        assert_eq!(score_activities(&repeated).category_score, 100);
    }

    #[test]
    fn time_score_is_linear_and_capped() {
        let half = vec![activity(Category::Os, 600, Difficulty::Medium, day(0))];
        assert_eq!(score_activities(&half).time_score, 50);

        let full = vec![
            activity(Category::Os, 1000, Difficulty::Medium, day(0)),
            activity(Category::Dbms, 900, Difficulty::Medium, day(1)),
        ];
        assert_eq!(score_activities(&full).time_score, 100);
    }

    #[test]
    fn aptitude_points_depend_on_difficulty() {
        let hard = many(Category::Aptitude, Difficulty::Hard, 1);
        assert_eq!(score_activities(&hard).aptitude_score, 10);

        let medium = many(Category::Aptitude, Difficulty::Medium, 1);
        assert_eq!(score_activities(&medium).aptitude_score, 5);

        let easy = many(Category::Aptitude, Difficulty::Easy, 1);
        assert_eq!(score_activities(&easy).aptitude_score, 5);

        let capped = many(Category::Aptitude, Difficulty::Hard, 12);
        assert_eq!(score_activities(&capped).aptitude_score, 100);
    }

    #[test]
    fn mock_interviews_cap_at_ten() {
        let ten = many(Category::MockInterview, Difficulty::Medium, 10);
        assert_eq!(score_activities(&ten).mock_score, 100);

        let eleven = many(Category::MockInterview, Difficulty::Medium, 11);
        assert_eq!(score_activities(&eleven).mock_score, 100);
    }

    #[test]
    fn composite_uses_weights_and_rounds() {
        let scores = SubScores {
            coding_consistency: 57.0,
            category: 44.0,
            time: 83.0,
            aptitude: 30.0,
            mock: 20.0,
        };
        let score = composite(&scores);
        assert_eq!(score, 50);
        assert_eq!(ReadinessStatus::from_score(score), ReadinessStatus::InProgress);

        let perfect = SubScores {
            coding_consistency: 100.0,
            category: 100.0,
            time: 100.0,
            aptitude: 100.0,
            mock: 100.0,
        };
        assert_eq!(composite(&perfect), 100);
    }

    #[test]
    fn mixed_history_scores_every_factor() {
        // Four coding days, four categories, 300 minutes, one hard aptitude.
        let activities = vec![
            activity(Category::Coding, 60, Difficulty::Easy, day(0)),
            activity(Category::Coding, 60, Difficulty::Easy, day(1)),
            activity(Category::Coding, 60, Difficulty::Easy, day(2)),
            activity(Category::Coding, 60, Difficulty::Easy, day(3)),
            activity(Category::Aptitude, 30, Difficulty::Hard, day(3)),
            activity(Category::Dbms, 15, Difficulty::Medium, day(4)),
            activity(Category::MockInterview, 15, Difficulty::Medium, day(5)),
        ];
        let readiness = score_activities(&activities);

        // 0.3*57.14 + 0.2*44.44 + 0.2*25 + 0.15*10 + 0.15*10 = 34.03
        assert_eq!(readiness.coding_consistency, 57);
        assert_eq!(readiness.category_score, 44);
        assert_eq!(readiness.time_score, 25);
        assert_eq!(readiness.score, 34);
        assert_eq!(readiness.status, ReadinessStatus::JustStarted);
        assert_eq!(readiness.total_activities, 7);
        assert_eq!(readiness.coding_days, 4);
    }

    #[test]
    fn status_boundaries_are_inclusive_at_lower_edge() {
        assert_eq!(ReadinessStatus::from_score(100), ReadinessStatus::PlacementReady);
        assert_eq!(ReadinessStatus::from_score(85), ReadinessStatus::PlacementReady);
        assert_eq!(ReadinessStatus::from_score(84), ReadinessStatus::AlmostReady);
        assert_eq!(ReadinessStatus::from_score(70), ReadinessStatus::AlmostReady);
        assert_eq!(ReadinessStatus::from_score(69), ReadinessStatus::InProgress);
        assert_eq!(ReadinessStatus::from_score(50), ReadinessStatus::InProgress);
        assert_eq!(ReadinessStatus::from_score(49), ReadinessStatus::JustStarted);
        assert_eq!(ReadinessStatus::from_score(25), ReadinessStatus::JustStarted);
        assert_eq!(ReadinessStatus::from_score(24), ReadinessStatus::NotStarted);
        assert_eq!(ReadinessStatus::from_score(0), ReadinessStatus::NotStarted);
    }

    struct InMemory(Vec<ActivityRecord>);

    impl ActivitySource for InMemory {
        async fn activities_for(
            &self,
            student_id: Uuid,
            since: Option<NaiveDate>,
        ) -> Result<Vec<ActivityRecord>, TrackerError> {
            Ok(self
                .0
                .iter()
                .filter(|activity| activity.student_id == student_id)
                .filter(|activity| since.map_or(true, |date| activity.occurred_on >= date))
                .cloned()
                .collect())
        }
    }

    struct Unavailable;

    impl ActivitySource for Unavailable {
        async fn activities_for(
            &self,
            _student_id: Uuid,
            _since: Option<NaiveDate>,
        ) -> Result<Vec<ActivityRecord>, TrackerError> {
            Err(TrackerError::DataUnavailable(sqlx::Error::PoolTimedOut))
        }
    }

    #[tokio::test]
    async fn assess_reports_unavailable_data_instead_of_zero() {
        let result = assess(&Unavailable, Uuid::new_v4(), ScoringWindow::AllTime).await;
        assert!(matches!(result, Err(TrackerError::DataUnavailable(_))));
    }

    #[tokio::test]
    async fn assess_scores_inactive_student_as_not_started() {
        let source = InMemory(Vec::new());
        let readiness = assess(&source, Uuid::new_v4(), ScoringWindow::AllTime)
            .await
            .unwrap();
        assert_eq!(readiness.score, 0);
        assert_eq!(readiness.status, ReadinessStatus::NotStarted);
    }

    #[tokio::test]
    async fn assess_honours_scoring_window() {
        let student_id = Uuid::new_v4();
        let mut old = activity(Category::Coding, 600, Difficulty::Easy, day(0));
        old.student_id = student_id;
        let mut recent = activity(Category::Coding, 600, Difficulty::Easy, day(30));
        recent.student_id = student_id;
        let mut other = activity(Category::Coding, 600, Difficulty::Easy, day(30));
        other.student_id = Uuid::new_v4();
        let source = InMemory(vec![old, recent, other]);

        let all_time = assess(&source, student_id, ScoringWindow::AllTime)
            .await
            .unwrap();
        assert_eq!(all_time.total_activities, 2);
        assert_eq!(all_time.time_score, 100);

        let windowed = assess(&source, student_id, ScoringWindow::Since(day(10)))
            .await
            .unwrap();
        assert_eq!(windowed.total_activities, 1);
        assert_eq!(windowed.time_score, 50);
        assert_eq!(windowed.coding_days, 1);
    }
}
