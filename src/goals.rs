use serde::Serialize;

use crate::error::TrackerError;
use crate::models::{ActivityRecord, Category, GoalRecord, SubGoal};
use crate::week::{iso_week, IsoWeek};

pub const DEFAULT_CODING_TARGET: u32 = 20;
pub const DEFAULT_APTITUDE_TARGET: u32 = 10;
pub const DEFAULT_MOCK_INTERVIEW_TARGET: u32 = 2;
pub const DEFAULT_CORE_SUBJECTS_TARGET: u32 = 5;

/// Targets a student asked to change. `None` leaves the stored target alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GoalTargets {
    pub coding: Option<u32>,
    pub aptitude: Option<u32>,
    pub mock_interview: Option<u32>,
    pub core_subjects: Option<u32>,
}

impl GoalTargets {
    pub fn validate(&self) -> Result<(), TrackerError> {
        let fields = [
            ("coding", self.coding),
            ("aptitude", self.aptitude),
            ("mock interview", self.mock_interview),
            ("core subjects", self.core_subjects),
        ];

        for (name, target) in fields {
            if target == Some(0) {
                return Err(TrackerError::Validation(format!(
                    "{name} target must be positive"
                )));
            }
        }
        Ok(())
    }

    pub fn apply(&self, goal: &mut GoalRecord) {
        if let Some(target) = self.coding {
            goal.coding.target = target;
        }
        if let Some(target) = self.aptitude {
            goal.aptitude.target = target;
        }
        if let Some(target) = self.mock_interview {
            goal.mock_interview.target = target;
        }
        if let Some(target) = self.core_subjects {
            goal.core_subjects.target = target;
        }
    }
}

/// Completed counters for one ISO week.
///
/// Coding counts problems solved, aptitude and core subjects count whole
/// hours, mock interviews count sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GoalCounters {
    pub coding: u32,
    pub aptitude: u32,
    pub mock_interview: u32,
    pub core_subjects: u32,
}

impl GoalCounters {
    pub fn from_activities(activities: &[ActivityRecord], week: IsoWeek) -> Self {
        let mut coding = 0u64;
        let mut aptitude_minutes = 0u64;
        let mut mock_interview = 0u64;
        let mut core_minutes = 0u64;

        for activity in activities
            .iter()
            .filter(|activity| iso_week(activity.occurred_on) == week)
        {
            match activity.category {
                Category::Coding => coding += u64::from(activity.problems_solved),
                Category::Aptitude => {
                    aptitude_minutes += u64::from(activity.time_spent_minutes)
                }
                Category::MockInterview => mock_interview += 1,
                category if category.is_core_subject() => {
                    core_minutes += u64::from(activity.time_spent_minutes)
                }
                _ => {}
            }
        }

        Self {
            coding: saturate(coding),
            aptitude: saturate(aptitude_minutes / 60),
            mock_interview: saturate(mock_interview),
            core_subjects: saturate(core_minutes / 60),
        }
    }

    pub fn apply(&self, goal: &mut GoalRecord) {
        goal.coding.completed = self.coding;
        goal.aptitude.completed = self.aptitude;
        goal.mock_interview.completed = self.mock_interview;
        goal.core_subjects.completed = self.core_subjects;
    }
}

/// Completed counters are stored in INTEGER columns.
const MAX_COUNTER: u32 = i32::MAX as u32;

fn saturate(total: u64) -> u32 {
    u32::try_from(total).map_or(MAX_COUNTER, |total| total.min(MAX_COUNTER))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressLine {
    pub target: u32,
    pub completed: u32,
    pub percentage: u32,
}

impl From<SubGoal> for ProgressLine {
    fn from(goal: SubGoal) -> Self {
        Self {
            target: goal.target,
            completed: goal.completed,
            percentage: goal.percentage(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    pub week: IsoWeek,
    pub coding: ProgressLine,
    pub aptitude: ProgressLine,
    pub mock_interview: ProgressLine,
    pub core_subjects: ProgressLine,
}

pub fn progress(goal: &GoalRecord) -> GoalProgress {
    GoalProgress {
        week: goal.week,
        coding: goal.coding.into(),
        aptitude: goal.aptitude.into(),
        mock_interview: goal.mock_interview.into(),
        core_subjects: goal.core_subjects.into(),
    }
}

pub fn default_sub_goals() -> [SubGoal; 4] {
    [
        SubGoal::new(DEFAULT_CODING_TARGET),
        SubGoal::new(DEFAULT_APTITUDE_TARGET),
        SubGoal::new(DEFAULT_MOCK_INTERVIEW_TARGET),
        SubGoal::new(DEFAULT_CORE_SUBJECTS_TARGET),
    ]
}
