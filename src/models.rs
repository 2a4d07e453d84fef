use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TrackerError;
use crate::week::IsoWeek;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Coding,
    Aptitude,
    Os,
    Dbms,
    Cn,
    Oops,
    Softskills,
    MockInterview,
    Contest,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Coding,
        Category::Aptitude,
        Category::Os,
        Category::Dbms,
        Category::Cn,
        Category::Oops,
        Category::Softskills,
        Category::MockInterview,
        Category::Contest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Coding => "coding",
            Category::Aptitude => "aptitude",
            Category::Os => "os",
            Category::Dbms => "dbms",
            Category::Cn => "cn",
            Category::Oops => "oops",
            Category::Softskills => "softskills",
            Category::MockInterview => "mock_interview",
            Category::Contest => "contest",
        }
    }

    /// Operating systems, databases, networks and OOP count toward the core-subjects goal.
    pub fn is_core_subject(self) -> bool {
        matches!(
            self,
            Category::Os | Category::Dbms | Category::Cn | Category::Oops
        )
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = TrackerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == value.trim())
            .ok_or_else(|| TrackerError::InvalidValue {
                kind: "category",
                value: value.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = TrackerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(TrackerError::InvalidValue {
                kind: "difficulty",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub branch: String,
    pub section: String,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub id: Uuid,
    pub student_id: Uuid,
    pub category: Category,
    pub time_spent_minutes: u32,
    pub difficulty: Difficulty,
    pub problems_solved: u32,
    pub notes: String,
    pub occurred_on: NaiveDate,
    pub logged_at: DateTime<Utc>,
}

/// An activity as submitted by its owner, before the store assigns an id.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub student_id: Uuid,
    pub category: Category,
    pub time_spent_minutes: u32,
    pub difficulty: Difficulty,
    pub problems_solved: u32,
    pub notes: String,
    pub occurred_on: NaiveDate,
}

impl NewActivity {
    /// Logged activities need some time spent; zero-minute entries are rejected.
    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.time_spent_minutes == 0 {
            return Err(TrackerError::Validation(
                "time spent must be at least one minute".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubGoal {
    pub target: u32,
    pub completed: u32,
}

impl SubGoal {
    pub fn new(target: u32) -> Self {
        Self {
            target,
            completed: 0,
        }
    }

    /// Rounded completion percentage. Not capped: overshooting a target reads above 100.
    pub fn percentage(&self) -> u32 {
        if self.target == 0 {
            return 0;
        }
        (f64::from(self.completed) / f64::from(self.target) * 100.0).round() as u32
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalRecord {
    pub id: Uuid,
    pub student_id: Uuid,
    pub week: IsoWeek,
    pub coding: SubGoal,
    pub aptitude: SubGoal,
    pub mock_interview: SubGoal,
    pub core_subjects: SubGoal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnouncementKind {
    PlacementDrive,
    Test,
    InterviewSchedule,
    #[default]
    Other,
}

impl AnnouncementKind {
    pub const ALL: [AnnouncementKind; 4] = [
        AnnouncementKind::PlacementDrive,
        AnnouncementKind::Test,
        AnnouncementKind::InterviewSchedule,
        AnnouncementKind::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AnnouncementKind::PlacementDrive => "placement_drive",
            AnnouncementKind::Test => "test",
            AnnouncementKind::InterviewSchedule => "interview_schedule",
            AnnouncementKind::Other => "other",
        }
    }
}

impl fmt::Display for AnnouncementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnnouncementKind {
    type Err = TrackerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        AnnouncementKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value.trim())
            .ok_or_else(|| TrackerError::InvalidValue {
                kind: "announcement kind",
                value: value.to_string(),
            })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub kind: AnnouncementKind,
    pub author: String,
    pub important: bool,
    pub posted_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAnnouncement {
    pub title: String,
    pub description: String,
    pub kind: AnnouncementKind,
    pub author: String,
    pub important: bool,
}

impl NewAnnouncement {
    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.title.trim().is_empty() || self.description.trim().is_empty() {
            return Err(TrackerError::Validation(
                "announcement title and description are required".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ReadinessStatus {
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "Just Started")]
    JustStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Almost Ready")]
    AlmostReady,
    #[serde(rename = "Placement Ready")]
    PlacementReady,
}

impl ReadinessStatus {
    /// Highest first, the order reports list them in.
    pub const DESCENDING: [ReadinessStatus; 5] = [
        ReadinessStatus::PlacementReady,
        ReadinessStatus::AlmostReady,
        ReadinessStatus::InProgress,
        ReadinessStatus::JustStarted,
        ReadinessStatus::NotStarted,
    ];

    pub fn from_score(score: u8) -> Self {
        match score {
            85.. => ReadinessStatus::PlacementReady,
            70..=84 => ReadinessStatus::AlmostReady,
            50..=69 => ReadinessStatus::InProgress,
            25..=49 => ReadinessStatus::JustStarted,
            _ => ReadinessStatus::NotStarted,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReadinessStatus::PlacementReady => "Placement Ready",
            ReadinessStatus::AlmostReady => "Almost Ready",
            ReadinessStatus::InProgress => "In Progress",
            ReadinessStatus::JustStarted => "Just Started",
            ReadinessStatus::NotStarted => "Not Started",
        }
    }
}

impl fmt::Display for ReadinessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessScore {
    pub score: u8,
    pub coding_consistency: u8,
    pub category_score: u8,
    pub time_score: u8,
    pub aptitude_score: u8,
    pub mock_score: u8,
    pub status: ReadinessStatus,
    pub total_activities: usize,
    pub coding_days: usize,
}
