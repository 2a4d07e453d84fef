use anyhow::Context;
use chrono::{Duration, NaiveDate};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::TrackerError;
use crate::goals;
use crate::models::{
    ActivityRecord, Announcement, Category, Difficulty, GoalRecord, NewActivity,
    NewAnnouncement, Student, SubGoal,
};
use crate::readiness::ActivitySource;
use crate::week::{self, IsoWeek};

const STUDENT_COLUMNS: &str = "id, full_name, email, branch, section, registered_at";

const ACTIVITY_COLUMNS: &str = "id, student_id, category, time_spent_minutes, difficulty, \
     problems_solved, notes, occurred_on, logged_at";

const GOAL_COLUMNS: &str = "id, student_id, iso_year, iso_week, \
     coding_target, coding_completed, aptitude_target, aptitude_completed, \
     mock_interview_target, mock_interview_completed, \
     core_subjects_target, core_subjects_completed, created_at, updated_at";

const ANNOUNCEMENT_COLUMNS: &str = "id, title, description, kind, author, important, posted_at";

/// Optional narrowing for an activity listing. The default lists everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub category: Option<Category>,
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let students = vec![
        ("Avery Lee", "avery.lee@campus.edu", "CSE", "A"),
        ("Jules Moreno", "jules.moreno@campus.edu", "CSE", "B"),
        ("Kiara Patel", "kiara.patel@campus.edu", "ECE", "A"),
    ];

    for (name, email, branch, section) in students {
        register_student(pool, name, email, branch, section).await?;
    }

    let today = week::today();
    let activities = vec![
        ("seed-001", "avery.lee@campus.edu", Category::Coding, 90, Difficulty::Medium, 4, "Two-pointer practice", 0),
        ("seed-002", "avery.lee@campus.edu", Category::Coding, 75, Difficulty::Hard, 2, "Graph shortest paths", 1),
        ("seed-003", "avery.lee@campus.edu", Category::Coding, 60, Difficulty::Easy, 6, "Array warm-ups", 2),
        ("seed-004", "avery.lee@campus.edu", Category::Aptitude, 45, Difficulty::Hard, 0, "Time and work set", 2),
        ("seed-005", "avery.lee@campus.edu", Category::Dbms, 60, Difficulty::Medium, 0, "Normalization revision", 3),
        ("seed-006", "avery.lee@campus.edu", Category::MockInterview, 45, Difficulty::Medium, 0, "Peer mock, DSA round", 4),
        ("seed-007", "jules.moreno@campus.edu", Category::Os, 40, Difficulty::Medium, 0, "Scheduling algorithms", 1),
        ("seed-008", "jules.moreno@campus.edu", Category::Coding, 30, Difficulty::Easy, 3, "String basics", 9),
        ("seed-009", "kiara.patel@campus.edu", Category::Softskills, 30, Difficulty::Easy, 0, "Group discussion practice", 20),
    ];

    for (source_key, email, category, minutes, difficulty, problems, note, days_ago) in activities {
        let student = find_student_by_email(pool, email).await?;
        let activity = NewActivity {
            student_id: student.id,
            category,
            time_spent_minutes: minutes,
            difficulty,
            problems_solved: problems,
            notes: note.to_string(),
            occurred_on: today - Duration::days(days_ago),
        };
        insert_keyed_activity(pool, &activity, source_key).await?;
    }

    tracing::info!("seed data in place");
    Ok(())
}

pub async fn register_student(
    pool: &PgPool,
    name: &str,
    email: &str,
    branch: &str,
    section: &str,
) -> Result<Student, TrackerError> {
    let query = format!(
        "INSERT INTO placement_readiness.students (id, full_name, email, branch, section) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (email) DO UPDATE \
         SET full_name = EXCLUDED.full_name, branch = EXCLUDED.branch, section = EXCLUDED.section \
         RETURNING {STUDENT_COLUMNS}"
    );

    let row = sqlx::query(&query)
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email)
        .bind(branch)
        .bind(section)
        .fetch_one(pool)
        .await?;

    let student = student_from_row(&row)?;
    tracing::debug!(student_id = %student.id, email, "student registered");
    Ok(student)
}

pub async fn find_student_by_email(pool: &PgPool, email: &str) -> Result<Student, TrackerError> {
    let query = format!("SELECT {STUDENT_COLUMNS} FROM placement_readiness.students WHERE email = $1");

    let row = sqlx::query(&query)
        .bind(email)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| TrackerError::StudentNotFound(email.to_string()))?;

    student_from_row(&row)
}

pub async fn list_students(
    pool: &PgPool,
    branch: Option<&str>,
    section: Option<&str>,
) -> Result<Vec<Student>, TrackerError> {
    let query = format!(
        "SELECT {STUDENT_COLUMNS} FROM placement_readiness.students \
         WHERE ($1::text IS NULL OR branch = $1) \
         AND ($2::text IS NULL OR section = $2) \
         ORDER BY full_name"
    );

    let rows = sqlx::query(&query)
        .bind(branch)
        .bind(section)
        .fetch_all(pool)
        .await?;

    rows.iter().map(student_from_row).collect()
}

pub async fn insert_activity(
    pool: &PgPool,
    activity: &NewActivity,
) -> Result<ActivityRecord, TrackerError> {
    let query = format!(
        "INSERT INTO placement_readiness.activities \
         (id, student_id, category, time_spent_minutes, difficulty, problems_solved, notes, occurred_on) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING {ACTIVITY_COLUMNS}"
    );

    let row = sqlx::query(&query)
        .bind(Uuid::new_v4())
        .bind(activity.student_id)
        .bind(activity.category.as_str())
        .bind(to_db("time_spent_minutes", activity.time_spent_minutes)?)
        .bind(activity.difficulty.as_str())
        .bind(to_db("problems_solved", activity.problems_solved)?)
        .bind(&activity.notes)
        .bind(activity.occurred_on)
        .fetch_one(pool)
        .await?;

    let record = activity_from_row(&row)?;
    tracing::info!(
        activity_id = %record.id,
        student_id = %record.student_id,
        category = %record.category,
        minutes = record.time_spent_minutes,
        "activity logged"
    );
    Ok(record)
}

/// Inserts an activity unless one with the same `source_key` already exists.
/// Returns whether a row was written.
async fn insert_keyed_activity(
    pool: &PgPool,
    activity: &NewActivity,
    source_key: &str,
) -> Result<bool, TrackerError> {
    let result = sqlx::query(
        r#"
        INSERT INTO placement_readiness.activities
        (id, student_id, category, time_spent_minutes, difficulty, problems_solved, notes, occurred_on, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(activity.student_id)
    .bind(activity.category.as_str())
    .bind(to_db("time_spent_minutes", activity.time_spent_minutes)?)
    .bind(activity.difficulty.as_str())
    .bind(to_db("problems_solved", activity.problems_solved)?)
    .bind(&activity.notes)
    .bind(activity.occurred_on)
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Deletes one of the student's own activities.
pub async fn delete_activity(
    pool: &PgPool,
    student_id: Uuid,
    activity_id: Uuid,
) -> Result<(), TrackerError> {
    let result = sqlx::query(
        "DELETE FROM placement_readiness.activities WHERE id = $1 AND student_id = $2",
    )
    .bind(activity_id)
    .bind(student_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(TrackerError::ActivityNotFound(activity_id));
    }

    tracing::info!(%activity_id, %student_id, "activity deleted");
    Ok(())
}

pub async fn fetch_activities(
    pool: &PgPool,
    student_id: Uuid,
    filter: &ActivityFilter,
) -> Result<Vec<ActivityRecord>, TrackerError> {
    let query = format!(
        "SELECT {ACTIVITY_COLUMNS} FROM placement_readiness.activities \
         WHERE student_id = $1 \
         AND ($2::date IS NULL OR occurred_on >= $2) \
         AND ($3::date IS NULL OR occurred_on <= $3) \
         AND ($4::text IS NULL OR category = $4) \
         ORDER BY occurred_on DESC, logged_at DESC"
    );

    let rows = sqlx::query(&query)
        .bind(student_id)
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.category.map(Category::as_str))
        .fetch_all(pool)
        .await?;

    rows.iter().map(activity_from_row).collect()
}

/// Every student's activities in one read, so cohort analytics see a single snapshot.
pub async fn fetch_all_activities(pool: &PgPool) -> Result<Vec<ActivityRecord>, TrackerError> {
    let query = format!(
        "SELECT {ACTIVITY_COLUMNS} FROM placement_readiness.activities \
         ORDER BY occurred_on DESC, logged_at DESC"
    );

    let rows = sqlx::query(&query).fetch_all(pool).await?;
    rows.iter().map(activity_from_row).collect()
}

impl ActivitySource for PgPool {
    async fn activities_for(
        &self,
        student_id: Uuid,
        since: Option<NaiveDate>,
    ) -> Result<Vec<ActivityRecord>, TrackerError> {
        let filter = ActivityFilter {
            from: since,
            ..ActivityFilter::default()
        };
        fetch_activities(self, student_id, &filter).await
    }
}

/// Returns the student's goal for `week`, creating it with default targets if absent.
pub async fn find_or_create_goal(
    pool: &PgPool,
    student_id: Uuid,
    week: IsoWeek,
) -> Result<GoalRecord, TrackerError> {
    let [coding, aptitude, mock_interview, core_subjects] = goals::default_sub_goals();

    let created = sqlx::query(
        r#"
        INSERT INTO placement_readiness.goals
        (id, student_id, iso_year, iso_week,
         coding_target, aptitude_target, mock_interview_target, core_subjects_target)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (student_id, iso_year, iso_week) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(week.year)
    .bind(to_db("iso_week", week.week)?)
    .bind(to_db("coding_target", coding.target)?)
    .bind(to_db("aptitude_target", aptitude.target)?)
    .bind(to_db("mock_interview_target", mock_interview.target)?)
    .bind(to_db("core_subjects_target", core_subjects.target)?)
    .execute(pool)
    .await?;

    if created.rows_affected() > 0 {
        tracing::info!(%student_id, %week, "weekly goal created with default targets");
    }

    let query = format!(
        "SELECT {GOAL_COLUMNS} FROM placement_readiness.goals \
         WHERE student_id = $1 AND iso_year = $2 AND iso_week = $3"
    );
    let row = sqlx::query(&query)
        .bind(student_id)
        .bind(week.year)
        .bind(to_db("iso_week", week.week)?)
        .fetch_one(pool)
        .await?;

    goal_from_row(&row)
}

/// Writes targets and completed counters back, bumping `updated_at`.
pub async fn save_goal(pool: &PgPool, goal: &GoalRecord) -> Result<GoalRecord, TrackerError> {
    let query = format!(
        "UPDATE placement_readiness.goals SET \
         coding_target = $2, coding_completed = $3, \
         aptitude_target = $4, aptitude_completed = $5, \
         mock_interview_target = $6, mock_interview_completed = $7, \
         core_subjects_target = $8, core_subjects_completed = $9, \
         updated_at = now() \
         WHERE id = $1 \
         RETURNING {GOAL_COLUMNS}"
    );

    let row = sqlx::query(&query)
        .bind(goal.id)
        .bind(to_db("coding_target", goal.coding.target)?)
        .bind(to_db("coding_completed", goal.coding.completed)?)
        .bind(to_db("aptitude_target", goal.aptitude.target)?)
        .bind(to_db("aptitude_completed", goal.aptitude.completed)?)
        .bind(to_db("mock_interview_target", goal.mock_interview.target)?)
        .bind(to_db("mock_interview_completed", goal.mock_interview.completed)?)
        .bind(to_db("core_subjects_target", goal.core_subjects.target)?)
        .bind(to_db("core_subjects_completed", goal.core_subjects.completed)?)
        .fetch_one(pool)
        .await?;

    goal_from_row(&row)
}

pub async fn insert_announcement(
    pool: &PgPool,
    announcement: &NewAnnouncement,
) -> Result<Announcement, TrackerError> {
    announcement.validate()?;

    let query = format!(
        "INSERT INTO placement_readiness.announcements \
         (id, title, description, kind, author, important) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {ANNOUNCEMENT_COLUMNS}"
    );

    let row = sqlx::query(&query)
        .bind(Uuid::new_v4())
        .bind(announcement.title.trim())
        .bind(announcement.description.trim())
        .bind(announcement.kind.as_str())
        .bind(&announcement.author)
        .bind(announcement.important)
        .fetch_one(pool)
        .await?;

    let posted = announcement_from_row(&row)?;
    tracing::info!(
        announcement_id = %posted.id,
        kind = %posted.kind,
        important = posted.important,
        "announcement posted"
    );
    Ok(posted)
}

/// Important announcements first, newest first within each group.
pub async fn list_announcements(pool: &PgPool) -> Result<Vec<Announcement>, TrackerError> {
    let query = format!(
        "SELECT {ANNOUNCEMENT_COLUMNS} FROM placement_readiness.announcements \
         ORDER BY important DESC, posted_at DESC"
    );

    let rows = sqlx::query(&query).fetch_all(pool).await?;
    rows.iter().map(announcement_from_row).collect()
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        full_name: String,
        email: String,
        #[serde(default)]
        branch: String,
        #[serde(default)]
        section: String,
        category: Category,
        time_spent_minutes: u32,
        difficulty: Option<Difficulty>,
        problems_solved: Option<u32>,
        notes: Option<String>,
        occurred_on: NaiveDate,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid CSV record {}", line + 1))?;
        let student =
            register_student(pool, &row.full_name, &row.email, &row.branch, &row.section).await?;

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let activity = NewActivity {
            student_id: student.id,
            category: row.category,
            time_spent_minutes: row.time_spent_minutes,
            difficulty: row.difficulty.unwrap_or_default(),
            problems_solved: row.problems_solved.unwrap_or(0),
            notes: row.notes.unwrap_or_default(),
            occurred_on: row.occurred_on,
        };

        if insert_keyed_activity(pool, &activity, &source_key).await? {
            inserted += 1;
        } else {
            tracing::debug!(%source_key, "skipping already imported activity");
        }
    }

    tracing::info!(inserted, path = %csv_path.display(), "activity import finished");
    Ok(inserted)
}

fn student_from_row(row: &PgRow) -> Result<Student, TrackerError> {
    Ok(Student {
        id: row.try_get("id")?,
        name: row.try_get("full_name")?,
        email: row.try_get("email")?,
        branch: row.try_get("branch")?,
        section: row.try_get("section")?,
        registered_at: row.try_get("registered_at")?,
    })
}

fn activity_from_row(row: &PgRow) -> Result<ActivityRecord, TrackerError> {
    let category: String = row.try_get("category")?;
    let difficulty: String = row.try_get("difficulty")?;

    Ok(ActivityRecord {
        id: row.try_get("id")?,
        student_id: row.try_get("student_id")?,
        category: category.parse()?,
        time_spent_minutes: from_db("time_spent_minutes", row.try_get("time_spent_minutes")?)?,
        difficulty: difficulty.parse()?,
        problems_solved: from_db("problems_solved", row.try_get("problems_solved")?)?,
        notes: row.try_get("notes")?,
        occurred_on: row.try_get("occurred_on")?,
        logged_at: row.try_get("logged_at")?,
    })
}

fn goal_from_row(row: &PgRow) -> Result<GoalRecord, TrackerError> {
    let sub_goal = |target: &'static str, completed: &'static str| -> Result<SubGoal, TrackerError> {
        Ok(SubGoal {
            target: from_db(target, row.try_get(target)?)?,
            completed: from_db(completed, row.try_get(completed)?)?,
        })
    };

    Ok(GoalRecord {
        id: row.try_get("id")?,
        student_id: row.try_get("student_id")?,
        week: IsoWeek {
            year: row.try_get("iso_year")?,
            week: from_db("iso_week", row.try_get("iso_week")?)?,
        },
        coding: sub_goal("coding_target", "coding_completed")?,
        aptitude: sub_goal("aptitude_target", "aptitude_completed")?,
        mock_interview: sub_goal("mock_interview_target", "mock_interview_completed")?,
        core_subjects: sub_goal("core_subjects_target", "core_subjects_completed")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn announcement_from_row(row: &PgRow) -> Result<Announcement, TrackerError> {
    let kind: String = row.try_get("kind")?;

    Ok(Announcement {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        kind: kind.parse()?,
        author: row.try_get("author")?,
        important: row.try_get("important")?,
        posted_at: row.try_get("posted_at")?,
    })
}

fn to_db(kind: &'static str, value: u32) -> Result<i32, TrackerError> {
    i32::try_from(value).map_err(|_| TrackerError::InvalidValue {
        kind,
        value: value.to_string(),
    })
}

fn from_db(kind: &'static str, value: i32) -> Result<u32, TrackerError> {
    u32::try_from(value).map_err(|_| TrackerError::InvalidValue {
        kind,
        value: value.to_string(),
    })
}
