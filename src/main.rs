use std::path::PathBuf;

use anyhow::Context;
use chrono::{Duration, NaiveDate};
use clap::{Parser, Subcommand};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

mod analytics;
mod config;
mod dashboard;
mod db;
mod error;
mod goals;
mod models;
mod readiness;
mod report;
mod week;

use crate::db::ActivityFilter;
use crate::goals::{GoalCounters, GoalTargets};
use crate::models::{AnnouncementKind, Category, Difficulty, NewActivity, NewAnnouncement};
use crate::readiness::ScoringWindow;

#[derive(Parser)]
#[command(name = "readiness-tracker")]
#[command(about = "Placement readiness tracker for student study activity", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load demo students and activities
    Seed,
    /// Import activities from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Register a student, or update their details
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        branch: String,
        #[arg(long, default_value = "")]
        section: String,
    },
    /// Log a study activity
    Log {
        #[arg(long)]
        email: String,
        #[arg(long)]
        category: Category,
        #[arg(long)]
        minutes: u32,
        #[arg(long, default_value_t = Difficulty::Medium)]
        difficulty: Difficulty,
        #[arg(long, default_value_t = 0)]
        problems: u32,
        /// Day the activity happened (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Delete one of the student's activities
    Delete {
        #[arg(long)]
        email: String,
        #[arg(long)]
        id: Uuid,
    },
    /// List a student's activities, newest first
    Activities {
        #[arg(long)]
        email: String,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        category: Option<Category>,
    },
    /// Compute a student's readiness score
    Score {
        #[arg(long)]
        email: String,
        /// Only score activities on or after this date (default: whole history)
        #[arg(long)]
        since: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// Show a student's weekly dashboard
    Dashboard {
        #[arg(long)]
        email: String,
        #[arg(long)]
        json: bool,
    },
    /// Show this week's goals, creating defaults if none exist
    Goals {
        #[arg(long)]
        email: String,
    },
    /// Change this week's goal targets
    SetGoals {
        #[arg(long)]
        email: String,
        #[arg(long)]
        coding: Option<u32>,
        #[arg(long)]
        aptitude: Option<u32>,
        #[arg(long)]
        mock_interview: Option<u32>,
        #[arg(long)]
        core_subjects: Option<u32>,
    },
    /// Show progress against this week's goals
    Progress {
        #[arg(long)]
        email: String,
        #[arg(long)]
        json: bool,
    },
    /// List students
    Students {
        #[arg(long)]
        branch: Option<String>,
        #[arg(long)]
        section: Option<String>,
    },
    /// Detailed profile of one student
    Profile {
        #[arg(long)]
        email: String,
        #[arg(long)]
        json: bool,
    },
    /// Cohort-wide readiness statistics
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Export every student's readiness as CSV
    Export {
        #[arg(long)]
        branch: Option<String>,
        #[arg(long)]
        section: Option<String>,
        #[arg(long, default_value = "student-report.csv")]
        out: PathBuf,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        branch: Option<String>,
        #[arg(long)]
        section: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Post an announcement to every student
    Announce {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long, default_value_t = AnnouncementKind::Other)]
        kind: AnnouncementKind,
        /// Pin the announcement above the others
        #[arg(long)]
        important: bool,
        #[arg(long, default_value = "Placement cell")]
        author: String,
    },
    /// List announcements, important ones first
    Announcements {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = config::Config::from_env()?;
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;
    tracing::debug!(max_connections = config.max_connections, "connected to Postgres");

    let today = week::today();

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} activities from {}.", csv.display());
        }
        Commands::Register {
            name,
            email,
            branch,
            section,
        } => {
            let student = db::register_student(&pool, &name, &email, &branch, &section).await?;
            println!("Registered {} ({}) as {}.", student.name, student.email, student.id);
        }
        Commands::Log {
            email,
            category,
            minutes,
            difficulty,
            problems,
            date,
            notes,
        } => {
            let student = db::find_student_by_email(&pool, &email).await?;
            let activity = NewActivity {
                student_id: student.id,
                category,
                time_spent_minutes: minutes,
                difficulty,
                problems_solved: problems,
                notes,
                occurred_on: date.unwrap_or(today),
            };
            activity.validate()?;

            let record = db::insert_activity(&pool, &activity).await?;
            println!(
                "Logged {} minutes of {} on {} ({}).",
                record.time_spent_minutes, record.category, record.occurred_on, record.id
            );
        }
        Commands::Delete { email, id } => {
            let student = db::find_student_by_email(&pool, &email).await?;
            db::delete_activity(&pool, student.id, id).await?;
            println!("Activity {id} deleted.");
        }
        Commands::Activities {
            email,
            from,
            to,
            category,
        } => {
            let student = db::find_student_by_email(&pool, &email).await?;
            let filter = ActivityFilter { from, to, category };
            let activities = db::fetch_activities(&pool, student.id, &filter).await?;

            if activities.is_empty() {
                println!("No activities found.");
                return Ok(());
            }

            for activity in &activities {
                println!(
                    "- {} {} {} min, {}, {} solved [{}] {}",
                    activity.occurred_on,
                    activity.category,
                    activity.time_spent_minutes,
                    activity.difficulty,
                    activity.problems_solved,
                    activity.id,
                    activity.notes
                );
            }
        }
        Commands::Score { email, since, json } => {
            let student = db::find_student_by_email(&pool, &email).await?;
            let window = since.map_or(ScoringWindow::AllTime, ScoringWindow::Since);
            let score = readiness::assess(&pool, student.id, window)
                .await
                .with_context(|| format!("could not compute readiness for {email}"))?;

            if json {
                return print_json(&score);
            }

            println!("{} ({}): {} / 100, {}", student.name, student.email, score.score, score.status);
            println!("- coding consistency {} ({} coding days)", score.coding_consistency, score.coding_days);
            println!("- category breadth   {}", score.category_score);
            println!("- time invested      {}", score.time_score);
            println!("- aptitude           {}", score.aptitude_score);
            println!("- mock interviews    {}", score.mock_score);
            println!("across {} activities", score.total_activities);
        }
        Commands::Dashboard { email, json } => {
            let student = db::find_student_by_email(&pool, &email).await?;
            let history = db::fetch_activities(&pool, student.id, &ActivityFilter::default()).await?;
            let weekly = dashboard::build_weekly_dashboard(&history, today);

            if json {
                return print_json(&weekly);
            }

            println!("Week of {} for {}", weekly.week_start, student.name);
            for day in &weekly.days {
                println!(
                    "- {} {}: {} activities, {} min",
                    day.label, day.date, day.count, day.total_minutes
                );
            }
            for summary in &weekly.categories {
                println!(
                    "- {}: {} activities, {} min",
                    summary.category, summary.count, summary.total_minutes
                );
            }
            println!(
                "{} activities, {:.1} hours this week, {}-day streak",
                weekly.total_activities, weekly.total_hours, weekly.streak
            );
            println!(
                "Readiness {} / 100 ({})",
                weekly.readiness.score, weekly.readiness.status
            );
        }
        Commands::Goals { email } => {
            let student = db::find_student_by_email(&pool, &email).await?;
            let goal = db::find_or_create_goal(&pool, student.id, week::iso_week(today)).await?;
            let lines = goals::progress(&goal);

            println!("Goals for {} in {}", student.name, goal.week);
            print_goal_line("coding problems", lines.coding);
            print_goal_line("aptitude hours", lines.aptitude);
            print_goal_line("mock interviews", lines.mock_interview);
            print_goal_line("core subject hours", lines.core_subjects);
        }
        Commands::SetGoals {
            email,
            coding,
            aptitude,
            mock_interview,
            core_subjects,
        } => {
            let targets = GoalTargets {
                coding,
                aptitude,
                mock_interview,
                core_subjects,
            };
            targets.validate()?;

            let student = db::find_student_by_email(&pool, &email).await?;
            let mut goal = db::find_or_create_goal(&pool, student.id, week::iso_week(today)).await?;
            targets.apply(&mut goal);
            let goal = db::save_goal(&pool, &goal).await?;
            tracing::info!(student_id = %student.id, week = %goal.week, "goal targets updated");
            println!("Goals set for {}.", goal.week);
        }
        Commands::Progress { email, json } => {
            let student = db::find_student_by_email(&pool, &email).await?;
            let current_week = week::iso_week(today);
            let mut goal = db::find_or_create_goal(&pool, student.id, current_week).await?;

            let monday = week::week_start(today);
            let filter = ActivityFilter {
                from: Some(monday),
                to: Some(monday + Duration::days(6)),
                category: None,
            };
            let activities = db::fetch_activities(&pool, student.id, &filter).await?;
            GoalCounters::from_activities(&activities, current_week).apply(&mut goal);
            let goal = db::save_goal(&pool, &goal).await?;
            let lines = goals::progress(&goal);

            if json {
                return print_json(&lines);
            }

            println!("Progress for {} in {}", student.name, lines.week);
            print_goal_line("coding problems", lines.coding);
            print_goal_line("aptitude hours", lines.aptitude);
            print_goal_line("mock interviews", lines.mock_interview);
            print_goal_line("core subject hours", lines.core_subjects);
        }
        Commands::Students { branch, section } => {
            let students = db::list_students(&pool, branch.as_deref(), section.as_deref()).await?;

            if students.is_empty() {
                println!("No students found.");
                return Ok(());
            }

            for student in &students {
                println!(
                    "- {} ({}) {} {}",
                    student.name, student.email, student.branch, student.section
                );
            }
        }
        Commands::Profile { email, json } => {
            let student = db::find_student_by_email(&pool, &email).await?;
            let history = db::fetch_activities(&pool, student.id, &ActivityFilter::default()).await?;
            let profile = analytics::student_profile(student, history);

            if json {
                return print_json(&profile);
            }

            println!(
                "{} ({}, {} {}): {} / 100, {}",
                profile.student.name,
                profile.student.email,
                profile.student.branch,
                profile.student.section,
                profile.readiness.score,
                profile.readiness.status
            );
            println!("{} activities logged", profile.total_activities);
            println!("Weakest categories:");
            for summary in &profile.weak_categories {
                println!("- {}: {} activities", summary.category, summary.count);
            }
            println!("Weekly trend:");
            for trend in &profile.performance_trend {
                println!("- {}: {} activities, {} min", trend.week, trend.count, trend.total_minutes);
            }
        }
        Commands::Stats { json } => {
            let students = db::list_students(&pool, None, None).await?;
            let activities = db::fetch_all_activities(&pool).await?;
            let stats = analytics::dashboard_stats(&students, &activities, today);

            if json {
                return print_json(&stats);
            }

            println!(
                "{} students, {} active in the last week, average readiness {}",
                stats.total_students, stats.active_students, stats.average_readiness
            );
            println!("Status mix:");
            for entry in &stats.distribution {
                println!("- {}: {}", entry.status, entry.count);
            }
            println!("Top performers:");
            for entry in &stats.top_performers {
                println!(
                    "- {} ({}) score {}",
                    entry.student.name, entry.student.email, entry.readiness.score
                );
            }
            println!("Low coding consistency:");
            for entry in &stats.low_consistency {
                println!(
                    "- {} ({}) consistency {}",
                    entry.student.name, entry.student.email, entry.readiness.coding_consistency
                );
            }
        }
        Commands::Export {
            branch,
            section,
            out,
        } => {
            let students = db::list_students(&pool, branch.as_deref(), section.as_deref()).await?;
            let activities = db::fetch_all_activities(&pool).await?;
            let ranked = analytics::score_cohort(&students, &activities);

            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            report::export_csv(file, &ranked)?;
            println!("Exported {} students to {}.", ranked.len(), out.display());
        }
        Commands::Report {
            branch,
            section,
            out,
        } => {
            let students = db::list_students(&pool, branch.as_deref(), section.as_deref()).await?;
            let activities = db::fetch_all_activities(&pool).await?;
            let ranked = analytics::score_cohort(&students, &activities);

            let scope = match (branch.as_deref(), section.as_deref()) {
                (Some(branch), Some(section)) => Some(format!("{branch} section {section}")),
                (Some(branch), None) => Some(branch.to_string()),
                (None, Some(section)) => Some(format!("section {section}")),
                (None, None) => None,
            };
            let report = report::build_report(scope.as_deref(), today, &ranked, &activities);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Announce {
            title,
            description,
            kind,
            important,
            author,
        } => {
            let announcement = NewAnnouncement {
                title,
                description,
                kind,
                author,
                important,
            };
            announcement.validate()?;

            let posted = db::insert_announcement(&pool, &announcement).await?;
            println!("Posted \"{}\" ({}).", posted.title, posted.id);
        }
        Commands::Announcements { json } => {
            let announcements = db::list_announcements(&pool).await?;

            if json {
                return print_json(&announcements);
            }

            if announcements.is_empty() {
                println!("No announcements.");
                return Ok(());
            }

            for announcement in &announcements {
                let marker = if announcement.important { "[important] " } else { "" };
                println!(
                    "- {}{} ({}, {} by {})",
                    marker,
                    announcement.title,
                    announcement.kind,
                    announcement.posted_at.date_naive(),
                    announcement.author
                );
                println!("  {}", announcement.description);
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "readiness_tracker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_goal_line(label: &str, line: goals::ProgressLine) {
    println!(
        "- {label}: {} / {} ({}%)",
        line.completed, line.target, line.percentage
    );
}
