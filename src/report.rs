use std::collections::HashMap;
use std::fmt::Write;

use chrono::NaiveDate;
use serde::Serialize;

use crate::analytics::{self, StudentReadiness};
use crate::models::ActivityRecord;

const HIGHLIGHT_LIMIT: usize = 10;
const ATTENTION_LIMIT: usize = 5;
const RECENT_NOTES_LIMIT: usize = 5;

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    name: &'a str,
    email: &'a str,
    branch: &'a str,
    section: &'a str,
    total_activities: usize,
    readiness_score: u8,
    status: &'static str,
    coding_days: usize,
    registered_on: NaiveDate,
}

/// One CSV row per student, in the order given.
pub fn export_csv<W: std::io::Write>(
    writer: W,
    ranked: &[StudentReadiness],
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);

    for entry in ranked {
        writer.serialize(ExportRow {
            name: &entry.student.name,
            email: &entry.student.email,
            branch: &entry.student.branch,
            section: &entry.student.section,
            total_activities: entry.readiness.total_activities,
            readiness_score: entry.readiness.score,
            status: entry.readiness.status.label(),
            coding_days: entry.readiness.coding_days,
            registered_on: entry.student.registered_at.date_naive(),
        })?;
    }

    writer.flush()?;
    Ok(())
}

/// Markdown summary of a cohort. `ranked` is expected highest score first.
pub fn build_report(
    scope: Option<&str>,
    generated_on: NaiveDate,
    ranked: &[StudentReadiness],
    activities: &[ActivityRecord],
) -> String {
    let mut output = String::new();
    let scope_label = scope.unwrap_or("all students");

    let _ = writeln!(output, "# Placement Readiness Report");
    let _ = writeln!(
        output,
        "Generated for {} on {}",
        scope_label, generated_on
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Status Mix");

    if ranked.is_empty() {
        let _ = writeln!(output, "No students in this scope.");
    } else {
        for entry in analytics::distribution(ranked) {
            let _ = writeln!(output, "- {}: {} students", entry.status, entry.count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Most Ready");

    if ranked.is_empty() {
        let _ = writeln!(output, "No students in this scope.");
    } else {
        for entry in ranked.iter().take(HIGHLIGHT_LIMIT) {
            let _ = writeln!(
                output,
                "- {} ({}, {}) score {} ({}) across {} activities",
                entry.student.name,
                entry.student.email,
                entry.student.branch,
                entry.readiness.score,
                entry.readiness.status,
                entry.readiness.total_activities
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Needs Attention");

    let attention: Vec<&StudentReadiness> = ranked.iter().rev().take(ATTENTION_LIMIT).collect();
    if attention.is_empty() {
        let _ = writeln!(output, "No students in this scope.");
    } else {
        for entry in attention {
            let _ = writeln!(
                output,
                "- {} score {}: consistency {}, breadth {}, mocks {}",
                entry.student.name,
                entry.readiness.score,
                entry.readiness.coding_consistency,
                entry.readiness.category_score,
                entry.readiness.mock_score
            );
        }
    }

    let names: HashMap<_, _> = ranked
        .iter()
        .map(|entry| (entry.student.id, entry.student.name.as_str()))
        .collect();
    let mut recent: Vec<&ActivityRecord> = activities
        .iter()
        .filter(|activity| !activity.notes.is_empty() && names.contains_key(&activity.student_id))
        .collect();
    recent.sort_by(|a, b| b.occurred_on.cmp(&a.occurred_on));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Activity Notes");

    if recent.is_empty() {
        let _ = writeln!(output, "No activity notes recorded.");
    } else {
        for activity in recent.iter().take(RECENT_NOTES_LIMIT) {
            let _ = writeln!(
                output,
                "- {} ({}) on {}: {}",
                names[&activity.student_id],
                activity.category,
                activity.occurred_on,
                activity.notes
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::score_cohort;
    use crate::models::{Category, Difficulty, Student};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn student(name: &str, branch: &str) -> Student {
        Student {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.split(' ').next().unwrap().to_lowercase()),
            branch: branch.to_string(),
            section: "A".to_string(),
            registered_at: Utc.with_ymd_and_hms(2026, 7, 1, 9, 0, 0).unwrap(),
        }
    }

    fn activity(owner: &Student, category: Category, notes: &str, on: NaiveDate) -> ActivityRecord {
        ActivityRecord {
            id: Uuid::new_v4(),
            student_id: owner.id,
            category,
            time_spent_minutes: 60,
            difficulty: Difficulty::Hard,
            problems_solved: 2,
            notes: notes.to_string(),
            occurred_on: on,
            logged_at: Utc::now(),
        }
    }

    #[test]
    fn csv_export_quotes_fields_with_commas() {
        let avery = student("Avery Lee", "CSE, AI");
        let on = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap();
        let activities = vec![
            activity(&avery, Category::Coding, "", on),
            activity(&avery, Category::Aptitude, "", on),
        ];
        let ranked = score_cohort(&[avery], &activities);

        let mut buffer = Vec::new();
        export_csv(&mut buffer, &ranked).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next().unwrap(),
            "name,email,branch,section,total_activities,readiness_score,status,coding_days,registered_on"
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("Avery Lee,avery@example.com,\"CSE, AI\",A,2,"));
        assert!(row.ends_with(",Not Started,1,2026-07-01"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn report_lists_sections() {
        let avery = student("Avery Lee", "CSE");
        let jules = student("Jules Moreno", "CSE");
        let on = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap();
        let activities = vec![
            activity(&avery, Category::Coding, "Graph practice", on),
            activity(&avery, Category::MockInterview, "", on),
            activity(&jules, Category::Os, "Paging revision", on.pred_opt().unwrap()),
        ];
        let ranked = score_cohort(&[avery, jules], &activities);

        let report = build_report(Some("CSE"), on, &ranked, &activities);

        assert!(report.contains("Generated for CSE on 2026-10-01"));
        assert!(report.contains("- Not Started: 2 students"));
        assert!(report.contains("- Placement Ready: 0 students"));
        assert!(report.contains("## Needs Attention"));
        assert!(report.contains("- Avery Lee (coding) on 2026-10-01: Graph practice"));
        assert!(report.contains("- Jules Moreno (os) on 2026-09-30: Paging revision"));

        let most_ready = report.find("## Most Ready").unwrap();
        let avery_line = report.find("- Avery Lee (avery@example.com").unwrap();
        assert!(avery_line > most_ready);
    }

    #[test]
    fn empty_report_says_so() {
        let on = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap();
        let report = build_report(None, on, &[], &[]);
        assert!(report.contains("Generated for all students"));
        assert!(report.contains("No students in this scope."));
        assert!(report.contains("No activity notes recorded."));
    }
}
