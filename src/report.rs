use std::fmt::Write;

use chrono::{Datelike, Duration, NaiveDate};

use crate::charts;
use crate::models::MoodEntry;

/// Year and month of the calendar month before `today`, the default
/// reporting window.
pub fn previous_month(today: NaiveDate) -> (i32, u32) {
    let first = today.with_day(1).unwrap_or(today);
    let last_of_previous = first - Duration::days(1);
    (last_of_previous.year(), last_of_previous.month())
}

pub fn month_subset(moods: &[MoodEntry], year: i32, month: u32) -> Vec<MoodEntry> {
    moods
        .iter()
        .filter(|m| m.date.year() == year && m.date.month() == month)
        .cloned()
        .collect()
}

/// Monthly wellbeing report as markdown: the original two mean
/// paragraphs plus the extended benchmark, correlation, and weekday
/// sections of the later revisions.
pub fn build_report(
    email: &str,
    year: i32,
    month: u32,
    own: &[MoodEntry],
    school: &[MoodEntry],
) -> String {
    let own = month_subset(own, year, month);
    let school = month_subset(school, year, month);

    let mut output = String::new();
    let _ = writeln!(output, "# Monthly Wellbeing Report {year}-{month:02}");
    let _ = writeln!(output, "Generated for {email}");
    let _ = writeln!(output);

    if own.is_empty() {
        let _ = writeln!(output, "No entries recorded for {year}-{month:02}.");
        return output;
    }

    let energy: Vec<f64> = own.iter().map(|m| m.energy as f64).collect();
    let stress: Vec<f64> = own.iter().map(|m| m.stress as f64).collect();
    let _ = writeln!(
        output,
        "Average energy: {:.2} / 5 across {} entries.",
        charts::mean(&energy),
        own.len()
    );
    let _ = writeln!(output, "Average stress: {:.2} / 5.", charts::mean(&stress));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Benchmark");
    let school_energy: Vec<f64> = school.iter().map(|m| m.energy as f64).collect();
    let school_stress: Vec<f64> = school.iter().map(|m| m.stress as f64).collect();
    let _ = writeln!(output, "| Metric | You | School |");
    let _ = writeln!(output, "| --- | --- | --- |");
    let _ = writeln!(
        output,
        "| Energy | {:.2} | {:.2} |",
        charts::mean(&energy),
        charts::mean(&school_energy)
    );
    let _ = writeln!(
        output,
        "| Stress | {:.2} | {:.2} |",
        charts::mean(&stress),
        charts::mean(&school_stress)
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Energy / Stress Correlation");
    let _ = writeln!(
        output,
        "Pearson r = {:.2} over this month's entries.",
        charts::energy_stress_correlation(&own)
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Weekday Averages");
    let profile = charts::weekday_profile(&own);
    if profile.is_empty() {
        let _ = writeln!(output, "No weekday data for this window.");
    } else {
        let _ = writeln!(output, "| Weekday | Energy | Stress |");
        let _ = writeln!(output, "| --- | --- | --- |");
        for row in profile {
            let _ = writeln!(
                output,
                "| {} | {:.2} | {:.2} |",
                row.weekday, row.energy, row.stress
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(email: &str, date: (i32, u32, u32), energy: i32, stress: i32) -> MoodEntry {
        MoodEntry {
            email: email.to_string(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            energy,
            stress,
        }
    }

    #[test]
    fn previous_month_rolls_over_january() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        assert_eq!(previous_month(today), (2025, 12));
        let mid_year = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        assert_eq!(previous_month(mid_year), (2026, 3));
    }

    #[test]
    fn empty_month_reports_no_entries() {
        let report = build_report("ann@school.be", 2026, 2, &[], &[]);
        assert!(report.contains("# Monthly Wellbeing Report 2026-02"));
        assert!(report.contains("No entries recorded for 2026-02."));
        assert!(!report.contains("Benchmark"));
    }

    #[test]
    fn report_includes_means_and_benchmark() {
        let own = vec![
            entry("ann@school.be", (2026, 2, 3), 4, 2),
            entry("ann@school.be", (2026, 2, 4), 2, 4),
            entry("ann@school.be", (2026, 3, 1), 5, 5), // outside the window
        ];
        let school = vec![
            entry("ann@school.be", (2026, 2, 3), 4, 2),
            entry("ann@school.be", (2026, 2, 4), 2, 4),
            entry("bert@school.be", (2026, 2, 3), 2, 2),
        ];

        let report = build_report("ann@school.be", 2026, 2, &own, &school);
        assert!(report.contains("Average energy: 3.00 / 5 across 2 entries."));
        assert!(report.contains("Average stress: 3.00 / 5."));
        assert!(report.contains("| Energy | 3.00 | 2.67 |"));
        assert!(report.contains("## Weekday Averages"));
    }
}
