use std::collections::{HashMap, HashSet};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::flow::{self, TagFlow};
use crate::models::{LessonRecord, MoodEntry};

/// Mean that degrades to 0 on empty input instead of NaN, so downstream
/// consumers never have to special-case missing data.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub energy: f64,
    pub stress: f64,
}

/// Date-grouped mood averages, ascending by date. Duplicate submissions
/// for one date all count toward that date's mean.
pub fn daily_trend(moods: &[MoodEntry]) -> Vec<TrendPoint> {
    let mut by_date: HashMap<NaiveDate, (Vec<f64>, Vec<f64>)> = HashMap::new();
    for entry in moods {
        let bucket = by_date.entry(entry.date).or_default();
        bucket.0.push(entry.energy as f64);
        bucket.1.push(entry.stress as f64);
    }

    let mut points: Vec<TrendPoint> = by_date
        .into_iter()
        .map(|(date, (energy, stress))| TrendPoint {
            date,
            energy: mean(&energy),
            stress: mean(&stress),
        })
        .collect();
    points.sort_by_key(|p| p.date);
    points
}

#[derive(Debug, Clone, Copy)]
pub enum LessonMetric {
    Approach,
    Management,
}

impl LessonMetric {
    fn value(self, record: &LessonRecord) -> i32 {
        match self {
            LessonMetric::Approach => record.approach,
            LessonMetric::Management => record.management,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RidgelineRow {
    pub class: String,
    pub values: Vec<i32>,
    pub mean: f64,
}

/// Per-class score distributions for one metric. Classes come out in
/// descending name order, the stacking order of the joyplot.
pub fn ridgeline(records: &[LessonRecord], metric: LessonMetric) -> Vec<RidgelineRow> {
    let mut by_class: HashMap<String, Vec<i32>> = HashMap::new();
    for record in records {
        by_class
            .entry(record.class.clone())
            .or_default()
            .push(metric.value(record));
    }

    let mut rows: Vec<RidgelineRow> = by_class
        .into_iter()
        .map(|(class, values)| {
            let as_f64: Vec<f64> = values.iter().map(|v| *v as f64).collect();
            RidgelineRow {
                class,
                mean: mean(&as_f64),
                values,
            }
        })
        .collect();
    rows.sort_by(|a, b| b.class.cmp(&a.class));
    rows
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Negative,
}

#[derive(Debug, Clone, Serialize)]
pub struct LabelFrequency {
    pub label: String,
    pub polarity: Polarity,
    pub count: usize,
}

/// Exploded tag counts across all lessons, the word-cloud input. Sorted
/// by count descending, then label, for a stable output.
pub fn label_frequencies(records: &[LessonRecord]) -> Vec<LabelFrequency> {
    let mut counts: HashMap<(String, Polarity), usize> = HashMap::new();
    for record in records {
        for tag in flow::split_tags(&record.positive) {
            *counts.entry((tag, Polarity::Positive)).or_insert(0) += 1;
        }
        for tag in flow::split_tags(&record.negative) {
            *counts.entry((tag, Polarity::Negative)).or_insert(0) += 1;
        }
    }

    let mut frequencies: Vec<LabelFrequency> = counts
        .into_iter()
        .map(|((label, polarity), count)| LabelFrequency {
            label,
            polarity,
            count,
        })
        .collect();
    frequencies.sort_by(|a, b| b.count.cmp(&a.count).then(a.label.cmp(&b.label)));
    frequencies
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassSummary {
    pub class: String,
    pub lesson_count: usize,
    pub avg_approach: f64,
    pub avg_management: f64,
}

pub fn class_summaries(records: &[LessonRecord]) -> Vec<ClassSummary> {
    let mut by_class: HashMap<String, (Vec<f64>, Vec<f64>)> = HashMap::new();
    for record in records {
        let bucket = by_class.entry(record.class.clone()).or_default();
        bucket.0.push(record.approach as f64);
        bucket.1.push(record.management as f64);
    }

    let mut summaries: Vec<ClassSummary> = by_class
        .into_iter()
        .map(|(class, (approach, management))| ClassSummary {
            class,
            lesson_count: approach.len(),
            avg_approach: mean(&approach),
            avg_management: mean(&management),
        })
        .collect();
    summaries.sort_by(|a, b| a.class.cmp(&b.class));
    summaries
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekdayAverage {
    pub weekday: String,
    pub energy: f64,
    pub stress: f64,
}

/// Mean energy and stress per weekday, Monday through Sunday, skipping
/// weekdays with no entries.
pub fn weekday_profile(moods: &[MoodEntry]) -> Vec<WeekdayAverage> {
    let mut buckets: HashMap<u32, (Vec<f64>, Vec<f64>)> = HashMap::new();
    for entry in moods {
        let bucket = buckets
            .entry(entry.date.weekday().num_days_from_monday())
            .or_default();
        bucket.0.push(entry.energy as f64);
        bucket.1.push(entry.stress as f64);
    }

    const NAMES: [&str; 7] = [
        "Monday",
        "Tuesday",
        "Wednesday",
        "Thursday",
        "Friday",
        "Saturday",
        "Sunday",
    ];

    (0..7u32)
        .filter_map(|day| {
            buckets.get(&day).map(|(energy, stress)| WeekdayAverage {
                weekday: NAMES[day as usize].to_string(),
                energy: mean(energy),
                stress: mean(stress),
            })
        })
        .collect()
}

/// Pearson correlation between energy and stress. Returns 0 when the
/// input is too small or either series has no variance.
pub fn energy_stress_correlation(moods: &[MoodEntry]) -> f64 {
    if moods.len() < 2 {
        return 0.0;
    }

    let energy: Vec<f64> = moods.iter().map(|m| m.energy as f64).collect();
    let stress: Vec<f64> = moods.iter().map(|m| m.stress as f64).collect();
    let mean_e = mean(&energy);
    let mean_s = mean(&stress);

    let mut cov = 0.0;
    let mut var_e = 0.0;
    let mut var_s = 0.0;
    for (e, s) in energy.iter().zip(stress.iter()) {
        cov += (e - mean_e) * (s - mean_s);
        var_e += (e - mean_e).powi(2);
        var_s += (s - mean_s).powi(2);
    }

    if var_e == 0.0 || var_s == 0.0 {
        return 0.0;
    }
    cov / (var_e.sqrt() * var_s.sqrt())
}

/// Everything the teacher's personal view renders.
#[derive(Debug, Serialize)]
pub struct TeacherStats {
    pub mood_trend: Vec<TrendPoint>,
    pub avg_approach: f64,
    pub avg_management: f64,
    pub classes: Vec<ClassSummary>,
    pub labels: Vec<LabelFrequency>,
}

pub fn teacher_stats(moods: &[MoodEntry], lessons: &[LessonRecord]) -> TeacherStats {
    let approach: Vec<f64> = lessons.iter().map(|l| l.approach as f64).collect();
    let management: Vec<f64> = lessons.iter().map(|l| l.management as f64).collect();

    TeacherStats {
        mood_trend: daily_trend(moods),
        avg_approach: mean(&approach),
        avg_management: mean(&management),
        classes: class_summaries(lessons),
        labels: label_frequencies(lessons),
    }
}

/// The anonymized director view: school-wide KPIs plus the three chart
/// inputs. Carries no emails.
#[derive(Debug, Serialize)]
pub struct DirectorDashboard {
    pub teacher_count: usize,
    pub avg_energy: f64,
    pub avg_approach: f64,
    pub lesson_count: usize,
    pub approach_by_class: Vec<RidgelineRow>,
    pub management_by_class: Vec<RidgelineRow>,
    pub tag_flow: Option<TagFlow>,
    pub team_trend: Vec<TrendPoint>,
}

pub fn director_dashboard(moods: &[MoodEntry], lessons: &[LessonRecord]) -> DirectorDashboard {
    let teachers: HashSet<&str> = moods.iter().map(|m| m.email.as_str()).collect();
    let energy: Vec<f64> = moods.iter().map(|m| m.energy as f64).collect();
    let approach: Vec<f64> = lessons.iter().map(|l| l.approach as f64).collect();

    DirectorDashboard {
        teacher_count: teachers.len(),
        avg_energy: mean(&energy),
        avg_approach: mean(&approach),
        lesson_count: lessons.len(),
        approach_by_class: ridgeline(lessons, LessonMetric::Approach),
        management_by_class: ridgeline(lessons, LessonMetric::Management),
        tag_flow: flow::build_tag_flow(lessons),
        team_trend: daily_trend(moods),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mood(email: &str, date: (i32, u32, u32), energy: i32, stress: i32) -> MoodEntry {
        MoodEntry {
            email: email.to_string(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            energy,
            stress,
        }
    }

    fn lesson(class: &str, approach: i32, management: i32) -> LessonRecord {
        LessonRecord {
            timestamp: NaiveDate::from_ymd_opt(2026, 3, 2)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            class: class.to_string(),
            approach,
            management,
            positive: "Focused".to_string(),
            negative: "Noisy".to_string(),
        }
    }

    #[test]
    fn mean_of_empty_is_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[2.0, 4.0]), 3.0);
    }

    #[test]
    fn duplicate_mood_entries_both_count() {
        let moods = vec![
            mood("a@s.be", (2026, 3, 2), 2, 4),
            mood("a@s.be", (2026, 3, 2), 4, 2),
            mood("a@s.be", (2026, 3, 3), 5, 1),
        ];
        let trend = daily_trend(&moods);
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].date, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert_eq!(trend[0].energy, 3.0);
        assert_eq!(trend[0].stress, 3.0);
        assert_eq!(trend[1].energy, 5.0);
    }

    #[test]
    fn ridgeline_stacks_classes_descending() {
        let records = vec![lesson("3HW/3MT", 4, 3), lesson("6MT", 2, 2), lesson("6MT", 4, 4)];
        let rows = ridgeline(&records, LessonMetric::Approach);
        assert_eq!(rows[0].class, "6MT");
        assert_eq!(rows[0].values, vec![2, 4]);
        assert_eq!(rows[0].mean, 3.0);
        assert_eq!(rows[1].class, "3HW/3MT");
    }

    #[test]
    fn label_frequencies_split_by_polarity() {
        let mut chaotic = lesson("5HW", 3, 3);
        chaotic.positive = "Focused, Active".to_string();
        chaotic.negative = String::new();
        let records = vec![lesson("5HW", 3, 3), chaotic];

        let freqs = label_frequencies(&records);
        let focused = freqs
            .iter()
            .find(|f| f.label == "Focused" && f.polarity == Polarity::Positive)
            .unwrap();
        assert_eq!(focused.count, 2);
        let noisy = freqs
            .iter()
            .find(|f| f.label == "Noisy" && f.polarity == Polarity::Negative)
            .unwrap();
        assert_eq!(noisy.count, 1);
    }

    #[test]
    fn weekday_profile_orders_monday_first() {
        let moods = vec![
            mood("a@s.be", (2026, 3, 2), 4, 2), // Monday
            mood("a@s.be", (2026, 3, 6), 2, 4), // Friday
            mood("a@s.be", (2026, 3, 13), 4, 4), // Friday
        ];
        let profile = weekday_profile(&moods);
        assert_eq!(profile.len(), 2);
        assert_eq!(profile[0].weekday, "Monday");
        assert_eq!(profile[1].weekday, "Friday");
        assert_eq!(profile[1].energy, 3.0);
    }

    #[test]
    fn correlation_handles_degenerate_input() {
        assert_eq!(energy_stress_correlation(&[]), 0.0);
        let flat = vec![mood("a@s.be", (2026, 3, 2), 3, 1), mood("a@s.be", (2026, 3, 3), 3, 4)];
        assert_eq!(energy_stress_correlation(&flat), 0.0);

        let inverse = vec![
            mood("a@s.be", (2026, 3, 2), 1, 5),
            mood("a@s.be", (2026, 3, 3), 3, 3),
            mood("a@s.be", (2026, 3, 4), 5, 1),
        ];
        assert!((energy_stress_correlation(&inverse) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn dashboard_counts_distinct_teachers() {
        let moods = vec![
            mood("a@s.be", (2026, 3, 2), 4, 2),
            mood("a@s.be", (2026, 3, 3), 2, 4),
            mood("b@s.be", (2026, 3, 2), 3, 3),
        ];
        let dashboard = director_dashboard(&moods, &[]);
        assert_eq!(dashboard.teacher_count, 2);
        assert_eq!(dashboard.lesson_count, 0);
        assert_eq!(dashboard.avg_energy, 3.0);
        assert!(dashboard.tag_flow.is_none());
    }
}
