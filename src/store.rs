use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::models::{email_local_part, normalize_email, LessonRecord, MoodEntry, Role, User};

const USERS_HEADER: &str = "email,password,role";
const DAY_HEADER: &str = "email,date,energy,stress";
const LESSON_HEADER: &str = "timestamp,class,approach,management,positive,negative";

/// Flat-file store rooted at a data directory. One users.csv plus one
/// `<localpart>_day.csv` and `<localpart>_lessons.csv` per teacher.
pub struct Store {
    data_dir: PathBuf,
}

impl Store {
    pub fn open(data_dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;
        Ok(Store { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn users_path(&self) -> PathBuf {
        self.data_dir.join("users.csv")
    }

    pub fn day_path(&self, email: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}_day.csv", email_local_part(email)))
    }

    pub fn lesson_path(&self, email: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}_lessons.csv", email_local_part(email)))
    }

    pub fn hash_password(password: &str) -> String {
        let digest = Sha256::digest(password.as_bytes());
        format!("{digest:x}")
    }

    // -------------------------------------------------------------
    // Users
    // -------------------------------------------------------------

    pub fn load_users(&self) -> anyhow::Result<Vec<User>> {
        let path = self.users_path();
        ensure_file(&path, USERS_HEADER)?;

        let mut reader = csv::Reader::from_path(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let mut users = Vec::new();

        for result in reader.deserialize::<User>() {
            match result {
                Ok(user) => users.push(user),
                Err(err) => warn!("dropping malformed user row: {err}"),
            }
        }

        Ok(users)
    }

    /// Creates an account. The role comes from the address itself:
    /// `directie*` local parts become directors, everyone else a teacher.
    pub fn register(&self, email: &str, password: &str) -> anyhow::Result<User> {
        let email = normalize_email(email);
        let users = self.load_users()?;
        if users.iter().any(|u| u.email == email) {
            bail!("account already exists for {email}");
        }

        let role = if email_local_part(&email).starts_with("directie") {
            Role::Director
        } else {
            Role::Teacher
        };
        let user = User {
            email,
            password: Self::hash_password(password),
            role,
        };
        append_row(&self.users_path(), &user)?;
        Ok(user)
    }

    /// Verifies credentials. Unknown address and wrong password are the
    /// same answer, as the login form made no distinction.
    pub fn authenticate(&self, email: &str, password: &str) -> anyhow::Result<Option<User>> {
        let email = normalize_email(email);
        let hash = Self::hash_password(password);
        let users = self.load_users()?;
        Ok(users
            .into_iter()
            .find(|u| u.email == email && u.password == hash))
    }

    // -------------------------------------------------------------
    // Daily mood
    // -------------------------------------------------------------

    pub fn append_mood(&self, entry: &MoodEntry) -> anyhow::Result<()> {
        let path = self.day_path(&entry.email);
        ensure_file(&path, DAY_HEADER)?;
        append_row(&path, entry)
    }

    pub fn load_moods(&self, email: &str) -> anyhow::Result<Vec<MoodEntry>> {
        let path = self.day_path(email);
        ensure_file(&path, DAY_HEADER)?;
        read_moods(&path)
    }

    // -------------------------------------------------------------
    // Lessons
    // -------------------------------------------------------------

    pub fn append_lesson(&self, email: &str, record: &LessonRecord) -> anyhow::Result<()> {
        let path = self.lesson_path(email);
        ensure_file(&path, LESSON_HEADER)?;
        append_row(&path, record)
    }

    pub fn load_lessons(&self, email: &str) -> anyhow::Result<Vec<LessonRecord>> {
        let path = self.lesson_path(email);
        ensure_file(&path, LESSON_HEADER)?;
        read_lessons(&path)
    }

    // -------------------------------------------------------------
    // Director merge
    // -------------------------------------------------------------

    /// Concatenates every teacher's day and lesson files. Files that fail
    /// to open are skipped, matching the original's best-effort merge.
    pub fn load_all(&self) -> anyhow::Result<(Vec<MoodEntry>, Vec<LessonRecord>)> {
        let mut moods = Vec::new();
        let mut lessons = Vec::new();

        let mut entries: Vec<PathBuf> = fs::read_dir(&self.data_dir)
            .with_context(|| format!("failed to read {}", self.data_dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        entries.sort();

        for path in entries {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.ends_with("_day.csv") {
                match read_moods(&path) {
                    Ok(mut rows) => moods.append(&mut rows),
                    Err(err) => warn!("skipping {name}: {err}"),
                }
            } else if name.ends_with("_lessons.csv") {
                match read_lessons(&path) {
                    Ok(mut rows) => lessons.append(&mut rows),
                    Err(err) => warn!("skipping {name}: {err}"),
                }
            }
        }

        Ok((moods, lessons))
    }
}

/// Creates the file with its header row if it does not exist yet.
fn ensure_file(path: &Path, header: &str) -> anyhow::Result<()> {
    if !path.exists() {
        fs::write(path, format!("{header}\n"))
            .with_context(|| format!("failed to create {}", path.display()))?;
    }
    Ok(())
}

fn append_row<T: Serialize>(path: &Path, row: &T) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer.serialize(row)?;
    writer.flush()?;
    Ok(())
}

/// Raw row types keep every field as text so one bad cell drops one row
/// instead of aborting the whole read.
#[derive(serde::Deserialize)]
struct RawMoodRow {
    email: String,
    date: String,
    energy: String,
    stress: String,
}

#[derive(serde::Deserialize)]
struct RawLessonRow {
    timestamp: String,
    class: String,
    approach: String,
    management: String,
    #[serde(default)]
    positive: String,
    #[serde(default)]
    negative: String,
}

pub(crate) fn read_moods(path: &Path) -> anyhow::Result<Vec<MoodEntry>> {
    let file = fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    Ok(parse_mood_csv(file))
}

/// Lenient mood-table parser shared by the local files and the remote
/// sheet body.
pub(crate) fn parse_mood_csv<R: std::io::Read>(input: R) -> Vec<MoodEntry> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    let mut moods = Vec::new();

    for result in reader.deserialize::<RawMoodRow>() {
        let raw = match result {
            Ok(raw) => raw,
            Err(err) => {
                warn!("dropping malformed mood row: {err}");
                continue;
            }
        };
        match (parse_date(&raw.date), parse_score(&raw.energy), parse_score(&raw.stress)) {
            (Some(date), Some(energy), Some(stress)) => moods.push(MoodEntry {
                email: normalize_email(&raw.email),
                date,
                energy,
                stress,
            }),
            _ => warn!("dropping unparseable mood row for {}", raw.email),
        }
    }

    moods
}

/// Renders the whole mood table back to CSV, the sheet's wire format.
/// The header is written even for an empty table.
pub(crate) fn mood_csv_string(entries: &[MoodEntry]) -> anyhow::Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(DAY_HEADER.split(','))?;
    for entry in entries {
        writer.serialize(entry)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to flush mood table: {e}"))?;
    String::from_utf8(bytes).context("mood table is not valid utf-8")
}

pub(crate) fn read_lessons(path: &Path) -> anyhow::Result<Vec<LessonRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut lessons = Vec::new();

    for result in reader.deserialize::<RawLessonRow>() {
        let raw = match result {
            Ok(raw) => raw,
            Err(err) => {
                warn!("dropping malformed lesson row: {err}");
                continue;
            }
        };
        match (
            parse_timestamp(&raw.timestamp),
            parse_score(&raw.approach),
            parse_score(&raw.management),
        ) {
            (Some(timestamp), Some(approach), Some(management)) => lessons.push(LessonRecord {
                timestamp,
                class: raw.class,
                approach,
                management,
                positive: raw.positive,
                negative: raw.negative,
            }),
            _ => warn!("dropping unparseable lesson row for class {}", raw.class),
        }
    }

    Ok(lessons)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

/// Scores arrive as "4" or "4.0" depending on which tool last wrote the
/// file; anything else is treated as null.
fn parse_score(raw: &str) -> Option<i32> {
    raw.trim().parse::<f64>().ok().map(|v| v.round() as i32)
}
