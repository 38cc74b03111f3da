use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing::warn;

mod charts;
mod config;
mod flow;
mod models;
mod report;
mod sheet;
mod store;

use models::{normalize_email, Role, CLASSES, NEGATIVE_TAGS, POSITIVE_TAGS};
use sheet::WellbeingSheet;
use store::Store;

#[derive(Parser)]
#[command(name = "wellbeing-monitor")]
#[command(about = "Daily mood and lesson climate monitor for school teams", long_about = None)]
struct Cli {
    /// Settings file; absent file means defaults.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,
    /// Overrides the data directory from the settings file.
    #[arg(long)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account (directie* addresses become directors)
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Verify credentials and print the account role
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Log today's energy and stress scores
    LogDay {
        #[arg(long)]
        email: String,
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value_t = 3)]
        energy: i32,
        #[arg(long, default_value_t = 3)]
        stress: i32,
    },
    /// Log one lesson observation
    LogLesson {
        #[arg(long)]
        email: String,
        #[arg(long)]
        class: String,
        #[arg(long, default_value_t = 3)]
        approach: i32,
        #[arg(long, default_value_t = 3)]
        management: i32,
        /// Repeatable; must come from the positive vocabulary
        #[arg(long = "positive", value_name = "TAG")]
        positive: Vec<String>,
        /// Repeatable; must come from the negative vocabulary
        #[arg(long = "negative", value_name = "TAG")]
        negative: Vec<String>,
    },
    /// Personal view: mood trend, lesson averages, label frequencies
    Stats {
        #[arg(long)]
        email: String,
    },
    /// Anonymized school-wide view (requires the director role)
    Dashboard {
        #[arg(long)]
        email: String,
    },
    /// Monthly markdown report, defaulting to the previous month
    Report {
        #[arg(long)]
        email: String,
        /// YYYY-MM
        #[arg(long)]
        month: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let settings = config::load_config(&cli.config)?;
    let data_dir = cli
        .data_dir
        .or_else(|| settings.data_dir.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("data"));
    let store = Store::open(&data_dir)?;

    let sheet: Box<dyn WellbeingSheet> = match settings.sheet_url.as_deref() {
        Some(url) => Box::new(sheet::HttpSheet::new(url)?),
        None => Box::new(sheet::LocalSheet::new(data_dir.join("wellbeing_sheet.csv"))),
    };

    match cli.command {
        Commands::Register { email, password } => {
            let user = store.register(&email, &password)?;
            println!("Account created for {} ({}).", user.email, user.role);
        }
        Commands::Login { email, password } => match store.authenticate(&email, &password)? {
            Some(user) => println!("Logged in as {} ({}).", user.email, user.role),
            None => bail!("invalid login"),
        },
        Commands::LogDay {
            email,
            date,
            energy,
            stress,
        } => {
            check_score("energy", energy)?;
            check_score("stress", stress)?;
            let entry = models::MoodEntry {
                email: normalize_email(&email),
                date: date.unwrap_or_else(|| Local::now().date_naive()),
                energy,
                stress,
            };
            store.append_mood(&entry)?;
            if let Err(err) = sheet::append_entry(sheet.as_ref(), entry.clone()).await {
                warn!("wellbeing sheet update failed, entry kept locally: {err}");
            }
            println!("Mood logged for {} on {}.", entry.email, entry.date);
        }
        Commands::LogLesson {
            email,
            class,
            approach,
            management,
            positive,
            negative,
        } => {
            check_score("approach", approach)?;
            check_score("management", management)?;
            check_class(&class)?;
            check_tags(&positive, POSITIVE_TAGS, "positive")?;
            check_tags(&negative, NEGATIVE_TAGS, "negative")?;

            let email = normalize_email(&email);
            let record = models::LessonRecord {
                timestamp: Local::now().naive_local(),
                class,
                approach,
                management,
                positive: positive.join(", "),
                negative: negative.join(", "),
            };
            store.append_lesson(&email, &record)?;
            println!("Lesson logged for class {}.", record.class);
        }
        Commands::Stats { email } => {
            let email = normalize_email(&email);
            let moods = own_moods(sheet.as_ref(), &email).await;
            let lessons = store.load_lessons(&email)?;
            let stats = charts::teacher_stats(&moods, &lessons);
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Dashboard { email } => {
            require_director(&store, &email)?;
            let (moods, lessons) = store.load_all()?;
            let dashboard = charts::director_dashboard(&moods, &lessons);
            println!("{}", serde_json::to_string_pretty(&dashboard)?);
        }
        Commands::Report { email, month, out } => {
            let email = normalize_email(&email);
            let (year, month) = match month {
                Some(raw) => parse_month(&raw)?,
                None => report::previous_month(Local::now().date_naive()),
            };
            let school = sheet::read_or_empty(sheet.as_ref()).await;
            let own: Vec<_> = school.iter().filter(|m| m.email == email).cloned().collect();
            let body = report::build_report(&email, year, month, &own, &school);
            std::fs::write(&out, body)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

/// The full sheet table filtered down to one address, client-side, the
/// only per-user view the sheet supports.
async fn own_moods(sheet: &dyn WellbeingSheet, email: &str) -> Vec<models::MoodEntry> {
    sheet::read_or_empty(sheet)
        .await
        .into_iter()
        .filter(|m| m.email == email)
        .collect()
}

fn require_director(store: &Store, email: &str) -> anyhow::Result<()> {
    let email = normalize_email(email);
    let users = store.load_users()?;
    match users.iter().find(|u| u.email == email) {
        Some(user) if user.role == Role::Director => Ok(()),
        Some(_) => bail!("the dashboard requires the director role"),
        None => bail!("no account for {email}"),
    }
}

/// Slider range from the entry forms.
fn check_score(name: &str, value: i32) -> anyhow::Result<()> {
    if !(1..=5).contains(&value) {
        bail!("{name} must be between 1 and 5");
    }
    Ok(())
}

fn check_class(class: &str) -> anyhow::Result<()> {
    if !CLASSES.contains(&class) {
        bail!("unknown class {class}; expected one of: {}", CLASSES.join(", "));
    }
    Ok(())
}

fn check_tags(tags: &[String], vocabulary: &[&str], side: &str) -> anyhow::Result<()> {
    for tag in tags {
        if !vocabulary.contains(&tag.as_str()) {
            bail!(
                "unknown {side} tag {tag}; expected one of: {}",
                vocabulary.join(", ")
            );
        }
    }
    Ok(())
}

fn parse_month(raw: &str) -> anyhow::Result<(i32, u32)> {
    let (year, month) = raw
        .split_once('-')
        .with_context(|| format!("invalid month {raw}, expected YYYY-MM"))?;
    let year: i32 = year
        .parse()
        .with_context(|| format!("invalid year in {raw}"))?;
    let month: u32 = month
        .parse()
        .with_context(|| format!("invalid month in {raw}"))?;
    if !(1..=12).contains(&month) {
        bail!("month out of range in {raw}");
    }
    Ok((year, month))
}
