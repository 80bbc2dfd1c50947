//! `calweek`: fetch iCalendar feeds and write this week's timetable as a
//! static HTML page.
//!
//! ## Usage
//!
//! ```sh
//! # One feed from the environment, default output calendar.html
//! CALENDAR_ICS_URL=https://example.com/cal.ics calweek
//!
//! # Several feeds, explicit zone and output path
//! calweek --feed https://a.example/cal.ics --feed ./team.ics \
//!         --timezone Europe/Berlin -o /var/www/week.html
//!
//! # Chronological list instead of the week grid, pinned clock
//! calweek --feed ./cal.ics --view list --now 2026-03-04T12:00:00Z
//! ```

mod fetch;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use calweek_engine::{
    layout_week, render_list, render_week, select_events, DisplayWindow, EngineConfig,
    RawComponent, RenderOptions,
};
use chrono::{DateTime, FixedOffset, Utc};
use clap::{Parser, ValueEnum};
use tracing::{warn, Level};
use tracing_subscriber::EnvFilter;

use crate::fetch::{display_name, FeedLoader};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum View {
    /// Seven day columns with a vertical timeline
    Week,
    /// Chronological list
    List,
}

#[derive(Parser)]
#[command(
    name = "calweek",
    version,
    about = "Render this week's iCalendar feeds as a static HTML timetable"
)]
struct Cli {
    /// Feed URL or local .ics path (repeatable; comma-separated in the env var)
    #[arg(long = "feed", env = "CALENDAR_ICS_URL", value_delimiter = ',', required = true)]
    feeds: Vec<String>,

    /// Output HTML file, replaced atomically on every run
    #[arg(short, long, env = "OUTFILE", default_value = "calendar.html")]
    output: PathBuf,

    /// IANA zone used for the week boundaries and all displayed times
    #[arg(long, env = "CALWEEK_TIMEZONE", default_value = EngineConfig::DEFAULT_TIMEZONE)]
    timezone: String,

    /// Page layout
    #[arg(long, env = "CALWEEK_VIEW", value_enum, default_value_t = View::Week)]
    view: View,

    /// Maximum entries in the list view
    #[arg(long, env = "MAX_EVENTS", default_value_t = 50)]
    max_events: usize,

    /// Page title
    #[arg(long, default_value = "My Calendar")]
    title: String,

    /// Pretend the current time is this RFC 3339 instant
    #[arg(long, value_parser = parse_now)]
    now: Option<DateTime<FixedOffset>>,

    /// HTTP timeout per feed, in seconds
    #[arg(long, default_value_t = 20)]
    timeout_secs: u64,

    /// Also print the selected events as JSON on stdout
    #[arg(long)]
    dump_events: bool,

    /// Debug logging (overrides RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

fn parse_now(s: &str) -> std::result::Result<DateTime<FixedOffset>, String> {
    DateTime::parse_from_rfc3339(s).map_err(|e| format!("expected RFC 3339, e.g. 2026-03-04T12:00:00Z ({})", e))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::WARN.to_string()))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = EngineConfig::with_timezone_name(&cli.timezone)?;
    let now = cli
        .now
        .map(|n| n.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    let window = DisplayWindow::current_week(now, &config)?;

    let sources: Vec<&str> = cli
        .feeds
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if sources.is_empty() {
        anyhow::bail!("No calendar feed configured (set CALENDAR_ICS_URL or pass --feed)");
    }

    let loader = FeedLoader::new(Duration::from_secs(cli.timeout_secs))
        .context("Failed to build HTTP client")?;
    let mut components: Vec<RawComponent> = Vec::new();
    let mut failed = 0usize;
    for source in &sources {
        match loader.load(source) {
            Ok(found) => components.extend(found),
            Err(e) => {
                failed += 1;
                warn!(feed = %display_name(source), error = %e, "Feed skipped");
            }
        }
    }
    if failed == sources.len() {
        anyhow::bail!("All {} calendar feed(s) failed", sources.len());
    }

    let selection = select_events(&components, &window, &config);

    let options = RenderOptions {
        title: cli.title.clone(),
        max_events: cli.max_events,
        ..RenderOptions::default()
    };
    let html = match cli.view {
        View::Week => {
            let layout = layout_week(&selection.events, &window, &options.layout)
                .context("Failed to lay out the week")?;
            render_week(&layout, &window, &options)
        }
        View::List => render_list(&selection.events, &options),
    };
    write_atomic(&cli.output, &html)?;

    if cli.dump_events {
        let json = serde_json::to_string_pretty(&selection.events)?;
        println!("{}", json);
    }

    let stats = selection.stats;
    eprintln!(
        "calweek: {}/{} feed(s) ok, {} event(s) parsed, {} skipped, {} recurring ({} fallback), {} rendered for {} – {}",
        sources.len() - failed,
        sources.len(),
        stats.events,
        stats.skipped,
        stats.recurring,
        stats.fallbacks,
        stats.selected,
        window.start.format("%Y-%m-%d"),
        window.end.format("%Y-%m-%d"),
    );
    eprintln!("Wrote {}", cli.output.display());
    Ok(())
}

/// Write `content` to a temporary file beside `path`, then rename it into
/// place, so readers never observe a half-written page.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    tmp.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write {}", tmp.path().display()))?;
    tmp.persist(path)
        .with_context(|| format!("Failed to write file: {}", path.display()))?;
    Ok(())
}
