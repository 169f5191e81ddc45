//! Terminal rendering for the CLI. Values are unbounded above, so attribute
//! bars cap the *display* at 100 while printing the real number next to it.

use ansi_term::Colour;
use chrono::{Duration, Local, NaiveDate, NaiveDateTime, Timelike};

use crate::{
    rpc::{DaemonStatus, GamificationDetails, GamificationStatus},
    storage::entities::ActivitySample,
};

const BAR_WIDTH: usize = 15;
const EXP_BAR_WIDTH: usize = 20;
const WEEK_BAR_WIDTH: usize = 30;
const WEEK_DAYS: i64 = 7;

pub fn print_daemon_status(status: &DaemonStatus) {
    let started = status.started_at.with_timezone(&Local);
    println!("Daemon:  running (v{})", status.version);
    println!("Started: {}", started.format("%Y-%m-%d %H:%M:%S"));
    println!("Uptime:  {}", humanize_secs(status.uptime_secs));
}

pub fn print_activity(samples: &[ActivitySample]) {
    if samples.is_empty() {
        println!("No activity recorded in this range");
        return;
    }
    for sample in samples {
        let at = sample.recorded_at.with_timezone(&Local);
        let category = sample.app_category.as_deref().unwrap_or("-");
        println!("{}  {category}", at.format("%Y-%m-%d %H:%M"));
    }
    println!();
    println!(
        "{} samples, ~{} minutes active",
        samples.len(),
        samples.len() * 5
    );
}

pub fn print_game_status(status: &GamificationStatus) {
    println!("{}", Colour::Yellow.bold().paint("Gamification Status"));
    println!("{}", "=".repeat(41));
    print_level_line(status);
    println!("Total Experience: {}", status.total_exp);
    println!();
    println!("{}", Colour::Cyan.bold().paint("Attributes"));
    println!("{}", "-".repeat(41));
    print_attributes(status);
    println!();
    println!(
        "Last Updated: {}",
        status
            .updated_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
    );
}

pub fn print_game_details(details: &GamificationDetails) {
    print_game_status(&details.status);

    if !details.modifiers.is_empty() {
        println!();
        println!("{}", Colour::Cyan.bold().paint("Active Modifiers"));
        println!("{}", "-".repeat(41));
        for modifier in &details.modifiers {
            let sign = if modifier.value >= 0 { "+" } else { "" };
            let expires = match modifier.expires_at {
                Some(at) => at
                    .with_timezone(&Local)
                    .format("%H:%M:%S")
                    .to_string(),
                None => "permanent".to_string(),
            };
            println!(
                "  {sign}{} {} - {} (expires: {expires})",
                modifier.value,
                modifier.attribute.as_str(),
                modifier.reason
            );
        }
    }

    if !details.recent_apps.is_empty() {
        println!();
        println!("{}", Colour::Cyan.bold().paint("Today's App Usage"));
        println!("{}", "-".repeat(41));
        let mut usage: Vec<_> = details.recent_apps.iter().collect();
        usage.sort_by(|a, b| b.1.cmp(a.1));
        for (category, minutes) in usage {
            let hours = minutes / 60;
            let mins = minutes % 60;
            if hours > 0 {
                println!("  {category:<20} {hours}h {mins}m");
            } else {
                println!("  {category:<20} {mins}m");
            }
        }
    }
}

/// One line per day of the trailing week, oldest first, with an absolute bar
/// scaled against a full 24-hour day. Quiet days still get a line.
pub fn print_weekly_daily(samples: &[ActivitySample]) {
    println!(
        "{}",
        Colour::Yellow.bold().paint("Weekly Activity - Daily Summary")
    );
    println!("{}", "=".repeat(41));
    if samples.is_empty() {
        println!("No activity recorded in the last 7 days");
        return;
    }

    let times = local_times(samples);
    println!();
    for (day, count) in counts_by_day(&times, Local::now().date_naive()) {
        let hours = (count * 5) as f64 / 60.0;
        println!(
            "{} {}: {} {hours:>5.1}h ({count:>3} records)",
            day.format("%Y-%m-%d"),
            day.format("%a"),
            absolute_bar(hours, 24.0, WEEK_BAR_WIDTH)
        );
    }

    let total_hours = (samples.len() * 5) as f64 / 60.0;
    println!();
    println!("Total: {total_hours:.1} hours ({} records)", samples.len());
}

/// Average records per hour of day across the trailing week, plus the three
/// busiest hours. Bars are scaled against a fully-sampled hour (60 minutes).
pub fn print_weekly_hourly(samples: &[ActivitySample]) {
    println!(
        "{}",
        Colour::Yellow.bold().paint("Weekly Activity - Hourly Average")
    );
    println!("{}", "=".repeat(41));
    if samples.is_empty() {
        println!("No activity recorded in the last 7 days");
        return;
    }

    let counts = counts_by_hour(&local_times(samples));
    println!();
    for (hour, count) in counts.iter().enumerate() {
        let avg_records = *count as f64 / WEEK_DAYS as f64;
        let avg_minutes = avg_records * 5.0;
        println!(
            "{hour:02}:00: {} {avg_minutes:>5.1}m (avg {avg_records:.1} records/day)",
            absolute_bar(avg_minutes, 60.0, WEEK_BAR_WIDTH)
        );
    }

    let mut ranked: Vec<_> = counts
        .iter()
        .enumerate()
        .filter(|(_, count)| **count > 0)
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(&b.0)));

    println!();
    println!("{}", Colour::Cyan.bold().paint("Peak activity hours"));
    for (hour, count) in ranked.into_iter().take(3) {
        let avg = *count as f64 / WEEK_DAYS as f64;
        println!(
            "  {hour:02}:00 - {avg:.1} records/day ({:.1} minutes/day)",
            avg * 5.0
        );
    }
}

fn local_times(samples: &[ActivitySample]) -> Vec<NaiveDateTime> {
    samples
        .iter()
        .map(|sample| sample.recorded_at.with_timezone(&Local).naive_local())
        .collect()
}

/// Seven day/count pairs ending at `today`, oldest first. Days without
/// samples appear with a zero count rather than being omitted.
fn counts_by_day(times: &[NaiveDateTime], today: NaiveDate) -> Vec<(NaiveDate, usize)> {
    (0..WEEK_DAYS)
        .rev()
        .map(|back| {
            let day = today - Duration::days(back);
            let count = times.iter().filter(|t| t.date() == day).count();
            (day, count)
        })
        .collect()
}

fn counts_by_hour(times: &[NaiveDateTime]) -> [usize; 24] {
    let mut counts = [0; 24];
    for time in times {
        counts[time.hour() as usize] += 1;
    }
    counts
}

/// Bar on an absolute scale rather than relative to the largest entry, so a
/// light week looks light. Non-zero values always show at least one block.
fn absolute_bar(value: f64, max: f64, width: usize) -> String {
    if value <= 0.0 {
        return "·".repeat(width);
    }
    let filled = (((value / max).min(1.0) * width as f64) as usize).max(1);
    format!(
        "{}{}",
        Colour::Green.paint("█".repeat(filled)),
        "·".repeat(width - filled)
    )
}

fn print_level_line(status: &GamificationStatus) {
    // Experience span within the current level, derived from the absolute
    // gates: next gate minus current gate.
    let level_start = status.total_exp - status.experience;
    let span = (status.next_level_exp - level_start).max(1);
    let percent = (status.experience * 100 / span).clamp(0, 100) as usize;
    println!(
        "Level: {} {} {}/{} XP ({percent}%)",
        status.level,
        progress_bar(percent, EXP_BAR_WIDTH),
        status.experience,
        span,
    );
}

fn print_attributes(status: &GamificationStatus) {
    for (name, value) in [
        ("Focus", status.focus),
        ("Productivity", status.productivity),
        ("Creativity", status.creativity),
        ("Stamina", status.stamina),
        ("Knowledge", status.knowledge),
        ("Collaboration", status.collaboration),
    ] {
        let display = value.clamp(0, 100) as usize;
        println!(
            "  {name:<14} {} {value:>3}",
            progress_bar(display, BAR_WIDTH)
        );
    }
}

fn progress_bar(percent: usize, width: usize) -> String {
    let filled = width * percent.min(100) / 100;
    let empty = width - filled;
    format!(
        "[{}{}]",
        Colour::Green.paint("█".repeat(filled)),
        "░".repeat(empty)
    )
}

fn humanize_secs(secs: i64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}
