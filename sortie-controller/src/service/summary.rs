//! Completion summary text

use chrono::{DateTime, Utc};
use std::time::Duration;

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

const TIMESTAMP_FORMAT: &str = "%a %d %H:%M:%S UTC";

/// Subject and body of a job completion message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub subject: String,
    pub body: String,
}

/// Composes the message sent once a job's aggregate record is written
pub fn compose(
    job_name: &str,
    cluster_name: &str,
    started: DateTime<Utc>,
    ended: DateTime<Utc>,
    links: &[String],
    link_ttl: Duration,
) -> Summary {
    let elapsed = (ended - started).num_seconds();

    let mut lines = vec![
        format!("Job '{}' finished", job_name),
        String::new(),
        format!("Cluster: {}", cluster_name),
        String::new(),
        format!("Started: {}", started.format(TIMESTAMP_FORMAT)),
        format!("Ended: {}", ended.format(TIMESTAMP_FORMAT)),
        format!("Duration: {}", pretty_duration(elapsed)),
        String::new(),
        "Links to output files:".to_string(),
        String::new(),
    ];
    lines.extend(links.iter().map(|link| format!("{}\n", link)));
    lines.push(format!(
        "The above links are valid for ~{} after when the job finished.",
        approximate_span(link_ttl)
    ));

    Summary {
        subject: format!("Job '{}' done", job_name),
        body: lines.join("\n"),
    }
}

/// `1 day, 2 hours, 3 minutes, 4 seconds (1 day, 2:03:04)`
pub fn pretty_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);

    let (days, rem) = (seconds / DAY, seconds % DAY);
    let (hours, rem) = (rem / HOUR, rem % HOUR);
    let (minutes, secs) = (rem / MINUTE, rem % MINUTE);

    let parts: Vec<String> = [(days, "day"), (hours, "hour"), (minutes, "minute"), (secs, "second")]
        .into_iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, unit)| plural(n, unit))
        .collect();

    let words = if parts.is_empty() {
        "0 seconds".to_string()
    } else {
        parts.join(", ")
    };

    format!("{} ({})", words, clock(seconds))
}

/// `H:MM:SS`, prefixed with `N day(s), ` past a day
fn clock(seconds: i64) -> String {
    let (days, rem) = (seconds / DAY, seconds % DAY);
    let time = format!("{}:{:02}:{:02}", rem / HOUR, (rem % HOUR) / MINUTE, rem % MINUTE);

    if days > 0 {
        format!("{}, {}", plural(days, "day"), time)
    } else {
        time
    }
}

fn approximate_span(ttl: Duration) -> String {
    let secs = ttl.as_secs() as i64;
    if secs >= DAY {
        plural((secs + DAY / 2) / DAY, "day")
    } else {
        plural(((secs + HOUR / 2) / HOUR).max(1), "hour")
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("{} {}", n, unit)
    } else {
        format!("{} {}s", n, unit)
    }
}
