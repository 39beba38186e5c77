//! Terminal output for the `credstore` binary.
//!
//! Status lines go to stderr so that `credstore get` can be piped
//! without picking up decoration.  Tables and the `list`/`status`
//! summaries go to stdout.

use std::fmt::Display;

use chrono::{DateTime, Utc};
use comfy_table::{presets::UTF8_BORDERS_ONLY, Cell, ContentArrangement, Table};
use console::{style, StyledObject};

use crate::vault::EntrySummary;

fn line(mark: StyledObject<&str>, msg: impl Display) -> String {
    format!("{mark} {msg}")
}

pub fn success(msg: &str) {
    println!("{}", line(style("\u{2713}").green().bold(), msg));
}

pub fn error(msg: &str) {
    eprintln!("{}", line(style("\u{2717}").red().bold(), msg));
}

pub fn warning(msg: &str) {
    eprintln!("{}", line(style("!").yellow().bold(), msg));
}

pub fn info(msg: &str) {
    println!("{}", line(style("\u{2022}").cyan(), msg));
}

/// Dimmed hint, printed after an error or an empty result.
pub fn tip(msg: &str) {
    eprintln!("{}", line(style("\u{2192}").dim(), style(msg).dim()));
}

/// Print stored credentials, or a hint when there are none.
pub fn print_credentials_table(entries: &[EntrySummary]) {
    if entries.is_empty() {
        info("No credentials stored yet.");
        tip("Run `credstore set <SERVICE> --user <USER>` to store one.");
        return;
    }
    println!("{}", credentials_table(entries, Utc::now()));
}

fn credentials_table(entries: &[EntrySummary], now: DateTime<Utc>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_BORDERS_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Service", "User", "Password", "Updated"]);

    for e in entries {
        table.add_row(vec![
            Cell::new(&e.service_name),
            Cell::new(e.user_name.as_deref().unwrap_or("-")),
            Cell::new(if e.has_password { "set" } else { "none" }),
            Cell::new(age(e.updated_at, now)),
        ]);
    }
    table
}

/// Coarse "how long ago" for the Updated column.
fn age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0);
    match secs {
        0..=59 => "just now".to_string(),
        60..=3_599 => format!("{}m ago", secs / 60),
        3_600..=86_399 => format!("{}h ago", secs / 3_600),
        86_400..=2_591_999 => format!("{}d ago", secs / 86_400),
        _ => then.format("%Y-%m-%d").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn age_buckets() {
        let now = Utc::now();
        assert_eq!(age(now, now), "just now");
        assert_eq!(age(now - Duration::minutes(5), now), "5m ago");
        assert_eq!(age(now - Duration::hours(3), now), "3h ago");
        assert_eq!(age(now - Duration::days(2), now), "2d ago");

        let old = now - Duration::days(90);
        assert_eq!(age(old, now), old.format("%Y-%m-%d").to_string());
    }

    #[test]
    fn future_timestamps_count_as_now() {
        let now = Utc::now();
        assert_eq!(age(now + Duration::minutes(1), now), "just now");
    }

    #[test]
    fn table_lists_users_but_never_passwords() {
        let now = Utc::now();
        let entries = vec![
            EntrySummary {
                service_name: "github.com".into(),
                user_name: Some("alice".into()),
                has_password: true,
                created_at: now,
                updated_at: now,
            },
            EntrySummary {
                service_name: "legacy".into(),
                user_name: None,
                has_password: false,
                created_at: now,
                updated_at: now,
            },
        ];

        let rendered = credentials_table(&entries, now).to_string();
        assert!(rendered.contains("github.com"));
        assert!(rendered.contains("alice"));
        assert!(rendered.contains("none"));
    }
}
