use anyhow::Error;
use std::io::{self, Write};
use std::time::Duration;
use unicode_width::UnicodeWidthChar;

use crate::core::{CleanupType, RunItem, RunSummary};

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub color: bool,
    pub stdin_is_tty: bool,
    pub stdout_is_tty: bool,
    pub stderr_is_tty: bool,
    pub quiet: bool,
}

pub fn eprintln_error(err: &Error) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "error:");
    let _ = writeln!(stderr, "  {err}");

    let mut causes = err.chain().skip(1).peekable();
    if causes.peek().is_some() {
        let _ = writeln!(stderr, "caused by:");
        for cause in causes {
            let _ = writeln!(stderr, "  - {cause}");
        }
    }

    let _ = writeln!(stderr, "hint:");
    let _ = writeln!(
        stderr,
        "  - run `broom list` to see the cleanup types available here"
    );
    let _ = writeln!(stderr, "  - see `broom --help` for commands and options");
}

pub fn print_list(types: &[CleanupType], cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }
    let mut out = io::stdout().lock();
    write_list(&mut out, types);
}

fn write_list(out: &mut dyn Write, types: &[CleanupType]) {
    let name_w = types
        .iter()
        .map(|t| visible_width_ansi(&t.name))
        .max()
        .unwrap_or(0)
        .max("Type".len());

    let _ = writeln!(out, "{}  Confirm  Root", pad_end_display("Type", name_w));
    let _ = writeln!(out, "{}  -------  ----", "-".repeat(name_w));
    for t in types {
        let _ = writeln!(
            out,
            "{}  {}  {}",
            pad_end_display(&t.name, name_w),
            pad_end_display(yes_no(t.requires_confirmation), 7),
            yes_no(t.requires_root)
        );
    }
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

/// Per-item lines printed right after an action returns or is skipped.
pub fn print_item_outcome(item: &RunItem, cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }
    let mut out = io::stdout().lock();
    write_item_outcome(&mut out, item, cfg.color);
}

fn write_item_outcome(out: &mut dyn Write, item: &RunItem, color: bool) {
    match item {
        RunItem::Skipped { name, reason } => {
            let _ = writeln!(out, "Skipping {name} cleanup ({reason})");
        }
        RunItem::Ran(r) => {
            match &r.error {
                Some(err) => {
                    let _ = writeln!(out, "{}", paint(&format!("Error: {err}"), "31", color));
                }
                None => {
                    let _ = writeln!(
                        out,
                        "{}",
                        paint(&format!("{} cleanup completed", r.name), "32", color)
                    );
                    let _ = writeln!(out, "Space freed: {}", format_freed(r.space_freed));
                }
            }
            let _ = writeln!(out, "Time taken: {}", format_duration(r.duration));
        }
    }
    let _ = writeln!(out);
}

pub fn print_run_report(items: &[RunItem], summary: &RunSummary, cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }
    let mut out = io::stdout().lock();
    write_run_report(&mut out, items, summary, cfg.color);
}

fn write_run_report(out: &mut dyn Write, items: &[RunItem], summary: &RunSummary, color: bool) {
    let _ = writeln!(
        out,
        "Free disk space before cleanup: {}",
        format_bytes(summary.free_before)
    );
    let _ = writeln!(
        out,
        "Free disk space after cleanup: {}",
        format_bytes(summary.free_after)
    );
    let _ = writeln!(out);
    if summary.items_freed > 0 {
        let _ = writeln!(
            out,
            "{}",
            paint(
                &format!("Total disk space freed: {}", format_bytes(summary.items_freed)),
                "32",
                color
            )
        );
    } else {
        let _ = writeln!(out, "Insignificant disk space freed.");
        let _ = writeln!(
            out,
            "The system may already have been clean, or freed space was reallocated right away."
        );
    }

    if items.is_empty() {
        return;
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Cleanup Summary:");

    let rows: Vec<[String; 4]> = items
        .iter()
        .map(|item| match item {
            RunItem::Skipped { name, .. } => [
                name.clone(),
                paint("Skipped", "33", color),
                "-".to_string(),
                "-".to_string(),
            ],
            RunItem::Ran(r) if r.success => [
                r.name.clone(),
                paint("Success", "32", color),
                format_freed(r.space_freed),
                format_duration(r.duration),
            ],
            RunItem::Ran(r) => [
                r.name.clone(),
                paint("Error", "31", color),
                "-".to_string(),
                format_duration(r.duration),
            ],
        })
        .collect();

    let headers = ["Type", "Status", "Space Freed", "Time Taken"];
    let footer = [
        "Total".to_string(),
        format!("{}/{} ok", summary.succeeded, summary.total()),
        format_bytes(summary.items_freed),
        String::new(),
    ];
    let mut widths = headers.map(visible_width_ansi);
    for row in rows.iter().chain(std::iter::once(&footer)) {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(visible_width_ansi(cell));
        }
    }

    let line = |cells: [&str; 4]| {
        format!(
            "{}  {}  {}  {}",
            pad_end_display(cells[0], widths[0]),
            pad_end_display(cells[1], widths[1]),
            pad_start_display(cells[2], widths[2]),
            pad_start_display(cells[3], widths[3]),
        )
    };

    let _ = writeln!(out, "{}", line(headers));
    let rule = widths.map(|w| "-".repeat(w));
    let _ = writeln!(out, "{}", line([&rule[0], &rule[1], &rule[2], &rule[3]]));
    for row in &rows {
        let _ = writeln!(out, "{}", line([&row[0], &row[1], &row[2], &row[3]]).trim_end());
    }
    let _ = writeln!(out, "{}", line([&rule[0], &rule[1], &rule[2], &rule[3]]));
    let _ = writeln!(
        out,
        "{}",
        line([&footer[0], &footer[1], &footer[2], &footer[3]]).trim_end()
    );
}

fn paint(s: &str, code: &str, color: bool) -> String {
    if !color {
        return s.to_string();
    }
    format!("\x1b[{code}m{s}\x1b[0m")
}

fn format_freed(bytes: u64) -> String {
    if bytes == 0 {
        return "Insignificant".to_string();
    }
    format_bytes(bytes)
}

pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 1.0 {
        format!("{:.2}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{secs:.2}s")
    } else {
        format!("{:.2}m", secs / 60.0)
    }
}

pub fn pad_end_display(s: &str, width: usize) -> String {
    let w = visible_width_ansi(s);
    if w >= width {
        return s.to_string();
    }
    format!("{s}{}", " ".repeat(width - w))
}

fn pad_start_display(s: &str, width: usize) -> String {
    let w = visible_width_ansi(s);
    if w >= width {
        return s.to_string();
    }
    format!("{}{}", " ".repeat(width - w), s)
}

fn visible_width_ansi(s: &str) -> usize {
    let mut width: usize = 0;
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            let _ = chars.next();
            for ch2 in chars.by_ref() {
                if ch2 == 'm' {
                    break;
                }
            }
            continue;
        }
        width = width.saturating_add(UnicodeWidthChar::width(ch).unwrap_or(0));
    }
    width
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    const TB: f64 = GB * 1024.0;

    let b = bytes as f64;
    if b < KB {
        return format!("{bytes} B");
    }
    if b < MB {
        return format!("{:.1} KiB", b / KB);
    }
    if b < GB {
        return format!("{:.1} MiB", b / MB);
    }
    if b < TB {
        return format!("{:.1} GiB", b / GB);
    }
    format!("{:.1} TiB", b / TB)
}
