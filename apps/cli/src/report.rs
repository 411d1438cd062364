use std::fmt::Write;

use respite_core::stats::Summary;

const BAR_WIDTH: u64 = 20;

pub fn render_summary(summary: &Summary) -> String {
    let total = &summary.total;
    let mut out = String::new();

    let _ = writeln!(out, "Rest statistics");
    let _ = writeln!(
        out,
        "  Today      {:>4} rests  {:>5} min",
        summary.today.count, summary.today.minutes
    );
    let _ = writeln!(
        out,
        "  This week  {:>4} rests  {:>5} min",
        summary.this_week.count, summary.this_week.minutes
    );
    let _ = writeln!(
        out,
        "  All time   {:>4} rests  {} h {} min",
        total.count,
        total.hours,
        total.remainder_minutes()
    );
    let _ = writeln!(
        out,
        "  Days used  {:>4}        {:.1} rests/day",
        total.use_days,
        total.average_per_day()
    );

    let _ = writeln!(out);
    let _ = writeln!(out, "Last 7 days");
    let peak = summary
        .last7_days
        .iter()
        .map(|day| day.count)
        .max()
        .unwrap_or(0);
    for day in &summary.last7_days {
        let width = if peak == 0 {
            0
        } else {
            (day.count * BAR_WIDTH).div_ceil(peak)
        };
        let _ = writeln!(
            out,
            "  {}  {:<bar$}  {} ({} min)",
            day.date,
            "#".repeat(width as usize),
            day.count,
            day.minutes,
            bar = BAR_WIDTH as usize
        );
    }
    out
}

/// One-line status, with the countdown while reminders are running.
pub fn status_line(today_count: u64, remaining_seconds: Option<u64>) -> String {
    match remaining_seconds {
        Some(seconds) => format!(
            "next break in {} min | today {today_count}",
            seconds.div_ceil(60)
        ),
        None => format!("Today: {today_count} rests"),
    }
}
