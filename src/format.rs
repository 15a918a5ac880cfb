// 💵 Display helpers shared by the CLI and the terminal UI

use chrono::{DateTime, Utc};

/// Whole US dollars with thousands separators: 75000 -> "$75,000"
pub fn currency(amount: f64) -> String {
    let rounded = amount.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}${}", sign, grouped)
}

pub fn percent(value: impl Into<f64>) -> String {
    format!("{:.0}%", value.into())
}

/// "Jan 22, 2024"
pub fn date(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%b %d, %Y").to_string()
}
