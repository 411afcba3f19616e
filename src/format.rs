/// Display formatting for amounts in lempiras, counts and percentages.
///
/// Figures are grouped with commas (`1,234,567`) and budgets are shown in
/// millions (`L 12.3M`), matching how the Honduran finance reports print them.

/// Groups the integer part of `value` in thousands, with `decimals`
/// fractional digits.
pub fn format_number(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') { "-" } else { "" };
    match frac_part {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

/// An amount in millions of lempiras: `L 12.3M`.
pub fn format_millions(amount: f64) -> String {
    format!("L {}M", format_number(amount / 1_000_000.0, 1))
}

/// A percentage with one decimal: `12.3%`.
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}
