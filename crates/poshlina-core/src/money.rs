//! Rouble amount helpers.

/// Round a rouble amount to whole kopecks.
pub fn round_money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Format a rouble amount with space-grouped thousands: `4200.5` → `"4 200.50 ₽"`.
pub fn format_rub(value: f64) -> String {
    let rounded = round_money(value.abs());
    let whole = rounded.trunc() as u64;
    let kopecks = ((rounded - rounded.trunc()) * 100.0).round() as u64;

    let sign = if value < 0.0 && rounded > 0.0 { "-" } else { "" };
    format!("{sign}{}.{kopecks:02} ₽", format_amount(whole))
}

/// Format a bracket boundary without kopecks: `1000000` → `"1 000 000"`.
pub fn format_amount(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_kopecks() {
        assert_eq!(round_money(1000.0000000000001), 1000.0);
        assert_eq!(round_money(800.016), 800.02);
        assert_eq!(round_money(0.004), 0.0);
    }

    #[test]
    fn formats_grouped_roubles() {
        assert_eq!(format_rub(4200.0), "4 200.00 ₽");
        assert_eq!(format_rub(400.5), "400.50 ₽");
        assert_eq!(format_rub(1_000_000.0), "1 000 000.00 ₽");
        assert_eq!(format_rub(-1000.0), "-1 000.00 ₽");
        assert_eq!(format_rub(0.0), "0.00 ₽");
    }

    #[test]
    fn formats_bracket_boundaries() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(20_000), "20 000");
        assert_eq!(format_amount(2_000_000), "2 000 000");
    }
}
