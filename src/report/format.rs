//! Number formatting for report text.

/// Integer with thousands separators: `61837` -> `61,837`.
pub fn thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn signed(value: f64, body: String) -> String {
    if value < 0.0 && body.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-{}", body)
    } else {
        body
    }
}

/// Whole dollars with separators: `483123456.7` -> `$483,123,457`.
pub fn usd_whole(value: f64) -> String {
    if !value.is_finite() {
        return "n/a".to_string();
    }
    let body = format!("${}", thousands(value.abs().round() as u64));
    signed(value, body)
}

/// Dollars and cents: `-5.0` -> `-$5.00`.
pub fn usd(value: f64) -> String {
    if !value.is_finite() {
        return "n/a".to_string();
    }
    let body = format!("${:.2}", value.abs());
    signed(value, body)
}

pub fn usd_opt(value: Option<f64>) -> String {
    value.map(usd).unwrap_or_else(|| "n/a".to_string())
}

/// A 0..1 ratio as a percentage with one decimal: `0.465` -> `46.5%`.
pub fn ratio_percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// A value already in percent: `12.345` -> `12.35%`.
pub fn percent(value: f64) -> String {
    format!("{:.2}%", value)
}
