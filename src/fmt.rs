//! Value formatting for chart labels and axes.

/// SI prefixes from 10^-24 to 10^24, in steps of 10^3.
const PREFIXES: [&str; 17] = [
    "y", "z", "a", "f", "p", "n", "µ", "m", "", "k", "M", "G", "T", "P", "E", "Z", "Y",
];

/// Index of the empty prefix in [`PREFIXES`].
const UNIT_INDEX: i32 = 8;

/// Format a value with an SI prefix, truncated to two decimals.
///
/// `1500.0` → `"1.5 k"`, `0.25` → `"250 m"`, `42.0` → `"42"`.
pub fn format_si(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let (scaled, prefix) = compute_si(value);
    let number = trim_decimals((scaled * 100.0).trunc() / 100.0);
    if prefix.is_empty() {
        number
    } else {
        format!("{} {}", number, prefix)
    }
}

/// Split a value into a mantissa in `[1, 1000)` and its SI prefix.
fn compute_si(value: f64) -> (f64, &'static str) {
    if value == 0.0 {
        return (0.0, "");
    }
    let exp = ((value.abs().log10() / 3.0).floor() as i32).clamp(-UNIT_INDEX, UNIT_INDEX);
    // Multiply for negative exponents so that 10^3k stays exact.
    let scaled = if exp >= 0 {
        value / 10f64.powi(3 * exp)
    } else {
        value * 10f64.powi(-3 * exp)
    };
    (scaled, PREFIXES[(exp + UNIT_INDEX) as usize])
}

fn trim_decimals(value: f64) -> String {
    let s = format!("{:.2}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    match s {
        "-0" => "0".to_string(),
        s => s.to_string(),
    }
}
