//! Lenient numeric price parsing for spreadsheet-sourced values.

use serde_json::Value;

/// Parses a JSON price cell.
///
/// Numbers are taken as-is; strings go through [`parse_price_str`]. Every
/// other shape, and any non-finite result, yields `None`.
#[must_use]
pub fn parse_price(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_price_str(s),
        _ => None,
    }
}

/// Parses a textual price such as `"12.5"`, `"١٢٫٥ ج.م"`, `"1,250"` or `"12,5"`.
///
/// Arabic-Indic and extended Arabic-Indic digits become ASCII, the Arabic
/// thousands separator is dropped and the Arabic decimal separator becomes
/// `.`. Commas are thousands separators when a `.` is also present or when
/// every comma-separated group after the first has exactly three digits;
/// otherwise a single comma is the decimal separator. A `.` only counts as a
/// decimal point when a digit follows it and no letter precedes it, so
/// abbreviations such as `ج.م` or `Rs.` do not leak into the number.
/// Anything left that is not a digit, `.` or `-` is stripped before parsing.
#[must_use]
pub fn parse_price_str(raw: &str) -> Option<f64> {
    let mut text = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        match c {
            '\u{0660}'..='\u{0669}' => text.push(shift_digit(c, '\u{0660}')),
            '\u{06F0}'..='\u{06F9}' => text.push(shift_digit(c, '\u{06F0}')),
            '\u{066B}' => text.push('.'),
            '\u{066C}' => {}
            '\u{060C}' => text.push(','),
            other => text.push(other),
        }
    }

    let chars: Vec<char> = normalize_commas(&text).chars().collect();
    let numeric: String = chars
        .iter()
        .enumerate()
        .filter(|&(i, &c)| match c {
            '.' => is_decimal_point(&chars, i),
            '-' => true,
            c => c.is_ascii_digit(),
        })
        .map(|(_, &c)| c)
        .collect();

    if !numeric.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    numeric.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn is_decimal_point(chars: &[char], i: usize) -> bool {
    let digit_follows = chars.get(i + 1).is_some_and(char::is_ascii_digit);
    let letter_precedes = i > 0 && chars[i - 1].is_alphabetic();
    digit_follows && !letter_precedes
}

fn shift_digit(c: char, zero: char) -> char {
    char::from_digit(u32::from(c) - u32::from(zero), 10).unwrap_or('0')
}

fn normalize_commas(text: &str) -> String {
    if !text.contains(',') {
        return text.to_string();
    }
    if text.contains('.') {
        return text.replace(',', "");
    }

    let digits_only: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',')
        .collect();
    let groups: Vec<&str> = digits_only.split(',').collect();
    let thousands = groups.len() > 1
        && !groups[0].is_empty()
        && groups[1..].iter().all(|g| g.len() == 3);

    if thousands {
        text.replace(',', "")
    } else if groups.len() == 2 {
        text.replace(',', ".")
    } else {
        text.replace(',', "")
    }
}
