const NULL_SENTINELS: [&str; 7] = ["n/a", "na", "—", "–", "-", "nil", "none"];
const CURRENCY_SYMBOLS: [char; 6] = ['$', '€', '£', '¥', '₹', '¢'];
const MINUS_VARIANTS: [char; 5] = ['\u{2212}', '\u{2012}', '\u{2013}', '\u{FE63}', '\u{FF0D}'];

/// Turns a noisy financial cell ("$ (1,234.5)", "n/a", "12%") into a float.
/// Returns `None` for anything that carries no number; never panics.
pub fn clean_numeric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let lowered = trimmed.to_lowercase();
    if NULL_SENTINELS.contains(&lowered.as_str()) {
        return None;
    }

    let mut text = trimmed
        .chars()
        .map(|ch| if MINUS_VARIANTS.contains(&ch) { '-' } else { ch })
        .filter(|ch| !CURRENCY_SYMBOLS.contains(ch) && *ch != '%')
        .filter(|ch| !ch.is_whitespace())
        .collect::<String>();

    if text.starts_with('(') && text.ends_with(')') && text.len() >= 2 {
        text = format!("-{}", &text[1..text.len() - 1]);
    }

    let text = text.replace(',', "");
    let token = first_numeric_token(&text)?;
    token.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Finds the first `-?\d+(\.\d+)?` run in `text`.
fn first_numeric_token(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start_digit = bytes.iter().position(u8::is_ascii_digit)?;
    let start = if start_digit > 0 && bytes[start_digit - 1] == b'-' {
        start_digit - 1
    } else {
        start_digit
    };

    let mut end = start_digit;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }

    if end + 1 < bytes.len() && bytes[end] == b'.' && bytes[end + 1].is_ascii_digit() {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }

    Some(&text[start..end])
}

/// Multiplier implied by scale words near a match ("in millions").
/// Larger scales win when several appear in the same window.
pub fn detect_scale(text: &str, match_start: usize, match_end: usize, window: usize) -> f64 {
    let context = window_around(text, match_start, match_end, window).to_lowercase();

    if context.contains("billion") {
        1_000_000_000.0
    } else if context.contains("million") {
        1_000_000.0
    } else if context.contains("thousand") {
        1_000.0
    } else {
        1.0
    }
}

fn window_around(text: &str, match_start: usize, match_end: usize, window: usize) -> &str {
    let mut start = match_start.saturating_sub(window);
    while start > 0 && !text.is_char_boundary(start) {
        start -= 1;
    }

    let mut end = match_end.saturating_add(window).min(text.len());
    while end < text.len() && !text.is_char_boundary(end) {
        end += 1;
    }

    &text[start..end]
}

pub fn looks_numeric(cell: &str) -> bool {
    clean_numeric(cell).is_some()
}
