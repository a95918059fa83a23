// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        pub(crate) fn $name() -> &'static ::regex::Regex {
            static R: ::std::sync::OnceLock<::regex::Regex> = ::std::sync::OnceLock::new();
            R.get_or_init(|| ::regex::Regex::new($pat).expect("invalid regex"))
        }
    };
}

pub(crate) use re;

// Grouped thousands stay one token: "1,234.56", not "1,234" + "56".
re!(re_numeric_token, r"\d[\d,]*(?:\.\d+)?");
re!(re_leading_number, r"\d+(?:\.\d*)?");
re!(re_price_token, r"^[₹$€£]?\d+(?:\.\d{1,2})?$");
re!(re_numeric_only, r"^[\d.,\s]+$");
re!(re_money_only, r"^[\d.,\s₹$€£]+$");
re!(re_trailing_numeric, r"[\d.,\s₹$€£:]+$");
re!(re_trailing_quoted, r#""[^"]*"$"#);
re!(re_quoted_key, r#""[^"]+"\s*:\s*"#);
re!(re_record_words,
    r"(?i)\b(?:item|amount|rate|quantity|is success|data|pagewise|line items)\b");
re!(re_whitespace, r"\s+");

/// Numeric tokens in reading order.
pub(crate) fn numeric_tokens(text: &str) -> Vec<&str> {
    re_numeric_token().find_iter(text).map(|m| m.as_str()).collect()
}

/// Lenient number parse: grouping commas are dropped, and if the result still
/// is not a number the first digit run is used. Unparseable input is `0.0`.
pub(crate) fn parse_money(value: &str) -> f64 {
    let clean = value.trim().replace(',', "");
    if let Ok(v) = clean.parse::<f64>() {
        if v.is_finite() {
            return v;
        }
    }
    re_leading_number()
        .find(&clean)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// The amount carried by a token or a numeric-only line: its last number.
pub(crate) fn parse_candidate_amount(text: &str) -> f64 {
    match numeric_tokens(text).last() {
        Some(tok) => parse_money(tok),
        None => parse_money(text),
    }
}

/// Optional currency symbol, digits, optional one or two decimals.
pub(crate) fn is_price_token(token: &str) -> bool {
    let compact: String = token
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != ' ')
        .collect();
    re_price_token().is_match(&compact)
}

/// Has a decimal or grouping separator, or at least three digits.
pub(crate) fn looks_like_money(text: &str) -> bool {
    let s = text.trim();
    if s.is_empty() {
        return false;
    }
    if s.contains(',') || s.contains('.') {
        return true;
    }
    s.chars().filter(char::is_ascii_digit).count() >= 3
}

pub(crate) fn is_numeric_only(text: &str) -> bool {
    re_numeric_only().is_match(text)
}

pub(crate) fn is_money_only(text: &str) -> bool {
    re_money_only().is_match(text)
}

/// Removes serialized-record residue (quoted keys, brackets, quotes, field
/// words) from a candidate item name.
pub(crate) fn clean_record_noise(text: &str) -> String {
    let cleaned = re_quoted_key().replace_all(text, "");
    let cleaned: String = cleaned
        .chars()
        .filter(|c| !matches!(c, '{' | '}' | '[' | ']' | '"'))
        .collect();
    let cleaned = re_record_words().replace_all(&cleaned, "");
    re_whitespace().replace_all(&cleaned, " ").trim().to_string()
}

/// Drops trailing numbers, currency, separators and a trailing quoted value.
pub(crate) fn strip_trailing_numbers(text: &str) -> String {
    let t = re_trailing_numeric().replace(text, "");
    let t = re_trailing_quoted().replace(t.trim(), "");
    t.trim()
        .trim_end_matches(|c: char| matches!(c, '"' | ':' | ',' | '{' | '}' | '[' | ']' | ' '))
        .trim()
        .to_string()
}

/// Name candidate from a line's text: record residue and trailing numbers removed.
pub(crate) fn name_from_text(text: &str) -> String {
    strip_trailing_numbers(&clean_record_noise(text))
}
