//! Cell-level coercion for loosely structured Amazon exports.
//!
//! Every function here is total: unparseable input coerces to a safe default
//! (`0`, `""`, `false`) instead of erroring. Because "0 on failure" is
//! indistinguishable from a legitimate zero, parsers gate on required-field
//! presence themselves rather than trusting coercion to signal absence.

/// Strips surrounding whitespace plus leading/trailing single or double quotes.
pub fn clean_string(value: &str) -> String {
    value
        .trim()
        .trim_matches(|character| character == '"' || character == '\'')
        .trim()
        .to_string()
}

/// Normalizes `MM/DD/YY` and `MM/DD/YYYY` to `YYYY-MM-DD`. Two-digit years
/// are assumed to be in the 2000s. Input that is already `YYYY-MM-DD`, or
/// that matches neither shape, is returned unchanged; callers validate
/// non-emptiness separately.
pub fn parse_date(value: &str) -> String {
    let cleaned = clean_string(value);

    if looks_like_iso_date(&cleaned) {
        return cleaned;
    }

    let parts = cleaned.split('/').collect::<Vec<&str>>();
    if parts.len() == 3 {
        let month = parts[0].trim().parse::<u32>();
        let day = parts[1].trim().parse::<u32>();
        let year_raw = parts[2].trim();
        let year = year_raw.parse::<u32>();

        if let (Ok(month), Ok(day), Ok(year)) = (month, day, year)
            && month >= 1
            && month <= 12
            && day >= 1
            && day <= 31
        {
            let full_year = if year_raw.len() == 2 { 2000 + year } else { year };
            return format!("{full_year:04}-{month:02}-{day:02}");
        }
    }

    cleaned
}

/// Strips `$` and thousands separators; non-numeric input coerces to `0`.
pub fn parse_currency(value: &str) -> f64 {
    let cleaned = clean_string(value).replace(['$', ','], "");
    cleaned.parse::<f64>().unwrap_or(0.0)
}

/// Strips a trailing `%`; non-numeric input coerces to `0`.
pub fn parse_percentage(value: &str) -> f64 {
    let cleaned = clean_string(value);
    let stripped = cleaned.strip_suffix('%').unwrap_or(&cleaned).trim();
    stripped.replace(',', "").parse::<f64>().unwrap_or(0.0)
}

/// Strips thousands separators; non-numeric input coerces to `0`.
pub fn parse_int(value: &str) -> i64 {
    let cleaned = clean_string(value).replace(',', "");
    if let Ok(parsed) = cleaned.parse::<i64>() {
        return parsed;
    }
    // Some exports render integer columns as "12.0".
    cleaned.parse::<f64>().map(|parsed| parsed as i64).unwrap_or(0)
}

/// Strips thousands separators; non-numeric input coerces to `0`.
pub fn parse_float(value: &str) -> f64 {
    let cleaned = clean_string(value).replace(',', "");
    cleaned.parse::<f64>().unwrap_or(0.0)
}

/// Case-insensitive match against `true`, `yes`, `1`, `y`; everything else
/// is `false`.
pub fn parse_boolean(value: &str) -> bool {
    matches!(
        clean_string(value).to_lowercase().as_str(),
        "true" | "yes" | "1" | "y"
    )
}

/// Splits one comma-delimited line with double-quote escaping: a quote
/// toggles an "inside field" flag and a comma inside quotes is literal.
/// Escaped quotes-within-quotes are not handled beyond the toggle.
pub fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut inside_quotes = false;

    for character in line.chars() {
        match character {
            '"' => inside_quotes = !inside_quotes,
            ',' if !inside_quotes => {
                fields.push(clean_string(&current));
                current.clear();
            }
            _ => current.push(character),
        }
    }
    fields.push(clean_string(&current));

    fields
}

/// Splits one tab-delimited line, cleaning each field.
pub fn split_tsv_line(line: &str) -> Vec<String> {
    line.split('\t').map(clean_string).collect()
}

pub(crate) fn looks_like_iso_date(value: &str) -> bool {
    if value.len() != 10 {
        return false;
    }

    let bytes = value.as_bytes();
    if bytes[4] != b'-' || bytes[7] != b'-' {
        return false;
    }

    for index in [0usize, 1, 2, 3, 5, 6, 8, 9] {
        if !bytes[index].is_ascii_digit() {
            return false;
        }
    }

    let month = value[5..7].parse::<u32>();
    let day = value[8..10].parse::<u32>();
    if let (Ok(m), Ok(d)) = (month, day) {
        return m > 0 && m <= 12 && d > 0 && d <= 31;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_string_strips_quotes_and_whitespace() {
        assert_eq!(clean_string("  \"B01ABC123\"  "), "B01ABC123");
        assert_eq!(clean_string("'quoted'"), "quoted");
        assert_eq!(clean_string(""), "");
        assert_eq!(clean_string("  "), "");
    }

    #[test]
    fn parse_date_handles_us_formats() {
        assert_eq!(parse_date("1/5/25"), "2025-01-05");
        assert_eq!(parse_date("01/05/2025"), "2025-01-05");
        assert_eq!(parse_date("12/31/24"), "2024-12-31");
    }

    #[test]
    fn parse_date_passes_iso_through() {
        assert_eq!(parse_date("2025-01-05"), "2025-01-05");
    }

    #[test]
    fn parse_date_returns_unrecognized_input_unchanged() {
        assert_eq!(parse_date("not a date"), "not a date");
        assert_eq!(parse_date("13/45/2025"), "13/45/2025");
        assert_eq!(parse_date(""), "");
    }

    #[test]
    fn parse_currency_strips_symbols() {
        assert_eq!(parse_currency("$1,234.56"), 1234.56);
        assert_eq!(parse_currency("\"$99.00\""), 99.0);
        assert_eq!(parse_currency("n/a"), 0.0);
        assert_eq!(parse_currency(""), 0.0);
    }

    #[test]
    fn parse_percentage_strips_trailing_percent() {
        assert_eq!(parse_percentage("12.5%"), 12.5);
        assert_eq!(parse_percentage("12.5"), 12.5);
        assert_eq!(parse_percentage("--"), 0.0);
    }

    #[test]
    fn parse_int_strips_separators() {
        assert_eq!(parse_int("1,234"), 1234);
        assert_eq!(parse_int("12.0"), 12);
        assert_eq!(parse_int("abc"), 0);
    }

    #[test]
    fn parse_float_strips_separators() {
        assert_eq!(parse_float("1,234.5"), 1234.5);
        assert_eq!(parse_float(""), 0.0);
    }

    #[test]
    fn parse_boolean_accepts_common_truthy_values() {
        assert!(parse_boolean("true"));
        assert!(parse_boolean("Yes"));
        assert!(parse_boolean("1"));
        assert!(parse_boolean("Y"));
        assert!(!parse_boolean("no"));
        assert!(!parse_boolean(""));
    }

    #[test]
    fn split_csv_line_keeps_commas_inside_quotes() {
        assert_eq!(
            split_csv_line("\"Widget, Blue\",B01ABC123,$10.00"),
            vec!["Widget, Blue", "B01ABC123", "$10.00"]
        );
    }

    #[test]
    fn split_csv_line_handles_plain_fields() {
        assert_eq!(split_csv_line("a,b,,c"), vec!["a", "b", "", "c"]);
    }

    #[test]
    fn split_tsv_line_cleans_each_field() {
        assert_eq!(
            split_tsv_line("SKU-1\t\"B01ABC123\"\t 5 "),
            vec!["SKU-1", "B01ABC123", "5"]
        );
    }
}
