//! Canonical forms for entity names, codes, headers and numeric fields.

use chrono::NaiveDate;

/// Canonical entity key: trimmed, single-spaced, upper-case.
pub fn canonical_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for word in raw.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.extend(word.chars().flat_map(char::to_uppercase));
    }
    out
}

/// Trimmed code with surrounding quotes removed. Returns `None` when nothing
/// is left.
pub fn canonical_code(raw: &str) -> Option<String> {
    let code = raw
        .trim()
        .trim_matches(|c| c == '\'' || c == '"')
        .trim();
    if code.is_empty() {
        None
    } else {
        Some(code.to_string())
    }
}

/// Map Portuguese accented letters to their ASCII base letter.
pub fn fold_accents(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            'ç' => 'c',
            'Ç' => 'C',
            'ñ' => 'n',
            'Ñ' => 'N',
            other => other,
        })
        .collect()
}

/// Key used to match CSV headers: BOM stripped, accents folded, upper-case,
/// single-spaced.
pub fn header_key(raw: &str) -> String {
    canonical_name(&fold_accents(raw.trim_start_matches('\u{feff}')))
}

/// Parse a monetary amount. Accepts `1.234,56`, `1234,56`, `1234.56` and an
/// optional `R$` prefix. Returns `None` for anything else.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.trim();
    let s = s.strip_prefix("R$").unwrap_or(s).trim();
    if s.is_empty() {
        return None;
    }

    // Brazilian format: dots group thousands, comma is the decimal mark
    let normalised = if s.contains(',') {
        s.replace('.', "").replace(',', ".")
    } else {
        s.to_string()
    };

    let value: f64 = normalised.parse().ok()?;
    value.is_finite().then_some(value)
}

/// Parse `dd/mm/yyyy` or ISO `yyyy-mm-dd`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .ok()
}

/// Normalise a competence month (`yyyymm`, `yyyy-mm` or `mm/yyyy`) to `yyyymm`.
pub fn parse_month(raw: &str) -> Option<String> {
    let s = raw.trim();
    let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 6 {
        return None;
    }
    let (year, month) = if s.contains('/') {
        // mm/yyyy
        (&digits[2..], &digits[..2])
    } else {
        (&digits[..4], &digits[4..])
    };
    let m: u32 = month.parse().ok()?;
    if !(1..=12).contains(&m) {
        return None;
    }
    Some(format!("{year}{month}"))
}

/// Decode one CSV field: UTF-8 when valid, Latin-1 otherwise.
pub fn decode_field(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
