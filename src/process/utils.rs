use arrow::datatypes::DataType;

/// 1) Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// 2) Parse a cleaned cell as a finite number. `"NaN"`, `"inf"` and any
/// non-numeric text yield `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    clean_str(raw)
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// 3) Parse a cleaned cell as an integer. Whole floats (`"11.0"`) are
/// accepted since spreadsheets store every number as a float.
pub fn parse_integer(raw: &str) -> Option<i64> {
    let v = parse_number(raw)?;
    if v.fract() == 0.0 && v >= i64::MIN as f64 && v <= i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

/// 4) Guess an Arrow dtype from sample cells: `Float64` when every non-blank
/// sample parses as a number, `Utf8` otherwise.
pub fn infer_arrow_dtype<'a, I>(samples: I) -> DataType
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = false;
    for s in samples {
        let c = clean_str(s);
        if c.is_empty() {
            continue;
        }
        if parse_number(&c).is_none() {
            return DataType::Utf8;
        }
        seen = true;
    }
    if seen {
        DataType::Float64
    } else {
        DataType::Utf8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers() {
        assert_eq!(parse_number(" 1500000000 "), Some(1.5e9));
        assert_eq!(parse_number("\"0.0234\""), Some(0.0234));
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("#DIV/0!"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_integer("11.0"), Some(11));
        assert_eq!(parse_integer("11.5"), None);
    }

    #[test]
    fn infers_dtype() {
        assert_eq!(infer_arrow_dtype(["1", " ", "2.5"]), DataType::Float64);
        assert_eq!(infer_arrow_dtype(["1", "abc"]), DataType::Utf8);
        assert_eq!(infer_arrow_dtype(Vec::<&str>::new()), DataType::Utf8);
    }
}
