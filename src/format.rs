//! Display strings for dashboard numbers.
//!
//! Magnitude suffixes follow Indonesian usage: `Jt` (juta, 10^6),
//! `M` (miliar, 10^9), `T` (triliun, 10^12). Thousands are grouped with `,`.

const MILLION: f64 = 1e6;
const BILLION: f64 = 1e9;
const TRILLION: f64 = 1e12;

/// `Rp 1.50 M`, `Rp 2.30 T`, `Rp 12.35 Jt`, `Rp 950,000`.
pub fn format_currency(value: f64) -> String {
    if value >= TRILLION {
        format!("Rp {:.2} T", value / TRILLION)
    } else if value >= BILLION {
        format!("Rp {:.2} M", value / BILLION)
    } else if value >= MILLION {
        format!("Rp {:.2} Jt", value / MILLION)
    } else {
        format!("Rp {}", group_thousands(value, 0))
    }
}

/// Decimals per magnitude tier for [`format_compact_currency`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactScale {
    pub trillion: usize,
    pub billion: usize,
    pub million: usize,
}

impl CompactScale {
    /// Bar labels on the promo performance charts: `1.5M`, `850Jt`.
    pub const COARSE: CompactScale = CompactScale {
        trillion: 1,
        billion: 1,
        million: 0,
    };
    /// Bar labels on the ended promo charts: `1.25M`, `850.5Jt`.
    pub const FINE: CompactScale = CompactScale {
        trillion: 1,
        billion: 2,
        million: 1,
    };
}

/// Short currency label without the `Rp` prefix, for chart annotations.
pub fn format_compact_currency(value: f64, scale: CompactScale) -> String {
    if value >= TRILLION {
        format!("{:.*}T", scale.trillion, value / TRILLION)
    } else if value >= BILLION {
        format!("{:.*}M", scale.billion, value / BILLION)
    } else if value >= MILLION {
        format!("{:.*}Jt", scale.million, value / MILLION)
    } else {
        group_thousands(value, 0)
    }
}

/// Head counts: `1.23 Jt`, `45.6 K`, `987`.
pub fn format_number(value: f64) -> String {
    if value >= MILLION {
        format!("{:.2} Jt", value / MILLION)
    } else if value >= 1e3 {
        format!("{:.1} K", value / 1e3)
    } else {
        group_thousands(value, 0)
    }
}

/// A fraction as a percentage: `format_percent(0.0234, 2)` is `2.34%`.
///
/// Use precision 4 for ratios that are usually tiny, such as conversions
/// per customer visit.
pub fn format_percent(fraction: f64, precision: usize) -> String {
    format!("{:.*}%", precision, fraction * 100.0)
}

/// Whole count with thousands separators: `12,345`.
pub fn format_count(value: f64) -> String {
    group_thousands(value, 0)
}

/// Apply `f` to a present value, `-` for a missing one.
pub fn or_dash(value: Option<f64>, f: impl FnOnce(f64) -> String) -> String {
    value.map(f).unwrap_or_else(|| "-".to_string())
}

/// Fixed `decimals`, integer part grouped by thousands.
pub fn group_thousands(value: f64, decimals: usize) -> String {
    let text = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3 + 2);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(f) = frac_part {
        grouped.push('.');
        grouped.push_str(f);
    }

    let is_zero = text.chars().all(|c| c == '0' || c == '.');
    if value < 0.0 && !is_zero {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_tiers() {
        assert_eq!(format_currency(1_500_000_000.0), "Rp 1.50 M");
        assert_eq!(format_currency(2_300_000_000_000.0), "Rp 2.30 T");
        assert_eq!(format_currency(12_345_678.0), "Rp 12.35 Jt");
        assert_eq!(format_currency(950_000.0), "Rp 950,000");
        assert_eq!(format_currency(0.0), "Rp 0");
    }

    #[test]
    fn compact_tiers() {
        assert_eq!(format_compact_currency(1_540_000_000.0, CompactScale::COARSE), "1.5M");
        assert_eq!(format_compact_currency(1_254_000_000.0, CompactScale::FINE), "1.25M");
        assert_eq!(format_compact_currency(850_400_000.0, CompactScale::COARSE), "850Jt");
        assert_eq!(format_compact_currency(850_400_000.0, CompactScale::FINE), "850.4Jt");
        assert_eq!(format_compact_currency(3_100_000_000_000.0, CompactScale::FINE), "3.1T");
        assert_eq!(format_compact_currency(12_500.0, CompactScale::FINE), "12,500");
    }

    #[test]
    fn numbers_and_percentages() {
        assert_eq!(format_number(1_234_567.0), "1.23 Jt");
        assert_eq!(format_number(45_600.0), "45.6 K");
        assert_eq!(format_number(987.0), "987");
        assert_eq!(format_percent(0.0234, 2), "2.34%");
        assert_eq!(format_percent(0.000123, 4), "0.0123%");
        assert_eq!(format_count(1234567.0), "1,234,567");
        assert_eq!(or_dash(None, format_number), "-");
        assert_eq!(or_dash(Some(12.0), format_count), "12");
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(1234.5, 2), "1,234.50");
        assert_eq!(group_thousands(-1234.0, 0), "-1,234");
        assert_eq!(group_thousands(-0.2, 0), "0");
        assert_eq!(group_thousands(100.0, 0), "100");
        assert_eq!(group_thousands(100000.0, 0), "100,000");
    }
}
