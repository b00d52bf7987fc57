// src/services/formatting.rs
//! Display strings for magnitudes and ratios. Every function here is pure and
//! total over `Option` inputs.

const TRILLION: i64 = 1_000_000_000_000;
const BILLION: i64 = 1_000_000_000;
const MILLION: i64 = 1_000_000;

pub const MISSING_MARKET_CAP: &str = "-";
pub const NOT_AVAILABLE: &str = "N/A";
pub const MISSING_LINE_ITEM: &str = "--";

/// Market cap with a T/B/M scale, always prefixed with `₺`. Absent → `"-"`.
pub fn format_market_cap(market_cap: Option<f64>) -> String {
    let market_cap = match market_cap {
        Some(v) if v.is_finite() => v.trunc() as i64,
        _ => return MISSING_MARKET_CAP.to_string(),
    };

    if market_cap >= TRILLION {
        format!("₺{:.3}T", market_cap as f64 / TRILLION as f64)
    } else if market_cap >= BILLION {
        format!("₺{:.3}B", market_cap as f64 / BILLION as f64)
    } else if market_cap >= MILLION {
        format!("₺{:.3}M", market_cap as f64 / MILLION as f64)
    } else {
        format!("₺{}", market_cap)
    }
}

/// Billions with two decimals, negative values prefixed `"- "`.
/// Shared by free cash flow and total debt.
pub fn format_signed_billions(value: Option<f64>) -> Option<String> {
    let value = value.filter(|v| v.is_finite())?;
    let billions = value.abs() / BILLION as f64;

    if value < 0.0 {
        Some(format!("- {:.2}B", billions))
    } else {
        Some(format!("{:.2}B", billions))
    }
}

pub fn format_fixed(value: Option<f64>, decimals: usize) -> Option<String> {
    value.filter(|v| v.is_finite()).map(|v| format!("{:.*}", decimals, v))
}

/// Two decimals, or `placeholder` when absent.
pub fn format_or(value: Option<f64>, placeholder: &str) -> String {
    format_fixed(value, 2).unwrap_or_else(|| placeholder.to_string())
}

/// Return on assets as a percentage, 4 decimals.
pub fn format_roa(roa: Option<f64>) -> Option<String> {
    format_fixed(roa.map(|v| v * 100.0), 4)
}

/// Return on equity as a percentage, 2 decimals.
pub fn format_roe(roe: Option<f64>) -> Option<String> {
    format_fixed(roe.map(|v| v * 100.0), 2)
}

/// Cash-to-market-cap, 4 decimals, sign dropped for display.
pub fn format_cash_to_market_cap(ratio: Option<f64>) -> Option<String> {
    let ratio = ratio.filter(|v| v.is_finite())?;
    let formatted = format!("{:.4}", ratio);
    if ratio < 0.0 {
        Some(formatted.trim_start_matches('-').to_string())
    } else {
        Some(formatted)
    }
}

/// Signed percentage with one decimal, e.g. `-12.3%`.
pub fn format_percent_label(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Thousands-grouped, zero decimals, with trailing fractional zeros and a
/// dangling decimal separator removed.
pub fn format_grouped(value: f64) -> String {
    let rendered = format!("{:.0}", value);
    let (sign, digits) = match rendered.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rendered.as_str()),
    };
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let mut out = format!("{}{}", sign, grouped);
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
        out = strip_trailing_fraction(&out);
    }
    if out == "-0" {
        out = "0".to_string();
    }
    out
}

fn strip_trailing_fraction(value: &str) -> String {
    if !value.contains('.') {
        return value.to_string();
    }
    value.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_cap_scales() {
        assert_eq!(format_market_cap(None), "-");
        assert_eq!(format_market_cap(Some(1_500_000_000_000.0)), "₺1.500T");
        assert_eq!(format_market_cap(Some(2_300_000_000.0)), "₺2.300B");
        assert_eq!(format_market_cap(Some(4_200_000.0)), "₺4.200M");
        assert_eq!(format_market_cap(Some(999.0)), "₺999");
    }

    #[test]
    fn market_cap_truncates_before_scaling() {
        assert_eq!(format_market_cap(Some(999_999.9)), "₺999999");
        assert_eq!(format_market_cap(Some(1_000_000.0)), "₺1.000M");
    }

    #[test]
    fn signed_billions() {
        assert_eq!(format_signed_billions(None), None);
        assert_eq!(format_signed_billions(Some(-2_500_000_000.0)).as_deref(), Some("- 2.50B"));
        assert_eq!(format_signed_billions(Some(2_500_000_000.0)).as_deref(), Some("2.50B"));
        assert_eq!(format_signed_billions(Some(0.0)).as_deref(), Some("0.00B"));
    }

    #[test]
    fn formatting_is_repeatable() {
        let a = format_market_cap(Some(123_456_789_012.0));
        let b = format_market_cap(Some(123_456_789_012.0));
        assert_eq!(a, b);
        assert_eq!(format_signed_billions(Some(-7.0e9)), format_signed_billions(Some(-7.0e9)));
    }

    #[test]
    fn ratio_display_scaling() {
        assert_eq!(format_roa(Some(0.05123)).as_deref(), Some("5.1230"));
        assert_eq!(format_roe(Some(0.2345)).as_deref(), Some("23.45"));
        assert_eq!(format_roa(None), None);
        assert_eq!(format_cash_to_market_cap(Some(-0.01234)).as_deref(), Some("0.0123"));
        assert_eq!(format_cash_to_market_cap(Some(0.5)).as_deref(), Some("0.5000"));
        assert_eq!(format_cash_to_market_cap(None), None);
    }

    #[test]
    fn grouped_integers_stay_intact() {
        assert_eq!(format_grouped(1_234_567.0), "1,234,567");
        assert_eq!(format_grouped(-9_876_500.0), "-9,876,500");
        assert_eq!(format_grouped(1_000.0), "1,000");
        assert_eq!(format_grouped(999.4), "999");
        assert_eq!(format_grouped(0.0), "0");
    }

    #[test]
    fn percent_labels() {
        assert_eq!(format_percent_label(50.0), "50.0%");
        assert_eq!(format_percent_label(-12.345), "-12.3%");
    }

    #[test]
    fn placeholders() {
        assert_eq!(format_or(None, NOT_AVAILABLE), "N/A");
        assert_eq!(format_or(Some(3.14159), NOT_AVAILABLE), "3.14");
    }
}
