use crate::ast::Literal;

const INTEGER_SUFFIXES: &[char] = &['i', 'I', 'l', 'L', 'g', 'G'];
const DECIMAL_SUFFIXES: &[char] = &['f', 'F', 'd', 'D', 'g', 'G'];

/// Interpret a raw numeric literal. `negative` applies a folded unary minus.
pub fn parse_number(raw: &str, negative: bool) -> Result<Literal, String> {
    let text: String = raw.chars().filter(|c| *c != '_').collect();
    let lower = text.to_ascii_lowercase();

    if lower.starts_with("0x") || lower.starts_with("0b") {
        let radix = if lower.starts_with("0x") { 16 } else { 2 };
        let digits = text[2..].trim_end_matches(INTEGER_SUFFIXES);
        return parse_integer(digits, radix, negative).ok_or_else(|| format!("Invalid integer literal '{}'", raw));
    }

    let is_decimal = lower.contains('.')
        || lower.contains('e')
        || text.ends_with(['f', 'F', 'd', 'D']);
    if is_decimal {
        let digits = text.trim_end_matches(DECIMAL_SUFFIXES);
        return match digits.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Literal::Decimal(if negative { -value } else { value })),
            _ => Err(format!("Invalid decimal literal '{}'", raw)),
        };
    }

    let digits = text.trim_end_matches(INTEGER_SUFFIXES);
    let radix = if digits.len() > 1 && digits.starts_with('0') { 8 } else { 10 };
    let digits = if radix == 8 { &digits[1..] } else { digits };
    parse_integer(digits, radix, negative).ok_or_else(|| format!("Invalid integer literal '{}'", raw))
}

fn parse_integer(digits: &str, radix: u32, negative: bool) -> Option<Literal> {
    if digits.is_empty() {
        return None;
    }
    let magnitude = u64::from_str_radix(digits, radix).ok()?;
    let value = if negative {
        0i64.checked_sub_unsigned(magnitude)?
    } else {
        i64::try_from(magnitude).ok()?
    };
    Some(Literal::Integer(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_forms() {
        assert_eq!(parse_number("42", false), Ok(Literal::Integer(42)));
        assert_eq!(parse_number("1_000", false), Ok(Literal::Integer(1000)));
        assert_eq!(parse_number("0x1F", false), Ok(Literal::Integer(31)));
        assert_eq!(parse_number("0b101", false), Ok(Literal::Integer(5)));
        assert_eq!(parse_number("017", false), Ok(Literal::Integer(15)));
        assert_eq!(parse_number("10L", false), Ok(Literal::Integer(10)));
        assert_eq!(parse_number("0", false), Ok(Literal::Integer(0)));
    }

    #[test]
    fn test_decimal_forms() {
        assert_eq!(parse_number("2.5", false), Ok(Literal::Decimal(2.5)));
        assert_eq!(parse_number("1e3", false), Ok(Literal::Decimal(1000.0)));
        assert_eq!(parse_number("3f", false), Ok(Literal::Decimal(3.0)));
        assert_eq!(parse_number("1.5d", true), Ok(Literal::Decimal(-1.5)));
    }

    #[test]
    fn test_negative_bounds() {
        assert_eq!(parse_number("9223372036854775808", true), Ok(Literal::Integer(i64::MIN)));
        assert!(parse_number("9223372036854775808", false).is_err());
    }

    #[test]
    fn test_malformed() {
        assert!(parse_number("09", false).is_err());
        assert!(parse_number("0x", false).is_err());
        assert!(parse_number("99999999999999999999", false).is_err());
    }
}
