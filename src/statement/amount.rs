//! Amount cleaning and direction inference for statement rows

use bigdecimal::BigDecimal;
use std::str::FromStr;
use tracing::debug;

use super::RowError;
use crate::types::BankMovementType;

/// Type-column literals that always mean a debit (compared lowercased)
pub const DEBIT_LITERALS: [&str; 5] = ["d", "debito", "débito", "cargo", "-"];

/// Type-column literals that always mean a credit (compared lowercased)
pub const CREDIT_LITERALS: [&str; 5] = ["c", "credito", "crédito", "abono", "+"];

/// A statement amount split into magnitude and sign
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAmount {
    /// Absolute value
    pub magnitude: BigDecimal,
    /// The cleaned token carried a minus sign
    pub negative: bool,
}

/// Keep only digits, `.`, `,`, `+` and `-`
pub fn clean_amount(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '+' | '-'))
        .collect()
}

/// Parse an amount token as exported by a bank
///
/// When both `.` and `,` occur, the right-most one is the decimal separator
/// and the other is a thousands separator. A single `,` alone is a decimal
/// comma; repeated `,` or repeated `.` are thousands separators.
pub fn parse_amount(raw: &str) -> Result<ParsedAmount, RowError> {
    let cleaned = clean_amount(raw);
    let negative = cleaned.contains('-');
    let body: String = cleaned.chars().filter(|c| !matches!(c, '+' | '-')).collect();

    if !body.bytes().any(|b| b.is_ascii_digit()) {
        return Err(RowError::InvalidAmount(raw.to_string()));
    }

    let mut normalized = match (body.rfind('.'), body.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => body.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => body.replace(',', ""),
        (None, Some(_)) if body.matches(',').count() == 1 => body.replace(',', "."),
        (None, Some(_)) => body.replace(',', ""),
        (Some(_), None) if body.matches('.').count() > 1 => body.replace('.', ""),
        _ => body,
    };
    if normalized.ends_with('.') {
        normalized.pop();
    }
    if normalized.starts_with('.') {
        normalized.insert(0, '0');
    }

    let value = BigDecimal::from_str(&normalized)
        .map_err(|_| RowError::InvalidAmount(raw.to_string()))?;

    Ok(ParsedAmount {
        negative: negative || value < BigDecimal::from(0),
        magnitude: value.abs(),
    })
}

/// Decide whether a row is a debit or a credit
///
/// A negative amount always wins. Otherwise the type token is compared
/// case-insensitively: it is a debit if it contains the configured debit
/// marker or equals a debit literal, then a credit by the same rule. With no
/// signal at all the row is a credit.
pub fn infer_movement_type(
    amount: &ParsedAmount,
    type_token: &str,
    debit_marker: Option<&str>,
    credit_marker: Option<&str>,
) -> BankMovementType {
    if amount.negative {
        return BankMovementType::Debit;
    }

    let token = type_token.trim().to_lowercase();
    if matches_marker(&token, debit_marker, &DEBIT_LITERALS) {
        return BankMovementType::Debit;
    }
    if matches_marker(&token, credit_marker, &CREDIT_LITERALS) {
        return BankMovementType::Credit;
    }

    debug!(type_token, "no direction signal in row, defaulting to credit");
    BankMovementType::Credit
}

/// Whether a token is one of the built-in direction literals
pub fn is_direction_literal(token: &str) -> bool {
    let token = token.trim().to_lowercase();
    DEBIT_LITERALS.contains(&token.as_str()) || CREDIT_LITERALS.contains(&token.as_str())
}

fn matches_marker(token: &str, configured: Option<&str>, literals: &[&str]) -> bool {
    if token.is_empty() {
        return false;
    }

    let configured_match = configured
        .map(str::trim)
        .filter(|marker| !marker.is_empty())
        .is_some_and(|marker| token.contains(&marker.to_lowercase()));

    configured_match || literals.contains(&token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(raw: &str) -> ParsedAmount {
        parse_amount(raw).unwrap()
    }

    fn decimal(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_plain_and_signed_amounts() {
        assert_eq!(amount("100.50").magnitude, decimal("100.50"));
        assert!(!amount("100.50").negative);
        assert_eq!(amount("-42").magnitude, decimal("42"));
        assert!(amount("-42").negative);
        assert!(amount("42.00-").negative);
        assert!(!amount("+7").negative);
    }

    #[test]
    fn test_parse_separators() {
        assert_eq!(amount("1.234,56").magnitude, decimal("1234.56"));
        assert_eq!(amount("1,234.56").magnitude, decimal("1234.56"));
        assert_eq!(amount("12,5").magnitude, decimal("12.5"));
        assert_eq!(amount("1,234,567").magnitude, decimal("1234567"));
        assert_eq!(amount("1.234.567").magnitude, decimal("1234567"));
        assert_eq!(amount("$ 2 500,00 USD").magnitude, decimal("2500.00"));
        assert_eq!(amount(".5").magnitude, decimal("0.5"));
    }

    #[test]
    fn test_unparsable_amounts() {
        assert_eq!(
            parse_amount("n/a"),
            Err(RowError::InvalidAmount("n/a".to_string()))
        );
        assert!(parse_amount("").is_err());
        assert!(parse_amount("--").is_err());
        assert!(parse_amount("1.2.3,4,5").is_err());
    }

    #[test]
    fn test_negative_amount_always_debit() {
        for marker in ["ABONO", "C", "credito", "+", ""] {
            assert_eq!(
                infer_movement_type(&amount("-10"), marker, Some("DB"), Some("CR")),
                BankMovementType::Debit
            );
        }
    }

    #[test]
    fn test_markers_and_literals() {
        let positive = amount("10");
        assert_eq!(
            infer_movement_type(&positive, "Pago DB", Some("DB"), Some("CR")),
            BankMovementType::Debit
        );
        assert_eq!(
            infer_movement_type(&positive, "cr", Some("DB"), Some("CR")),
            BankMovementType::Credit
        );
        assert_eq!(
            infer_movement_type(&positive, "Débito", None, None),
            BankMovementType::Debit
        );
        assert_eq!(
            infer_movement_type(&positive, "CREDITO", None, None),
            BankMovementType::Credit
        );
        assert_eq!(
            infer_movement_type(&positive, "-", None, None),
            BankMovementType::Debit
        );
    }

    #[test]
    fn test_ambiguous_row_defaults_to_credit() {
        assert_eq!(
            infer_movement_type(&amount("10"), "", Some(""), Some("")),
            BankMovementType::Credit
        );
        assert_eq!(
            infer_movement_type(&amount("10"), "transfer", None, None),
            BankMovementType::Credit
        );
    }
}
