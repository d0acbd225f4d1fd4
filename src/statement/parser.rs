//! Statement parsing, driven by a mapping configuration or by auto-detection

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::amount::{infer_movement_type, parse_amount};
use super::detect::{detect_layout, ColumnLayout, ColumnRole};
use super::mapping::{DateFormat, MappingConfiguration};
use super::tokenizer::{content_lines, split_line};
use super::{ParsedStatement, RowError, SkippedRow};
use crate::types::*;

#[derive(Debug, Clone, Copy)]
enum DateStrategy {
    Fixed(DateFormat),
    /// Try [`DateFormat::AUTO_DETECTION_ORDER`], first success wins
    Detect,
}

impl DateStrategy {
    fn parse(&self, raw: &str) -> Option<NaiveDate> {
        match self {
            DateStrategy::Fixed(format) => format.parse(raw),
            DateStrategy::Detect => DateFormat::AUTO_DETECTION_ORDER
                .iter()
                .find_map(|format| format.parse(raw)),
        }
    }
}

/// Everything needed to read a single row
struct RowLayout<'a> {
    delimiter: char,
    columns: ColumnLayout,
    dates: DateStrategy,
    debit_marker: Option<&'a str>,
    credit_marker: Option<&'a str>,
}

/// Owner scope stamped on every parsed movement
struct Scope<'a> {
    bank_account_id: &'a str,
    tenant_id: &'a str,
    fallback_date: NaiveDate,
}

struct ParsedRow {
    movement: NormalizedBankMovement,
    date_fell_back: bool,
}

/// Turns raw statement text into normalized bank movements
///
/// Parsing is pure: nothing is persisted and a bad row never fails the
/// whole statement, it is reported in [`ParsedStatement::skipped`] instead.
#[derive(Debug, Clone, Default)]
pub struct StatementParser {
    reference_date: Option<NaiveDate>,
}

impl StatementParser {
    /// Create a parser that falls back to today's date for unreadable dates
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser that falls back to `date` for unreadable dates
    pub fn with_reference_date(date: NaiveDate) -> Self {
        Self {
            reference_date: Some(date),
        }
    }

    fn fallback_date(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| chrono::Utc::now().date_naive())
    }

    /// Parse a statement exactly as a mapping configuration describes it
    ///
    /// Fails only when the configuration itself is invalid, before any row is read.
    pub fn parse_with_configuration(
        &self,
        content: &str,
        config: &MappingConfiguration,
        bank_account_id: &str,
        tenant_id: &str,
    ) -> ReconciliationResult<ParsedStatement> {
        config.validate()?;

        let layout = RowLayout {
            delimiter: config.delimiter.as_char(),
            columns: ColumnLayout {
                date: Some(config.date_column),
                description: Some(config.description_column),
                reference: Some(config.reference_column),
                amount: Some(config.amount_column),
                movement_type: Some(config.type_column),
            },
            dates: DateStrategy::Fixed(config.date_format),
            debit_marker: Some(&config.debit_marker),
            credit_marker: Some(&config.credit_marker),
        };

        debug!(
            configuration_id = %config.id,
            bank = %config.bank_name,
            "parsing statement with mapping configuration"
        );
        let rows = content_lines(content).skip(usize::from(config.has_header));
        Ok(self.parse_rows(rows, &layout, bank_account_id, tenant_id))
    }

    /// Parse a statement whose layout is unknown
    ///
    /// Delimiter, header row, column roles and date format are all detected.
    pub fn parse_automatic(
        &self,
        content: &str,
        bank_account_id: &str,
        tenant_id: &str,
    ) -> ParsedStatement {
        let lines: Vec<(usize, &str)> = content_lines(content).collect();
        let head: Vec<&str> = lines.iter().take(2).map(|(_, text)| *text).collect();

        let Some(detected) = detect_layout(&head) else {
            debug!("statement has no content lines");
            return ParsedStatement::default();
        };

        debug!(
            delimiter = ?detected.delimiter,
            has_header = detected.has_header,
            columns = ?detected.columns,
            "detected statement layout"
        );

        let layout = RowLayout {
            delimiter: detected.delimiter.as_char(),
            columns: detected.columns,
            dates: DateStrategy::Detect,
            debit_marker: None,
            credit_marker: None,
        };
        let rows = lines.into_iter().skip(usize::from(detected.has_header));
        self.parse_rows(rows, &layout, bank_account_id, tenant_id)
    }

    fn parse_rows<'c>(
        &self,
        rows: impl Iterator<Item = (usize, &'c str)>,
        layout: &RowLayout<'_>,
        bank_account_id: &str,
        tenant_id: &str,
    ) -> ParsedStatement {
        let scope = Scope {
            bank_account_id,
            tenant_id,
            fallback_date: self.fallback_date(),
        };
        let mut parsed = ParsedStatement::default();

        for (line, text) in rows {
            match read_row(text, layout, &scope) {
                Ok(row) => {
                    if row.date_fell_back {
                        warn!(
                            line,
                            fallback = %scope.fallback_date,
                            "unreadable date in statement row, using fallback date"
                        );
                        parsed.date_fallbacks.push(line);
                    }
                    parsed.movements.push(row.movement);
                }
                Err(reason) => {
                    warn!(line, %reason, "skipping statement row");
                    parsed.skipped.push(SkippedRow {
                        line,
                        content: text.to_string(),
                        reason,
                    });
                }
            }
        }

        debug!(
            parsed = parsed.movements.len(),
            skipped = parsed.skipped.len(),
            date_fallbacks = parsed.date_fallbacks.len(),
            "statement parsed"
        );
        parsed
    }
}

fn read_row(text: &str, layout: &RowLayout<'_>, scope: &Scope<'_>) -> Result<ParsedRow, RowError> {
    let fields = split_line(text, layout.delimiter);

    let date_raw = required(&fields, &layout.columns, ColumnRole::Date)?;
    let amount_raw = required(&fields, &layout.columns, ColumnRole::Amount)?;
    let type_raw = optional(&fields, layout.columns.movement_type);

    let amount = parse_amount(amount_raw)?;
    let movement_type = infer_movement_type(
        &amount,
        type_raw,
        layout.debit_marker,
        layout.credit_marker,
    );

    let (date, date_fell_back) = match layout.dates.parse(date_raw) {
        Some(date) => (date, false),
        None => (scope.fallback_date, true),
    };

    Ok(ParsedRow {
        movement: NormalizedBankMovement {
            date,
            description: optional(&fields, layout.columns.description).to_string(),
            reference: optional(&fields, layout.columns.reference).to_string(),
            amount: amount.magnitude,
            movement_type,
            bank_account_id: scope.bank_account_id.to_string(),
            tenant_id: scope.tenant_id.to_string(),
        },
        date_fell_back,
    })
}

fn required<'f>(
    fields: &'f [String],
    columns: &ColumnLayout,
    role: ColumnRole,
) -> Result<&'f str, RowError> {
    let index = columns.get(role).ok_or(RowError::UndetectedColumn(role))?;
    fields
        .get(index)
        .map(String::as_str)
        .ok_or(RowError::MissingColumn { role, index })
}

fn optional(fields: &[String], index: Option<usize>) -> &str {
    index
        .and_then(|index| fields.get(index))
        .map(String::as_str)
        .unwrap_or("")
}
