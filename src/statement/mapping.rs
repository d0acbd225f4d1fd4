//! Per-bank mapping configuration for statement exports

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::*;
use crate::utils::validation::validate_mapping_configuration;

/// Field delimiter of a statement export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Delimiter {
    #[serde(rename = ",")]
    Comma,
    #[serde(rename = ";")]
    Semicolon,
    #[serde(rename = "\t")]
    Tab,
    #[serde(rename = "|")]
    Pipe,
}

impl Delimiter {
    /// Candidates tried by auto-detection, in tie-breaking order
    pub const CANDIDATES: [Delimiter; 4] = [
        Delimiter::Comma,
        Delimiter::Semicolon,
        Delimiter::Tab,
        Delimiter::Pipe,
    ];

    pub fn as_char(&self) -> char {
        match self {
            Delimiter::Comma => ',',
            Delimiter::Semicolon => ';',
            Delimiter::Tab => '\t',
            Delimiter::Pipe => '|',
        }
    }
}

/// Supported date patterns of statement exports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DateFormat {
    /// `dd/MM/yyyy`
    DayMonthYearSlash,
    /// `MM/dd/yyyy`
    MonthDayYearSlash,
    /// `yyyy-MM-dd`
    Iso,
    /// `dd-MM-yyyy`
    DayMonthYearDash,
    /// `MM-dd-yyyy`
    MonthDayYearDash,
    /// `dd.MM.yyyy`
    DayMonthYearDot,
    /// `yyyy/MM/dd`
    YearMonthDaySlash,
}

#[derive(Clone, Copy)]
enum FieldOrder {
    DayMonthYear,
    MonthDayYear,
    YearMonthDay,
}

impl DateFormat {
    pub const ALL: [DateFormat; 7] = [
        DateFormat::DayMonthYearSlash,
        DateFormat::MonthDayYearSlash,
        DateFormat::Iso,
        DateFormat::DayMonthYearDash,
        DateFormat::MonthDayYearDash,
        DateFormat::DayMonthYearDot,
        DateFormat::YearMonthDaySlash,
    ];

    /// Formats tried, in order, when the statement layout is auto-detected
    pub const AUTO_DETECTION_ORDER: [DateFormat; 5] = [
        DateFormat::DayMonthYearSlash,
        DateFormat::MonthDayYearSlash,
        DateFormat::Iso,
        DateFormat::DayMonthYearDash,
        DateFormat::MonthDayYearDash,
    ];

    /// The pattern string stored in mapping configurations
    pub fn pattern(&self) -> &'static str {
        match self {
            DateFormat::DayMonthYearSlash => "dd/MM/yyyy",
            DateFormat::MonthDayYearSlash => "MM/dd/yyyy",
            DateFormat::Iso => "yyyy-MM-dd",
            DateFormat::DayMonthYearDash => "dd-MM-yyyy",
            DateFormat::MonthDayYearDash => "MM-dd-yyyy",
            DateFormat::DayMonthYearDot => "dd.MM.yyyy",
            DateFormat::YearMonthDaySlash => "yyyy/MM/dd",
        }
    }

    fn separator(&self) -> char {
        match self {
            DateFormat::DayMonthYearSlash
            | DateFormat::MonthDayYearSlash
            | DateFormat::YearMonthDaySlash => '/',
            DateFormat::Iso | DateFormat::DayMonthYearDash | DateFormat::MonthDayYearDash => '-',
            DateFormat::DayMonthYearDot => '.',
        }
    }

    fn order(&self) -> FieldOrder {
        match self {
            DateFormat::DayMonthYearSlash
            | DateFormat::DayMonthYearDash
            | DateFormat::DayMonthYearDot => FieldOrder::DayMonthYear,
            DateFormat::MonthDayYearSlash | DateFormat::MonthDayYearDash => {
                FieldOrder::MonthDayYear
            }
            DateFormat::Iso | DateFormat::YearMonthDaySlash => FieldOrder::YearMonthDay,
        }
    }

    /// Parse a date token, ignoring any time part after the first whitespace
    ///
    /// Two-digit years are read as 20yy unless the year comes first.
    /// Returns `None` for anything that is not a real calendar date in this format.
    pub fn parse(&self, raw: &str) -> Option<NaiveDate> {
        let token = raw.split_whitespace().next()?;
        let parts: Vec<&str> = token.split(self.separator()).collect();
        let numeric = |part: &&str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if parts.len() != 3 || !parts.iter().all(numeric) {
            return None;
        }

        let (year, month, day) = match self.order() {
            FieldOrder::DayMonthYear => (parts[2], parts[1], parts[0]),
            FieldOrder::MonthDayYear => (parts[2], parts[0], parts[1]),
            FieldOrder::YearMonthDay => (parts[0], parts[1], parts[2]),
        };

        if month.len() > 2 || day.len() > 2 {
            return None;
        }
        let year: i32 = match (year.len(), self.order()) {
            (2, FieldOrder::DayMonthYear | FieldOrder::MonthDayYear) => {
                2000 + year.parse::<i32>().ok()?
            }
            (4, _) => year.parse().ok()?,
            _ => return None,
        };

        NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.pattern())
    }
}

impl FromStr for DateFormat {
    type Err = ReconciliationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        DateFormat::ALL
            .into_iter()
            .find(|format| format.pattern().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                ReconciliationError::InvalidConfiguration(format!(
                    "unsupported date format '{wanted}'"
                ))
            })
    }
}

impl TryFrom<String> for DateFormat {
    type Error = ReconciliationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DateFormat> for String {
    fn from(format: DateFormat) -> Self {
        format.pattern().to_string()
    }
}

/// How to read one bank's statement export
///
/// Created and edited by an administrator of the tenant that owns it;
/// the parser only ever reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingConfiguration {
    pub id: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "bancoId", default)]
    pub bank_id: String,
    #[serde(rename = "bancoNombre", default)]
    pub bank_name: String,
    #[serde(rename = "delimitador")]
    pub delimiter: Delimiter,
    #[serde(rename = "tieneEncabezado")]
    pub has_header: bool,
    #[serde(rename = "formatoFecha")]
    pub date_format: DateFormat,
    #[serde(rename = "columnaFecha")]
    pub date_column: usize,
    #[serde(rename = "columnaDescripcion")]
    pub description_column: usize,
    #[serde(rename = "columnaReferencia")]
    pub reference_column: usize,
    #[serde(rename = "columnaMonto")]
    pub amount_column: usize,
    #[serde(rename = "columnaTipo")]
    pub type_column: usize,
    /// Literal marking a credit row (abono)
    #[serde(rename = "valorTipoAbono")]
    pub credit_marker: String,
    /// Literal marking a debit row (cargo)
    #[serde(rename = "valorTipoCargo")]
    pub debit_marker: String,
    #[serde(rename = "activo", default = "default_active")]
    pub active: bool,
    #[serde(rename = "empresaId")]
    pub tenant_id: String,
}

fn default_active() -> bool {
    true
}

impl MappingConfiguration {
    /// Create an active configuration with a header row, columns
    /// date/description/reference/amount/type at 0..=4 and ABONO/CARGO markers
    pub fn new(
        id: String,
        tenant_id: String,
        name: String,
        delimiter: Delimiter,
        date_format: DateFormat,
    ) -> Self {
        Self {
            id,
            name,
            bank_id: String::new(),
            bank_name: String::new(),
            delimiter,
            has_header: true,
            date_format,
            date_column: 0,
            description_column: 1,
            reference_column: 2,
            amount_column: 3,
            type_column: 4,
            credit_marker: "ABONO".to_string(),
            debit_marker: "CARGO".to_string(),
            active: true,
            tenant_id,
        }
    }

    /// Set the column indices, in date/description/reference/amount/type order
    pub fn with_columns(
        mut self,
        date: usize,
        description: usize,
        reference: usize,
        amount: usize,
        movement_type: usize,
    ) -> Self {
        self.date_column = date;
        self.description_column = description;
        self.reference_column = reference;
        self.amount_column = amount;
        self.type_column = movement_type;
        self
    }

    pub fn with_markers(mut self, credit: impl Into<String>, debit: impl Into<String>) -> Self {
        self.credit_marker = credit.into();
        self.debit_marker = debit.into();
        self
    }

    pub fn with_bank(mut self, bank_id: impl Into<String>, bank_name: impl Into<String>) -> Self {
        self.bank_id = bank_id.into();
        self.bank_name = bank_name.into();
        self
    }

    /// Check the structural invariants of the configuration
    pub fn validate(&self) -> ReconciliationResult<()> {
        validate_mapping_configuration(self)
    }
}
