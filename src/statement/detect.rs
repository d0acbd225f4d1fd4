//! Best-effort layout detection for statements without a mapping configuration
//!
//! Column roles are assigned by two fixed, ordered rule lists: [`HEADER_RULES`]
//! match header names, then [`SAMPLE_RULES`] fill whatever is still missing
//! by looking at the first data row. A role claims at most one column and a
//! column serves at most one role.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::amount::{clean_amount, is_direction_literal};
use super::mapping::Delimiter;
use super::tokenizer::split_line;

static DATE_LIKE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2}[/.-]\d{1,2}[/.-]\d{2,4}|\d{4}[/.-]\d{1,2}[/.-]\d{1,2})$")
        .expect("valid date-like regex")
});

static NUMERIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?\d+[,.]?\d*$").expect("valid numeric regex"));

/// Words whose presence anywhere in the first line marks it as a header
pub const HEADER_KEYWORDS: [&str; 11] = [
    "fecha",
    "descripcion",
    "description",
    "monto",
    "importe",
    "referencia",
    "tipo",
    "date",
    "amount",
    "reference",
    "type",
];

/// Meaning of a statement column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnRole {
    Date,
    Description,
    Reference,
    Amount,
    Type,
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnRole::Date => "date",
            ColumnRole::Description => "description",
            ColumnRole::Reference => "reference",
            ColumnRole::Amount => "amount",
            ColumnRole::Type => "type",
        };
        f.write_str(name)
    }
}

/// Header rule: a column whose lowercased name contains any keyword gets the role
pub struct HeaderRule {
    pub role: ColumnRole,
    pub keywords: &'static [&'static str],
}

/// Header rules in evaluation order
pub const HEADER_RULES: [HeaderRule; 5] = [
    HeaderRule {
        role: ColumnRole::Date,
        keywords: &["fecha", "date"],
    },
    HeaderRule {
        role: ColumnRole::Description,
        keywords: &["descrip", "concept", "detalle"],
    },
    HeaderRule {
        role: ColumnRole::Reference,
        keywords: &["ref", "document", "num"],
    },
    HeaderRule {
        role: ColumnRole::Amount,
        keywords: &["monto", "importe", "amount", "valor", "value"],
    },
    HeaderRule {
        role: ColumnRole::Type,
        keywords: &["tipo", "type", "deb", "cred", "sign"],
    },
];

/// Sample rule: the first unclaimed column whose first-row value satisfies the predicate
pub struct SampleRule {
    pub role: ColumnRole,
    pub predicate: fn(&str) -> bool,
}

/// Sample rules in evaluation order
pub const SAMPLE_RULES: [SampleRule; 5] = [
    SampleRule {
        role: ColumnRole::Date,
        predicate: is_date_like,
    },
    SampleRule {
        role: ColumnRole::Amount,
        predicate: is_numeric_like,
    },
    SampleRule {
        role: ColumnRole::Type,
        predicate: is_direction_literal,
    },
    SampleRule {
        role: ColumnRole::Description,
        predicate: any_value,
    },
    SampleRule {
        role: ColumnRole::Reference,
        predicate: any_value,
    },
];

/// Token looks like `d/m/y` or `y/m/d` with `/`, `-` or `.` separators
pub fn is_date_like(token: &str) -> bool {
    DATE_LIKE_RE.is_match(token.trim())
}

/// Token is a number once everything but digits, separators and signs is stripped
pub fn is_numeric_like(token: &str) -> bool {
    NUMERIC_RE.is_match(&clean_amount(token))
}

fn any_value(_token: &str) -> bool {
    true
}

/// Column index per role; `None` when the role was not found
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLayout {
    pub date: Option<usize>,
    pub description: Option<usize>,
    pub reference: Option<usize>,
    pub amount: Option<usize>,
    pub movement_type: Option<usize>,
}

impl ColumnLayout {
    pub fn get(&self, role: ColumnRole) -> Option<usize> {
        match role {
            ColumnRole::Date => self.date,
            ColumnRole::Description => self.description,
            ColumnRole::Reference => self.reference,
            ColumnRole::Amount => self.amount,
            ColumnRole::Type => self.movement_type,
        }
    }

    fn set(&mut self, role: ColumnRole, column: usize) {
        let slot = match role {
            ColumnRole::Date => &mut self.date,
            ColumnRole::Description => &mut self.description,
            ColumnRole::Reference => &mut self.reference,
            ColumnRole::Amount => &mut self.amount,
            ColumnRole::Type => &mut self.movement_type,
        };
        *slot = Some(column);
    }

    fn is_claimed(&self, column: usize) -> bool {
        [
            self.date,
            self.description,
            self.reference,
            self.amount,
            self.movement_type,
        ]
        .contains(&Some(column))
    }
}

/// Everything auto-detection decided about a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectedLayout {
    pub delimiter: Delimiter,
    pub has_header: bool,
    pub columns: ColumnLayout,
}

/// Pick the candidate delimiter that splits the line into the most fields
///
/// Ties keep the earlier candidate of [`Delimiter::CANDIDATES`].
pub fn detect_delimiter(first_line: &str) -> Delimiter {
    let mut best = Delimiter::CANDIDATES[0];
    let mut best_count = 0;

    for candidate in Delimiter::CANDIDATES {
        let count = split_line(first_line, candidate.as_char()).len();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }

    best
}

/// Whether the first line of a statement is a header row
pub fn is_header(fields: &[String]) -> bool {
    let has_keyword = fields.iter().any(|field| {
        let field = field.to_lowercase();
        HEADER_KEYWORDS.iter().any(|keyword| field.contains(keyword))
    });
    if has_keyword {
        return true;
    }

    fields.first().is_none_or(|first| !is_date_like(first))
}

/// Assign column roles from an optional header row and an optional first data row
pub fn detect_columns(header: Option<&[String]>, sample: Option<&[String]>) -> ColumnLayout {
    let mut layout = ColumnLayout::default();

    if let Some(header) = header {
        for rule in &HEADER_RULES {
            let found = header.iter().enumerate().find(|(idx, name)| {
                let name = name.to_lowercase();
                !layout.is_claimed(*idx) && rule.keywords.iter().any(|kw| name.contains(kw))
            });
            if let Some((idx, _)) = found {
                layout.set(rule.role, idx);
            }
        }
    }

    if let Some(sample) = sample {
        for rule in &SAMPLE_RULES {
            if layout.get(rule.role).is_some() {
                continue;
            }
            let found = sample
                .iter()
                .enumerate()
                .find(|(idx, value)| !layout.is_claimed(*idx) && (rule.predicate)(value));
            if let Some((idx, _)) = found {
                layout.set(rule.role, idx);
            }
        }
    }

    layout
}

/// Detect delimiter, header and column roles from the non-blank lines of a statement
pub fn detect_layout(lines: &[&str]) -> Option<DetectedLayout> {
    let first = lines.first()?;
    let delimiter = detect_delimiter(first);
    let first_fields = split_line(first, delimiter.as_char());
    let has_header = is_header(&first_fields);

    let sample_line = if has_header { lines.get(1) } else { Some(first) };
    let sample_fields = sample_line.map(|line| split_line(line, delimiter.as_char()));

    let header = has_header.then_some(first_fields.as_slice());
    let columns = detect_columns(header, sample_fields.as_deref());

    Some(DetectedLayout {
        delimiter,
        has_header,
        columns,
    })
}
