//! Validation utilities

use std::collections::HashMap;

use crate::statement::{ColumnRole, MappingConfiguration};
use crate::types::*;

/// Validate a document identifier (tenant, account, movement or configuration ID)
pub fn validate_identifier(kind: &str, id: &str) -> ReconciliationResult<()> {
    if id.trim().is_empty() {
        return Err(ReconciliationError::Validation(format!(
            "{kind} ID cannot be empty"
        )));
    }

    if id.len() > 128 {
        return Err(ReconciliationError::Validation(format!(
            "{kind} ID cannot exceed 128 characters"
        )));
    }

    // Document paths use '/' as separator
    if id.contains('/') {
        return Err(ReconciliationError::Validation(format!(
            "{kind} ID cannot contain '/'"
        )));
    }

    Ok(())
}

/// Validate the structural invariants of a mapping configuration
pub fn validate_mapping_configuration(config: &MappingConfiguration) -> ReconciliationResult<()> {
    if config.name.trim().is_empty() {
        return Err(ReconciliationError::InvalidConfiguration(
            "configuration name cannot be empty".to_string(),
        ));
    }

    let columns = [
        (ColumnRole::Date, config.date_column),
        (ColumnRole::Description, config.description_column),
        (ColumnRole::Reference, config.reference_column),
        (ColumnRole::Amount, config.amount_column),
        (ColumnRole::Type, config.type_column),
    ];
    let mut seen: HashMap<usize, ColumnRole> = HashMap::new();
    for (role, index) in columns {
        if let Some(other) = seen.insert(index, role) {
            return Err(ReconciliationError::InvalidConfiguration(format!(
                "column {index} is used for both {other} and {role}"
            )));
        }
    }

    let credit = config.credit_marker.trim();
    let debit = config.debit_marker.trim();
    if credit.is_empty() || debit.is_empty() {
        return Err(ReconciliationError::InvalidConfiguration(
            "credit and debit markers cannot be empty".to_string(),
        ));
    }
    if credit.eq_ignore_ascii_case(debit) {
        return Err(ReconciliationError::InvalidConfiguration(format!(
            "credit and debit markers must differ, both are '{credit}'"
        )));
    }

    Ok(())
}
