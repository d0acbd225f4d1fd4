//! Candidate pairs for manual reconciliation

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::types::*;

/// A bank movement and a ledger movement that look like the same operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSuggestion {
    pub bank_movement_id: String,
    pub ledger_movement_id: String,
    pub amount: BigDecimal,
    /// Absolute number of days between the two booking dates
    pub date_distance_days: i64,
}

/// Pair unreconciled movements with equal amount, compatible direction and
/// close dates
///
/// Every movement appears in at most one suggestion. Closer dates win, ties
/// go to the lower entry number.
pub fn suggest(
    bank_movements: &[BankMovement],
    ledger_movements: &[LedgerMovement],
    date_tolerance_days: i64,
) -> Vec<MatchSuggestion> {
    let mut candidates: Vec<(&BankMovement, &LedgerMovement, i64)> = Vec::new();
    for bank in bank_movements.iter().filter(|m| !m.reconciled) {
        for ledger in ledger_movements.iter().filter(|m| !m.reconciled) {
            if bank.amount != ledger.amount
                || !bank.movement_type.is_compatible_with(ledger.movement_type)
            {
                continue;
            }
            let distance = (bank.date - ledger.date).num_days().abs();
            if distance <= date_tolerance_days {
                candidates.push((bank, ledger, distance));
            }
        }
    }

    candidates.sort_by(|(b1, l1, d1), (b2, l2, d2)| {
        (d1, &l1.entry_number, b1.date, &b1.id, &l1.id)
            .cmp(&(d2, &l2.entry_number, b2.date, &b2.id, &l2.id))
    });

    let mut used_bank = HashSet::new();
    let mut used_ledger = HashSet::new();
    candidates
        .into_iter()
        .filter(|(bank, ledger, _)| {
            if used_bank.contains(bank.id.as_str()) || used_ledger.contains(ledger.id.as_str()) {
                return false;
            }
            used_bank.insert(bank.id.as_str());
            used_ledger.insert(ledger.id.as_str());
            true
        })
        .map(|(bank, ledger, distance)| MatchSuggestion {
            bank_movement_id: bank.id.clone(),
            ledger_movement_id: ledger.id.clone(),
            amount: bank.amount.clone(),
            date_distance_days: distance,
        })
        .collect()
}
