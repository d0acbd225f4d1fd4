//! Reconciliation summary over a set of movements

use bigdecimal::BigDecimal;

use crate::types::*;

/// Count reconciled and pending movements and compute the signed difference
/// between the bank side and the ledger side
pub fn summarize(
    bank_movements: &[BankMovement],
    ledger_movements: &[LedgerMovement],
) -> ReconciliationSummary {
    let reconciled_bank = bank_movements.iter().filter(|m| m.reconciled).count();
    let reconciled_ledger = ledger_movements.iter().filter(|m| m.reconciled).count();

    let bank_total: BigDecimal = bank_movements.iter().map(BankMovement::signed_amount).sum();
    let ledger_total: BigDecimal = ledger_movements
        .iter()
        .map(LedgerMovement::signed_amount)
        .sum();

    ReconciliationSummary {
        total_bank: bank_movements.len(),
        total_ledger: ledger_movements.len(),
        reconciled_bank,
        reconciled_ledger,
        pending: (bank_movements.len() - reconciled_bank)
            + (ledger_movements.len() - reconciled_ledger),
        difference: bank_total - ledger_total,
    }
}
