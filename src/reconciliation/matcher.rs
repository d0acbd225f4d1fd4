//! Linking and unlinking bank movements with ledger movements

use tracing::{info, instrument, warn};

use super::suggest::{suggest, MatchSuggestion};
use super::summary::summarize;
use super::MatcherConfig;
use crate::session::Session;
use crate::traits::*;
use crate::types::*;

/// Reconciles bank movements against ledger movements of one store
///
/// Both sides of a pair are always written together through
/// [`MovementStorage::commit_pair`]. When another writer changed either
/// record between the read and the write, the whole operation is re-read
/// and re-checked, so a losing writer sees the winner's result.
pub struct ReconciliationMatcher<S: MovementStorage> {
    storage: S,
    config: MatcherConfig,
}

impl<S: MovementStorage> ReconciliationMatcher<S> {
    /// Create a new matcher with the default configuration
    pub fn new(storage: S) -> Self {
        Self::with_config(storage, MatcherConfig::default())
    }

    /// Create a new matcher with a custom configuration
    pub fn with_config(storage: S, config: MatcherConfig) -> Self {
        Self { storage, config }
    }

    /// Link an unreconciled bank movement with an unreconciled ledger movement
    #[instrument(skip(self, session), fields(tenant_id = %session.tenant_id, user_id = %session.user_id))]
    pub async fn reconcile(
        &mut self,
        session: &Session,
        bank_movement_id: &str,
        ledger_movement_id: &str,
    ) -> ReconciliationResult<MatchedPair> {
        let pair = self
            .commit_with_retry(session, bank_movement_id, ledger_movement_id, |bank, ledger| {
                if bank.record.reconciled {
                    return Err(ReconciliationError::BankMovementAlreadyReconciled(
                        bank.record.id,
                    ));
                }
                if ledger.record.reconciled {
                    return Err(ReconciliationError::LedgerMovementAlreadyReconciled(
                        ledger.record.id,
                    ));
                }

                let now = chrono::Utc::now().naive_utc();
                let mut bank_update = bank.record;
                let mut ledger_update = ledger.record;
                bank_update.mark_reconciled(&ledger_update.id, now, &session.user_id);
                ledger_update.mark_reconciled(&bank_update.id, now, &session.user_id);

                Ok(PairWrite {
                    bank: bank_update,
                    expected_bank_version: bank.version,
                    ledger: ledger_update,
                    expected_ledger_version: ledger.version,
                })
            })
            .await?;

        info!("movements reconciled");
        Ok(pair)
    }

    /// Unlink a bank movement from the ledger movement it is reconciled with
    #[instrument(skip(self, session), fields(tenant_id = %session.tenant_id, user_id = %session.user_id))]
    pub async fn revert(
        &mut self,
        session: &Session,
        bank_movement_id: &str,
        ledger_movement_id: &str,
    ) -> ReconciliationResult<MatchedPair> {
        let pair = self
            .commit_with_retry(session, bank_movement_id, ledger_movement_id, |bank, ledger| {
                if !bank.record.reconciled {
                    return Err(ReconciliationError::BankMovementNotReconciled(bank.record.id));
                }
                if !ledger.record.reconciled {
                    return Err(ReconciliationError::LedgerMovementNotReconciled(
                        ledger.record.id,
                    ));
                }
                if !bank.record.is_linked_to(&ledger.record.id) {
                    return Err(ReconciliationError::BankLinkMismatch {
                        bank_movement_id: bank.record.id,
                        linked: bank.record.ledger_movement_id,
                        requested: ledger.record.id,
                    });
                }
                if !ledger.record.is_linked_to(&bank.record.id) {
                    return Err(ReconciliationError::LedgerLinkMismatch {
                        ledger_movement_id: ledger.record.id,
                        linked: ledger.record.bank_movement_id,
                        requested: bank.record.id,
                    });
                }

                let mut bank_update = bank.record;
                let mut ledger_update = ledger.record;
                bank_update.clear_reconciliation();
                ledger_update.clear_reconciliation();

                Ok(PairWrite {
                    bank: bank_update,
                    expected_bank_version: bank.version,
                    ledger: ledger_update,
                    expected_ledger_version: ledger.version,
                })
            })
            .await?;

        info!("reconciliation reverted");
        Ok(pair)
    }

    /// Summarize the reconciliation state of one bank account
    #[instrument(skip(self, session), fields(tenant_id = %session.tenant_id))]
    pub async fn summarize_account(
        &self,
        session: &Session,
        bank_account_id: &str,
    ) -> ReconciliationResult<ReconciliationSummary> {
        let bank = self
            .storage
            .list_bank_movements(&session.tenant_id, Some(bank_account_id))
            .await?;
        let ledger = self
            .storage
            .list_ledger_movements(&session.tenant_id, Some(bank_account_id))
            .await?;

        Ok(summarize(&bank, &ledger))
    }

    /// Propose pairs of unreconciled movements of one bank account
    #[instrument(skip(self, session), fields(tenant_id = %session.tenant_id))]
    pub async fn suggest_matches(
        &self,
        session: &Session,
        bank_account_id: &str,
    ) -> ReconciliationResult<Vec<MatchSuggestion>> {
        let bank = self
            .storage
            .list_bank_movements(&session.tenant_id, Some(bank_account_id))
            .await?;
        let ledger = self
            .storage
            .list_ledger_movements(&session.tenant_id, Some(bank_account_id))
            .await?;

        let suggestions = suggest(&bank, &ledger, self.config.date_tolerance_days);
        info!(suggestions = suggestions.len(), "match suggestions computed");
        Ok(suggestions)
    }

    /// Access the underlying storage
    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Read both records, let `prepare` check them and build the write, then
    /// commit it. Version conflicts restart from the read.
    async fn commit_with_retry<F>(
        &mut self,
        session: &Session,
        bank_movement_id: &str,
        ledger_movement_id: &str,
        prepare: F,
    ) -> ReconciliationResult<MatchedPair>
    where
        F: Fn(Versioned<BankMovement>, Versioned<LedgerMovement>) -> ReconciliationResult<PairWrite>
            + Send
            + Sync,
    {
        let tenant_id = session.tenant_id.as_str();
        let attempts = self.config.max_commit_attempts.max(1);
        let mut last_conflict = String::new();

        for attempt in 1..=attempts {
            let bank = self
                .storage
                .get_bank_movement(tenant_id, bank_movement_id)
                .await?
                .ok_or_else(|| {
                    ReconciliationError::BankMovementNotFound(bank_movement_id.to_string())
                })?;
            let ledger = self
                .storage
                .get_ledger_movement(tenant_id, ledger_movement_id)
                .await?
                .ok_or_else(|| {
                    ReconciliationError::LedgerMovementNotFound(ledger_movement_id.to_string())
                })?;

            let write = prepare(bank, ledger)?;
            let pair = MatchedPair {
                bank: write.bank.clone(),
                ledger: write.ledger.clone(),
            };

            match self.storage.commit_pair(tenant_id, write).await {
                Ok(()) => return Ok(pair),
                Err(ReconciliationError::Conflict(reason)) => {
                    warn!(attempt, attempts, %reason, "pair changed concurrently, retrying");
                    last_conflict = reason;
                }
                Err(e) => return Err(e),
            }
        }

        Err(ReconciliationError::Conflict(format!(
            "gave up after {attempts} attempts: {last_conflict}"
        )))
    }
}
