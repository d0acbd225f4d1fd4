//! Traits for storage and credential abstraction

use async_trait::async_trait;

use crate::session::Session;
use crate::statement::MappingConfiguration;
use crate::types::*;

/// Storage abstraction for movements and mapping configurations
///
/// Records are addressed as tenant scope, then collection, then record id.
/// Implementations back this with a document store (Firestore, Supabase)
/// or with [`crate::utils::MemoryStorage`] for tests and development.
#[async_trait]
pub trait MovementStorage: Send + Sync {
    /// Insert or replace a bank movement in its tenant scope
    async fn save_bank_movement(&mut self, movement: &BankMovement) -> ReconciliationResult<()>;

    /// Get a bank movement with its current version
    async fn get_bank_movement(
        &self,
        tenant_id: &str,
        movement_id: &str,
    ) -> ReconciliationResult<Option<Versioned<BankMovement>>>;

    /// List bank movements of a tenant, optionally restricted to one bank account
    async fn list_bank_movements(
        &self,
        tenant_id: &str,
        bank_account_id: Option<&str>,
    ) -> ReconciliationResult<Vec<BankMovement>>;

    /// Insert or replace a ledger movement in its tenant scope
    async fn save_ledger_movement(&mut self, movement: &LedgerMovement)
        -> ReconciliationResult<()>;

    /// Get a ledger movement with its current version
    async fn get_ledger_movement(
        &self,
        tenant_id: &str,
        movement_id: &str,
    ) -> ReconciliationResult<Option<Versioned<LedgerMovement>>>;

    /// List ledger movements of a tenant, optionally restricted to one bank account
    async fn list_ledger_movements(
        &self,
        tenant_id: &str,
        bank_account_id: Option<&str>,
    ) -> ReconciliationResult<Vec<LedgerMovement>>;

    /// Atomically write both records of a pair
    ///
    /// Must fail with [`ReconciliationError::Conflict`] without writing anything
    /// if either record no longer carries its expected version.
    async fn commit_pair(&mut self, tenant_id: &str, write: PairWrite) -> ReconciliationResult<()>;

    /// Insert or replace a mapping configuration in its tenant scope
    async fn save_mapping_configuration(
        &mut self,
        configuration: &MappingConfiguration,
    ) -> ReconciliationResult<()>;

    /// Get a mapping configuration by ID
    async fn get_mapping_configuration(
        &self,
        tenant_id: &str,
        configuration_id: &str,
    ) -> ReconciliationResult<Option<MappingConfiguration>>;

    /// List the mapping configurations of a tenant
    async fn list_mapping_configurations(
        &self,
        tenant_id: &str,
    ) -> ReconciliationResult<Vec<MappingConfiguration>>;
}

/// Source of authenticated sessions
///
/// Implemented by the application's authentication client; the crate only
/// caches what it returns (see [`crate::session::SessionManager`]).
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Sign in and return a fresh session
    async fn acquire(&self) -> ReconciliationResult<Session>;

    /// Exchange an expired session for a new one
    async fn refresh(&self, expired: &Session) -> ReconciliationResult<Session>;
}
