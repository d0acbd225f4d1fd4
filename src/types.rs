//! Core types and data structures for statement ingestion and reconciliation

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Direction of a bank movement as reported by the bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BankMovementType {
    /// Money leaving the account ("CARGO")
    #[serde(rename = "CARGO")]
    Debit,
    /// Money entering the account ("ABONO")
    #[serde(rename = "ABONO")]
    Credit,
}

impl BankMovementType {
    /// Apply the direction to a non-negative magnitude: credits add, debits subtract
    pub fn signed(&self, amount: &BigDecimal) -> BigDecimal {
        match self {
            BankMovementType::Credit => amount.clone(),
            BankMovementType::Debit => -amount.clone(),
        }
    }

    /// Whether a ledger movement of the given type can be the counterpart of this one
    pub fn is_compatible_with(&self, ledger_type: LedgerMovementType) -> bool {
        matches!(
            (self, ledger_type),
            (BankMovementType::Credit, LedgerMovementType::Income)
                | (BankMovementType::Debit, LedgerMovementType::Expense)
                | (BankMovementType::Debit, LedgerMovementType::Transfer)
        )
    }
}

/// Nature of a ledger-side (treasury) movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedgerMovementType {
    /// Income ("INGRESO")
    #[serde(rename = "INGRESO")]
    Income,
    /// Expense ("EGRESO")
    #[serde(rename = "EGRESO")]
    Expense,
    /// Transfer between accounts ("TRANSFERENCIA"), counted as an outflow
    #[serde(rename = "TRANSFERENCIA")]
    Transfer,
}

impl LedgerMovementType {
    /// Apply the direction to a non-negative magnitude: income adds, everything else subtracts
    pub fn signed(&self, amount: &BigDecimal) -> BigDecimal {
        match self {
            LedgerMovementType::Income => amount.clone(),
            LedgerMovementType::Expense | LedgerMovementType::Transfer => -amount.clone(),
        }
    }
}

/// One parsed statement row, before it is persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBankMovement {
    /// Booking date, serialized as `YYYY-MM-DD`
    #[serde(rename = "fecha")]
    pub date: NaiveDate,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "referencia")]
    pub reference: String,
    /// Always a non-negative magnitude; the sign lives in `movement_type`
    #[serde(rename = "monto")]
    pub amount: BigDecimal,
    #[serde(rename = "tipo")]
    pub movement_type: BankMovementType,
    #[serde(rename = "cuentaBancariaId")]
    pub bank_account_id: String,
    #[serde(rename = "empresaId")]
    pub tenant_id: String,
}

impl NormalizedBankMovement {
    /// Amount with the direction applied
    pub fn signed_amount(&self) -> BigDecimal {
        self.movement_type.signed(&self.amount)
    }
}

/// Persisted bank movement (`MovimientoBancario`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankMovement {
    pub id: String,
    #[serde(rename = "fecha")]
    pub date: NaiveDate,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "referencia")]
    pub reference: String,
    #[serde(rename = "monto")]
    pub amount: BigDecimal,
    #[serde(rename = "tipo")]
    pub movement_type: BankMovementType,
    #[serde(rename = "cuentaBancariaId")]
    pub bank_account_id: String,
    #[serde(rename = "empresaId")]
    pub tenant_id: String,
    /// Set only together with `ledger_movement_id`
    #[serde(rename = "conciliado", default)]
    pub reconciled: bool,
    #[serde(
        rename = "movimientoContableId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ledger_movement_id: Option<String>,
    #[serde(
        rename = "fechaConciliacion",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub reconciled_at: Option<NaiveDateTime>,
    #[serde(
        rename = "usuarioConciliacion",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub reconciled_by: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: NaiveDateTime,
}

impl BankMovement {
    /// Create an unreconciled bank movement from a parsed row
    pub fn from_normalized(
        id: String,
        movement: NormalizedBankMovement,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            id,
            date: movement.date,
            description: movement.description,
            reference: movement.reference,
            amount: movement.amount,
            movement_type: movement.movement_type,
            bank_account_id: movement.bank_account_id,
            tenant_id: movement.tenant_id,
            reconciled: false,
            ledger_movement_id: None,
            reconciled_at: None,
            reconciled_by: None,
            created_at,
        }
    }

    /// Amount with the direction applied
    pub fn signed_amount(&self) -> BigDecimal {
        self.movement_type.signed(&self.amount)
    }

    /// Whether this movement is reconciled against the given ledger movement
    pub fn is_linked_to(&self, ledger_movement_id: &str) -> bool {
        self.reconciled && self.ledger_movement_id.as_deref() == Some(ledger_movement_id)
    }

    pub(crate) fn mark_reconciled(
        &mut self,
        ledger_movement_id: &str,
        at: NaiveDateTime,
        by: &str,
    ) {
        self.reconciled = true;
        self.ledger_movement_id = Some(ledger_movement_id.to_string());
        self.reconciled_at = Some(at);
        self.reconciled_by = Some(by.to_string());
    }

    pub(crate) fn clear_reconciliation(&mut self) {
        self.reconciled = false;
        self.ledger_movement_id = None;
        self.reconciled_at = None;
        self.reconciled_by = None;
    }
}

/// Persisted ledger-side movement (`MovimientoContable`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerMovement {
    pub id: String,
    #[serde(rename = "fecha")]
    pub date: NaiveDate,
    /// Number of the journal entry that produced this movement
    #[serde(rename = "numeroAsiento", default)]
    pub entry_number: String,
    #[serde(rename = "descripcion", default)]
    pub description: String,
    #[serde(rename = "referencia", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "monto")]
    pub amount: BigDecimal,
    #[serde(rename = "tipo")]
    pub movement_type: LedgerMovementType,
    /// Bank account the treasury movement was booked against, when known
    #[serde(
        rename = "cuentaBancariaId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub bank_account_id: Option<String>,
    #[serde(rename = "empresaId")]
    pub tenant_id: String,
    #[serde(rename = "conciliado", default)]
    pub reconciled: bool,
    #[serde(
        rename = "movimientoBancarioId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub bank_movement_id: Option<String>,
    #[serde(
        rename = "fechaConciliacion",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub reconciled_at: Option<NaiveDateTime>,
    #[serde(
        rename = "usuarioConciliacion",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub reconciled_by: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: NaiveDateTime,
    #[serde(rename = "updatedAt")]
    pub updated_at: NaiveDateTime,
}

impl LedgerMovement {
    /// Create a new unreconciled ledger movement
    pub fn new(
        id: String,
        tenant_id: String,
        date: NaiveDate,
        movement_type: LedgerMovementType,
        amount: BigDecimal,
    ) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id,
            date,
            entry_number: String::new(),
            description: String::new(),
            reference: None,
            amount,
            movement_type,
            bank_account_id: None,
            tenant_id,
            reconciled: false,
            bank_movement_id: None,
            reconciled_at: None,
            reconciled_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_entry_number(mut self, entry_number: impl Into<String>) -> Self {
        self.entry_number = entry_number.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_bank_account(mut self, bank_account_id: impl Into<String>) -> Self {
        self.bank_account_id = Some(bank_account_id.into());
        self
    }

    /// Amount with the direction applied
    pub fn signed_amount(&self) -> BigDecimal {
        self.movement_type.signed(&self.amount)
    }

    /// Whether this movement is reconciled against the given bank movement
    pub fn is_linked_to(&self, bank_movement_id: &str) -> bool {
        self.reconciled && self.bank_movement_id.as_deref() == Some(bank_movement_id)
    }

    pub(crate) fn mark_reconciled(&mut self, bank_movement_id: &str, at: NaiveDateTime, by: &str) {
        self.reconciled = true;
        self.bank_movement_id = Some(bank_movement_id.to_string());
        self.reconciled_at = Some(at);
        self.reconciled_by = Some(by.to_string());
    }

    pub(crate) fn clear_reconciliation(&mut self) {
        self.reconciled = false;
        self.bank_movement_id = None;
        self.reconciled_at = None;
        self.reconciled_by = None;
    }
}

/// A stored record together with the version the store assigned to it
///
/// Versions back the optimistic concurrency of [`crate::MovementStorage::commit_pair`]:
/// a write only succeeds if the record still carries the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub record: T,
    pub version: u64,
}

/// Both halves of a reconciliation written in one atomic step
#[derive(Debug, Clone, PartialEq)]
pub struct PairWrite {
    pub bank: BankMovement,
    pub expected_bank_version: u64,
    pub ledger: LedgerMovement,
    pub expected_ledger_version: u64,
}

/// The two records of a pair after a successful reconcile or revert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedPair {
    pub bank: BankMovement,
    pub ledger: LedgerMovement,
}

/// Derived view over a set of bank and ledger movements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub total_bank: usize,
    pub total_ledger: usize,
    pub reconciled_bank: usize,
    pub reconciled_ledger: usize,
    /// Unreconciled movements on both sides
    pub pending: usize,
    /// Signed bank total minus signed ledger total
    pub difference: BigDecimal,
}

/// Errors that can occur while importing statements or reconciling movements
#[derive(Debug, thiserror::Error)]
pub enum ReconciliationError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Authentication error: {0}")]
    Authentication(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Invalid mapping configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Mapping configuration not found: {0}")]
    ConfigurationNotFound(String),
    #[error("Bank movement not found: {0}")]
    BankMovementNotFound(String),
    #[error("Ledger movement not found: {0}")]
    LedgerMovementNotFound(String),
    #[error("Bank movement already reconciled: {0}")]
    BankMovementAlreadyReconciled(String),
    #[error("Ledger movement already reconciled: {0}")]
    LedgerMovementAlreadyReconciled(String),
    #[error("Bank movement is not reconciled: {0}")]
    BankMovementNotReconciled(String),
    #[error("Ledger movement is not reconciled: {0}")]
    LedgerMovementNotReconciled(String),
    #[error("Bank movement {bank_movement_id} is linked to {linked:?}, not to {requested}")]
    BankLinkMismatch {
        bank_movement_id: String,
        linked: Option<String>,
        requested: String,
    },
    #[error("Ledger movement {ledger_movement_id} is linked to {linked:?}, not to {requested}")]
    LedgerLinkMismatch {
        ledger_movement_id: String,
        linked: Option<String>,
        requested: String,
    },
    #[error("Concurrent modification: {0}")]
    Conflict(String),
}

/// Result type for reconciliation operations
pub type ReconciliationResult<T> = Result<T, ReconciliationError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn bank_movement(movement_type: BankMovementType, amount: i64) -> BankMovement {
        BankMovement::from_normalized(
            "b1".to_string(),
            NormalizedBankMovement {
                date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                description: "Transfer".to_string(),
                reference: "REF-1".to_string(),
                amount: BigDecimal::from(amount),
                movement_type,
                bank_account_id: "acc-1".to_string(),
                tenant_id: "tenant-1".to_string(),
            },
            chrono::Utc::now().naive_utc(),
        )
    }

    #[test]
    fn test_signed_amounts() {
        assert_eq!(
            bank_movement(BankMovementType::Debit, 40).signed_amount(),
            BigDecimal::from(-40)
        );
        assert_eq!(
            bank_movement(BankMovementType::Credit, 40).signed_amount(),
            BigDecimal::from(40)
        );
        assert_eq!(
            LedgerMovementType::Transfer.signed(&BigDecimal::from(5)),
            BigDecimal::from(-5)
        );
    }

    #[test]
    fn test_direction_compatibility() {
        assert!(BankMovementType::Credit.is_compatible_with(LedgerMovementType::Income));
        assert!(BankMovementType::Debit.is_compatible_with(LedgerMovementType::Transfer));
        assert!(!BankMovementType::Credit.is_compatible_with(LedgerMovementType::Expense));
    }

    #[test]
    fn test_bank_movement_serializes_with_document_field_names() {
        let movement = bank_movement(BankMovementType::Debit, 12);
        let json = serde_json::to_value(&movement).unwrap();

        assert_eq!(json["tipo"], "CARGO");
        assert_eq!(json["fecha"], "2024-03-01");
        assert_eq!(json["conciliado"], false);
        assert_eq!(json["cuentaBancariaId"], "acc-1");
        assert!(json.get("movimientoContableId").is_none());
    }

    #[test]
    fn test_link_helpers() {
        let mut movement = bank_movement(BankMovementType::Credit, 10);
        let now = chrono::Utc::now().naive_utc();

        movement.mark_reconciled("l1", now, "user-1");
        assert!(movement.is_linked_to("l1"));
        assert!(!movement.is_linked_to("l2"));

        movement.clear_reconciliation();
        assert!(!movement.reconciled);
        assert_eq!(movement.ledger_movement_id, None);
        assert_eq!(movement.reconciled_at, None);
        assert_eq!(movement.reconciled_by, None);
    }
}
