//! # Bank Reconciliation Core
//!
//! Bank statement ingestion and bank-to-ledger reconciliation for a
//! multi-tenant accounting backend.
//!
//! ## Features
//!
//! - **Statement parsing**: configured or auto-detected CSV-like layouts, locale-aware amounts
//! - **Import**: parsed rows persisted as unreconciled bank movements
//! - **Reconciliation**: atomic reconcile and revert of bank/ledger pairs with optimistic retries
//! - **Summaries and suggestions**: pending counts, signed difference and candidate pairs
//! - **Sessions**: explicit authenticated session, refreshed on expiry
//! - **Storage abstraction**: database-agnostic design with trait-based storage
//!
//! ## Quick Start
//!
//! ```rust
//! use bank_reconciliation_core::{StatementParser, BankMovementType};
//!
//! let content = "Fecha;Concepto;Importe\n05/03/2024;Comision;-12,50\n";
//! let parsed = StatementParser::new().parse_automatic(content, "acc-1", "tenant-1");
//!
//! assert_eq!(parsed.movements.len(), 1);
//! assert_eq!(parsed.movements[0].movement_type, BankMovementType::Debit);
//! ```

pub mod nomenclature;
pub mod reconciliation;
pub mod session;
pub mod statement;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use nomenclature::{NomenclatureKind, NomenclaturePayload};
pub use reconciliation::*;
pub use session::*;
pub use statement::*;
pub use traits::*;
pub use types::*;
pub use utils::MemoryStorage;
