//! Persisting parsed statements as bank movements

use tracing::{info, instrument};
use uuid::Uuid;

use super::parser::StatementParser;
use super::{ParsedStatement, SkippedRow};
use crate::session::Session;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_identifier;

/// Result of importing one statement file
#[derive(Debug, Clone, PartialEq)]
pub struct ImportReport {
    /// Bank movements created, in file order
    pub imported: Vec<BankMovement>,
    pub skipped: Vec<SkippedRow>,
    /// Line numbers imported with the fallback date
    pub date_fallbacks: Vec<usize>,
}

/// Parses statements and stores every parsed row as a new bank movement
pub struct StatementImporter<S: MovementStorage> {
    storage: S,
    parser: StatementParser,
}

impl<S: MovementStorage> StatementImporter<S> {
    /// Create a new importer with a default parser
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            parser: StatementParser::new(),
        }
    }

    /// Create a new importer with a custom parser
    pub fn with_parser(storage: S, parser: StatementParser) -> Self {
        Self { storage, parser }
    }

    /// Import a statement using one of the tenant's mapping configurations
    #[instrument(skip(self, session, content), fields(tenant_id = %session.tenant_id))]
    pub async fn import_with_configuration(
        &mut self,
        session: &Session,
        bank_account_id: &str,
        configuration_id: &str,
        content: &str,
    ) -> ReconciliationResult<ImportReport> {
        validate_identifier("Bank account", bank_account_id)?;

        let config = self
            .storage
            .get_mapping_configuration(&session.tenant_id, configuration_id)
            .await?
            .ok_or_else(|| ReconciliationError::ConfigurationNotFound(configuration_id.to_string()))?;

        if !config.active {
            return Err(ReconciliationError::InvalidConfiguration(format!(
                "configuration '{}' is inactive",
                config.id
            )));
        }

        let parsed = self.parser.parse_with_configuration(
            content,
            &config,
            bank_account_id,
            &session.tenant_id,
        )?;
        self.persist(parsed).await
    }

    /// Import a statement whose layout is detected automatically
    #[instrument(skip(self, session, content), fields(tenant_id = %session.tenant_id))]
    pub async fn import_automatic(
        &mut self,
        session: &Session,
        bank_account_id: &str,
        content: &str,
    ) -> ReconciliationResult<ImportReport> {
        validate_identifier("Bank account", bank_account_id)?;

        let parsed = self
            .parser
            .parse_automatic(content, bank_account_id, &session.tenant_id);
        self.persist(parsed).await
    }

    async fn persist(&mut self, parsed: ParsedStatement) -> ReconciliationResult<ImportReport> {
        let ParsedStatement {
            movements,
            skipped,
            date_fallbacks,
        } = parsed;

        let created_at = chrono::Utc::now().naive_utc();
        let mut imported = Vec::with_capacity(movements.len());
        for movement in movements {
            let bank_movement =
                BankMovement::from_normalized(Uuid::new_v4().to_string(), movement, created_at);
            self.storage.save_bank_movement(&bank_movement).await?;
            imported.push(bank_movement);
        }

        info!(
            imported = imported.len(),
            skipped = skipped.len(),
            date_fallbacks = date_fallbacks.len(),
            "statement imported"
        );

        Ok(ImportReport {
            imported,
            skipped,
            date_fallbacks,
        })
    }

    /// Access the underlying storage
    pub fn storage(&self) -> &S {
        &self.storage
    }
}
