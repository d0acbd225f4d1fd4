//! In-memory storage implementation for testing

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::statement::MappingConfiguration;
use crate::traits::*;
use crate::types::*;

/// Records of one collection, keyed by tenant and then by record id
type Collection<T> = HashMap<String, HashMap<String, T>>;

/// In-memory storage implementation for testing and development
///
/// Clones share the same data, so several matchers or importers built from
/// clones of one storage contend on the same records.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    bank_movements: Arc<RwLock<Collection<Versioned<BankMovement>>>>,
    ledger_movements: Arc<RwLock<Collection<Versioned<LedgerMovement>>>>,
    mapping_configurations: Arc<RwLock<Collection<MappingConfiguration>>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self {
            bank_movements: Arc::new(RwLock::new(HashMap::new())),
            ledger_movements: Arc::new(RwLock::new(HashMap::new())),
            mapping_configurations: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> ReconciliationResult<()> {
        write(&self.bank_movements)?.clear();
        write(&self.ledger_movements)?.clear();
        write(&self.mapping_configurations)?.clear();
        Ok(())
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> ReconciliationResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| ReconciliationError::Storage("storage lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> ReconciliationResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| ReconciliationError::Storage("storage lock poisoned".to_string()))
}

fn upsert<T>(collection: &mut Collection<Versioned<T>>, tenant_id: &str, id: &str, record: T) {
    let records = collection.entry(tenant_id.to_string()).or_default();
    let version = records.get(id).map_or(1, |existing| existing.version + 1);
    records.insert(id.to_string(), Versioned { record, version });
}

fn current_version<T>(collection: &Collection<Versioned<T>>, tenant_id: &str, id: &str) -> Option<u64> {
    collection
        .get(tenant_id)
        .and_then(|records| records.get(id))
        .map(|stored| stored.version)
}

#[async_trait]
impl MovementStorage for MemoryStorage {
    async fn save_bank_movement(&mut self, movement: &BankMovement) -> ReconciliationResult<()> {
        let mut movements = write(&self.bank_movements)?;
        upsert(
            &mut movements,
            &movement.tenant_id,
            &movement.id,
            movement.clone(),
        );
        Ok(())
    }

    async fn get_bank_movement(
        &self,
        tenant_id: &str,
        movement_id: &str,
    ) -> ReconciliationResult<Option<Versioned<BankMovement>>> {
        Ok(read(&self.bank_movements)?
            .get(tenant_id)
            .and_then(|records| records.get(movement_id))
            .cloned())
    }

    async fn list_bank_movements(
        &self,
        tenant_id: &str,
        bank_account_id: Option<&str>,
    ) -> ReconciliationResult<Vec<BankMovement>> {
        let movements = read(&self.bank_movements)?;
        let mut filtered: Vec<BankMovement> = movements
            .get(tenant_id)
            .into_iter()
            .flat_map(|records| records.values())
            .map(|stored| &stored.record)
            .filter(|movement| bank_account_id.is_none_or(|id| movement.bank_account_id == id))
            .cloned()
            .collect();
        filtered.sort_by(|a, b| (a.date, a.created_at, &a.id).cmp(&(b.date, b.created_at, &b.id)));
        Ok(filtered)
    }

    async fn save_ledger_movement(
        &mut self,
        movement: &LedgerMovement,
    ) -> ReconciliationResult<()> {
        let mut movements = write(&self.ledger_movements)?;
        upsert(
            &mut movements,
            &movement.tenant_id,
            &movement.id,
            movement.clone(),
        );
        Ok(())
    }

    async fn get_ledger_movement(
        &self,
        tenant_id: &str,
        movement_id: &str,
    ) -> ReconciliationResult<Option<Versioned<LedgerMovement>>> {
        Ok(read(&self.ledger_movements)?
            .get(tenant_id)
            .and_then(|records| records.get(movement_id))
            .cloned())
    }

    async fn list_ledger_movements(
        &self,
        tenant_id: &str,
        bank_account_id: Option<&str>,
    ) -> ReconciliationResult<Vec<LedgerMovement>> {
        let movements = read(&self.ledger_movements)?;
        let mut filtered: Vec<LedgerMovement> = movements
            .get(tenant_id)
            .into_iter()
            .flat_map(|records| records.values())
            .map(|stored| &stored.record)
            .filter(|movement| {
                bank_account_id
                    .is_none_or(|id| movement.bank_account_id.as_deref() == Some(id))
            })
            .cloned()
            .collect();
        filtered.sort_by(|a, b| (a.date, &a.entry_number, &a.id).cmp(&(b.date, &b.entry_number, &b.id)));
        Ok(filtered)
    }

    async fn commit_pair(&mut self, tenant_id: &str, write_set: PairWrite) -> ReconciliationResult<()> {
        // Always bank before ledger so concurrent commits cannot deadlock
        let mut bank_movements = write(&self.bank_movements)?;
        let mut ledger_movements = write(&self.ledger_movements)?;

        let bank_id = &write_set.bank.id;
        let ledger_id = &write_set.ledger.id;

        if current_version(&bank_movements, tenant_id, bank_id)
            != Some(write_set.expected_bank_version)
        {
            return Err(ReconciliationError::Conflict(format!(
                "bank movement {bank_id} changed since it was read"
            )));
        }
        if current_version(&ledger_movements, tenant_id, ledger_id)
            != Some(write_set.expected_ledger_version)
        {
            return Err(ReconciliationError::Conflict(format!(
                "ledger movement {ledger_id} changed since it was read"
            )));
        }

        let bank_id = bank_id.clone();
        let ledger_id = ledger_id.clone();
        upsert(&mut bank_movements, tenant_id, &bank_id, write_set.bank);
        upsert(&mut ledger_movements, tenant_id, &ledger_id, write_set.ledger);
        Ok(())
    }

    async fn save_mapping_configuration(
        &mut self,
        configuration: &MappingConfiguration,
    ) -> ReconciliationResult<()> {
        write(&self.mapping_configurations)?
            .entry(configuration.tenant_id.clone())
            .or_default()
            .insert(configuration.id.clone(), configuration.clone());
        Ok(())
    }

    async fn get_mapping_configuration(
        &self,
        tenant_id: &str,
        configuration_id: &str,
    ) -> ReconciliationResult<Option<MappingConfiguration>> {
        Ok(read(&self.mapping_configurations)?
            .get(tenant_id)
            .and_then(|configurations| configurations.get(configuration_id))
            .cloned())
    }

    async fn list_mapping_configurations(
        &self,
        tenant_id: &str,
    ) -> ReconciliationResult<Vec<MappingConfiguration>> {
        let configurations = read(&self.mapping_configurations)?;
        let mut listed: Vec<MappingConfiguration> = configurations
            .get(tenant_id)
            .into_iter()
            .flat_map(|configurations| configurations.values())
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn ledger(id: &str, tenant_id: &str) -> LedgerMovement {
        LedgerMovement::new(
            id.to_string(),
            tenant_id.to_string(),
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            LedgerMovementType::Income,
            BigDecimal::from(100),
        )
        .with_bank_account("acc-1")
    }

    fn bank(id: &str, tenant_id: &str) -> BankMovement {
        BankMovement::from_normalized(
            id.to_string(),
            NormalizedBankMovement {
                date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                description: "Deposit".to_string(),
                reference: String::new(),
                amount: BigDecimal::from(100),
                movement_type: BankMovementType::Credit,
                bank_account_id: "acc-1".to_string(),
                tenant_id: tenant_id.to_string(),
            },
            chrono::Utc::now().naive_utc(),
        )
    }

    #[tokio::test]
    async fn test_versions_increase_on_every_save() {
        let mut storage = MemoryStorage::new();
        let movement = bank("b1", "t1");

        storage.save_bank_movement(&movement).await.unwrap();
        storage.save_bank_movement(&movement).await.unwrap();

        let stored = storage.get_bank_movement("t1", "b1").await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn test_records_are_tenant_scoped() {
        let mut storage = MemoryStorage::new();
        storage.save_bank_movement(&bank("b1", "t1")).await.unwrap();
        storage.save_ledger_movement(&ledger("l1", "t1")).await.unwrap();

        assert!(storage.get_bank_movement("t2", "b1").await.unwrap().is_none());
        assert!(storage.list_ledger_movements("t2", None).await.unwrap().is_empty());
        assert_eq!(
            storage.list_ledger_movements("t1", Some("acc-1")).await.unwrap().len(),
            1
        );
        assert!(storage
            .list_ledger_movements("t1", Some("acc-2"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_commit_pair_rejects_stale_versions() {
        let mut storage = MemoryStorage::new();
        storage.save_bank_movement(&bank("b1", "t1")).await.unwrap();
        storage.save_ledger_movement(&ledger("l1", "t1")).await.unwrap();

        let bank_read = storage.get_bank_movement("t1", "b1").await.unwrap().unwrap();
        let ledger_read = storage.get_ledger_movement("t1", "l1").await.unwrap().unwrap();

        // A concurrent writer touches the ledger record
        storage.save_ledger_movement(&ledger_read.record).await.unwrap();

        let mut bank_update = bank_read.record.clone();
        bank_update.reconciled = true;
        let result = storage
            .commit_pair(
                "t1",
                PairWrite {
                    bank: bank_update,
                    expected_bank_version: bank_read.version,
                    ledger: ledger_read.record.clone(),
                    expected_ledger_version: ledger_read.version,
                },
            )
            .await;

        assert!(matches!(result, Err(ReconciliationError::Conflict(_))));
        let bank_after = storage.get_bank_movement("t1", "b1").await.unwrap().unwrap();
        assert!(!bank_after.record.reconciled);
        assert_eq!(bank_after.version, bank_read.version);
    }

    #[tokio::test]
    async fn test_clear() {
        let mut storage = MemoryStorage::new();
        storage.save_bank_movement(&bank("b1", "t1")).await.unwrap();
        storage.clear().unwrap();
        assert!(storage.list_bank_movements("t1", None).await.unwrap().is_empty());
    }
}
