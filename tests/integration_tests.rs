//! Integration tests for bank-reconciliation-core

use bank_reconciliation_core::{
    statement::tokenizer::split_line, BankMovementType, DateFormat, Delimiter, LedgerMovement,
    LedgerMovementType, MappingConfiguration, MatcherConfig, MemoryStorage, MovementStorage,
    ReconciliationError, ReconciliationMatcher, Session, StatementImporter, StatementParser,
};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Barrier;

fn session() -> Session {
    Session::new(
        "tesorero",
        "empresa-1",
        "token",
        chrono::Utc::now().naive_utc() + chrono::Duration::hours(1),
    )
}

fn configuration() -> MappingConfiguration {
    MappingConfiguration::new(
        "cfg-banco".to_string(),
        "empresa-1".to_string(),
        "Extracto Banco Central".to_string(),
        Delimiter::Comma,
        DateFormat::DayMonthYearSlash,
    )
    .with_bank("banco-central", "Banco Central")
}

const STATEMENT: &str = "\
Fecha,Descripcion,Referencia,Monto,Tipo
02/05/2024,\"Cobro factura 101, cliente A\",F-101,\"1.500,00\",ABONO
03/05/2024,Pago alquiler,ALQ-5,800.00,CARGO
04/05/2024,Linea corrupta,X-1,???,CARGO
06/05/2024,Comision mantenimiento,COM-1,-12.50,ABONO
";

fn ledger(id: &str, entry: &str, day: u32, movement_type: LedgerMovementType, amount: &str) -> LedgerMovement {
    LedgerMovement::new(
        id.to_string(),
        "empresa-1".to_string(),
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
        movement_type,
        BigDecimal::from_str(amount).unwrap(),
    )
    .with_entry_number(entry)
    .with_bank_account("acc-1")
}

async fn seeded_storage() -> MemoryStorage {
    let mut storage = MemoryStorage::new();
    storage.save_mapping_configuration(&configuration()).await.unwrap();
    for movement in [
        ledger("l-cobro", "AS-001", 1, LedgerMovementType::Income, "1500"),
        ledger("l-alquiler", "AS-002", 3, LedgerMovementType::Expense, "800"),
        ledger("l-otro", "AS-003", 20, LedgerMovementType::Expense, "800"),
    ] {
        storage.save_ledger_movement(&movement).await.unwrap();
    }
    storage
}

#[tokio::test]
async fn test_complete_reconciliation_workflow() {
    let storage = seeded_storage().await;
    let mut importer = StatementImporter::new(storage.clone());
    let mut matcher = ReconciliationMatcher::new(storage.clone());

    let report = importer
        .import_with_configuration(&session(), "acc-1", "cfg-banco", STATEMENT)
        .await
        .unwrap();

    // The corrupt row is skipped, the others are imported
    assert_eq!(report.imported.len(), 3);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].line, 4);

    let cobro = &report.imported[0];
    assert_eq!(cobro.description, "Cobro factura 101, cliente A");
    assert_eq!(cobro.amount, BigDecimal::from_str("1500.00").unwrap());
    assert_eq!(cobro.movement_type, BankMovementType::Credit);

    // A leading minus wins over the ABONO marker
    let comision = &report.imported[2];
    assert_eq!(comision.movement_type, BankMovementType::Debit);
    assert_eq!(comision.amount, BigDecimal::from_str("12.50").unwrap());

    let suggestions = matcher.suggest_matches(&session(), "acc-1").await.unwrap();
    assert_eq!(suggestions.len(), 2);
    assert!(suggestions
        .iter()
        .any(|s| s.bank_movement_id == cobro.id && s.ledger_movement_id == "l-cobro"));
    assert!(suggestions
        .iter()
        .any(|s| s.ledger_movement_id == "l-alquiler" && s.date_distance_days == 0));

    for suggestion in &suggestions {
        matcher
            .reconcile(
                &session(),
                &suggestion.bank_movement_id,
                &suggestion.ledger_movement_id,
            )
            .await
            .unwrap();
    }

    let summary = matcher.summarize_account(&session(), "acc-1").await.unwrap();
    assert_eq!(summary.total_bank, 3);
    assert_eq!(summary.total_ledger, 3);
    assert_eq!(summary.reconciled_bank, 2);
    assert_eq!(summary.reconciled_ledger, 2);
    assert_eq!(summary.pending, 2);
    // (1500 - 800 - 12.50) - (1500 - 800 - 800)
    assert_eq!(summary.difference, BigDecimal::from_str("787.50").unwrap());
}

#[tokio::test]
async fn test_reconcile_then_revert_round_trip() {
    let storage = seeded_storage().await;
    let mut importer = StatementImporter::new(storage.clone());
    let mut matcher = ReconciliationMatcher::new(storage.clone());

    let report = importer
        .import_with_configuration(&session(), "acc-1", "cfg-banco", STATEMENT)
        .await
        .unwrap();
    let bank_id = report.imported[1].id.clone();

    let bank_before = storage.get_bank_movement("empresa-1", &bank_id).await.unwrap().unwrap();
    let ledger_before = storage
        .get_ledger_movement("empresa-1", "l-alquiler")
        .await
        .unwrap()
        .unwrap();

    let pair = matcher.reconcile(&session(), &bank_id, "l-alquiler").await.unwrap();
    assert!(pair.bank.reconciled);
    assert_eq!(pair.bank.ledger_movement_id.as_deref(), Some("l-alquiler"));
    assert!(pair.ledger.reconciled);
    assert_eq!(pair.ledger.bank_movement_id.as_deref(), Some(bank_id.as_str()));
    assert_eq!(pair.ledger.reconciled_by.as_deref(), Some("tesorero"));

    // Reverting against a different ledger movement changes nothing
    let mismatch = matcher.revert(&session(), &bank_id, "l-otro").await;
    assert!(matches!(
        mismatch,
        Err(ReconciliationError::LedgerMovementNotReconciled(_))
    ));

    matcher.revert(&session(), &bank_id, "l-alquiler").await.unwrap();

    let bank_after = storage.get_bank_movement("empresa-1", &bank_id).await.unwrap().unwrap();
    let ledger_after = storage
        .get_ledger_movement("empresa-1", "l-alquiler")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bank_after.record, bank_before.record);
    assert_eq!(ledger_after.record, ledger_before.record);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_reconciles_have_one_winner() {
    let mut storage = seeded_storage().await;
    storage
        .save_ledger_movement(&ledger("l-cobro-dup", "AS-004", 2, LedgerMovementType::Income, "1500"))
        .await
        .unwrap();
    let mut importer = StatementImporter::new(storage.clone());
    let report = importer
        .import_with_configuration(&session(), "acc-1", "cfg-banco", STATEMENT)
        .await
        .unwrap();
    let bank_id = report.imported[0].id.clone();

    let start = Arc::new(Barrier::new(2));
    let mut handles = Vec::new();
    for ledger_id in ["l-cobro", "l-cobro-dup"] {
        let mut matcher = ReconciliationMatcher::new(storage.clone());
        let bank_id = bank_id.clone();
        let start = Arc::clone(&start);
        handles.push(tokio::spawn(async move {
            start.wait().await;
            matcher.reconcile(&session(), &bank_id, ledger_id).await
        }));
    }

    let mut winners = 0;
    let mut losers = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(ReconciliationError::BankMovementAlreadyReconciled(_)) => losers += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!((winners, losers), (1, 1));

    let ledgers = storage
        .list_ledger_movements("empresa-1", Some("acc-1"))
        .await
        .unwrap();
    let linked: Vec<_> = ledgers
        .iter()
        .filter(|l| l.bank_movement_id.as_deref() == Some(bank_id.as_str()))
        .collect();
    assert_eq!(linked.len(), 1);
}

#[tokio::test]
async fn test_invalid_configuration_fails_before_import() {
    let mut storage = MemoryStorage::new();
    let broken = configuration().with_columns(0, 1, 2, 3, 0);
    storage.save_mapping_configuration(&broken).await.unwrap();
    let mut importer = StatementImporter::new(storage.clone());

    let result = importer
        .import_with_configuration(&session(), "acc-1", "cfg-banco", STATEMENT)
        .await;

    assert!(matches!(
        result,
        Err(ReconciliationError::InvalidConfiguration(_))
    ));
    assert!(storage
        .list_bank_movements("empresa-1", None)
        .await
        .unwrap()
        .is_empty());
}

#[test]
fn test_quoted_fields_keep_their_delimiters() {
    let fields = split_line("\"Smith, John\",100.50,\"ABONO\"", ',');
    assert_eq!(fields, vec!["Smith, John", "100.50", "ABONO"]);
}

#[test]
fn test_automatic_parse_detects_semicolons() {
    let content = "a;b;c;d\n01/02/2024;Pago;10,00;REF";
    let parsed = StatementParser::new().parse_automatic(content, "acc-1", "empresa-1");

    assert_eq!(parsed.movements.len(), 1);
    assert_eq!(parsed.movements[0].amount, BigDecimal::from_str("10.00").unwrap());
    assert_eq!(parsed.movements[0].description, "Pago");
}

#[test]
fn test_matcher_config_from_json() {
    let config: MatcherConfig =
        serde_json::from_str(r#"{"maxCommitAttempts": 5, "dateToleranceDays": 1}"#).unwrap();
    assert_eq!(config.max_commit_attempts, 5);
    assert_eq!(config.date_tolerance_days, 1);
}
