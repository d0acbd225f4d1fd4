//! Typed nomenclature records
//!
//! Every catalog kind is its own record type. [`NomenclaturePayload`] carries
//! one of them with an internal `tipo` tag, and all dispatch (collection,
//! validation) goes through the variant.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::types::*;
use crate::utils::validation::validate_identifier;

/// Fields shared by every nomenclature record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NomenclatureEntry {
    pub id: String,
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "activo", default = "active_by_default")]
    pub active: bool,
    #[serde(rename = "empresaId")]
    pub tenant_id: String,
}

fn active_by_default() -> bool {
    true
}

impl NomenclatureEntry {
    pub fn new(
        id: impl Into<String>,
        tenant_id: impl Into<String>,
        code: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            name: name.into(),
            active: true,
            tenant_id: tenant_id.into(),
        }
    }
}

/// Identity document type (tax id, passport, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityDocument {
    #[serde(flatten)]
    pub entry: NomenclatureEntry,
    /// Exact number of characters, when the document has a fixed length
    #[serde(rename = "longitud", default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(rename = "soloNumeros", default)]
    pub numeric_only: bool,
}

/// Invoice document type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDocument {
    #[serde(flatten)]
    pub entry: NomenclatureEntry,
    #[serde(rename = "esNotaCredito", default)]
    pub is_credit_note: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tax {
    #[serde(flatten)]
    pub entry: NomenclatureEntry,
    /// Percentage between 0 and 100
    #[serde(rename = "porcentaje")]
    pub rate: BigDecimal,
    #[serde(rename = "esRetencion", default)]
    pub is_withholding: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
    #[serde(flatten)]
    pub entry: NomenclatureEntry,
    #[serde(rename = "diasCredito", default)]
    pub credit_days: u32,
    #[serde(rename = "requiereBanco", default)]
    pub requires_bank: bool,
}

/// Kind of treasury movement, with the ledger direction it books
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreasuryMovementKind {
    #[serde(flatten)]
    pub entry: NomenclatureEntry,
    #[serde(rename = "naturaleza")]
    pub movement_type: LedgerMovementType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    #[serde(flatten)]
    pub entry: NomenclatureEntry,
    #[serde(rename = "simbolo")]
    pub symbol: String,
    #[serde(rename = "decimales")]
    pub decimals: u8,
    #[serde(rename = "esMonedaBase", default)]
    pub is_base: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bank {
    #[serde(flatten)]
    pub entry: NomenclatureEntry,
    #[serde(rename = "codigoSwift", default, skip_serializing_if = "Option::is_none")]
    pub swift_code: Option<String>,
    #[serde(rename = "pais", default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// The catalog a nomenclature record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NomenclatureKind {
    DocIdentidad,
    DocFactura,
    Impuesto,
    FormaPago,
    MovimientoTesoreria,
    Moneda,
    Banco,
}

impl NomenclatureKind {
    pub const ALL: [NomenclatureKind; 7] = [
        NomenclatureKind::DocIdentidad,
        NomenclatureKind::DocFactura,
        NomenclatureKind::Impuesto,
        NomenclatureKind::FormaPago,
        NomenclatureKind::MovimientoTesoreria,
        NomenclatureKind::Moneda,
        NomenclatureKind::Banco,
    ];

    /// Document collection holding records of this kind
    pub fn collection(&self) -> &'static str {
        match self {
            NomenclatureKind::DocIdentidad => "documentosIdentidad",
            NomenclatureKind::DocFactura => "documentosFactura",
            NomenclatureKind::Impuesto => "impuestos",
            NomenclatureKind::FormaPago => "formasPago",
            NomenclatureKind::MovimientoTesoreria => "tiposMovimientoTesoreria",
            NomenclatureKind::Moneda => "monedas",
            NomenclatureKind::Banco => "bancos",
        }
    }
}

/// A nomenclature record of any kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tipo")]
pub enum NomenclaturePayload {
    DocIdentidad(IdentityDocument),
    DocFactura(InvoiceDocument),
    Impuesto(Tax),
    FormaPago(PaymentMethod),
    MovimientoTesoreria(TreasuryMovementKind),
    Moneda(Currency),
    Banco(Bank),
}

impl NomenclaturePayload {
    pub fn kind(&self) -> NomenclatureKind {
        match self {
            NomenclaturePayload::DocIdentidad(_) => NomenclatureKind::DocIdentidad,
            NomenclaturePayload::DocFactura(_) => NomenclatureKind::DocFactura,
            NomenclaturePayload::Impuesto(_) => NomenclatureKind::Impuesto,
            NomenclaturePayload::FormaPago(_) => NomenclatureKind::FormaPago,
            NomenclaturePayload::MovimientoTesoreria(_) => NomenclatureKind::MovimientoTesoreria,
            NomenclaturePayload::Moneda(_) => NomenclatureKind::Moneda,
            NomenclaturePayload::Banco(_) => NomenclatureKind::Banco,
        }
    }

    pub fn collection(&self) -> &'static str {
        self.kind().collection()
    }

    pub fn entry(&self) -> &NomenclatureEntry {
        match self {
            NomenclaturePayload::DocIdentidad(record) => &record.entry,
            NomenclaturePayload::DocFactura(record) => &record.entry,
            NomenclaturePayload::Impuesto(record) => &record.entry,
            NomenclaturePayload::FormaPago(record) => &record.entry,
            NomenclaturePayload::MovimientoTesoreria(record) => &record.entry,
            NomenclaturePayload::Moneda(record) => &record.entry,
            NomenclaturePayload::Banco(record) => &record.entry,
        }
    }

    pub fn code(&self) -> &str {
        &self.entry().code
    }

    pub fn name(&self) -> &str {
        &self.entry().name
    }

    pub fn is_active(&self) -> bool {
        self.entry().active
    }

    /// Check the shared fields and the rules of the specific kind
    pub fn validate(&self) -> ReconciliationResult<()> {
        let entry = self.entry();
        validate_identifier("Nomenclature", &entry.id)?;
        validate_identifier("Tenant", &entry.tenant_id)?;
        if entry.code.trim().is_empty() {
            return Err(ReconciliationError::Validation(format!(
                "{:?} code cannot be empty",
                self.kind()
            )));
        }
        if entry.name.trim().is_empty() {
            return Err(ReconciliationError::Validation(format!(
                "{:?} name cannot be empty",
                self.kind()
            )));
        }

        match self {
            NomenclaturePayload::DocIdentidad(doc) if doc.length == Some(0) => Err(
                ReconciliationError::Validation("document length must be positive".to_string()),
            ),
            NomenclaturePayload::Impuesto(tax)
                if tax.rate < BigDecimal::from(0) || tax.rate > BigDecimal::from(100) =>
            {
                Err(ReconciliationError::Validation(format!(
                    "tax rate {} must be between 0 and 100",
                    tax.rate
                )))
            }
            NomenclaturePayload::Moneda(currency) if currency.symbol.trim().is_empty() => Err(
                ReconciliationError::Validation("currency symbol cannot be empty".to_string()),
            ),
            NomenclaturePayload::Moneda(currency) if currency.decimals > 4 => {
                Err(ReconciliationError::Validation(format!(
                    "currency cannot have {} decimals",
                    currency.decimals
                )))
            }
            _ => Ok(()),
        }
    }
}
