//! Typed model of the SPI envelope carrying a `pacs.008.001.09` document.
//!
//! One struct per schema element group. Every field is mandatory unless the
//! schema makes it optional, so the shape of the serialized document never
//! depends on the request; only values vary.

use super::amount::Amount;
use super::codes::{
    AccountType, ChargeBearer, LocalInstrument, Priority, Purpose, ServiceLevel, SettlementMethod,
};
use super::identifiers::{EndToEndId, Ispb, MessageId};
use chrono::{DateTime, Utc};

/// Message definition identifier of the SPI pacs.008 schema version.
pub const MESSAGE_DEFINITION_ID: &str = "pacs.008.spi.1.13";

/// ISPB of the network operator, the receiver of every message.
pub const OPERATOR_ISPB: &str = "00000000";

#[derive(Debug, Clone, PartialEq)]
pub struct MessageEnvelope {
    pub header: ApplicationHeader,
    pub document: Document,
}

impl MessageEnvelope {
    pub fn message_id(&self) -> &MessageId {
        &self.header.business_message_id
    }

    pub fn end_to_end_id(&self) -> &EndToEndId {
        &self.document.transaction.payment_id.end_to_end_id
    }
}

/// Slot for the enveloped signature.
///
/// The model can only ever hold an empty slot: signatures are produced over
/// the serialized bytes and embedded by the signature engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignaturePlaceholder;

#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationHeader {
    pub from: InstitutionReference,
    pub to: InstitutionReference,
    pub business_message_id: MessageId,
    pub message_definition_id: &'static str,
    pub created_at: DateTime<Utc>,
    pub signature: SignaturePlaceholder,
}

/// `FIToFICstmrCdtTrf`: one group header and exactly one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub group_header: GroupHeader,
    pub transaction: CreditTransferTransaction,
}

impl Document {
    /// Always "1": the model holds a single transaction by construction.
    pub fn number_of_transactions(&self) -> &'static str {
        "1"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupHeader {
    pub message_id: MessageId,
    pub created_at: DateTime<Utc>,
    pub settlement_method: SettlementMethod,
    pub priority: Priority,
    pub service_level: ServiceLevel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentIdentification {
    pub end_to_end_id: EndToEndId,
    pub transaction_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreditTransferTransaction {
    pub payment_id: PaymentIdentification,
    pub settlement_amount: Amount,
    pub accepted_at: DateTime<Utc>,
    pub charge_bearer: ChargeBearer,
    pub local_instrument: LocalInstrument,
    pub debtor: PartyIdentity,
    pub debtor_account: AccountReference,
    pub debtor_agent: InstitutionReference,
    pub creditor: PartyIdentity,
    pub creditor_account: AccountReference,
    pub creditor_agent: InstitutionReference,
    pub purpose: Purpose,
    pub remittance_information: String,
}

/// Name (debtor only) plus the CPF/CNPJ under `PrvtId/Othr/Id`.
#[derive(Debug, Clone, PartialEq)]
pub struct PartyIdentity {
    pub name: Option<String>,
    pub tax_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountReference {
    pub number: String,
    pub branch: String,
    pub account_type: AccountType,
    pub proxy: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstitutionReference {
    pub ispb: Ispb,
}

impl InstitutionReference {
    pub fn new(ispb: Ispb) -> Self {
        Self { ispb }
    }
}
