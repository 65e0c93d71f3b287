use crate::domain::amount::Amount;
use crate::domain::codes::{
    AccountType, ChargeBearer, CodeList, LocalInstrument, Priority, Purpose, ServiceLevel,
    SettlementMethod,
};
use crate::domain::identifiers::{IdentifierGenerator, Ispb, MAX_IDENTIFIER_LEN};
use crate::domain::message::{
    AccountReference, ApplicationHeader, CreditTransferTransaction, Document, GroupHeader,
    InstitutionReference, MESSAGE_DEFINITION_ID, MessageEnvelope, OPERATOR_ISPB,
    PartyIdentity, PaymentIdentification, SignaturePlaceholder,
};
use crate::domain::request::PaymentRequest;
use crate::error::{Pacs008Error, Result};
use chrono::{DateTime, Utc};

const MAX_NAME_LEN: usize = 140;
const MAX_REMITTANCE_LEN: usize = 140;
const MAX_PIX_KEY_LEN: usize = 77;
const MAX_BRANCH_DIGITS: usize = 4;
const MAX_ACCOUNT_DIGITS: usize = 20;
const CPF_LEN: usize = 11;
const CNPJ_LEN: usize = 14;

/// Maps a [`PaymentRequest`] onto the full [`MessageEnvelope`].
///
/// Every field of the request is validated here; a request that passes is
/// guaranteed to serialize into a schema-shaped document.
#[derive(Debug, Default, Clone)]
pub struct MessageBuilder {
    ids: IdentifierGenerator,
}

impl MessageBuilder {
    pub fn new(ids: IdentifierGenerator) -> Self {
        Self { ids }
    }

    pub fn build(&self, request: &PaymentRequest) -> Result<MessageEnvelope> {
        self.build_at(request, Utc::now())
    }

    /// Builds the envelope using `now` for every timestamp in the message.
    pub fn build_at(&self, request: &PaymentRequest, now: DateTime<Utc>) -> Result<MessageEnvelope> {
        let payer_ispb = Ispb::parse("payer_ispb", &request.payer_ispb)?;
        let receiver_ispb = Ispb::parse("receiver_ispb", &request.receiver_ispb)?;
        let amount = request
            .amount
            .ok_or_else(|| Pacs008Error::validation("amount", "is required"))
            .and_then(Amount::new)?;

        let debtor = PartyIdentity {
            name: Some(name("payer_name", &request.payer_name)?),
            tax_id: tax_id("payer_tax_id", &request.payer_tax_id)?,
        };
        let debtor_account = AccountReference {
            number: digits("payer_account", &request.payer_account, MAX_ACCOUNT_DIGITS)?,
            branch: digits("payer_agency", &request.payer_agency, MAX_BRANCH_DIGITS)?,
            account_type: code::<AccountType>("payer_account_type", &request.payer_account_type)?,
            proxy: None,
        };

        // The creditor name is validated but the schema only carries its ID.
        name("receiver_name", &request.receiver_name)?;
        let creditor = PartyIdentity {
            name: None,
            tax_id: tax_id("receiver_tax_id", &request.receiver_tax_id)?,
        };
        let creditor_account = AccountReference {
            number: digits("receiver_account", &request.receiver_account, MAX_ACCOUNT_DIGITS)?,
            branch: digits("receiver_agency", &request.receiver_agency, MAX_BRANCH_DIGITS)?,
            account_type: code::<AccountType>(
                "receiver_account_type",
                &request.receiver_account_type,
            )?,
            proxy: pix_key(request.receiver_pix_key.as_deref())?,
        };

        let remittance_information = free_text("description", request.description.trim())?;
        if remittance_information.chars().count() > MAX_REMITTANCE_LEN {
            return Err(Pacs008Error::validation(
                "description",
                format!("must be at most {MAX_REMITTANCE_LEN} characters"),
            ));
        }

        let settlement_method =
            optional_code::<SettlementMethod>("settlement_method", &request.settlement_method)?;
        let priority = optional_code::<Priority>("priority", &request.priority)?;
        let service_level = optional_code::<ServiceLevel>("service_level", &request.service_level)?;
        let charge_bearer = optional_code::<ChargeBearer>("charge_bearer", &request.charge_bearer)?;
        let local_instrument =
            optional_code::<LocalInstrument>("local_instrument", &request.local_instrument)?;
        let purpose = optional_code::<Purpose>("purpose", &request.purpose)?;
        let transaction_id = transaction_id(request.transaction_id.as_deref())?;

        let message_id = self.ids.message_id(&payer_ispb);
        let end_to_end_id = self.ids.end_to_end_id_at(&payer_ispb, now);
        let transaction_id = transaction_id.unwrap_or_else(|| end_to_end_id.to_string());

        let header = ApplicationHeader {
            from: InstitutionReference::new(payer_ispb.clone()),
            to: InstitutionReference::new(Ispb::parse("operator_ispb", OPERATOR_ISPB)?),
            business_message_id: message_id.clone(),
            message_definition_id: MESSAGE_DEFINITION_ID,
            created_at: now,
            signature: SignaturePlaceholder,
        };

        let group_header = GroupHeader {
            message_id,
            created_at: now,
            settlement_method,
            priority,
            service_level,
        };

        let transaction = CreditTransferTransaction {
            payment_id: PaymentIdentification {
                end_to_end_id,
                transaction_id,
            },
            settlement_amount: amount,
            accepted_at: now,
            charge_bearer,
            local_instrument,
            debtor,
            debtor_account,
            debtor_agent: InstitutionReference::new(payer_ispb),
            creditor,
            creditor_account,
            creditor_agent: InstitutionReference::new(receiver_ispb),
            purpose,
            remittance_information,
        };

        Ok(MessageEnvelope {
            header,
            document: Document {
                group_header,
                transaction,
            },
        })
    }
}

fn required<'a>(field: &'static str, raw: &'a str) -> Result<&'a str> {
    let value = raw.trim();
    if value.is_empty() {
        Err(Pacs008Error::validation(field, "is required"))
    } else {
        Ok(value)
    }
}

fn name(field: &'static str, raw: &str) -> Result<String> {
    let value = free_text(field, required(field, raw)?)?;
    if value.chars().count() > MAX_NAME_LEN {
        return Err(Pacs008Error::validation(
            field,
            format!("must be at most {MAX_NAME_LEN} characters"),
        ));
    }
    Ok(value)
}

/// Folds CRLF and lone CR into LF, the form an XML parser hands to C14N,
/// and rejects characters outside the XML 1.0 `Char` production.
fn free_text(field: &'static str, raw: &str) -> Result<String> {
    let value = raw.replace("\r\n", "\n").replace('\r', "\n");
    let forbidden = |c: char| {
        (c < ' ' && !matches!(c, '\t' | '\n')) || matches!(c, '\u{FFFE}' | '\u{FFFF}')
    };
    if let Some(c) = value.chars().find(|&c| forbidden(c)) {
        return Err(Pacs008Error::validation(
            field,
            format!("contains U+{:04X}, which is not allowed in XML", c as u32),
        ));
    }
    Ok(value)
}

/// CPF (11 digits) or CNPJ (14 digits), without punctuation.
fn tax_id(field: &'static str, raw: &str) -> Result<String> {
    let value = required(field, raw)?;
    let numeric = value.bytes().all(|b| b.is_ascii_digit());
    if !numeric || (value.len() != CPF_LEN && value.len() != CNPJ_LEN) {
        return Err(Pacs008Error::validation(
            field,
            format!("must be a CPF ({CPF_LEN} digits) or CNPJ ({CNPJ_LEN} digits)"),
        ));
    }
    Ok(value.to_string())
}

fn digits(field: &'static str, raw: &str, max: usize) -> Result<String> {
    let value = required(field, raw)?;
    if value.len() > max || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Pacs008Error::validation(
            field,
            format!("must be numeric with at most {max} digits"),
        ));
    }
    Ok(value.to_string())
}

fn code<T: CodeList>(field: &'static str, raw: &str) -> Result<T> {
    T::parse_for(field, required(field, raw)?)
}

fn optional_code<T: CodeList>(field: &'static str, raw: &Option<String>) -> Result<T> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(T::default()),
        Some(value) => T::parse_for(field, value),
    }
}

fn pix_key(raw: Option<&str>) -> Result<Option<String>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(key) if key.chars().count() > MAX_PIX_KEY_LEN => Err(Pacs008Error::validation(
            "receiver_pix_key",
            format!("must be at most {MAX_PIX_KEY_LEN} characters"),
        )),
        Some(key) => free_text("receiver_pix_key", key).map(Some),
    }
}

fn transaction_id(raw: Option<&str>) -> Result<Option<String>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(id)
            if id.len() <= MAX_IDENTIFIER_LEN && id.bytes().all(|b| b.is_ascii_alphanumeric()) =>
        {
            Ok(Some(id.to_string()))
        }
        Some(_) => Err(Pacs008Error::validation(
            "transaction_id",
            format!("must be 1 to {MAX_IDENTIFIER_LEN} alphanumeric characters"),
        )),
    }
}
