use crate::domain::message::{
    AccountReference, ApplicationHeader, CreditTransferTransaction, Document, GroupHeader,
    InstitutionReference, MessageEnvelope, PartyIdentity,
};
use crate::error::{Pacs008Error, Result};
use crate::infrastructure::xml::{self, Element};
use chrono::{DateTime, SecondsFormat, Utc};

pub const ENVELOPE_NAMESPACE: &str = "https://www.bcb.gov.br/pi/pacs.008/1.13";
pub const HEADER_NAMESPACE: &str = "urn:iso:std:iso:20022:tech:xsd:head.001.001.01";
pub const DOCUMENT_NAMESPACE: &str = "urn:iso:std:iso:20022:tech:xsd:pacs.008.001.09";

/// Local name of the signature placeholder inside `AppHdr`.
pub const SIGNATURE_PLACEHOLDER: &str = "Sgntr";

/// Renders a [`MessageEnvelope`] as indented UTF-8 XML.
///
/// Element order follows the schema sequence and is fixed, so two equal
/// envelopes always produce the same bytes. The signature digest depends
/// on this.
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlSerializer;

impl XmlSerializer {
    pub fn new() -> Self {
        Self
    }

    pub fn serialize(&self, envelope: &MessageEnvelope) -> Result<Vec<u8>> {
        xml::write(&self.to_tree(envelope), true)
            .map_err(|e| Pacs008Error::SerializationError(e.to_string()))
    }

    pub fn to_tree(&self, envelope: &MessageEnvelope) -> Element {
        Element::new("Envelope")
            .with_attribute("xmlns", ENVELOPE_NAMESPACE)
            .with_child(header(&envelope.header))
            .with_child(document(&envelope.document))
    }
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn header(header: &ApplicationHeader) -> Element {
    Element::new("AppHdr")
        .with_attribute("xmlns", HEADER_NAMESPACE)
        .with_child(Element::new("Fr").with_child(institution("FIId", &header.from)))
        .with_child(Element::new("To").with_child(institution("FIId", &header.to)))
        .with_child(Element::leaf("BizMsgIdr", header.business_message_id.as_str()))
        .with_child(Element::leaf("MsgDefIdr", header.message_definition_id))
        .with_child(Element::leaf("CreDt", timestamp(&header.created_at)))
        .with_child(Element::new(SIGNATURE_PLACEHOLDER))
}

fn document(document: &Document) -> Element {
    Element::new("Document")
        .with_attribute("xmlns", DOCUMENT_NAMESPACE)
        .with_child(
            Element::new("FIToFICstmrCdtTrf")
                .with_child(group_header(
                    &document.group_header,
                    document.number_of_transactions(),
                ))
                .with_child(transaction(&document.transaction)),
        )
}

fn group_header(group: &GroupHeader, number_of_transactions: &str) -> Element {
    Element::new("GrpHdr")
        .with_child(Element::leaf("MsgId", group.message_id.as_str()))
        .with_child(Element::leaf("CreDtTm", timestamp(&group.created_at)))
        .with_child(Element::leaf("NbOfTxs", number_of_transactions))
        .with_child(
            Element::new("SttlmInf")
                .with_child(Element::leaf("SttlmMtd", group.settlement_method.as_str())),
        )
        .with_child(
            Element::new("PmtTpInf")
                .with_child(Element::leaf("InstrPrty", group.priority.as_str()))
                .with_child(
                    Element::new("SvcLvl")
                        .with_child(Element::leaf("Prtry", group.service_level.as_str())),
                ),
        )
}

fn transaction(tx: &CreditTransferTransaction) -> Element {
    Element::new("CdtTrfTxInf")
        .with_child(
            Element::new("PmtId")
                .with_child(Element::leaf(
                    "EndToEndId",
                    tx.payment_id.end_to_end_id.as_str(),
                ))
                .with_child(Element::leaf("TxId", tx.payment_id.transaction_id.as_str())),
        )
        .with_child(
            Element::leaf("IntrBkSttlmAmt", tx.settlement_amount.to_string())
                .with_attribute("Ccy", tx.settlement_amount.currency()),
        )
        .with_child(Element::leaf("AccptncDtTm", timestamp(&tx.accepted_at)))
        .with_child(Element::leaf("ChrgBr", tx.charge_bearer.as_str()))
        .with_child(
            Element::new("MndtRltdInf").with_child(
                Element::new("Tp").with_child(
                    Element::new("LclInstrm")
                        .with_child(Element::leaf("Prtry", tx.local_instrument.as_str())),
                ),
            ),
        )
        .with_child(party("Dbtr", &tx.debtor))
        .with_child(account("DbtrAcct", &tx.debtor_account))
        .with_child(institution("DbtrAgt", &tx.debtor_agent))
        .with_child(party("Cdtr", &tx.creditor))
        .with_child(account("CdtrAcct", &tx.creditor_account))
        .with_child(institution("CdtrAgt", &tx.creditor_agent))
        .with_child(Element::new("Purp").with_child(Element::leaf("Cd", tx.purpose.as_str())))
        .with_child(
            Element::new("RmtInf")
                .with_child(Element::leaf("Ustrd", tx.remittance_information.as_str())),
        )
}

fn party(tag: &str, party: &PartyIdentity) -> Element {
    let mut element = Element::new(tag);
    if let Some(name) = &party.name {
        element.push(Element::leaf("Nm", name.as_str()));
    }
    element.with_child(
        Element::new("Id").with_child(
            Element::new("PrvtId").with_child(
                Element::new("Othr").with_child(Element::leaf("Id", party.tax_id.as_str())),
            ),
        ),
    )
}

fn account(tag: &str, account: &AccountReference) -> Element {
    let mut element = Element::new(tag)
        .with_child(
            Element::new("Id").with_child(
                Element::new("Othr")
                    .with_child(Element::leaf("Id", account.number.as_str()))
                    .with_child(Element::leaf("Issr", account.branch.as_str())),
            ),
        )
        .with_child(
            Element::new("Tp").with_child(Element::leaf("Cd", account.account_type.as_str())),
        );
    if let Some(proxy) = &account.proxy {
        element.push(Element::new("Prxy").with_child(Element::leaf("Id", proxy.as_str())));
    }
    element
}

fn institution(tag: &str, institution: &InstitutionReference) -> Element {
    Element::new(tag).with_child(
        Element::new("FinInstnId").with_child(
            Element::new("ClrSysMmbId")
                .with_child(Element::leaf("MmbId", institution.ispb.as_str())),
        ),
    )
}
