use rust_decimal::Decimal;
use serde::Deserialize;

/// A payment order as received from the request-accepting endpoint.
///
/// Field values are kept exactly as received; all validation happens in the
/// message builder so failures can name the offending field. Missing string
/// fields decode as empty and are reported as "is required" there.
#[derive(Debug, Deserialize, PartialEq, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentRequest {
    pub payer_name: String,
    #[serde(rename = "payerCpfCnpj", alias = "payerTaxId")]
    pub payer_tax_id: String,
    pub payer_ispb: String,
    #[serde(alias = "payerBranch")]
    pub payer_agency: String,
    pub payer_account: String,
    pub payer_account_type: String,

    pub receiver_name: String,
    #[serde(rename = "receiverCpfCnpj", alias = "receiverTaxId")]
    pub receiver_tax_id: String,
    pub receiver_ispb: String,
    #[serde(alias = "receiverBranch")]
    pub receiver_agency: String,
    pub receiver_account: String,
    pub receiver_account_type: String,
    #[serde(alias = "receiverAliasKey")]
    pub receiver_pix_key: Option<String>,

    pub amount: Option<Decimal>,
    pub description: String,

    pub transaction_id: Option<String>,
    pub priority: Option<String>,
    pub service_level: Option<String>,
    pub local_instrument: Option<String>,
    pub purpose: Option<String>,
    pub charge_bearer: Option<String>,
    pub settlement_method: Option<String>,
}
