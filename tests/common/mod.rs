#![allow(dead_code)]

use pacs008_pix::application::pipeline::Pacs008Pipeline;
use pacs008_pix::domain::request::PaymentRequest;
use pacs008_pix::infrastructure::keystore::{KeystoreConfig, SigningMaterial, load_signing_material};
use rand::Rng;
use rand::seq::SliceRandom;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::path::{Path, PathBuf};

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

pub fn keystore_dir() -> PathBuf {
    fixtures_dir().join("keystore")
}

pub fn keystore_config() -> KeystoreConfig {
    KeystoreConfig {
        path: keystore_dir(),
        alias: "spi-signer".to_string(),
        ..Default::default()
    }
}

pub fn signing_material() -> SigningMaterial {
    load_signing_material(&keystore_config()).unwrap()
}

pub fn pipeline() -> Pacs008Pipeline {
    Pacs008Pipeline::with_material(&signing_material()).unwrap()
}

/// Payer at ISPB 12345678 paying 150.25 to a receiver at 87654321.
pub fn sample_request() -> PaymentRequest {
    PaymentRequest {
        payer_name: "Maria Silva".to_string(),
        payer_tax_id: "12345678901".to_string(),
        payer_ispb: "12345678".to_string(),
        payer_agency: "0001".to_string(),
        payer_account: "123456".to_string(),
        payer_account_type: "CACC".to_string(),
        receiver_name: "Joao Souza".to_string(),
        receiver_tax_id: "98765432000199".to_string(),
        receiver_ispb: "87654321".to_string(),
        receiver_agency: "0002".to_string(),
        receiver_account: "654321".to_string(),
        receiver_account_type: "SVGS".to_string(),
        receiver_pix_key: Some("joao@example.com".to_string()),
        amount: Some(dec!(150.25)),
        description: "Pedido 42".to_string(),
        ..Default::default()
    }
}

fn digits(rng: &mut impl Rng, len: usize) -> String {
    (0..len)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// A valid request with randomized institutions, accounts and amount.
pub fn random_request(rng: &mut impl Rng) -> PaymentRequest {
    let account_types = ["CACC", "SLRY", "SVGS", "TRAN"];
    let tax_len = if rng.gen_bool(0.5) { 11 } else { 14 };
    let account_len = rng.gen_range(1..=20);
    PaymentRequest {
        payer_ispb: digits(rng, 8),
        payer_tax_id: digits(rng, tax_len),
        payer_agency: digits(rng, 4),
        payer_account: digits(rng, account_len),
        payer_account_type: account_types.choose(rng).unwrap().to_string(),
        receiver_ispb: digits(rng, 8),
        receiver_account_type: account_types.choose(rng).unwrap().to_string(),
        amount: Some(Decimal::new(rng.gen_range(1..10_000_000), 2)),
        ..sample_request()
    }
}

/// Writes `request` as the JSON body the CLI expects.
pub fn write_request_json(path: &Path, request: &PaymentRequest) {
    let body = serde_json::json!({
        "payerName": request.payer_name,
        "payerCpfCnpj": request.payer_tax_id,
        "payerIspb": request.payer_ispb,
        "payerAgency": request.payer_agency,
        "payerAccount": request.payer_account,
        "payerAccountType": request.payer_account_type,
        "receiverName": request.receiver_name,
        "receiverCpfCnpj": request.receiver_tax_id,
        "receiverIspb": request.receiver_ispb,
        "receiverAgency": request.receiver_agency,
        "receiverAccount": request.receiver_account,
        "receiverAccountType": request.receiver_account_type,
        "receiverPixKey": request.receiver_pix_key,
        "amount": request.amount.map(|a| a.to_string()),
        "description": request.description,
    });
    std::fs::write(path, body.to_string()).unwrap();
}
