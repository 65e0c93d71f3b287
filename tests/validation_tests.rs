mod common;

use common::{pipeline, sample_request};
use pacs008_pix::domain::request::PaymentRequest;
use pacs008_pix::error::Pacs008Error;
use rust_decimal_macros::dec;

fn rejected_field(request: &PaymentRequest) -> &'static str {
    match pipeline().process(request) {
        Err(Pacs008Error::ValidationError { field, .. }) => field,
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[test]
fn test_invalid_requests_fail_before_signing() {
    let cases: Vec<(&str, Box<dyn Fn(&mut PaymentRequest)>)> = vec![
        ("payer_ispb", Box::new(|r| r.payer_ispb = "1234567A".to_string())),
        ("receiver_ispb", Box::new(|r| r.receiver_ispb = "123".to_string())),
        ("amount", Box::new(|r| r.amount = Some(dec!(0)))),
        ("amount", Box::new(|r| r.amount = Some(dec!(-5.00)))),
        ("amount", Box::new(|r| r.amount = Some(dec!(1.001)))),
        ("amount", Box::new(|r| r.amount = None)),
        ("payer_account_type", Box::new(|r| r.payer_account_type = "XXXX".to_string())),
        ("receiver_account_type", Box::new(|r| r.receiver_account_type = String::new())),
        ("payer_tax_id", Box::new(|r| r.payer_tax_id = "123".to_string())),
        ("receiver_tax_id", Box::new(|r| r.receiver_tax_id = "abcdefghijk".to_string())),
        ("payer_name", Box::new(|r| r.payer_name = "   ".to_string())),
        ("payer_agency", Box::new(|r| r.payer_agency = "12345".to_string())),
        ("receiver_account", Box::new(|r| r.receiver_account = "12-34".to_string())),
        ("description", Box::new(|r| r.description = "x".repeat(141))),
        ("priority", Box::new(|r| r.priority = Some("URGT".to_string()))),
        ("local_instrument", Box::new(|r| r.local_instrument = Some("ABCD".to_string()))),
        ("description", Box::new(|r| r.description = "bell\u{7}".to_string())),
        ("payer_name", Box::new(|r| r.payer_name = "Ana\u{1}Lima".to_string())),
        ("receiver_name", Box::new(|r| r.receiver_name = "Bruno\u{FFFF}".to_string())),
        ("receiver_pix_key", Box::new(|r| r.receiver_pix_key = Some("a\u{0}@x.com".to_string()))),
    ];

    for (field, mutate) in cases {
        let mut request = sample_request();
        mutate(&mut request);
        assert_eq!(rejected_field(&request), field);
    }
}

#[test]
fn test_validation_message_names_the_field() {
    let mut request = sample_request();
    request.payer_ispb = "ABCDEFGH".to_string();
    let err = pipeline().process(&request).unwrap_err();
    assert!(err.to_string().contains("payer_ispb"));
}

#[test]
fn test_optional_overrides_reach_the_document() {
    let mut request = sample_request();
    request.priority = Some("NORM".to_string());
    request.local_instrument = Some("DICT".to_string());
    request.transaction_id = Some("TX42".to_string());

    let xml = pipeline().process(&request).unwrap().xml;
    assert!(xml.contains("<InstrPrty>NORM</InstrPrty>"));
    assert!(xml.contains("<Prtry>DICT</Prtry>"));
    assert!(xml.contains("<TxId>TX42</TxId>"));
}
