mod common;

use common::{pipeline, sample_request, signing_material};
use pacs008_pix::infrastructure::serializer::DOCUMENT_NAMESPACE;
use pacs008_pix::infrastructure::signature::{XMLDSIG_NAMESPACE, verify};
use pacs008_pix::infrastructure::xml::{self, Element};
use std::collections::HashSet;
use std::sync::Arc;

fn text_at(root: &Element, namespace: &str, local_name: &str) -> Vec<String> {
    root.find_all(namespace, local_name)
        .iter()
        .map(|path| root.at_path(path).unwrap().text())
        .collect()
}

#[test]
fn test_end_to_end_signed_payment() {
    let material = signing_material();
    let message = pipeline().process(&sample_request()).unwrap();
    verify(message.xml.as_bytes(), &material.public_key()).unwrap();

    let root = xml::parse(message.xml.as_bytes()).unwrap();
    assert_eq!(text_at(&root, DOCUMENT_NAMESPACE, "NbOfTxs"), vec!["1"]);
    assert_eq!(text_at(&root, DOCUMENT_NAMESPACE, "IntrBkSttlmAmt"), vec!["150.25"]);

    let tx = root
        .child("Document")
        .and_then(|d| d.child("FIToFICstmrCdtTrf"))
        .and_then(|d| d.child("CdtTrfTxInf"))
        .unwrap();
    let agent_ispb = |tag: &str| {
        tx.child(tag)
            .and_then(|a| a.child("FinInstnId"))
            .and_then(|f| f.child("ClrSysMmbId"))
            .and_then(|c| c.child("MmbId"))
            .unwrap()
            .text()
    };
    assert_eq!(agent_ispb("DbtrAgt"), "12345678");
    assert_eq!(agent_ispb("CdtrAgt"), "87654321");

    let signature_values = text_at(&root, XMLDSIG_NAMESPACE, "SignatureValue");
    assert_eq!(signature_values.len(), 1);
    assert!(!signature_values[0].trim().is_empty());

    assert!(message.message_id.as_str().starts_with("M12345678"));
    assert!(message.end_to_end_id.as_str().starts_with("E12345678"));
    assert_eq!(text_at(&root, DOCUMENT_NAMESPACE, "MsgId"), vec![message.message_id.to_string()]);
}

#[test]
fn test_header_routes_to_operator() {
    let message = pipeline().process(&sample_request()).unwrap();
    let root = xml::parse(message.xml.as_bytes()).unwrap();
    let header = root.child("AppHdr").unwrap();
    let member = |tag: &str| {
        header
            .child(tag)
            .and_then(|e| e.child("FIId"))
            .and_then(|e| e.child("FinInstnId"))
            .and_then(|e| e.child("ClrSysMmbId"))
            .and_then(|e| e.child("MmbId"))
            .unwrap()
            .text()
    };
    assert_eq!(member("Fr"), "12345678");
    assert_eq!(member("To"), "00000000");
    assert_eq!(header.child("MsgDefIdr").unwrap().text(), "pacs.008.spi.1.13");
    assert_eq!(
        header.child("BizMsgIdr").unwrap().text(),
        message.message_id.to_string()
    );
}

#[test]
fn test_concurrent_callers_share_one_pipeline() {
    let pipeline = Arc::new(pipeline());
    let public_key = signing_material().public_key();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pipeline = Arc::clone(&pipeline);
            std::thread::spawn(move || {
                (0..4)
                    .map(|_| pipeline.process(&sample_request()).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        for message in handle.join().unwrap() {
            verify(message.xml.as_bytes(), &public_key).unwrap();
            assert!(ids.insert(message.message_id));
        }
    }
    assert_eq!(ids.len(), 32);
}
