use super::{
    ENVELOPED_SIGNATURE_TRANSFORM, RSA_SHA256_ALGORITHM, SHA256_ALGORITHM, SIGNATURE_ELEMENT,
    XMLDSIG_NAMESPACE, decode_base64, enveloped_canonical_form, parse_document, sha256,
};
use crate::error::{Pacs008Error, Result};
use crate::infrastructure::xml::{C14N_ALGORITHM, Element, ElementPath, canonicalize_subtree};
use rsa::RsaPublicKey;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::signature::Verifier;
use sha2::Sha256;
use tracing::debug;
use x509_cert::Certificate;
use x509_cert::der::Decode;

/// Checks the single enveloped signature of `xml` against `public_key`.
///
/// Only the profile produced by [`super::SignatureEngine`] is accepted: any
/// other canonicalization, digest, signature algorithm or transform list is
/// rejected before any cryptography runs.
pub fn verify(xml: &[u8], public_key: &RsaPublicKey) -> Result<()> {
    let root = parse_document(xml)?;
    let signature_path = single_signature(&root)?;
    let signature = element_at(&root, &signature_path)?;

    let signed_info_index = signature
        .child_index("SignedInfo")
        .ok_or_else(|| Pacs008Error::signature("SignedInfo missing"))?;
    let signed_info = child(signature, "SignedInfo")?;
    check_algorithm(signed_info, "CanonicalizationMethod", C14N_ALGORITHM)?;
    check_algorithm(signed_info, "SignatureMethod", RSA_SHA256_ALGORITHM)?;

    let references: Vec<&Element> = signed_info
        .elements()
        .filter(|e| e.local_name() == "Reference")
        .collect();
    let [reference] = references.as_slice() else {
        return Err(Pacs008Error::signature(format!(
            "expected one Reference, found {}",
            references.len()
        )));
    };
    if reference.attribute("URI") != Some("") {
        return Err(Pacs008Error::signature("Reference must cover the whole document"));
    }
    let transforms: Vec<Option<&str>> = child(reference, "Transforms")?
        .elements()
        .map(|t| t.attribute("Algorithm"))
        .collect();
    if transforms != [Some(ENVELOPED_SIGNATURE_TRANSFORM)] {
        return Err(Pacs008Error::signature("unsupported Transforms"));
    }
    check_algorithm(reference, "DigestMethod", SHA256_ALGORITHM)?;

    let expected_digest = decode_base64("DigestValue", &child(reference, "DigestValue")?.text())?;
    if sha256(&enveloped_canonical_form(&root)) != expected_digest {
        return Err(Pacs008Error::signature("digest mismatch"));
    }

    let value = decode_base64("SignatureValue", &child(signature, "SignatureValue")?.text())?;
    let value = Signature::try_from(value.as_slice())
        .map_err(|e| Pacs008Error::signature(format!("malformed SignatureValue: {e}")))?;

    let mut signed_info_path = signature_path;
    signed_info_path.push(signed_info_index);
    let canonical_signed_info = canonicalize_subtree(&root, &signed_info_path)
        .map_err(|e| Pacs008Error::signature(e.to_string()))?;
    VerifyingKey::<Sha256>::new(public_key.clone())
        .verify(canonical_signed_info.as_bytes(), &value)
        .map_err(|_| Pacs008Error::signature("signature value does not match"))?;

    debug!("signature verified");
    Ok(())
}

/// The X.509 certificate carried in the signature's `KeyInfo`.
pub fn embedded_certificate(xml: &[u8]) -> Result<Certificate> {
    let root = parse_document(xml)?;
    let signature = element_at(&root, &single_signature(&root)?)?;
    let encoded = child(signature, "KeyInfo")
        .and_then(|key_info| child(key_info, "X509Data"))
        .and_then(|data| child(data, "X509Certificate"))?
        .text();
    let der = decode_base64("X509Certificate", &encoded)?;
    Certificate::from_der(&der)
        .map_err(|e| Pacs008Error::signature(format!("invalid embedded certificate: {e}")))
}

fn single_signature(root: &Element) -> Result<ElementPath> {
    let mut found = root.find_all(XMLDSIG_NAMESPACE, SIGNATURE_ELEMENT);
    match found.len() {
        1 => Ok(found.remove(0)),
        0 => Err(Pacs008Error::signature("document is not signed")),
        n => Err(Pacs008Error::signature(format!(
            "expected one signature, found {n}"
        ))),
    }
}

fn element_at<'a>(root: &'a Element, path: &[usize]) -> Result<&'a Element> {
    root.at_path(path)
        .ok_or_else(|| Pacs008Error::signature("signature element vanished"))
}

fn child<'a>(parent: &'a Element, local_name: &str) -> Result<&'a Element> {
    parent
        .child(local_name)
        .ok_or_else(|| Pacs008Error::signature(format!("{local_name} missing")))
}

fn check_algorithm(parent: &Element, local_name: &str, expected: &str) -> Result<()> {
    match child(parent, local_name)?.attribute("Algorithm") {
        Some(algorithm) if algorithm == expected => Ok(()),
        other => Err(Pacs008Error::signature(format!(
            "unsupported {local_name} {}",
            other.unwrap_or("(none)")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::keystore::{KeystoreConfig, SigningMaterial, load_signing_material};
    use crate::infrastructure::serializer::HEADER_NAMESPACE;
    use crate::infrastructure::signature::SignatureEngine;
    use std::path::PathBuf;

    fn material(alias: &str) -> SigningMaterial {
        load_signing_material(&KeystoreConfig {
            path: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/keystore"),
            alias: alias.to_string(),
            password: Some("changeit".to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    fn signed() -> (String, SigningMaterial) {
        let material = material("spi-signer");
        let xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Envelope xmlns=\"urn:test\">\n  \
             <AppHdr xmlns=\"{HEADER_NAMESPACE}\"><Sgntr/></AppHdr>\n  <Amt>10.00</Amt>\n</Envelope>"
        );
        let signed = SignatureEngine::new(&material)
            .unwrap()
            .sign(xml.as_bytes())
            .unwrap();
        (String::from_utf8(signed).unwrap(), material)
    }

    #[test]
    fn test_tampered_content_fails() {
        let (xml, material) = signed();
        let tampered = xml.replace("10.00", "99.00");
        let err = verify(tampered.as_bytes(), &material.public_key()).unwrap_err();
        assert!(err.to_string().contains("digest mismatch"));
    }

    #[test]
    fn test_tampered_signed_info_fails() {
        let (xml, material) = signed();
        let tampered = xml.replace("<Reference URI=\"\">", "<Reference URI=\"\" Id=\"r\">");
        let err = verify(tampered.as_bytes(), &material.public_key()).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_wrong_key_fails() {
        use rsa::RsaPrivateKey;
        use rsa::pkcs8::DecodePrivateKey;

        let (xml, _) = signed();
        let pem = std::fs::read_to_string(
            PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/keystore/mismatched.key.pem"),
        )
        .unwrap();
        let stranger = RsaPrivateKey::from_pkcs8_pem(&pem).unwrap();
        let err = verify(xml.as_bytes(), &RsaPublicKey::from(&stranger)).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_unsupported_algorithm_rejected() {
        let (xml, material) = signed();
        let tampered = xml.replace(RSA_SHA256_ALGORITHM, "http://www.w3.org/2000/09/xmldsig#rsa-sha1");
        let err = verify(tampered.as_bytes(), &material.public_key()).unwrap_err();
        assert!(err.to_string().contains("unsupported SignatureMethod"));
    }

    #[test]
    fn test_unsigned_document_rejected() {
        let (_, material) = signed();
        let err = verify(b"<Envelope/>", &material.public_key()).unwrap_err();
        assert!(err.to_string().contains("not signed"));
    }

    #[test]
    fn test_embedded_certificate_matches_signer() {
        let (xml, material) = signed();
        let certificate = embedded_certificate(xml.as_bytes()).unwrap();
        assert_eq!(&certificate, material.certificate());
    }
}
