use super::{
    ENVELOPED_SIGNATURE_TRANSFORM, RSA_SHA256_ALGORITHM, SHA256_ALGORITHM, SIGNATURE_ELEMENT,
    XMLDSIG_NAMESPACE, encode_base64, enveloped_canonical_form, parse_document, sha256,
};
use crate::error::{Pacs008Error, Result};
use crate::infrastructure::keystore::SigningMaterial;
use crate::infrastructure::serializer::{HEADER_NAMESPACE, SIGNATURE_PLACEHOLDER};
use crate::infrastructure::xml::{
    self, C14N_ALGORITHM, CanonicalBytes, Element, ElementPath, Node, canonicalize_subtree,
};
use rsa::pkcs1v15::SigningKey;
use rand::rngs::OsRng;
use rsa::signature::{RandomizedSigner, SignatureEncoding};
use sha2::Sha256;
use tracing::debug;

/// Inserts an enveloped XMLDSig signature into the `Sgntr` placeholder of
/// a serialized message.
///
/// Every call walks the same states, each a distinct type below:
/// `Unsigned -> Canonicalized -> Digested -> Signed`. Nothing survives a
/// failed call, and the engine itself is immutable, so one instance can be
/// shared across threads.
pub struct SignatureEngine {
    signing_key: SigningKey<Sha256>,
    key_info: Element,
}

impl SignatureEngine {
    pub fn new(material: &SigningMaterial) -> Result<Self> {
        let key_info = Element::new("KeyInfo").with_child(
            Element::new("X509Data")
                .with_child(Element::leaf("X509SubjectName", material.subject_name()))
                .with_child(Element::leaf(
                    "X509Certificate",
                    encode_base64(&material.certificate_der()?),
                )),
        );
        Ok(Self {
            signing_key: SigningKey::<Sha256>::new(material.private_key().clone()),
            key_info,
        })
    }

    pub fn sign(&self, xml: &[u8]) -> Result<Vec<u8>> {
        Unsigned::parse(xml)?
            .canonicalize()
            .digest()
            .sign(&self.signing_key, &self.key_info)?
            .into_bytes()
    }
}

struct Unsigned {
    root: Element,
    placeholder: ElementPath,
}

struct Canonicalized {
    root: Element,
    placeholder: ElementPath,
    canonical: CanonicalBytes,
}

struct Digested {
    root: Element,
    placeholder: ElementPath,
    digest: Vec<u8>,
}

struct Signed {
    root: Element,
}

impl Unsigned {
    fn parse(xml: &[u8]) -> Result<Self> {
        let root = parse_document(xml)?;
        let mut candidates = root.find_all(HEADER_NAMESPACE, SIGNATURE_PLACEHOLDER);
        let placeholder = match candidates.len() {
            0 => return Err(Pacs008Error::signature("placeholder not found")),
            1 => candidates.remove(0),
            n => {
                return Err(Pacs008Error::signature(format!(
                    "ambiguous placeholder: {n} `{SIGNATURE_PLACEHOLDER}` elements"
                )));
            }
        };

        let populated = root
            .at_path(&placeholder)
            .is_some_and(|e| e.has_element_children() || !e.text().trim().is_empty());
        if populated {
            return Err(Pacs008Error::signature("placeholder already populated"));
        }

        debug!(?placeholder, "located signature placeholder");
        Ok(Self { root, placeholder })
    }

    fn canonicalize(self) -> Canonicalized {
        let canonical = enveloped_canonical_form(&self.root);
        debug!(bytes = canonical.as_bytes().len(), "canonicalized document");
        Canonicalized {
            root: self.root,
            placeholder: self.placeholder,
            canonical,
        }
    }
}

impl Canonicalized {
    fn digest(self) -> Digested {
        Digested {
            digest: sha256(&self.canonical),
            root: self.root,
            placeholder: self.placeholder,
        }
    }
}

impl Digested {
    fn sign(self, key: &SigningKey<Sha256>, key_info: &Element) -> Result<Signed> {
        let Self {
            mut root,
            placeholder,
            digest,
        } = self;

        let signature = Element::new(SIGNATURE_ELEMENT)
            .with_attribute("xmlns", XMLDSIG_NAMESPACE)
            .with_child(signed_info(&encode_base64(&digest)))
            .with_child(Element::new("SignatureValue"))
            .with_child(key_info.clone());

        let slot = root
            .at_path_mut(&placeholder)
            .ok_or_else(|| Pacs008Error::signature("placeholder not found"))?;
        let mut signature_path = placeholder.clone();
        signature_path.push(slot.children.len());
        slot.push(signature);

        // SignedInfo is canonicalized in place so it picks up the namespaces
        // a verifier will see around it.
        let mut signed_info_path = signature_path.clone();
        signed_info_path.push(0);
        let canonical_signed_info = canonicalize_subtree(&root, &signed_info_path)
            .map_err(|e| Pacs008Error::signature(e.to_string()))?;
        // The RNG only blinds the private-key operation; the signature is deterministic.
        let value = key
            .try_sign_with_rng(&mut OsRng, canonical_signed_info.as_bytes())
            .map_err(|e| Pacs008Error::signature(format!("RSA signing failed: {e}")))?;

        signature_path.push(1);
        let signature_value = root
            .at_path_mut(&signature_path)
            .ok_or_else(|| Pacs008Error::signature("SignatureValue missing"))?;
        signature_value.children = vec![Node::Text(encode_base64(&value.to_bytes()))];

        debug!("signature inserted");
        Ok(Signed { root })
    }
}

impl Signed {
    fn into_bytes(self) -> Result<Vec<u8>> {
        xml::write(&self.root, false).map_err(|e| Pacs008Error::SerializationError(e.to_string()))
    }
}

fn signed_info(digest_value: &str) -> Element {
    Element::new("SignedInfo")
        .with_child(Element::new("CanonicalizationMethod").with_attribute("Algorithm", C14N_ALGORITHM))
        .with_child(Element::new("SignatureMethod").with_attribute("Algorithm", RSA_SHA256_ALGORITHM))
        .with_child(
            Element::new("Reference")
                .with_attribute("URI", "")
                .with_child(
                    Element::new("Transforms").with_child(
                        Element::new("Transform")
                            .with_attribute("Algorithm", ENVELOPED_SIGNATURE_TRANSFORM),
                    ),
                )
                .with_child(Element::new("DigestMethod").with_attribute("Algorithm", SHA256_ALGORITHM))
                .with_child(Element::leaf("DigestValue", digest_value)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::keystore::{KeystoreConfig, load_signing_material};
    use crate::infrastructure::signature::verify;
    use std::path::PathBuf;

    fn material() -> SigningMaterial {
        load_signing_material(&KeystoreConfig {
            path: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/keystore"),
            alias: "spi-signer".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    fn message(header_body: &str) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <Envelope xmlns=\"urn:test\">\n  \
             <AppHdr xmlns=\"{HEADER_NAMESPACE}\">\n    <BizMsgIdr>M1</BizMsgIdr>\n    {header_body}\n  </AppHdr>\n  \
             <Body>payload</Body>\n</Envelope>"
        )
    }

    #[test]
    fn test_signs_placeholder_and_verifies() {
        let material = material();
        let engine = SignatureEngine::new(&material).unwrap();
        let signed = engine.sign(message("<Sgntr/>").as_bytes()).unwrap();
        let text = String::from_utf8(signed.clone()).unwrap();

        assert!(text.contains(&format!("<Sgntr><Signature xmlns=\"{XMLDSIG_NAMESPACE}\">")));
        assert!(text.contains("<Reference URI=\"\">"));
        assert!(text.contains("CN=12345678.spi.test"));
        assert!(text.contains("<Body>payload</Body>"));
        verify(&signed, &material.public_key()).unwrap();
    }

    #[test]
    fn test_signing_is_deterministic() {
        let engine = SignatureEngine::new(&material()).unwrap();
        let xml = message("<Sgntr/>");
        assert_eq!(
            engine.sign(xml.as_bytes()).unwrap(),
            engine.sign(xml.as_bytes()).unwrap()
        );
    }

    #[test]
    fn test_placeholder_errors() {
        let engine = SignatureEngine::new(&material()).unwrap();

        let err = engine.sign(message("").as_bytes()).unwrap_err();
        assert!(err.to_string().contains("placeholder not found"));

        let err = engine.sign(message("<Sgntr/><Sgntr/>").as_bytes()).unwrap_err();
        assert!(err.to_string().contains("ambiguous placeholder"));

        let err = engine.sign(message("<Sgntr><X/></Sgntr>").as_bytes()).unwrap_err();
        assert!(err.to_string().contains("already populated"));
    }

    #[test]
    fn test_placeholder_in_other_namespace_is_ignored() {
        let engine = SignatureEngine::new(&material()).unwrap();
        let err = engine
            .sign(message("<Sgntr xmlns=\"urn:elsewhere\"/>").as_bytes())
            .unwrap_err();
        assert!(err.to_string().contains("placeholder not found"));
    }

    #[test]
    fn test_malformed_input_is_a_signature_error() {
        let engine = SignatureEngine::new(&material()).unwrap();
        assert!(matches!(
            engine.sign(b"<Envelope><AppHdr>"),
            Err(Pacs008Error::SignatureError(_))
        ));
    }
}
