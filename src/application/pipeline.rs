use crate::application::builder::MessageBuilder;
use crate::domain::identifiers::{EndToEndId, IdentifierGenerator, MessageId};
use crate::domain::ports::{MessagePublisher, PublishAck};
use crate::domain::request::PaymentRequest;
use crate::error::{Pacs008Error, Result};
use crate::infrastructure::keystore::SigningMaterial;
use crate::infrastructure::serializer::XmlSerializer;
use crate::infrastructure::signature::SignatureEngine;
use tracing::{info, warn};

/// A signed pacs.008 message ready to be handed to the SPI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedMessage {
    pub message_id: MessageId,
    pub end_to_end_id: EndToEndId,
    pub xml: String,
}

/// The main entry point for turning payment requests into signed messages.
///
/// `Pacs008Pipeline` runs build, serialize and sign in that order, with no
/// retries; the first failure is returned unchanged. It holds no per-call
/// state, so a single instance behind an `Arc` serves any number of
/// concurrent callers.
pub struct Pacs008Pipeline {
    builder: MessageBuilder,
    serializer: XmlSerializer,
    signer: SignatureEngine,
}

impl Pacs008Pipeline {
    /// Creates a pipeline from its three stages.
    ///
    /// # Arguments
    ///
    /// * `builder` - Validates requests and assigns identifiers.
    /// * `serializer` - Renders the message model as XML.
    /// * `signer` - Fills the header signature placeholder.
    pub fn new(builder: MessageBuilder, serializer: XmlSerializer, signer: SignatureEngine) -> Self {
        Self {
            builder,
            serializer,
            signer,
        }
    }

    /// A pipeline with default builder and serializer, signing with `material`.
    pub fn with_material(material: &SigningMaterial) -> Result<Self> {
        Ok(Self::new(
            MessageBuilder::new(IdentifierGenerator::new()),
            XmlSerializer::new(),
            SignatureEngine::new(material)?,
        ))
    }

    pub fn process(&self, request: &PaymentRequest) -> Result<SignedMessage> {
        let envelope = self.builder.build(request).inspect_err(|e| {
            warn!(error = %e, "payment request rejected");
        })?;
        let unsigned = self.serializer.serialize(&envelope)?;
        let signed = self.signer.sign(&unsigned)?;
        let xml = String::from_utf8(signed)
            .map_err(|e| Pacs008Error::SerializationError(e.to_string()))?;

        let message = SignedMessage {
            message_id: envelope.message_id().clone(),
            end_to_end_id: envelope.end_to_end_id().clone(),
            xml,
        };
        info!(
            message_id = %message.message_id,
            end_to_end_id = %message.end_to_end_id,
            "pacs.008 signed"
        );
        Ok(message)
    }

    /// Processes `request` and hands the signed XML, unchanged, to `publisher`.
    pub async fn dispatch(
        &self,
        request: &PaymentRequest,
        publisher: &dyn MessagePublisher,
        destination: &str,
    ) -> Result<(SignedMessage, PublishAck)> {
        let message = self.process(request)?;
        let ack = publisher
            .publish(&message.xml, destination)
            .await
            .map_err(|e| match e {
                Pacs008Error::TransportError(_) => e,
                other => Pacs008Error::TransportError(other.to_string()),
            })?;
        info!(
            message_id = %message.message_id,
            destination = %ack.destination,
            receipt = %ack.receipt,
            "pacs.008 published"
        );
        Ok((message, ack))
    }
}
