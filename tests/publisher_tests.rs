mod common;

use common::{pipeline, random_request, sample_request, signing_material};
use pacs008_pix::domain::ports::MessagePublisherBox;
use pacs008_pix::error::Pacs008Error;
use pacs008_pix::infrastructure::in_memory::InMemoryPublisher;
use pacs008_pix::infrastructure::signature::verify;
use pacs008_pix::infrastructure::spool::SpoolDirectoryPublisher;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::tempdir;

#[tokio::test]
async fn test_spooled_message_is_the_signed_xml() {
    let dir = tempdir().unwrap();
    let publisher: MessagePublisherBox = Box::new(SpoolDirectoryPublisher::new(dir.path()));

    let (message, ack) = pipeline()
        .dispatch(&sample_request(), publisher.as_ref(), "pix-out")
        .await
        .unwrap();

    let path = dir.path().join("pix-out").join(format!("{}.xml", ack.receipt));
    let spooled = tokio::fs::read_to_string(path).await.unwrap();
    assert_eq!(spooled, message.xml);
    verify(spooled.as_bytes(), &signing_material().public_key()).unwrap();
}

#[tokio::test]
async fn test_publishers_are_interchangeable() {
    let dir = tempdir().unwrap();
    let memory = InMemoryPublisher::new();
    let publishers: Vec<MessagePublisherBox> = vec![
        Box::new(memory.clone()),
        Box::new(SpoolDirectoryPublisher::new(dir.path())),
    ];
    let pipeline = pipeline();
    let mut rng = StdRng::seed_from_u64(99);

    for publisher in &publishers {
        for _ in 0..3 {
            pipeline
                .dispatch(&random_request(&mut rng), publisher.as_ref(), "QR.PIX")
                .await
                .unwrap();
        }
    }

    assert_eq!(memory.published().await.len(), 3);
    assert_eq!(std::fs::read_dir(dir.path().join("QR.PIX")).unwrap().count(), 3);
}

#[tokio::test]
async fn test_invalid_request_never_reaches_the_publisher() {
    let memory = InMemoryPublisher::new();
    let mut request = sample_request();
    request.amount = None;

    let err = pipeline()
        .dispatch(&request, &memory, "QR.PIX")
        .await
        .unwrap_err();
    assert!(matches!(err, Pacs008Error::ValidationError { field: "amount", .. }));
    assert!(memory.published().await.is_empty());
}

#[tokio::test]
async fn test_spool_failure_is_a_transport_error() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "file in the way").unwrap();
    let publisher = SpoolDirectoryPublisher::new(&blocker);

    let err = pipeline()
        .dispatch(&sample_request(), &publisher, "pix-out")
        .await
        .unwrap_err();
    assert!(matches!(err, Pacs008Error::TransportError(_)));
}
