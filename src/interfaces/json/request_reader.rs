use crate::domain::request::PaymentRequest;
use crate::error::{Pacs008Error, Result};
use std::io::Read;

/// Reads payment requests from a JSON source.
///
/// The source holds one request object or several concatenated ones
/// (newline-delimited JSON works). Decoding stops at the first malformed
/// value, since the stream position after it is unknown.
pub struct RequestReader<R: Read> {
    source: R,
}

impl<R: Read> RequestReader<R> {
    /// Creates a new `RequestReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        Self { source }
    }

    /// Returns an iterator that lazily decodes requests.
    pub fn requests(self) -> impl Iterator<Item = Result<PaymentRequest>> {
        serde_json::Deserializer::from_reader(self.source)
            .into_iter::<PaymentRequest>()
            .map(|result| result.map_err(Pacs008Error::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reader_valid_stream() {
        let data = r#"{"payerIspb": "12345678", "amount": "1.00"}
{"payerIspb": "87654321", "amount": 2.5}"#;
        let reader = RequestReader::new(data.as_bytes());
        let results: Vec<Result<PaymentRequest>> = reader.requests().collect();

        assert_eq!(results.len(), 2);
        let first = results[0].as_ref().unwrap();
        assert_eq!(first.payer_ispb, "12345678");
        assert_eq!(first.amount, Some(dec!(1.00)));
        assert_eq!(results[1].as_ref().unwrap().amount, Some(dec!(2.5)));
    }

    #[test]
    fn test_reader_malformed_value() {
        let data = r#"{"payerIspb": "12345678"} {"amount": [1]} {"payerIspb": "1"}"#;
        let reader = RequestReader::new(data.as_bytes());
        let results: Vec<Result<PaymentRequest>> = reader.requests().collect();

        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(Pacs008Error::JsonError(_))));
        assert_eq!(results.len(), 2);
    }
}
