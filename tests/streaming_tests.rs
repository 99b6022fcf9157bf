use tenderdesk::chat::{ChunkDecoder, ReplyStream};
use tenderdesk::errors::AppError;

// Delivering a multi-byte text one byte at a time must reproduce it exactly,
// no matter where the transport happens to split codepoints.
#[test]
fn test_decoder_survives_byte_at_a_time_delivery() {
    let text = "Délai de soumission: 1er juin 2024 (UTC). 金額: 150k";
    let mut decoder = ChunkDecoder::new();
    let mut rebuilt = String::new();

    for byte in text.as_bytes() {
        rebuilt.push_str(&decoder.feed(std::slice::from_ref(byte)).unwrap());
    }
    decoder.finish().unwrap();

    assert_eq!(rebuilt, text);
}

#[test]
fn test_decoder_rejects_invalid_bytes() {
    let mut decoder = ChunkDecoder::new();
    // 0xFF can never start a UTF-8 sequence.
    let err = decoder.feed(&[b'o', b'k', 0xFF]).unwrap_err();
    assert!(matches!(err, AppError::ChatTransport(_)));
}

#[test]
fn test_decoder_finish_flags_truncated_codepoint() {
    let mut decoder = ChunkDecoder::new();
    // First byte of a three-byte sequence, never completed.
    assert_eq!(decoder.feed(&[0xE4]).unwrap(), "");
    assert!(decoder.finish().is_err());
}

#[tokio::test]
async fn test_reply_stream_preserves_chunk_order_and_content() {
    let chunks: Vec<&[u8]> = vec![b"The deadline ", b"is ", b"June 1st."];
    let mut stream = ReplyStream::new(futures::stream::iter(
        chunks
            .into_iter()
            .map(|c| Ok(bytes::Bytes::copy_from_slice(c)))
            .collect::<Vec<Result<bytes::Bytes, reqwest::Error>>>(),
    ));

    let mut seen = Vec::new();
    while let Some(chunk) = stream.next_chunk().await.unwrap() {
        seen.push(chunk);
    }
    assert_eq!(seen, vec!["The deadline ", "is ", "June 1st."]);
}

#[tokio::test]
async fn test_empty_reply_stream_yields_nothing() {
    let mut stream = ReplyStream::new(futures::stream::iter(
        Vec::<Result<bytes::Bytes, reqwest::Error>>::new(),
    ));
    assert_eq!(stream.next_chunk().await.unwrap(), None);
    assert_eq!(stream.collect_text().await.unwrap(), "");
}

#[tokio::test]
async fn test_failed_stream_keeps_already_delivered_text() {
    // A transport error without a server: a request that cannot even be
    // built yields a real reqwest::Error.
    let req_err = reqwest::Client::new().get("not a url").build().unwrap_err();
    let mut stream = ReplyStream::new(futures::stream::iter(vec![
        Ok(bytes::Bytes::from_static(b"partial answer")),
        Err(req_err),
    ]));

    let first = stream.next_chunk().await.unwrap();
    assert_eq!(first.as_deref(), Some("partial answer"));

    assert!(stream.next_chunk().await.is_err());
    // After the failure the stream is terminally exhausted.
    assert_eq!(stream.next_chunk().await.unwrap(), None);
}
