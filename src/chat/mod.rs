//! Streaming chat ingestion
//!
//! One exchange drives one request/response cycle against the chat backend,
//! folding arriving text chunks into a single growing assistant message.

pub mod decoder;
pub mod exchange;
pub mod stream;

pub use decoder::ChunkDecoder;
pub use exchange::{CancelToken, ChatExchange, ExchangePhase};
pub use stream::ReplyStream;
