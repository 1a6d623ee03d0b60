pub mod cross_encoder;
pub mod embedding;
pub mod ner_backend;
pub mod pooling;

pub use cross_encoder::{CrossEncoder, OnnxCrossEncoder};
pub use embedding::{Embedder, OnnxEmbedder, TokenizerCounter};
pub use ner_backend::OnnxNerBackend;
