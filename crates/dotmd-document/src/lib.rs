pub mod chunker;
pub mod frontmatter;
pub mod reader;
pub mod tokens;

pub use chunker::{Chunker, ChunkerConfig};
pub use frontmatter::split_frontmatter;
pub use reader::{DiscoveredFile, Reader};
pub use tokens::{TokenCounter, WhitespaceTokenCounter};
