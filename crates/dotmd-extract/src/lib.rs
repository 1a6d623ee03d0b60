pub mod ner;
pub mod structural;

pub use ner::{DisabledNerBackend, Mention, NerBackend, NerExtractor};
pub use structural::{frontmatter_edges, StructuralExtractor};
