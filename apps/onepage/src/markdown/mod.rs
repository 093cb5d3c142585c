// Stage 1: Markdown source → ordered blocks, plus inline span splitting used by the renderer.

pub mod inline;
pub mod parser;

pub use parser::{parse, read_document, Block, BlockKind, Document};
