pub mod document;
pub mod text_block;

pub use document::{ConfigDocument, DocumentElement};
pub use text_block::{ParsedRecord, TextBlockParser, convert};
