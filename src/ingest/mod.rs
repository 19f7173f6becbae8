pub mod extractor;
pub mod pipeline;
pub mod splitter;

pub use extractor::{DocumentExtractor, PageText, PdfTextExtractor};
pub use pipeline::{IngestPipeline, IngestReport};
pub use splitter::RecursiveSplitter;
