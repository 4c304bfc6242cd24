//! PDF ingestion: extraction, chunking and index construction

mod chunker;
mod extractor;
mod pipeline;

pub use chunker::TextChunker;
pub use extractor::{
    cleanup_pdf_text, DocumentExtractor, ExtractedDocument, PdfExtractor, Segment, SegmentKind,
    TableBlock,
};
pub use pipeline::{IngestPipeline, FINANCIAL_DATA_TYPE, META_CONTENT_HASH, META_SEGMENT_KIND};
