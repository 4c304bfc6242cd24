//! Upload → extract → chunk → index

use sha2::{Digest, Sha256};
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::chunker::TextChunker;
use super::extractor::{DocumentExtractor, ExtractedDocument, PdfExtractor, SegmentKind};
use crate::config::AppConfig;
use crate::conversation::ReadyState;
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::retrieval::FlatIndex;
use crate::types::document::{META_PAGE, META_SOURCE, META_TYPE};
use crate::types::{Document, FinancialSummary};

/// Type tag carried by every page segment document
pub const FINANCIAL_DATA_TYPE: &str = "financial_data";
/// Metadata key for text/table segment kind
pub const META_SEGMENT_KIND: &str = "segment_kind";
/// Metadata key for the SHA-256 of the uploaded bytes
pub const META_CONTENT_HASH: &str = "content_hash";

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Turns an uploaded PDF into a searchable [`ReadyState`]
pub struct IngestPipeline {
    extractor: Arc<dyn DocumentExtractor>,
    chunker: TextChunker,
    embed_batch_size: usize,
    extraction_timeout: Duration,
}

impl IngestPipeline {
    pub fn new(
        extractor: Arc<dyn DocumentExtractor>,
        chunker: TextChunker,
        embed_batch_size: usize,
        extraction_timeout: Duration,
    ) -> Self {
        Self {
            extractor,
            chunker,
            embed_batch_size,
            extraction_timeout,
        }
    }

    /// Pipeline with the PDF extractor and configured chunking
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            Arc::new(PdfExtractor::new()),
            TextChunker::from_config(&config.chunking)?,
            config.retrieval.embed_batch_size,
            Duration::from_secs(config.extraction.timeout_secs),
        ))
    }

    /// Reject anything that is not a non-empty PDF
    pub fn validate_upload(filename: &str, content_type: Option<&str>, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(Error::Upload(format!("'{}' is empty", filename)));
        }

        let guessed = mime_guess::from_path(filename).first_or_octet_stream();
        if guessed.essence_str() != "application/pdf" {
            return Err(Error::UnsupportedFileType(format!(
                "'{}' is not a PDF ({})",
                filename, guessed
            )));
        }

        if let Some(declared) = content_type {
            let essence = declared.split(';').next().unwrap_or("").trim();
            if essence != "application/pdf" && essence != "application/octet-stream" {
                return Err(Error::UnsupportedFileType(format!(
                    "'{}' was sent as {}",
                    filename, essence
                )));
            }
        }

        if !data.starts_with(PDF_MAGIC) {
            return Err(Error::UnsupportedFileType(format!(
                "'{}' does not start with a PDF header",
                filename
            )));
        }

        Ok(())
    }

    /// Write the upload to a temp file and run the extractor off the async runtime
    pub async fn extract(&self, filename: &str, data: &[u8]) -> Result<ExtractedDocument> {
        let mut file = tempfile::Builder::new()
            .prefix("fin-analyst-")
            .suffix(".pdf")
            .tempfile()?;
        file.write_all(data)?;
        file.flush()?;

        let extractor = Arc::clone(&self.extractor);
        // the temp file moves into the task and is removed when it finishes
        let handle = tokio::task::spawn_blocking(move || {
            let result = extractor.convert(file.path());
            drop(file);
            result
        });

        let result = match tokio::time::timeout(self.extraction_timeout, handle).await {
            Ok(Ok(result)) => result,
            // pdf parsers panic on some malformed fonts and streams
            Ok(Err(e)) if e.is_panic() => {
                tracing::warn!("Extractor {} panicked on '{}'", self.extractor.name(), filename);
                return Err(Error::extraction(
                    filename,
                    "the PDF could not be parsed; please upload it again or try another file",
                ));
            }
            Ok(Err(e)) => return Err(Error::internal(format!("Extraction task failed: {}", e))),
            Err(_) => {
                return Err(Error::extraction(
                    filename,
                    format!(
                        "extraction timed out after {}s",
                        self.extraction_timeout.as_secs()
                    ),
                ))
            }
        };

        // report the upload name rather than the temp file name
        result.map_err(|e| match e {
            Error::Extraction { message, .. } => Error::extraction(filename, message),
            other => other,
        })
    }

    /// Whole-document markdown plus one document per page segment
    pub fn build_documents(filename: &str, extracted: &ExtractedDocument, data: &[u8]) -> Vec<Document> {
        let content_hash = hex::encode(Sha256::digest(data));

        let mut documents = Vec::with_capacity(extracted.segments.len() + 1);
        documents.push(
            Document::new(extracted.markdown.clone())
                .with_metadata(META_SOURCE, filename)
                .with_metadata(META_CONTENT_HASH, content_hash),
        );

        for segment in &extracted.segments {
            documents.push(
                Document::new(segment.content.clone())
                    .with_metadata(META_SOURCE, filename)
                    .with_metadata(META_PAGE, segment.page)
                    .with_metadata(META_TYPE, FINANCIAL_DATA_TYPE)
                    .with_metadata(META_SEGMENT_KIND, segment.kind.as_str()),
            );
        }

        documents
    }

    /// Counts shown next to the chat
    pub fn summarize(extracted: &ExtractedDocument) -> FinancialSummary {
        FinancialSummary {
            tables: extracted.tables.len(),
            text_segments: extracted
                .segments
                .iter()
                .filter(|s| s.kind == SegmentKind::Text)
                .count(),
            pages: extracted.page_count,
            characters: extracted.markdown.chars().count(),
        }
    }

    /// Run the full pipeline for one upload
    ///
    /// Nothing is installed on failure; the caller swaps the result into the
    /// session only when every stage succeeded.
    pub async fn process(
        &self,
        filename: &str,
        content_type: Option<&str>,
        data: &[u8],
        embedder: &dyn EmbeddingProvider,
    ) -> Result<ReadyState> {
        let start = Instant::now();
        Self::validate_upload(filename, content_type, data)?;

        tracing::info!("Processing '{}' ({} bytes)", filename, data.len());

        let extracted = self.extract(filename, data).await?;
        let summary = Self::summarize(&extracted);
        let documents = Self::build_documents(filename, &extracted, data);

        let chunks = self.chunker.chunk_documents(&documents);
        let chunk_count = chunks.len();
        tracing::info!(
            "Created {} documents and {} chunks from '{}'",
            documents.len(),
            chunk_count,
            filename
        );

        let index = FlatIndex::build(chunks, embedder, self.embed_batch_size).await?;

        tracing::info!(
            "Finished '{}' in {:.1}s ({} pages, {} tables)",
            filename,
            start.elapsed().as_secs_f64(),
            summary.pages,
            summary.tables
        );

        Ok(ReadyState {
            index: Arc::new(index),
            documents,
            summary,
            filename: filename.to_string(),
            chunk_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::extractor::{Segment, TableBlock};
    use crate::testing::{minimal_pdf, FailingEmbedder, KeywordEmbedder};
    use std::path::Path;

    /// Extractor returning a fixed result without touching the file
    struct CannedExtractor(ExtractedDocument);

    impl DocumentExtractor for CannedExtractor {
        fn convert(&self, path: &Path) -> Result<ExtractedDocument> {
            assert!(path.exists());
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    struct SlowExtractor;

    impl DocumentExtractor for SlowExtractor {
        fn convert(&self, _path: &Path) -> Result<ExtractedDocument> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(ExtractedDocument::default())
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    struct PanickingExtractor;

    impl DocumentExtractor for PanickingExtractor {
        fn convert(&self, _path: &Path) -> Result<ExtractedDocument> {
            panic!("unsupported font encoding");
        }

        fn name(&self) -> &str {
            "panicking"
        }
    }

    fn canned() -> ExtractedDocument {
        let table = TableBlock {
            page: 2,
            rows: vec![
                vec!["Item".into(), "2023".into()],
                vec!["Revenue".into(), "5,000".into()],
            ],
        };
        ExtractedDocument {
            markdown: "## Page 1\n\nAnnual report\n\n## Page 2\n\n| Item | 2023 |".into(),
            segments: vec![
                Segment {
                    page: 1,
                    content: "Annual report".into(),
                    kind: SegmentKind::Text,
                },
                Segment {
                    page: 2,
                    content: table.to_markdown(),
                    kind: SegmentKind::Table,
                },
            ],
            tables: vec![table],
            page_count: 2,
        }
    }

    fn pipeline(extractor: Arc<dyn DocumentExtractor>) -> IngestPipeline {
        IngestPipeline::new(
            extractor,
            TextChunker::new(2000, 400).unwrap(),
            16,
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_validate_upload() {
        let pdf = b"%PDF-1.7\n...";
        assert!(IngestPipeline::validate_upload("report.pdf", None, pdf).is_ok());
        assert!(IngestPipeline::validate_upload("REPORT.PDF", Some("application/pdf"), pdf).is_ok());

        assert!(matches!(
            IngestPipeline::validate_upload("report.docx", None, pdf),
            Err(Error::UnsupportedFileType(_))
        ));
        assert!(matches!(
            IngestPipeline::validate_upload("report.pdf", Some("text/html"), pdf),
            Err(Error::UnsupportedFileType(_))
        ));
        assert!(matches!(
            IngestPipeline::validate_upload("report.pdf", None, b"<html>"),
            Err(Error::UnsupportedFileType(_))
        ));
        assert!(matches!(
            IngestPipeline::validate_upload("report.pdf", None, b""),
            Err(Error::Upload(_))
        ));
    }

    #[test]
    fn test_build_documents_and_summary() {
        let extracted = canned();
        let docs = IngestPipeline::build_documents("annual.pdf", &extracted, b"%PDF-1.4");

        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].content, extracted.markdown);
        assert_eq!(docs[0].source(), Some("annual.pdf"));
        assert_eq!(
            docs[0].metadata[META_CONTENT_HASH].as_str().map(str::len),
            Some(64)
        );
        assert_eq!(docs[2].metadata[META_PAGE], 2);
        assert_eq!(docs[2].metadata[META_TYPE], FINANCIAL_DATA_TYPE);
        assert_eq!(docs[2].metadata[META_SEGMENT_KIND], "table");

        let summary = IngestPipeline::summarize(&extracted);
        assert_eq!(summary.tables, 1);
        assert_eq!(summary.text_segments, 1);
        assert_eq!(summary.pages, 2);
    }

    #[tokio::test]
    async fn test_process_builds_ready_state() {
        let pipeline = pipeline(Arc::new(CannedExtractor(canned())));

        let ready = pipeline
            .process("annual.pdf", None, b"%PDF-1.4 fake", &KeywordEmbedder)
            .await
            .unwrap();

        assert_eq!(ready.filename, "annual.pdf");
        assert_eq!(ready.documents.len(), 3);
        assert_eq!(ready.chunk_count, 3);
        assert_eq!(ready.index.len(), 3);

        let hits = ready.index.query(&KeywordEmbedder, "revenue", 1).await.unwrap();
        assert_eq!(hits[0].chunk.page(), Some(2));
    }

    #[tokio::test]
    async fn test_embedding_failure_aborts() {
        let pipeline = pipeline(Arc::new(CannedExtractor(canned())));

        let err = pipeline
            .process("annual.pdf", None, b"%PDF-1.4 fake", &FailingEmbedder)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Indexing(_)));
    }

    #[tokio::test]
    async fn test_extraction_timeout() {
        let pipeline = IngestPipeline::new(
            Arc::new(SlowExtractor),
            TextChunker::new(2000, 400).unwrap(),
            16,
            Duration::from_millis(20),
        );

        let err = pipeline.extract("slow.pdf", b"%PDF-1.4").await.unwrap_err();
        assert!(matches!(err, Error::Extraction { ref filename, .. } if filename == "slow.pdf"));
    }

    #[tokio::test]
    async fn test_extractor_panic_is_extraction_error() {
        let pipeline = pipeline(Arc::new(PanickingExtractor));

        let err = pipeline
            .process("odd-fonts.pdf", None, b"%PDF-1.4 fake", &KeywordEmbedder)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Extraction { ref filename, .. } if filename == "odd-fonts.pdf"));
        assert_eq!(err.kind(), "extraction_error");

        // the pipeline stays usable after a panicking upload
        let ok = IngestPipeline::new(
            Arc::new(CannedExtractor(canned())),
            TextChunker::new(2000, 400).unwrap(),
            16,
            Duration::from_secs(5),
        );
        assert!(ok.process("annual.pdf", None, b"%PDF-1.4 fake", &KeywordEmbedder).await.is_ok());
    }

    #[tokio::test]
    async fn test_corrupt_pdf_reports_upload_name() {
        let pipeline = pipeline(Arc::new(PdfExtractor::new()));

        let err = pipeline
            .process("broken.pdf", None, b"%PDF-1.4 not really", &KeywordEmbedder)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Extraction { ref filename, .. } if filename == "broken.pdf"));
    }

    #[tokio::test]
    async fn test_real_pdf_round_trip() {
        let pipeline = pipeline(Arc::new(PdfExtractor::new()));
        let bytes = minimal_pdf("Revenue 5000\nNet profit 1200");

        let ready = pipeline
            .process("laporan.pdf", Some("application/pdf"), &bytes, &KeywordEmbedder)
            .await
            .unwrap();

        assert_eq!(ready.summary.pages, 1);
        assert!(ready.chunk_count >= 2);
        assert!(ready.documents[0].content.contains("Revenue"));
    }
}
