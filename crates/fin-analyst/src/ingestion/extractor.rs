//! PDF to markdown + page segments

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

use crate::error::{Error, Result};

/// Kind of a page segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Text,
    Table,
}

impl SegmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentKind::Text => "text",
            SegmentKind::Table => "table",
        }
    }
}

/// A block of content from one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Page number (1-indexed)
    pub page: u32,
    /// Segment text; tables are rendered as markdown
    pub content: String,
    pub kind: SegmentKind,
}

/// A table detected on a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableBlock {
    /// Page number (1-indexed)
    pub page: u32,
    /// Cell text, row by row
    pub rows: Vec<Vec<String>>,
}

impl TableBlock {
    /// Render as a markdown pipe table, first row as header
    pub fn to_markdown(&self) -> String {
        let width = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut out = String::new();

        for (i, row) in self.rows.iter().enumerate() {
            let cells: Vec<&str> = (0..width)
                .map(|c| row.get(c).map(String::as_str).unwrap_or(""))
                .collect();
            out.push_str("| ");
            out.push_str(&cells.join(" | "));
            out.push_str(" |\n");

            if i == 0 {
                out.push('|');
                out.push_str(&" --- |".repeat(width));
                out.push('\n');
            }
        }

        out.trim_end().to_string()
    }
}

/// Conversion output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    /// Whole document as markdown
    pub markdown: String,
    /// Tables found on any page
    pub tables: Vec<TableBlock>,
    /// Per-page segments in page order
    pub segments: Vec<Segment>,
    /// Number of pages in the PDF
    pub page_count: u32,
}

/// Converts a document file into normalized text and segments
pub trait DocumentExtractor: Send + Sync {
    /// Convert the file at `path`
    fn convert(&self, path: &Path) -> Result<ExtractedDocument>;

    /// Get extractor name for logging
    fn name(&self) -> &str;
}

/// PDF extractor backed by lopdf, with pdf-extract as a whole-file fallback
#[derive(Debug, Default, Clone)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract raw text per page with lopdf
    fn extract_pages(path: &Path, filename: &str) -> Result<Vec<(u32, String)>> {
        let doc = lopdf::Document::load(path)
            .map_err(|e| Error::extraction(filename, format!("Failed to load PDF: {}", e)))?;

        let mut pages = Vec::new();
        for (page_num, _page_id) in doc.get_pages() {
            match doc.extract_text(&[page_num]) {
                Ok(text) => pages.push((page_num, text)),
                Err(e) => {
                    tracing::debug!("Could not extract text for page {}: {}", page_num, e);
                    pages.push((page_num, String::new()));
                }
            }
        }

        if pages.is_empty() {
            return Err(Error::extraction(filename, "PDF has no pages"));
        }

        Ok(pages)
    }

    /// Assemble the extraction result from cleaned page texts
    pub fn assemble(pages: &[(u32, String)]) -> ExtractedDocument {
        let mut result = ExtractedDocument {
            page_count: pages.len() as u32,
            ..Default::default()
        };
        let mut markdown = Vec::new();

        for (page, raw) in pages {
            let text = cleanup_pdf_text(raw);
            let blocks = split_blocks(&text);
            if blocks.is_empty() {
                continue;
            }

            markdown.push(format!("## Page {}", page));

            for block in blocks {
                if let Some(rows) = detect_table(&block) {
                    let table = TableBlock { page: *page, rows };
                    let rendered = table.to_markdown();
                    markdown.push(rendered.clone());
                    result.segments.push(Segment {
                        page: *page,
                        content: rendered,
                        kind: SegmentKind::Table,
                    });
                    result.tables.push(table);
                } else {
                    markdown.push(block.clone());
                    result.segments.push(Segment {
                        page: *page,
                        content: block,
                        kind: SegmentKind::Text,
                    });
                }
            }
        }

        result.markdown = markdown.join("\n\n");
        result
    }
}

impl DocumentExtractor for PdfExtractor {
    fn convert(&self, path: &Path) -> Result<ExtractedDocument> {
        let filename = path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| "document.pdf".to_string());

        let mut pages = Self::extract_pages(path, &filename)?;

        if pages.iter().all(|(_, text)| text.trim().is_empty()) {
            tracing::warn!("lopdf produced no text for {}, trying pdf-extract", filename);
            let text = pdf_extract::extract_text(path)
                .map_err(|e| Error::extraction(&filename, format!("pdf-extract failed: {}", e)))?;
            pages = vec![(1, text)];
        }

        let page_count = pages.len() as u32;
        let mut extracted = Self::assemble(&pages);
        extracted.page_count = extracted.page_count.max(page_count);

        if extracted.markdown.trim().is_empty() {
            return Err(Error::extraction(
                filename,
                "PDF appears to be image-based or has no extractable text",
            ));
        }

        tracing::info!(
            "Extracted {} pages, {} segments, {} tables",
            extracted.page_count,
            extracted.segments.len(),
            extracted.tables.len()
        );

        Ok(extracted)
    }

    fn name(&self) -> &str {
        "lopdf"
    }
}

/// Replace glyph artifacts, ligatures and typographic characters left by PDF fonts
pub fn cleanup_pdf_text(text: &str) -> String {
    const REPLACEMENTS: &[(&str, &str)] = &[
        ("\0", ""),
        ("\r\n", "\n"),
        ("\r", "\n"),
        ("\u{00A0}", " "),
        ("\u{2010}", "-"),
        ("\u{2011}", "-"),
        ("\u{2012}", "-"),
        ("\u{2013}", "-"),
        ("\u{2014}", "--"),
        ("\u{2212}", "-"),
        ("\u{2018}", "'"),
        ("\u{2019}", "'"),
        ("\u{201C}", "\""),
        ("\u{201D}", "\""),
        ("\u{2022}", "* "),
        ("\u{2026}", "..."),
        ("\u{FB00}", "ff"),
        ("\u{FB01}", "fi"),
        ("\u{FB02}", "fl"),
        ("\u{FB03}", "ffi"),
        ("\u{FB04}", "ffl"),
    ];

    let mut result = text.to_string();
    for (from, to) in REPLACEMENTS {
        result = result.replace(from, to);
    }

    result
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split page text into blank-line separated blocks
fn split_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current.join("\n"));
    }

    blocks
}

fn column_separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\t+| {2,}").expect("valid regex"))
}

fn numeric_cell() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\(?-?(?:Rp|IDR|USD|\$|€|£)?\s?\d[\d.,]*%?\)?$").expect("valid regex")
    })
}

fn split_cells(line: &str) -> Vec<String> {
    column_separator()
        .split(line.trim())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// A block is a table when most of its lines have two or more columns and at least one cell is numeric
fn detect_table(block: &str) -> Option<Vec<Vec<String>>> {
    let rows: Vec<Vec<String>> = block.lines().map(split_cells).collect();
    if rows.len() < 2 {
        return None;
    }

    let columnar = rows.iter().filter(|r| r.len() >= 2).count();
    if columnar * 10 < rows.len() * 6 {
        return None;
    }

    let has_numbers = rows
        .iter()
        .flatten()
        .any(|cell| numeric_cell().is_match(cell));
    if !has_numbers {
        return None;
    }

    Some(rows.into_iter().filter(|r| !r.is_empty()).collect())
}
