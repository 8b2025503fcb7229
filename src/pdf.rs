//! Page-level text extraction from uploaded PDFs.

use lopdf::{Dictionary, Document};
use thiserror::Error;

use crate::rag::types::{Passage, PassageMetadata, UNKNOWN_AUTHOR, UNTITLED};

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("could not read PDF: {0}")]
    Parse(String),
}

/// Document-level info shared by every page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    pub title: String,
    pub author: String,
}

impl Default for DocumentInfo {
    fn default() -> Self {
        Self {
            title: UNTITLED.to_string(),
            author: UNKNOWN_AUTHOR.to_string(),
        }
    }
}

/// Parses `bytes` and returns one passage per non-blank page.
///
/// Page numbers are the 1-based positions in the original document, so
/// skipped blank pages leave gaps.
pub fn extract_document(bytes: &[u8], file_name: &str) -> Result<Vec<Passage>, PdfError> {
    let doc = Document::load_mem(bytes).map_err(|e| PdfError::Parse(e.to_string()))?;
    let info = document_info(&doc);

    let mut page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    page_numbers.sort_unstable();

    let pages = page_numbers.into_iter().map(|page_num| {
        let text = doc.extract_text(&[page_num]).unwrap_or_else(|err| {
            tracing::debug!("No text layer on page {} of {}: {}", page_num, file_name, err);
            String::new()
        });
        (page_num, text)
    });

    Ok(build_passages(file_name, &info, pages))
}

/// Strips any directory part from an uploaded file name.
pub fn base_name(file_name: &str) -> &str {
    file_name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(file_name)
}

pub(crate) fn build_passages(
    file_name: &str,
    info: &DocumentInfo,
    pages: impl IntoIterator<Item = (u32, String)>,
) -> Vec<Passage> {
    let file_name = base_name(file_name);
    pages
        .into_iter()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(page_num, text)| {
            Passage::new(
                text,
                PassageMetadata {
                    file_name: file_name.to_string(),
                    page_num,
                    author: info.author.clone(),
                    title: info.title.clone(),
                },
            )
        })
        .collect()
}

fn document_info(doc: &Document) -> DocumentInfo {
    let mut info = DocumentInfo::default();

    let dict = match doc
        .trailer
        .get(b"Info")
        .and_then(|obj| obj.as_reference())
        .and_then(|id| doc.get_dictionary(id))
    {
        Ok(dict) => dict,
        Err(_) => return info,
    };

    if let Some(title) = info_string(dict, b"Title") {
        info.title = title;
    }
    if let Some(author) = info_string(dict, b"Author") {
        info.author = author;
    }
    info
}

fn info_string(dict: &Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key)
        .ok()
        .and_then(|v| v.as_str().ok())
        .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string())
        .filter(|s| !s.is_empty())
}
