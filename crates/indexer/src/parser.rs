//! Extension-dispatched text extraction.

use crate::error::{IndexerError, Result};
use crate::hash::content_hash;
use log::{debug, warn};
use recall_chunker::{Document, DocumentMetadata};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Extracts plain text from one file format.
///
/// Handlers are synchronous and run on the blocking pool.
pub trait FormatHandler: Send + Sync {
    fn name(&self) -> &str;

    fn extract(&self, path: &Path, bytes: &[u8]) -> Result<String>;
}

/// UTF-8 text (lossy), line endings normalized, every line newline-terminated.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextHandler;

impl FormatHandler for TextHandler {
    fn name(&self) -> &str {
        "text"
    }

    fn extract(&self, _path: &Path, bytes: &[u8]) -> Result<String> {
        let raw = String::from_utf8_lossy(bytes);
        let normalized = raw.replace("\r\n", "\n").replace('\r', "\n");
        let mut text = String::with_capacity(normalized.len() + 1);
        for line in normalized.lines() {
            text.push_str(line);
            text.push('\n');
        }
        Ok(text)
    }
}

/// Per-page PDF text; unreadable pages are skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfHandler;

impl FormatHandler for PdfHandler {
    fn name(&self) -> &str {
        "pdf"
    }

    fn extract(&self, path: &Path, bytes: &[u8]) -> Result<String> {
        let doc = lopdf::Document::load_mem(bytes).map_err(|e| IndexerError::parse(path, e))?;

        let mut pages = Vec::new();
        for (page_num, _) in doc.get_pages() {
            match doc.extract_text(&[page_num]) {
                Ok(text) => pages.push(text),
                Err(e) => warn!(
                    "Skipping page {page_num} of {}: {e}",
                    path.display()
                ),
            }
        }
        debug!("Extracted {} pages from {}", pages.len(), path.display());
        Ok(pages.join("\n"))
    }
}

/// Lower-cased extension with a leading dot, or `None` when the path has none.
pub fn normalized_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
}

/// Handlers keyed by normalized extension
#[derive(Clone, Default)]
pub struct ParserRegistry {
    handlers: HashMap<String, Arc<dyn FormatHandler>>,
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut extensions = self.extensions();
        extensions.sort();
        f.debug_struct("ParserRegistry")
            .field("extensions", &extensions)
            .finish()
    }
}

impl ParserRegistry {
    /// Registry with no handlers.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// `.txt`, `.md` and `.pdf`.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        let text: Arc<dyn FormatHandler> = Arc::new(TextHandler);
        registry.register(".txt", Arc::clone(&text));
        registry.register(".md", text);
        registry.register(".pdf", Arc::new(PdfHandler));
        registry
    }

    /// Register (or replace) the handler for `extension`, with or without the dot.
    pub fn register(&mut self, extension: &str, handler: Arc<dyn FormatHandler>) {
        let key = format!(".{}", extension.trim_start_matches('.').to_lowercase());
        self.handlers.insert(key, handler);
    }

    pub fn supports(&self, path: &Path) -> bool {
        normalized_extension(path).is_some_and(|ext| self.handlers.contains_key(&ext))
    }

    pub fn extensions(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    /// Read, fingerprint and extract `path` into a [`Document`].
    pub async fn parse_document(&self, path: &Path) -> Result<Document> {
        let extension = normalized_extension(path)
            .ok_or_else(|| IndexerError::UnsupportedFormat(path.display().to_string()))?;
        let handler = self
            .handlers
            .get(&extension)
            .cloned()
            .ok_or_else(|| IndexerError::UnsupportedFormat(extension.clone()))?;

        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || parse_blocking(&path, &extension, handler.as_ref()))
            .await
            .map_err(IndexerError::join)?
    }
}

fn parse_blocking(path: &Path, extension: &str, handler: &dyn FormatHandler) -> Result<Document> {
    let mod_time = std::fs::metadata(path)?.modified()?;
    let bytes = std::fs::read(path)?;
    let hash = content_hash(&bytes);

    let content = handler.extract(path, &bytes)?;
    if content.trim().is_empty() {
        return Err(IndexerError::EmptyInput(format!(
            "no text extracted from {}",
            path.display()
        )));
    }
    debug!(
        "Parsed {} with {} handler ({} bytes)",
        path.display(),
        handler.name(),
        bytes.len()
    );

    let metadata = DocumentMetadata {
        file_name: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        extension: extension.to_string(),
        size_bytes: bytes.len() as u64,
    };
    Ok(Document::new(path, content, hash, mod_time, metadata))
}
