use lopdf::Document;
use tracing::debug;

use crate::error::Error;

/// Loads a PDF from memory, decrypting it with `password` when the document
/// is encrypted, and returns the text of all pages. Each page's text is
/// preceded by a newline.
pub fn extract_text(bytes: &[u8], password: &str) -> Result<String, Error> {
    let mut document = Document::load_mem(bytes)?;
    if document.is_encrypted() {
        debug!("decrypting statement");
        document.decrypt(password)?;
    }

    let mut text = String::new();
    for page_number in document.get_pages().keys() {
        text.push('\n');
        text.push_str(&document.extract_text(&[*page_number])?);
    }
    debug!(pages = document.get_pages().len(), chars = text.len(), "extracted text");
    Ok(text)
}
