//! Binary-to-text extraction for page- and paragraph-structured documents.
//!
//! Both extractors sit behind traits so hosts can swap in their own parsers
//! (OCR, a different PDF backend) without touching the normalizer.

use anyhow::{anyhow, Context, Result};
use lopdf::Document;
use std::io::{Cursor, Read};

/// Produces the text of every page of a page-structured document, in order.
pub trait PageExtractor: Send + Sync {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>>;
}

/// Produces the text of every paragraph of a paragraph-structured document,
/// in order, including empty paragraphs.
pub trait ParagraphExtractor: Send + Sync {
    fn extract_paragraphs(&self, bytes: &[u8]) -> Result<Vec<String>>;
}

/// PDF pages via lopdf's content stream parsing, with pdf_extract as a
/// whole-document fallback when lopdf cannot load the file.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfPageExtractor;

impl PageExtractor for PdfPageExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>> {
        match Document::load_mem(bytes) {
            Ok(doc) => {
                let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
                let mut pages = Vec::with_capacity(page_numbers.len());
                for number in page_numbers {
                    let text = doc.extract_text(&[number]).unwrap_or_else(|e| {
                        tracing::debug!(page = number, "lopdf page text failed: {}", e);
                        String::new()
                    });
                    pages.push(text);
                }
                Ok(pages)
            }
            Err(lopdf_err) => {
                tracing::debug!("lopdf load failed ({}), trying pdf_extract", lopdf_err);
                let owned = bytes.to_vec();
                // pdf_extract panics on some malformed inputs
                let text = std::panic::catch_unwind(move || pdf_extract::extract_text_from_mem(&owned))
                    .map_err(|_| anyhow!("PDF parser aborted on malformed input"))?
                    .map_err(|e| anyhow!("Failed to extract PDF text: {:?}", e))?;
                Ok(text.split('\u{c}').map(str::to_string).collect())
            }
        }
    }
}

/// DOCX paragraphs read from `word/document.xml` inside the zip container.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocxParagraphExtractor;

impl ParagraphExtractor for DocxParagraphExtractor {
    fn extract_paragraphs(&self, bytes: &[u8]) -> Result<Vec<String>> {
        let mut archive =
            zip::ZipArchive::new(Cursor::new(bytes)).context("Failed to read DOCX as ZIP")?;

        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .context("DOCX missing word/document.xml")?
            .read_to_string(&mut xml)
            .context("Failed to read document.xml from DOCX")?;

        Ok(docx_paragraphs(&xml))
    }
}

/// Split WordprocessingML into paragraph texts by collecting the `<w:t>` runs
/// of each `<w:p>` element. Self-closing `<w:p/>` yields an empty paragraph.
fn docx_paragraphs(xml: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut pos = 0;

    while let Some(start) = find_element(xml, pos, "w:p") {
        let Some(open_end) = xml[start..].find('>').map(|e| start + e) else {
            break;
        };

        if xml[..open_end].ends_with('/') {
            paragraphs.push(String::new());
            pos = open_end + 1;
            continue;
        }

        let body_start = open_end + 1;
        let end = xml[body_start..]
            .find("</w:p>")
            .map(|e| body_start + e)
            .unwrap_or(xml.len());

        paragraphs.push(paragraph_text(&xml[body_start..end]));
        pos = (end + "</w:p>".len()).min(xml.len());
    }

    paragraphs
}

fn paragraph_text(body: &str) -> String {
    let mut text = String::new();
    let mut pos = 0;

    while let Some(start) = find_element(body, pos, "w:t") {
        let Some(open_end) = body[start..].find('>').map(|e| start + e) else {
            break;
        };
        if body[..open_end].ends_with('/') {
            pos = open_end + 1;
            continue;
        }
        let content_start = open_end + 1;
        match body[content_start..].find("</w:t>") {
            Some(len) => {
                text.push_str(&decode_entities(&body[content_start..content_start + len]));
                pos = content_start + len + "</w:t>".len();
            }
            None => break,
        }
    }

    text
}

/// Position of the next `<name>`, `<name ...>` or `<name/>` at or after `from`.
/// Longer names sharing the prefix (`<w:pPr>`, `<w:tab/>`) are skipped.
fn find_element(xml: &str, from: usize, name: &str) -> Option<usize> {
    let needle = format!("<{}", name);
    let mut pos = from;
    while let Some(found) = xml[pos..].find(&needle) {
        let at = pos + found;
        let after = at + needle.len();
        match xml[after..].chars().next() {
            Some('>') | Some('/') | Some(' ') | Some('\t') | Some('\n') | Some('\r') => {
                return Some(at)
            }
            _ => pos = after,
        }
    }
    None
}

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    pub(crate) fn docx_bytes(body: &str) -> Vec<u8> {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        );
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/document.xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_docx_paragraphs_keep_empty_ones() {
        let bytes = docx_bytes(
            r#"<w:p><w:pPr><w:pStyle w:val="Title"/></w:pPr><w:r><w:t>Prescription</w:t></w:r></w:p><w:p/><w:p><w:r><w:t xml:space="preserve">Take </w:t></w:r><w:r><w:tab/><w:t>twice daily</w:t></w:r></w:p><w:p></w:p>"#,
        );
        let paragraphs = DocxParagraphExtractor.extract_paragraphs(&bytes).unwrap();
        assert_eq!(paragraphs, vec!["Prescription", "", "Take twice daily", ""]);
    }

    #[test]
    fn test_docx_entities_decoded() {
        let paragraphs = docx_paragraphs("<w:p><w:r><w:t>Salt &amp; water &lt;1g&gt;</w:t></w:r></w:p>");
        assert_eq!(paragraphs, vec!["Salt & water <1g>"]);
    }

    #[test]
    fn test_docx_without_document_xml() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("other.xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<x/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let err = DocxParagraphExtractor.extract_paragraphs(&bytes).unwrap_err();
        assert!(format!("{:#}", err).contains("word/document.xml"));
    }

    #[test]
    fn test_docx_not_a_zip() {
        assert!(DocxParagraphExtractor.extract_paragraphs(b"plain text").is_err());
    }

    /// Two-page PDF: the first page says `text`, the second is blank.
    pub(crate) fn pdf_bytes(text: &str) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Object, Stream};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let written = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let blank = Content { operations: vec![] };

        let mut kids = Vec::new();
        for content in [written, blank] {
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::from(page_id));
        }

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => 2,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_pdf_pages_in_order_with_blank_page() {
        let pages = PdfPageExtractor.extract_pages(&pdf_bytes("Hello World")).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].trim(), "Hello World");
        assert!(pages[1].trim().is_empty());
    }

    #[test]
    fn test_pdf_garbage_is_an_error() {
        assert!(PdfPageExtractor.extract_pages(b"%PDF-garbage").is_err());
    }

    #[test]
    fn test_find_element_skips_longer_names() {
        let xml = "<w:pPr/><w:proofErr/><w:p>";
        assert_eq!(find_element(xml, 0, "w:p"), Some(21));
    }
}
