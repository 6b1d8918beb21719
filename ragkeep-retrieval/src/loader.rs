use std::io::{Cursor, Read};
use std::path::Path;

use pulldown_cmark::{Event as MdEvent, Parser, TagEnd};
use quick_xml::events::Event as XmlEvent;
use quick_xml::Reader;

use crate::IngestError;

/// File formats the ingestion path knows how to turn into text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Text,
    Markdown,
    Docx,
    Pdf,
}

impl FileKind {
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let extension = Path::new(file_name)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        match extension.as_str() {
            "txt" => Some(Self::Text),
            "md" | "markdown" => Some(Self::Markdown),
            "docx" => Some(Self::Docx),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

/// Converts raw file bytes into plain text, paragraphs separated by blank lines.
pub fn extract_text(kind: FileKind, file_name: &str, bytes: &[u8]) -> Result<String, IngestError> {
    if bytes.is_empty() {
        return Err(IngestError::EmptyFile {
            file_name: file_name.to_string(),
        });
    }
    let conversion = |message: String| IngestError::Conversion {
        file_name: file_name.to_string(),
        message,
    };
    match kind {
        FileKind::Text => Ok(String::from_utf8_lossy(bytes).into_owned()),
        FileKind::Markdown => Ok(markdown_to_text(&String::from_utf8_lossy(bytes))),
        FileKind::Docx => docx_to_text(bytes).map_err(conversion),
        FileKind::Pdf => pdf_to_text(bytes).map_err(conversion),
    }
}

fn markdown_to_text(markdown: &str) -> String {
    let mut out = String::new();
    for event in Parser::new(markdown) {
        match event {
            MdEvent::Text(text) | MdEvent::Code(text) => out.push_str(&text),
            MdEvent::SoftBreak => out.push(' '),
            MdEvent::HardBreak => out.push('\n'),
            MdEvent::End(
                TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::CodeBlock,
            ) => out.push_str("\n\n"),
            _ => {}
        }
    }
    out.trim_end().to_string()
}

fn docx_to_text(bytes: &[u8]) -> Result<String, String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|err| err.to_string())?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|err| err.to_string())?
        .read_to_string(&mut xml)
        .map_err(|err| err.to_string())?;

    let mut reader = Reader::from_str(&xml);
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    loop {
        match reader.read_event().map_err(|err| err.to_string())? {
            XmlEvent::Start(tag) if tag.name().as_ref() == b"w:t" => in_text = true,
            XmlEvent::End(tag) => match tag.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    let paragraph = std::mem::take(&mut current);
                    if !paragraph.trim().is_empty() {
                        paragraphs.push(paragraph.trim().to_string());
                    }
                }
                _ => {}
            },
            XmlEvent::Empty(tag) => match tag.name().as_ref() {
                b"w:tab" => current.push('\t'),
                b"w:br" => current.push('\n'),
                _ => {}
            },
            XmlEvent::Text(text) if in_text => {
                current.push_str(&text.decode().map_err(|err| err.to_string())?);
            }
            XmlEvent::GeneralRef(entity) if in_text => {
                let name = entity.decode().map_err(|err| err.to_string())?;
                current.push_str(predefined_entity(&name));
            }
            XmlEvent::Eof => break,
            _ => {}
        }
    }
    Ok(paragraphs.join("\n\n"))
}

fn predefined_entity(name: &str) -> &str {
    match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        _ => "",
    }
}

#[cfg(feature = "pdf")]
fn pdf_to_text(bytes: &[u8]) -> Result<String, String> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|err| err.to_string())
}

#[cfg(not(feature = "pdf"))]
fn pdf_to_text(_bytes: &[u8]) -> Result<String, String> {
    Err("pdf feature disabled".to_string())
}
