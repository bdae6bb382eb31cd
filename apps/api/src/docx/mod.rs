//! Minimal WordprocessingML (.docx) model.
//!
//! The package is read fully into memory. Only `word/document.xml` is parsed;
//! every other part is written back byte-for-byte. The body is exposed as the
//! same hierarchy a template author sees: top-level paragraphs, top-level
//! tables, rows, cells and the paragraphs inside each cell.

pub mod substitute;
pub mod xml;

use std::fmt::Display;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use self::xml::{Element, Node, XmlPart};

pub const DOCUMENT_PART: &str = "word/document.xml";

const BODY: &str = "w:body";
const PARAGRAPH: &str = "w:p";
const RUN: &str = "w:r";
const RUN_PROPERTIES: &str = "w:rPr";
const RUN_STYLE: &str = "w:rStyle";
const RUN_FONTS: &str = "w:rFonts";
const BOLD: &str = "w:b";
const TEXT: &str = "w:t";
const TAB: &str = "w:tab";
const BREAK: &str = "w:br";
const CARRIAGE_RETURN: &str = "w:cr";
const TABLE: &str = "w:tbl";
const TABLE_ROW: &str = "w:tr";
const TABLE_CELL: &str = "w:tc";

#[derive(Debug, Error)]
pub enum DocxError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid docx package: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("malformed document XML: {0}")]
    Xml(String),

    #[error("package has no {0} part")]
    MissingPart(&'static str),
}

impl DocxError {
    pub(crate) fn xml(err: impl Display) -> Self {
        DocxError::Xml(err.to_string())
    }

    fn io(path: &Path, source: std::io::Error) -> Self {
        DocxError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone)]
struct PackagePart {
    name: String,
    is_dir: bool,
    data: Vec<u8>,
}

/// A loaded .docx document.
#[derive(Debug, Clone)]
pub struct Document {
    parts: Vec<PackagePart>,
    document: XmlPart,
}

impl Document {
    pub fn open(path: &Path) -> Result<Self, DocxError> {
        let bytes = std::fs::read(path).map_err(|e| DocxError::io(path, e))?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocxError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut parts = Vec::with_capacity(archive.len());
        let mut document_xml: Option<String> = None;

        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            let name = file.name().to_string();
            let mut data = Vec::new();
            file.read_to_end(&mut data)
                .map_err(|e| DocxError::io(Path::new(&name), e))?;

            if name == DOCUMENT_PART {
                document_xml = Some(String::from_utf8(data.clone()).map_err(DocxError::xml)?);
            }
            parts.push(PackagePart {
                name,
                is_dir: file.is_dir(),
                data,
            });
        }

        let xml = document_xml.ok_or(DocxError::MissingPart(DOCUMENT_PART))?;
        let document = XmlPart::parse(&xml)?;
        if document.root.child_named(BODY).is_none() {
            return Err(DocxError::MissingPart(BODY));
        }

        Ok(Self { parts, document })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DocxError> {
        let document_xml = self.document.to_bytes()?;
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        for part in &self.parts {
            if part.is_dir {
                zip.add_directory(part.name.as_str(), options)?;
                continue;
            }
            zip.start_file(part.name.as_str(), options)?;
            let data = if part.name == DOCUMENT_PART {
                &document_xml
            } else {
                &part.data
            };
            zip.write_all(data)
                .map_err(|e| DocxError::io(Path::new(&part.name), e))?;
        }

        Ok(zip.finish()?.into_inner())
    }

    fn body_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.document.root.child_named_mut(BODY).into_iter()
    }

    /// Top-level body paragraphs, in document order.
    pub fn paragraphs_mut(&mut self) -> impl Iterator<Item = Paragraph<'_>> {
        self.body_mut()
            .flat_map(|body| body.children_named_mut(PARAGRAPH))
            .map(Paragraph)
    }

    /// Top-level body tables, in document order.
    pub fn tables_mut(&mut self) -> impl Iterator<Item = Table<'_>> {
        self.body_mut()
            .flat_map(|body| body.children_named_mut(TABLE))
            .map(Table)
    }
}

pub struct Paragraph<'a>(&'a mut Element);

impl Paragraph<'_> {
    /// Runs that are direct children of the paragraph. Runs nested inside
    /// hyperlinks or content controls are not visited.
    pub fn runs_mut(&mut self) -> impl Iterator<Item = Run<'_>> {
        self.0.children_named_mut(RUN).map(Run)
    }
}

pub struct Table<'a>(&'a mut Element);

impl Table<'_> {
    pub fn rows_mut(&mut self) -> impl Iterator<Item = Row<'_>> {
        self.0.children_named_mut(TABLE_ROW).map(Row)
    }
}

pub struct Row<'a>(&'a mut Element);

impl Row<'_> {
    pub fn cells_mut(&mut self) -> impl Iterator<Item = Cell<'_>> {
        self.0.children_named_mut(TABLE_CELL).map(Cell)
    }
}

pub struct Cell<'a>(&'a mut Element);

impl Cell<'_> {
    /// Paragraphs directly inside the cell. Tables nested in the cell are skipped.
    pub fn paragraphs_mut(&mut self) -> impl Iterator<Item = Paragraph<'_>> {
        self.0.children_named_mut(PARAGRAPH).map(Paragraph)
    }
}

/// A contiguous span of text sharing one formatting state.
pub struct Run<'a>(&'a mut Element);

impl Run<'_> {
    /// Visible text of the run: `w:t` content in order, with `w:tab` as `\t`
    /// and line breaks (`w:br` without a page/column type, `w:cr`) as `\n`.
    pub fn text(&self) -> Result<String, DocxError> {
        let mut out = String::new();
        for node in &self.0.children {
            let Node::Element(el) = node else { continue };
            match TextPiece::of(el) {
                Some(TextPiece::Text) => out.push_str(&el.text()?),
                Some(TextPiece::Tab) => out.push('\t'),
                Some(TextPiece::Break) => out.push('\n'),
                None => {}
            }
        }
        Ok(out)
    }

    /// Rewrites the run's text content. `\t` becomes a tab and `\n`/`\r` a
    /// line break, reusing the run's existing tab and break elements in order.
    /// The rewritten content sits where the first text element was; run
    /// properties, page breaks and drawings are left alone.
    ///
    /// Fails without touching the run if `text` holds a character XML 1.0
    /// cannot represent.
    pub fn set_text(&mut self, text: &str) -> Result<(), DocxError> {
        if let Some(bad) = text.chars().find(|&c| !is_xml_char(c)) {
            return Err(DocxError::Xml(format!(
                "character U+{:04X} cannot appear in document text",
                bad as u32
            )));
        }

        let children = &mut self.0.children;
        let first = children.iter().position(|n| text_piece(n).is_some());
        let mut tabs = Vec::new();
        let mut breaks = Vec::new();
        for node in children.iter() {
            match text_piece(node) {
                Some(TextPiece::Tab) => tabs.push(node.clone()),
                Some(TextPiece::Break) => breaks.push(node.clone()),
                _ => {}
            }
        }
        children.retain(|n| text_piece(n).is_none());

        let mut tabs = tabs.into_iter();
        let mut breaks = breaks.into_iter();
        let mut content = Vec::new();
        let mut segment = String::new();
        for c in text.chars() {
            let separator = match c {
                '\t' => tabs.next().unwrap_or_else(|| Node::Element(Element::new(TAB))),
                '\n' | '\r' => breaks
                    .next()
                    .unwrap_or_else(|| Node::Element(Element::new(BREAK))),
                c => {
                    segment.push(c);
                    continue;
                }
            };
            if !segment.is_empty() {
                content.push(text_element(&segment));
                segment.clear();
            }
            content.push(separator);
        }
        if !segment.is_empty() {
            content.push(text_element(&segment));
        }

        let at = first.unwrap_or(children.len());
        children.splice(at..at, content);
        Ok(())
    }

    #[cfg(test)]
    pub fn is_bold(&self) -> bool {
        self.0
            .child_named(RUN_PROPERTIES)
            .and_then(|props| props.child_named(BOLD))
            .map(|bold| {
                !matches!(
                    bold.attribute("w:val").as_deref(),
                    Some("0" | "false" | "off")
                )
            })
            .unwrap_or(false)
    }

    pub fn set_bold(&mut self, bold: bool) {
        let children = &mut self.0.children;
        let existing = children.iter().position(|n| is_element(n, RUN_PROPERTIES));
        let props = match existing {
            Some(index) => &mut children[index],
            None => {
                children.insert(0, Node::Element(Element::new(RUN_PROPERTIES)));
                &mut children[0]
            }
        };
        let Node::Element(props) = props else {
            return;
        };

        props.children.retain(|n| !is_element(n, BOLD));
        if bold {
            // w:b follows w:rStyle and w:rFonts in the rPr sequence.
            let at = props
                .children
                .iter()
                .position(|n| matches!(n, Node::Element(el) if !el.is(RUN_STYLE) && !el.is(RUN_FONTS)))
                .unwrap_or(props.children.len());
            props.children.insert(at, Node::Element(Element::new(BOLD)));
        }
    }
}

fn is_element(node: &Node, name: &str) -> bool {
    matches!(node, Node::Element(el) if el.is(name))
}

/// Run children that make up its visible text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextPiece {
    Text,
    Tab,
    Break,
}

impl TextPiece {
    fn of(el: &Element) -> Option<Self> {
        if el.is(TEXT) {
            Some(Self::Text)
        } else if el.is(TAB) {
            Some(Self::Tab)
        } else if el.is(CARRIAGE_RETURN) {
            Some(Self::Break)
        } else if el.is(BREAK) {
            // Page and column breaks are layout, not text.
            match el.attribute("w:type").as_deref() {
                None | Some("textWrapping") => Some(Self::Break),
                Some(_) => None,
            }
        } else {
            None
        }
    }
}

fn text_piece(node: &Node) -> Option<TextPiece> {
    match node {
        Node::Element(el) => TextPiece::of(el),
        _ => None,
    }
}

fn text_element(text: &str) -> Node {
    Node::Element(
        Element::new(TEXT)
            .with_attribute("xml:space", "preserve")
            .with_text(text),
    )
}

/// The XML 1.0 `Char` production.
fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n'
            | '\r'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_round_trip_preserves_other_parts() {
        let bytes = docx_from_body(&format!("<w:p>{}</w:p>", run("Hello")));
        let doc = Document::from_bytes(&bytes).unwrap();
        let saved = doc.to_bytes().unwrap();

        let mut archive = ZipArchive::new(Cursor::new(saved.as_slice())).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["[Content_Types].xml", "_rels/.rels", DOCUMENT_PART]);

        let mut rels = String::new();
        archive
            .by_name("_rels/.rels")
            .unwrap()
            .read_to_string(&mut rels)
            .unwrap();
        assert!(rels.contains("officeDocument"));
        assert_eq!(document_xml_of(&saved), document_xml(&format!("<w:p>{}</w:p>", run("Hello"))));
    }

    #[test]
    fn test_rejects_package_without_document_part() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("other.xml", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"<a/>").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        assert!(matches!(
            Document::from_bytes(&bytes),
            Err(DocxError::MissingPart(DOCUMENT_PART))
        ));
    }

    #[test]
    fn test_rejects_non_zip_bytes() {
        assert!(matches!(
            Document::from_bytes(b"not a zip"),
            Err(DocxError::Zip(_))
        ));
    }

    #[test]
    fn test_hierarchy_views() {
        let body = format!(
            "<w:p>{}{}</w:p><w:tbl><w:tr><w:tc><w:p>{}</w:p></w:tc><w:tc><w:p>{}</w:p><w:p>{}</w:p></w:tc></w:tr></w:tbl><w:p>{}</w:p>",
            run("a"),
            run("b"),
            run("c"),
            run("d"),
            run("e"),
            run("f")
        );
        let mut doc = Document::from_bytes(&docx_from_body(&body)).unwrap();

        let top: Vec<String> = doc
            .paragraphs_mut()
            .flat_map(|mut p| p.runs_mut().map(|r| r.text().unwrap()).collect::<Vec<_>>())
            .collect();
        assert_eq!(top, vec!["a", "b", "f"]);

        let mut cells = Vec::new();
        for mut table in doc.tables_mut() {
            for mut row in table.rows_mut() {
                for mut cell in row.cells_mut() {
                    let count = cell.paragraphs_mut().count();
                    cells.push(count);
                }
            }
        }
        assert_eq!(cells, vec![1, 2]);
    }

    fn with_single_run(body: &str, f: impl FnOnce(&mut Run<'_>)) -> String {
        let mut doc = Document::from_bytes(&docx_from_body(body)).unwrap();
        let mut paragraph = doc.paragraphs_mut().next().unwrap();
        let mut run = paragraph.runs_mut().next().unwrap();
        f(&mut run);
        document_xml_of(&doc.to_bytes().unwrap())
    }

    #[test]
    fn test_run_text_reads_tabs_and_breaks() {
        let body = r#"<w:p><w:r><w:t>AB</w:t><w:tab/><w:t>CD</w:t><w:br/><w:t>E</w:t><w:cr/><w:br w:type="page"/></w:r></w:p>"#;
        with_single_run(body, |run| {
            assert_eq!(run.text().unwrap(), "AB\tCD\nE\n");
        });
    }

    #[test]
    fn test_set_text_keeps_tabs_in_place() {
        let body = r#"<w:p><w:r><w:rPr><w:i/></w:rPr><w:t>Name:</w:t><w:tab/><w:t>[NAME]</w:t></w:r></w:p>"#;
        let xml = with_single_run(body, |run| {
            run.set_text("Name:\tx & y").unwrap();
        });
        assert!(xml.contains(
            r#"<w:r><w:rPr><w:i/></w:rPr><w:t xml:space="preserve">Name:</w:t><w:tab/><w:t xml:space="preserve">x &amp; y</w:t></w:r>"#
        ));
    }

    #[test]
    fn test_set_text_reuses_breaks_and_adds_missing_ones() {
        let body = r#"<w:p><w:r><w:t>a</w:t><w:br w:clear="all"/><w:t>b</w:t><w:br w:type="page"/></w:r></w:p>"#;
        let xml = with_single_run(body, |run| {
            run.set_text("1\n2\n3").unwrap();
        });
        assert!(xml.contains(
            r#"<w:r><w:t xml:space="preserve">1</w:t><w:br w:clear="all"/><w:t xml:space="preserve">2</w:t><w:br/><w:t xml:space="preserve">3</w:t><w:br w:type="page"/></w:r>"#
        ));
    }

    #[test]
    fn test_set_text_rejects_characters_outside_xml() {
        let body = format!("<w:p>{}</w:p>", run("keep"));
        let xml = with_single_run(&body, |run| {
            let err = run.set_text("bad\u{1}value").unwrap_err();
            assert!(matches!(err, DocxError::Xml(_)));
            assert_eq!(run.text().unwrap(), "keep");
        });
        assert!(xml.contains(r#"<w:t xml:space="preserve">keep</w:t>"#));
    }

    #[test]
    fn test_set_bold_creates_and_orders_properties() {
        let body = r#"<w:p><w:r><w:t>plain</w:t></w:r><w:r><w:rPr><w:rFonts w:ascii="Arial"/><w:i/></w:rPr><w:t>styled</w:t></w:r><w:r><w:rPr><w:b w:val="0"/></w:rPr><w:t>off</w:t></w:r></w:p>"#;
        let mut doc = Document::from_bytes(&docx_from_body(body)).unwrap();
        for mut p in doc.paragraphs_mut() {
            for mut r in p.runs_mut() {
                assert!(!r.is_bold());
                r.set_bold(true);
                assert!(r.is_bold());
            }
        }
        let xml = document_xml_of(&doc.to_bytes().unwrap());
        assert!(xml.contains("<w:r><w:rPr><w:b/></w:rPr><w:t>plain</w:t></w:r>"));
        assert!(xml.contains(r#"<w:rPr><w:rFonts w:ascii="Arial"/><w:b/><w:i/></w:rPr>"#));
        assert!(!xml.contains(r#"w:val="0""#));
    }
}
