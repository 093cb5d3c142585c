//! OOXML package serialization for `DocxModel`.
//!
//! Parts are written in a fixed order with fixed zip timestamps and no
//! generated ids or dates, so identical models give identical bytes.

use std::io::{Cursor, Write};
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesText, Event};
use quick_xml::Writer;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::render::model::{DocxModel, DocxParagraph, Indent, Inline, ParagraphRole, TextRun};

const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PKG_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const NS_CORE: &str = "http://schemas.openxmlformats.org/package/2006/metadata/core-properties";
const NS_DC: &str = "http://purl.org/dc/elements/1.1/";

const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_CORE_PROPS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
const REL_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const REL_NUMBERING: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering";
const REL_HYPERLINK: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";

const BULLET_NUM_ID: &str = "1";
const BULLET_GLYPHS: [&str; 3] = ["\u{2022}", "\u{25e6}", "\u{25aa}"];

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("XML write error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

type XmlWriter = Writer<Vec<u8>>;
type XmlResult = quick_xml::Result<()>;

impl DocxModel {
    /// Serializes the model into a complete `.docx` archive.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RenderError> {
        let parts: [(&str, Vec<u8>); 7] = [
            ("[Content_Types].xml", xml_part(write_content_types)?),
            ("_rels/.rels", xml_part(write_package_rels)?),
            ("docProps/core.xml", xml_part(|w| write_core_props(w, self))?),
            ("word/document.xml", self.document_xml()?),
            ("word/styles.xml", xml_part(|w| write_styles(w, self))?),
            ("word/numbering.xml", xml_part(|w| write_numbering(w, self))?),
            (
                "word/_rels/document.xml.rels",
                xml_part(|w| write_document_rels(w, self))?,
            ),
        ];

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, bytes) in parts {
            zip.start_file(name, options)?;
            zip.write_all(&bytes)?;
        }
        Ok(zip.finish()?.into_inner())
    }

    /// Serializes and writes the archive to `path`, replacing any existing file.
    pub fn write_to(&self, path: &Path) -> Result<(), RenderError> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    /// The `word/document.xml` part on its own.
    pub fn document_xml(&self) -> Result<Vec<u8>, RenderError> {
        xml_part(|w| write_document(w, self))
    }
}

fn xml_part(build: impl FnOnce(&mut XmlWriter) -> XmlResult) -> Result<Vec<u8>, RenderError> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    build(&mut writer)?;
    Ok(writer.into_inner())
}

fn val<'a>(w: &mut XmlWriter, name: &'a str, value: &'a str) -> XmlResult {
    w.create_element(name)
        .with_attribute(("w:val", value))
        .write_empty()?;
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Package-level parts
// ────────────────────────────────────────────────────────────────────────────

fn write_content_types(w: &mut XmlWriter) -> XmlResult {
    w.create_element("Types")
        .with_attribute(("xmlns", NS_CONTENT_TYPES))
        .write_inner_content(|w| {
            for (ext, content_type) in [
                ("rels", "application/vnd.openxmlformats-package.relationships+xml"),
                ("xml", "application/xml"),
            ] {
                w.create_element("Default")
                    .with_attributes([("Extension", ext), ("ContentType", content_type)])
                    .write_empty()?;
            }
            for (part, content_type) in [
                (
                    "/word/document.xml",
                    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml",
                ),
                (
                    "/word/styles.xml",
                    "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml",
                ),
                (
                    "/word/numbering.xml",
                    "application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml",
                ),
                (
                    "/docProps/core.xml",
                    "application/vnd.openxmlformats-package.core-properties+xml",
                ),
            ] {
                w.create_element("Override")
                    .with_attributes([("PartName", part), ("ContentType", content_type)])
                    .write_empty()?;
            }
            XmlResult::Ok(())
        })?;
    Ok(())
}

fn write_package_rels(w: &mut XmlWriter) -> XmlResult {
    w.create_element("Relationships")
        .with_attribute(("xmlns", NS_PKG_RELS))
        .write_inner_content(|w| {
            for (id, rel_type, target) in [
                ("rId1", REL_OFFICE_DOCUMENT, "word/document.xml"),
                ("rId2", REL_CORE_PROPS, "docProps/core.xml"),
            ] {
                w.create_element("Relationship")
                    .with_attributes([("Id", id), ("Type", rel_type), ("Target", target)])
                    .write_empty()?;
            }
            XmlResult::Ok(())
        })?;
    Ok(())
}

fn write_core_props(w: &mut XmlWriter, model: &DocxModel) -> XmlResult {
    w.create_element("cp:coreProperties")
        .with_attributes([("xmlns:cp", NS_CORE), ("xmlns:dc", NS_DC)])
        .write_inner_content(|w| {
            w.create_element("dc:title")
                .write_text_content(BytesText::new(&model.title))?;
            w.create_element("dc:creator")
                .write_text_content(BytesText::new(&model.title))?;
            XmlResult::Ok(())
        })?;
    Ok(())
}

fn write_document_rels(w: &mut XmlWriter, model: &DocxModel) -> XmlResult {
    w.create_element("Relationships")
        .with_attribute(("xmlns", NS_PKG_RELS))
        .write_inner_content(|w| {
            w.create_element("Relationship")
                .with_attributes([("Id", "rId1"), ("Type", REL_STYLES), ("Target", "styles.xml")])
                .write_empty()?;
            w.create_element("Relationship")
                .with_attributes([
                    ("Id", "rId2"),
                    ("Type", REL_NUMBERING),
                    ("Target", "numbering.xml"),
                ])
                .write_empty()?;
            for link in &model.hyperlinks {
                w.create_element("Relationship")
                    .with_attributes([
                        ("Id", link.rel_id.as_str()),
                        ("Type", REL_HYPERLINK),
                        ("Target", link.target.as_str()),
                        ("TargetMode", "External"),
                    ])
                    .write_empty()?;
            }
            XmlResult::Ok(())
        })?;
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// word/styles.xml and word/numbering.xml
// ────────────────────────────────────────────────────────────────────────────

fn write_fonts(w: &mut XmlWriter, family: &str) -> XmlResult {
    w.create_element("w:rFonts")
        .with_attributes([
            ("w:ascii", family),
            ("w:hAnsi", family),
            ("w:eastAsia", family),
            ("w:cs", family),
        ])
        .write_empty()?;
    Ok(())
}

fn write_styles(w: &mut XmlWriter, model: &DocxModel) -> XmlResult {
    let size = model.body_size_half_pt.to_string();
    let line = model.line.to_string();

    w.create_element("w:styles")
        .with_attribute(("xmlns:w", NS_W))
        .write_inner_content(|w| {
            w.create_element("w:docDefaults").write_inner_content(|w| {
                w.create_element("w:rPrDefault").write_inner_content(|w| {
                    w.create_element("w:rPr").write_inner_content(|w| {
                        write_fonts(w, &model.font_family)?;
                        val(w, "w:sz", &size)?;
                        val(w, "w:szCs", &size)?;
                        val(w, "w:lang", "en-US")
                    })?;
                    XmlResult::Ok(())
                })?;
                w.create_element("w:pPrDefault").write_inner_content(|w| {
                    w.create_element("w:pPr").write_inner_content(|w| {
                        w.create_element("w:spacing")
                            .with_attributes([
                                ("w:before", "0"),
                                ("w:after", "0"),
                                ("w:line", line.as_str()),
                                ("w:lineRule", "auto"),
                            ])
                            .write_empty()?;
                        XmlResult::Ok(())
                    })?;
                    XmlResult::Ok(())
                })?;
                XmlResult::Ok(())
            })?;

            w.create_element("w:style")
                .with_attributes([
                    ("w:type", "paragraph"),
                    ("w:default", "1"),
                    ("w:styleId", "Normal"),
                ])
                .write_inner_content(|w| {
                    val(w, "w:name", "Normal")?;
                    w.create_element("w:qFormat").write_empty()?;
                    XmlResult::Ok(())
                })?;

            for (style_id, name, outline) in [
                ("Heading1", "heading 1", Some("0")),
                ("Heading2", "heading 2", Some("1")),
                ("Heading3", "heading 3", Some("2")),
                ("ListBullet", "List Bullet", None),
            ] {
                w.create_element("w:style")
                    .with_attributes([("w:type", "paragraph"), ("w:styleId", style_id)])
                    .write_inner_content(|w| {
                        val(w, "w:name", name)?;
                        val(w, "w:basedOn", "Normal")?;
                        val(w, "w:next", "Normal")?;
                        w.create_element("w:qFormat").write_empty()?;
                        if let Some(level) = outline {
                            w.create_element("w:pPr")
                                .write_inner_content(|w| val(w, "w:outlineLvl", level))?;
                        }
                        XmlResult::Ok(())
                    })?;
            }
            XmlResult::Ok(())
        })?;
    Ok(())
}

fn write_indent(w: &mut XmlWriter, indent: Indent) -> XmlResult {
    w.create_element("w:ind")
        .with_attributes([
            ("w:left", indent.left_twips.to_string().as_str()),
            ("w:hanging", indent.hanging_twips.to_string().as_str()),
        ])
        .write_empty()?;
    Ok(())
}

fn write_numbering(w: &mut XmlWriter, model: &DocxModel) -> XmlResult {
    w.create_element("w:numbering")
        .with_attribute(("xmlns:w", NS_W))
        .write_inner_content(|w| {
            w.create_element("w:abstractNum")
                .with_attribute(("w:abstractNumId", "0"))
                .write_inner_content(|w| {
                    val(w, "w:multiLevelType", "hybridMultilevel")?;
                    for (level, glyph) in BULLET_GLYPHS.iter().enumerate() {
                        let indent = Indent {
                            left_twips: model.bullet_indent.left_twips * (level as u32 + 1),
                            hanging_twips: model.bullet_indent.hanging_twips,
                        };
                        w.create_element("w:lvl")
                            .with_attribute(("w:ilvl", level.to_string().as_str()))
                            .write_inner_content(|w| {
                                val(w, "w:start", "1")?;
                                val(w, "w:numFmt", "bullet")?;
                                val(w, "w:lvlText", glyph)?;
                                val(w, "w:lvlJc", "left")?;
                                w.create_element("w:pPr")
                                    .write_inner_content(|w| write_indent(w, indent))?;
                                w.create_element("w:rPr")
                                    .write_inner_content(|w| write_fonts(w, &model.font_family))?;
                                XmlResult::Ok(())
                            })?;
                    }
                    XmlResult::Ok(())
                })?;
            w.create_element("w:num")
                .with_attribute(("w:numId", BULLET_NUM_ID))
                .write_inner_content(|w| val(w, "w:abstractNumId", "0"))?;
            XmlResult::Ok(())
        })?;
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// word/document.xml
// ────────────────────────────────────────────────────────────────────────────

fn write_document(w: &mut XmlWriter, model: &DocxModel) -> XmlResult {
    w.create_element("w:document")
        .with_attributes([("xmlns:w", NS_W), ("xmlns:r", NS_R)])
        .write_inner_content(|w| {
            w.create_element("w:body").write_inner_content(|w| {
                for paragraph in &model.paragraphs {
                    write_paragraph(w, paragraph)?;
                }
                write_section(w, model)
            })?;
            XmlResult::Ok(())
        })?;
    Ok(())
}

fn write_paragraph(w: &mut XmlWriter, paragraph: &DocxParagraph) -> XmlResult {
    w.create_element("w:p").write_inner_content(|w| {
        w.create_element("w:pPr").write_inner_content(|w| {
            if paragraph.role != ParagraphRole::Body {
                val(w, "w:pStyle", paragraph.role.style_id())?;
            }
            if let Some(level) = paragraph.bullet_level {
                w.create_element("w:numPr").write_inner_content(|w| {
                    val(w, "w:ilvl", &level.to_string())?;
                    val(w, "w:numId", BULLET_NUM_ID)
                })?;
            }
            w.create_element("w:spacing")
                .with_attributes([
                    ("w:before", paragraph.spacing.before_twips.to_string().as_str()),
                    ("w:after", paragraph.spacing.after_twips.to_string().as_str()),
                    ("w:line", paragraph.spacing.line.to_string().as_str()),
                    ("w:lineRule", "auto"),
                ])
                .write_empty()?;
            if let Some(indent) = paragraph.indent {
                write_indent(w, indent)?;
            }
            XmlResult::Ok(())
        })?;

        for inline in &paragraph.inlines {
            match inline {
                Inline::Run(run) => write_run(w, run)?,
                Inline::Hyperlink { rel_id, run } => {
                    w.create_element("w:hyperlink")
                        .with_attribute(("r:id", rel_id.as_str()))
                        .write_inner_content(|w| write_run(w, run))?;
                }
            }
        }
        XmlResult::Ok(())
    })?;
    Ok(())
}

fn write_run(w: &mut XmlWriter, run: &TextRun) -> XmlResult {
    let size = run.size_half_pt.to_string();
    w.create_element("w:r").write_inner_content(|w| {
        w.create_element("w:rPr").write_inner_content(|w| {
            if run.bold {
                w.create_element("w:b").write_empty()?;
            }
            val(w, "w:sz", &size)?;
            val(w, "w:szCs", &size)?;
            if run.underline {
                val(w, "w:u", "single")?;
            }
            XmlResult::Ok(())
        })?;
        w.create_element("w:t")
            .with_attribute(("xml:space", "preserve"))
            .write_text_content(BytesText::new(&run.text))?;
        XmlResult::Ok(())
    })?;
    Ok(())
}

fn write_section(w: &mut XmlWriter, model: &DocxModel) -> XmlResult {
    let s = &model.section;
    w.create_element("w:sectPr").write_inner_content(|w| {
        w.create_element("w:pgSz")
            .with_attributes([
                ("w:w", s.page_width_twips.to_string().as_str()),
                ("w:h", s.page_height_twips.to_string().as_str()),
            ])
            .write_empty()?;
        w.create_element("w:pgMar")
            .with_attributes([
                ("w:top", s.margin_top_twips.to_string().as_str()),
                ("w:right", s.margin_right_twips.to_string().as_str()),
                ("w:bottom", s.margin_bottom_twips.to_string().as_str()),
                ("w:left", s.margin_left_twips.to_string().as_str()),
                ("w:header", "0"),
                ("w:footer", "0"),
                ("w:gutter", "0"),
            ])
            .write_empty()?;
        XmlResult::Ok(())
    })?;
    Ok(())
}

/// Number of `<w:p>` elements in a `word/document.xml` part.
#[cfg(test)]
pub(crate) fn count_paragraphs(xml: &[u8]) -> usize {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut count = 0;
    loop {
        match reader.read_event_into(&mut buf).unwrap() {
            Event::Start(e) if e.name().as_ref() == b"w:p" => count += 1,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    count
}
