use std::path::Path;

use crate::convert::ConversionError;

/// Counts the pages of a PDF on disk. A zero-page PDF is an error.
pub fn count_pages(path: &Path) -> Result<usize, ConversionError> {
    let document = lopdf::Document::load(path).map_err(|e| ConversionError::UnreadablePdf {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    match document.get_pages().len() {
        0 => Err(ConversionError::EmptyPdf(path.to_path_buf())),
        pages => Ok(pages),
    }
}

/// Writes a minimal PDF with `pages` blank letter-size pages.
#[cfg(test)]
pub(crate) fn write_blank_pdf(path: &Path, pages: usize) {
    use lopdf::{dictionary, Document, Object};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = (0..pages)
        .map(|_| {
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            })
            .into()
        })
        .collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}
