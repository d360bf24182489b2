use crate::image_xobject::ImageXObject;
use crate::lopdf_utils;
use crate::rectangle::{Placement, Rectangle};
use crate::Error;
use lopdf::content::Content;
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::io::Read;

/// Resource name of the signature image inside the signature page.
pub(crate) const SIGNATURE_IMAGE_NAME: &str = "SignatureImage";

/// A standalone one page document that contains nothing but the signature
/// image, painted at the placement rectangle on an otherwise blank page.
#[derive(Debug, Clone)]
pub struct SignatureLayer {
    document: Document,
    page_id: ObjectId,
}

impl SignatureLayer {
    /// Render a PNG signature onto a blank page of size `media_box`.
    pub fn render<R: Read>(
        image_reader: R,
        media_box: Rectangle,
        placement: Placement,
    ) -> Result<Self, Error> {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();

        // Load image
        let image_decoder = png::Decoder::new(image_reader);
        let (mut image_xobject, mask_xobject) = ImageXObject::try_from(image_decoder)?;
        // Add object to object list
        if let Some(mask_xobject) = mask_xobject {
            let mask_xobject_id = document.add_object(mask_xobject);
            image_xobject.s_mask = Some(mask_xobject_id);
        }
        let image_xobject_id = document.add_object(image_xobject);

        let rect = placement.to_rectangle();
        let content = Content {
            operations: lopdf_utils::paint_xobject(
                SIGNATURE_IMAGE_NAME,
                (rect.x1, rect.y1),
                (rect.width(), rect.height()),
            ),
        };
        let content_id = document.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => media_box.to_object(),
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    SIGNATURE_IMAGE_NAME => image_xobject_id,
                },
            },
        });
        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);

        log::debug!(
            "Rendered signature layer at ({}, {}) size {}x{}.",
            rect.x1,
            rect.y1,
            rect.width(),
            rect.height()
        );
        Ok(SignatureLayer { document, page_id })
    }

    pub fn page_id(&self) -> ObjectId {
        self.page_id
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub(crate) fn into_document(self) -> Document {
        self.document
    }

    /// Serialize the layer on its own, mostly useful for inspection.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut document = self.document.clone();
        let mut data = Vec::new();
        document.save_to(&mut data)?;
        Ok(data)
    }
}
