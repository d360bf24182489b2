//! Stamp a signature onto the first page of a PDF.
//!
//! The first page is rebuilt from two layers. The original page content is
//! turned into a form XObject (the base layer) and so is the page of a
//! [`SignatureLayer`]. The page dictionary is then replaced, under the same
//! object id, by one with the original media box that paints the base layer
//! first and the signature on top. All other pages are left as they are.

use crate::lopdf_utils;
use crate::pdf_object::{inherited_attribute, PdfObjectDeref};
use crate::rectangle::{Placement, Rectangle};
use crate::signature_asset::SignatureAsset;
use crate::signature_layer::SignatureLayer;
use crate::staging::Staging;
use crate::Error;
use lopdf::content::Content;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

const BASE_LAYER_NAME: &str = "BaseLayer";
const SIGNATURE_LAYER_NAME: &str = "SignatureLayer";
/// Page entries that stay valid on the rebuilt page.
const CARRIED_PAGE_KEYS: [&[u8]; 3] = [b"Annots", b"StructParents", b"Tabs"];

#[derive(Debug, Clone, Default)]
pub struct Compositor {
    placement: Placement,
    staging: Staging,
}

impl Compositor {
    pub fn new(placement: Placement, staging: Staging) -> Self {
        Compositor { placement, staging }
    }

    /// Returns a new PDF with the signature painted onto page 1.
    /// `source_pdf` is only read.
    pub fn composite(&self, source_pdf: &[u8], asset: &SignatureAsset) -> Result<Vec<u8>, Error> {
        let mut document = Document::load_mem(source_pdf)
            .map_err(|err| Error::InvalidSourceDocument(err.to_string()))?;
        let pages = document.get_pages();
        let page_count = pages.len();
        let first_page_id = *pages.get(&1).ok_or(Error::EmptyDocument)?;

        // Structural problems in the page tree are problems of the source document.
        self.stamp_first_page(&mut document, first_page_id, asset)
            .map_err(|err| match err {
                Error::LoPdfError(err) => Error::InvalidSourceDocument(err.to_string()),
                err => err,
            })?;

        document.prune_objects();
        let mut signed_pdf = Vec::with_capacity(source_pdf.len() + asset.as_png_bytes().len());
        document.save_to(&mut signed_pdf)?;
        log::debug!(
            "Composited signature onto page 1 of {} ({} bytes).",
            page_count,
            signed_pdf.len()
        );
        Ok(signed_pdf)
    }

    fn stamp_first_page(
        &self,
        document: &mut Document,
        first_page_id: ObjectId,
        asset: &SignatureAsset,
    ) -> Result<(), Error> {
        let media_box = match inherited_attribute(document, first_page_id, b"MediaBox")? {
            Some(media_box) => Rectangle::from_object(media_box)?,
            None => {
                log::warn!("First page has no `MediaBox`, assuming Letter.");
                Rectangle::letter()
            }
        };

        // Released when `staged` goes out of scope, early returns included.
        let staged = self.staging.stage(asset.as_png_bytes())?;
        let layer = SignatureLayer::render(staged.reader()?, media_box, self.placement)?;

        let base_layer_id = Self::page_as_form_xobject(document, first_page_id, media_box)?;
        let signature_layer_id = Self::import_layer(document, layer, media_box)?;
        Self::rebuild_first_page(
            document,
            first_page_id,
            media_box,
            base_layer_id,
            signature_layer_id,
        )
    }

    /// Wrap the content and resources of a page into a form XObject.
    fn page_as_form_xobject(
        document: &mut Document,
        page_id: ObjectId,
        media_box: Rectangle,
    ) -> Result<ObjectId, Error> {
        let mut form = Self::page_content(document, page_id)?;
        let resources = inherited_attribute(document, page_id, b"Resources")?
            .cloned()
            .unwrap_or_else(|| Object::Dictionary(Dictionary::new()));
        Self::make_form(&mut form, media_box, resources);
        Ok(document.add_object(form))
    }

    fn make_form(stream: &mut Stream, media_box: Rectangle, resources: Object) {
        stream.dict.set("Type", "XObject");
        stream.dict.set("Subtype", "Form");
        stream.dict.set("BBox", media_box.to_object());
        stream.dict.set("Resources", resources);
    }

    /// All content streams of a page as one stream.
    ///
    /// Streams are decoded and joined with a newline so operators do not run
    /// together. lopdf only decodes Flate and LZW. A single stream it can not
    /// decode is kept as is, together with its `Filter` and `DecodeParms`.
    /// Several streams can only be joined decoded.
    fn page_content(document: &Document, page_id: ObjectId) -> Result<Stream, Error> {
        let content_ids = document.get_page_contents(page_id);
        let mut content = Vec::new();
        for content_id in &content_ids {
            let stream = document.get_object(*content_id)?.as_stream()?;
            if stream.dict.get(b"Filter").is_err() {
                content.extend_from_slice(&stream.content);
            } else {
                match stream.decompressed_content() {
                    Ok(data) => content.extend_from_slice(&data),
                    Err(err) if content_ids.len() == 1 => {
                        log::debug!("Keeping page content encoded: {}", err);
                        let mut encoding = Dictionary::new();
                        for key in [&b"Filter"[..], &b"DecodeParms"[..]] {
                            if let Ok(value) = stream.dict.get(key) {
                                encoding.set(key, value.clone());
                            }
                        }
                        return Ok(Stream::new(encoding, stream.content.clone()));
                    }
                    Err(err) => {
                        return Err(Error::InvalidSourceDocument(format!(
                            "Content stream {:?} can not be decoded: {}",
                            content_id, err
                        )))
                    }
                }
            }
            content.push(b'\n');
        }
        Ok(Stream::new(Dictionary::new(), content))
    }

    /// Move all objects of the signature layer into `document` and return its
    /// page as a form XObject. The layer's own page tree is left unreferenced
    /// and removed when the document is pruned.
    fn import_layer(
        document: &mut Document,
        layer: SignatureLayer,
        media_box: Rectangle,
    ) -> Result<ObjectId, Error> {
        let mut layer_document = layer.into_document();
        layer_document.renumber_objects_with(document.max_id + 1);
        let layer_page_id = layer_document
            .get_pages()
            .get(&1)
            .copied()
            .ok_or_else(|| Error::Other("Signature layer has no page.".to_owned()))?;

        let mut form = Self::page_content(&layer_document, layer_page_id)?;
        let resources = layer_document
            .get_dictionary(layer_page_id)?
            .get(b"Resources")?
            .deref(&layer_document)?
            .clone();

        document.max_id = document.max_id.max(layer_document.max_id);
        document.objects.extend(layer_document.objects);

        Self::make_form(&mut form, media_box, resources);
        Ok(document.add_object(form))
    }

    /// Replace the first page dictionary with one that paints both layers.
    /// The page keeps its object id, so outlines, links, annotations and the
    /// structure tree still point at it.
    fn rebuild_first_page(
        document: &mut Document,
        page_id: ObjectId,
        media_box: Rectangle,
        base_layer_id: ObjectId,
        signature_layer_id: ObjectId,
    ) -> Result<(), Error> {
        let rotate = lopdf_utils::as_option_integer(inherited_attribute(
            document,
            page_id,
            b"Rotate",
        )?)?;
        let old_page = document.get_dictionary(page_id)?;
        let parent_id = old_page
            .get(b"Parent")
            .ok()
            .and_then(|parent| parent.get_object_id())
            .ok_or_else(|| {
                Error::InvalidSourceDocument("First page has no parent in the page tree.".into())
            })?;
        let carried: Vec<(&[u8], Object)> = CARRIED_PAGE_KEYS
            .iter()
            .filter_map(|key| old_page.get(key).ok().map(|value| (*key, value.clone())))
            .collect();

        // Base first, signature on top.
        let mut operations =
            lopdf_utils::paint_xobject(BASE_LAYER_NAME, (0.0, 0.0), (1.0, 1.0));
        operations.extend(lopdf_utils::paint_xobject(
            SIGNATURE_LAYER_NAME,
            (0.0, 0.0),
            (1.0, 1.0),
        ));
        let content = Content { operations };
        let content_id = document.add_object(Stream::new(dictionary! {}, content.encode()?));

        let mut new_page = dictionary! {
            "Type" => "Page",
            "Parent" => parent_id,
            "MediaBox" => media_box.to_object(),
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    BASE_LAYER_NAME => base_layer_id,
                    SIGNATURE_LAYER_NAME => signature_layer_id,
                },
            },
        };
        if let Some(rotate) = rotate {
            new_page.set("Rotate", rotate);
        }
        for (key, value) in carried {
            new_page.set(key, value);
        }
        document
            .objects
            .insert(page_id, Object::Dictionary(new_page));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature_asset;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn asset() -> SignatureAsset {
        let mut image = RgbaImage::from_pixel(8, 4, Rgba([255, 255, 255, 255]));
        for x in 0..8 {
            image.put_pixel(x, 2, Rgba([0, 0, 0, 255]));
        }
        let mut data = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(image)
            .write_to(&mut data, ImageFormat::Png)
            .unwrap();
        signature_asset::extract(&data.into_inner()).unwrap()
    }

    /// Pages share a `Pages` node that holds the media box, like many writers do.
    fn source_pdf(texts: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let mut kids = Vec::new();
        for text in texts {
            let content = format!("BT /F1 24 Tf 72 700 Td ({}) Tj ET", text);
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => kids.len() as i64,
                "Kids" => kids,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(595),
                    Object::Integer(842),
                ],
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut data = Vec::new();
        doc.save_to(&mut data).unwrap();
        data
    }

    fn page_text(doc: &Document, page_number: u32) -> Vec<u8> {
        let page_id = doc.get_pages()[&page_number];
        doc.get_page_content(page_id).unwrap()
    }

    fn xobject<'a>(doc: &'a Document, resources: &'a Dictionary, name: &str) -> &'a Stream {
        let id = resources
            .get(b"XObject")
            .unwrap()
            .as_dict()
            .unwrap()
            .get(name.as_bytes())
            .unwrap()
            .as_reference()
            .unwrap();
        doc.get_object(id).unwrap().as_stream().unwrap()
    }

    fn save(doc: &mut Document) -> Vec<u8> {
        let mut data = Vec::new();
        doc.save_to(&mut data).unwrap();
        data
    }

    fn ascii_hex(data: &[u8]) -> Vec<u8> {
        let mut hex: String = data.iter().map(|byte| format!("{:02X}", byte)).collect();
        hex.push('>');
        hex.into_bytes()
    }

    #[test]
    fn page_count_and_order_are_preserved() {
        let source = source_pdf(&["first", "second", "third"]);
        let signed = Compositor::default().composite(&source, &asset()).unwrap();

        let before = Document::load_mem(&source).unwrap();
        let after = Document::load_mem(&signed).unwrap();
        assert_eq!(after.get_pages().len(), 3);
        for page in 2..=3 {
            assert_eq!(page_text(&after, page), page_text(&before, page));
        }
    }

    #[test]
    fn first_page_paints_base_then_signature() {
        let source = source_pdf(&["first", "second"]);
        let signed = Compositor::new(Placement::LOWER_LEFT, Staging::InMemory)
            .composite(&source, &asset())
            .unwrap();
        let doc = Document::load_mem(&signed).unwrap();
        let page_id = doc.get_pages()[&1];
        let page = doc.get_dictionary(page_id).unwrap();

        let media_box = Rectangle::from_object(page.get(b"MediaBox").unwrap()).unwrap();
        assert_eq!((media_box.width(), media_box.height()), (595.0, 842.0));

        let content = doc.get_and_decode_page_content(page_id).unwrap();
        let painted: Vec<String> = content
            .operations
            .iter()
            .filter(|op| op.operator == "Do")
            .map(|op| op.operands[0].as_name_str().unwrap().to_owned())
            .collect();
        assert_eq!(painted, vec![BASE_LAYER_NAME, SIGNATURE_LAYER_NAME]);

        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        let base = xobject(&doc, resources, BASE_LAYER_NAME);
        let base_text = String::from_utf8_lossy(&base.content).to_string();
        assert!(base_text.contains("(first) Tj"));
        // Inherited font resources travel with the base layer.
        let base_resources = base.dict.get(b"Resources").unwrap().as_dict().unwrap();
        assert!(base_resources.get(b"Font").is_ok());

        let signature = xobject(&doc, resources, SIGNATURE_LAYER_NAME);
        let ops = Content::decode(&signature.content).unwrap().operations;
        let cm = ops.iter().find(|op| op.operator == "cm").unwrap();
        let matrix: Vec<f64> = cm
            .operands
            .iter()
            .map(|obj| lopdf_utils::as_number(obj).unwrap())
            .collect();
        assert_eq!(matrix, vec![140.0, 0.0, 0.0, 40.0, 200.0, 350.0]);
    }

    #[test]
    fn source_bytes_are_not_touched() {
        let source = source_pdf(&["only"]);
        let copy = source.clone();
        let signed = Compositor::default().composite(&source, &asset()).unwrap();
        assert_eq!(source, copy);
        assert_ne!(signed, source);
    }

    #[test]
    fn garbage_source_is_invalid() {
        let err = Compositor::default()
            .composite(b"definitely not a pdf", &asset())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSourceDocument(_)));
    }

    #[test]
    fn zero_pages_is_empty_document() {
        let source = source_pdf(&[]);
        let err = Compositor::default().composite(&source, &asset()).unwrap_err();
        assert!(matches!(err, Error::EmptyDocument));
    }

    #[test]
    fn staged_file_is_removed_after_success_and_failure() {
        let dir = tempfile::tempdir().unwrap();
        let compositor =
            Compositor::new(Placement::ORIGINAL, Staging::Directory(dir.path().into()));

        compositor
            .composite(&source_pdf(&["a", "b"]), &asset())
            .unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

        // Fails after staging: resources are looked up through a dangling parent.
        let mut doc = Document::load_mem(&source_pdf(&["a"])).unwrap();
        let page_id = doc.get_pages()[&1];
        let page = doc.get_object_mut(page_id).unwrap().as_dict_mut().unwrap();
        page.set("MediaBox", Rectangle::letter().to_object());
        page.set("Parent", (9999, 0));
        let mut broken = Vec::new();
        doc.save_to(&mut broken).unwrap();
        assert!(matches!(
            compositor.composite(&broken, &asset()),
            Err(Error::InvalidSourceDocument(_))
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn undecodable_content_keeps_its_filter() {
        let mut doc = Document::load_mem(&source_pdf(&["a"])).unwrap();
        let page_id = doc.get_pages()[&1];
        let encoded = ascii_hex(b"BT /F1 24 Tf 72 700 Td (hex) Tj ET");
        let content_id = doc.add_object(Stream::new(
            dictionary! { "Filter" => "ASCIIHexDecode" },
            encoded.clone(),
        ));
        doc.get_object_mut(page_id)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set("Contents", content_id);
        let source = save(&mut doc);

        let signed = Compositor::default().composite(&source, &asset()).unwrap();
        let doc = Document::load_mem(&signed).unwrap();
        let page = doc.get_dictionary(doc.get_pages()[&1]).unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        let base = xobject(&doc, resources, BASE_LAYER_NAME);
        assert_eq!(
            base.dict.get(b"Filter").unwrap().as_name_str().unwrap(),
            "ASCIIHexDecode"
        );
        assert_eq!(base.content, encoded);
    }

    #[test]
    fn undecodable_content_among_several_streams_is_invalid() {
        let mut doc = Document::load_mem(&source_pdf(&["a"])).unwrap();
        let page_id = doc.get_pages()[&1];
        let plain_id = doc.add_object(Stream::new(dictionary! {}, b"q Q".to_vec()));
        let hex_id = doc.add_object(Stream::new(
            dictionary! { "Filter" => "ASCIIHexDecode" },
            ascii_hex(b"BT ET"),
        ));
        doc.get_object_mut(page_id)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set(
                "Contents",
                vec![Object::Reference(plain_id), Object::Reference(hex_id)],
            );
        let source = save(&mut doc);

        assert!(matches!(
            Compositor::default().composite(&source, &asset()),
            Err(Error::InvalidSourceDocument(_))
        ));
    }

    #[test]
    fn outline_still_points_at_first_page() {
        let mut doc = Document::load_mem(&source_pdf(&["a", "b"])).unwrap();
        let page_id = doc.get_pages()[&1];
        let outlines_id = doc.new_object_id();
        let item_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal("Start"),
            "Parent" => outlines_id,
            "Dest" => vec![Object::Reference(page_id), Object::Name(b"Fit".to_vec())],
        });
        doc.objects.insert(
            outlines_id,
            Object::Dictionary(dictionary! {
                "Type" => "Outlines",
                "First" => item_id,
                "Last" => item_id,
                "Count" => 1,
            }),
        );
        let catalog_id = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
        doc.get_object_mut(catalog_id)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set("Outlines", outlines_id);
        let source = save(&mut doc);

        let signed = Compositor::default().composite(&source, &asset()).unwrap();
        let doc = Document::load_mem(&signed).unwrap();
        let first_page_id = doc.get_pages()[&1];
        let destination = doc
            .get_dictionary(item_id)
            .unwrap()
            .get(b"Dest")
            .unwrap()
            .as_array()
            .unwrap()[0]
            .as_reference()
            .unwrap();
        assert_eq!(destination, first_page_id);

        // The page behind the destination is the stamped one.
        let page = doc.get_dictionary(destination).unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        xobject(&doc, resources, SIGNATURE_LAYER_NAME);
    }

    #[test]
    fn rotation_and_annotations_are_carried_over() {
        let mut doc = Document::load_mem(&source_pdf(&["a", "b"])).unwrap();
        let page_id = doc.get_pages()[&1];
        let pages_id = doc
            .get_dictionary(page_id)
            .unwrap()
            .get(b"Parent")
            .unwrap()
            .as_reference()
            .unwrap();
        doc.get_object_mut(pages_id)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set("Rotate", Object::Integer(90));
        let widget_id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "Rect" => vec![
                Object::Integer(72),
                Object::Integer(72),
                Object::Integer(216),
                Object::Integer(96),
            ],
            "P" => page_id,
        });
        doc.get_object_mut(page_id)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set("Annots", vec![Object::Reference(widget_id)]);
        let source = save(&mut doc);

        let signed = Compositor::default().composite(&source, &asset()).unwrap();
        let doc = Document::load_mem(&signed).unwrap();
        let first_page_id = doc.get_pages()[&1];
        let page = doc.get_dictionary(first_page_id).unwrap();
        assert_eq!(page.get(b"Rotate").unwrap().as_i64().unwrap(), 90);

        let annotations = page.get(b"Annots").unwrap().as_array().unwrap();
        assert_eq!(annotations.len(), 1);
        let widget = doc
            .get_dictionary(annotations[0].as_reference().unwrap())
            .unwrap();
        assert_eq!(widget.get(b"Subtype").unwrap().as_name_str().unwrap(), "Widget");
        assert_eq!(widget.get(b"P").unwrap().as_reference().unwrap(), first_page_id);
    }
}
