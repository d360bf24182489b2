use crate::Error;
use lopdf::{Dictionary, Document, Object, ObjectId};

pub(crate) trait PdfObjectDeref {
    fn deref<'a>(&'a self, doc: &'a Document) -> Result<&'a Object, Error>;

    fn get_object_id(&self) -> Option<ObjectId>;
}

impl PdfObjectDeref for Object {
    fn deref<'a>(&'a self, doc: &'a Document) -> Result<&'a Object, Error> {
        match *self {
            Object::Reference(oid) => doc
                .objects
                .get(&oid)
                .ok_or(Error::LoPdfError(lopdf::Error::ObjectNotFound)),
            _ => Ok(self),
        }
    }

    fn get_object_id(&self) -> Option<ObjectId> {
        match *self {
            Object::Reference(ref id) => Some(*id),
            _ => None,
        }
    }
}

/// Page attributes like `MediaBox`, `Resources` and `Rotate` can be set on any
/// ancestor in the page tree. Walk up `Parent` until the key is found.
/// The returned object is dereferenced.
pub(crate) fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>, Error> {
    let mut node: &Dictionary = doc.get_object(page_id)?.as_dict()?;
    // Guard against `Parent` cycles in broken files.
    for _ in 0..64 {
        if let Ok(value) = node.get(key) {
            return Ok(Some(value.deref(doc)?));
        }
        match node.get(b"Parent").ok().and_then(|parent| parent.get_object_id()) {
            Some(parent_id) => node = doc.get_object(parent_id)?.as_dict()?,
            None => return Ok(None),
        }
    }
    log::warn!("Page tree is nested too deep while looking up inherited attribute.");
    Ok(None)
}
