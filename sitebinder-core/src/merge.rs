//! Concatenating rendered pages into one document.
//!
//! [`LopdfMerger`] renumbers the objects of each input so they can live in a
//! single object table, then rebuilds one page tree whose kids are every
//! input page, in input order. Attributes a page inherits from its own
//! tree are copied onto the page first, since that tree is discarded.

use crate::error::MergeError;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Merge collaborator. Output page order follows input order.
pub trait Merger: Send + Sync {
    fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<(), MergeError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfMerger;

impl LopdfMerger {
    pub fn new() -> Self {
        Self
    }
}

impl Merger for LopdfMerger {
    fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<(), MergeError> {
        if inputs.is_empty() {
            return Err(MergeError::NoInputs);
        }

        let mut documents = Vec::with_capacity(inputs.len());
        for input in inputs {
            debug!("Loading {}", input.display());
            documents.push(Document::load(input)?);
        }

        let mut merged = merge_documents(documents)?;

        if let Some(parent) = output.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        merged.save(output)?;

        info!("Merged {} document(s) into {}", inputs.len(), output.display());
        Ok(())
    }
}

fn type_name(object: &Object) -> Option<&[u8]> {
    object
        .as_dict()
        .ok()
        .and_then(|dict| dict.get(b"Type").ok())
        .and_then(|t| t.as_name().ok())
}

// Page attributes that may live on an ancestor `Pages` node.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

const MAX_TREE_DEPTH: usize = 32;

/// The page dictionary with inherited attributes made explicit.
fn with_inherited(doc: &Document, page_id: ObjectId) -> Result<Dictionary, MergeError> {
    let malformed = |e: lopdf::Error| MergeError::Malformed(format!("{:?}", page_id), e.to_string());

    let mut page = doc.get_dictionary(page_id).map_err(malformed)?.clone();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;

    while let Some(node_id) = parent {
        depth += 1;
        if depth > MAX_TREE_DEPTH {
            return Err(MergeError::Malformed(
                format!("{:?}", page_id),
                "page tree too deep".into(),
            ));
        }

        let node = doc.get_dictionary(node_id).map_err(malformed)?;
        for key in INHERITABLE {
            if !page.has(key)
                && let Ok(value) = node.get(key)
            {
                page.set(key, value.clone());
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    Ok(page)
}

pub fn merge_documents(documents: Vec<Document>) -> Result<Document, MergeError> {
    let mut max_id = 1;
    // Input order, then page order within each input.
    let mut pages: Vec<(ObjectId, Object)> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for mut doc in documents {
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        for (_, page_id) in doc.get_pages() {
            let page = with_inherited(&doc, page_id)?;
            pages.push((page_id, Object::Dictionary(page)));
        }
        objects.extend(doc.objects);
    }

    let mut document = Document::with_version("1.5");
    let mut catalog: Option<(ObjectId, Object)> = None;
    let mut page_tree: Option<(ObjectId, Object)> = None;

    for (object_id, object) in objects {
        let kind = type_name(&object).map(<[u8]>::to_vec);
        match kind.as_deref() {
            Some(b"Catalog") => {
                if catalog.is_none() {
                    catalog = Some((object_id, object));
                }
            }
            Some(b"Pages") => {
                if let Ok(dictionary) = object.as_dict() {
                    let mut dictionary = dictionary.clone();
                    let id = match page_tree {
                        Some((id, ref existing)) => {
                            if let Ok(existing) = existing.as_dict() {
                                dictionary.extend(existing);
                            }
                            id
                        }
                        None => object_id,
                    };
                    page_tree = Some((id, Object::Dictionary(dictionary)));
                }
            }
            // Pages are rebuilt below; outlines would point at stale page trees.
            Some(b"Page") | Some(b"Outlines") | Some(b"Outline") => {}
            _ => {
                document.objects.insert(object_id, object);
            }
        }
    }

    let (pages_id, pages_object) = page_tree
        .ok_or_else(|| MergeError::Malformed("input".into(), "no page tree".into()))?;
    let (catalog_id, catalog_object) = catalog
        .ok_or_else(|| MergeError::Malformed("input".into(), "no catalog".into()))?;

    let page_count = pages.len() as i64;
    let kids: Vec<Object> = pages.iter().map(|(id, _)| Object::Reference(*id)).collect();

    for (page_id, page) in pages {
        if let Ok(dictionary) = page.as_dict() {
            let mut dictionary = dictionary.clone();
            dictionary.set("Parent", pages_id);
            document.objects.insert(page_id, Object::Dictionary(dictionary));
        }
    }

    if let Ok(dictionary) = pages_object.as_dict() {
        let mut dictionary = dictionary.clone();
        dictionary.remove(b"Parent");
        dictionary.set("Count", page_count);
        dictionary.set("Kids", kids);
        document.objects.insert(pages_id, Object::Dictionary(dictionary));
    }

    if let Ok(dictionary) = catalog_object.as_dict() {
        let mut dictionary = dictionary.clone();
        dictionary.set("Pages", pages_id);
        dictionary.remove(b"Outlines");
        document.objects.insert(catalog_id, Object::Dictionary(dictionary));
    }

    document.trailer.set("Root", catalog_id);
    document.max_id = document.objects.len() as u32;
    document.renumber_objects();
    document.compress();

    Ok(document)
}
