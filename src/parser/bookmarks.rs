//! Embedded bookmark (document outline) extraction.

use std::collections::{HashMap, HashSet};

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};

use super::backend::{decode_pdf_string, resolve, PageId, PdfBackend, RawOutlineItem};
use crate::error::Result;
use crate::model::{normalize_whitespace, BookmarkEntry};

/// Upper bound on outline nodes visited in one document.
const MAX_OUTLINE_NODES: usize = 10_000;

/// Upper bound on name tree depth and destination indirections.
const MAX_INDIRECTION: usize = 32;

/// Deepest bookmark level kept; deeper items collapse onto it.
const MAX_BOOKMARK_LEVEL: usize = 3;

/// Read the `/Outlines` tree in pre-order (node, children, next sibling).
///
/// Cyclic `/First` or `/Next` links are cut by a visited set; the walk also
/// stops after [`MAX_OUTLINE_NODES`] nodes.
pub(crate) fn read_outline_tree(
    doc: &LopdfDocument,
    pages: &[PageId],
) -> Result<Vec<RawOutlineItem>> {
    let Ok(catalog) = doc.catalog() else {
        log::debug!("Document has no catalog; no bookmarks");
        return Ok(Vec::new());
    };
    let first = catalog
        .get(b"Outlines")
        .ok()
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok())
        .and_then(|outlines| child_ref(outlines, b"First"));
    let Some(first) = first else {
        return Ok(Vec::new());
    };

    let resolver = DestinationResolver {
        doc,
        catalog,
        page_index: pages
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i as u32))
            .collect(),
        page_count: pages.len() as u32,
    };

    let mut items = Vec::new();
    let mut visited: HashSet<ObjectId> = HashSet::new();
    let mut stack = vec![(first, 1usize)];

    while let Some((id, depth)) = stack.pop() {
        if !visited.insert(id) {
            log::debug!("Outline node {:?} visited twice; cutting cycle", id);
            continue;
        }
        if visited.len() > MAX_OUTLINE_NODES {
            log::debug!("Outline walk stopped after {} nodes", MAX_OUTLINE_NODES);
            break;
        }
        let Ok(node) = doc.get_dictionary(id) else {
            log::debug!("Outline node {:?} is not a dictionary", id);
            continue;
        };

        let title = node
            .get(b"Title")
            .ok()
            .and_then(|o| resolve(doc, o))
            .and_then(decode_pdf_string)
            .unwrap_or_default();
        items.push(RawOutlineItem {
            title,
            depth,
            target_page: resolver.item_target(node),
        });

        // Pushed in reverse: children are popped before the next sibling.
        if let Some(next) = child_ref(node, b"Next") {
            stack.push((next, depth));
        }
        if let Some(child) = child_ref(node, b"First") {
            stack.push((child, depth + 1));
        }
    }

    Ok(items)
}

fn child_ref(dict: &Dictionary, key: &[u8]) -> Option<ObjectId> {
    dict.get(key).ok().and_then(|o| o.as_reference().ok())
}

/// Resolves outline destinations to 0-based page indices.
struct DestinationResolver<'a> {
    doc: &'a LopdfDocument,
    catalog: &'a Dictionary,
    page_index: HashMap<ObjectId, u32>,
    page_count: u32,
}

impl<'a> DestinationResolver<'a> {
    fn item_target(&self, node: &Dictionary) -> Option<u32> {
        if let Ok(dest) = node.get(b"Dest") {
            return self.destination(dest, 0);
        }

        let action = node
            .get(b"A")
            .ok()
            .and_then(|o| resolve(self.doc, o))
            .and_then(|o| o.as_dict().ok())?;
        let is_goto = action
            .get(b"S")
            .ok()
            .and_then(|o| o.as_name().ok())
            .map_or(true, |kind| kind == b"GoTo");
        if !is_goto {
            return None;
        }
        self.destination(action.get(b"D").ok()?, 0)
    }

    fn destination(&self, dest: &Object, hops: usize) -> Option<u32> {
        if hops > MAX_INDIRECTION {
            return None;
        }
        match resolve(self.doc, dest)? {
            Object::Array(arr) => self.page_of(arr.first()?),
            // Named destination values may be wrapped as << /D [...] >>
            Object::Dictionary(d) => self.destination(d.get(b"D").ok()?, hops + 1),
            Object::Name(name) => self.named(name, hops),
            Object::String(bytes, _) => self.named(bytes, hops),
            _ => None,
        }
    }

    fn page_of(&self, target: &Object) -> Option<u32> {
        match target {
            Object::Reference(id) => self.page_index.get(id).copied(),
            Object::Integer(i) => u32::try_from(*i).ok().filter(|i| *i < self.page_count),
            _ => None,
        }
    }

    fn named(&self, name: &[u8], hops: usize) -> Option<u32> {
        let doc = self.doc;
        let dict_at = |dict: &'a Dictionary, key: &[u8]| {
            dict.get(key)
                .ok()
                .and_then(|o| resolve(doc, o))
                .and_then(|o| o.as_dict().ok())
        };

        // PDF 1.1 style: /Dests dictionary in the catalog
        if let Some(value) = dict_at(self.catalog, b"Dests").and_then(|d| d.get(name).ok()) {
            return self.destination(value, hops + 1);
        }

        let tree = dict_at(self.catalog, b"Names").and_then(|names| dict_at(names, b"Dests"))?;
        let value = lookup_name_tree(doc, tree, name, 0)?;
        self.destination(value, hops + 1)
    }
}

/// Look up a key in a name tree (`/Names` leaves, `/Kids` intermediates).
fn lookup_name_tree<'a>(
    doc: &'a LopdfDocument,
    node: &'a Dictionary,
    key: &[u8],
    depth: usize,
) -> Option<&'a Object> {
    if depth > MAX_INDIRECTION {
        return None;
    }

    if let Some(names) = node
        .get(b"Names")
        .ok()
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_array().ok())
    {
        for pair in names.chunks_exact(2) {
            if let Some(Object::String(bytes, _)) = resolve(doc, &pair[0]) {
                if bytes.as_slice() == key {
                    return Some(&pair[1]);
                }
            }
        }
    }

    node.get(b"Kids")
        .ok()
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_array().ok())?
        .iter()
        .filter_map(|kid| resolve(doc, kid))
        .filter_map(|kid| kid.as_dict().ok())
        .find_map(|kid| lookup_name_tree(doc, kid, key, depth + 1))
}

/// Usable bookmark entries, in outline order.
///
/// Items with an empty title or an unresolvable / out-of-range target are
/// dropped; their children were already flattened and are kept. Levels
/// deeper than 3 collapse to 3.
pub fn extract_bookmarks(backend: &dyn PdfBackend) -> Vec<BookmarkEntry> {
    let items = match backend.outline_items() {
        Ok(items) => items,
        Err(e) => {
            log::debug!("Bookmarks unreadable: {}", e);
            return Vec::new();
        }
    };
    let page_count = backend.page_count();

    items
        .into_iter()
        .filter_map(|item| {
            let title = normalize_whitespace(&item.title);
            if title.is_empty() {
                log::debug!("Skipping bookmark with empty title");
                return None;
            }
            let Some(page) = item.target_page.filter(|p| *p < page_count) else {
                log::debug!("Skipping bookmark '{}': no resolvable target page", title);
                return None;
            };
            let level = item.depth.clamp(1, MAX_BOOKMARK_LEVEL) as u8;
            Some(BookmarkEntry::new(title, level, page))
        })
        .collect()
}

/// Whether a bookmark list is worth using as the outline.
///
/// A single entry typically spans the whole document and says nothing about
/// its structure.
pub fn is_plausible(entries: &[BookmarkEntry]) -> bool {
    entries.len() >= 2
}
