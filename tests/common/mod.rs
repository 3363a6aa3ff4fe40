//! Synthetic PDF documents for integration tests.

#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

/// One line of text placed with `Td`.
#[derive(Debug, Clone)]
pub struct Line {
    pub text: String,
    pub size: f32,
    pub bold: bool,
    pub x: f32,
    pub y: f32,
}

/// Regular text.
pub fn text(text: &str, size: f32, y: f32) -> Line {
    Line {
        text: text.to_string(),
        size,
        bold: false,
        x: 72.0,
        y,
    }
}

/// Bold text.
pub fn bold(text: &str, size: f32, y: f32) -> Line {
    Line {
        bold: true,
        ..self::text(text, size, y)
    }
}

/// `count` lines of 10pt body text starting at `top`.
pub fn body(count: usize, top: f32) -> Vec<Line> {
    (0..count)
        .map(|i| {
            text(
                "Ordinary paragraph text that makes up the bulk of every page.",
                10.0,
                top - i as f32 * 14.0,
            )
        })
        .collect()
}

enum PageSpec {
    Lines(Vec<Line>),
    Corrupt,
}

/// Builds small but complete PDF files with lopdf.
#[derive(Default)]
pub struct PdfBuilder {
    pages: Vec<PageSpec>,
    title: Option<String>,
    bookmarks: Vec<(String, usize, usize)>,
    untyped_fonts: bool,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page with the given lines.
    pub fn page(mut self, lines: Vec<Line>) -> Self {
        self.pages.push(PageSpec::Lines(lines));
        self
    }

    /// Append a page whose `/Contents` is not a stream.
    pub fn corrupt_page(mut self) -> Self {
        self.pages.push(PageSpec::Corrupt);
        self
    }

    /// Set the Info dictionary `/Title`.
    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    /// Add a bookmark at `depth` (1 = top level) pointing at page `page`.
    pub fn bookmark(mut self, title: &str, depth: usize, page: usize) -> Self {
        self.bookmarks.push((title.to_string(), depth, page));
        self
    }

    /// Leave `/Type /Font` out of the font dictionaries.
    pub fn untyped_fonts(mut self) -> Self {
        self.untyped_fonts = true;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut regular = font("Helvetica");
        let mut heavy = font("Helvetica-Bold");
        if self.untyped_fonts {
            regular.remove(b"Type");
            heavy.remove(b"Type");
        }
        let regular = doc.add_object(regular);
        let heavy = doc.add_object(heavy);
        let resources = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => regular,
                "F2" => heavy,
            },
        });

        let mut page_ids = Vec::new();
        for spec in &self.pages {
            let contents = match spec {
                PageSpec::Lines(lines) => {
                    let stream = Stream::new(dictionary! {}, content_stream(lines));
                    Object::Reference(doc.add_object(stream))
                }
                PageSpec::Corrupt => Object::Integer(42),
            };
            page_ids.push(doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![Object::Integer(0), 0.into(), 612.into(), 792.into()],
                "Resources" => resources,
                "Contents" => contents,
            }));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
                "Count" => page_ids.len() as i64,
            }),
        );

        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        };
        if !self.bookmarks.is_empty() {
            let root = add_outline(&mut doc, &self.bookmarks, &page_ids);
            catalog.set("Outlines", root);
        }
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", catalog_id);

        if let Some(title) = &self.title {
            let info = doc.add_object(dictionary! {
                "Title" => Object::string_literal(title.as_str()),
                "Producer" => Object::string_literal("pdfoutline tests"),
            });
            doc.trailer.set("Info", info);
        }

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }
}

fn font(base: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    }
}

fn content_stream(lines: &[Line]) -> Vec<u8> {
    let mut operations = Vec::new();
    for line in lines {
        let font = if line.bold { "F2" } else { "F1" };
        operations.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![
                    Object::Name(font.as_bytes().to_vec()),
                    Object::Real(line.size.into()),
                ],
            ),
            Operation::new(
                "Td",
                vec![Object::Real(line.x.into()), Object::Real(line.y.into())],
            ),
            Operation::new("Tj", vec![Object::string_literal(line.text.as_str())]),
            Operation::new("ET", vec![]),
        ]);
    }
    Content { operations }.encode().unwrap()
}

/// Build a nested outline from a flat pre-order list of (title, depth, page).
fn add_outline(
    doc: &mut Document,
    entries: &[(String, usize, usize)],
    pages: &[ObjectId],
) -> ObjectId {
    let root = doc.new_object_id();
    let ids: Vec<ObjectId> = entries.iter().map(|_| doc.new_object_id()).collect();

    // Parent of each entry, found through a stack of open ancestors
    let mut stack: Vec<ObjectId> = vec![root];
    let mut children: Vec<(ObjectId, Vec<ObjectId>)> = vec![(root, Vec::new())];
    let mut items = Vec::new();
    for ((title, depth, page), id) in entries.iter().zip(&ids) {
        stack.truncate((*depth).max(1));
        let parent = *stack.last().unwrap();
        match children.iter_mut().find(|(p, _)| *p == parent) {
            Some((_, kids)) => kids.push(*id),
            None => children.push((parent, vec![*id])),
        }
        stack.push(*id);

        items.push((
            *id,
            dictionary! {
                "Title" => Object::string_literal(title.as_str()),
                "Parent" => parent,
                "Dest" => vec![Object::Reference(pages[*page]), "Fit".into()],
            },
        ));
    }

    let mut root_dict = dictionary! { "Type" => "Outlines" };
    for (parent, kids) in &children {
        for pair in kids.windows(2) {
            if let Some((_, dict)) = items.iter_mut().find(|(id, _)| *id == pair[0]) {
                dict.set("Next", pair[1]);
            }
        }
        let (Some(first), Some(last)) = (kids.first(), kids.last()) else {
            continue;
        };
        let target = if *parent == root {
            &mut root_dict
        } else {
            match items.iter_mut().find(|(id, _)| *id == *parent) {
                Some((_, dict)) => dict,
                None => continue,
            }
        };
        target.set("First", *first);
        target.set("Last", *last);
        target.set("Count", kids.len() as i64);
    }

    for (id, dict) in items {
        doc.objects.insert(id, Object::Dictionary(dict));
    }
    doc.objects.insert(root, Object::Dictionary(root_dict));
    root
}
