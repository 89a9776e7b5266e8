//! In-memory SVG document: just enough DOM for the segment schematic.
//!
//! The artwork is read once with `quick-xml` into a flat list of events.
//! Elements below the root are indexed together with their class lists, so
//! a compound class query (`.dig-1.seg-a`) is a scan over a small table.
//! Editing an attribute rebuilds that one start tag in place; serializing
//! writes the events back out unchanged otherwise.
//!
//! ## Rust concepts
//! - `Event<'static>` via `into_owned()` so the document outlives its source text
//! - Newtype index (`ElementId`) instead of references into the tree
//! - `Arc<Mutex<T>>` for a document shared by the driver and the HTTP server

use crate::SimError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::borrow::Cow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Position of an element's start tag in the document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ElementId(usize);

#[derive(Debug)]
struct ElementEntry {
    id: ElementId,
    classes: Vec<String>,
}

/// Parsed SVG artwork.
#[derive(Debug)]
pub struct SvgDocument {
    events: Vec<Event<'static>>,
    /// Descendants of the root element, in document order.
    elements: Vec<ElementEntry>,
    root: ElementId,
}

impl SvgDocument {
    /// Parse SVG source. The document element must be `<svg>`.
    pub fn parse(source: &str) -> Result<Self, SimError> {
        let mut reader = Reader::from_str(source);
        let mut events = Vec::new();
        let mut elements = Vec::new();
        let mut root = None;
        let mut depth = 0usize;

        loop {
            let event = reader.read_event().map_err(|e| {
                SimError::Svg(format!("at byte {}: {e}", reader.buffer_position()))
            })?;
            let id = ElementId(events.len());

            match &event {
                Event::Eof => break,
                Event::Start(start) | Event::Empty(start) => {
                    if depth == 0 {
                        if root.is_some() {
                            return Err(SimError::Svg("more than one root element".into()));
                        }
                        if start.local_name().as_ref() != b"svg" {
                            let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                            return Err(SimError::Svg(format!(
                                "document element is <{name}>, expected <svg>"
                            )));
                        }
                        root = Some(id);
                    } else {
                        elements.push(ElementEntry {
                            id,
                            classes: class_list(start)?,
                        });
                    }
                    if matches!(event, Event::Start(_)) {
                        depth += 1;
                    }
                }
                Event::End(_) => depth = depth.saturating_sub(1),
                _ => {}
            }

            events.push(event.into_owned());
        }

        let root = root.ok_or_else(|| SimError::Svg("document has no root element".into()))?;
        Ok(Self {
            events,
            elements,
            root,
        })
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    /// Number of elements below the root.
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Descendants of the root that carry every class in `classes`.
    pub fn select_by_classes(&self, classes: &[&str]) -> Vec<ElementId> {
        self.elements
            .iter()
            .filter(|entry| {
                classes
                    .iter()
                    .all(|wanted| entry.classes.iter().any(|c| c == *wanted))
            })
            .map(|entry| entry.id)
            .collect()
    }

    /// Unescaped value of attribute `name` on `id`, if present.
    pub fn attribute(&self, id: ElementId, name: &str) -> Result<Option<String>, SimError> {
        let start = self.start_tag(id)?;
        for attr in start.attributes() {
            let attr = attr.map_err(SimError::svg)?;
            if attr.key.as_ref() == name.as_bytes() {
                let value = attr.unescape_value().map_err(SimError::svg)?;
                return Ok(Some(value.into_owned()));
            }
        }
        Ok(None)
    }

    /// Set attribute `name` on `id`, replacing any existing value. Other
    /// attributes keep their order.
    pub fn set_attribute(&mut self, id: ElementId, name: &str, value: &str) -> Result<(), SimError> {
        let start = self.start_tag(id)?;
        let tag = std::str::from_utf8(start.name().as_ref())
            .map_err(SimError::svg)?
            .to_owned();

        let mut rebuilt = BytesStart::new(tag);
        let mut replaced = false;
        for attr in start.attributes() {
            let mut attr = attr.map_err(SimError::svg)?;
            if attr.key.as_ref() == name.as_bytes() {
                rebuilt.push_attribute((name, value));
                replaced = true;
            } else {
                // Copied raw: entity references stay unresolved.
                if attr.value.contains(&b'"') {
                    attr.value = Cow::Owned(requote(&attr.value));
                }
                rebuilt.push_attribute(attr);
            }
        }
        if !replaced {
            rebuilt.push_attribute((name, value));
        }

        let self_closing = matches!(self.events[id.0], Event::Empty(_));
        self.events[id.0] = if self_closing {
            Event::Empty(rebuilt)
        } else {
            Event::Start(rebuilt)
        };

        if name == "class" {
            if let Some(entry) = self.elements.iter_mut().find(|e| e.id == id) {
                entry.classes = value.split_whitespace().map(String::from).collect();
            }
        }
        Ok(())
    }

    /// Serialize the document, including any edits.
    pub fn to_svg_string(&self) -> Result<String, SimError> {
        let mut writer = Writer::new(Vec::new());
        for event in &self.events {
            writer.write_event(event.clone()).map_err(SimError::svg)?;
        }
        String::from_utf8(writer.into_inner()).map_err(SimError::svg)
    }

    fn start_tag(&self, id: ElementId) -> Result<&BytesStart<'static>, SimError> {
        match self.events.get(id.0) {
            Some(Event::Start(start)) | Some(Event::Empty(start)) => Ok(start),
            _ => Err(SimError::Svg(format!("no element at position {}", id.0))),
        }
    }
}

/// Escape `"` in a raw single-quoted value so it can be written between
/// double quotes.
fn requote(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len() + 8);
    for &b in raw {
        if b == b'"' {
            out.extend_from_slice(b"&quot;");
        } else {
            out.push(b);
        }
    }
    out
}

fn class_list(start: &BytesStart<'_>) -> Result<Vec<String>, SimError> {
    for attr in start.attributes() {
        let attr = attr.map_err(SimError::svg)?;
        if attr.key.as_ref() == b"class" {
            let value = attr.unescape_value().map_err(SimError::svg)?;
            return Ok(value.split_whitespace().map(String::from).collect());
        }
    }
    Ok(Vec::new())
}

// ── Shared handle ────────────────────────────────────────────────────

/// Handle to the loaded artwork, shared between the driver (writer) and
/// the HTTP server (reader).
///
/// Rust concept: Arc<Mutex<T>>
/// Cloning the handle clones the `Arc`, not the document. A rendering pass
/// holds the lock for its whole duration, so readers only ever see the
/// document between passes.
#[derive(Clone, Debug)]
pub struct SvgHandle(Arc<Mutex<SvgDocument>>);

impl SvgHandle {
    pub fn new(document: SvgDocument) -> Self {
        Self(Arc::new(Mutex::new(document)))
    }

    /// Lock the document. A poisoned lock still yields the document: a
    /// pass that panicked mid-way leaves valid (if partly updated) styles.
    pub fn lock(&self) -> MutexGuard<'_, SvgDocument> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ARTWORK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" class="dig-1 seg-a" viewBox="0 0 100 40">
  <g id="digit1">
    <path class="dig-1 seg-a" d="M0 0h10"/>
    <path class="seg-b  dig-1" d="M10 0v10" style="stroke: #000"/>
    <path class="dig-2 seg-a" d="M20 0h10"></path>
  </g>
  <text x="1" y="2">Tom &amp; Jerry</text>
</svg>
"#;

    fn doc() -> SvgDocument {
        SvgDocument::parse(ARTWORK).unwrap()
    }

    #[test]
    fn parse_indexes_descendants_only() {
        // g, three paths, text
        assert_eq!(doc().element_count(), 5);
    }

    #[test]
    fn select_requires_every_class() {
        let doc = doc();
        assert_eq!(doc.select_by_classes(&["dig-1", "seg-a"]).len(), 1);
        assert_eq!(doc.select_by_classes(&["dig-1"]).len(), 2);
        assert_eq!(doc.select_by_classes(&["dig-2", "seg-b"]).len(), 0);
    }

    #[test]
    fn select_ignores_root_classes() {
        let doc = doc();
        let hits = doc.select_by_classes(&["dig-1", "seg-a"]);
        assert!(!hits.contains(&doc.root()));
    }

    #[test]
    fn class_list_tolerates_extra_whitespace() {
        assert_eq!(doc().select_by_classes(&["seg-b", "dig-1"]).len(), 1);
    }

    #[test]
    fn attribute_reads_unescaped_value() {
        let doc = doc();
        let id = doc.select_by_classes(&["seg-b"])[0];
        assert_eq!(doc.attribute(id, "style").unwrap().as_deref(), Some("stroke: #000"));
        assert_eq!(doc.attribute(id, "fill").unwrap(), None);
    }

    #[test]
    fn set_attribute_adds_then_replaces() {
        let mut doc = doc();
        let id = doc.select_by_classes(&["dig-2", "seg-a"])[0];

        doc.set_attribute(id, "style", "opacity: 0").unwrap();
        doc.set_attribute(id, "style", "opacity: 1").unwrap();

        assert_eq!(doc.attribute(id, "style").unwrap().as_deref(), Some("opacity: 1"));
        let out = doc.to_svg_string().unwrap();
        assert!(out.contains(r#"<path class="dig-2 seg-a" d="M20 0h10" style="opacity: 1"></path>"#));
    }

    #[test]
    fn set_attribute_keeps_self_closing_tags() {
        let mut doc = doc();
        let id = doc.select_by_classes(&["dig-1", "seg-a"])[0];
        doc.set_attribute(id, "style", "fill: rgb(1,2,3)").unwrap();

        let out = doc.to_svg_string().unwrap();
        assert!(out.contains(r#"<path class="dig-1 seg-a" d="M0 0h10" style="fill: rgb(1,2,3)"/>"#));
    }

    #[test]
    fn set_class_updates_the_index() {
        let mut doc = doc();
        let id = doc.select_by_classes(&["dig-2", "seg-a"])[0];
        doc.set_attribute(id, "class", "dig-3 seg-c").unwrap();

        assert!(doc.select_by_classes(&["dig-2", "seg-a"]).is_empty());
        assert_eq!(doc.select_by_classes(&["dig-3", "seg-c"]), vec![id]);
    }

    #[test]
    fn unedited_document_serializes_unchanged() {
        assert_eq!(doc().to_svg_string().unwrap(), ARTWORK);
    }

    #[test]
    fn set_attribute_keeps_other_attributes_raw() {
        let source = r#"<!DOCTYPE svg [<!ENTITY st "stroke">]>
<svg xmlns="http://www.w3.org/2000/svg"><path class="dig-1 seg-a" data-kind="&st;" title='say "hi"'/></svg>"#;
        let mut doc = SvgDocument::parse(source).unwrap();
        let id = doc.select_by_classes(&["dig-1", "seg-a"])[0];

        doc.set_attribute(id, "style", "opacity: 1").unwrap();

        let out = doc.to_svg_string().unwrap();
        assert!(out.contains(
            r#"<path class="dig-1 seg-a" data-kind="&st;" title="say &quot;hi&quot;" style="opacity: 1"/>"#
        ));
        assert_eq!(doc.attribute(id, "title").unwrap().as_deref(), Some(r#"say "hi""#));
    }

    #[test]
    fn parse_rejects_non_svg_root() {
        let err = SvgDocument::parse("<html><body/></html>").unwrap_err();
        assert!(err.to_string().contains("expected <svg>"));
    }

    #[test]
    fn parse_rejects_mismatched_tags() {
        assert!(SvgDocument::parse("<svg><g></svg>").is_err());
    }

    #[test]
    fn parse_rejects_empty_source() {
        assert!(SvgDocument::parse("").is_err());
    }

    #[test]
    fn handle_shares_one_document() {
        let handle = SvgHandle::new(doc());
        let other = handle.clone();
        let id = handle.lock().select_by_classes(&["dig-2"])[0];
        handle.lock().set_attribute(id, "style", "opacity: 0.5").unwrap();
        assert_eq!(
            other.lock().attribute(id, "style").unwrap().as_deref(),
            Some("opacity: 0.5")
        );
    }
}
