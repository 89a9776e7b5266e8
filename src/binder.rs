//! Segment binder: apply a display style to the element(s) of one segment.
//!
//! An element belongs to segment `(d, s)` when its class list contains both
//! `dig-{d+1}` and `seg-{letter}`. Every matching element is styled. The
//! `fill` and `opacity` declarations of its inline style are replaced; any
//! other declarations the artwork put there are kept.

use crate::color::DisplayStyle;
use crate::svg::SvgDocument;
use crate::{SegmentAddress, SimError};

/// Style every element of `address`. Returns how many elements were styled.
///
/// No document yet (the artwork has not loaded) is a no-op returning 0.
/// A document without any matching element yields `MissingElement`, which
/// callers treat as a no-op as well.
pub fn apply_style(
    document: Option<&mut SvgDocument>,
    address: SegmentAddress,
    style: &DisplayStyle,
) -> Result<usize, SimError> {
    let Some(document) = document else {
        return Ok(0);
    };

    let digit_class = address.digit_class();
    let segment_class = address.segment_class();
    let targets = document.select_by_classes(&[digit_class.as_str(), segment_class.as_str()]);
    if targets.is_empty() {
        return Err(SimError::MissingElement(address));
    }

    let declarations = style.declarations();
    for &id in &targets {
        let existing = document.attribute(id, "style")?;
        let merged = merge_style(existing.as_deref(), &declarations);
        document.set_attribute(id, "style", &merged)?;
    }
    Ok(targets.len())
}

/// Merge `updates` into an inline CSS declaration list.
///
/// Properties already present are overwritten in place, new ones are
/// appended in the order given. Output is normalized to `name: value`
/// pairs joined by `"; "`.
pub fn merge_style(existing: Option<&str>, updates: &[(&str, String)]) -> String {
    let mut declarations: Vec<(String, String)> = existing
        .unwrap_or_default()
        .split(';')
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_ascii_lowercase(), value.trim().to_string()))
        })
        .collect();

    for (name, value) in updates {
        match declarations.iter_mut().find(|(n, _)| n.as_str() == *name) {
            Some(slot) => slot.1 = value.clone(),
            None => declarations.push((name.to_string(), value.clone())),
        }
    }

    declarations
        .iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const ARTWORK: &str = r#"<svg xmlns="http://www.w3.org/2000/svg">
  <path class="dig-1 seg-a"/>
  <path class="dig-1 seg-b" style="stroke: black; fill: red"/>
  <path class="dig-4 seg-g"/>
  <path class="seg-g dig-4 highlight"/>
</svg>"#;

    fn style(hex: &str) -> DisplayStyle {
        DisplayStyle::from_segment_color(hex.parse().unwrap())
    }

    fn style_of(doc: &SvgDocument, classes: &[&str]) -> Vec<Option<String>> {
        doc.select_by_classes(classes)
            .into_iter()
            .map(|id| doc.attribute(id, "style").unwrap())
            .collect()
    }

    #[test]
    fn styles_the_addressed_element() {
        let mut doc = SvgDocument::parse(ARTWORK).unwrap();
        let addr = SegmentAddress::new(0, 0).unwrap();

        let styled = apply_style(Some(&mut doc), addr, &style("ff0000")).unwrap();

        assert_eq!(styled, 1);
        assert_eq!(
            style_of(&doc, &["dig-1", "seg-a"]),
            vec![Some("fill: rgb(255,0,0); opacity: 0.5".to_string())]
        );
        // neighbours untouched
        assert_eq!(style_of(&doc, &["dig-4", "seg-g"]), vec![None, None]);
    }

    #[test]
    fn styles_every_match() {
        let mut doc = SvgDocument::parse(ARTWORK).unwrap();
        let addr = SegmentAddress::new(3, 6).unwrap();

        let styled = apply_style(Some(&mut doc), addr, &style("ffffff")).unwrap();

        assert_eq!(styled, 2);
        for s in style_of(&doc, &["dig-4", "seg-g"]) {
            assert_eq!(s.as_deref(), Some("fill: rgb(255,255,255); opacity: 1"));
        }
    }

    #[test]
    fn keeps_unrelated_declarations() {
        let mut doc = SvgDocument::parse(ARTWORK).unwrap();
        let addr = SegmentAddress::new(0, 1).unwrap();

        apply_style(Some(&mut doc), addr, &style("000000")).unwrap();

        assert_eq!(
            style_of(&doc, &["dig-1", "seg-b"]),
            vec![Some("stroke: black; fill: rgb(0,0,0); opacity: 0".to_string())]
        );
    }

    #[test]
    fn missing_element_leaves_document_untouched() {
        let mut doc = SvgDocument::parse(ARTWORK).unwrap();
        let before = doc.to_svg_string().unwrap();
        let addr = SegmentAddress::new(2, 2).unwrap();

        let err = apply_style(Some(&mut doc), addr, &style("ffffff")).unwrap_err();

        assert!(matches!(err, SimError::MissingElement(a) if a == addr));
        assert_eq!(doc.to_svg_string().unwrap(), before);
    }

    #[test]
    fn missing_document_is_a_noop() {
        let addr = SegmentAddress::new(0, 0).unwrap();
        assert_eq!(apply_style(None, addr, &style("ffffff")).unwrap(), 0);
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let mut doc = SvgDocument::parse(ARTWORK).unwrap();
        let addr = SegmentAddress::new(0, 1).unwrap();

        apply_style(Some(&mut doc), addr, &style("102030")).unwrap();
        let once = doc.to_svg_string().unwrap();
        apply_style(Some(&mut doc), addr, &style("102030")).unwrap();

        assert_eq!(doc.to_svg_string().unwrap(), once);
    }

    // ── merge_style ────────────────────────────────────────────────

    fn updates() -> Vec<(&'static str, String)> {
        vec![("fill", "rgb(1,2,3)".into()), ("opacity", "0.5".into())]
    }

    #[rstest]
    #[case(None, "fill: rgb(1,2,3); opacity: 0.5")]
    #[case(Some(""), "fill: rgb(1,2,3); opacity: 0.5")]
    #[case(Some("opacity:1;fill:#fff"), "opacity: 0.5; fill: rgb(1,2,3)")]
    #[case(Some("stroke-width: 2;"), "stroke-width: 2; fill: rgb(1,2,3); opacity: 0.5")]
    #[case(Some("FILL: red"), "fill: rgb(1,2,3); opacity: 0.5")]
    #[case(Some("garbage; stroke: none"), "stroke: none; fill: rgb(1,2,3); opacity: 0.5")]
    fn merge_style_cases(#[case] existing: Option<&str>, #[case] expected: &str) {
        assert_eq!(merge_style(existing, &updates()), expected);
    }
}
