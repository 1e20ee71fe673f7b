//! Snapshot rendering helpers.
//!
//! Functions for converting an element subtree into compact markup suitable
//! for snapshot testing and assertions. Bind specs are omitted so snapshots
//! show only what data produced.

use std::fmt::Write;

use crate::dom::{Dom, ElementId, BIND_ATTRIBUTE};

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Render `element` and its subtree as single-line markup.
///
/// Attributes appear in name order; text content comes before children.
///
/// # Examples
///
/// ```
/// use dtw::dom::{Dom, ElementData};
/// use dtw::testing::render_to_string;
///
/// let mut dom = Dom::new();
/// let p = dom.insert(ElementData::new("p").with_class("note").with_text("Hi"));
/// assert_eq!(render_to_string(&dom, p), r#"<p class="note">Hi</p>"#);
/// ```
pub fn render_to_string(dom: &Dom, element: ElementId) -> String {
    let mut out = String::new();
    write_element(dom, element, None, 0, &mut out);
    out
}

/// Render `element` one tag per line, indented two spaces per level.
pub fn render_pretty(dom: &Dom, element: ElementId) -> String {
    let mut out = String::new();
    write_element(dom, element, Some(2), 0, &mut out);
    out.truncate(out.trim_end().len());
    out
}

/// Concatenated markup of `container`'s children, without the container.
pub fn render_children(dom: &Dom, container: ElementId) -> String {
    dom.children(container)
        .iter()
        .map(|&child| render_to_string(dom, child))
        .collect()
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

fn write_element(dom: &Dom, element: ElementId, indent: Option<usize>, depth: usize, out: &mut String) {
    let Some(data) = dom.get(element) else {
        return;
    };
    let pad = indent.map(|width| " ".repeat(width * depth)).unwrap_or_default();

    let _ = write!(out, "{pad}<{}", data.tag);
    for (name, value) in &data.attributes {
        if name == BIND_ATTRIBUTE {
            continue;
        }
        let _ = write!(out, " {name}=\"{}\"", escape(value, true));
    }
    out.push('>');

    let children = dom.children(element);
    let text = data.text.as_deref().unwrap_or("");
    match indent {
        Some(width) if !children.is_empty() => {
            out.push('\n');
            if !text.is_empty() {
                let _ = writeln!(out, "{pad}{}{}", " ".repeat(width), escape(text, false));
            }
            for &child in children {
                write_element(dom, child, indent, depth + 1, out);
            }
            let _ = writeln!(out, "{pad}</{}>", data.tag);
        }
        _ => {
            out.push_str(&escape(text, false));
            for &child in children {
                write_element(dom, child, None, 0, out);
            }
            let _ = write!(out, "</{}>", data.tag);
            if indent.is_some() {
                out.push('\n');
            }
        }
    }
}

fn escape(text: &str, attribute: bool) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '"' if attribute => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ElementData;

    fn sample() -> (Dom, ElementId) {
        let mut dom = Dom::new();
        let list = dom.insert(ElementData::new("ul").with_id("list").with_bind("x"));
        dom.insert_child(list, ElementData::new("li").with_text("a & b"));
        let second = dom.insert_child(list, ElementData::new("li").with_attr("title", "say \"hi\""));
        dom.insert_child(second, ElementData::new("b").with_text("<2>"));
        (dom, list)
    }

    #[test]
    fn compact_markup_omits_bind_spec() {
        let (dom, list) = sample();
        assert_eq!(
            render_to_string(&dom, list),
            r#"<ul id="list"><li>a &amp; b</li><li title="say &quot;hi&quot;"><b>&lt;2></b></li></ul>"#
        );
    }

    #[test]
    fn children_only() {
        let (dom, list) = sample();
        assert!(render_children(&dom, list).starts_with("<li>a &amp; b</li><li"));
    }

    #[test]
    fn pretty_markup() {
        let (dom, list) = sample();
        insta::assert_snapshot!(render_pretty(&dom, list), @r###"
        <ul id="list">
          <li>a &amp; b</li>
          <li title="say &quot;hi&quot;">
            <b>&lt;2></b>
          </li>
        </ul>
        "###);
    }

    #[test]
    fn unknown_element_renders_nothing() {
        let (mut dom, list) = sample();
        dom.remove(list);
        assert_eq!(render_to_string(&dom, list), "");
    }
}
