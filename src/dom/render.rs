//! `Renderer` implementation for the in-memory tree.

use std::rc::Rc;

use super::bindspec;
use super::node::ElementId;
use super::tree::Dom;
use crate::error::{Error, Result};
use crate::widget::{BindTarget, Binding, Renderable, Renderer, Resolve};

impl Dom {
    /// Parse every `data-bind` in `element`'s subtree into bindings.
    fn collect_bindings(&self, element: ElementId) -> Result<Vec<Binding<ElementId>>> {
        let mut bindings = Vec::new();
        for bound in self.walk_depth_first(element) {
            let Some(spec) = self.get(bound).and_then(|data| data.bind_spec()) else {
                continue;
            };
            for rule in bindspec::parse(spec)? {
                let targets = match &rule.selector {
                    Some(selector) => self.query_subtree(bound, selector),
                    None => vec![bound],
                };
                bindings.extend(targets.into_iter().map(|target| Binding {
                    element: target,
                    target: rule.target.clone(),
                    slot: rule.slot.clone(),
                }));
            }
        }
        Ok(bindings)
    }

    /// Make `child` the only child of `element`, clearing its text.
    fn mount(&mut self, element: ElementId, child: ElementId) -> Result<()> {
        let others: Vec<ElementId> = self
            .children(element)
            .iter()
            .copied()
            .filter(|&c| c != child)
            .collect();
        for other in others {
            Dom::detach(self, other);
        }
        if self.parent(child) != Some(element) {
            Dom::append_child(self, element, child)?;
        }
        if let Some(data) = self.get_mut(element) {
            data.text = None;
        }
        Ok(())
    }
}

impl Renderer for Dom {
    type Element = ElementId;

    fn has_template(&self, container: ElementId, template: &str) -> bool {
        self.template(container, template).is_some()
    }

    fn clone_template(&mut self, container: ElementId, template: &str) -> Result<ElementId> {
        self.instantiate(container, template)
    }

    fn bindings(&mut self, element: ElementId) -> Result<Rc<[Binding<ElementId>]>> {
        if let Some(cached) = self.bindings.get(element) {
            return Ok(Rc::clone(cached));
        }
        if !self.contains(element) {
            return Err(Error::UnknownElement);
        }
        let parsed: Rc<[Binding<ElementId>]> = self.collect_bindings(element)?.into();
        self.bindings.insert(element, Rc::clone(&parsed));
        Ok(parsed)
    }

    fn apply(&mut self, bindings: &[Binding<ElementId>], resolve: &Resolve<'_, ElementId>) -> Result<()> {
        for binding in bindings {
            let value = resolve(&binding.slot).unwrap_or_else(|| Renderable::Scalar(String::new()));
            match (&binding.target, value) {
                (BindTarget::Text, Renderable::Scalar(text)) => {
                    self.get_mut(binding.element).ok_or(Error::UnknownElement)?.text = Some(text);
                }
                (BindTarget::Text, Renderable::Element(child)) => {
                    self.mount(binding.element, child)?;
                }
                (BindTarget::Attribute(name), Renderable::Scalar(text)) => {
                    self.get_mut(binding.element)
                        .ok_or(Error::UnknownElement)?
                        .set_attr(name.clone(), text);
                }
                (BindTarget::Attribute(name), Renderable::Element(_)) => {
                    return Err(Error::Render(format!(
                        "cannot bind an element into attribute `{name}` (slot `{}`)",
                        binding.slot
                    )));
                }
            }
        }
        Ok(())
    }

    fn child_count(&self, container: ElementId) -> usize {
        self.children(container).len()
    }

    fn child_at(&self, container: ElementId, index: usize) -> Option<ElementId> {
        self.children(container).get(index).copied()
    }

    fn append_child(&mut self, container: ElementId, child: ElementId) -> Result<()> {
        Dom::append_child(self, container, child)
    }

    fn insert_before(&mut self, container: ElementId, child: ElementId, reference: ElementId) -> Result<()> {
        Dom::insert_before(self, container, child, reference)
    }

    fn detach(&mut self, element: ElementId) {
        Dom::detach(self, element);
    }

    fn destroy(&mut self, element: ElementId) {
        self.remove(element);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{BindSpecError, ElementData};
    use crate::testing::render_to_string;

    fn card(dom: &mut Dom) -> ElementId {
        let card = dom.create(ElementData::new("div").with_bind(".name // name; #link // href:url"));
        dom.insert_child(card, ElementData::new("span").with_class("name"));
        dom.insert_child(card, ElementData::new("a").with_id("link"));
        dom.insert_child(card, ElementData::new("span").with_class("name"));
        card
    }

    fn resolve_from(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<Renderable<ElementId>> {
        move |slot: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == slot)
                .map(|(_, v)| Renderable::Scalar((*v).to_owned()))
        }
    }

    #[test]
    fn selector_rules_bind_descendants() {
        let mut dom = Dom::new();
        let card = card(&mut dom);
        let bindings = Renderer::bindings(&mut dom, card).unwrap();
        assert_eq!(bindings.len(), 3);
        assert_eq!(bindings[2].attribute_name(), Some("href"));

        dom.apply(&bindings, &resolve_from(&[("name", "Ada"), ("url", "/ada")]))
            .unwrap();
        assert_eq!(
            render_to_string(&dom, card),
            r#"<div><span class="name">Ada</span><a href="/ada" id="link"></a><span class="name">Ada</span></div>"#
        );
    }

    #[test]
    fn bindings_are_cached_until_destroy() {
        let mut dom = Dom::new();
        let card = card(&mut dom);
        let first = Renderer::bindings(&mut dom, card).unwrap();
        let second = Renderer::bindings(&mut dom, card).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        dom.destroy(card);
        assert!(!dom.bindings.contains_key(card));
        assert_eq!(Renderer::bindings(&mut dom, card), Err(Error::UnknownElement));
    }

    #[test]
    fn unresolved_slot_renders_empty() {
        let mut dom = Dom::new();
        let el = dom.create(ElementData::new("p").with_bind("missing; title:missing"));
        let bindings = Renderer::bindings(&mut dom, el).unwrap();
        dom.apply(&bindings, &|_: &str| None).unwrap();
        assert_eq!(render_to_string(&dom, el), r#"<p title=""></p>"#);
    }

    #[test]
    fn element_value_becomes_sole_child() {
        let mut dom = Dom::new();
        let host = dom.create(ElementData::new("div").with_bind("body"));
        let stale = dom.insert_child(host, ElementData::new("i"));
        let inner = dom.create(ElementData::new("em").with_text("hi"));
        let bindings = Renderer::bindings(&mut dom, host).unwrap();
        dom.apply(&bindings, &|_: &str| Some(Renderable::Element(inner))).unwrap();
        assert_eq!(dom.children(host), &[inner]);
        assert!(dom.contains(stale));
        assert_eq!(render_to_string(&dom, host), "<div><em>hi</em></div>");

        // Applying again is a no-op.
        dom.apply(&bindings, &|_: &str| Some(Renderable::Element(inner))).unwrap();
        assert_eq!(dom.children(host), &[inner]);
    }

    #[test]
    fn element_into_attribute_is_an_error() {
        let mut dom = Dom::new();
        let el = dom.create(ElementData::new("a").with_bind("href:link"));
        let other = dom.create(ElementData::new("b"));
        let bindings = Renderer::bindings(&mut dom, el).unwrap();
        let err = dom
            .apply(&bindings, &|_: &str| Some(Renderable::Element(other)))
            .unwrap_err();
        assert!(matches!(err, Error::Render(_)));
    }

    #[test]
    fn malformed_spec_is_reported() {
        let mut dom = Dom::new();
        let el = dom.create(ElementData::new("a").with_bind("href:"));
        assert_eq!(
            Renderer::bindings(&mut dom, el),
            Err(Error::BindSpec(BindSpecError::UnexpectedEnd { rule: 0 }))
        );
    }

    #[test]
    fn insert_at_positions() {
        let mut dom = Dom::new();
        let list = dom.insert(ElementData::new("ul"));
        let a = dom.create(ElementData::new("li").with_text("a"));
        let b = dom.create(ElementData::new("li").with_text("b"));
        let c = dom.create(ElementData::new("li").with_text("c"));
        dom.insert_at(list, b, 0).unwrap();
        dom.insert_at(list, c, 1).unwrap();
        dom.insert_at(list, a, 0).unwrap();
        assert_eq!(dom.children(list), &[a, b, c]);
        assert_eq!(dom.child_count(list), 3);
        assert_eq!(dom.child_at(list, 1), Some(b));
    }
}
