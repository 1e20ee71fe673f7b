//! Per-container template registry.
//!
//! Templates are detached subtrees kept alive in the arena and deep-cloned on
//! request. They are removed together with their container.

use super::node::{ElementId, TEMPLATE_ATTRIBUTE};
use super::tree::Dom;
use crate::error::{Error, Result};

impl Dom {
    /// Register `element` as template `name` on `container`, detaching it.
    ///
    /// Replaces (and removes) any template previously registered under the
    /// same name.
    pub fn add_template(&mut self, container: ElementId, name: impl Into<String>, element: ElementId) -> Result<()> {
        if !self.contains(container) || !self.contains(element) {
            return Err(Error::UnknownElement);
        }
        self.detach(element);
        if !self.templates.contains_key(container) {
            self.templates.insert(container, Default::default());
        }
        let previous = self
            .templates
            .get_mut(container)
            .and_then(|registry| registry.insert(name.into(), element));
        if let Some(previous) = previous.filter(|&p| p != element) {
            self.remove(previous);
        }
        Ok(())
    }

    /// Move every direct child of `container` marked with `data-template`
    /// into its registry. Returns how many were registered.
    pub fn harvest_templates(&mut self, container: ElementId) -> Result<usize> {
        if !self.contains(container) {
            return Err(Error::UnknownElement);
        }
        let marked: Vec<(ElementId, String)> = self
            .children(container)
            .iter()
            .filter_map(|&child| {
                let name = self.get(child)?.template_name()?;
                Some((child, name.to_owned()))
            })
            .collect();
        let count = marked.len();
        for (element, name) in marked {
            self.add_template(container, name, element)?;
        }
        tracing::trace!(?container, count, "harvested templates");
        Ok(count)
    }

    /// The template registered as `name` on `container`.
    pub fn template(&self, container: ElementId, name: &str) -> Option<ElementId> {
        self.templates.get(container)?.get(name).copied()
    }

    /// A detached deep copy of template `name`, without the template marker.
    pub fn instantiate(&mut self, container: ElementId, name: &str) -> Result<ElementId> {
        let template = self
            .template(container, name)
            .ok_or_else(|| Error::MissingTemplate {
                template: name.to_owned(),
            })?;
        let copy = self.deep_clone(template).ok_or(Error::UnknownElement)?;
        if let Some(data) = self.get_mut(copy) {
            data.remove_attr(TEMPLATE_ATTRIBUTE);
        }
        Ok(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ElementData;

    fn container_with_templates() -> (Dom, ElementId) {
        let mut dom = Dom::new();
        let list = dom.insert(ElementData::new("ul"));
        dom.insert_child(list, ElementData::new("li").with_attr(TEMPLATE_ATTRIBUTE, "item"));
        dom.insert_child(list, ElementData::new("li").with_attr(TEMPLATE_ATTRIBUTE, "empty"));
        dom.insert_child(list, ElementData::new("li").with_text("static"));
        (dom, list)
    }

    #[test]
    fn harvest_detaches_marked_children() {
        let (mut dom, list) = container_with_templates();
        assert_eq!(dom.harvest_templates(list).unwrap(), 2);
        assert_eq!(dom.children(list).len(), 1);
        assert!(dom.template(list, "item").is_some());
        assert!(dom.template(list, "empty").is_some());
        assert!(dom.template(list, "other").is_none());
    }

    #[test]
    fn instantiate_strips_marker_and_is_detached() {
        let (mut dom, list) = container_with_templates();
        dom.harvest_templates(list).unwrap();
        let a = dom.instantiate(list, "item").unwrap();
        let b = dom.instantiate(list, "item").unwrap();
        assert_ne!(a, b);
        assert_eq!(dom.parent(a), None);
        assert!(dom.get(a).unwrap().template_name().is_none());
        let template = dom.template(list, "item").unwrap();
        assert_eq!(dom.get(template).unwrap().template_name(), Some("item"));
    }

    #[test]
    fn instantiate_missing_template() {
        let (mut dom, list) = container_with_templates();
        assert_eq!(
            dom.instantiate(list, "item"),
            Err(Error::MissingTemplate { template: "item".into() })
        );
    }

    #[test]
    fn add_template_replaces_previous() {
        let (mut dom, list) = container_with_templates();
        dom.harvest_templates(list).unwrap();
        let old = dom.template(list, "item").unwrap();
        let new = dom.create(ElementData::new("li").with_class("v2"));
        dom.add_template(list, "item", new).unwrap();
        assert_eq!(dom.template(list, "item"), Some(new));
        assert!(!dom.contains(old));
    }

    #[test]
    fn templates_die_with_container() {
        let (mut dom, list) = container_with_templates();
        dom.harvest_templates(list).unwrap();
        let template = dom.template(list, "item").unwrap();
        dom.remove(list);
        assert!(!dom.contains(template));
        assert!(dom.is_empty());
    }
}
