//! Tree queries: by id, class, tag; generic predicate matching.
//!
//! All queries search the subtree rooted at `within` (inclusive) in document
//! order, so detached fragments can be queried before they are inserted.

use super::node::{NodeData, NodeId};
use super::tree::Dom;

impl Dom {
    /// First node below `within` whose `id` property matches.
    pub fn query_by_id(&self, within: NodeId, id: &str) -> Option<NodeId> {
        self.subtree(within)
            .find(|(_, data)| data.id() == Some(id))
            .map(|(node_id, _)| node_id)
    }

    /// All nodes below `within` that have the given CSS class.
    pub fn query_by_class(&self, within: NodeId, class: &str) -> Vec<NodeId> {
        self.query_all(within, |data| data.has_class(class))
    }

    /// All elements below `within` of the given widget class name.
    pub fn query_by_tag(&self, within: NodeId, tag: &str) -> Vec<NodeId> {
        let tag = tag.to_ascii_lowercase();
        self.query_all(within, |data| !data.is_text() && data.widget_type() == tag)
    }

    /// All nodes below `within` matching an arbitrary predicate.
    pub fn query_all(&self, within: NodeId, predicate: impl Fn(&NodeData) -> bool) -> Vec<NodeId> {
        self.subtree(within)
            .filter(|(_, data)| predicate(data))
            .map(|(node_id, _)| node_id)
            .collect()
    }

    /// Descendants of `node` in document order, excluding `node` itself.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut all = self.walk_depth_first(node);
        if !all.is_empty() {
            all.remove(0);
        }
        all
    }

    fn subtree(&self, within: NodeId) -> impl Iterator<Item = (NodeId, &NodeData)> {
        self.walk_depth_first(within)
            .into_iter()
            .filter_map(|id| self.get(id).map(|data| (id, data)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::dom::tree::Dom;
    use crate::dom::NodeId;
    use crate::eval::Value;
    use crate::widget::WidgetClass;

    /// Build a test tree for queries:
    /// ```text
    ///        root (section)
    ///      /        \
    ///    a            b
    ///  (nav           (div
    ///   #sidebar       #main
    ///   .nav)          .content)
    ///   / \
    ///  c   d
    /// (button  (button
    ///  #save    #cancel
    ///  .primary .danger
    ///  .btn)    .btn)
    /// ```
    fn build_query_tree() -> (Dom, NodeId) {
        let mut dom = Dom::new();
        let make = |dom: &mut Dom, tag: &str, id: &str, classes: &str| {
            let node = dom.create(Arc::new(WidgetClass::new(tag))).unwrap();
            dom.set_property(node, "id", Value::from(id)).unwrap();
            dom.add_class(node, classes);
            node
        };
        let root = make(&mut dom, "section", "root", "");
        let a = make(&mut dom, "nav", "sidebar", "nav");
        let b = make(&mut dom, "div", "main", "content");
        let c = make(&mut dom, "button", "save", "primary btn");
        let d = make(&mut dom, "button", "cancel", "danger btn");
        dom.append_child(root, a).unwrap();
        dom.append_child(root, b).unwrap();
        dom.append_child(a, c).unwrap();
        dom.append_child(a, d).unwrap();
        let text = dom.create_text("button");
        dom.append_child(b, text).unwrap();
        (dom, root)
    }

    #[test]
    fn query_by_id_found() {
        let (dom, root) = build_query_tree();
        let id = dom.query_by_id(root, "sidebar").unwrap();
        assert_eq!(dom.get(id).unwrap().widget_type(), "nav");
    }

    #[test]
    fn query_by_id_is_scoped() {
        let (dom, root) = build_query_tree();
        assert!(dom.query_by_id(root, "nonexistent").is_none());
        // The fragment is not below the body yet.
        assert!(dom.query_by_id(dom.body(), "sidebar").is_none());
        let sidebar = dom.query_by_id(root, "sidebar").unwrap();
        assert!(dom.query_by_id(sidebar, "main").is_none());
    }

    #[test]
    fn query_by_class() {
        let (dom, root) = build_query_tree();
        let navs = dom.query_by_class(root, "nav");
        assert_eq!(navs.len(), 1);
        assert_eq!(dom.get(navs[0]).unwrap().id(), Some("sidebar"));
        let btns = dom.query_by_class(root, "btn");
        assert_eq!(btns.len(), 2);
        assert!(dom.query_by_class(root, "nonexistent").is_empty());
    }

    #[test]
    fn query_by_tag_skips_text() {
        let (dom, root) = build_query_tree();
        let buttons = dom.query_by_tag(root, "BUTTON");
        assert_eq!(buttons.len(), 2);
        assert_eq!(dom.get(buttons[0]).unwrap().id(), Some("save"));
        assert!(dom.query_by_tag(root, "slider").is_empty());
    }

    #[test]
    fn query_all_custom_predicate() {
        let (dom, root) = build_query_tree();
        // Find all nodes that have an id starting with "s".
        let results = dom.query_all(root, |data| data.id().is_some_and(|id| id.starts_with('s')));
        // "sidebar" and "save"
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn descendants_exclude_start() {
        let (dom, root) = build_query_tree();
        assert_eq!(dom.descendants(root).len(), 5);
        assert!(!dom.descendants(root).contains(&root));
    }
}
