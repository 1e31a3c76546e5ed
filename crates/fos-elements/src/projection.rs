//! Content projection
//!
//! Distributes the light-DOM children of a host element into the component's
//! content slots.

use fos_dom::{ElementRef, NodeId, SelectorList};

/// Selector of the default slot
pub const WILDCARD_SELECTOR: &str = "*";

/// Partition the host's child nodes into one bucket per content selector.
///
/// Each element goes to the first non-wildcard selector it matches. Text and
/// comment nodes, and elements matching nothing, go to the first `*` slot, or
/// are not projected at all when no wildcard slot is declared. Buckets keep
/// document order.
pub fn extract_projectable_nodes(host: &ElementRef, content_selectors: &[String]) -> Vec<Vec<NodeId>> {
    let mut buckets: Vec<Vec<NodeId>> = vec![Vec::new(); content_selectors.len()];
    let wildcard = content_selectors.iter().position(|s| s == WILDCARD_SELECTOR);

    let parsed: Vec<Option<SelectorList>> = content_selectors
        .iter()
        .map(|selector| {
            if selector == WILDCARD_SELECTOR {
                return None;
            }
            SelectorList::parse(selector)
                .inspect_err(|e| tracing::warn!("Ignoring content selector {:?}: {}", selector, e))
                .ok()
        })
        .collect();

    let doc = host.document();
    for node in host.child_nodes() {
        let slot = if doc.is_element(node) {
            parsed
                .iter()
                .position(|list| list.as_ref().is_some_and(|l| doc.matches(node, l)))
                .or(wildcard)
        } else {
            wildcard
        };

        if let Some(idx) = slot {
            buckets[idx].push(node);
        }
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use fos_dom::Document;

    fn selectors(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_wildcard_collects_rest() {
        let doc = Document::default();
        let host = doc.create_element("x-host");
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        let text = doc.create_text_node("text");
        for kid in [a, b, text] {
            doc.append_child(host, kid).unwrap();
        }

        let buckets = extract_projectable_nodes(&doc.element(host), &selectors(&["a", "*"]));
        assert_eq!(buckets, vec![vec![a], vec![b, text]]);
    }

    #[test]
    fn test_first_declared_selector_wins() {
        let doc = Document::default();
        let host = doc.create_element("x-host");
        let header = doc.create_element("header");
        doc.set_attribute(header, "class", "title").unwrap();
        doc.append_child(host, header).unwrap();

        let buckets =
            extract_projectable_nodes(&doc.element(host), &selectors(&[".title", "header", "*"]));
        assert_eq!(buckets, vec![vec![header], vec![], vec![]]);
    }

    #[test]
    fn test_unmatched_dropped_without_wildcard() {
        let doc = Document::default();
        let host = doc.create_element("x-host");
        let span = doc.create_element("span");
        let comment = doc.create_comment("c");
        let footer = doc.create_element("footer");
        for kid in [span, comment, footer] {
            doc.append_child(host, kid).unwrap();
        }

        let buckets = extract_projectable_nodes(&doc.element(host), &selectors(&["footer"]));
        assert_eq!(buckets, vec![vec![footer]]);
    }

    #[test]
    fn test_invalid_selector_never_matches() {
        let doc = Document::default();
        let host = doc.create_element("x-host");
        let p = doc.create_element("p");
        doc.append_child(host, p).unwrap();

        let buckets = extract_projectable_nodes(&doc.element(host), &selectors(&["div > p", "*"]));
        assert_eq!(buckets, vec![vec![], vec![p]]);
    }

    #[test]
    fn test_no_selectors() {
        let doc = Document::default();
        let host = doc.create_element("x-host");
        let p = doc.create_element("p");
        doc.append_child(host, p).unwrap();
        assert!(extract_projectable_nodes(&doc.element(host), &[]).is_empty());
    }
}
