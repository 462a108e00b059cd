//! Owned, mutable XML tree for the parts the formatter rewrites.
//!
//! `roxmltree` gives a read-only view; parts are copied out of it into
//! [`Element`] so they can be edited and written back. Namespace prefixes and
//! declarations are kept as they appeared so markup we never touch round-trips.

use super::{WML_NS, XML_NS};

const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n";

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Node {
    Element(Element),
    Text(String),
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Attr {
    pub(crate) prefix: Option<String>,
    pub(crate) ns: Option<String>,
    pub(crate) local: String,
    pub(crate) value: String,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Element {
    pub(crate) prefix: Option<String>,
    pub(crate) ns: Option<String>,
    pub(crate) local: String,
    /// Namespace declarations made on this element: (prefix, uri).
    pub(crate) namespaces: Vec<(Option<String>, String)>,
    pub(crate) attrs: Vec<Attr>,
    pub(crate) children: Vec<Node>,
}

impl Element {
    /// New element in the WordprocessingML namespace, written with the `w:` prefix.
    /// The prefix is declared on output wherever the part has not bound it.
    pub(crate) fn wml(local: &str) -> Self {
        Self {
            prefix: Some("w".into()),
            ns: Some(WML_NS.into()),
            local: local.into(),
            namespaces: Vec::new(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// New unprefixed element in `ns`, for package parts that use a default namespace.
    pub(crate) fn new(ns: &str, local: &str) -> Self {
        Self {
            prefix: None,
            ns: Some(ns.into()),
            local: local.into(),
            namespaces: Vec::new(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub(crate) fn with_val(mut self, val: &str) -> Self {
        self.set_attr(WML_NS, "val", val);
        self
    }

    pub(crate) fn parse(text: &str) -> Result<Self, roxmltree::Error> {
        let doc = roxmltree::Document::parse(text)?;
        Ok(from_node(doc.root_element(), None))
    }

    pub(crate) fn is(&self, ns: &str, local: &str) -> bool {
        self.local == local && self.ns.as_deref() == Some(ns)
    }

    pub(crate) fn is_wml(&self, local: &str) -> bool {
        self.is(WML_NS, local)
    }

    pub(crate) fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|c| match c {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    pub(crate) fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|c| match c {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    pub(crate) fn child(&self, ns: &str, local: &str) -> Option<&Element> {
        self.elements().find(|e| e.is(ns, local))
    }

    pub(crate) fn child_mut(&mut self, ns: &str, local: &str) -> Option<&mut Element> {
        self.elements_mut().find(|e| e.is(ns, local))
    }

    pub(crate) fn wml_child(&self, local: &str) -> Option<&Element> {
        self.child(WML_NS, local)
    }

    pub(crate) fn wml_child_mut(&mut self, local: &str) -> Option<&mut Element> {
        self.child_mut(WML_NS, local)
    }

    /// `w:val` of a WML child, e.g. `<w:jc w:val="center"/>`.
    pub(crate) fn wml_val(&self, child: &str) -> Option<&str> {
        self.wml_child(child).and_then(|c| c.attr(WML_NS, "val"))
    }

    fn position(&self, ns: &str, local: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|c| matches!(c, Node::Element(e) if e.is(ns, local)))
    }

    /// Returns the WML child `local`, inserting it where `order` says it belongs
    /// when absent. Children not listed in `order` are treated as trailing.
    pub(crate) fn ensure_wml_child(&mut self, local: &str, order: &[&str]) -> &mut Element {
        let idx = match self.position(WML_NS, local) {
            Some(i) => i,
            None => {
                let at = insertion_point(&self.children, local, order);
                self.children.insert(at, Node::Element(Element::wml(local)));
                at
            }
        };
        match &mut self.children[idx] {
            Node::Element(e) => e,
            Node::Text(_) => unreachable!("position() only yields elements"),
        }
    }

    /// Returns the WML child `local`, inserting it as the first child when absent
    /// (`w:pPr` in a paragraph, `w:rPr` in a run).
    pub(crate) fn ensure_first_wml_child(&mut self, local: &str) -> &mut Element {
        let idx = match self.position(WML_NS, local) {
            Some(i) => i,
            None => {
                self.children.insert(0, Node::Element(Element::wml(local)));
                0
            }
        };
        match &mut self.children[idx] {
            Node::Element(e) => e,
            Node::Text(_) => unreachable!("position() only yields elements"),
        }
    }

    /// Inserts `child` among the existing children according to `order`.
    pub(crate) fn insert_ordered(&mut self, child: Element, order: &[&str]) {
        let at = insertion_point(&self.children, &child.local, order);
        self.children.insert(at, Node::Element(child));
    }

    pub(crate) fn push(&mut self, child: Element) -> &mut Element {
        self.children.push(Node::Element(child));
        match self.children.last_mut() {
            Some(Node::Element(e)) => e,
            _ => unreachable!("element was just pushed"),
        }
    }

    pub(crate) fn remove_wml_children(&mut self, local: &str) {
        self.children
            .retain(|c| !matches!(c, Node::Element(e) if e.is_wml(local)));
    }

    pub(crate) fn attr(&self, ns: &str, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.local == local && a.ns.as_deref() == Some(ns))
            .map(|a| a.value.as_str())
    }

    /// Unqualified attribute, as used by package relationship and content-type parts.
    pub(crate) fn plain_attr(&self, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.local == local && a.ns.is_none())
            .map(|a| a.value.as_str())
    }

    pub(crate) fn set_attr(&mut self, ns: &str, local: &str, value: &str) {
        if let Some(a) = self
            .attrs
            .iter_mut()
            .find(|a| a.local == local && a.ns.as_deref() == Some(ns))
        {
            a.value = value.into();
            return;
        }
        // Follow a prefix the element already uses for `ns`.
        let existing = self
            .attrs
            .iter()
            .find(|a| a.ns.as_deref() == Some(ns))
            .and_then(|a| a.prefix.clone())
            .or_else(|| {
                self.prefix
                    .clone()
                    .filter(|p| !p.is_empty() && self.ns.as_deref() == Some(ns))
            });
        let prefix = existing.or_else(|| {
            match ns {
                WML_NS => Some("w"),
                XML_NS => Some("xml"),
                super::REL_NS => Some("r"),
                _ => None,
            }
            .map(String::from)
        });
        self.attrs.push(Attr {
            prefix,
            ns: Some(ns.into()),
            local: local.into(),
            value: value.into(),
        });
    }

    pub(crate) fn set_plain_attr(&mut self, local: &str, value: &str) {
        if let Some(a) = self
            .attrs
            .iter_mut()
            .find(|a| a.local == local && a.ns.is_none())
        {
            a.value = value.into();
            return;
        }
        self.attrs.push(Attr {
            prefix: None,
            ns: None,
            local: local.into(),
            value: value.into(),
        });
    }

    pub(crate) fn remove_attr(&mut self, ns: &str, local: &str) {
        self.attrs
            .retain(|a| !(a.local == local && a.ns.as_deref() == Some(ns)));
    }

    pub(crate) fn push_text(&mut self, text: &str) {
        self.children.push(Node::Text(text.into()));
    }

    /// Concatenated character data of this element's direct text children.
    pub(crate) fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|c| match c {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// Makes sure `prefix` is bound on this (root) element.
    pub(crate) fn declare(&mut self, prefix: &str, uri: &str) {
        let bound = self
            .namespaces
            .iter()
            .any(|(p, _)| p.as_deref() == Some(prefix));
        if !bound {
            self.namespaces.push((Some(prefix.into()), uri.into()));
        }
    }

    pub(crate) fn to_xml(&self) -> String {
        let mut out = String::with_capacity(4096);
        out.push_str(XML_DECL);
        self.write(&mut out, &mut Vec::new());
        out
    }

    /// `scope` holds the declarations in force from the ancestors; any prefix
    /// this element or its attributes use that is not bound there is declared here.
    fn write(&self, out: &mut String, scope: &mut Vec<(Option<String>, String)>) {
        let depth = scope.len();
        scope.extend(self.namespaces.iter().cloned());

        let mut extra = Vec::new();
        let used = std::iter::once((self.prefix.as_deref(), self.ns.as_deref())).chain(
            self.attrs
                .iter()
                .filter(|a| a.prefix.is_some())
                .map(|a| (a.prefix.as_deref(), a.ns.as_deref())),
        );
        for (prefix, ns) in used {
            let Some(ns) = ns.filter(|ns| *ns != XML_NS) else {
                continue;
            };
            let prefix = prefix.filter(|p| !p.is_empty());
            if !is_bound(scope, prefix, ns) {
                let binding = (prefix.map(String::from), ns.to_string());
                scope.push(binding.clone());
                extra.push(binding);
            }
        }

        out.push('<');
        push_qname(out, self.prefix.as_deref(), &self.local);
        for (prefix, uri) in self.namespaces.iter().chain(&extra) {
            match prefix {
                Some(p) => {
                    out.push_str(" xmlns:");
                    out.push_str(p);
                }
                None => out.push_str(" xmlns"),
            }
            out.push_str("=\"");
            escape_attr(out, uri);
            out.push('"');
        }
        for a in &self.attrs {
            out.push(' ');
            push_qname(out, a.prefix.as_deref(), &a.local);
            out.push_str("=\"");
            escape_attr(out, &a.value);
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            scope.truncate(depth);
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                Node::Element(e) => e.write(out, scope),
                Node::Text(t) => escape_text(out, t),
            }
        }
        out.push_str("</");
        push_qname(out, self.prefix.as_deref(), &self.local);
        out.push('>');
        scope.truncate(depth);
    }
}

/// Whether `prefix` resolves to `ns`; the innermost declaration wins.
fn is_bound(scope: &[(Option<String>, String)], prefix: Option<&str>, ns: &str) -> bool {
    scope
        .iter()
        .rev()
        .find(|(p, _)| p.as_deref() == prefix)
        .is_some_and(|(_, uri)| uri == ns)
}

fn insertion_point(children: &[Node], local: &str, order: &[&str]) -> usize {
    let Some(rank) = order.iter().position(|n| *n == local) else {
        return children.len();
    };
    children
        .iter()
        .position(|c| match c {
            Node::Element(e) if e.ns.as_deref() == Some(WML_NS) => order
                .iter()
                .position(|n| *n == e.local)
                .is_some_and(|r| r > rank),
            _ => false,
        })
        .unwrap_or(children.len())
}

fn from_node(node: roxmltree::Node, parent: Option<roxmltree::Node>) -> Element {
    let tag = node.tag_name();
    let prefix = tag
        .namespace()
        .and_then(|uri| node.lookup_prefix(uri))
        .map(String::from);

    let namespaces = node
        .namespaces()
        .filter(|ns| {
            !parent.is_some_and(|p| {
                p.namespaces()
                    .any(|pns| pns.name() == ns.name() && pns.uri() == ns.uri())
            })
        })
        .filter(|ns| ns.name() != Some("xml"))
        .map(|ns| (ns.name().map(String::from), ns.uri().to_string()))
        .collect();

    let attrs = node
        .attributes()
        .map(|a| {
            let prefix = match a.namespace() {
                Some(XML_NS) => Some("xml".to_string()),
                // Attributes need a named prefix even where `uri` is also the default.
                Some(uri) => node
                    .namespaces()
                    .find(|ns| ns.uri() == uri && ns.name().is_some())
                    .and_then(|ns| ns.name())
                    .map(String::from),
                None => None,
            };
            Attr {
                prefix,
                ns: a.namespace().map(String::from),
                local: a.name().to_string(),
                value: a.value().to_string(),
            }
        })
        .collect();

    let children = node
        .children()
        .filter_map(|c| {
            if c.is_element() {
                Some(Node::Element(from_node(c, Some(node))))
            } else if c.is_text() {
                c.text().map(|t| Node::Text(t.to_string()))
            } else {
                None
            }
        })
        .collect();

    Element {
        prefix,
        ns: tag.namespace().map(String::from),
        local: tag.name().to_string(),
        namespaces,
        attrs,
        children,
    }
}

fn push_qname(out: &mut String, prefix: Option<&str>, local: &str) {
    if let Some(p) = prefix.filter(|p| !p.is_empty()) {
        out.push_str(p);
        out.push(':');
    }
    out.push_str(local);
}

fn escape_text(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attr(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            _ => out.push(ch),
        }
    }
}
