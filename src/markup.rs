//! Owned, immutable view of parsed HTML.
//!
//! Listing pages are parsed with `scraper` and copied into this small tree so
//! the resolver and discoverer run as plain structural queries. HTML parsing
//! never yields an `<a>` nested in another `<a>`, but hand-built trees can,
//! and the innermost-link rule is defined for them.

use scraper::{ElementRef, Html};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// `<a href="{href}">{text}</a>`
    pub fn link(href: &str, text: &str) -> Self {
        Self::new("a").with_attr("href", href).with_text(text)
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.children.push(Node::Text(text.to_string()));
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|c| c.split_ascii_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// A hyperlink is an `<a>` carrying an `href`.
    pub fn is_link(&self) -> bool {
        self.name == "a" && self.attr("href").is_some()
    }

    /// Depth-first, document-order walk over descendant elements (self excluded).
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: vec![self.children.iter()],
        }
    }

    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.descendants().filter(move |e| e.name == name)
    }

    pub fn links(&self) -> impl Iterator<Item = &Element> + '_ {
        self.descendants().filter(|e| e.is_link())
    }

    /// Links under this element, skipping any nested `<ol>`, `<ul>` or `<li>`.
    pub fn links_outside_lists(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        collect_links_outside_lists(self, &mut out);
        out
    }

    pub fn contains_link(&self) -> bool {
        self.descendants().any(|e| e.is_link())
    }

    /// Concatenated text of every descendant text node.
    pub fn text(&self) -> String {
        let mut out = String::new();
        push_text(self, &mut out);
        out
    }
}

fn collect_links_outside_lists<'a>(element: &'a Element, out: &mut Vec<&'a Element>) {
    for child in &element.children {
        let Node::Element(e) = child else {
            continue;
        };
        if matches!(e.name.as_str(), "ol" | "ul" | "li") {
            continue;
        }
        if e.is_link() {
            out.push(e);
        }
        collect_links_outside_lists(e, out);
    }
}

fn push_text(element: &Element, out: &mut String) {
    for child in &element.children {
        match child {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => push_text(e, out),
        }
    }
}

pub struct Descendants<'a> {
    stack: Vec<std::slice::Iter<'a, Node>>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<&'a Element> {
        while let Some(top) = self.stack.last_mut() {
            match top.next() {
                Some(Node::Element(e)) => {
                    self.stack.push(e.children.iter());
                    return Some(e);
                }
                Some(Node::Text(_)) => {}
                None => {
                    self.stack.pop();
                }
            }
        }
        None
    }
}

/// Parses a full HTML document and returns its `<html>` element.
pub fn parse_document(raw: &str) -> Element {
    let document = Html::parse_document(raw);
    convert(document.root_element())
}

fn convert(source: ElementRef<'_>) -> Element {
    let value = source.value();
    let mut element = Element {
        name: value.name().to_string(),
        attrs: value
            .attrs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        children: Vec::new(),
    };

    for child in source.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            element.children.push(Node::Element(convert(child_element)));
        } else if let Some(text) = child.value().as_text() {
            let text: &str = &text.text;
            element.children.push(Node::Text(text.to_string()));
        }
    }

    element
}
