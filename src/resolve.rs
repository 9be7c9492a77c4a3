use crate::config::{CONTENT_REGION_CLASSES, TABLE_LAYOUT_MAX_LEVEL};
use crate::markup::Element;
use rustc_hash::FxHashSet;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One link per table cell, one title per link
    Table,
    /// Ordered-list items whose innermost link names the article
    NestedList,
}

impl Strategy {
    pub fn for_level(level: u32) -> Self {
        if level <= TABLE_LAYOUT_MAX_LEVEL {
            Strategy::Table
        } else {
            Strategy::NestedList
        }
    }
}

/// The rendered article body of a listing page.
pub fn content_region(root: &Element) -> Option<&Element> {
    root.descendants().find(|e| {
        e.name == "div" && CONTENT_REGION_CLASSES.iter().all(|c| e.has_class(c))
    })
}

/// Recovers the article titles a listing page links to.
///
/// Returns `None` when the page has no content region; callers log that and
/// carry on with zero titles for the page.
pub fn resolve_titles(root: &Element, level: u32) -> Option<FxHashSet<String>> {
    let content = content_region(root)?;
    let strategy = Strategy::for_level(level);

    let titles = match strategy {
        Strategy::Table => table_titles(content),
        Strategy::NestedList => nested_list_titles(content),
    };

    debug!(level, ?strategy, count = titles.len(), "Titles resolved");
    Some(titles)
}

fn table_titles(content: &Element) -> FxHashSet<String> {
    content
        .find_all("table")
        .flat_map(|table| table.links())
        .filter_map(visible_text)
        .collect()
}

fn nested_list_titles(content: &Element) -> FxHashSet<String> {
    let mut titles = FxHashSet::default();

    for list in content.find_all("ol") {
        for item in list.find_all("li") {
            // Sub-items are visited on their own.
            let links = item.links_outside_lists();
            let source = match links.as_slice() {
                [] => None,
                [only] => Some(*only),
                _ => innermost_link(&links),
            };
            if let Some(title) = source.and_then(visible_text) {
                titles.insert(title);
            }
        }
    }

    titles
}

/// Last link in document order that has no link nested inside it.
///
/// For `Topic (see also Related)` style items this is the cross-reference
/// target's sibling that actually names the article.
pub fn innermost_link<'a>(links: &[&'a Element]) -> Option<&'a Element> {
    links.iter().rev().find(|link| !link.contains_link()).copied()
}

fn visible_text(link: &Element) -> Option<String> {
    let text = link.text();
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
