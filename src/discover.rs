use crate::config::{LISTING_PATH, RUNNING_TOTAL_SENTINEL};
use crate::error::PipelineError;
use crate::markup::Element;
use crate::models::CategoryMode;
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;
use tracing::{debug, trace};
use url::Url;

/// `/wiki/Wikipedia:Vital_articles/Level/<N>/<topic...>`
static SUBPAGE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^{}/Level/(\d+)/(.+)$",
        regex::escape(LISTING_PATH)
    ))
    .unwrap()
});

/// Address of the listing page for `level`, or one of its topic subpages.
pub fn listing_url(base: &Url, level: u32, topic: Option<&str>) -> Result<Url, PipelineError> {
    let path = match topic {
        Some(topic) => format!("{}/Level/{}/{}", LISTING_PATH, level, topic),
        None => format!("{}/Level/{}", LISTING_PATH, level),
    };
    base.join(&path).map_err(|e| {
        PipelineError::Configuration(format!("cannot build listing URL from {}: {}", base, e))
    })
}

/// Topic part of a subpage path for `level`, spaces folded to underscores.
/// `None` for other levels, non-listing paths and the running-total page.
pub fn topic_segment(path: &str, level: u32) -> Option<String> {
    let caps = SUBPAGE_REGEX.captures(path)?;
    if caps[1].parse::<u32>().ok()? != level {
        return None;
    }
    let topic = caps[2].trim_end_matches('/');
    if topic.is_empty() || topic.contains(RUNNING_TOTAL_SENTINEL) {
        return None;
    }
    Some(topic.replace("%20", "_").replace(' ', "_"))
}

/// Collects the subpages of a root listing that the mode should recurse into.
///
/// Filtered modes without a usable allow-list fail with a configuration
/// error rather than returning an empty success.
pub fn discover_subpages(
    root: &Element,
    base: &Url,
    mode: &CategoryMode,
) -> Result<FxHashSet<Url>, PipelineError> {
    let allow_list = if mode.is_filtered() {
        match mode.topics.as_deref() {
            Some(topics) if !topics.is_empty() => Some(topics),
            _ => {
                return Err(PipelineError::Configuration(format!(
                    "mode `{}` requires a non-empty topic allow-list",
                    mode.name()
                )))
            }
        }
    } else {
        None
    };

    let mut subpages = FxHashSet::default();

    for link in root.links() {
        let Some(href) = link.attr("href") else {
            continue;
        };
        let mut url = match base.join(href) {
            Ok(url) => url,
            Err(e) => {
                trace!(href, error = %e, "Unresolvable link");
                continue;
            }
        };
        if url.host_str() != base.host_str() {
            continue;
        }
        url.set_fragment(None);
        url.set_query(None);

        let Some(topic) = topic_segment(url.path(), mode.level) else {
            continue;
        };

        if let Some(topics) = allow_list {
            if !topics.iter().any(|t| *t == topic) {
                trace!(topic = %topic, mode = mode.name(), "Topic not in allow-list");
                continue;
            }
        }

        subpages.insert(url);
    }

    debug!(
        mode = mode.name(),
        level = mode.level,
        count = subpages.len(),
        "Subpages discovered"
    );

    Ok(subpages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModeKind;

    fn base() -> Url {
        Url::parse("https://en.wikipedia.org").unwrap()
    }

    fn listing(hrefs: &[&str]) -> Element {
        let mut list = Element::new("ul");
        for href in hrefs {
            list = list.with_child(Element::new("li").with_child(Element::link(href, href)));
        }
        Element::new("html").with_child(Element::new("body").with_child(list))
    }

    fn special(level: u32, topics: &[&str]) -> CategoryMode {
        CategoryMode::new(
            ModeKind::Special,
            level,
            Some(topics.iter().map(|t| t.to_string()).collect()),
        )
    }

    fn paths(set: &FxHashSet<Url>) -> Vec<String> {
        let mut v: Vec<_> = set.iter().map(|u| u.path().to_string()).collect();
        v.sort();
        v
    }

    #[test]
    fn listing_url_formats() {
        assert_eq!(
            listing_url(&base(), 4, None).unwrap().as_str(),
            "https://en.wikipedia.org/wiki/Wikipedia:Vital_articles/Level/4"
        );
        assert_eq!(
            listing_url(&base(), 5, Some("People")).unwrap().as_str(),
            "https://en.wikipedia.org/wiki/Wikipedia:Vital_articles/Level/5/People"
        );
    }

    #[test]
    fn topic_segment_extraction() {
        let p = "/wiki/Wikipedia:Vital_articles/Level/4/People";
        assert_eq!(topic_segment(p, 4).as_deref(), Some("People"));
        assert_eq!(topic_segment(p, 5), None);
        assert_eq!(
            topic_segment("/wiki/Wikipedia:Vital_articles/Level/4/Current_total", 4),
            None
        );
        assert_eq!(topic_segment("/wiki/Wikipedia:Vital_articles/Level/4/", 4), None);
        assert_eq!(topic_segment("/wiki/Wikipedia:Vital_articles/Level/4", 4), None);
        assert_eq!(
            topic_segment("/wiki/Wikipedia:Vital_articles/Level/4/Everyday%20life", 4).as_deref(),
            Some("Everyday_life")
        );
    }

    #[test]
    fn general_mode_keeps_all_topics() {
        let root = listing(&[
            "/wiki/Wikipedia:Vital_articles/Level/4/People",
            "/wiki/Wikipedia:Vital_articles/Level/4/Arts",
            "/wiki/Dog",
        ]);
        let found = discover_subpages(&root, &base(), &CategoryMode::general(4)).unwrap();
        assert_eq!(
            paths(&found),
            vec![
                "/wiki/Wikipedia:Vital_articles/Level/4/Arts",
                "/wiki/Wikipedia:Vital_articles/Level/4/People",
            ]
        );
    }

    #[test]
    fn running_total_never_included() {
        let root = listing(&[
            "/wiki/Wikipedia:Vital_articles/Level/4/Current_total",
            "/wiki/Wikipedia:Vital_articles/Level/4/People",
        ]);
        let general = discover_subpages(&root, &base(), &CategoryMode::general(4)).unwrap();
        assert_eq!(paths(&general), vec!["/wiki/Wikipedia:Vital_articles/Level/4/People"]);

        let filtered =
            discover_subpages(&root, &base(), &special(4, &["Current_total", "People"])).unwrap();
        assert!(filtered
            .iter()
            .all(|u| !u.path().contains("Current_total")));
    }

    #[test]
    fn filtered_mode_keeps_only_allowed_topics() {
        let root = listing(&[
            "/wiki/Wikipedia:Vital_articles/Level/5/People",
            "/wiki/Wikipedia:Vital_articles/Level/5/Arts",
            "/wiki/Wikipedia:Vital_articles/Level/5/History",
        ]);
        let found = discover_subpages(&root, &base(), &special(5, &["People", "History"])).unwrap();
        assert_eq!(
            paths(&found),
            vec![
                "/wiki/Wikipedia:Vital_articles/Level/5/History",
                "/wiki/Wikipedia:Vital_articles/Level/5/People",
            ]
        );
    }

    #[test]
    fn topic_matching_is_case_sensitive() {
        let root = listing(&["/wiki/Wikipedia:Vital_articles/Level/5/People"]);
        let found = discover_subpages(&root, &base(), &special(5, &["people"])).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn nested_topics_match_on_full_path() {
        let root = listing(&[
            "/wiki/Wikipedia:Vital_articles/Level/5/People/Writers_and_journalists",
            "/wiki/Wikipedia:Vital_articles/Level/5/People/Artists,_musicians,_and_composers",
        ]);
        let parent_only = discover_subpages(&root, &base(), &special(5, &["People"])).unwrap();
        assert!(parent_only.is_empty());

        let found = discover_subpages(
            &root,
            &base(),
            &special(5, &["People/Writers_and_journalists"]),
        )
        .unwrap();
        assert_eq!(
            paths(&found),
            vec!["/wiki/Wikipedia:Vital_articles/Level/5/People/Writers_and_journalists"]
        );
    }

    #[test]
    fn empty_allow_list_is_configuration_error() {
        let root = listing(&["/wiki/Wikipedia:Vital_articles/Level/5/People"]);
        let err = discover_subpages(&root, &base(), &special(5, &[])).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));

        let absent = CategoryMode::new(ModeKind::Special, 5, None);
        let err = discover_subpages(&root, &base(), &absent).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn other_levels_are_ignored() {
        let root = listing(&[
            "/wiki/Wikipedia:Vital_articles/Level/3/People",
            "/wiki/Wikipedia:Vital_articles/Level/5/People",
            "/wiki/Wikipedia:Vital_articles/Level/44/People",
        ]);
        let found = discover_subpages(&root, &base(), &CategoryMode::general(4)).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn fragments_and_absolute_links_collapse() {
        let root = listing(&[
            "/wiki/Wikipedia:Vital_articles/Level/4/People",
            "/wiki/Wikipedia:Vital_articles/Level/4/People#Writers",
            "https://en.wikipedia.org/wiki/Wikipedia:Vital_articles/Level/4/People",
            "https://de.wikipedia.org/wiki/Wikipedia:Vital_articles/Level/4/Arts",
        ]);
        let found = discover_subpages(&root, &base(), &CategoryMode::general(4)).unwrap();
        assert_eq!(found.len(), 1);
    }
}
