use crate::config::{Config, TABLE_LAYOUT_MAX_LEVEL};
use crate::discover::{discover_subpages, listing_url};
use crate::error::PipelineError;
use crate::fetch::Fetch;
use crate::markup::{parse_document, Element};
use crate::models::CategoryMode;
use crate::resolve::resolve_titles;
use crate::titles::{title_set_path, TitleSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};
use url::Url;

/// Resolves each mode's title set from the listing pages and persists it.
pub struct ArticleSetBuilder<'a, F: Fetch> {
    fetcher: &'a F,
    base_url: Url,
    request_delay: Duration,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a, F: Fetch> ArticleSetBuilder<'a, F> {
    pub fn new(fetcher: &'a F, config: &Config) -> Result<Self, PipelineError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            PipelineError::Configuration(format!("invalid `base_url` {}: {}", config.base_url, e))
        })?;
        Ok(Self {
            fetcher,
            base_url,
            request_delay: config.request_delay(),
            cancel: None,
        })
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Checked before every request; once set the build stops with `Interrupted`.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn check_cancelled(&self) -> Result<(), PipelineError> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::SeqCst) => Err(PipelineError::Interrupted),
            _ => Ok(()),
        }
    }

    /// Builds the title set for one mode.
    ///
    /// An unreachable root listing yields an empty set; a failed subpage only
    /// loses that subpage's titles. Configuration problems and cancellation
    /// are returned.
    pub fn build(&self, mode: &CategoryMode) -> Result<TitleSet, PipelineError> {
        info!(mode = mode.name(), level = mode.level, "Getting articles");

        let root_url = listing_url(&self.base_url, mode.level, None)?;
        self.check_cancelled()?;
        let root = match self.fetch_tree(&root_url) {
            Ok(tree) => tree,
            Err(e) => {
                error!(
                    mode = mode.name(),
                    error = %e,
                    "Root listing unavailable, mode yields no titles"
                );
                return Ok(TitleSet::new());
            }
        };

        let mut titles = TitleSet::new();

        if mode.level <= TABLE_LAYOUT_MAX_LEVEL {
            if mode.topics.is_some() {
                warn!(mode = mode.name(), "Topic allow-list ignored for single-page levels");
            }
            titles.extend(self.titles_from(&root, &root_url, mode.level));
        } else {
            let mut subpages: Vec<Url> = discover_subpages(&root, &self.base_url, mode)?
                .into_iter()
                .collect();
            subpages.sort();
            info!(mode = mode.name(), count = subpages.len(), "Found subpages");

            for (n, url) in subpages.iter().enumerate() {
                if n > 0 && !self.request_delay.is_zero() {
                    thread::sleep(self.request_delay);
                }
                self.check_cancelled()?;
                info!(url = %url, "Processing subpage");
                match self.fetch_tree(url) {
                    Ok(tree) => titles.extend(self.titles_from(&tree, url, mode.level)),
                    Err(e) => warn!(mode = mode.name(), error = %e, "Skipping subpage"),
                }
            }
        }

        info!(mode = mode.name(), titles = titles.len(), "Resolved unique articles");
        Ok(titles)
    }

    /// Builds and saves every mode's artifact under `process_dir`.
    pub fn build_all(
        &self,
        config: &Config,
    ) -> Result<Vec<(CategoryMode, PathBuf)>, PipelineError> {
        config.validate()?;
        let mut written = Vec::new();
        for mode in config.modes() {
            let path = self.build_and_save(&mode, config)?;
            written.push((mode, path));
        }
        Ok(written)
    }

    pub fn build_and_save(
        &self,
        mode: &CategoryMode,
        config: &Config,
    ) -> Result<PathBuf, PipelineError> {
        let titles = self.build(mode)?;
        let path = title_set_path(&config.process_dir, mode);
        titles.save(&path)?;
        Ok(path)
    }

    fn fetch_tree(&self, url: &Url) -> Result<Element, PipelineError> {
        let body = self.fetcher.fetch(url)?;
        Ok(parse_document(&body))
    }

    fn titles_from(&self, tree: &Element, url: &Url, level: u32) -> Vec<String> {
        match resolve_titles(tree, level) {
            Some(found) => {
                info!(url = %url, count = found.len(), "Found articles");
                found.into_iter().collect()
            }
            None => {
                let e = PipelineError::Parse {
                    url: url.to_string(),
                };
                warn!(error = %e, "No titles taken from page");
                Vec::new()
            }
        }
    }
}
