use crate::config::TITLE_SET_SUFFIX;
use crate::error::PipelineError;
use crate::models::CategoryMode;
use crate::sanitize::sanitize_title;
use rustc_hash::FxHashSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Deduplicated article titles for one category mode.
///
/// Persisted as a sorted, newline-delimited list and read back as an
/// unordered set. Built once per run and never mutated after hand-off.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleSet {
    titles: FxHashSet<String>,
}

impl TitleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, title: String) -> bool {
        self.titles.insert(title)
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    pub fn contains(&self, title: &str) -> bool {
        self.titles.contains(title)
    }

    pub fn sorted(&self) -> Vec<&str> {
        let mut titles: Vec<&str> = self.titles.iter().map(String::as_str).collect();
        titles.sort_unstable();
        titles
    }

    /// Titles in the form dump pages are compared in.
    pub fn sanitized(&self) -> FxHashSet<String> {
        self.titles.iter().map(|t| sanitize_title(t)).collect()
    }

    /// Writes the sorted list through a temp file and rename.
    pub fn save(&self, path: &Path) -> Result<(), PipelineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }

        let tmp_path = path.with_extension("txt.tmp");
        let file = File::create(&tmp_path).map_err(|e| PipelineError::io(&tmp_path, e))?;
        let mut writer = BufWriter::new(file);
        for title in self.sorted() {
            writeln!(writer, "{}", title).map_err(|e| PipelineError::io(&tmp_path, e))?;
        }
        writer.flush().map_err(|e| PipelineError::io(&tmp_path, e))?;
        drop(writer);

        fs::rename(&tmp_path, path).map_err(|e| PipelineError::io(path, e))?;

        info!(path = %path.display(), titles = self.len(), "Title set saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
        let mut set = Self::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| PipelineError::io(path, e))?;
            if !line.is_empty() {
                set.insert(line);
            }
        }
        Ok(set)
    }
}

impl FromIterator<String> for TitleSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            titles: iter.into_iter().collect(),
        }
    }
}

impl Extend<String> for TitleSet {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        self.titles.extend(iter);
    }
}

/// `<process_dir>/<mode>_articles.txt`
pub fn title_set_path(process_dir: &Path, mode: &CategoryMode) -> PathBuf {
    process_dir.join(format!("{}{}", mode.name(), TITLE_SET_SUFFIX))
}
