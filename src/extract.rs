use crate::config::{Config, OUTPUT_EXTENSION, PROGRESS_INTERVAL};
use crate::error::PipelineError;
use crate::models::CategoryMode;
use crate::parser::WikiReader;
use crate::sanitize::{sanitize_text, sanitize_title};
use crate::stats::ExtractionStats;
use crate::titles::TitleSet;
use indicatif::{ProgressBar, ProgressStyle};
use rustc_hash::FxHashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, trace, warn};

/// Streams the dump once per mode and writes the cleaned text of every
/// member article to `<output_dir>/<sanitized title>.txt`.
pub struct DumpExtractor {
    dump_path: PathBuf,
    progress_interval: u64,
    dry_run: bool,
    cancel: Option<Arc<AtomicBool>>,
}

/// How one mode's pass ended.
#[derive(Debug)]
pub enum ModeOutcome {
    Completed(ExtractionStats),
    Skipped(PipelineError),
    Interrupted,
}

#[derive(Debug)]
pub struct ModeReport {
    pub mode: CategoryMode,
    pub outcome: ModeOutcome,
}

impl DumpExtractor {
    pub fn new(dump_path: impl Into<PathBuf>) -> Self {
        Self {
            dump_path: dump_path.into(),
            progress_interval: PROGRESS_INTERVAL,
            dry_run: false,
            cancel: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.data_filename).with_progress_interval(config.progress_interval)
    }

    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    /// Count matches without touching the output directory.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Checked between pages; once set the pass stops with `Interrupted`.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// One full pass over the dump for `mode`. The dump is re-opened on every
    /// call since the stream is not seekable.
    pub fn extract(
        &self,
        mode: &CategoryMode,
        titles: &TitleSet,
        output_dir: &Path,
    ) -> Result<ExtractionStats, PipelineError> {
        if titles.is_empty() {
            return Err(PipelineError::EmptyTitleSet {
                mode: mode.name().to_string(),
            });
        }

        let wanted = titles.sanitized();
        let reader = WikiReader::open(&self.dump_path)?;

        if !self.dry_run {
            fs::create_dir_all(output_dir).map_err(|e| PipelineError::io(output_dir, e))?;
        }

        info!(
            mode = %mode.kind,
            level = mode.level,
            titles = wanted.len(),
            dump = %self.dump_path.display(),
            "Extracting articles"
        );

        let stats = ExtractionStats::new();
        let mut found: FxHashSet<String> = FxHashSet::default();
        let pb = make_spinner(mode.name());

        for page in reader {
            if self.cancelled() {
                pb.finish_and_clear();
                warn!(
                    mode = %mode.kind,
                    scanned = stats.scanned(),
                    written = stats.written(),
                    "Extraction cancelled, partial output left in place"
                );
                return Err(PipelineError::Interrupted);
            }

            let page = match page {
                Ok(page) => page,
                Err(e) => {
                    pb.finish_and_clear();
                    return Err(e);
                }
            };

            let scanned = stats.inc_scanned();
            if scanned % self.progress_interval == 0 {
                pb.set_message(format!(
                    "{}: {} pages scanned, {} matched",
                    mode.name(),
                    scanned,
                    stats.matched()
                ));
                info!(mode = %mode.kind, scanned, matched = stats.matched(), "Progress");
            }

            let file_title = sanitize_title(&page.title);
            if !wanted.contains(&file_title) {
                trace!(title = %page.title, "Not in title set");
                continue;
            }

            stats.inc_matched();
            // Zero revisions still produce an (empty) artifact.
            let text = page.into_latest_text().unwrap_or_default();
            let cleaned = sanitize_text(&text);

            if !self.dry_run {
                let path = output_dir.join(format!("{}.{}", file_title, OUTPUT_EXTENSION));
                fs::write(&path, cleaned.as_bytes()).map_err(|e| PipelineError::io(&path, e))?;
                stats.record_write(cleaned.len() as u64);
            }
            found.insert(file_title);
        }

        pb.finish_and_clear();

        let missing = wanted.len().saturating_sub(found.len()) as u64;
        stats.set_missing(missing);
        if missing > 0 {
            warn!(mode = %mode.kind, missing, "Titles not found in dump");
        }

        info!(
            mode = %mode.kind,
            scanned = stats.scanned(),
            matched = stats.matched(),
            written = stats.written(),
            "Extraction finished"
        );

        Ok(stats)
    }

    /// Runs every mode in order. An empty title set skips only its mode; a
    /// stream or I/O failure aborts the run; cancellation stops before the
    /// next mode and is reported, not returned.
    pub fn run(
        &self,
        config: &Config,
        title_sets: Vec<(CategoryMode, TitleSet)>,
    ) -> Result<Vec<ModeReport>, PipelineError> {
        let mut reports = Vec::with_capacity(title_sets.len());

        for (mode, titles) in title_sets {
            let output_dir = config.mode_output_dir(&mode);
            match self.extract(&mode, &titles, &output_dir) {
                Ok(stats) => reports.push(ModeReport {
                    mode,
                    outcome: ModeOutcome::Completed(stats),
                }),
                Err(PipelineError::Interrupted) => {
                    reports.push(ModeReport {
                        mode,
                        outcome: ModeOutcome::Interrupted,
                    });
                    break;
                }
                Err(e) if e.is_recoverable() => {
                    error!(mode = %mode.kind, "Skipping mode: {}", e);
                    reports.push(ModeReport {
                        mode,
                        outcome: ModeOutcome::Skipped(e),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        Ok(reports)
    }
}

fn make_spinner(mode: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb.set_message(format!("{}: scanning dump", mode));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModeKind;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn page_xml(title: &str, revisions: &[&str]) -> String {
        let mut xml = format!("<page><title>{}</title><ns>0</ns>", title);
        for text in revisions {
            xml.push_str(&format!(
                "<revision><text xml:space=\"preserve\">{}</text></revision>",
                text
            ));
        }
        xml.push_str("</page>");
        xml
    }

    fn dump(pages: &[String]) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".xml").tempfile().unwrap();
        writeln!(file, "<mediawiki>").unwrap();
        for page in pages {
            writeln!(file, "{}", page).unwrap();
        }
        writeln!(file, "</mediawiki>").unwrap();
        file.flush().unwrap();
        file
    }

    fn titles(items: &[&str]) -> TitleSet {
        items.iter().map(|t| t.to_string()).collect()
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn separator_titles_match_sanitized_set_only() {
        let file = dump(&[page_xml("Alpha", &["old text"]), page_xml("Alpha/Sub", &["x"])]);
        let out = TempDir::new().unwrap();
        let extractor = DumpExtractor::new(file.path());

        let stats = extractor
            .extract(&CategoryMode::general(4), &titles(&["Alpha-Sub"]), out.path())
            .unwrap();

        assert_eq!(file_names(out.path()), vec!["Alpha-Sub.txt"]);
        assert_eq!(fs::read_to_string(out.path().join("Alpha-Sub.txt")).unwrap(), "x");
        assert_eq!(stats.scanned(), 2);
        assert_eq!(stats.matched(), 1);
    }

    #[test]
    fn only_last_revision_is_written() {
        let file = dump(&[page_xml("Dog", &["first", "''second''"])]);
        let out = TempDir::new().unwrap();
        DumpExtractor::new(file.path())
            .extract(&CategoryMode::general(4), &titles(&["Dog"]), out.path())
            .unwrap();
        assert_eq!(fs::read_to_string(out.path().join("Dog.txt")).unwrap(), "second");
    }

    #[test]
    fn page_without_revisions_writes_empty_file() {
        let file = dump(&[page_xml("Empty", &[])]);
        let out = TempDir::new().unwrap();
        let stats = DumpExtractor::new(file.path())
            .extract(&CategoryMode::general(4), &titles(&["Empty"]), out.path())
            .unwrap();
        assert_eq!(fs::read_to_string(out.path().join("Empty.txt")).unwrap(), "");
        assert_eq!(stats.written(), 1);
    }

    #[test]
    fn empty_title_set_is_rejected_before_reading() {
        let out = TempDir::new().unwrap();
        let err = DumpExtractor::new("/nonexistent/dump.xml")
            .extract(&CategoryMode::general(4), &TitleSet::new(), out.path())
            .unwrap_err();
        assert!(matches!(err, PipelineError::EmptyTitleSet { .. }));
    }

    #[test]
    fn missing_dump_is_stream_error() {
        let out = TempDir::new().unwrap();
        let err = DumpExtractor::new("/nonexistent/dump.xml")
            .extract(&CategoryMode::general(4), &titles(&["Dog"]), out.path())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Stream { .. }));
    }

    #[test]
    fn dry_run_writes_nothing() {
        let file = dump(&[page_xml("Dog", &["Hello"])]);
        let out = TempDir::new().unwrap();
        let target = out.path().join("general");
        let stats = DumpExtractor::new(file.path())
            .dry_run(true)
            .extract(&CategoryMode::general(4), &titles(&["Dog"]), &target)
            .unwrap();
        assert_eq!(stats.matched(), 1);
        assert_eq!(stats.written(), 0);
        assert!(!target.exists());
    }

    #[test]
    fn missing_titles_are_counted() {
        let file = dump(&[page_xml("Dog", &["Hello"])]);
        let out = TempDir::new().unwrap();
        let stats = DumpExtractor::new(file.path())
            .extract(&CategoryMode::general(4), &titles(&["Dog", "Cat", "Cow"]), out.path())
            .unwrap();
        assert_eq!(stats.missing(), 2);
    }

    #[test]
    fn cancel_flag_stops_pass() {
        let file = dump(&[page_xml("Dog", &["Hello"]), page_xml("Cat", &["Meow"])]);
        let out = TempDir::new().unwrap();
        let flag = Arc::new(AtomicBool::new(true));
        let err = DumpExtractor::new(file.path())
            .with_cancel_flag(flag)
            .extract(&CategoryMode::general(4), &titles(&["Dog"]), out.path())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Interrupted));
    }

    #[test]
    fn run_skips_empty_mode_and_continues() {
        let file = dump(&[page_xml("Dog", &["Hello"]), page_xml("Cat", &["Meow"])]);
        let out = TempDir::new().unwrap();
        let config = Config::from_json(&format!(
            r#"{{"general_level": 4, "special_level": 5, "special_level_topics": ["People"],
                "data_filename": {:?}, "output_dir": {:?}}}"#,
            file.path(),
            out.path()
        ))
        .unwrap();
        let modes = config.modes();
        let sets = vec![
            (modes[0].clone(), TitleSet::new()),
            (modes[1].clone(), titles(&["Cat"])),
        ];

        let reports = DumpExtractor::from_config(&config).run(&config, sets).unwrap();

        assert_eq!(reports.len(), 2);
        assert!(matches!(
            reports[0].outcome,
            ModeOutcome::Skipped(PipelineError::EmptyTitleSet { .. })
        ));
        assert!(matches!(reports[1].outcome, ModeOutcome::Completed(_)));
        assert_eq!(reports[1].mode.kind, ModeKind::Special);
        assert_eq!(
            fs::read_to_string(out.path().join("special").join("Cat.txt")).unwrap(),
            "Meow"
        );
        assert!(!out.path().join("general").exists());
    }

    #[test]
    fn run_aborts_on_stream_error() {
        let out = TempDir::new().unwrap();
        let config = Config::from_json(&format!(
            r#"{{"general_level": 4, "data_filename": "/nonexistent/dump.xml", "output_dir": {:?}}}"#,
            out.path()
        ))
        .unwrap();
        let sets = vec![(config.modes()[0].clone(), titles(&["Dog"]))];
        let err = DumpExtractor::from_config(&config).run(&config, sets).unwrap_err();
        assert!(matches!(err, PipelineError::Stream { .. }));
    }

    #[test]
    fn run_stops_after_interrupted_mode() {
        let file = dump(&[page_xml("Dog", &["Hello"]), page_xml("Cat", &["Meow"])]);
        let out = TempDir::new().unwrap();
        let config = Config::from_json(&format!(
            r#"{{"general_level": 4, "special_level": 5, "special_level_topics": ["People"],
                "data_filename": {:?}, "output_dir": {:?}}}"#,
            file.path(),
            out.path()
        ))
        .unwrap();
        let modes = config.modes();
        let sets = vec![
            (modes[0].clone(), titles(&["Dog"])),
            (modes[1].clone(), titles(&["Cat"])),
        ];

        let reports = DumpExtractor::from_config(&config)
            .with_cancel_flag(Arc::new(AtomicBool::new(true)))
            .run(&config, sets)
            .unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].mode.kind, ModeKind::General);
        assert!(matches!(reports[0].outcome, ModeOutcome::Interrupted));
        assert!(!out.path().join("general").join("Dog.txt").exists());
        assert!(!out.path().join("special").exists());
    }
}
