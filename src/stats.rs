use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one mode's pass over the dump
#[derive(Default, Debug)]
pub struct ExtractionStats {
    pub pages_scanned: AtomicU64,
    pub pages_matched: AtomicU64,
    pub files_written: AtomicU64,
    pub bytes_written: AtomicU64,
    pub titles_missing: AtomicU64,
}

impl ExtractionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the new total, which drives progress reporting.
    pub fn inc_scanned(&self) -> u64 {
        self.pages_scanned.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn inc_matched(&self) {
        self.pages_matched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write(&self, bytes: u64) {
        self.files_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn set_missing(&self, count: u64) {
        self.titles_missing.store(count, Ordering::Relaxed);
    }

    pub fn scanned(&self) -> u64 {
        self.pages_scanned.load(Ordering::Relaxed)
    }

    pub fn matched(&self) -> u64 {
        self.pages_matched.load(Ordering::Relaxed)
    }

    pub fn written(&self) -> u64 {
        self.files_written.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    pub fn missing(&self) -> u64 {
        self.titles_missing.load(Ordering::Relaxed)
    }
}
