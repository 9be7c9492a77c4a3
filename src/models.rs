use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeKind {
    General,
    Special,
}

impl ModeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModeKind::General => "general",
            ModeKind::Special => "special",
        }
    }
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A curation tier: its hierarchy level and, for filtered modes, the topics
/// whose subpages are followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMode {
    pub kind: ModeKind,
    pub level: u32,
    pub topics: Option<Vec<String>>,
}

impl CategoryMode {
    pub fn new(kind: ModeKind, level: u32, topics: Option<Vec<String>>) -> Self {
        Self {
            kind,
            level,
            topics,
        }
    }

    pub fn general(level: u32) -> Self {
        Self::new(ModeKind::General, level, None)
    }

    pub fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    /// General mode keeps every subpage; every other mode filters by topic.
    pub fn is_filtered(&self) -> bool {
        self.kind != ModeKind::General
    }
}

#[derive(Debug, Clone, Default)]
pub struct Revision {
    pub id: Option<u64>,
    pub timestamp: Option<String>,
    pub text: String,
}

/// One `<page>` of the dump with its revisions in document order.
#[derive(Debug, Clone, Default)]
pub struct PageRecord {
    pub id: Option<u64>,
    pub ns: Option<i32>,
    pub title: String,
    pub redirect: Option<String>,
    pub revisions: Vec<Revision>,
}

impl PageRecord {
    /// Consumes the record and keeps only the final revision's text. Dumps
    /// list revisions oldest first, so this is the current text.
    pub fn into_latest_text(self) -> Option<String> {
        self.revisions.into_iter().last().map(|r| r.text)
    }
}
