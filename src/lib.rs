//! Vitalwiki: Wikipedia vital articles resolution and dump extraction
//!
//! This crate provides a two-stage pipeline that turns the curated "vital
//! articles" listings into per-article plain text files:
//!
//! 1. **Resolution Pass** -- Fetch the listing page for each category mode,
//!    follow its level subpages (filtered by topic for the special mode), and
//!    recover article titles from the visible text of list and table links
//! 2. **Extraction Pass** -- Stream the XML dump once per mode, keep the pages
//!    whose titles are in the mode's title set, and write the cleaned text of
//!    each page's latest revision to `output/<mode>/<title>.txt`
//!
//! # Architecture
//!
//! - **Owned markup tree** -- Listing HTML is parsed once into a small owned
//!   tree so resolution rules can be tested against hand-built fixtures
//! - **Streaming XML parsing** -- Never loads the dump into memory; uses
//!   event-based parsing with multistream BZ2 decompression
//! - **Sequential and polite** -- One blocking request at a time with a fixed
//!   delay between subpage fetches
//! - **Typed errors** -- Recoverable failures (one URL, one mode) are logged
//!   and skipped; stream failures abort the run
//!
//! # Key Modules
//!
//! - [`config`] -- Run configuration and pipeline constants
//! - [`fetch`] -- Blocking HTTP fetcher behind the [`fetch::Fetch`] trait
//! - [`markup`] -- Owned element tree built from parsed HTML
//! - [`discover`] -- Level subpage discovery with topic filtering
//! - [`resolve`] -- Title recovery from table and nested-list layouts
//! - [`articles`] -- Per-mode title set construction and persistence
//! - [`titles`] -- The title set type and its on-disk format
//! - [`parser`] -- Streaming dump reader
//! - [`sanitize`] -- Wikitext cleanup for refs, citation templates and markup
//! - [`extract`] -- Dump extraction per mode
//! - [`stats`] -- Extraction counters
//! - [`models`] -- Core data types (CategoryMode, PageRecord, Revision)
//! - [`error`] -- Pipeline error taxonomy
//!
//! # Example Usage
//!
//! ```bash
//! # Resolve and save title sets for every configured mode
//! vitalwiki -v articles
//!
//! # Extract matching articles, building any missing title sets first
//! vitalwiki -v extract --clean
//! ```

pub mod articles;
pub mod config;
pub mod discover;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod markup;
pub mod models;
pub mod parser;
pub mod resolve;
pub mod sanitize;
pub mod stats;
pub mod titles;
