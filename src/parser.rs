use crate::error::PipelineError;
use crate::models::{PageRecord, Revision};
use bzip2::read::MultiBzDecoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::mem;
use std::path::{Path, PathBuf};

const READ_BUFFER_BYTES: usize = 1024 * 1024;

/// Single-pass reader over the `<page>` records of a MediaWiki XML dump.
///
/// Yields `Err` once and then stops if the stream turns out to be malformed
/// or truncated.
pub struct WikiReader {
    reader: Reader<Box<dyn BufRead>>,
    buf: Vec<u8>,
    path: PathBuf,
    state: PageState,
    done: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Ns,
    Id,
    Timestamp,
    Text,
}

#[derive(Default)]
struct PageState {
    page: Option<PageRecord>,
    revision: Option<Revision>,
    in_contributor: bool,
    field: Option<Field>,
    text: String,
}

impl PageState {
    fn start(&mut self, name: &[u8]) {
        match name {
            b"page" => {
                self.page = Some(PageRecord::default());
                self.revision = None;
                self.in_contributor = false;
            }
            b"revision" if self.page.is_some() => self.revision = Some(Revision::default()),
            b"contributor" => self.in_contributor = true,
            b"title" => self.begin(Field::Title),
            b"ns" => self.begin(Field::Ns),
            b"id" if !self.in_contributor => self.begin(Field::Id),
            b"timestamp" => self.begin(Field::Timestamp),
            b"text" => self.begin(Field::Text),
            _ => {}
        }
    }

    fn begin(&mut self, field: Field) {
        if self.page.is_some() {
            self.field = Some(field);
            self.text.clear();
        }
    }

    fn push_text(&mut self, text: &str) {
        if self.field.is_some() {
            self.text.push_str(text);
        }
    }

    fn redirect(&mut self, element: &BytesStart<'_>) {
        if let Some(page) = self.page.as_mut() {
            if let Ok(Some(attr)) = element.try_get_attribute("title") {
                if let Ok(value) = attr.unescape_value() {
                    page.redirect = Some(value.into_owned());
                }
            }
        }
    }

    /// Returns the finished page when `</page>` closes.
    fn end(&mut self, name: &[u8]) -> Option<PageRecord> {
        match name {
            b"title" | b"ns" | b"id" | b"timestamp" | b"text" => self.finish_field(),
            b"contributor" => self.in_contributor = false,
            b"revision" => {
                if let (Some(page), Some(revision)) = (self.page.as_mut(), self.revision.take()) {
                    page.revisions.push(revision);
                }
            }
            b"page" => {
                self.revision = None;
                self.field = None;
                return self.page.take();
            }
            _ => {}
        }
        None
    }

    fn finish_field(&mut self) {
        let Some(field) = self.field.take() else {
            return;
        };
        let value = mem::take(&mut self.text);
        let Some(page) = self.page.as_mut() else {
            return;
        };

        match (field, self.revision.as_mut()) {
            (Field::Text, Some(revision)) => revision.text = value,
            (Field::Timestamp, Some(revision)) => revision.timestamp = Some(value),
            (Field::Id, Some(revision)) => revision.id = value.trim().parse().ok(),
            (Field::Id, None) => page.id = value.trim().parse().ok(),
            (Field::Title, _) => page.title = value,
            (Field::Ns, _) => page.ns = value.trim().parse().ok(),
            _ => {}
        }
    }
}

impl WikiReader {
    /// Opens a dump file; `.bz2` files (including multistream) are decompressed on the fly.
    pub fn open(path: &Path) -> Result<Self, PipelineError> {
        let file = File::open(path).map_err(|e| PipelineError::stream(path, e))?;
        let is_bz2 = path.extension().map(|e| e == "bz2").unwrap_or(false);

        let inner: Box<dyn BufRead> = if is_bz2 {
            Box::new(BufReader::with_capacity(
                READ_BUFFER_BYTES,
                MultiBzDecoder::new(file),
            ))
        } else {
            Box::new(BufReader::with_capacity(READ_BUFFER_BYTES, file))
        };

        Ok(Self::from_reader(inner, path))
    }

    pub fn from_reader(inner: Box<dyn BufRead>, label: impl Into<PathBuf>) -> Self {
        Self {
            reader: Reader::from_reader(inner),
            buf: Vec::with_capacity(8192),
            path: label.into(),
            state: PageState::default(),
            done: false,
        }
    }
}

impl Iterator for WikiReader {
    type Item = Result<PageRecord, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(e) => {
                    self.done = true;
                    let message = format!("{} at byte {}", e, self.reader.buffer_position());
                    return Some(Err(PipelineError::stream(&self.path, message)));
                }
            };

            match event {
                Event::Start(ref e) => {
                    if e.name().as_ref() == b"redirect" {
                        self.state.redirect(e);
                    }
                    self.state.start(e.name().as_ref());
                }
                Event::Empty(ref e) => {
                    if e.name().as_ref() == b"redirect" {
                        self.state.redirect(e);
                    }
                }
                Event::Text(ref e) => match e.unescape() {
                    Ok(text) => self.state.push_text(&text),
                    Err(err) => {
                        self.done = true;
                        return Some(Err(PipelineError::stream(&self.path, err)));
                    }
                },
                Event::CData(ref e) => {
                    let text = String::from_utf8_lossy(e);
                    self.state.push_text(&text);
                }
                Event::End(ref e) => {
                    if let Some(page) = self.state.end(e.name().as_ref()) {
                        return Some(Ok(page));
                    }
                }
                Event::Eof => {
                    self.done = true;
                    if self.state.page.is_some() {
                        return Some(Err(PipelineError::stream(
                            &self.path,
                            "dump ended inside a <page> element",
                        )));
                    }
                    return None;
                }
                _ => {}
            }
        }
    }
}
