//! Lossy wikitext cleanup.
//!
//! Passes run in a fixed order and later passes assume the earlier ones ran:
//! references, then trigger-word templates, then bold/italic and link markers.
//! This is not a wikitext grammar; unterminated constructs are left as found.

use crate::config::TEMPLATE_TRIGGER_WORDS;
use memchr::memchr;
use once_cell::sync::Lazy;
use regex::Regex;

/// Self-closing refs, paired refs (any content, multi-line) and stray
/// `<ref ...>` / `</ref>` / `<references />` tags, in that priority.
static REF_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<ref\b[^>]*/>|<ref\b[^>]*>.*?</ref\s*>|</?ref[^>]*>").unwrap()
});

/// Cleans one revision's raw text.
pub fn sanitize_text(text: &str) -> String {
    let text = strip_refs(text);
    let text = strip_trigger_templates(&text);
    strip_markers(&text)
}

/// Makes a page title safe to use as a file name.
pub fn sanitize_title(title: &str) -> String {
    title.replace(['/', '\\'], "-")
}

pub fn strip_refs(text: &str) -> String {
    REF_REGEX.replace_all(text, "").into_owned()
}

/// Removes each outermost `{{ ... }}` span whose content mentions a trigger
/// word; other spans are copied through byte for byte.
pub fn strip_trigger_templates(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut result = String::with_capacity(text.len());
    let mut run_start = 0;
    let mut i = 0;

    while let Some(offset) = memchr(b'{', &bytes[i..]) {
        let open = i + offset;
        if open + 1 >= bytes.len() || bytes[open + 1] != b'{' {
            i = open + 1;
            continue;
        }

        match find_matching_close(bytes, open) {
            Some(close) => {
                let end = close + 2;
                let inner = &text[open + 2..close];
                if has_trigger_word(inner) {
                    result.push_str(&text[run_start..open]);
                    run_start = end;
                }
                i = end;
            }
            // Unterminated; keep the remainder verbatim.
            None => break,
        }
    }

    result.push_str(&text[run_start..]);
    result
}

/// Index of the `}}` closing the `{{` at `start`, counting nested pairs.
fn find_matching_close(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth: i32 = 0;
    let mut i = start;
    while i + 1 < bytes.len() {
        if bytes[i] == b'{' && bytes[i + 1] == b'{' {
            depth += 1;
            i += 2;
        } else if bytes[i] == b'}' && bytes[i + 1] == b'}' {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
            i += 2;
        } else {
            i += 1;
        }
    }
    None
}

fn has_trigger_word(inner: &str) -> bool {
    let lowered = inner.to_lowercase();
    TEMPLATE_TRIGGER_WORDS.iter().any(|w| lowered.contains(w))
}

/// Drops `'''`, `''`, `[[` and `]]`, keeping the text they wrap.
pub fn strip_markers(text: &str) -> String {
    text.replace("'''", "")
        .replace("''", "")
        .replace("[[", "")
        .replace("]]", "")
}
