//! Regulatory and course text chunking
//!
//! Documents are split at detected headings first, then each section is cut
//! into embedding-sized pieces either at a fixed character width or at
//! paragraph boundaries.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    /// "Chapter 4", "Part 7", "Section 2", "Module 3"
    Chapter,
    /// A BS 7671 regulation number such as 411.3.3
    Regulation,
    /// A markdown `#` heading
    Heading,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub kind: SectionKind,
    pub title: String,
    /// Byte offset of the heading line.
    pub offset: usize,
    /// 1-based line number of the heading.
    pub line: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentChunk {
    pub source: String,
    pub section: Option<String>,
    pub index: usize,
    pub text: String,
    pub token_estimate: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStrategy {
    Fixed { size: usize, overlap: usize },
    Paragraph { max_chars: usize },
}

impl Default for ChunkStrategy {
    fn default() -> Self {
        ChunkStrategy::Paragraph { max_chars: 1500 }
    }
}

/// Rough token count: four characters per token, rounded up.
pub fn token_estimate(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

fn heading_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(#{1,6})\s+(.+?)\s*#*\s*$").expect("valid regex"))
}

fn chapter_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(chapter|part|section|module)\s+(\d+[a-z]?)\b[\s:.\-–]*(.*)$")
            .expect("valid regex")
    })
}

fn regulation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d{3}(?:\.\d+){1,3})\s+(\S.*)$").expect("valid regex"))
}

fn classify_line(line: &str) -> Option<(SectionKind, String)> {
    if let Some(caps) = heading_regex().captures(line) {
        return Some((SectionKind::Heading, caps[2].trim().to_string()));
    }
    if let Some(caps) = chapter_regex().captures(line) {
        let mut word = caps[1].to_lowercase();
        if let Some(first) = word.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        let rest = caps[3].trim();
        let title = if rest.is_empty() {
            format!("{} {}", word, &caps[2])
        } else {
            format!("{} {}: {}", word, &caps[2], rest)
        };
        return Some((SectionKind::Chapter, title));
    }
    if let Some(caps) = regulation_regex().captures(line) {
        let text = caps[2].trim();
        // Numbered prose lines ("230 volts is ...") are not headings.
        if text.len() <= 100 && !text.ends_with('.') {
            return Some((SectionKind::Regulation, format!("{} {}", &caps[1], text)));
        }
    }
    None
}

/// Find chapter, regulation and markdown headings, in document order.
pub fn detect_sections(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut offset = 0;
    for (i, line) in text.split_inclusive('\n').enumerate() {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if let Some((kind, title)) = classify_line(trimmed) {
            sections.push(Section {
                kind,
                title,
                offset,
                line: i + 1,
            });
        }
        offset += line.len();
    }
    sections
}

/// Fixed-width chunks of `size` characters, each overlapping the previous by
/// `overlap` characters. Overlap is clamped below `size`.
pub fn chunk_fixed(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let size = size.max(1);
    let overlap = overlap.min(size - 1);
    let step = size - overlap;

    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = boundaries.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < char_count {
        let end = (start + size).min(char_count);
        let piece = &text[boundaries[start]..boundaries[end]];
        if !piece.trim().is_empty() {
            chunks.push(piece.to_string());
        }
        if end == char_count {
            break;
        }
        start += step;
    }
    chunks
}

fn paragraph_split_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\r?\n[ \t]*\r?\n").expect("valid regex"))
}

/// Pack whole paragraphs into chunks of at most `max_chars` characters.
/// A paragraph longer than the limit is cut with [`chunk_fixed`].
pub fn chunk_paragraphs(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for paragraph in paragraph_split_regex().split(text) {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        let len = paragraph.chars().count();

        if !current.is_empty() && current_len + 2 + len <= max_chars {
            current.push_str("\n\n");
            current.push_str(paragraph);
            current_len += 2 + len;
            continue;
        }
        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if len > max_chars {
            chunks.extend(chunk_fixed(paragraph, max_chars, 0));
        } else {
            current.push_str(paragraph);
            current_len = len;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn apply_strategy(text: &str, strategy: ChunkStrategy) -> Vec<String> {
    match strategy {
        ChunkStrategy::Fixed { size, overlap } => chunk_fixed(text, size, overlap),
        ChunkStrategy::Paragraph { max_chars } => chunk_paragraphs(text, max_chars),
    }
}

/// Split a document into section-tagged chunks ready for embedding.
pub fn chunk_document(source: &str, text: &str, strategy: ChunkStrategy) -> Vec<ContentChunk> {
    let sections = detect_sections(text);

    let mut segments: Vec<(Option<String>, &str)> = Vec::new();
    let first = sections.first().map(|s| s.offset).unwrap_or(text.len());
    if first > 0 {
        segments.push((None, &text[..first]));
    }
    for (i, section) in sections.iter().enumerate() {
        let end = sections.get(i + 1).map(|s| s.offset).unwrap_or(text.len());
        segments.push((Some(section.title.clone()), &text[section.offset..end]));
    }

    let mut chunks = Vec::new();
    for (section, body) in segments {
        for piece in apply_strategy(body, strategy) {
            chunks.push(ContentChunk {
                source: source.to_string(),
                section: section.clone(),
                index: chunks.len(),
                token_estimate: token_estimate(&piece),
                text: piece,
            });
        }
    }

    tracing::debug!(
        "Chunked {} into {} chunk(s) across {} section(s)",
        source,
        chunks.len(),
        sections.len()
    );
    chunks
}
