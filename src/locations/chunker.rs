//! Per-section chunking
//!
//! Splits the text under a section's `<body>` into fixed-size chunks and
//! addresses each chunk with a range CFI. Whitespace-only text nodes are
//! skipped. Chunk *n+1* starts exactly where chunk *n* ends.

use crate::cfi::{address_from_range, resolve, AddressPath, CanonicalAddress, CfiError};
use crate::tree::{DocumentTree, TreePosition, TreeWalker};

/// A word-mode location: the chunk address and the words it holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordLocation {
    pub address: CanonicalAddress,
    pub word_count: usize,
}

fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Character chunks of `break_size` characters
pub(crate) fn character_chunks<T: DocumentTree + ?Sized>(
    doc: &T,
    base: &AddressPath,
    break_size: usize,
) -> Result<Vec<CanonicalAddress>, CfiError> {
    let break_size = break_size.max(1);
    let mut bounds = Vec::new();
    let mut open: Option<TreePosition<T::Node>> = None;
    let mut counter = 0;
    let mut last = None;

    for node in TreeWalker::new(doc, doc.body()).text_nodes() {
        let Some(text) = doc.text(node) else { continue };
        if is_blank(text) {
            continue;
        }

        let len = text.chars().count();
        let mut pos = 0;
        if open.is_none() {
            open = Some(TreePosition::at(node, 0));
        }

        loop {
            let dist = break_size - counter;
            if pos + dist > len {
                counter += len - pos;
                break;
            }
            pos += dist;
            if let Some(start) = open.replace(TreePosition::at(node, pos)) {
                bounds.push((start, TreePosition::at(node, pos)));
            }
            counter = 0;
        }

        last = Some(TreePosition::at(node, len));
    }

    if counter > 0 {
        if let (Some(start), Some(end)) = (open, last) {
            bounds.push((start, end));
        }
    }

    bounds
        .into_iter()
        .map(|(start, end)| address_from_range(doc, start, end, base))
        .collect()
}

/// Char offsets `(start, end)` of each whitespace-separated word
fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;
    let mut len = 0;

    for (index, ch) in text.chars().enumerate() {
        match (ch.is_whitespace(), start) {
            (false, None) => start = Some(index),
            (true, Some(s)) => {
                spans.push((s, index));
                start = None;
            }
            _ => {}
        }
        len = index + 1;
    }
    if let Some(s) = start {
        spans.push((s, len));
    }

    spans
}

/// Word chunks of `word_break` words.
///
/// With a `start` address in this section, text before it is skipped.
pub(crate) fn word_chunks<T: DocumentTree + ?Sized>(
    doc: &T,
    base: &AddressPath,
    word_break: usize,
    start: Option<&CanonicalAddress>,
) -> Result<Vec<WordLocation>, CfiError> {
    let word_break = word_break.max(1);
    // Pre-order ordinal of the start node; text ahead of it is skipped
    let skip_to = match start {
        Some(address) => {
            let position = resolve(doc, address)?;
            TreeWalker::new(doc, doc.body())
                .position(|node| node == position.node)
                .map(|ordinal| (ordinal, position.node, position.offset.unwrap_or(0)))
        }
        None => None,
    };

    let mut chunks = Vec::new();
    let mut open: Option<TreePosition<T::Node>> = None;
    let mut counter = 0;
    let mut last = None;

    for (ordinal, node) in TreeWalker::new(doc, doc.body()).enumerate() {
        let Some(text) = doc.text(node) else { continue };
        let min_offset = match skip_to {
            Some((first, start_node, offset)) if ordinal <= first => {
                if node != start_node {
                    continue;
                }
                offset
            }
            _ => 0,
        };

        if is_blank(text) {
            continue;
        }

        for (word_start, word_end) in word_spans(text) {
            if word_start < min_offset {
                continue;
            }
            if open.is_none() {
                open = Some(TreePosition::at(node, word_start));
            }
            counter += 1;
            if counter == word_break {
                if let Some(chunk_start) = open.take() {
                    chunks.push((chunk_start, TreePosition::at(node, word_end), counter));
                }
                counter = 0;
            }
            last = Some(TreePosition::at(node, word_end));
        }
    }

    if counter > 0 {
        if let (Some(chunk_start), Some(end)) = (open, last) {
            chunks.push((chunk_start, end, counter));
        }
    }

    chunks
        .into_iter()
        .map(|(chunk_start, end, word_count)| {
            Ok(WordLocation {
                address: address_from_range(doc, chunk_start, end, base)?,
                word_count,
            })
        })
        .collect()
}
