//! Header-aware document chunker.
//!
//! Splits a document's rendered text (title + category + body) into
//! bounded-size segments on markdown header boundaries. Chunking the same
//! document twice yields byte-identical chunk sequences.

use labbot_core::types::{Chunk, ChunkMetadata, Document};

/// Split a document into indexable chunks.
///
/// Returns an empty vec (with a warning) for documents without a stable
/// article number: chunk ids must stay stable across re-indexing for
/// delete-then-replace updates to work, so a synthetic id is never invented.
pub fn split_document(document: &Document, max_chunk_size: usize) -> Vec<Chunk> {
    let post_number = match document.number {
        Some(n) => n,
        None => {
            tracing::warn!(
                "Skipping document without article number: {}",
                if document.title.is_empty() { "Unknown" } else { &document.title }
            );
            return Vec::new();
        }
    };

    let full_text = format!(
        "# {}\n\nカテゴリ: {}\n\n{}",
        document.title, document.category, document.body_md
    );

    split_by_headers(&full_text, max_chunk_size)
        .into_iter()
        .filter(|section| !section.trim().is_empty())
        .enumerate()
        .map(|(i, text)| Chunk {
            id: Chunk::id_for(post_number, i),
            text,
            metadata: ChunkMetadata {
                post_number,
                title: document.title.clone(),
                url: document.url.clone(),
                updated_at: document.updated_at.clone(),
                created_by: document.created_by.clone(),
                category: document.category.clone(),
                chunk_index: i,
            },
        })
        .collect()
}

/// Header-based text splitter. Sizes are in characters, not bytes.
///
/// A header line starts a new chunk once the running buffer exceeds half the
/// budget; a body line that would overflow the budget flushes first. A
/// document with no headers therefore splits purely by size.
fn split_by_headers(text: &str, max_chunk_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_size = 0usize;

    for line in text.split('\n') {
        let line_size = line.chars().count();

        if is_header_line(line) {
            if current_size * 2 > max_chunk_size {
                if !current.is_empty() {
                    chunks.push(current.join("\n"));
                }
                current = vec![line];
                current_size = line_size;
            } else {
                current.push(line);
                current_size += line_size;
            }
        } else if current_size + line_size > max_chunk_size {
            if !current.is_empty() {
                chunks.push(current.join("\n"));
            }
            current = vec![line];
            current_size = line_size;
        } else {
            current.push(line);
            current_size += line_size;
        }
    }

    if !current.is_empty() {
        chunks.push(current.join("\n"));
    }

    chunks
}

/// Markdown header: 1–6 `#`, whitespace, non-empty rest.
fn is_header_line(line: &str) -> bool {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return false;
    }
    let rest = &line[hashes..];
    rest.starts_with(|c: char| c.is_whitespace()) && !rest.trim().is_empty()
}
