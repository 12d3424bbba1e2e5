use anyhow::{anyhow, bail, Context, Result};
use langchain_rust::schemas::Document;
use langchain_rust::vectorstore::{VecStoreOptions, VectorStore};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::utils::slugify;

/// Target chunk size in characters, roughly 500 tokens.
pub const CHUNK_SIZE: usize = 2_000;
pub const CHUNK_OVERLAP: usize = 200;

/// Break points tried in order when a chunk must be cut: paragraph, line,
/// sentence, word. Text with none of these is cut at the size limit.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Split text into overlapping chunks, preferring natural break points.
///
/// The text is first decomposed into pieces no longer than `chunk_size`,
/// splitting on the coarsest separator that applies, then pieces are merged
/// back greedily; the tail of each emitted chunk (up to `chunk_overlap`
/// characters' worth of pieces) is carried into the next chunk.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    decompose(text, chunk_size, &SEPARATORS, &mut pieces);
    let mut chunks = merge_pieces(pieces, chunk_size, chunk_overlap);
    chunks.retain(|c| !c.trim().is_empty());
    chunks
}

fn decompose(text: &str, chunk_size: usize, separators: &[&str], out: &mut Vec<String>) {
    if text.chars().count() <= chunk_size {
        out.push(text.to_string());
        return;
    }
    let Some((sep, rest)) = separators.split_first() else {
        // No separator left: hard cut at the size limit.
        let chars: Vec<char> = text.chars().collect();
        for window in chars.chunks(chunk_size) {
            out.push(window.iter().collect());
        }
        return;
    };
    if !text.contains(sep) {
        return decompose(text, chunk_size, rest, out);
    }
    for part in text.split_inclusive(sep) {
        if part.chars().count() <= chunk_size {
            out.push(part.to_string());
        } else {
            decompose(part, chunk_size, rest, out);
        }
    }
}

fn merge_pieces(pieces: Vec<String>, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut window: Vec<String> = Vec::new();
    let mut total = 0usize;

    for piece in pieces {
        let piece_len = piece.chars().count();
        if total + piece_len > chunk_size && !window.is_empty() {
            chunks.push(window.concat());
            // Drop pieces from the front until what remains fits as overlap.
            while total > chunk_overlap || (total + piece_len > chunk_size && total > 0) {
                let first = window.remove(0);
                total -= first.chars().count();
                if window.is_empty() {
                    break;
                }
            }
        }
        window.push(piece);
        total += piece_len;
    }
    if !window.is_empty() {
        chunks.push(window.concat());
    }
    chunks
}

/// True for the metadata value kinds the vector store can filter on.
fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

/// Flatten a record's JSON into store metadata: scalar fields only, plus the
/// company slug used as the retrieval partition key and the source filename.
fn chunk_metadata(record_json: &Value, company: &str, source_txt: &str) -> HashMap<String, Value> {
    let mut meta = HashMap::new();
    if let Value::Object(map) = record_json {
        for (key, value) in map {
            if is_scalar(value) {
                meta.insert(key.clone(), value.clone());
            }
        }
    }
    meta.insert(
        "company_slug".to_string(),
        Value::String(slugify(company)),
    );
    meta.insert(
        "source_txt".to_string(),
        Value::String(source_txt.to_string()),
    );
    meta
}

/// Chunk and embed every interim text artifact under `interim_dir` into the
/// vector store. Per-document failures are logged and skipped; producing zero
/// chunks overall is an error, since an empty index is never a valid build.
/// Returns the number of chunks stored.
pub async fn build_index(
    interim_dir: &Path,
    store: &dyn VectorStore,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<usize> {
    let mut company_dirs: Vec<_> = fs::read_dir(interim_dir)
        .with_context(|| format!("failed to read {}", interim_dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    company_dirs.sort();

    let mut total_chunks = 0usize;
    for company_dir in &company_dirs {
        let txt_dir = company_dir.join("txt");
        if !txt_dir.is_dir() {
            continue;
        }
        let company = company_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut txt_paths: Vec<_> = fs::read_dir(&txt_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "txt"))
            .collect();
        txt_paths.sort();

        for txt_path in txt_paths {
            match index_document(&txt_path, company_dir, &company, store, chunk_size, chunk_overlap)
                .await
            {
                Ok(n) => total_chunks += n,
                Err(e) => log::error!("skipping {}: {:#}", txt_path.display(), e),
            }
        }
    }

    if total_chunks == 0 {
        bail!("no document chunks produced; nothing to index");
    }
    Ok(total_chunks)
}

async fn index_document(
    txt_path: &Path,
    company_dir: &Path,
    company: &str,
    store: &dyn VectorStore,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<usize> {
    let stem = txt_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let json_path = company_dir.join("json").join(format!("{}.json", stem));
    if !json_path.exists() {
        log::warn!("skipping {} (no JSON metadata)", txt_path.display());
        return Ok(0);
    }

    let record_json: Value = serde_json::from_str(&fs::read_to_string(&json_path)?)
        .with_context(|| format!("failed to parse {}", json_path.display()))?;
    let source_txt = txt_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let metadata = chunk_metadata(&record_json, company, &source_txt);

    let text = fs::read_to_string(txt_path)?;
    let chunks = split_text(&text, chunk_size, chunk_overlap);
    log::info!("  - {} -> {} chunks", txt_path.display(), chunks.len());
    if chunks.is_empty() {
        return Ok(0);
    }

    let documents: Vec<Document> = chunks
        .into_iter()
        .map(|chunk| Document {
            page_content: chunk,
            metadata: metadata.clone(),
            score: 0.0,
        })
        .collect();

    let count = documents.len();
    store
        .add_documents(&documents, &VecStoreOptions::default())
        .await
        .map_err(|e| anyhow!("failed to store chunks for {}: {}", source_txt, e))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = split_text("just a short note", 2_000, 200);
        assert_eq!(chunks, vec!["just a short note".to_string()]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(split_text("", 2_000, 200).is_empty());
        assert!(split_text("\n\n\n", 2_000, 200).is_empty());
    }

    #[test]
    fn chunks_respect_the_size_limit() {
        let text = "word ".repeat(400);
        for chunk in split_text(&text, 100, 20) {
            assert!(chunk.chars().count() <= 100, "chunk too long: {}", chunk.len());
        }
    }

    #[test]
    fn paragraph_breaks_are_preferred() {
        let para_a = "a".repeat(60);
        let para_b = "b".repeat(60);
        let text = format!("{}\n\n{}", para_a, para_b);
        let chunks = split_text(&text, 80, 0);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with(&para_a));
        assert_eq!(chunks[1], para_b);
    }

    #[test]
    fn neighboring_chunks_overlap() {
        let text = (0..40)
            .map(|i| format!("sentence number {:02}. ", i))
            .collect::<String>();
        let chunks = split_text(&text, 100, 40);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let tail: String = pair[0]
                .chars()
                .skip(pair[0].chars().count().saturating_sub(20))
                .collect();
            assert!(
                pair[1].contains(tail.trim_end()),
                "no overlap between consecutive chunks"
            );
        }
    }

    #[test]
    fn nested_metadata_is_dropped() {
        let record = serde_json::json!({
            "company": "Acme",
            "revenue": 1200,
            "ytd_qtr_fixed": true,
            "notes": {"nested": "object"},
            "tags": ["a", "b"],
            "period_end_date": null
        });
        let meta = chunk_metadata(&record, "Acme Industries", "q1.txt");
        assert_eq!(meta["company"], Value::String("Acme".to_string()));
        assert_eq!(meta["company_slug"], Value::String("acme-industries".to_string()));
        assert_eq!(meta["source_txt"], Value::String("q1.txt".to_string()));
        assert!(!meta.contains_key("notes"));
        assert!(!meta.contains_key("tags"));
        assert!(!meta.contains_key("period_end_date"));
    }
}
