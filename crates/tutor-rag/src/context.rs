use std::fmt;

use tutor_core::types::{Payload, RetrievalHit};

/// Label used when a hit carries neither a document id nor a source path.
pub const UNKNOWN_SOURCE: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextEntry {
    /// 1-based, stable for the lifetime of one request.
    pub index: usize,
    pub label: String,
    pub content: String,
}

/// Retrieved passages in rank order, ready to be pasted into a prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextBlock {
    pub entries: Vec<ContextEntry>,
}

impl ContextBlock {
    /// Builds one entry per hit, in input order, cutting each content at
    /// `chunk_char_cap` characters.
    pub fn assemble(hits: &[RetrievalHit], chunk_char_cap: usize) -> Self {
        let entries = hits
            .iter()
            .enumerate()
            .map(|(i, hit)| ContextEntry {
                index: i + 1,
                label: source_label(&hit.payload),
                content: truncate_chars(hit.payload.content.as_deref().unwrap_or_default(), chunk_char_cap),
            })
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn render(&self) -> String { self.to_string() }
}

impl fmt::Display for ContextBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 { f.write_str("\n\n")?; }
            write!(f, "[{}] {}\n{}", entry.index, entry.label, entry.content)?;
        }
        Ok(())
    }
}

fn source_label(payload: &Payload) -> String {
    let name = [payload.doc_id.as_deref(), payload.source_path.as_deref()]
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
        .unwrap_or(UNKNOWN_SOURCE);
    match payload.page_number {
        Some(page) => format!("{name}, page {page}"),
        None => name.to_string(),
    }
}

fn truncate_chars(text: &str, cap: usize) -> String {
    match text.char_indices().nth(cap) {
        Some((byte, _)) => text[..byte].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(doc_id: Option<&str>, source_path: Option<&str>, page: Option<u32>, content: &str) -> RetrievalHit {
        RetrievalHit {
            id: "id".into(),
            score: 0.5,
            payload: Payload {
                doc_id: doc_id.map(str::to_string),
                source_path: source_path.map(str::to_string),
                page_number: page,
                content: Some(content.to_string()),
                ..Payload::default()
            },
        }
    }

    #[test]
    fn caps_each_entry_in_order() {
        let hits = vec![
            hit(Some("a"), None, None, &"x".repeat(2000)),
            hit(Some("b"), None, None, &"y".repeat(50)),
            hit(Some("c"), None, None, &"z".repeat(1200)),
        ];
        let block = ContextBlock::assemble(&hits, 1200);

        assert_eq!(block.len(), 3);
        assert_eq!(block.entries[0].content, "x".repeat(1200));
        assert_eq!(block.entries[1].content, "y".repeat(50));
        assert_eq!(block.entries[2].content, "z".repeat(1200));
        assert_eq!(block.entries.iter().map(|e| e.index).collect::<Vec<_>>(), vec![1, 2, 3]);

        let rendered = block.render();
        let expected = format!("[1] a\n{}\n\n[2] b\n{}\n\n[3] c\n{}", "x".repeat(1200), "y".repeat(50), "z".repeat(1200));
        assert_eq!(rendered, expected);
    }

    #[test]
    fn cap_counts_characters_not_bytes() {
        let block = ContextBlock::assemble(&[hit(Some("d"), None, None, "ééééé")], 3);
        assert_eq!(block.entries[0].content, "ééé");
    }

    #[test]
    fn labels_fall_back_through_source_path_to_unknown() {
        let hits = vec![
            hit(Some("handbook"), Some("data/handbook.pdf"), Some(4), "a"),
            hit(None, Some("data/faq.txt"), None, "b"),
            hit(Some(""), None, Some(2), "c"),
            RetrievalHit { id: "bare".into(), score: 0.1, payload: Payload::default() },
        ];
        let labels: Vec<String> = ContextBlock::assemble(&hits, 10).entries.into_iter().map(|e| e.label).collect();
        assert_eq!(labels, vec!["handbook, page 4", "data/faq.txt", "unknown, page 2", "unknown"]);
    }

    #[test]
    fn no_hits_renders_empty() {
        let block = ContextBlock::assemble(&[], 1200);
        assert!(block.is_empty());
        assert_eq!(block.render(), "");
    }
}
