//! Batch ingestion input: walks a directory of `.txt` files and splits them
//! into overlapping character windows with folder-derived metadata.
//!
//! Layout convention is `data/<course>/<module>/<file>.txt`; files nearer the
//! root fall back to `general` / `intro`.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChunk {
    pub doc_id: String,
    pub course_id: String,
    pub module_id: String,
    pub source_path: String,
    pub content: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_chars: 800, overlap: 200 }
    }
}

#[derive(Default)]
pub struct DataProcessor {
    chunking_config: ChunkingConfig,
}

impl DataProcessor {
    pub fn new() -> Self { Self::default() }

    pub fn with_config(chunking_config: ChunkingConfig) -> Self { Self { chunking_config } }

    pub fn process_directory(&self, data_dir: &Path) -> Result<Vec<DocumentChunk>> {
        let files = self.list_txt_files(data_dir);
        self.process_files(data_dir, &files)
    }

    pub fn process_directory_limited(&self, data_dir: &Path, limit: usize) -> Result<Vec<DocumentChunk>> {
        let mut files = self.list_txt_files(data_dir);
        if files.len() > limit { files.truncate(limit); info!(limit, "limited ingestion to first files"); }
        self.process_files(data_dir, &files)
    }

    fn process_files(&self, data_dir: &Path, files: &[PathBuf]) -> Result<Vec<DocumentChunk>> {
        if files.is_empty() {
            info!(dir = %data_dir.display(), "no .txt files found");
            return Ok(vec![]);
        }
        let mut all_chunks = Vec::new();
        for (file_index, file_path) in files.iter().enumerate() {
            debug!(file = %file_path.display(), "processing file {}/{}", file_index + 1, files.len());
            let content = self.read_file_content(file_path)?;
            let pieces = self.chunk_text(&content);
            let total_chunks = pieces.len();
            let (course_id, module_id) = folder_metadata(file_path);
            let doc_id = extract_doc_id(file_path);
            let source_path = file_path.to_string_lossy().to_string();
            all_chunks.extend(pieces.into_iter().enumerate().map(|(chunk_index, content)| DocumentChunk {
                doc_id: doc_id.clone(),
                course_id: course_id.clone(),
                module_id: module_id.clone(),
                source_path: source_path.clone(),
                content,
                chunk_index,
                total_chunks,
            }));
        }
        info!(files = files.len(), chunks = all_chunks.len(), "processed ingestion input");
        Ok(all_chunks)
    }

    /// Collapses whitespace runs, then cuts `max_chars` windows that start
    /// `max_chars - overlap` characters apart. The window that reaches the end
    /// of the text is the last one.
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let chars: Vec<char> = normalized.chars().collect();
        let max_chars = self.chunking_config.max_chars.max(1);
        let step = max_chars.saturating_sub(self.chunking_config.overlap).max(1);
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + max_chars).min(chars.len());
            chunks.push(chars[start..end].iter().collect());
            if end == chars.len() { break; }
            start += step;
        }
        chunks
    }

    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
        }
    }

    fn list_txt_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut txt_files = Vec::new();
        for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
            let path = entry.path(); if path.extension().and_then(|s| s.to_str()) == Some("txt") { txt_files.push(path.to_path_buf()); }
        }
        txt_files.sort(); txt_files
    }
}

fn extract_doc_id(file_path: &Path) -> String {
    file_path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_else(|| "unknown".to_string())
}

/// `(course_id, module_id)` from the two directories above the file.
fn folder_metadata(file_path: &Path) -> (String, String) {
    let parts: Vec<String> = file_path.components().map(|c| c.as_os_str().to_string_lossy().to_string()).collect();
    let n = parts.len();
    let course = if n >= 3 { parts[n - 3].clone() } else { "general".to_string() };
    let module = if n >= 2 { parts[n - 2].clone() } else { "intro".to_string() };
    (course, module)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_text_overlaps_and_terminates() {
        let p = DataProcessor::with_config(ChunkingConfig { max_chars: 10, overlap: 4 });
        let chunks = p.chunk_text("abcdefghijklmnopqrstu");
        assert_eq!(chunks, vec!["abcdefghij", "ghijklmnop", "mnopqrstu"]);
    }

    #[test]
    fn chunk_text_normalizes_whitespace() {
        let p = DataProcessor::new();
        assert_eq!(p.chunk_text("  a \n\n b\tc  "), vec!["a b c"]);
        assert!(p.chunk_text("   \n").is_empty());
    }

    #[test]
    fn folder_metadata_falls_back_near_root() {
        assert_eq!(folder_metadata(Path::new("data/safety/m1/a.txt")), ("safety".into(), "m1".into()));
        assert_eq!(folder_metadata(Path::new("m1/a.txt")), ("general".into(), "m1".into()));
        assert_eq!(folder_metadata(Path::new("a.txt")), ("general".into(), "intro".into()));
    }
}
