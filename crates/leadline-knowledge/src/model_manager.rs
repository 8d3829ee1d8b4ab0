// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! First-run download of the ONNX embedding and reranking models.
//!
//! Files come from HuggingFace and are cached under
//! `{data_dir}/models/{model}/`.

use std::path::{Path, PathBuf};

use leadline_core::LeadlineError;
use tokio::sync::Mutex;
use tracing::info;

/// Where a model's files come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: &'static str,
    pub model_url: &'static str,
    pub tokenizer_url: &'static str,
}

/// Sentence embedder, 384 dimensions.
pub const MINILM_EMBEDDER: ModelSpec = ModelSpec {
    name: "all-MiniLM-L6-v2",
    model_url: "https://huggingface.co/onnx-community/all-MiniLM-L6-v2-ONNX/resolve/main/onnx/model_quantized.onnx",
    tokenizer_url: "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/tokenizer.json",
};

/// MS MARCO cross-encoder.
pub const MARCO_RERANKER: ModelSpec = ModelSpec {
    name: "ms-marco-MiniLM-L-6-v2",
    model_url: "https://huggingface.co/cross-encoder/ms-marco-MiniLM-L-6-v2/resolve/main/onnx/model.onnx",
    tokenizer_url: "https://huggingface.co/cross-encoder/ms-marco-MiniLM-L-6-v2/resolve/main/tokenizer.json",
};

const KNOWN_MODELS: &[ModelSpec] = &[MINILM_EMBEDDER, MARCO_RERANKER];

impl ModelSpec {
    /// Looks up a supported model by its configured name.
    pub fn lookup(name: &str) -> Result<Self, LeadlineError> {
        KNOWN_MODELS
            .iter()
            .find(|spec| spec.name == name)
            .copied()
            .ok_or_else(|| {
                let known: Vec<&str> = KNOWN_MODELS.iter().map(|s| s.name).collect();
                LeadlineError::Config(format!(
                    "unsupported model `{name}`, expected one of: {}",
                    known.join(", ")
                ))
            })
    }
}

/// Resolves and downloads model files.
pub struct ModelManager {
    data_dir: PathBuf,
    download: Mutex<()>,
}

impl ModelManager {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            download: Mutex::new(()),
        }
    }

    pub fn model_dir(&self, spec: &ModelSpec) -> PathBuf {
        self.data_dir.join("models").join(spec.name)
    }

    pub fn model_path(&self, spec: &ModelSpec) -> PathBuf {
        self.model_dir(spec).join("model.onnx")
    }

    pub fn tokenizer_path(&self, spec: &ModelSpec) -> PathBuf {
        self.model_dir(spec).join("tokenizer.json")
    }

    pub fn is_available(&self, spec: &ModelSpec) -> bool {
        self.model_path(spec).exists() && self.tokenizer_path(spec).exists()
    }

    /// Downloads any missing file and returns the model path.
    ///
    /// Concurrent callers wait for one download.
    pub async fn ensure(&self, spec: &ModelSpec) -> Result<PathBuf, LeadlineError> {
        if self.is_available(spec) {
            return Ok(self.model_path(spec));
        }

        let _guard = self.download.lock().await;
        if self.is_available(spec) {
            return Ok(self.model_path(spec));
        }

        info!(model = spec.name, "model not found, downloading from HuggingFace");
        let dir = self.model_dir(spec);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            LeadlineError::Internal(format!("failed to create {}: {e}", dir.display()))
        })?;

        for (file, url) in [
            ("model.onnx", spec.model_url),
            ("tokenizer.json", spec.tokenizer_url),
        ] {
            let dest = dir.join(file);
            if dest.exists() {
                continue;
            }
            match download_file(url, &dest).await {
                Ok(size) => info!(model = spec.name, file, size, "downloaded"),
                Err(e) => {
                    let _ = tokio::fs::remove_file(&dest).await;
                    return Err(e);
                }
            }
        }

        info!(model = spec.name, dir = %dir.display(), "model ready");
        Ok(self.model_path(spec))
    }
}

/// Writes to a `.part` sibling, then renames into place.
async fn download_file(url: &str, dest: &Path) -> Result<usize, LeadlineError> {
    let response = reqwest::get(url)
        .await
        .map_err(|e| LeadlineError::Internal(format!("failed to download {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(LeadlineError::Internal(format!(
            "download failed with status {}: {url}",
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| LeadlineError::Internal(format!("failed to read body from {url}: {e}")))?;

    let partial = dest.with_extension("part");
    tokio::fs::write(&partial, &bytes)
        .await
        .map_err(|e| LeadlineError::Internal(format!("failed to write {}: {e}", partial.display())))?;
    tokio::fs::rename(&partial, dest)
        .await
        .map_err(|e| LeadlineError::Internal(format!("failed to move {}: {e}", dest.display())))?;

    Ok(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_per_model() {
        let mgr = ModelManager::new(PathBuf::from("/data/leadline"));
        assert_eq!(
            mgr.model_path(&MINILM_EMBEDDER),
            PathBuf::from("/data/leadline/models/all-MiniLM-L6-v2/model.onnx")
        );
        assert_eq!(
            mgr.tokenizer_path(&MARCO_RERANKER),
            PathBuf::from("/data/leadline/models/ms-marco-MiniLM-L-6-v2/tokenizer.json")
        );
    }

    #[test]
    fn lookup_known_and_unknown() {
        assert_eq!(ModelSpec::lookup("all-MiniLM-L6-v2").unwrap(), MINILM_EMBEDDER);
        assert!(matches!(
            ModelSpec::lookup("bge-large"),
            Err(LeadlineError::Config(_))
        ));
    }

    #[tokio::test]
    async fn present_files_skip_download() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = ModelManager::new(dir.path().to_path_buf());
        let model_dir = mgr.model_dir(&MARCO_RERANKER);
        std::fs::create_dir_all(&model_dir).unwrap();
        std::fs::write(model_dir.join("model.onnx"), b"x").unwrap();
        std::fs::write(model_dir.join("tokenizer.json"), b"{}").unwrap();

        assert!(mgr.is_available(&MARCO_RERANKER));
        assert!(!mgr.is_available(&MINILM_EMBEDDER));
        let path = mgr.ensure(&MARCO_RERANKER).await.unwrap();
        assert_eq!(path, model_dir.join("model.onnx"));
    }
}
