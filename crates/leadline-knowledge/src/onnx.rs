// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared ONNX Runtime session plus tokenizer, used by the embedder and the
//! reranker.

use std::path::Path;
use std::sync::Mutex;

use ndarray::Array2;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::TensorRef;
use tokenizers::{EncodeInput, Encoding, Tokenizer, TruncationParams};

use leadline_core::LeadlineError;

fn model_err(message: String) -> LeadlineError {
    LeadlineError::embedding(message)
}

/// A BERT-style model taking `input_ids`, `attention_mask` and `token_type_ids`.
pub(crate) struct OnnxModel {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

impl OnnxModel {
    /// Loads `model.onnx` from `model_path` and `tokenizer.json` from the
    /// same directory. Inputs longer than `max_tokens` are truncated.
    pub(crate) fn load(model_path: &Path, max_tokens: usize) -> Result<Self, LeadlineError> {
        let model_dir = model_path
            .parent()
            .ok_or_else(|| model_err(format!("invalid model path {}", model_path.display())))?;

        let tokenizer_path = model_dir.join("tokenizer.json");
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            model_err(format!(
                "failed to load tokenizer from {}: {e}",
                tokenizer_path.display()
            ))
        })?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_tokens,
                ..Default::default()
            }))
            .map_err(|e| model_err(format!("failed to configure truncation: {e}")))?;

        let session = Session::builder()
            .map_err(|e| model_err(format!("failed to create ONNX session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| model_err(format!("failed to set optimization level: {e}")))?
            .with_intra_threads(1)
            .map_err(|e| model_err(format!("failed to set thread count: {e}")))?
            .commit_from_file(model_path)
            .map_err(|e| {
                model_err(format!(
                    "failed to load ONNX model from {}: {e}",
                    model_path.display()
                ))
            })?;

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }

    pub(crate) fn encode<'s, E>(&self, input: E) -> Result<Encoding, LeadlineError>
    where
        E: Into<EncodeInput<'s>>,
    {
        self.tokenizer
            .encode(input, true)
            .map_err(|e| model_err(format!("tokenization failed: {e}")))
    }

    /// Runs one encoded sequence and returns the first output as
    /// `(shape, data)`.
    pub(crate) fn infer(&self, encoding: &Encoding) -> Result<(Vec<i64>, Vec<f32>), LeadlineError> {
        let seq_len = encoding.len();
        let to_array = |values: &[u32], what: &str| {
            let values: Vec<i64> = values.iter().map(|&v| i64::from(v)).collect();
            Array2::from_shape_vec((1, seq_len), values)
                .map_err(|e| model_err(format!("failed to build {what} tensor: {e}")))
        };
        let input_ids = to_array(encoding.get_ids(), "input_ids")?;
        let attention_mask = to_array(encoding.get_attention_mask(), "attention_mask")?;
        let token_type_ids = to_array(encoding.get_type_ids(), "token_type_ids")?;

        let input_ids = TensorRef::from_array_view(&input_ids)
            .map_err(|e| model_err(format!("input_ids tensor: {e}")))?;
        let attention_mask = TensorRef::from_array_view(&attention_mask)
            .map_err(|e| model_err(format!("attention_mask tensor: {e}")))?;
        let token_type_ids = TensorRef::from_array_view(&token_type_ids)
            .map_err(|e| model_err(format!("token_type_ids tensor: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| model_err(format!("ONNX session lock poisoned: {e}")))?;
        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids,
                "attention_mask" => attention_mask,
                "token_type_ids" => token_type_ids
            ])
            .map_err(|e| model_err(format!("ONNX inference failed: {e}")))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| model_err(format!("failed to extract output tensor: {e}")))?;
        Ok((shape.to_vec(), data.to_vec()))
    }

    pub(crate) fn is_healthy(&self) -> bool {
        self.session.lock().is_ok()
    }
}
