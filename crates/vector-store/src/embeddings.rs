//! Sentence embeddings for procedure texts and user queries.
//!
//! `fast` runs a sentence-transformers model exported to ONNX on the CPU execution provider and
//! mean-pools its token states; `stub` hashes text into a deterministic unit vector for tests
//! and offline runs.

use crate::error::{Result, VectorStoreError};
use ndarray::{Array, Axis, Dimension, Ix2, Ix3};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::{builder::GraphOptimizationLevel, Input, Session, SessionInputs};
use ort::tensor::TensorElementType;
use ort::value::{DynTensor, Tensor};
use ort::Error as OrtError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokenizers::{Encoding, PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tokio::task::spawn_blocking;

pub const EMBEDDING_MODE_ENV: &str = "TRAMITES_EMBEDDING_MODE";
pub const EMBEDDING_MODEL_ENV: &str = "TRAMITES_EMBEDDING_MODEL";
pub const MODEL_DIR_ENV: &str = "TRAMITES_MODEL_DIR";

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingMode {
    /// ONNX Runtime sentence-transformer
    #[default]
    Fast,
    /// Deterministic hash embedding, for tests and offline runs
    Stub,
}

impl EmbeddingMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Stub => "stub",
        }
    }
}

impl FromStr for EmbeddingMode {
    type Err = VectorStoreError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "stub" => Ok(Self::Stub),
            other => Err(VectorStoreError::ConfigError(format!(
                "Unsupported {EMBEDDING_MODE_ENV} '{other}' (expected 'fast' or 'stub')"
            ))),
        }
    }
}

/// Which sentence-embedding model to load and how to feed it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub mode: EmbeddingMode,
    /// Model id; assets live in `<model_dir>/<model>/`
    pub model: String,
    pub model_dir: PathBuf,
    pub dimension: usize,
    pub max_length: usize,
    pub max_batch: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            mode: EmbeddingMode::Fast,
            model: "paraphrase-multilingual-minilm-l12-v2".to_string(),
            model_dir: PathBuf::from("models"),
            dimension: 384,
            max_length: 128,
            max_batch: 32,
        }
    }
}

impl EmbeddingConfig {
    /// Stub configuration with the given vector size
    #[must_use]
    pub fn stub(dimension: usize) -> Self {
        Self {
            mode: EmbeddingMode::Stub,
            dimension,
            ..Self::default()
        }
    }

    /// Apply `TRAMITES_EMBEDDING_MODE`, `TRAMITES_EMBEDDING_MODEL` and `TRAMITES_MODEL_DIR`
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(mode) = env::var(EMBEDDING_MODE_ENV) {
            self.mode = mode.parse()?;
        }
        if let Ok(model) = env::var(EMBEDDING_MODEL_ENV) {
            self.model = model.trim().to_ascii_lowercase();
        }
        if let Ok(dir) = env::var(MODEL_DIR_ENV) {
            self.model_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    fn assets(&self) -> ModelAssets {
        let dir = self.model_dir.join(&self.model);
        ModelAssets {
            model_path: dir.join("model.onnx"),
            tokenizer_path: dir.join("tokenizer.json"),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(VectorStoreError::ConfigError(
                "embedding dimension must be positive".to_string(),
            ));
        }
        if self.max_batch == 0 || self.max_length == 0 {
            return Err(VectorStoreError::ConfigError(
                "embedding max_batch and max_length must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

struct ModelAssets {
    model_path: PathBuf,
    tokenizer_path: PathBuf,
}

struct OrtBackend {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    max_length: usize,
    max_batch: usize,
    dimension: usize,
}

#[derive(Clone)]
struct StubBackend {
    dimension: usize,
    #[cfg(test)]
    batch_calls: Arc<AtomicUsize>,
}

impl StubBackend {
    #[cfg(not(test))]
    const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    #[cfg(test)]
    fn new(dimension: usize) -> Self {
        Self {
            dimension,
            batch_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn embed_batch(&self, texts: &[String]) -> Vec<Vec<f32>> {
        #[cfg(test)]
        self.batch_calls.fetch_add(1, Ordering::Relaxed);
        texts
            .iter()
            .map(|text| stub_embed(text, self.dimension))
            .collect()
    }

    #[cfg(test)]
    fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::Relaxed)
    }
}

impl OrtBackend {
    fn new(config: &EmbeddingConfig) -> Result<Self> {
        if !tokenizers::utils::parallelism::is_parallelism_configured() {
            tokenizers::utils::parallelism::set_parallelism(false);
        }

        let assets = config.assets();
        if !assets.model_path.exists() || !assets.tokenizer_path.exists() {
            return Err(VectorStoreError::EmbeddingError(format!(
                "Model files for '{}' are missing. Expected ONNX at {} and tokenizer at {}. Export the model into {} (or set {MODEL_DIR_ENV}).",
                config.model,
                assets.model_path.display(),
                assets.tokenizer_path.display(),
                config.model_dir.display(),
            )));
        }

        let mut tokenizer = Tokenizer::from_file(&assets.tokenizer_path)
            .map_err(|e| VectorStoreError::EmbeddingError(format!("Tokenizer load failed: {e}")))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..PaddingParams::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_length,
                ..TruncationParams::default()
            }))
            .map_err(|e| {
                VectorStoreError::EmbeddingError(format!("Tokenizer truncation failed: {e}"))
            })?;

        let session = Session::builder()
            .map_err(|e| to_embedding_error(&e))?
            .with_intra_threads(default_intra_threads())
            .map_err(|e| {
                VectorStoreError::EmbeddingError(format!("Failed to set ORT intra threads: {e}"))
            })?
            .with_inter_threads(1)
            .map_err(|e| {
                VectorStoreError::EmbeddingError(format!("Failed to set ORT inter threads: {e}"))
            })?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .map_err(|e| {
                VectorStoreError::EmbeddingError(format!(
                    "Failed to register CPU execution provider: {e}"
                ))
            })?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| {
                VectorStoreError::EmbeddingError(format!("Failed to set optimization level: {e}"))
            })?
            .commit_from_file(&assets.model_path)
            .map_err(|e| {
                VectorStoreError::EmbeddingError(format!("Failed to load ONNX model: {e}"))
            })?;

        log::info!(
            "Loaded ONNX model '{}' (dim {}, max_length {}, batch {})",
            config.model,
            config.dimension,
            config.max_length,
            config.max_batch
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            max_length: config.max_length,
            max_batch: config.max_batch,
            dimension: config.dimension,
        })
    }

    fn embed_batch_blocking(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.max_batch) {
            let encodings = self
                .tokenizer
                .encode_batch(batch.to_vec(), true)
                .map_err(|e| {
                    VectorStoreError::EmbeddingError(format!("Tokenization failed: {e}"))
                })?;

            if encodings.is_empty() {
                continue;
            }

            let seq_len = encodings[0].len();
            if seq_len > self.max_length {
                return Err(VectorStoreError::EmbeddingError(format!(
                    "Tokenized length {} exceeds max_length {}",
                    seq_len, self.max_length
                )));
            }
            if encodings.iter().any(|e| e.len() != seq_len) {
                return Err(VectorStoreError::EmbeddingError(
                    "Inconsistent sequence lengths after padding".to_string(),
                ));
            }
            let (ids, masks, type_ids, mask_rows) = build_flat_tensors(&encodings, seq_len);

            let ids_array = Array::from_shape_vec((batch.len(), seq_len), ids)
                .map_err(|e| VectorStoreError::EmbeddingError(format!("IDs shape error: {e}")))?;
            let mask_array = Array::from_shape_vec((batch.len(), seq_len), masks)
                .map_err(|e| VectorStoreError::EmbeddingError(format!("Mask shape error: {e}")))?;
            let type_array = Array::from_shape_vec((batch.len(), seq_len), type_ids)
                .map_err(|e| VectorStoreError::EmbeddingError(format!("Types shape error: {e}")))?;
            let ids_shape = ids_array.raw_dim().into_dyn();

            let ids_tensor = Tensor::from_array(ids_array.into_dyn())
                .map_err(|e| to_embedding_error(&e))?
                .upcast();
            let mask_tensor = Tensor::from_array(mask_array.into_dyn())
                .map_err(|e| to_embedding_error(&e))?
                .upcast();
            let type_tensor = Tensor::from_array(type_array.into_dyn())
                .map_err(|e| to_embedding_error(&e))?
                .upcast();

            let array = {
                let mut session = self.session.lock().map_err(|_| {
                    VectorStoreError::EmbeddingError("Failed to lock ONNX session".into())
                })?;

                let mut available: HashMap<String, DynTensor> = HashMap::new();
                available.insert("input_ids".to_string(), ids_tensor);
                available.insert("attention_mask".to_string(), mask_tensor);
                available.insert("token_type_ids".to_string(), type_tensor);

                let mut feed: HashMap<String, DynTensor> = HashMap::new();
                for input in &session.inputs {
                    let key = input.name.clone();
                    if let Some(value) = available.get(&key) {
                        feed.insert(key, value.clone());
                    } else {
                        let zeros = zero_tensor(&ids_shape, input).map_err(|e| {
                            VectorStoreError::EmbeddingError(format!(
                                "Unsupported ONNX input '{key}': {e}"
                            ))
                        })?;
                        feed.insert(key, zeros);
                    }
                }

                let outputs = session.run(SessionInputs::from(feed)).map_err(|e| {
                    VectorStoreError::EmbeddingError(format!("ONNX forward failed: {e}"))
                })?;

                if outputs.len() == 0 {
                    return Err(VectorStoreError::EmbeddingError(
                        "ONNX returned no outputs".to_string(),
                    ));
                }

                let array = outputs[0]
                    .try_extract_array::<f32>()
                    .map_err(|e| {
                        VectorStoreError::EmbeddingError(format!(
                            "Failed to decode ONNX output: {e}"
                        ))
                    })?
                    .to_owned();

                drop(outputs);
                drop(session);

                array
            };
            results.extend(embeddings_from_output(array, &mask_rows, self.dimension)?);
        }

        Ok(results)
    }
}

fn default_intra_threads() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    // Requests embed one short query at a time; a couple of threads is plenty.
    if cpus <= 4 {
        1
    } else {
        2
    }
}

const fn ensure_dimension(vec: &[f32], expected: usize) -> Result<()> {
    if vec.len() != expected {
        return Err(VectorStoreError::InvalidDimension {
            expected,
            actual: vec.len(),
        });
    }
    Ok(())
}

fn embeddings_from_output(
    array: ndarray::ArrayD<f32>,
    mask_rows: &[Vec<i64>],
    expected_dimension: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut out = Vec::new();
    match array.ndim() {
        2 => {
            let embeddings = array
                .into_dimensionality::<Ix2>()
                .map_err(|e| VectorStoreError::EmbeddingError(format!("Bad output shape: {e}")))?;
            out.reserve(embeddings.len_of(Axis(0)));
            for row in embeddings.outer_iter() {
                let mut emb = row.to_vec();
                ensure_dimension(&emb, expected_dimension)?;
                normalize(&mut emb);
                out.push(emb);
            }
        }
        3 => {
            // Token-level hidden states: sentence-transformers mean pooling.
            let hidden = array
                .into_dimensionality::<Ix3>()
                .map_err(|e| VectorStoreError::EmbeddingError(format!("Bad output shape: {e}")))?;
            out.reserve(hidden.len_of(Axis(0)));
            for (idx, sample) in hidden.outer_iter().enumerate() {
                let attn = mask_rows
                    .get(idx)
                    .cloned()
                    .unwrap_or_else(|| vec![1; sample.len_of(Axis(0))]);
                let mut emb = mean_pool(sample.view(), &attn);
                ensure_dimension(&emb, expected_dimension)?;
                normalize(&mut emb);
                out.push(emb);
            }
        }
        _ => {
            return Err(VectorStoreError::EmbeddingError(format!(
                "Unexpected ONNX output dims: {:?}",
                array.shape()
            )));
        }
    }
    Ok(out)
}

/// Average of the token states the attention mask keeps
fn mean_pool(sample: ndarray::ArrayView2<'_, f32>, mask: &[i64]) -> Vec<f32> {
    let mut pooled = ndarray::Array1::<f32>::zeros(sample.len_of(Axis(1)));
    let mut kept = 0usize;
    for (token, keep) in sample.outer_iter().zip(mask) {
        if *keep != 0 {
            pooled += &token;
            kept += 1;
        }
    }
    if kept > 0 {
        pooled /= kept as f32;
    }
    pooled.to_vec()
}

/// Row-major `(ids, attention mask, token types)` for a padded batch, plus the mask per row
fn build_flat_tensors(
    encodings: &[Encoding],
    seq_len: usize,
) -> (Vec<i64>, Vec<i64>, Vec<i64>, Vec<Vec<i64>>) {
    let widen = |values: &[u32]| -> Vec<i64> {
        (0..seq_len)
            .map(|idx| values.get(idx).copied().map_or(0, i64::from))
            .collect()
    };

    let mut ids = Vec::with_capacity(encodings.len() * seq_len);
    let mut type_ids = Vec::with_capacity(encodings.len() * seq_len);
    let mut mask_rows = Vec::with_capacity(encodings.len());
    for encoding in encodings {
        ids.extend(widen(encoding.get_ids()));
        type_ids.extend(widen(encoding.get_type_ids()));
        mask_rows.push(widen(encoding.get_attention_mask()));
    }
    let masks = mask_rows.concat();

    (ids, masks, type_ids, mask_rows)
}

fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vec {
        *value /= norm;
    }
}

fn stub_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut state =
        fnv1a_64(text.as_bytes()) ^ (dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut vec = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let bits = splitmix64(&mut state);
        let high = (bits >> 32) as u32;
        let mantissa = high >> 9;
        let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
        vec.push(unit.mul_add(2.0, -1.0));
    }
    normalize(&mut vec);
    vec
}

pub(crate) fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn to_embedding_error(error: &OrtError) -> VectorStoreError {
    VectorStoreError::EmbeddingError(format!("{error}"))
}

/// Zero-filled int64 tensor for a model input the tokenizer does not produce
fn zero_tensor(shape: &ndarray::IxDyn, input: &Input) -> Result<DynTensor> {
    match &input.input_type {
        ort::value::ValueType::Tensor {
            ty: TensorElementType::Int64,
            ..
        } => Ok(Tensor::from_array(ndarray::Array::<i64, _>::zeros(shape.clone()))
            .map_err(|e| to_embedding_error(&e))?
            .upcast()),
        other => Err(VectorStoreError::EmbeddingError(format!(
            "Model input '{}' has unsupported type {other:?}",
            input.name
        ))),
    }
}

/// Sentence embedding function shared by index build and query time.
///
/// Constructed explicitly and owned by whoever builds the index; there is no process-wide
/// model cache.
pub struct Vectorizer {
    backend: EmbeddingBackend,
    model: String,
    dimension: usize,
}

enum EmbeddingBackend {
    Ort(Arc<OrtBackend>),
    Stub(StubBackend),
}

impl std::fmt::Debug for Vectorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match self.backend {
            EmbeddingBackend::Ort(_) => "ort",
            EmbeddingBackend::Stub(_) => "stub",
        };
        f.debug_struct("Vectorizer")
            .field("backend", &backend)
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl Vectorizer {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        config.validate()?;
        let backend = match config.mode {
            EmbeddingMode::Stub => EmbeddingBackend::Stub(StubBackend::new(config.dimension)),
            EmbeddingMode::Fast => EmbeddingBackend::Ort(Arc::new(OrtBackend::new(config)?)),
        };
        Ok(Self {
            backend,
            model: config.model.clone(),
            dimension: config.dimension,
        })
    }

    /// Deterministic stub embedder
    #[must_use]
    pub fn stub(dimension: usize) -> Self {
        Self {
            backend: EmbeddingBackend::Stub(StubBackend::new(dimension)),
            model: "stub".to_string(),
            dimension,
        }
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[cfg(test)]
    pub(crate) fn stub_batch_calls(&self) -> Option<usize> {
        match &self.backend {
            EmbeddingBackend::Stub(stub) => Some(stub.batch_calls()),
            EmbeddingBackend::Ort(_) => None,
        }
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(vec![text]).await?;
        embeddings
            .pop()
            .ok_or_else(|| VectorStoreError::EmbeddingError("Empty embedding result".to_string()))
    }

    pub async fn embed_batch(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let owned: Vec<String> = texts.into_iter().map(ToString::to_string).collect();
        match &self.backend {
            EmbeddingBackend::Stub(stub) => Ok(stub.embed_batch(&owned)),
            EmbeddingBackend::Ort(backend) => {
                let backend = backend.clone();
                spawn_blocking(move || backend.embed_batch_blocking(&owned))
                    .await
                    .map_err(|e| VectorStoreError::EmbeddingError(format!("Join error: {e}")))?
            }
        }
    }

    #[must_use]
    pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_embeddings_are_deterministic_and_normalized() {
        let model = Vectorizer::stub(64);
        let a = model.embed("Licencia de Conducir").await.unwrap();
        let b = model.embed("Licencia de Conducir").await.unwrap();
        assert_eq!(a.len(), 64);
        assert_eq!(a, b);

        let norm = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn mean_pool_skips_masked_tokens() {
        let states = ndarray::arr2(&[[1.0f32, 2.0], [3.0, 4.0], [100.0, 100.0]]);
        assert_eq!(mean_pool(states.view(), &[1, 1, 0]), vec![2.0, 3.0]);
        assert_eq!(mean_pool(states.view(), &[0, 0, 0]), vec![0.0, 0.0]);
    }

    #[tokio::test]
    async fn stub_embed_batch_preserves_order() {
        let model = Vectorizer::stub(32);
        let batch = model.embed_batch(vec!["uno", "dos"]).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], model.embed("uno").await.unwrap());
        assert_eq!(batch[1], model.embed("dos").await.unwrap());
        assert!(model.embed_batch(vec![]).await.unwrap().is_empty());
    }

    #[tokio::test]
    #[ignore = "Requires an exported ONNX model under ./models"]
    async fn test_embed_single() {
        let model = Vectorizer::from_config(&EmbeddingConfig::default()).unwrap();
        let embedding = model.embed("¿dónde saco la licencia?").await.unwrap();
        assert_eq!(embedding.len(), model.dimension());
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        let sim = Vectorizer::cosine_similarity(&a, &b);
        assert!((sim - 1.0).abs() < 1e-6);

        let c = vec![1.0, 0.0];
        let d = vec![0.0, 1.0];
        let sim2 = Vectorizer::cosine_similarity(&c, &d);
        assert!((sim2 - 0.0).abs() < 1e-6);

        assert_eq!(Vectorizer::cosine_similarity(&a, &c), 0.0);
    }

    #[test]
    fn embedding_mode_parses_case_insensitively() {
        assert_eq!("STUB".parse::<EmbeddingMode>().unwrap(), EmbeddingMode::Stub);
        assert_eq!(" fast ".parse::<EmbeddingMode>().unwrap(), EmbeddingMode::Fast);
        assert!("gpu".parse::<EmbeddingMode>().is_err());
    }

    #[test]
    fn fast_mode_reports_missing_model_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = EmbeddingConfig {
            model_dir: tmp.path().to_path_buf(),
            ..EmbeddingConfig::default()
        };
        let err = Vectorizer::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("are missing"), "{err}");
    }

    #[test]
    fn zero_dimension_is_rejected() {
        let err = Vectorizer::from_config(&EmbeddingConfig::stub(0)).unwrap_err();
        assert!(matches!(err, VectorStoreError::ConfigError(_)));
    }
}
