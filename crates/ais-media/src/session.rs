//! ONNX Runtime session loading and pooling.
//!
//! `Session::run` needs exclusive access, so each session sits behind a
//! `Mutex`. A pool holds one session per concurrent caller and hands them out
//! round-robin.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::tensor::TensorElementType;
use ort::value::ValueType;
use tracing::info;

use crate::error::{MediaError, MediaResult};

/// Element type and name of a model input or output.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorSpec {
    pub name: String,
    pub element_type: Option<TensorElementType>,
}

impl TensorSpec {
    fn from_value_type(name: &str, value_type: &ValueType) -> Self {
        let element_type = match value_type {
            ValueType::Tensor { ty, .. } => Some(*ty),
            _ => None,
        };
        Self {
            name: name.to_string(),
            element_type,
        }
    }

    pub fn is_int8(&self) -> bool {
        self.element_type == Some(TensorElementType::Int8)
    }
}

/// Load a single session from an ONNX file.
pub fn load_session(model_path: &Path, intra_threads: usize) -> MediaResult<Session> {
    if !model_path.exists() {
        return Err(MediaError::model_not_found(model_path.display().to_string()));
    }

    let model_bytes = std::fs::read(model_path)
        .map_err(|e| MediaError::inference(format!("ORT read model file: {e}")))?;

    Session::builder()
        .map_err(|e| MediaError::inference(format!("ORT session builder: {e}")))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| MediaError::inference(format!("ORT opt level: {e}")))?
        .with_intra_threads(intra_threads.max(1))
        .map_err(|e| MediaError::inference(format!("ORT intra threads: {e}")))?
        .commit_from_memory(model_bytes.as_slice())
        .map_err(|e| MediaError::inference(format!("ORT load model: {e}")))
}

/// Round-robin pool of sessions for one model.
pub struct SessionPool {
    sessions: Vec<Mutex<Session>>,
    next: AtomicUsize,
    input: TensorSpec,
    output: TensorSpec,
    model_path: PathBuf,
}

impl std::fmt::Debug for SessionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPool")
            .field("sessions", &self.sessions.len())
            .field("input", &self.input)
            .field("output", &self.output)
            .field("model_path", &self.model_path)
            .finish()
    }
}

impl SessionPool {
    /// Load `size` sessions of the same model (at least one).
    pub fn load(model_path: &Path, size: usize, intra_threads: usize) -> MediaResult<Self> {
        let size = size.max(1);
        let mut sessions = Vec::with_capacity(size);
        for _ in 0..size {
            sessions.push(load_session(model_path, intra_threads)?);
        }

        let first = &sessions[0];
        let input = first
            .inputs
            .first()
            .map(|i| TensorSpec::from_value_type(&i.name, &i.input_type))
            .ok_or_else(|| MediaError::invalid_tensor("model declares no inputs"))?;
        let output = first
            .outputs
            .first()
            .map(|o| TensorSpec::from_value_type(&o.name, &o.output_type))
            .ok_or_else(|| MediaError::invalid_tensor("model declares no outputs"))?;

        info!(
            model = %model_path.display(),
            sessions = size,
            input = %input.name,
            output = %output.name,
            "Loaded ONNX model"
        );

        Ok(Self {
            sessions: sessions.into_iter().map(Mutex::new).collect(),
            next: AtomicUsize::new(0),
            input,
            output,
            model_path: model_path.to_path_buf(),
        })
    }

    /// Lock the next session in round-robin order.
    pub fn acquire(&self) -> MediaResult<MutexGuard<'_, Session>> {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.sessions.len();
        self.sessions[idx]
            .lock()
            .map_err(|_| MediaError::inference("ORT session poisoned"))
    }

    pub fn input(&self) -> &TensorSpec {
        &self.input
    }

    pub fn output(&self) -> &TensorSpec {
        &self.output
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
