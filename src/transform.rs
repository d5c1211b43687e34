//! The transform capability shared by every matrix operation.

use crate::data::{AnnotatedMatrix, Document};
use crate::error::{MatrixError, Result};
use crate::progress::ProcessInfo;

/// Declared shape of a transform: how many matrices it reads and what it
/// produces besides the edited main matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformDescriptor {
    /// Number of input matrices, the main one included.
    pub inputs: usize,
    /// Number of supplementary tables produced.
    pub supplementary_tables: usize,
    /// Number of documents produced.
    pub documents: usize,
}

impl Default for TransformDescriptor {
    fn default() -> Self {
        Self {
            inputs: 1,
            supplementary_tables: 0,
            documents: 0,
        }
    }
}

/// Side outputs of one transform run.
#[derive(Debug, Clone, Default)]
pub struct TransformOutput {
    pub supplementary_tables: Vec<AnnotatedMatrix>,
    pub documents: Vec<Document>,
}

/// An operation that edits an annotated matrix in place.
pub trait Transform {
    /// Display name used in logs and pipeline errors.
    fn name(&self) -> &'static str;

    /// Declared inputs and outputs.
    fn descriptor(&self) -> TransformDescriptor {
        TransformDescriptor::default()
    }

    /// Check parameters against the matrix before anything is changed.
    fn validate(&self, _matrix: &AnnotatedMatrix) -> Result<()> {
        Ok(())
    }

    /// Apply the transform.
    ///
    /// # Arguments
    /// * `matrix` - The main matrix, edited in place
    /// * `extra` - Additional input matrices, `descriptor().inputs - 1` of them
    /// * `info` - Progress callbacks and thread limit
    fn process(
        &self,
        matrix: &mut AnnotatedMatrix,
        extra: &[AnnotatedMatrix],
        info: &mut ProcessInfo,
    ) -> Result<TransformOutput>;
}

/// Validate and run a transform, checking its outputs against the descriptor.
pub fn run_transform(
    transform: &dyn Transform,
    matrix: &mut AnnotatedMatrix,
    extra: &[AnnotatedMatrix],
    info: &mut ProcessInfo,
) -> Result<TransformOutput> {
    let descriptor = transform.descriptor();
    if extra.len() + 1 != descriptor.inputs {
        return Err(MatrixError::InvalidParameter(format!(
            "{} expects {} input matrices, got {}",
            transform.name(),
            descriptor.inputs,
            extra.len() + 1
        )));
    }
    transform.validate(matrix)?;
    log::info!("Running {}", transform.name());
    info.status(transform.name());
    let output = transform.process(matrix, extra, info)?;
    if output.supplementary_tables.len() != descriptor.supplementary_tables
        || output.documents.len() != descriptor.documents
    {
        return Err(MatrixError::Transform(format!(
            "{} produced {} tables and {} documents, declared {} and {}",
            transform.name(),
            output.supplementary_tables.len(),
            output.documents.len(),
            descriptor.supplementary_tables,
            descriptor.documents
        )));
    }
    info.progress(100);
    Ok(output)
}
