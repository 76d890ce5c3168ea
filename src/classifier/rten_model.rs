use std::path::Path;

use rten::{Dimension, NodeId};
use rten_tensor::prelude::*;
use rten_tensor::{NdTensor, Tensor};
use tracing::{debug, info};

use super::{ClassifierError, InputTensor, Model};
use crate::models::InputShape;

/// Classifier network executed with the rten runtime (`.rten` model files)
pub struct RtenModel {
    graph: rten::Model,
    input_id: NodeId,
    output_id: NodeId,
    input_shape: Option<InputShape>,
    name: String,
}

impl RtenModel {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let load_error = |reason: String| ClassifierError::ModelLoad {
            path: path.to_path_buf(),
            reason,
        };

        info!("Loading model weights from {}", path.display());
        let graph = rten::Model::load_file(path).map_err(|e| load_error(e.to_string()))?;

        let input_id = graph
            .input_ids()
            .first()
            .copied()
            .ok_or_else(|| load_error("model has no inputs".to_string()))?;
        let output_id = graph
            .output_ids()
            .first()
            .copied()
            .ok_or_else(|| load_error("model has no outputs".to_string()))?;

        let input_shape = declared_dims(&graph, input_id).and_then(InputShape::from_dims);
        debug!("Model declares input shape {:?}", input_shape);

        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());

        Ok(Self {
            graph,
            input_id,
            output_id,
            input_shape,
            name,
        })
    }
}

/// Fixed input dims, ignoring a symbolic batch dimension
fn declared_dims(graph: &rten::Model, id: NodeId) -> Option<[usize; 4]> {
    let dims = graph.node_info(id)?.shape()?;
    if dims.len() != 4 {
        return None;
    }

    let mut fixed = [1usize; 4];
    for (slot, dim) in fixed.iter_mut().zip(dims.iter()).skip(1) {
        match dim {
            Dimension::Fixed(n) => *slot = *n,
            Dimension::Symbolic(_) => return None,
        }
    }
    Some(fixed)
}

impl Model for RtenModel {
    fn input_shape(&self) -> Option<InputShape> {
        self.input_shape
    }

    fn infer(&self, input: InputTensor) -> Result<Vec<f32>, ClassifierError> {
        let shape = input.shape();
        let tensor = NdTensor::from_data(shape, input.into_data());

        let mut outputs = self
            .graph
            .run(
                vec![(self.input_id, tensor.view().into())],
                &[self.output_id],
                None,
            )
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let output = outputs
            .pop()
            .ok_or_else(|| ClassifierError::Inference("model returned no outputs".to_string()))?;
        let scores: Tensor<f32> = output
            .try_into()
            .map_err(|e| ClassifierError::Inference(format!("unexpected output type: {:?}", e)))?;

        Ok(scores.to_vec())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
