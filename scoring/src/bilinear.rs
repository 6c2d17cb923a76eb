use crate::model::{Differentiable, ModelError, ScoreRequest, ScoringModel};

/// Trainable bilinear scorer `score_j = s^T W t_j` over mean action
/// embeddings. `W` starts as the identity, so an untrained model scores by
/// dot product.
#[derive(Debug, Clone)]
pub struct BilinearAlignmentModel {
    dim: usize,
    with_features: bool,
    weights: Vec<f32>,
    grads: Vec<f32>,
}

impl BilinearAlignmentModel {
    pub fn new(dim: usize, with_features: bool) -> Self {
        let mut weights = vec![0.0; dim * dim];
        for i in 0..dim {
            weights[i * dim + i] = 1.0;
        }
        Self {
            dim,
            with_features,
            grads: vec![0.0; weights.len()],
            weights,
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn with_features(&self) -> bool {
        self.with_features
    }

    /// Source representation; with features the mean parent and child
    /// vectors are added to the action vector.
    fn source_vector(&self, request: &ScoreRequest<'_>) -> Result<Vec<f32>, ModelError> {
        let recipe = request.source_recipe;
        let mut vector = recipe.action_vector(request.source);
        self.check_dim(&vector)?;

        if self.with_features {
            let parents = recipe.mean_vector(&request.source.parent_ids);
            let children = recipe.mean_vector(&request.source.child_ids);
            for ((acc, p), c) in vector.iter_mut().zip(&parents).zip(&children) {
                *acc += p + c;
            }
        }
        Ok(vector)
    }

    fn target_vectors(&self, request: &ScoreRequest<'_>) -> Result<Vec<Vec<f32>>, ModelError> {
        let target = request.target_recipe;
        target
            .nodes()
            .iter()
            .map(|node| {
                let vector = target.action_vector(node);
                self.check_dim(&vector)?;
                Ok(vector)
            })
            .collect()
    }

    fn check_dim(&self, vector: &[f32]) -> Result<(), ModelError> {
        if vector.len() != self.dim {
            return Err(ModelError::DimensionMismatch {
                expected: self.dim,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    fn project(&self, source: &[f32]) -> Vec<f32> {
        let mut projected = vec![0.0f32; self.dim];
        for (a, s) in source.iter().enumerate() {
            if *s == 0.0 {
                continue;
            }
            let row = &self.weights[a * self.dim..(a + 1) * self.dim];
            for (acc, w) in projected.iter_mut().zip(row) {
                *acc += s * w;
            }
        }
        projected
    }
}

impl ScoringModel for BilinearAlignmentModel {
    fn name(&self) -> &str {
        if self.with_features {
            "alignment-with-feature"
        } else {
            "alignment-no-feature"
        }
    }

    fn score(&self, request: &ScoreRequest<'_>) -> anyhow::Result<Vec<f32>> {
        let source = self.source_vector(request)?;
        let projected = self.project(&source);
        let scores = self
            .target_vectors(request)?
            .iter()
            .map(|t| projected.iter().zip(t).map(|(p, v)| p * v).sum())
            .collect();
        Ok(scores)
    }

    fn as_differentiable(&mut self) -> Option<&mut dyn Differentiable> {
        Some(self)
    }
}

impl Differentiable for BilinearAlignmentModel {
    fn zero_grad(&mut self) {
        self.grads.iter_mut().for_each(|g| *g = 0.0);
    }

    fn backward(&mut self, request: &ScoreRequest<'_>, score_grad: &[f32]) -> anyhow::Result<()> {
        let source = self.source_vector(request)?;
        let targets = self.target_vectors(request)?;
        if score_grad.len() != targets.len() {
            return Err(ModelError::GradientLength {
                expected: targets.len(),
                actual: score_grad.len(),
            }
            .into());
        }

        // dL/dW[a][b] = sum_j g_j * s[a] * t_j[b]
        let mut weighted_target = vec![0.0f32; self.dim];
        for (g, target) in score_grad.iter().zip(&targets) {
            for (acc, t) in weighted_target.iter_mut().zip(target) {
                *acc += g * t;
            }
        }
        for (a, s) in source.iter().enumerate() {
            let row = &mut self.grads[a * self.dim..(a + 1) * self.dim];
            for (grad, t) in row.iter_mut().zip(&weighted_target) {
                *grad += s * t;
            }
        }
        Ok(())
    }

    fn parameters(&self) -> &[f32] {
        &self.weights
    }

    fn params_and_grads(&mut self) -> (&mut [f32], &[f32]) {
        (&mut self.weights[..], &self.grads[..])
    }

    fn load_parameters(&mut self, parameters: &[f32]) -> Result<(), ModelError> {
        if parameters.len() != self.weights.len() {
            return Err(ModelError::ParameterCount {
                expected: self.weights.len(),
                actual: parameters.len(),
            });
        }
        self.weights.copy_from_slice(parameters);
        Ok(())
    }
}
