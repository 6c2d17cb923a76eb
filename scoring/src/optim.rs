use crate::model::Differentiable;
use serde::{Deserialize, Serialize};

/// Applies accumulated gradients to a model's parameters.
pub trait Optimizer: Send {
    fn step(&mut self, model: &mut dyn Differentiable);

    /// Serializable snapshot of the optimizer's internal state.
    fn state(&self) -> serde_json::Value;

    fn load_state(&mut self, state: serde_json::Value) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    steps: u64,
    first_moment: Vec<f64>,
    second_moment: Vec<f64>,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            steps: 0,
            first_moment: Vec::new(),
            second_moment: Vec::new(),
        }
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }
}

impl Optimizer for Adam {
    fn step(&mut self, model: &mut dyn Differentiable) {
        let (params, grads) = model.params_and_grads();
        if self.first_moment.len() != params.len() {
            self.first_moment = vec![0.0; params.len()];
            self.second_moment = vec![0.0; params.len()];
        }

        self.steps += 1;
        let t = self.steps as i32;
        let bias1 = 1.0 - self.beta1.powi(t);
        let bias2 = 1.0 - self.beta2.powi(t);

        for (i, (param, grad)) in params.iter_mut().zip(grads).enumerate() {
            let g = *grad as f64;
            let m = &mut self.first_moment[i];
            *m = self.beta1 * *m + (1.0 - self.beta1) * g;
            let v = &mut self.second_moment[i];
            *v = self.beta2 * *v + (1.0 - self.beta2) * g * g;

            let m_hat = self.first_moment[i] / bias1;
            let v_hat = self.second_moment[i] / bias2;
            *param -= (self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon)) as f32;
        }
    }

    fn state(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn load_state(&mut self, state: serde_json::Value) -> anyhow::Result<()> {
        *self = serde_json::from_value(state)?;
        Ok(())
    }
}
