use crate::error::TrainerError;
use recipe_align_core::model::{Dish, Recipe};
use scoring::{argmax, Criterion, Differentiable, Optimizer, ScoreRequest, ScoringModel};
use serde::Serialize;
use std::ops::AddAssign;

/// What a pass over a dish does besides predicting.
pub enum Mode<'a> {
    Training {
        optimizer: &'a mut dyn Optimizer,
        criterion: &'a dyn Criterion,
    },
    Validation { criterion: &'a dyn Criterion },
    Testing { sink: &'a mut ResultTable },
}

impl Mode<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Training { .. } => "training",
            Mode::Validation { .. } => "validation",
            Mode::Testing { .. } => "testing",
        }
    }
}

/// Counters of one or more passes. Loss and step stay zero in testing.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct RunStats {
    pub correct_predictions: usize,
    pub num_actions: usize,
    pub total_loss: f64,
    pub step: usize,
}

impl AddAssign for RunStats {
    fn add_assign(&mut self, rhs: Self) {
        self.correct_predictions += rhs.correct_predictions;
        self.num_actions += rhs.num_actions;
        self.total_loss += rhs.total_loss;
        self.step += rhs.step;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestRecord {
    pub recipe1: String,
    pub recipe2: String,
    pub source_action_id: String,
    pub gold_target_id: String,
    pub predicted_target_id: String,
}

impl TestRecord {
    pub fn is_correct(&self) -> bool {
        self.gold_target_id == self.predicted_target_id
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResultTable {
    records: Vec<TestRecord>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: TestRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[TestRecord] {
        &self.records
    }

    pub fn correct_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_correct()).count()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Scores every gold-annotated source action of every recipe pair of `dish`.
///
/// Pairs are visited in sorted `(recipe1, recipe2)` order and source actions
/// in graph order; actions without a gold record are skipped. In training
/// mode the optimizer steps only when the prediction is wrong, while loss and
/// step are accumulated for every action.
pub fn run_model(
    dish: &Dish,
    model: &mut dyn ScoringModel,
    mode: &mut Mode<'_>,
) -> Result<RunStats, TrainerError> {
    let model_name = model.name().to_string();
    if matches!(mode, Mode::Training { .. }) && model.as_differentiable().is_none() {
        return Err(TrainerError::NotTrainable(model_name));
    }
    let mut stats = RunStats::default();

    for ((recipe1, recipe2), pair) in dish.gold.pairs() {
        let source_recipe = recipe(dish, recipe1)?;
        let target_recipe = recipe(dish, recipe2)?;

        for node in source_recipe.actions() {
            let Some(record) = pair.get(&node.id) else {
                continue;
            };

            let gold_id = record.target_id();
            let gold_index =
                target_recipe
                    .position(gold_id)
                    .ok_or_else(|| TrainerError::GoldTargetNotFound {
                        dish: dish.name.clone(),
                        recipe1: recipe1.clone(),
                        recipe2: recipe2.clone(),
                        action_id: node.id.clone(),
                        target_id: gold_id.to_string(),
                    })?;

            let request = ScoreRequest::new(node, source_recipe, target_recipe);

            if let Mode::Training { .. } = mode {
                trainable(model, &model_name)?.zero_grad();
            }

            let scores = model.score(&request).map_err(|err| TrainerError::Scoring {
                dish: dish.name.clone(),
                recipe1: recipe1.clone(),
                recipe2: recipe2.clone(),
                action_id: node.id.clone(),
                source: err.into(),
            })?;
            let predicted_index = argmax(&scores)
                .filter(|_| scores.len() == request.candidate_count())
                .ok_or_else(|| TrainerError::ScoreCount {
                    dish: dish.name.clone(),
                    recipe2: recipe2.clone(),
                    expected: request.candidate_count(),
                    actual: scores.len(),
                })?;
            let predicted_id = &target_recipe.nodes()[predicted_index].id;
            let correct = predicted_id == gold_id;

            stats.num_actions += 1;
            if correct {
                stats.correct_predictions += 1;
            }

            match mode {
                Mode::Training {
                    optimizer,
                    criterion,
                } => {
                    let loss = criterion.loss(&scores, gold_index);
                    if !correct {
                        let grad = criterion.gradient(&scores, gold_index);
                        let params = trainable(model, &model_name)?;
                        params.backward(&request, &grad).map_err(|err| {
                            TrainerError::Scoring {
                                dish: dish.name.clone(),
                                recipe1: recipe1.clone(),
                                recipe2: recipe2.clone(),
                                action_id: node.id.clone(),
                                source: err.into(),
                            }
                        })?;
                        optimizer.step(params);
                    }
                    stats.total_loss += f64::from(loss);
                    stats.step += 1;
                }
                Mode::Validation { criterion } => {
                    stats.total_loss += f64::from(criterion.loss(&scores, gold_index));
                    stats.step += 1;
                }
                Mode::Testing { sink } => sink.push(TestRecord {
                    recipe1: recipe1.clone(),
                    recipe2: recipe2.clone(),
                    source_action_id: node.id.clone(),
                    gold_target_id: gold_id.to_string(),
                    predicted_target_id: predicted_id.clone(),
                }),
            }
        }
    }

    Ok(stats)
}

fn recipe<'d>(dish: &'d Dish, name: &str) -> Result<&'d Recipe, TrainerError> {
    dish.recipe(name).ok_or_else(|| TrainerError::MissingRecipe {
        dish: dish.name.clone(),
        recipe: name.to_string(),
    })
}

fn trainable<'m>(
    model: &'m mut dyn ScoringModel,
    name: &str,
) -> Result<&'m mut dyn Differentiable, TrainerError> {
    model
        .as_differentiable()
        .ok_or_else(|| TrainerError::NotTrainable(name.to_string()))
}
