use crate::error::TrainerError;
use crate::evaluator::{run_model, Mode, RunStats};
use corpus::DishLoader;
use recipe_align_core::model::Dish;
use scoring::{Criterion, Optimizer, ScoringModel};
use std::collections::BTreeMap;
use tracing::debug;

/// Loaded dishes shared read-only by every training stage.
#[derive(Debug, Clone, Default)]
pub struct TrainingContext {
    dishes: BTreeMap<String, Dish>,
}

impl TrainingContext {
    pub fn new(dishes: impl IntoIterator<Item = Dish>) -> Self {
        Self {
            dishes: dishes.into_iter().map(|d| (d.name.clone(), d)).collect(),
        }
    }

    pub fn load(loader: &DishLoader) -> Result<Self, TrainerError> {
        let names = loader.list_dishes()?;
        Ok(Self {
            dishes: loader.load_all(&names)?,
        })
    }

    pub fn dish(&self, name: &str) -> Result<&Dish, TrainerError> {
        self.dishes
            .get(name)
            .ok_or_else(|| TrainerError::UnknownDish(name.to_string()))
    }

    pub fn dish_names(&self) -> Vec<&str> {
        self.dishes.keys().map(String::as_str).collect()
    }

    pub fn dishes(&self) -> impl Iterator<Item = &Dish> {
        self.dishes.values()
    }

    pub fn len(&self) -> usize {
        self.dishes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dishes.is_empty()
    }

    /// Training dishes and the validation dish. The validation dish is the
    /// last one in sorted order for every fold.
    pub fn split(&self) -> Result<(Vec<&str>, &str), TrainerError> {
        let mut names = self.dish_names();
        if names.len() < 2 {
            return Err(TrainerError::NotEnoughDishes(names.len()));
        }
        let valid = names.pop().ok_or(TrainerError::NotEnoughDishes(0))?;
        Ok((names, valid))
    }
}

/// Averaged loss and accuracy (percent) of one pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochStats {
    pub loss: f64,
    pub accuracy: f64,
}

pub fn train(
    context: &TrainingContext,
    dish_names: &[&str],
    model: &mut dyn ScoringModel,
    optimizer: &mut dyn Optimizer,
    criterion: &dyn Criterion,
) -> Result<EpochStats, TrainerError> {
    model.set_training(true);

    let mut totals = RunStats::default();
    for name in dish_names {
        let dish = context.dish(name)?;
        let mut mode = Mode::Training {
            optimizer: &mut *optimizer,
            criterion,
        };
        let stats = run_model(dish, model, &mut mode)?;
        debug!(dish = %name, correct = stats.correct_predictions, actions = stats.num_actions, "trained dish");
        totals += stats;
    }

    if totals.step < 2 || totals.num_actions == 0 {
        return Err(TrainerError::InsufficientSteps {
            stage: "training",
            steps: totals.step,
        });
    }

    // Divides by step - 1, matching the historical training loss figures.
    Ok(EpochStats {
        loss: totals.total_loss / (totals.step - 1) as f64,
        accuracy: percent(totals.correct_predictions, totals.num_actions),
    })
}

pub fn valid(
    context: &TrainingContext,
    dish_name: &str,
    model: &mut dyn ScoringModel,
    criterion: &dyn Criterion,
) -> Result<EpochStats, TrainerError> {
    model.set_training(false);

    let dish = context.dish(dish_name)?;
    let stats = run_model(dish, model, &mut Mode::Validation { criterion })?;

    if stats.step == 0 || stats.num_actions == 0 {
        return Err(TrainerError::InsufficientSteps {
            stage: "validation",
            steps: stats.step,
        });
    }

    Ok(EpochStats {
        loss: stats.total_loss / stats.step as f64,
        accuracy: percent(stats.correct_predictions, stats.num_actions),
    })
}

pub(crate) fn percent(correct: usize, total: usize) -> f64 {
    correct as f64 * 100.0 / total as f64
}
