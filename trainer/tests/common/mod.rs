#![allow(dead_code)]

use recipe_align_core::alignment::{GoldAlignmentTable, GoldRecord};
use recipe_align_core::embedding::deterministic_embedding;
use recipe_align_core::model::{ActionContext, ActionNode, Dish, Recipe, RecipeEmbeddings};
use scoring::{Criterion, Differentiable, ModelError, ScoreRequest, ScoringModel};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const DIM: usize = 8;

pub fn recipe(name: &str, tokens: &[&str]) -> Recipe {
    let tokens: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
    let vectors = tokens
        .iter()
        .map(|t| deterministic_embedding(t, "fixture", DIM))
        .collect();
    let lookup = (0..tokens.len()).map(|i| i..i + 1).collect();
    let actions = tokens
        .iter()
        .enumerate()
        .map(|(i, t)| {
            ActionNode::new(
                (i + 1).to_string(),
                ActionContext {
                    span: i..i + 1,
                    text: t.clone(),
                },
            )
        })
        .collect();
    Recipe::new(name, tokens, actions, RecipeEmbeddings::new(vectors, lookup, DIM)).unwrap()
}

/// Dish with recipes `{name}_1` and `{name}_2` of three actions each and the
/// given `(action_id, gold_label)` rows from recipe 1 to recipe 2.
pub fn dish(name: &str, gold: &[(&str, &str)]) -> Dish {
    let first = format!("{name}_1");
    let second = format!("{name}_2");
    let mut recipes = BTreeMap::new();
    recipes.insert(first.clone(), recipe(&first, &["chop", "boil", "serve"]));
    recipes.insert(second.clone(), recipe(&second, &["dice", "simmer", "plate"]));

    let records = gold
        .iter()
        .map(|(action, label)| GoldRecord::new(&first, *action, &second, *label));
    Dish {
        name: name.to_string(),
        recipes,
        gold: GoldAlignmentTable::from_records(records).unwrap(),
    }
}

/// Trainable stand-in that predicts the node at the same position (like the
/// sequence baseline) and counts backward passes.
#[derive(Debug, Default)]
pub struct PositionalModel {
    pub params: Vec<f32>,
    pub grads: Vec<f32>,
    pub backward_calls: usize,
    pub training: bool,
}

impl PositionalModel {
    pub fn new() -> Self {
        Self {
            params: vec![0.0; 2],
            grads: vec![0.0; 2],
            ..Self::default()
        }
    }
}

impl ScoringModel for PositionalModel {
    fn name(&self) -> &str {
        "positional"
    }

    fn score(&self, request: &ScoreRequest<'_>) -> anyhow::Result<Vec<f32>> {
        let position = request.source_recipe.position(&request.source.id).unwrap();
        let mut scores = vec![0.0; request.candidate_count()];
        let last = scores.len() - 1;
        scores[position.min(last)] = 1.0;
        Ok(scores)
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    fn as_differentiable(&mut self) -> Option<&mut dyn Differentiable> {
        Some(self)
    }
}

impl Differentiable for PositionalModel {
    fn zero_grad(&mut self) {
        self.grads.iter_mut().for_each(|g| *g = 0.0);
    }

    fn backward(&mut self, _request: &ScoreRequest<'_>, _score_grad: &[f32]) -> anyhow::Result<()> {
        self.backward_calls += 1;
        self.grads.iter_mut().for_each(|g| *g = 1.0);
        Ok(())
    }

    fn parameters(&self) -> &[f32] {
        &self.params
    }

    fn params_and_grads(&mut self) -> (&mut [f32], &[f32]) {
        (&mut self.params[..], &self.grads[..])
    }

    fn load_parameters(&mut self, parameters: &[f32]) -> Result<(), ModelError> {
        self.params = parameters.to_vec();
        Ok(())
    }
}

/// Loss of exactly 1.0 per scored action.
pub struct UnitLoss;

impl Criterion for UnitLoss {
    fn loss(&self, _scores: &[f32], _target: usize) -> f32 {
        1.0
    }

    fn gradient(&self, scores: &[f32], _target: usize) -> Vec<f32> {
        vec![0.0; scores.len()]
    }
}

pub fn write_recipe(dir: &Path, name: &str, tokens: &[&str]) {
    let actions: Vec<String> = tokens
        .iter()
        .enumerate()
        .map(|(i, _)| format!(r#"{{"id": "{}", "span": [{}, {}]}}"#, i + 1, i, i + 1))
        .collect();
    let tokens: Vec<String> = tokens.iter().map(|t| format!("\"{t}\"")).collect();
    fs::write(
        dir.join(format!("{name}.json")),
        format!(
            r#"{{"tokens": [{}], "actions": [{}]}}"#,
            tokens.join(", "),
            actions.join(", ")
        ),
    )
    .unwrap();
}

/// Writes a two-recipe dish with a full alignment file under `root`.
pub fn seed_dish(root: &Path, dish: &str) {
    let recipes = root.join(dish).join("recipes");
    fs::create_dir_all(&recipes).unwrap();
    write_recipe(&recipes, &format!("{dish}_1"), &["chop", "boil", "serve"]);
    write_recipe(&recipes, &format!("{dish}_2"), &["dice", "simmer", "plate"]);
    fs::write(
        root.join(dish).join("alignments.tsv"),
        format!(
            "file1\ttoken1\tfile2\ttoken2\n\
             {dish}_1\t1\t{dish}_2\t1\n\
             {dish}_1\t2\t{dish}_2\t2\n\
             {dish}_1\t3\t{dish}_2\t3\n"
        ),
    )
    .unwrap();
}
