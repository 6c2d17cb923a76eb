use crate::model::{ScoreRequest, ScoringModel};
use recipe_align_core::model::Dish;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// How often a source action text was aligned to a target action text in
/// the gold data.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPairVocabulary {
    pairs: BTreeMap<String, BTreeMap<String, u32>>,
}

impl ActionPairVocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, source: &str, target: &str) {
        *self
            .pairs
            .entry(normalize(source))
            .or_default()
            .entry(normalize(target))
            .or_insert(0) += 1;
    }

    pub fn count(&self, source: &str, target: &str) -> u32 {
        self.pairs
            .get(&normalize(source))
            .and_then(|targets| targets.get(&normalize(target)))
            .copied()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.pairs.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Collects pairs from every gold record whose actions resolve in the
    /// dish's recipes.
    pub fn fit<'a>(dishes: impl IntoIterator<Item = &'a Dish>) -> Self {
        let mut vocabulary = Self::new();
        for dish in dishes {
            for ((recipe1, recipe2), pair) in dish.gold.pairs() {
                let (Some(source), Some(target)) = (dish.recipe(recipe1), dish.recipe(recipe2))
                else {
                    continue;
                };
                for record in pair.records() {
                    let source_node = source.node(&record.action_id);
                    let target_node = target.node(record.target_id());
                    if let (Some(s), Some(t)) = (source_node, target_node) {
                        vocabulary.record(&s.context.text, &t.context.text);
                    }
                }
            }
        }
        vocabulary
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let payload = serde_json::to_vec_pretty(self)?;
        fs::write(path, payload)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Scores each candidate by how often its text followed the source text
/// in the training alignments.
#[derive(Debug, Default, Clone)]
pub struct NaiveModel {
    vocabulary: ActionPairVocabulary,
}

impl NaiveModel {
    pub fn new(vocabulary: ActionPairVocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn fit<'a>(dishes: impl IntoIterator<Item = &'a Dish>) -> Self {
        Self::new(ActionPairVocabulary::fit(dishes))
    }

    pub fn vocabulary(&self) -> &ActionPairVocabulary {
        &self.vocabulary
    }
}

impl ScoringModel for NaiveModel {
    fn name(&self) -> &str {
        "naive"
    }

    fn score(&self, request: &ScoreRequest<'_>) -> anyhow::Result<Vec<f32>> {
        let source = &request.source.context.text;
        Ok(request
            .target_recipe
            .nodes()
            .iter()
            .map(|node| self.vocabulary.count(source, &node.context.text) as f32)
            .collect())
    }
}
