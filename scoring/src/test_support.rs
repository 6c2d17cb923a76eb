use recipe_align_core::embedding::deterministic_embedding;
use recipe_align_core::model::{ActionContext, ActionNode, Recipe, RecipeEmbeddings};

pub const DIM: usize = 6;

/// Recipe with one single-token action per token; action ids are 1-based.
pub fn recipe(name: &str, tokens: &[&str]) -> Recipe {
    let tokens: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
    let vectors = tokens
        .iter()
        .map(|t| deterministic_embedding(t, "test", DIM))
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
