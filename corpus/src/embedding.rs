use recipe_align_core::embedding::deterministic_embedding;
use recipe_align_core::model::RecipeEmbeddings;

/// Turns a recipe's token sequence into embedding rows plus the token → rows lookup.
pub trait Embedder: Send + Sync {
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed(&self, tokens: &[String]) -> RecipeEmbeddings;
}

/// Hash-seeded embedder: one row per token, identical tokens share a vector.
pub struct DeterministicEmbedder {
    dims: usize,
    model_id: String,
}

impl DeterministicEmbedder {
    pub fn new(dims: usize) -> Self {
        Self {
            dims: dims.max(1),
            model_id: "token-hash-v1".to_string(),
        }
    }
}

impl Default for DeterministicEmbedder {
    fn default() -> Self {
        Self::new(768)
    }
}

impl Embedder for DeterministicEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dim(&self) -> usize {
        self.dims
    }

    fn embed(&self, tokens: &[String]) -> RecipeEmbeddings {
        let vectors = tokens
            .iter()
            .map(|token| deterministic_embedding(&token.to_lowercase(), &self.model_id, self.dims))
            .collect();
        let lookup = (0..tokens.len()).map(|i| i..i + 1).collect();
        RecipeEmbeddings::new(vectors, lookup, self.dims)
    }
}
