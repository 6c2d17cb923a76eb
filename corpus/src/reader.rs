use crate::error::CorpusError;
use recipe_align_core::model::{ActionContext, ActionNode};
use serde::Deserialize;
use std::path::Path;

/// Parsed recipe before embedding: token sequence and its actions (no root).
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeDocument {
    pub tokens: Vec<String>,
    pub actions: Vec<ActionNode>,
}

/// Parses one recipe file of an annotation format into a [`RecipeDocument`].
pub trait RecipeReader: Send + Sync {
    /// File extension (without the dot) of recipe files this reader understands.
    fn extension(&self) -> &str;
    fn read_recipe(&self, path: &Path) -> Result<RecipeDocument, CorpusError>;
}

#[derive(Debug, Deserialize)]
struct JsonRecipe {
    tokens: Vec<String>,
    actions: Vec<JsonAction>,
}

#[derive(Debug, Deserialize)]
struct JsonAction {
    id: String,
    span: [usize; 2],
    #[serde(default)]
    parents: Vec<String>,
    #[serde(default)]
    children: Vec<String>,
}

/// Reads `<recipe>.json` documents:
/// `{"tokens": [..], "actions": [{"id", "span": [start, end], "parents", "children"}]}`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRecipeReader;

impl JsonRecipeReader {
    pub fn parse(path: &Path, content: &str) -> Result<RecipeDocument, CorpusError> {
        let raw: JsonRecipe =
            serde_json::from_str(content).map_err(|source| CorpusError::InvalidRecipe {
                path: path.to_path_buf(),
                source,
            })?;

        let actions = raw
            .actions
            .into_iter()
            .map(|action| {
                let [start, end] = action.span;
                let text = raw
                    .tokens
                    .get(start..end)
                    .map(|tokens| tokens.join(" "))
                    .unwrap_or_default();
                ActionNode::new(
                    action.id,
                    ActionContext {
                        span: start..end,
                        text,
                    },
                )
                .with_parents(action.parents)
                .with_children(action.children)
            })
            .collect();

        Ok(RecipeDocument {
            tokens: raw.tokens,
            actions,
        })
    }
}

impl RecipeReader for JsonRecipeReader {
    fn extension(&self) -> &str {
        "json"
    }

    fn read_recipe(&self, path: &Path) -> Result<RecipeDocument, CorpusError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(path, &content)
    }
}
