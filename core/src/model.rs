use crate::alignment::GoldAlignmentTable;
use crate::error::{AlignError, ErrorCode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use thiserror::Error;

/// Id of the sentinel node every action graph starts with.
pub const ROOT_ACTION_ID: &str = "0";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("recipe {recipe}: duplicate action id {action_id}")]
    DuplicateActionId { recipe: String, action_id: String },
    #[error("recipe {recipe}: action {action_id} span {start}..{end} exceeds {tokens} tokens")]
    SpanOutOfRange {
        recipe: String,
        action_id: String,
        start: usize,
        end: usize,
        tokens: usize,
    },
    #[error("recipe {recipe}: embedding lookup covers {lookup} tokens, recipe has {tokens}")]
    LookupMismatch {
        recipe: String,
        lookup: usize,
        tokens: usize,
    },
}

impl AlignError for GraphError {
    fn error_code(&self) -> ErrorCode {
        ErrorCode::DataQuality
    }
}

/// Feature payload of one action: where it sits in the recipe text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionContext {
    pub span: Range<usize>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionNode {
    pub id: String,
    pub context: ActionContext,
    pub parent_ids: Vec<String>,
    pub child_ids: Vec<String>,
}

impl ActionNode {
    pub fn new(id: impl Into<String>, context: ActionContext) -> Self {
        Self {
            id: id.into(),
            context,
            parent_ids: Vec::new(),
            child_ids: Vec::new(),
        }
    }

    pub fn root() -> Self {
        Self::new(ROOT_ACTION_ID, ActionContext::default())
    }

    pub fn is_root(&self) -> bool {
        self.id == ROOT_ACTION_ID
    }

    pub fn with_parents(mut self, parents: Vec<String>) -> Self {
        self.parent_ids = parents;
        self
    }

    pub fn with_children(mut self, children: Vec<String>) -> Self {
        self.child_ids = children;
        self
    }
}

/// Embedding rows for one recipe plus the token → rows lookup.
///
/// A token may map to several rows (sub-word tokenizers) or none.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeEmbeddings {
    pub vectors: Vec<Vec<f32>>,
    pub lookup: Vec<Range<usize>>,
    pub dim: usize,
}

impl RecipeEmbeddings {
    pub fn new(vectors: Vec<Vec<f32>>, lookup: Vec<Range<usize>>, dim: usize) -> Self {
        Self {
            vectors,
            lookup,
            dim,
        }
    }

    /// Mean of every embedding row covered by the token span. Empty spans
    /// (the root sentinel) map to the zero vector.
    pub fn span_vector(&self, span: &Range<usize>) -> Vec<f32> {
        let mut sum = vec![0.0f32; self.dim];
        let mut rows = 0usize;

        for token in span.clone() {
            let Some(row_range) = self.lookup.get(token) else {
                continue;
            };
            for row in row_range.clone() {
                if let Some(vector) = self.vectors.get(row) {
                    for (acc, value) in sum.iter_mut().zip(vector) {
                        *acc += value;
                    }
                    rows += 1;
                }
            }
        }

        if rows > 0 {
            let scale = 1.0 / rows as f32;
            sum.iter_mut().for_each(|v| *v *= scale);
        }
        sum
    }
}

/// One recipe's action graph. Node 0 is always the root sentinel.
#[derive(Debug, Clone)]
pub struct Recipe {
    name: String,
    tokens: Vec<String>,
    nodes: Vec<ActionNode>,
    embeddings: RecipeEmbeddings,
    positions: HashMap<String, usize>,
}

impl Recipe {
    pub fn new(
        name: impl Into<String>,
        tokens: Vec<String>,
        actions: Vec<ActionNode>,
        embeddings: RecipeEmbeddings,
    ) -> Result<Self, GraphError> {
        let name = name.into();

        if embeddings.lookup.len() != tokens.len() {
            return Err(GraphError::LookupMismatch {
                recipe: name,
                lookup: embeddings.lookup.len(),
                tokens: tokens.len(),
            });
        }

        let mut nodes = Vec::with_capacity(actions.len() + 1);
        nodes.push(ActionNode::root());
        nodes.extend(actions);

        let mut positions = HashMap::with_capacity(nodes.len());
        for (idx, node) in nodes.iter().enumerate() {
            let span = &node.context.span;
            if span.start > span.end || span.end > tokens.len() {
                return Err(GraphError::SpanOutOfRange {
                    recipe: name,
                    action_id: node.id.clone(),
                    start: span.start,
                    end: span.end,
                    tokens: tokens.len(),
                });
            }
            if positions.insert(node.id.clone(), idx).is_some() {
                return Err(GraphError::DuplicateActionId {
                    recipe: name,
                    action_id: node.id.clone(),
                });
            }
        }

        Ok(Self {
            name,
            tokens,
            nodes,
            embeddings,
            positions,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn nodes(&self) -> &[ActionNode] {
        &self.nodes
    }

    pub fn actions(&self) -> &[ActionNode] {
        &self.nodes[1..]
    }

    pub fn embeddings(&self) -> &RecipeEmbeddings {
        &self.embeddings
    }

    pub fn position(&self, action_id: &str) -> Option<usize> {
        self.positions.get(action_id).copied()
    }

    pub fn node(&self, action_id: &str) -> Option<&ActionNode> {
        self.position(action_id).map(|idx| &self.nodes[idx])
    }

    pub fn action_vector(&self, node: &ActionNode) -> Vec<f32> {
        self.embeddings.span_vector(&node.context.span)
    }

    /// Mean vector over the given related node ids; unknown ids are ignored.
    pub fn mean_vector<'a>(&self, ids: impl IntoIterator<Item = &'a String>) -> Vec<f32> {
        let mut sum = vec![0.0f32; self.embeddings.dim];
        let mut count = 0usize;
        for node in ids.into_iter().filter_map(|id| self.node(id)) {
            for (acc, value) in sum.iter_mut().zip(self.action_vector(node)) {
                *acc += value;
            }
            count += 1;
        }
        if count > 0 {
            sum.iter_mut().for_each(|v| *v /= count as f32);
        }
        sum
    }
}

#[derive(Debug, Clone)]
pub struct Dish {
    pub name: String,
    pub recipes: BTreeMap<String, Recipe>,
    pub gold: GoldAlignmentTable,
}

impl Dish {
    pub fn recipe(&self, name: &str) -> Option<&Recipe> {
        self.recipes.get(name)
    }
}
