use crate::error::EvalError;
use corpus::alignments::read_tsv_rows;
use recipe_align_core::alignment::{ActionKey, UniqueKeyMap};
use recipe_align_core::model::ROOT_ACTION_ID;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelledTarget {
    pub recipe2: String,
    pub label: String,
}

/// `(recipe1, action_id) -> (recipe2, label)` in file order.
pub type LabelTable = UniqueKeyMap<LabelledTarget>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSource {
    Gold,
    Prediction,
}

/// Gold label column. An empty label means "no counterpart", i.e. the root.
pub fn gold_label(token: &str) -> String {
    if token.is_empty() {
        ROOT_ACTION_ID.to_string()
    } else {
        token.to_string()
    }
}

/// Prediction label column of a row wider than four columns. Some writers
/// wrap the id in brackets or quotes (`[3]`, `'12',`); the wrapping is
/// stripped. Anything else, including ids like `s12`, is kept as is.
pub fn extract_label(token: &str) -> String {
    if token.starts_with(|c: char| c.is_ascii_punctuation()) {
        let inner = token.trim_matches(|c: char| c.is_ascii_punctuation());
        if !inner.is_empty() {
            return inner.to_string();
        }
    }
    gold_label(token)
}

/// Reads an alignment or prediction file (header skipped, columns
/// `recipe1, action_id, recipe2, label, ...`).
pub fn read_label_table(path: &Path, source: LabelSource) -> Result<LabelTable, EvalError> {
    let mut table = LabelTable::new();
    for row in read_tsv_rows(path)? {
        let [recipe1, action_id, recipe2, label, ..] = row.fields.as_slice() else {
            return Err(EvalError::MalformedRow {
                path: path.to_path_buf(),
                line: row.line,
                reason: format!("expected at least 4 columns, found {}", row.fields.len()),
            });
        };
        let label = match source {
            LabelSource::Prediction if row.fields.len() > 4 => extract_label(label),
            _ => gold_label(label),
        };
        table
            .insert(
                ActionKey::new(recipe1, action_id),
                LabelledTarget {
                    recipe2: recipe2.clone(),
                    label,
                },
            )
            .map_err(|source| EvalError::DuplicateKey {
                path: path.to_path_buf(),
                source,
            })?;
    }
    Ok(table)
}
