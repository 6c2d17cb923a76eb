use crate::alignments::read_alignment_file;
use crate::embedding::Embedder;
use crate::error::CorpusError;
use crate::reader::RecipeReader;
use recipe_align_core::alignment::GoldAlignmentTable;
use recipe_align_core::model::{Dish, Recipe};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Sorted names of the dish directories under `root`. Hidden entries, plain
/// files and the shared recipe folder are skipped.
pub fn list_dishes(root: &Path, recipe_folder: &str) -> Result<Vec<String>, CorpusError> {
    let mut dishes = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if name.starts_with('.') || name == recipe_folder {
            continue;
        }
        dishes.push(name);
    }
    dishes.sort();
    Ok(dishes)
}

/// Loads dishes laid out as `<root>/<dish>/<alignment_file>` plus
/// `<root>/<dish>/<recipe_folder>/<recipe>.<ext>`.
pub struct DishLoader {
    root: PathBuf,
    alignment_file: String,
    recipe_folder: String,
    reader: Box<dyn RecipeReader>,
    embedder: Box<dyn Embedder>,
}

impl DishLoader {
    pub fn new(
        root: impl Into<PathBuf>,
        reader: Box<dyn RecipeReader>,
        embedder: Box<dyn Embedder>,
    ) -> Self {
        Self {
            root: root.into(),
            alignment_file: "alignments.tsv".to_string(),
            recipe_folder: "recipes".to_string(),
            reader,
            embedder,
        }
    }

    pub fn with_layout(
        mut self,
        alignment_file: impl Into<String>,
        recipe_folder: impl Into<String>,
    ) -> Self {
        self.alignment_file = alignment_file.into();
        self.recipe_folder = recipe_folder.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    pub fn list_dishes(&self) -> Result<Vec<String>, CorpusError> {
        list_dishes(&self.root, &self.recipe_folder)
    }

    /// Reads the dish's gold table and every recipe it references. Each
    /// recipe is embedded exactly once; the result is cached on the [`Dish`].
    pub fn load_dish(&self, dish_name: &str) -> Result<Dish, CorpusError> {
        let dish_dir = self.root.join(dish_name);
        if !dish_dir.is_dir() {
            return Err(CorpusError::DishNotFound(dish_name.to_string()));
        }

        let alignment_path = dish_dir.join(&self.alignment_file);
        if !alignment_path.is_file() {
            return Err(CorpusError::MissingAlignmentFile {
                dish: dish_name.to_string(),
                path: alignment_path,
            });
        }

        let records = read_alignment_file(&alignment_path)?;
        let gold = GoldAlignmentTable::from_records(records).map_err(|source| {
            CorpusError::DuplicateGoldKey {
                dish: dish_name.to_string(),
                source,
            }
        })?;

        let recipe_dir = dish_dir.join(&self.recipe_folder);
        let mut recipes = BTreeMap::new();
        for recipe_name in gold.recipe_names() {
            let path = recipe_dir.join(format!("{}.{}", recipe_name, self.reader.extension()));
            if !path.is_file() {
                return Err(CorpusError::MissingRecipe {
                    dish: dish_name.to_string(),
                    recipe: recipe_name.to_string(),
                    path,
                });
            }

            let document = self.reader.read_recipe(&path)?;
            let embeddings = self.embedder.embed(&document.tokens);
            let recipe = Recipe::new(recipe_name, document.tokens, document.actions, embeddings)
                .map_err(|source| CorpusError::Graph {
                    dish: dish_name.to_string(),
                    source,
                })?;
            debug!(
                "Loaded recipe {} ({} actions) for dish {}",
                recipe_name,
                recipe.actions().len(),
                dish_name
            );
            recipes.insert(recipe_name.to_string(), recipe);
        }

        info!(
            "Loaded dish {} ({} recipes, {} gold alignments)",
            dish_name,
            recipes.len(),
            gold.len()
        );

        Ok(Dish {
            name: dish_name.to_string(),
            recipes,
            gold,
        })
    }

    pub fn load_all(&self, dish_names: &[String]) -> Result<BTreeMap<String, Dish>, CorpusError> {
        dish_names
            .iter()
            .map(|name| Ok((name.clone(), self.load_dish(name)?)))
            .collect()
    }
}
