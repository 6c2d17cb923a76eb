pub mod alignments;
pub mod embedding;
pub mod error;
pub mod loader;
pub mod reader;

pub use embedding::{DeterministicEmbedder, Embedder};
pub use error::CorpusError;
pub use loader::{list_dishes, DishLoader};
pub use reader::{JsonRecipeReader, RecipeDocument, RecipeReader};
