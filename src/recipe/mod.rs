pub mod schema;
pub mod validator;

pub use schema::Recipe;
pub use validator::{parse_recipe, RecipeError};
