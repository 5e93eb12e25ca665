pub mod formatting;
pub mod geo;
pub mod panels;
pub mod pkce;
pub mod preferences;
pub mod providers;
pub mod recipe_search;
pub mod recipes;
pub mod shows;
pub mod supersede;

pub use preferences::PreferenceService;
pub use recipe_search::RecipeSearch;
pub use shows::{ShowsConfig, ShowsService};
pub use supersede::LatestOnly;
