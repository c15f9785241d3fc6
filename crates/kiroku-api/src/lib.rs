pub mod jikan;
pub mod traits;

pub use jikan::JikanClient;
pub use traits::CatalogService;
