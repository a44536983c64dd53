pub mod article_search;
pub mod generation;

pub use article_search::handle_article_search_stream;
pub use generation::handle_generation_stream;
