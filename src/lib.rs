pub mod api_connection;
pub mod cli;
pub mod enrichment;
pub mod image_synthesis;
pub mod normalizer;
pub mod nutrient_aggregator;
pub mod nutrient_resolver;
pub mod nutrient_store;
pub mod tag_deriver;
