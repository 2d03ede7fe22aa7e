pub mod aggregation_repository;

pub use aggregation_repository::AggregationRepository;
