pub mod in_memory_aggregation_repository;
#[cfg(feature = "postgres")]
pub mod postgres_aggregation_repository;

pub use in_memory_aggregation_repository::InMemoryAggregationRepository;
#[cfg(feature = "postgres")]
pub use postgres_aggregation_repository::PostgresAggregationRepository;
