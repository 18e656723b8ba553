//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_flight_store;
mod redis_flight_store;

pub use in_memory_flight_store::InMemoryFlightStore;
pub use redis_flight_store::RedisFlightStore;
