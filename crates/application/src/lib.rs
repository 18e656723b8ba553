//! Application services and ports.

#![forbid(unsafe_code)]

mod flight_ports;
mod group_config;
mod group_service;
mod result_poller;

pub use flight_ports::{FlightStore, LockAcquisition, ReleaseOutcome};
pub use group_config::{
    BackoffPolicy, DEFAULT_DATA_TTL, DEFAULT_LOCK_TTL, DEFAULT_POLL_INTERVAL, DEFAULT_WAIT_TIME,
    GroupConfig, GroupConfigBuilder,
};
pub use group_service::{FlightOutcome, Group};
pub use result_poller::ResultPoller;
