//! dsf demo runtime: staggered workers racing to run one job.

#![forbid(unsafe_code)]

use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dsf_application::{BackoffPolicy, FlightStore, Group, GroupConfig};
use dsf_core::{DsfError, DsfResult};
use dsf_domain::Namespace;
use dsf_infrastructure::{InMemoryFlightStore, RedisFlightStore};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const WORKER_STAGGER: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
struct DemoConfig {
    redis_url: Option<String>,
    namespace: Namespace,
    workers: usize,
    job_key: String,
    job_duration: Duration,
    lock_ttl: Duration,
    data_ttl: Duration,
    wait_time: Duration,
    poll_interval: Duration,
    keep_lock: bool,
}

#[derive(Debug, Serialize)]
struct JobReport {
    foo: &'static str,
    bar: f64,
}

#[tokio::main]
async fn main() -> Result<(), DsfError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = DemoConfig::load()?;
    let memory_store: Arc<dyn FlightStore> = Arc::new(InMemoryFlightStore::new());
    let store_kind = if config.redis_url.is_some() {
        "redis"
    } else {
        "memory"
    };

    info!(
        store = store_kind,
        namespace = %config.namespace,
        workers = config.workers,
        job_key = %config.job_key,
        lock_ttl_ms = config.lock_ttl.as_millis(),
        data_ttl_ms = config.data_ttl.as_millis(),
        wait_ms = config.wait_time.as_millis(),
        "dsf-demo started"
    );

    if config.lock_ttl <= config.job_duration {
        warn!(
            lock_ttl_ms = config.lock_ttl.as_millis(),
            job_ms = config.job_duration.as_millis(),
            "lock ttl does not cover the job, a second leader may run it"
        );
    }

    let mut workers = JoinSet::new();
    for worker_id in 0..config.workers {
        if worker_id > 0 {
            tokio::time::sleep(WORKER_STAGGER).await;
        }

        // Each worker dials its own connection, as separate processes would.
        let store: Arc<dyn FlightStore> = match config.redis_url.as_deref() {
            Some(redis_url) => Arc::new(RedisFlightStore::connect(redis_url).await?),
            None => memory_store.clone(),
        };
        let group = Group::new(config.group_config(store)?);
        let job_key = config.job_key.clone();
        let job_duration = config.job_duration;

        workers.spawn(run_worker(worker_id, group, job_key, job_duration));
    }

    while let Some(joined) = workers.join_next().await {
        joined.map_err(|error| {
            DsfError::Cancelled(format!("worker task did not complete: {error}"))
        })??;
    }

    Ok(())
}

async fn run_worker(
    worker_id: usize,
    group: Group,
    job_key: String,
    job_duration: Duration,
) -> DsfResult<()> {
    let started = Instant::now();

    let outcome = group
        .run(job_key.as_str(), move || async move {
            info!(worker_id, "job invoked");
            tokio::time::sleep(job_duration).await;

            let report = JobReport {
                foo: "fly!",
                bar: std::f64::consts::PI,
            };
            let payload = serde_json::to_vec(&report).unwrap_or_else(|error| {
                error!(worker_id, error = %error, "failed to encode job report");
                Vec::new()
            });
            info!(worker_id, "job returned");
            payload
        })
        .await?;

    info!(
        worker_id,
        shared = outcome.shared,
        result = %String::from_utf8_lossy(&outcome.payload),
        elapsed_ms = started.elapsed().as_millis(),
        "worker got result"
    );

    Ok(())
}

impl DemoConfig {
    fn load() -> DsfResult<Self> {
        let redis_url = env::var("REDIS_URL")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());
        let namespace = match env::var("DSF_NAMESPACE") {
            Ok(value) => Namespace::new(value)?,
            Err(_) => Namespace::default(),
        };
        let workers = parse_env_usize("DSF_WORKERS", 16)?;
        let job_key = env::var("DSF_JOB_KEY").unwrap_or_else(|_| "foobar".to_owned());
        let job_duration = Duration::from_millis(parse_env_u64("DSF_JOB_MS", 2_000)?);
        let lock_ttl = Duration::from_millis(parse_env_u64("DSF_LOCK_TTL_MS", 5_000)?);
        let data_ttl = Duration::from_millis(parse_env_u64("DSF_DATA_TTL_MS", 10_000)?);
        let wait_time = Duration::from_millis(parse_env_u64("DSF_WAIT_MS", 10_000)?);
        let poll_interval = Duration::from_millis(parse_env_u64("DSF_INTERVAL_MS", 0)?);
        let keep_lock = parse_env_bool("DSF_KEEP_LOCK", false)?;

        if workers == 0 {
            return Err(DsfError::Validation(
                "DSF_WORKERS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            redis_url,
            namespace,
            workers,
            job_key,
            job_duration,
            lock_ttl,
            data_ttl,
            wait_time,
            poll_interval,
            keep_lock,
        })
    }

    fn group_config(&self, store: Arc<dyn FlightStore>) -> DsfResult<GroupConfig> {
        GroupConfig::builder()
            .store(store)
            .namespace(self.namespace.clone())
            .lock_ttl(self.lock_ttl)
            .data_ttl(self.data_ttl)
            .keep_lock(self.keep_lock)
            .wait_time(self.wait_time)
            .backoff(BackoffPolicy::constant(self.poll_interval))
            .build()
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_env_usize(name: &str, default: usize) -> DsfResult<usize> {
    match env::var(name) {
        Ok(value) => value.parse::<usize>().map_err(|error| {
            DsfError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_u64(name: &str, default: u64) -> DsfResult<u64> {
    match env::var(name) {
        Ok(value) => value.parse::<u64>().map_err(|error| {
            DsfError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> DsfResult<bool> {
    match env::var(name) {
        Ok(value) => value.parse::<bool>().map_err(|error| {
            DsfError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}
