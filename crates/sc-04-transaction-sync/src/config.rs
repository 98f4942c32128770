//! Configuration for the sync pipelines

use sc_03_distributed_lock::LockConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::domain::{ConfigError, SyncAction, SyncConfig};

/// Records fetched per pass, per track.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSizes {
    pub broadcast: usize,
    pub sync: usize,
    pub p2p: usize,
}

impl Default for PageSizes {
    fn default() -> Self {
        Self {
            broadcast: 25,
            sync: 25,
            p2p: 25,
        }
    }
}

impl PageSizes {
    pub fn for_action(&self, action: SyncAction) -> usize {
        match action {
            SyncAction::Broadcast => self.broadcast,
            SyncAction::Sync => self.sync,
            SyncAction::P2p => self.p2p,
        }
    }
}

/// Bounds on every blocking call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    pub broadcast: Duration,
    pub query: Duration,
    pub paymail: Duration,
    /// Store and repository calls
    pub store: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            broadcast: Duration::from_secs(25),
            query: Duration::from_secs(10),
            paymail: Duration::from_secs(30),
            store: Duration::from_secs(10),
        }
    }
}

/// Period of each background task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPeriods {
    pub broadcast: Duration,
    pub sync: Duration,
    pub p2p: Duration,
}

impl Default for TaskPeriods {
    fn default() -> Self {
        Self {
            broadcast: Duration::from_secs(30),
            sync: Duration::from_secs(120),
            p2p: Duration::from_secs(60),
        }
    }
}

impl TaskPeriods {
    pub fn for_action(&self, action: SyncAction) -> Duration {
        match action {
            SyncAction::Broadcast => self.broadcast,
            SyncAction::Sync => self.sync,
            SyncAction::P2p => self.p2p,
        }
    }
}

/// Runtime configuration for the sync engine
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub page_sizes: PageSizes,

    pub timeouts: Timeouts,

    /// Lock TTL and acquisition policy
    pub lock: LockConfig,

    /// Wait after broadcasting an incoming transaction before follow-on work
    pub propagation_delay: Duration,

    /// Broadcast groups run concurrently up to `multiplier * CPUs`
    pub concurrency_multiplier: usize,

    /// Explicit cap on concurrent broadcast groups, overrides the multiplier
    pub max_concurrent_groups: Option<usize>,

    pub task_periods: TaskPeriods,

    /// Sender paymail put in P2P metadata
    pub default_from_paymail: String,

    /// Note put in P2P metadata
    pub default_note: String,

    /// Configuration used when the caller does not supply one
    pub default_sync_config: SyncConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_sizes: PageSizes::default(),
            timeouts: Timeouts::default(),
            lock: LockConfig::try_once(Duration::from_secs(60)),
            propagation_delay: Duration::from_secs(3),
            concurrency_multiplier: 2,
            max_concurrent_groups: None,
            task_periods: TaskPeriods::default(),
            default_from_paymail: "anonymous@settlement.local".to_string(),
            default_note: String::new(),
            default_sync_config: SyncConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Create configuration from environment variables, starting from defaults.
    ///
    /// # Environment Variables
    ///
    /// - `SC_BROADCAST_PAGE_SIZE`, `SC_SYNC_PAGE_SIZE`, `SC_P2P_PAGE_SIZE`
    /// - `SC_BROADCAST_TIMEOUT_SECS`, `SC_QUERY_TIMEOUT_SECS`,
    ///   `SC_PAYMAIL_TIMEOUT_SECS`, `SC_STORE_TIMEOUT_SECS`
    /// - `SC_LOCK_TTL_SECS`, `SC_LOCK_ACQUIRE_TIMEOUT_MS`
    /// - `SC_PROPAGATION_DELAY_MS`
    /// - `SC_CONCURRENCY_MULTIPLIER`, `SC_MAX_CONCURRENT_GROUPS`
    /// - `SC_BROADCAST_PERIOD_SECS`, `SC_SYNC_PERIOD_SECS`, `SC_P2P_PERIOD_SECS`
    /// - `SC_FROM_PAYMAIL`, `SC_P2P_NOTE`
    /// - `SC_SYNC_BROADCAST`, `SC_SYNC_BROADCAST_INSTANT`, `SC_SYNC_PAYMAIL_P2P`,
    ///   `SC_SYNC_ON_CHAIN` (`true`/`false`)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = read_number("SC_BROADCAST_PAGE_SIZE")? {
            config.page_sizes.broadcast = v as usize;
        }
        if let Some(v) = read_number("SC_SYNC_PAGE_SIZE")? {
            config.page_sizes.sync = v as usize;
        }
        if let Some(v) = read_number("SC_P2P_PAGE_SIZE")? {
            config.page_sizes.p2p = v as usize;
        }

        if let Some(v) = read_number("SC_BROADCAST_TIMEOUT_SECS")? {
            config.timeouts.broadcast = Duration::from_secs(v);
        }
        if let Some(v) = read_number("SC_QUERY_TIMEOUT_SECS")? {
            config.timeouts.query = Duration::from_secs(v);
        }
        if let Some(v) = read_number("SC_PAYMAIL_TIMEOUT_SECS")? {
            config.timeouts.paymail = Duration::from_secs(v);
        }
        if let Some(v) = read_number("SC_STORE_TIMEOUT_SECS")? {
            config.timeouts.store = Duration::from_secs(v);
        }

        if let Some(v) = read_number("SC_LOCK_TTL_SECS")? {
            config.lock.ttl = Duration::from_secs(v);
        }
        if let Some(v) = read_number("SC_LOCK_ACQUIRE_TIMEOUT_MS")? {
            config.lock.acquire_timeout = Duration::from_millis(v);
        }

        if let Some(v) = read_number("SC_PROPAGATION_DELAY_MS")? {
            config.propagation_delay = Duration::from_millis(v);
        }
        if let Some(v) = read_number("SC_CONCURRENCY_MULTIPLIER")? {
            config.concurrency_multiplier = v as usize;
        }
        if let Some(v) = read_number("SC_MAX_CONCURRENT_GROUPS")? {
            config.max_concurrent_groups = Some(v as usize);
        }

        if let Some(v) = read_number("SC_BROADCAST_PERIOD_SECS")? {
            config.task_periods.broadcast = Duration::from_secs(v);
        }
        if let Some(v) = read_number("SC_SYNC_PERIOD_SECS")? {
            config.task_periods.sync = Duration::from_secs(v);
        }
        if let Some(v) = read_number("SC_P2P_PERIOD_SECS")? {
            config.task_periods.p2p = Duration::from_secs(v);
        }

        if let Ok(v) = env::var("SC_FROM_PAYMAIL") {
            config.default_from_paymail = v;
        }
        if let Ok(v) = env::var("SC_P2P_NOTE") {
            config.default_note = v;
        }

        let sync = &mut config.default_sync_config;
        if let Some(v) = read_bool("SC_SYNC_BROADCAST")? {
            sync.broadcast = v;
        }
        if let Some(v) = read_bool("SC_SYNC_BROADCAST_INSTANT")? {
            sync.broadcast_instant = v;
        }
        if let Some(v) = read_bool("SC_SYNC_PAYMAIL_P2P")? {
            sync.paymail_p2p = v;
        }
        if let Some(v) = read_bool("SC_SYNC_ON_CHAIN")? {
            sync.sync_on_chain = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would stall or disable a pipeline.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for action in SyncAction::ALL {
            if self.page_sizes.for_action(action) == 0 {
                return Err(ConfigError::Invalid(format!(
                    "{action} page size must be positive"
                )));
            }
            if self.task_periods.for_action(action).is_zero() {
                return Err(ConfigError::Invalid(format!(
                    "{action} task period must be positive"
                )));
            }
        }
        let t = &self.timeouts;
        if [t.broadcast, t.query, t.paymail, t.store]
            .iter()
            .any(Duration::is_zero)
        {
            return Err(ConfigError::Invalid("timeouts must be positive".to_string()));
        }
        if self.lock.ttl.is_zero() {
            return Err(ConfigError::Invalid("lock ttl must be positive".to_string()));
        }
        if self.concurrency_multiplier == 0 || self.max_concurrent_groups == Some(0) {
            return Err(ConfigError::Invalid(
                "broadcast concurrency must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Concurrent broadcast groups allowed on this machine.
    pub fn max_concurrent_groups(&self) -> usize {
        self.max_concurrent_groups
            .unwrap_or_else(|| num_cpus::get().saturating_mul(self.concurrency_multiplier))
            .max(1)
    }
}

fn read_number(key: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        Err(_) => Ok(None),
    }
}

fn read_bool(key: &'static str) -> Result<Option<bool>, ConfigError> {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Some(true)),
            "false" | "0" | "no" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue { key, value: raw }),
        },
        Err(_) => Ok(None),
    }
}
