use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub sources_path: PathBuf,
    pub output_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub max_concurrent_sources: usize,
    pub politeness_delay_ms: u64,
    pub render_settle_ms: u64,
    pub browser_pool_size: usize,
    pub max_retries: u32,
    pub retry_backoff_base_secs: u64,
    /// Overall wall-clock budget for one run. `None` means unbounded.
    pub run_deadline_secs: Option<u64>,
    /// How many errors per source the run summary prints.
    pub max_reported_errors: usize,
}
