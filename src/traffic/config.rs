use serde::Deserialize;

use crate::sim::config::Config;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TrafficConfig {
    /// "stream" walks the footprint with a fixed stride, "random" hashes
    /// request indices into it.
    pub pattern: String,
    pub num_requests: u64,
    /// Share of writes, in percent.
    pub write_percent: u32,
    pub stride_bytes: u64,
    pub footprint_bytes: u64,
    pub base_addr: u64,
    pub seed: u64,
    /// Offer one request every N cycles.
    pub issue_period: u64,
}

impl Config for TrafficConfig {}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            pattern: "stream".to_string(),
            num_requests: 10_000,
            write_percent: 30,
            stride_bytes: 64,
            footprint_bytes: 64 << 20,
            base_addr: 0,
            seed: 0xCAFE,
            issue_period: 1,
        }
    }
}
