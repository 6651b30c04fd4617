use serde::Deserialize;

use crate::sim::config::Config;

use super::Cycle;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowBufPolicy {
    OpenPage,
    ClosePage,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefreshPolicy {
    RankLevelStaggered,
    BankLevelStaggered,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Ddr4,
    Lpddr4,
    Hbm2,
    Hmc,
}

impl Protocol {
    pub fn is_hmc(self) -> bool {
        matches!(self, Self::Hmc)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChannelConfig {
    pub ranks: usize,
    pub bankgroups: usize,
    pub banks_per_group: usize,
    pub rows: usize,
    pub columns: usize,
    pub trans_queue_size: usize,
    pub cmd_queue_size: usize,
    pub dist_trans_queue_size: usize,
    pub requesters_per_channel: usize,
    pub unified_queue: bool,
    pub dist_controller: bool,
    pub enable_hbm_dual_cmd: bool,
    pub enable_self_refresh: bool,
    pub sref_threshold: Cycle,
    pub row_buf_policy: RowBufPolicy,
    pub link_latency: Cycle,
    pub read_delay: Cycle,
    pub write_delay: Cycle,
    /// DRAM clock period in nanoseconds.
    pub tck: f64,
    pub request_size_bytes: u64,
    pub protocol: Protocol,
    /// Refresh cadence per rank (or per bank under bank-level refresh) in
    /// cycles; 0 disables refresh.
    pub refresh_interval: Cycle,
    pub refresh_policy: RefreshPolicy,
    pub output_prefix: String,
    pub timing: TimingConfig,
    pub energy: EnergyConfig,
}

impl Config for ChannelConfig {}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            ranks: 2,
            bankgroups: 4,
            banks_per_group: 4,
            rows: 1 << 15,
            columns: 1 << 10,
            trans_queue_size: 32,
            cmd_queue_size: 8,
            dist_trans_queue_size: 16,
            requesters_per_channel: 4,
            unified_queue: false,
            dist_controller: false,
            enable_hbm_dual_cmd: false,
            enable_self_refresh: false,
            sref_threshold: 1000,
            row_buf_policy: RowBufPolicy::OpenPage,
            link_latency: 10,
            read_delay: 20,
            write_delay: 20,
            tck: 1.25,
            request_size_bytes: 64,
            protocol: Protocol::Ddr4,
            refresh_interval: 6240,
            refresh_policy: RefreshPolicy::RankLevelStaggered,
            output_prefix: String::new(),
            timing: TimingConfig::default(),
            energy: EnergyConfig::default(),
        }
    }
}

impl ChannelConfig {
    pub fn banks_per_channel(&self) -> usize {
        self.bankgroups * self.banks_per_group
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct TimingConfig {
    /// Activate to first column access.
    pub act_to_rw: Cycle,
    /// Gap between consecutive column accesses to one bank.
    pub rw_gap: Cycle,
    /// Precharge to the next activate.
    pub pre_to_act: Cycle,
    /// Bank-unavailable window after a refresh.
    pub refresh_cycle: Cycle,
    pub sref_exit_latency: Cycle,
}

impl Config for TimingConfig {}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            act_to_rw: 14,
            rw_gap: 4,
            pre_to_act: 14,
            refresh_cycle: 280,
            sref_exit_latency: 144,
        }
    }
}

/// Per-event energy increments in pJ, applied to epoch deltas of the raw
/// counters when derived stats are recomputed.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct EnergyConfig {
    pub act_energy_inc: f64,
    pub read_energy_inc: f64,
    pub write_energy_inc: f64,
    pub ref_energy_inc: f64,
    pub refb_energy_inc: f64,
    pub act_stb_energy_inc: f64,
    pub pre_stb_energy_inc: f64,
    pub pre_pd_energy_inc: f64,
    pub sref_energy_inc: f64,
}

impl Config for EnergyConfig {}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            act_energy_inc: 2771.0,
            read_energy_inc: 2086.0,
            write_energy_inc: 2170.0,
            ref_energy_inc: 43690.0,
            refb_energy_inc: 2730.0,
            act_stb_energy_inc: 75.0,
            pre_stb_energy_inc: 62.0,
            pre_pd_energy_inc: 37.0,
            sref_energy_inc: 25.0,
        }
    }
}
