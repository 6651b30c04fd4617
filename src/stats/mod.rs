pub mod primitives;

mod csv;
mod recompute;

#[cfg(test)]
mod tests;

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use log::warn;

use crate::dram::{ChannelConfig, Cycle};

use csv::CsvSink;
pub use primitives::{Accumulator, Computed, Counter, Histogram, Stat};

/// Stable handle into the registry arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatId(usize);

/// Per-channel statistics registry.
///
/// Owns every stat in a fixed arena; registration order is emission order,
/// with histograms registered last. Derived quantities are refreshed by
/// `recompute_epoch` before each CSV emission.
pub struct Statistics {
    config: Arc<ChannelConfig>,
    channel_id: usize,
    arena: Vec<Stat>,
    epoch_count: u64,
    last_clk: Cycle,
    epoch_csv: Option<CsvSink>,
    final_csv: Option<CsvSink>,

    pub(crate) num_reads_done: StatId,
    pub(crate) num_writes_done: StatId,
    pub(crate) num_write_buf_hits: StatId,
    pub(crate) num_dropped_coalesced_writes: StatId,
    pub(crate) hmc_reqs_done: StatId,
    pub(crate) num_row_hits: StatId,
    pub(crate) num_read_row_hits: StatId,
    pub(crate) num_write_row_hits: StatId,
    pub(crate) num_ondemand_pres: StatId,
    pub(crate) num_cycles: StatId,
    pub(crate) hbm_dual_cmds: StatId,
    pub(crate) num_read_cmds: StatId,
    pub(crate) num_write_cmds: StatId,
    pub(crate) num_act_cmds: StatId,
    pub(crate) num_pre_cmds: StatId,
    pub(crate) num_refresh_cmds: StatId,
    pub(crate) num_refb_cmds: StatId,
    pub(crate) num_sref_enter_cmds: StatId,
    pub(crate) num_sref_exit_cmds: StatId,
    pub(crate) num_wr_dependency: StatId,
    pub(crate) all_bank_idle_cycles: Vec<StatId>,
    pub(crate) rank_active_cycles: Vec<StatId>,
    pub(crate) sref_cycles: Vec<StatId>,

    pub(crate) act_energy: StatId,
    pub(crate) read_energy: StatId,
    pub(crate) write_energy: StatId,
    pub(crate) ref_energy: StatId,
    pub(crate) refb_energy: StatId,
    pub(crate) act_stb_energy: Vec<StatId>,
    pub(crate) pre_stb_energy: Vec<StatId>,
    pub(crate) pre_pd_energy: Vec<StatId>,
    pub(crate) sref_energy: Vec<StatId>,
    pub(crate) total_energy: StatId,
    pub(crate) queue_usage: StatId,
    pub(crate) average_power: StatId,
    pub(crate) average_bandwidth: StatId,
    pub(crate) average_latency: StatId,
    pub(crate) average_interarrival: StatId,

    pub(crate) access_latency: StatId,
    pub(crate) total_access_latency: StatId,
    pub(crate) interarrival_latency: StatId,
    pub(crate) stall_latency: StatId,
    pub(crate) read_stall_latency: StatId,
    pub(crate) write_stall_latency: StatId,
    pub(crate) command_queuing_latency: StatId,
    pub(crate) read_command_queuing_latency: StatId,
    pub(crate) write_command_queuing_latency: StatId,
    pub(crate) queuing_latency: StatId,
    pub(crate) read_queuing_latency: StatId,
    pub(crate) write_queuing_latency: StatId,
    pub(crate) write_latency: StatId,
    pub(crate) total_write_latency: StatId,
}

struct Registrar {
    arena: Vec<Stat>,
}

impl Registrar {
    fn counter(&mut self, name: &str, desc: &str) -> StatId {
        self.push(Stat::Counter(Counter::new(name, desc)))
    }

    fn counter_vec(&mut self, len: usize, name: &str, desc: &str) -> Vec<StatId> {
        (0..len)
            .map(|i| self.counter(&format!("{name}_{i}"), &format!("{desc} rank {i}")))
            .collect()
    }

    fn computed(&mut self, name: &str, desc: &str) -> StatId {
        self.push(Stat::Computed(Computed::new(name, desc)))
    }

    fn computed_vec(&mut self, len: usize, name: &str, desc: &str) -> Vec<StatId> {
        (0..len)
            .map(|i| self.computed(&format!("{name}_{i}"), &format!("{desc} rank {i}")))
            .collect()
    }

    fn histogram(&mut self, start: u64, end: u64, bins: usize, name: &str, desc: &str) -> StatId {
        self.push(Stat::Histogram(Histogram::new(start, end, bins, name, desc)))
    }

    fn push(&mut self, stat: Stat) -> StatId {
        let id = StatId(self.arena.len());
        self.arena.push(stat);
        id
    }
}

impl Statistics {
    pub fn new(config: Arc<ChannelConfig>, channel_id: usize) -> Self {
        let ranks = config.ranks;
        let mut reg = Registrar { arena: Vec::new() };

        let num_reads_done = reg.counter("num_reads_done", "Number of read requests done");
        let num_writes_done = reg.counter("num_writes_done", "Number of write requests done");
        let num_write_buf_hits = reg.counter("num_write_buf_hits", "Number of write buffer hits");
        let num_dropped_coalesced_writes = reg.counter(
            "num_dropped_coalesced_writes",
            "Writes coalesced into an in-flight write to the same address",
        );
        let hmc_reqs_done = reg.counter("hmc_reqs_done", "HMC requests finished");
        let num_row_hits = reg.counter("num_row_hits", "Number of row hits");
        let num_read_row_hits = reg.counter("num_read_row_hits", "Number of read row hits");
        let num_write_row_hits = reg.counter("num_write_row_hits", "Number of write row hits");
        let num_ondemand_pres =
            reg.counter("num_ondemand_pres", "Number of on-demand precharges issued");
        let num_cycles = reg.counter("num_cycles", "Total number of DRAM cycles");
        let hbm_dual_cmds = reg.counter(
            "hbm_dual_cmds",
            "Number of cycles in which two commands were issued",
        );
        let num_read_cmds = reg.counter("num_read_cmds", "Number of read commands issued");
        let num_write_cmds = reg.counter("num_write_cmds", "Number of write commands issued");
        let num_act_cmds = reg.counter("num_act_cmds", "Number of activate commands issued");
        let num_pre_cmds = reg.counter("num_pre_cmds", "Number of precharge commands issued");
        let num_refresh_cmds = reg.counter("num_refresh_cmds", "Number of refresh commands issued");
        let num_refb_cmds =
            reg.counter("num_refb_cmds", "Number of bank refresh commands issued");
        let num_sref_enter_cmds = reg.counter(
            "num_sref_enter_cmds",
            "Number of self-refresh enter commands issued",
        );
        let num_sref_exit_cmds = reg.counter(
            "num_sref_exit_cmds",
            "Number of self-refresh exit commands issued",
        );
        let num_wr_dependency = reg.counter(
            "num_wr_dependency",
            "Write drains aborted by a read to the same address",
        );
        let all_bank_idle_cycles =
            reg.counter_vec(ranks, "all_bank_idle_cycles", "Cycles with all banks idle");
        let rank_active_cycles =
            reg.counter_vec(ranks, "rank_active_cycles", "Cycles the rank remains active");
        let sref_cycles = reg.counter_vec(ranks, "sref_cycles", "Cycles in self-refresh");

        let act_energy = reg.computed("act_energy", "ACT energy");
        let read_energy = reg.computed("read_energy", "READ energy (not including IO)");
        let write_energy = reg.computed("write_energy", "WRITE energy (not including IO)");
        let ref_energy = reg.computed("ref_energy", "Refresh energy");
        let refb_energy = reg.computed("refb_energy", "Bank refresh energy");
        let act_stb_energy = reg.computed_vec(ranks, "act_stb_energy", "Active standby energy");
        let pre_stb_energy = reg.computed_vec(ranks, "pre_stb_energy", "Precharge standby energy");
        let pre_pd_energy = reg.computed_vec(ranks, "pre_pd_energy", "Precharge powerdown energy");
        let sref_energy = reg.computed_vec(ranks, "sref_energy", "Self-refresh energy");
        let total_energy = reg.computed("total_energy", "(pJ) Total energy consumed");
        let queue_usage = reg.computed("queue_usage", "Average command queue usage");
        let average_power = reg.computed("average_power", "(mW) Average power for all devices");
        let average_bandwidth =
            reg.computed("average_bandwidth", "(GB/s) Average aggregate bandwidth");
        let average_latency =
            reg.computed("average_latency", "Average access latency in DRAM cycles");
        let average_interarrival = reg.computed(
            "average_interarrival",
            "Average interarrival latency of requests",
        );

        let access_latency =
            reg.histogram(0, 200, 10, "access_latency", "Histogram of access latencies");
        let total_access_latency = reg.histogram(
            0,
            400,
            10,
            "total_access_latency",
            "Histogram of arrival-to-return latencies",
        );
        let interarrival_latency = reg.histogram(
            0,
            100,
            10,
            "interarrival_latency",
            "Histogram of request interarrival gaps",
        );
        let stall_latency = reg.histogram(
            0,
            200,
            10,
            "stall_latency",
            "Histogram of arrival-to-admission stalls",
        );
        let read_stall_latency = reg.histogram(
            0,
            200,
            10,
            "read_stall_latency",
            "Histogram of read arrival-to-admission stalls",
        );
        let write_stall_latency = reg.histogram(
            0,
            200,
            10,
            "write_stall_latency",
            "Histogram of write arrival-to-admission stalls",
        );
        let command_queuing_latency = reg.histogram(
            0,
            200,
            10,
            "command_queuing_latency",
            "Histogram of admission-to-schedule waits",
        );
        let read_command_queuing_latency = reg.histogram(
            0,
            200,
            10,
            "read_command_queuing_latency",
            "Histogram of read admission-to-schedule waits",
        );
        let write_command_queuing_latency = reg.histogram(
            0,
            200,
            10,
            "write_command_queuing_latency",
            "Histogram of write admission-to-schedule waits",
        );
        let queuing_latency = reg.histogram(
            0,
            200,
            10,
            "queuing_latency",
            "Histogram of schedule-to-issue waits",
        );
        let read_queuing_latency = reg.histogram(
            0,
            200,
            10,
            "read_queuing_latency",
            "Histogram of read schedule-to-issue waits",
        );
        let write_queuing_latency = reg.histogram(
            0,
            200,
            10,
            "write_queuing_latency",
            "Histogram of write schedule-to-issue waits",
        );
        let write_latency = reg.histogram(
            0,
            200,
            10,
            "write_latency",
            "Histogram of write admission-to-data latencies",
        );
        let total_write_latency = reg.histogram(
            0,
            200,
            10,
            "total_write_latency",
            "Histogram of write arrival-to-data latencies",
        );

        let (epoch_csv, final_csv) = Self::open_sinks(&config, channel_id);

        Self {
            config,
            channel_id,
            arena: reg.arena,
            epoch_count: 0,
            last_clk: 0,
            epoch_csv,
            final_csv,
            num_reads_done,
            num_writes_done,
            num_write_buf_hits,
            num_dropped_coalesced_writes,
            hmc_reqs_done,
            num_row_hits,
            num_read_row_hits,
            num_write_row_hits,
            num_ondemand_pres,
            num_cycles,
            hbm_dual_cmds,
            num_read_cmds,
            num_write_cmds,
            num_act_cmds,
            num_pre_cmds,
            num_refresh_cmds,
            num_refb_cmds,
            num_sref_enter_cmds,
            num_sref_exit_cmds,
            num_wr_dependency,
            all_bank_idle_cycles,
            rank_active_cycles,
            sref_cycles,
            act_energy,
            read_energy,
            write_energy,
            ref_energy,
            refb_energy,
            act_stb_energy,
            pre_stb_energy,
            pre_pd_energy,
            sref_energy,
            total_energy,
            queue_usage,
            average_power,
            average_bandwidth,
            average_latency,
            average_interarrival,
            access_latency,
            total_access_latency,
            interarrival_latency,
            stall_latency,
            read_stall_latency,
            write_stall_latency,
            command_queuing_latency,
            read_command_queuing_latency,
            write_command_queuing_latency,
            queuing_latency,
            read_queuing_latency,
            write_queuing_latency,
            write_latency,
            total_write_latency,
        }
    }

    fn open_sinks(
        config: &ChannelConfig,
        channel_id: usize,
    ) -> (Option<CsvSink>, Option<CsvSink>) {
        if config.output_prefix.is_empty() {
            return (None, None);
        }
        let open = |suffix: &str| {
            let path = format!("{}ch{}_{}.csv", config.output_prefix, channel_id, suffix);
            match CsvSink::create(Path::new(&path)) {
                Ok(sink) => Some(sink),
                Err(err) => {
                    warn!("cannot create stats file {path}: {err}");
                    None
                }
            }
        };
        (open("epoch"), open("final"))
    }

    pub fn inc(&mut self, id: StatId) {
        self.add(id, 1);
    }

    pub fn add(&mut self, id: StatId, n: u64) {
        match &mut self.arena[id.0] {
            Stat::Counter(c) => c.add(n),
            _ => panic!("stat {id:?} is not a counter"),
        }
    }

    pub fn observe(&mut self, id: StatId, value: u64) {
        match &mut self.arena[id.0] {
            Stat::Histogram(h) => h.observe(value),
            _ => panic!("stat {id:?} is not a histogram"),
        }
    }

    pub fn record(&mut self, id: StatId) {
        match &mut self.arena[id.0] {
            Stat::Accumulator(a) => a.record(),
            _ => panic!("stat {id:?} is not an accumulator"),
        }
    }

    pub(crate) fn set_computed(&mut self, id: StatId, epoch: f64, cumulative: f64) {
        match &mut self.arena[id.0] {
            Stat::Computed(c) => c.set(epoch, cumulative),
            _ => panic!("stat {id:?} is not a computed stat"),
        }
    }

    pub fn counter_value(&self, id: StatId) -> u64 {
        match &self.arena[id.0] {
            Stat::Counter(c) => c.value(),
            _ => panic!("stat {id:?} is not a counter"),
        }
    }

    pub(crate) fn counter_delta(&self, id: StatId) -> u64 {
        match &self.arena[id.0] {
            Stat::Counter(c) => c.epoch_delta(),
            _ => panic!("stat {id:?} is not a counter"),
        }
    }

    pub(crate) fn computed_values(&self, id: StatId) -> (f64, f64) {
        match &self.arena[id.0] {
            Stat::Computed(c) => c.values(),
            _ => panic!("stat {id:?} is not a computed stat"),
        }
    }

    pub(crate) fn histogram_ref(&self, id: StatId) -> &Histogram {
        match &self.arena[id.0] {
            Stat::Histogram(h) => h,
            _ => panic!("stat {id:?} is not a histogram"),
        }
    }

    pub fn epoch_count(&self) -> u64 {
        self.epoch_count
    }

    pub fn update_epoch(&mut self, clk: Cycle) {
        for stat in &mut self.arena {
            stat.update_epoch();
        }
        self.last_clk = clk;
    }

    /// Human-readable cumulative dump, one `name = value # description` line
    /// per stat (one per bucket for histograms).
    pub fn print(&self, w: &mut dyn Write) -> io::Result<()> {
        for stat in &self.arena {
            stat.print(w)?;
        }
        Ok(())
    }

    pub fn write_csv_header(&self, w: &mut dyn Write) -> io::Result<()> {
        write!(w, "epoch,channel")?;
        for stat in &self.arena {
            stat.csv_header(w)?;
        }
        writeln!(w)
    }

    pub fn write_csv_row(&self, w: &mut dyn Write) -> io::Result<()> {
        write!(w, "{},{}", self.epoch_count, self.channel_id)?;
        for stat in &self.arena {
            stat.csv_entry(w)?;
        }
        writeln!(w)
    }

    pub fn write_epoch_csv_row(&self, w: &mut dyn Write) -> io::Result<()> {
        write!(w, "{},{}", self.epoch_count, self.channel_id)?;
        for stat in &self.arena {
            stat.csv_epoch_entry(w)?;
        }
        writeln!(w)
    }

    /// Epoch boundary: refresh derived values, emit the epoch-delta CSV row,
    /// then snapshot for the next epoch.
    pub fn print_epoch_stats(&mut self, clk: Cycle, queue_usage: usize) {
        self.recompute_epoch(clk, queue_usage);
        let mut sink = self.epoch_csv.take();
        if let Some(sink) = sink.as_mut() {
            sink.write_row(|w| self.write_csv_header(w), |w| self.write_epoch_csv_row(w));
        }
        self.epoch_csv = sink;
        self.update_epoch(clk);
        self.epoch_count += 1;
    }

    /// End of run: refresh derived values, emit the cumulative CSV row, and
    /// dump the human-readable summary.
    pub fn print_final_stats(&mut self, clk: Cycle, queue_usage: usize) {
        self.recompute_epoch(clk, queue_usage);
        let mut sink = self.final_csv.take();
        if let Some(sink) = sink.as_mut() {
            sink.write_row(|w| self.write_csv_header(w), |w| self.write_csv_row(w));
        }
        self.final_csv = sink;
        let stdout = io::stdout();
        let mut out = stdout.lock();
        let _ = self.print(&mut out);
    }
}
