use crate::dram::Cycle;

use super::{StatId, Statistics};

impl Statistics {
    /// Recompute every derived stat from the raw counters and the
    /// configuration-supplied per-event energy increments. Called before any
    /// epoch or final emission; epoch readings cover `last_clk..clk`.
    pub fn recompute_epoch(&mut self, clk: Cycle, queue_usage_now: usize) {
        let energy = self.config.energy;
        let ranks = self.config.ranks;
        let tck = self.config.tck;
        let request_bytes = self.config.request_size_bytes as f64;

        let reads = self.counter_value(self.num_reads_done);
        let reads_delta = self.counter_delta(self.num_reads_done);
        let writes = self.counter_value(self.num_writes_done);
        let writes_delta = self.counter_delta(self.num_writes_done);
        let (reqs_epoch, reqs_total) = if self.config.protocol.is_hmc() {
            (
                self.counter_delta(self.hmc_reqs_done),
                self.counter_value(self.hmc_reqs_done),
            )
        } else {
            (reads_delta + writes_delta, reads + writes)
        };

        let mut epoch_total = 0.0;
        let mut cumulative_total = 0.0;
        let mut tally = |pair: (f64, f64)| {
            epoch_total += pair.0;
            cumulative_total += pair.1;
        };

        tally(self.set_event_energy(self.act_energy, self.num_act_cmds, energy.act_energy_inc));
        tally(self.set_event_energy(self.read_energy, self.num_read_cmds, energy.read_energy_inc));
        tally(self.set_event_energy(
            self.write_energy,
            self.num_write_cmds,
            energy.write_energy_inc,
        ));
        tally(self.set_event_energy(self.ref_energy, self.num_refresh_cmds, energy.ref_energy_inc));
        tally(self.set_event_energy(self.refb_energy, self.num_refb_cmds, energy.refb_energy_inc));

        for r in 0..ranks {
            tally(self.set_event_energy(
                self.act_stb_energy[r],
                self.rank_active_cycles[r],
                energy.act_stb_energy_inc,
            ));
            tally(self.set_event_energy(
                self.pre_stb_energy[r],
                self.all_bank_idle_cycles[r],
                energy.pre_stb_energy_inc,
            ));
            tally(self.set_event_energy(
                self.sref_energy[r],
                self.sref_cycles[r],
                energy.sref_energy_inc,
            ));
            // powerdown is not modelled by the controller; the component
            // stays registered at zero and participates in the sum
            tally(self.computed_values(self.pre_pd_energy[r]));
        }

        self.set_computed(self.total_energy, epoch_total, cumulative_total);

        let epoch_cycles = (clk - self.last_clk).max(1) as f64;
        let total_cycles = clk.max(1) as f64;
        self.set_computed(
            self.average_power,
            epoch_total / epoch_cycles,
            cumulative_total / total_cycles,
        );
        self.set_computed(
            self.average_bandwidth,
            reqs_epoch as f64 * request_bytes / (epoch_cycles * tck),
            reqs_total as f64 * request_bytes / (total_cycles * tck),
        );

        // clk-weighted running average; the previous epoch reading is the
        // sample taken at last_clk
        let (prev_usage, _) = self.computed_values(self.queue_usage);
        let usage_cumulative =
            (prev_usage * self.last_clk as f64 + queue_usage_now as f64) / total_cycles;
        self.set_computed(self.queue_usage, queue_usage_now as f64, usage_cumulative);

        let (latency_epoch, latency_total) = {
            let h = self.histogram_ref(self.access_latency);
            (h.epoch_average(), h.average())
        };
        self.set_computed(self.average_latency, latency_epoch, latency_total);

        let (inter_epoch, inter_total) = {
            let h = self.histogram_ref(self.interarrival_latency);
            (h.epoch_average(), h.average())
        };
        self.set_computed(self.average_interarrival, inter_epoch, inter_total);
    }

    /// Epoch and cumulative energy for one event counter, written to the
    /// computed stat and returned for the total.
    fn set_event_energy(&mut self, id: StatId, counter: StatId, inc: f64) -> (f64, f64) {
        let epoch = self.counter_delta(counter) as f64 * inc;
        let cumulative = self.counter_value(counter) as f64 * inc;
        self.set_computed(id, epoch, cumulative);
        (epoch, cumulative)
    }
}
