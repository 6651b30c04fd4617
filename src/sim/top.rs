use std::sync::Arc;

use log::{debug, info};

use crate::ctrl::ChannelController;
use crate::dram::{BankCommandQueue, ChannelConfig, Cycle, ProtocolState, Transaction};
use crate::traffic::TrafficGen;

use super::config::SimConfig;

#[derive(Debug, Default, Clone, Copy)]
pub struct SimSummary {
    pub cycles: Cycle,
    pub issued: u64,
    pub returned: u64,
}

/// One channel driven end to end: traffic in, completions out, epoch stats
/// on the configured period.
pub struct ChannelSim {
    controller: ChannelController<ProtocolState, BankCommandQueue>,
    traffic: TrafficGen,
    epoch_period: Cycle,
    dist_mode: bool,
    requesters: usize,
    next_requester: usize,
    pending: Option<(u64, bool)>,
    issued: u64,
    returned: u64,
}

impl ChannelSim {
    pub fn new(config: Arc<ChannelConfig>, sim: &SimConfig, traffic: TrafficGen) -> Self {
        let channel = ProtocolState::new(&config);
        let cmd_queue = BankCommandQueue::new(&config);
        let dist_mode = config.dist_controller;
        let requesters = config.requesters_per_channel;
        Self {
            controller: ChannelController::new(sim.channel_id, config, channel, cmd_queue),
            traffic,
            epoch_period: sim.epoch_period,
            dist_mode,
            requesters,
            next_requester: 0,
            pending: None,
            issued: 0,
            returned: 0,
        }
    }

    pub fn run(&mut self, cycles: Cycle) -> SimSummary {
        for clk in 0..cycles {
            self.offer(clk);
            self.controller.clock_tick();
            while let Some((addr, is_write)) = self.controller.pop_completed(clk) {
                self.returned += 1;
                debug!("completed {:#x} ({})", addr, if is_write { "w" } else { "r" });
            }
            if self.epoch_period > 0 && clk > 0 && clk % self.epoch_period == 0 {
                self.controller.print_epoch_stats();
            }
        }
        self.controller.print_final_stats();
        info!(
            "run finished: {} issued, {} returned over {} cycles",
            self.issued, self.returned, cycles
        );
        SimSummary {
            cycles,
            issued: self.issued,
            returned: self.returned,
        }
    }

    /// Offer at most one generated request per cycle, holding it across
    /// cycles while the controller backpressures.
    fn offer(&mut self, clk: Cycle) {
        if self.pending.is_none() {
            self.pending = self.traffic.next(clk);
        }
        let (addr, is_write) = match self.pending {
            Some(request) => request,
            None => return,
        };
        if self.dist_mode {
            let requester = self.next_requester;
            if self.controller.will_accept_from(addr, requester, is_write) {
                let trans = Transaction::new(addr, is_write, clk).from_requester(requester);
                self.controller.add_transaction(trans);
                self.next_requester = (requester + 1) % self.requesters.max(1);
                self.issued += 1;
                self.pending = None;
            }
        } else if self.controller.will_accept(addr, is_write) {
            self.controller
                .add_transaction(Transaction::new(addr, is_write, clk));
            self.issued += 1;
            self.pending = None;
        }
    }

    pub fn controller(&self) -> &ChannelController<ProtocolState, BankCommandQueue> {
        &self.controller
    }
}
