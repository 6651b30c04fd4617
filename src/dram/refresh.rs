use super::address::Address;
use super::command::{Command, CommandType};
use super::config::{ChannelConfig, RefreshPolicy};
use super::state::ChannelState;
use super::Cycle;

/// Raises refresh obligations on a staggered cadence, rank by rank or bank
/// by bank depending on the configured policy, so refresh targets do not
/// all drain in the same cycle.
pub struct RefreshTimer {
    interval: Cycle,
    policy: RefreshPolicy,
    banks_per_group: usize,
    banks_per_channel: usize,
    next_due: Vec<Cycle>,
}

impl RefreshTimer {
    pub fn new(config: &ChannelConfig) -> Self {
        let interval = config.refresh_interval;
        let slots = match config.refresh_policy {
            RefreshPolicy::RankLevelStaggered => config.ranks,
            RefreshPolicy::BankLevelStaggered => config.ranks * config.banks_per_channel(),
        };
        let stagger = if slots > 0 {
            interval / slots as Cycle
        } else {
            0
        };
        Self {
            interval,
            policy: config.refresh_policy,
            banks_per_group: config.banks_per_group,
            banks_per_channel: config.banks_per_channel(),
            next_due: (0..slots)
                .map(|slot| interval + slot as Cycle * stagger)
                .collect(),
        }
    }

    pub fn tick<S: ChannelState>(&mut self, clk: Cycle, channel: &mut S) {
        if self.interval == 0 {
            return;
        }
        for slot in 0..self.next_due.len() {
            if clk >= self.next_due[slot] {
                channel.request_refresh(self.refresh_command(slot));
                self.next_due[slot] += self.interval;
            }
        }
    }

    fn refresh_command(&self, slot: usize) -> Command {
        match self.policy {
            RefreshPolicy::RankLevelStaggered => Command::rank_level(CommandType::Refresh, slot),
            RefreshPolicy::BankLevelStaggered => {
                let rank = slot / self.banks_per_channel;
                let flat = slot % self.banks_per_channel;
                let mut addr = Address::rank_only(rank);
                addr.bankgroup = flat / self.banks_per_group;
                addr.bank = flat % self.banks_per_group;
                Command::new(CommandType::RefreshBank, addr, 0)
            }
        }
    }
}
