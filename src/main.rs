use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::info;

use ferrite::dram::{ChannelConfig, EnergyConfig, TimingConfig};
use ferrite::sim::config::{Config, SimConfig};
use ferrite::sim::top::ChannelSim;
use ferrite::traffic::{TrafficConfig, TrafficGen};

#[derive(Parser)]
#[command(version, about)]
struct FerriteArgs {
    /// TOML config with [sim], [channel], [timing], [energy], [traffic]
    /// sections; defaults apply where absent.
    config_path: Option<PathBuf>,

    #[arg(long)]
    cycles: Option<u64>,
    #[arg(long)]
    epoch_period: Option<u64>,
    #[arg(long)]
    output_prefix: Option<String>,
}

pub fn main() {
    env_logger::init();
    let argv = FerriteArgs::parse();

    let root: toml::Value = match &argv.config_path {
        Some(path) => fs::read_to_string(path)
            .expect("cannot read config file")
            .parse()
            .expect("cannot parse config file"),
        None => toml::Value::Table(toml::value::Table::new()),
    };

    let mut sim = SimConfig::from_section(root.get("sim"));
    let mut channel = ChannelConfig::from_section(root.get("channel"));
    channel.timing = TimingConfig::from_section(root.get("timing"));
    channel.energy = EnergyConfig::from_section(root.get("energy"));
    let traffic = TrafficConfig::from_section(root.get("traffic"));

    sim.cycles = argv.cycles.unwrap_or(sim.cycles);
    sim.epoch_period = argv.epoch_period.unwrap_or(sim.epoch_period);
    if let Some(prefix) = argv.output_prefix {
        channel.output_prefix = prefix;
    }

    info!(
        "channel {}: {} ranks, {} bankgroups x {} banks, {}",
        sim.channel_id,
        channel.ranks,
        channel.bankgroups,
        channel.banks_per_group,
        if channel.dist_controller {
            "distributed front-end"
        } else {
            "centralized front-end"
        }
    );

    let mut top = ChannelSim::new(
        Arc::new(channel),
        &sim,
        TrafficGen::from_config(&traffic),
    );
    let summary = top.run(sim.cycles);
    info!(
        "{} cycles simulated, {} requests issued, {} returned",
        summary.cycles, summary.issued, summary.returned
    );
}
