use std::sync::Arc;

use crate::dram::{ChannelConfig, Protocol};

use super::primitives::{Accumulator, Counter, Histogram};
use super::Statistics;

fn stats_with(ranks: usize) -> Statistics {
    let mut config = ChannelConfig::default();
    config.ranks = ranks;
    Statistics::new(Arc::new(config), 0)
}

fn column(header: &str, row: &str, name: &str) -> f64 {
    let names: Vec<&str> = header.trim_end().split(',').collect();
    let values: Vec<&str> = row.trim_end().split(',').collect();
    let idx = names
        .iter()
        .position(|n| *n == name)
        .unwrap_or_else(|| panic!("column {name} not in header"));
    values[idx].parse().expect("numeric csv cell")
}

#[test]
fn counter_tracks_epoch_deltas() {
    let mut counter = Counter::new("events", "test counter");
    counter.inc();
    counter.add(4);
    assert_eq!(counter.value(), 5);
    assert_eq!(counter.epoch_delta(), 5);

    counter.update_epoch();
    assert_eq!(counter.epoch_delta(), 0);
    counter.inc();
    assert_eq!(counter.value(), 6);
    assert_eq!(counter.epoch_delta(), 1);
}

#[test]
fn accumulator_applies_its_fixed_increment() {
    let mut acc = Accumulator::new(2.5, "energy", "test accumulator");
    acc.record();
    acc.record();
    assert_eq!(acc.value(), 5.0);
    assert_eq!(acc.epoch_delta(), 5.0);

    acc.update_epoch();
    acc.record();
    assert_eq!(acc.value(), 7.5);
    assert_eq!(acc.epoch_delta(), 2.5);
}

#[test]
fn histogram_average_matches_the_exact_bins() {
    let mut hist = Histogram::new(10, 50, 6, "lat", "test histogram");
    for value in [5u64, 100, 12, 12, 30] {
        hist.observe(value);
    }
    assert_eq!(hist.count(), 5);
    let expected = (5 + 100 + 12 + 12 + 30) as f64 / 5.0;
    assert!((hist.average() - expected).abs() < 1e-12);
}

#[test]
fn histogram_epoch_average_covers_only_new_values() {
    let mut hist = Histogram::new(0, 100, 10, "lat", "test histogram");
    hist.observe(10);
    hist.observe(20);
    hist.update_epoch();
    hist.observe(40);

    assert!((hist.epoch_average() - 40.0).abs() < 1e-12);
    let expected = (10 + 20 + 40) as f64 / 3.0;
    assert!((hist.average() - expected).abs() < 1e-12);
}

#[test]
fn empty_histogram_averages_to_zero() {
    let hist = Histogram::new(0, 100, 10, "lat", "test histogram");
    assert_eq!(hist.average(), 0.0);
    assert_eq!(hist.epoch_average(), 0.0);
}

#[test]
fn csv_header_names_every_bucket() {
    let stats = stats_with(1);
    let mut header = Vec::new();
    stats.write_csv_header(&mut header).expect("header renders");
    let header = String::from_utf8(header).expect("utf8");

    assert!(header.starts_with("epoch,channel,"));
    assert!(header.contains(",access_latency[-0]"));
    assert!(header.contains(",access_latency[0-19]"));
    assert!(header.contains(",access_latency[200-]"));
    assert!(header.contains(",interarrival_latency[70-79]"));
    assert!(header.contains(",num_dropped_coalesced_writes"));
    assert!(header.contains(",sref_cycles_0"));
    assert!(header.contains(",total_energy"));
}

#[test]
fn epoch_deltas_reconcile_with_cumulative_rows() {
    let mut stats = stats_with(1);
    stats.add(stats.num_reads_done, 3);
    stats.add(stats.num_cycles, 100);
    stats.observe(stats.access_latency, 42);
    stats.recompute_epoch(100, 0);

    let mut header = Vec::new();
    stats.write_csv_header(&mut header).expect("header renders");
    let header = String::from_utf8(header).expect("utf8");
    let mut row1 = Vec::new();
    stats.write_csv_row(&mut row1).expect("row renders");
    let row1 = String::from_utf8(row1).expect("utf8");

    stats.update_epoch(100);
    stats.add(stats.num_reads_done, 7);
    stats.add(stats.num_cycles, 100);
    stats.recompute_epoch(200, 0);

    let mut row2 = Vec::new();
    stats.write_csv_row(&mut row2).expect("row renders");
    let row2 = String::from_utf8(row2).expect("utf8");
    let mut epoch_row = Vec::new();
    stats.write_epoch_csv_row(&mut epoch_row).expect("row renders");
    let epoch_row = String::from_utf8(epoch_row).expect("utf8");

    for name in ["num_reads_done", "num_cycles", "access_latency[40-59]"] {
        let cumulative_diff = column(&header, &row2, name) - column(&header, &row1, name);
        let epoch_delta = column(&header, &epoch_row, name);
        assert_eq!(epoch_delta, cumulative_diff, "column {name}");
    }
}

#[test]
fn total_energy_is_the_sum_of_its_components() {
    let mut stats = stats_with(2);
    stats.add(stats.num_act_cmds, 10);
    stats.add(stats.num_read_cmds, 100);
    stats.add(stats.num_write_cmds, 40);
    stats.add(stats.num_refresh_cmds, 2);
    stats.add(stats.rank_active_cycles[0], 500);
    stats.add(stats.all_bank_idle_cycles[1], 300);
    stats.add(stats.sref_cycles[1], 50);
    stats.recompute_epoch(1000, 4);

    let mut epoch_sum = 0.0;
    let mut cumulative_sum = 0.0;
    let mut tally = |pair: (f64, f64)| {
        epoch_sum += pair.0;
        cumulative_sum += pair.1;
    };
    tally(stats.computed_values(stats.act_energy));
    tally(stats.computed_values(stats.read_energy));
    tally(stats.computed_values(stats.write_energy));
    tally(stats.computed_values(stats.ref_energy));
    tally(stats.computed_values(stats.refb_energy));
    for r in 0..2 {
        tally(stats.computed_values(stats.act_stb_energy[r]));
        tally(stats.computed_values(stats.pre_stb_energy[r]));
        tally(stats.computed_values(stats.pre_pd_energy[r]));
        tally(stats.computed_values(stats.sref_energy[r]));
    }

    let (epoch_total, cumulative_total) = stats.computed_values(stats.total_energy);
    assert!((epoch_total - epoch_sum).abs() < 1e-9);
    assert!((cumulative_total - cumulative_sum).abs() < 1e-9);
    assert!(epoch_total > 0.0);
}

#[test]
fn average_power_and_bandwidth_follow_the_epoch_window() {
    let mut stats = stats_with(1);
    stats.add(stats.num_reads_done, 100);
    stats.add(stats.num_act_cmds, 10);
    stats.recompute_epoch(1000, 0);

    let config = ChannelConfig::default();
    let expected_energy = 10.0 * config.energy.act_energy_inc;
    let (power_epoch, power_cumulative) = stats.computed_values(stats.average_power);
    assert!((power_epoch - expected_energy / 1000.0).abs() < 1e-9);
    assert!((power_cumulative - expected_energy / 1000.0).abs() < 1e-9);

    let expected_bw = 100.0 * 64.0 / (1000.0 * config.tck);
    let (bw_epoch, bw_cumulative) = stats.computed_values(stats.average_bandwidth);
    assert!((bw_epoch - expected_bw).abs() < 1e-9);
    assert!((bw_cumulative - expected_bw).abs() < 1e-9);
}

#[test]
fn hmc_mode_counts_requests_from_the_hmc_counter() {
    let mut config = ChannelConfig::default();
    config.protocol = Protocol::Hmc;
    let mut stats = Statistics::new(Arc::new(config.clone()), 0);
    stats.add(stats.num_reads_done, 100);
    stats.add(stats.hmc_reqs_done, 50);
    stats.recompute_epoch(1000, 0);

    let expected_bw = 50.0 * 64.0 / (1000.0 * config.tck);
    let (_, bw_cumulative) = stats.computed_values(stats.average_bandwidth);
    assert!((bw_cumulative - expected_bw).abs() < 1e-9);
}

#[test]
fn latency_averages_come_from_the_histograms() {
    let mut stats = stats_with(1);
    stats.observe(stats.access_latency, 10);
    stats.observe(stats.access_latency, 30);
    stats.observe(stats.interarrival_latency, 4);
    stats.recompute_epoch(100, 0);

    let (lat_epoch, lat_cumulative) = stats.computed_values(stats.average_latency);
    assert!((lat_cumulative - 20.0).abs() < 1e-12);
    assert!((lat_epoch - 20.0).abs() < 1e-12);

    stats.update_epoch(100);
    stats.observe(stats.access_latency, 100);
    stats.recompute_epoch(200, 0);
    let (lat_epoch, lat_cumulative) = stats.computed_values(stats.average_latency);
    assert!((lat_epoch - 100.0).abs() < 1e-12);
    let expected = (10 + 30 + 100) as f64 / 3.0;
    assert!((lat_cumulative - expected).abs() < 1e-12);

    let (inter_epoch, inter_cumulative) = stats.computed_values(stats.average_interarrival);
    assert!((inter_cumulative - 4.0).abs() < 1e-12);
    assert_eq!(inter_epoch, 0.0, "no interarrival samples this epoch");
}

#[test]
fn human_dump_prints_name_value_description_lines() {
    let mut stats = stats_with(1);
    stats.add(stats.num_reads_done, 12);
    let mut out = Vec::new();
    stats.print(&mut out).expect("print renders");
    let out = String::from_utf8(out).expect("utf8");

    let line = out
        .lines()
        .find(|line| line.starts_with("num_reads_done"))
        .expect("counter line present");
    assert!(line.contains("= "));
    assert!(line.contains("12"));
    assert!(line.contains("# Number of read requests done"));
}
