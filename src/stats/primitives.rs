use std::collections::BTreeMap;
use std::io::{self, Write};

/// Monotonic integer event count with an epoch snapshot.
pub struct Counter {
    name: String,
    description: String,
    count: u64,
    last_epoch_count: u64,
}

impl Counter {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            count: 0,
            last_epoch_count: 0,
        }
    }

    pub fn inc(&mut self) {
        self.add(1);
    }

    pub fn add(&mut self, n: u64) {
        self.count = self.count.saturating_add(n);
    }

    pub fn value(&self) -> u64 {
        self.count
    }

    pub fn epoch_delta(&self) -> u64 {
        self.count - self.last_epoch_count
    }

    pub fn update_epoch(&mut self) {
        self.last_epoch_count = self.count;
    }
}

/// Real-valued counter whose increment size is fixed at construction.
pub struct Accumulator {
    name: String,
    description: String,
    inc: f64,
    value: f64,
    last_epoch_value: f64,
}

impl Accumulator {
    pub fn new(inc: f64, name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            inc,
            value: 0.0,
            last_epoch_value: 0.0,
        }
    }

    pub fn record(&mut self) {
        self.value += self.inc;
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn epoch_delta(&self) -> f64 {
        self.value - self.last_epoch_value
    }

    pub fn update_epoch(&mut self) {
        self.last_epoch_value = self.value;
    }
}

/// Derived quantity with independent epoch and cumulative readings, set
/// externally by the per-epoch recompute pass.
pub struct Computed {
    name: String,
    description: String,
    epoch_value: f64,
    cumulative_value: f64,
}

impl Computed {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            epoch_value: 0.0,
            cumulative_value: 0.0,
        }
    }

    pub fn set(&mut self, epoch_value: f64, cumulative_value: f64) {
        self.epoch_value = epoch_value;
        self.cumulative_value = cumulative_value;
    }

    pub fn values(&self) -> (f64, f64) {
        (self.epoch_value, self.cumulative_value)
    }
}

/// Fixed-bucket histogram with an exact value-count map on the side.
///
/// Bucket 0 is the underflow bucket, the last bucket catches overflow, and
/// middle buckets cover `bin_width` values each starting at `start`. The
/// exact map feeds the averages; the buckets feed CSV emission.
pub struct Histogram {
    name: String,
    description: String,
    start: u64,
    end: u64,
    num_bins: usize,
    bin_width: u64,
    bins: BTreeMap<u64, u64>,
    buckets: Vec<u64>,
    last_epoch_buckets: Vec<u64>,
    sum: u64,
    count: u64,
    last_epoch_sum: u64,
    last_epoch_count: u64,
    headers: Vec<String>,
}

impl Histogram {
    pub fn new(start: u64, end: u64, num_bins: usize, name: &str, description: &str) -> Self {
        assert!(num_bins >= 2, "histogram needs underflow and overflow buckets");
        let bin_width = (end - start) / num_bins as u64;
        assert!(bin_width > 0, "histogram range too narrow for bin count");
        let mut headers = Vec::with_capacity(num_bins);
        headers.push(format!("{name}[-{start}]"));
        for i in 1..num_bins - 1 {
            let lo = start + (i as u64 - 1) * bin_width;
            let hi = start + i as u64 * bin_width - 1;
            headers.push(format!("{name}[{lo}-{hi}]"));
        }
        headers.push(format!("{name}[{end}-]"));
        Self {
            name: name.to_string(),
            description: description.to_string(),
            start,
            end,
            num_bins,
            bin_width,
            bins: BTreeMap::new(),
            buckets: vec![0; num_bins],
            last_epoch_buckets: vec![0; num_bins],
            sum: 0,
            count: 0,
            last_epoch_sum: 0,
            last_epoch_count: 0,
            headers,
        }
    }

    pub fn observe(&mut self, value: u64) {
        *self.bins.entry(value).or_insert(0) += 1;
        self.sum = self.sum.saturating_add(value);
        self.count += 1;
        let idx = if value < self.start {
            0
        } else if value > self.end {
            self.num_bins - 1
        } else {
            (((value - self.start) / self.bin_width) as usize + 1).min(self.num_bins - 1)
        };
        self.buckets[idx] += 1;
    }

    /// Exact average over every observed value.
    pub fn average(&self) -> f64 {
        let count: u64 = self.bins.values().sum();
        if count == 0 {
            return 0.0;
        }
        let sum: u64 = self.bins.iter().map(|(val, n)| val * n).sum();
        sum as f64 / count as f64
    }

    /// Exact average over values observed since the last epoch snapshot.
    pub fn epoch_average(&self) -> f64 {
        let count = self.count - self.last_epoch_count;
        if count == 0 {
            return 0.0;
        }
        (self.sum - self.last_epoch_sum) as f64 / count as f64
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn update_epoch(&mut self) {
        self.last_epoch_buckets.clone_from(&self.buckets);
        self.last_epoch_sum = self.sum;
        self.last_epoch_count = self.count;
    }
}

/// The registry's stat shapes, dispatched by match rather than virtual calls.
pub enum Stat {
    Counter(Counter),
    Accumulator(Accumulator),
    Computed(Computed),
    Histogram(Histogram),
}

impl Stat {
    pub fn name(&self) -> &str {
        match self {
            Stat::Counter(s) => &s.name,
            Stat::Accumulator(s) => &s.name,
            Stat::Computed(s) => &s.name,
            Stat::Histogram(s) => &s.name,
        }
    }

    pub fn update_epoch(&mut self) {
        match self {
            Stat::Counter(s) => s.update_epoch(),
            Stat::Accumulator(s) => s.update_epoch(),
            Stat::Computed(_) => {}
            Stat::Histogram(s) => s.update_epoch(),
        }
    }

    pub fn print(&self, w: &mut dyn Write) -> io::Result<()> {
        match self {
            Stat::Counter(s) => {
                writeln!(w, "{:<30} = {:>12} # {}", s.name, s.count, s.description)
            }
            Stat::Accumulator(s) => {
                writeln!(w, "{:<30} = {:>12.3} # {}", s.name, s.value, s.description)
            }
            Stat::Computed(s) => writeln!(
                w,
                "{:<30} = {:>12.3} # {}",
                s.name, s.cumulative_value, s.description
            ),
            Stat::Histogram(s) => {
                for (header, bucket) in s.headers.iter().zip(s.buckets.iter()) {
                    writeln!(w, "{:<30} = {:>12} # {}", header, bucket, s.description)?;
                }
                Ok(())
            }
        }
    }

    pub fn csv_header(&self, w: &mut dyn Write) -> io::Result<()> {
        match self {
            Stat::Histogram(s) => {
                for header in &s.headers {
                    write!(w, ",{header}")?;
                }
                Ok(())
            }
            other => write!(w, ",{}", other.name()),
        }
    }

    pub fn csv_entry(&self, w: &mut dyn Write) -> io::Result<()> {
        match self {
            Stat::Counter(s) => write!(w, ",{}", s.count),
            Stat::Accumulator(s) => write!(w, ",{}", s.value),
            Stat::Computed(s) => write!(w, ",{}", s.cumulative_value),
            Stat::Histogram(s) => {
                for bucket in &s.buckets {
                    write!(w, ",{bucket}")?;
                }
                Ok(())
            }
        }
    }

    pub fn csv_epoch_entry(&self, w: &mut dyn Write) -> io::Result<()> {
        match self {
            Stat::Counter(s) => write!(w, ",{}", s.epoch_delta()),
            Stat::Accumulator(s) => write!(w, ",{}", s.epoch_delta()),
            Stat::Computed(s) => write!(w, ",{}", s.epoch_value),
            Stat::Histogram(s) => {
                for (bucket, last) in s.buckets.iter().zip(s.last_epoch_buckets.iter()) {
                    write!(w, ",{}", bucket - last)?;
                }
                Ok(())
            }
        }
    }
}
