/*
 * This file is part of tgen.
 *
 * tgen is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * tgen is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with tgen.  If not, see <https://www.gnu.org/licenses/>.
 */

//! byte accounting shared between the I/O path and the reporting path

use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use std::time::{Duration, Instant};

const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// monotonically increasing totals for traffic in each direction; the I/O
/// path adds, the reporting consumer reads, and neither needs more than
/// freedom from lost updates
#[derive(Default)]
pub struct Counters {
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
}

impl Counters {
    pub fn new() -> Counters {
        Counters::default()
    }

    pub fn add_sent(&self, bytes: u64) {
        self.bytes_sent.fetch_add(bytes, Relaxed);
    }

    pub fn add_received(&self, bytes: u64) {
        self.bytes_received.fetch_add(bytes, Relaxed);
    }

    pub fn total_sent(&self) -> u64 {
        self.bytes_sent.load(Relaxed)
    }

    pub fn total_received(&self) -> u64 {
        self.bytes_received.load(Relaxed)
    }
}

/// once-per-second throughput lines on stdout: direction marker, seconds since
/// the run began, achieved megabits per second
pub struct ThroughputReporter {
    marker: &'static str,
    started: Instant,
    last_report: Instant,
    last_total: u64,
}

impl ThroughputReporter {
    pub fn new(marker: &'static str) -> ThroughputReporter {
        let now = Instant::now();
        ThroughputReporter {
            marker,
            started: now,
            last_report: now,
            last_total: 0,
        }
    }

    /// emit a line if a full interval has passed since the last one; `total`
    /// is the current value of the relevant counter; this never blocks, so it
    /// cannot pace the send loop that calls it
    pub fn maybe_report(&mut self, total: u64) {
        let interval = self.last_report.elapsed();
        if interval < REPORT_INTERVAL {
            return;
        }

        let delta = total - self.last_total;
        let mbps = (delta * 8) as f64 / interval.as_secs_f64() / 1_000_000.0;
        println!("{}\t{:.3}\t{:.2}", self.marker, self.started.elapsed().as_secs_f64(), mbps);

        self.last_report = Instant::now();
        self.last_total = total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn concurrent_adds_are_never_lost() {
        let counters = Arc::new(Counters::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let counters = Arc::clone(&counters);
            handles.push(thread::spawn(move || {
                for _ in 0..10_000 {
                    counters.add_sent(3);
                    counters.add_received(7);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counters.total_sent(), 8 * 10_000 * 3);
        assert_eq!(counters.total_received(), 8 * 10_000 * 7);
    }

    #[test]
    fn totals_never_decrease() {
        let counters = Counters::new();
        let mut previous = 0;
        for bytes in 0..100 {
            counters.add_received(bytes);
            let total = counters.total_received();
            assert!(total >= previous);
            previous = total;
        }
    }
}
