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

//! application-level pacing for the UDP send path

use std::time::{Duration, Instant};

const UDP_HEADER_SIZE: u64 = 8;
const IP_HEADER_SIZE: u64 = 20;
const ETHERNET_HEADER_SIZE: u64 = 14;

/// estimated number of bytes a payload occupies on the link, counting the UDP,
/// IP and Ethernet framing of every packet it spans; pacing on payload bytes
/// alone under-counts link utilisation once a payload exceeds one MTU
pub fn udp_bytes_on_wire(payload_size: u64, mtu: u64) -> u64 {
    let capacity = mtu - IP_HEADER_SIZE - UDP_HEADER_SIZE;
    let packets = (payload_size + capacity - 1) / capacity;
    payload_size + packets * (UDP_HEADER_SIZE + IP_HEADER_SIZE + ETHERNET_HEADER_SIZE)
}

/// the inter-send delay that holds a stream of equally-sized payloads at the
/// target wire rate
pub fn send_delay(rate_mbps: u64, payload_size: u64, mtu: u64) -> Duration {
    //truncating division; at very high rates the lost fraction biases the
    //achieved rate slightly upward
    Duration::from_nanos(udp_bytes_on_wire(payload_size, mtu) * 8000 / rate_mbps)
}

pub struct Pacer {
    delay: Duration,
    prev: Option<Instant>,
}

impl Pacer {
    pub fn new(rate_mbps: u64, payload_size: usize, mtu: usize) -> Pacer {
        Pacer {
            delay: send_delay(rate_mbps, payload_size as u64, mtu as u64),
            prev: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// spin until the configured delay has elapsed since the previous call's
    /// measured end (the first call starts from "now"), then advance the
    /// reference to the moment the spin stopped; returns the time actually
    /// elapsed, which is never less than the delay
    pub fn pause(&mut self) -> Duration {
        //scheduler jitter from a yielding sleep is unacceptable at high packet
        //rates, so sample the clock in a tight loop instead
        let start = self.prev.unwrap_or_else(Instant::now);
        let mut now = Instant::now();
        while now.duration_since(start) < self.delay {
            now = Instant::now();
        }
        self.prev = Some(now);
        now.duration_since(start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn single_packet_payload_on_wire() {
        //1472 payload bytes fit in one 1500-byte MTU beside the 28 header bytes
        assert_eq!(udp_bytes_on_wire(1472, 1500), 1514);
    }

    #[test]
    fn fragmented_payload_on_wire() {
        //one byte past the single-packet capacity costs a second set of headers
        assert_eq!(udp_bytes_on_wire(1473, 1500), 1473 + 2 * 42);
        //maximum UDP payload spans 45 packets at the default MTU
        assert_eq!(udp_bytes_on_wire(65507, 1500), 65507 + 45 * 42);
    }

    #[test]
    fn delay_grows_with_payload_and_shrinks_with_rate() {
        let mut previous = Duration::ZERO;
        for payload_size in [100, 1472, 1473, 8192, 65507] {
            let delay = send_delay(100, payload_size, 1500);
            assert!(delay >= previous);
            previous = delay;
        }

        let mut previous = Duration::MAX;
        for rate_mbps in [1, 10, 100, 1000, 10000] {
            let delay = send_delay(rate_mbps, 1472, 1500);
            assert!(delay <= previous);
            previous = delay;
        }
    }

    #[test]
    fn delay_truncates_toward_zero() {
        //1514 wire bytes at 1Mbps is exactly 12112000ns
        assert_eq!(send_delay(1, 1472, 1500), Duration::from_nanos(12_112_000));
        //at 10Gbps the exact quotient of 1211.2ns loses its fraction
        assert_eq!(send_delay(10_000, 1472, 1500), Duration::from_nanos(1211));
    }

    #[test]
    fn pause_never_returns_early() {
        //1514 wire bytes at 6Mbps is a hair over 2ms per send
        let mut pacer = Pacer::new(6, 1472, 1500);
        let delay = pacer.delay();

        let begin = Instant::now();
        let mut reported = Duration::ZERO;
        for _ in 0..4 {
            reported += pacer.pause();
        }
        assert!(begin.elapsed() >= delay * 4);
        assert!(reported >= delay * 4);
    }

    #[test]
    fn reference_advances_to_the_measured_end() {
        let mut pacer = Pacer::new(6, 1472, 1500);
        pacer.pause();

        //time spent outside the pacer counts against the next delay, so a
        //call made after a long gap must not spin for a full delay again
        sleep(pacer.delay() * 3);
        let begin = Instant::now();
        let reported = pacer.pause();
        assert!(begin.elapsed() < pacer.delay());
        assert!(reported >= pacer.delay() * 3);
    }
}
