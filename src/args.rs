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

use clap::Parser;

use crate::{error_gen, BoxResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transport {
    Tcp,
    Udp,
}

#[derive(Parser, Debug, Clone)]
#[command(
    version,
    about = "a traffic generator that drives or absorbs TCP/UDP traffic across a range of ports"
)]
pub struct Args {
    /// run in server mode, absorbing traffic
    #[arg(short = 's', long)]
    pub server: bool,

    /// run in client mode, driving traffic
    #[arg(short = 'c', long)]
    pub client: bool,

    /// generate TCP traffic
    #[arg(long)]
    pub tcp: bool,

    /// generate UDP traffic
    #[arg(long)]
    pub udp: bool,

    /// first port that the client connects to and the server listens on
    #[arg(long, value_name = "port", default_value_t = 5000)]
    pub start_port: u16,

    /// number of consecutive ports the client connects to and the server listens on
    #[arg(long, value_name = "count", default_value_t = 1)]
    pub num_ports: u16,

    /// priority applied to every sending socket
    #[arg(long, value_name = "priority", default_value_t = 0)]
    pub sk_prio: u32,

    /// application-level rate limit for UDP traffic, in megabits per second [0 = unlimited]
    #[arg(long, value_name = "mbps", default_value_t = 0)]
    pub rate_mbps: u64,

    /// send-buffer size, in bytes
    #[arg(long, value_name = "bytes", default_value_t = 1 << 20)]
    pub send_buffer: usize,

    /// number of bytes for each send call
    #[arg(long, value_name = "bytes", default_value_t = 1472)]
    pub send_size: usize,

    /// interface MTU, used to estimate per-packet framing overhead when pacing
    #[arg(long, value_name = "bytes", default_value_t = 1500)]
    pub mtu: usize,

    /// maximum number of bytes for each receive call
    #[arg(long, value_name = "bytes", default_value_t = 65536)]
    pub recv_size: usize,

    /// maximum backlog of pending connections on each listening port
    #[arg(long, value_name = "depth", default_value_t = 1000)]
    pub listen_backlog: i32,

    /// emit debug-level logs
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// host to send traffic to (client mode only)
    #[arg(value_name = "host")]
    pub host: Option<String>,
}

impl Args {
    pub fn transport(&self) -> Transport {
        if self.udp {
            Transport::Udp
        } else {
            Transport::Tcp
        }
    }

    /// the configured port range; only meaningful once `validate` has passed
    pub fn ports(&self) -> std::ops::RangeInclusive<u16> {
        self.start_port..=self.start_port + (self.num_ports - 1)
    }

    /// configuration errors are fatal before any traffic starts
    pub fn validate(&self) -> BoxResult<()> {
        if self.server == self.client {
            return Err(Box::new(error_gen!("exactly one of server-mode or client-mode must be enabled")));
        }
        if self.tcp == self.udp {
            return Err(Box::new(error_gen!("exactly one of TCP or UDP must be enabled")));
        }
        if self.client && self.host.is_none() {
            return Err(Box::new(error_gen!("a destination host must be specified in client mode")));
        }
        if self.server && self.host.is_some() {
            return Err(Box::new(error_gen!("a destination host is only meaningful in client mode")));
        }
        if self.num_ports == 0 {
            return Err(Box::new(error_gen!("at least one port is required")));
        }
        if u32::from(self.start_port) + u32::from(self.num_ports) - 1 > u32::from(u16::MAX) {
            return Err(Box::new(error_gen!("the port range extends past {}", u16::MAX)));
        }
        if self.rate_mbps > 0 && self.tcp {
            return Err(Box::new(error_gen!("application-level rate limiting is only applicable to UDP")));
        }
        if self.send_size == 0 {
            return Err(Box::new(error_gen!("the send size must be at least one byte")));
        }
        if self.rate_mbps > 0 && self.mtu <= 28 {
            return Err(Box::new(error_gen!("the MTU must exceed the 28 bytes of IP and UDP headers")));
        }
        Ok(())
    }
}
