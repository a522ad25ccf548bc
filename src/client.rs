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

//! the client-side engine: one flow per destination port, driven as fast as
//! the transport allows or as slowly as the pacer dictates

use std::io::{self, Write};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::sync::Arc;

use socket2::{Domain, Protocol, Socket, Type};

use crate::args::{Args, Transport};
use crate::counters::{Counters, ThroughputReporter};
use crate::pacing::Pacer;
use crate::shutdown::Shutdown;
use crate::utils::sockopt;
use crate::{error_gen, BoxResult};

/// direction marker on every throughput report line
const SENT_MARKER: &str = "tx";

pub fn run(args: &Args, counters: Arc<Counters>, shutdown: Shutdown) -> BoxResult<()> {
    let host = args.host.as_deref().ok_or_else(|| error_gen!("no destination host specified"))?;
    let destinations = resolve_destinations(host, args)?;

    log::info!(
        "starting {} ports of {} traffic to {}",
        args.num_ports,
        if args.udp { "UDP" } else { "TCP" },
        host
    );

    match args.transport() {
        Transport::Udp => run_udp(args, &destinations, counters, shutdown),
        Transport::Tcp => run_tcp(args, &destinations, counters, shutdown),
    }
}

/// the destination set: one address per configured port offset, fixed for the
/// process lifetime
fn resolve_destinations(host: &str, args: &Args) -> BoxResult<Vec<SocketAddr>> {
    let ip = resolve_host(host)?;
    Ok(args.ports().map(|port| SocketAddr::new(ip, port)).collect())
}

fn resolve_host(host: &str) -> BoxResult<IpAddr> {
    let mut addresses = (host, 0_u16)
        .to_socket_addrs()
        .map_err(|e| error_gen!("unable to resolve {}: {}", host, e))?;
    match addresses.next() {
        Some(address) => Ok(address.ip()),
        None => Err(Box::new(error_gen!("no addresses found for {}", host))),
    }
}

fn run_udp(args: &Args, destinations: &[SocketAddr], counters: Arc<Counters>, shutdown: Shutdown) -> BoxResult<()> {
    //a single socket fans out to every destination port
    let socket = Socket::new(Domain::for_address(destinations[0]), Type::DGRAM, Some(Protocol::UDP))?;
    sockopt::set_send_buffer(&socket, args.send_buffer)?;
    sockopt::set_priority(&socket, args.sk_prio)?;
    let unspecified = match destinations[0].ip() {
        IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    };
    socket.bind(&SocketAddr::new(unspecified, 0).into())?;
    let socket: UdpSocket = socket.into();

    let payload = vec![0_u8; args.send_size];
    let mut pacer = (args.rate_mbps > 0).then(|| Pacer::new(args.rate_mbps, args.send_size, args.mtu));
    match &pacer {
        Some(pacer) => log::info!(
            "pacing each send by {}ns (send-buffer {}, send-size {}, priority {})",
            pacer.delay().as_nanos(),
            args.send_buffer,
            args.send_size,
            args.sk_prio
        ),
        None => log::info!(
            "application-level pacing disabled (send-buffer {}, send-size {}, priority {})",
            args.send_buffer,
            args.send_size,
            args.sk_prio
        ),
    }

    let mut reporter = ThroughputReporter::new(SENT_MARKER);
    while shutdown.is_alive() {
        for destination in destinations {
            match socket.send_to(&payload, destination) {
                Ok(bytes_sent) => counters.add_sent(bytes_sent as u64),
                //keep sending even when nothing is listening at the far end
                Err(e) => log::debug!("unable to send to {}: {}", destination, e),
            }
            if let Some(pacer) = pacer.as_mut() {
                pacer.pause();
            }
        }
        reporter.maybe_report(counters.total_sent());
    }
    Ok(())
}

fn run_tcp(args: &Args, destinations: &[SocketAddr], counters: Arc<Counters>, shutdown: Shutdown) -> BoxResult<()> {
    //one flow per destination port
    let mut flows = Vec::with_capacity(destinations.len());
    for destination in destinations {
        flows.push(connect_flow(args, *destination)?);
    }
    log::info!(
        "connected {} flows (send-buffer {}, send-size {}, priority {})",
        flows.len(),
        args.send_buffer,
        args.send_size,
        args.sk_prio
    );

    let payload = vec![0_u8; args.send_size];
    while shutdown.is_alive() {
        for (flow, destination) in flows.iter_mut().zip(destinations) {
            match flow.write(&payload) {
                //a partial write is fine; only the byte count matters
                Ok(bytes_sent) => counters.add_sent(bytes_sent as u64),
                //the send-buffer is full, or the connect is still in flight
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) => {
                    return Err(Box::new(error_gen!("unable to send to {}: {}", destination, e)));
                }
            }
        }
    }
    Ok(())
}

/// create, configure and asynchronously connect one non-blocking flow
fn connect_flow(args: &Args, destination: SocketAddr) -> BoxResult<TcpStream> {
    let socket = Socket::new(Domain::for_address(destination), Type::STREAM, Some(Protocol::TCP))?;
    sockopt::set_send_buffer(&socket, args.send_buffer)?;
    sockopt::set_priority(&socket, args.sk_prio)?;
    sockopt::set_non_blocking(&socket)?;

    match socket.connect(&destination.into()) {
        Ok(()) => {}
        //a non-blocking connect completes in the background; the first
        //successful send observes it
        Err(ref e) if e.raw_os_error() == Some(libc::EINPROGRESS) => {}
        Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {}
        Err(e) => {
            return Err(Box::new(error_gen!("unable to connect to {}: {}", destination, e)));
        }
    }
    Ok(socket.into())
}
