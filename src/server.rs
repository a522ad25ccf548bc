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

//! the server-side engine: every configured port plus every accepted
//! connection, multiplexed under a single readiness poll

use std::collections::HashMap;
use std::io::{self, Read};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use mio::net::{TcpListener, TcpStream, UdpSocket};
use mio::{Events, Interest, Poll, Token};
use socket2::{Domain, Protocol, Socket, Type};

use crate::args::{Args, Transport};
use crate::counters::Counters;
use crate::shutdown::Shutdown;
use crate::utils::sockopt;
use crate::BoxResult;

/// bounded readiness wait, so the shutdown flag is re-checked promptly even
/// when no traffic arrives
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

const EVENT_CAPACITY: usize = 1024;

pub fn run(args: &Args, counters: Arc<Counters>, shutdown: Shutdown) -> BoxResult<()> {
    match args.transport() {
        Transport::Tcp => run_tcp(args, counters, shutdown),
        Transport::Udp => run_udp(args, counters, shutdown),
    }
}

/// a non-blocking, address-reusing socket bound to the wildcard address
fn bind_socket(port: u16, socket_type: Type, protocol: Protocol) -> BoxResult<Socket> {
    let socket = Socket::new(Domain::IPV4, socket_type, Some(protocol))?;
    sockopt::set_address_reuse(&socket)?;
    sockopt::set_non_blocking(&socket)?;
    let address = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
    socket.bind(&address.into())?;
    Ok(socket)
}

fn run_tcp(args: &Args, counters: Arc<Counters>, shutdown: Shutdown) -> BoxResult<()> {
    let mut poll = Poll::new()?;
    let mut events = Events::with_capacity(EVENT_CAPACITY);

    let mut listeners = Vec::with_capacity(args.num_ports as usize);
    for (index, port) in args.ports().enumerate() {
        let socket = bind_socket(port, Type::STREAM, Protocol::TCP)?;
        socket.listen(args.listen_backlog)?;
        let mut listener = TcpListener::from_std(socket.into());
        poll.registry().register(&mut listener, Token(index), Interest::READABLE)?;
        listeners.push(listener);
    }
    log::info!("listening for TCP traffic on ports {}..={}", args.start_port, *args.ports().end());

    //accepted connections, keyed by their poll token; tokens are never reused
    let mut connections: HashMap<Token, TcpStream> = HashMap::new();
    let mut next_token = listeners.len();
    let mut scratch = vec![0_u8; args.recv_size];

    while shutdown.is_alive() {
        if let Err(e) = poll.poll(&mut events, Some(POLL_TIMEOUT)) {
            //a signal may interrupt the wait; anything else is fatal
            if e.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(Box::new(e));
        }

        //a timed-out wait yields no events and just re-checks the flag
        for event in events.iter() {
            let token = event.token();
            if token.0 < listeners.len() {
                accept_backlog(&poll, &listeners[token.0], &mut connections, &mut next_token)?;
            } else {
                let closed = match connections.get_mut(&token) {
                    Some(stream) => drain_stream(stream, &mut scratch, &counters)?,
                    //already removed earlier in this batch
                    None => false,
                };
                if closed {
                    if let Some(mut stream) = connections.remove(&token) {
                        poll.registry().deregister(&mut stream)?;
                        if let Ok(peer) = stream.peer_addr() {
                            log::debug!("{} disconnected", peer);
                        }
                    }
                }
            }
        }
    }

    log::info!("shutdown requested; closing {} connections", connections.len());
    Ok(())
}

/// accept until the listener's backlog is dry; every accepted peer joins the
/// readiness set
fn accept_backlog(
    poll: &Poll,
    listener: &TcpListener,
    connections: &mut HashMap<Token, TcpStream>,
    next_token: &mut usize,
) -> BoxResult<()> {
    loop {
        match listener.accept() {
            Ok((mut stream, address)) => {
                log::debug!("connection from {}", address);
                let token = Token(*next_token);
                *next_token += 1;
                poll.registry().register(&mut stream, token, Interest::READABLE)?;
                connections.insert(token, stream);
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) => return Err(Box::new(e)),
        }
    }
    Ok(())
}

/// read until the stream would block, discarding content; returns true when
/// the peer closed cleanly
fn drain_stream(stream: &mut TcpStream, scratch: &mut [u8], counters: &Counters) -> BoxResult<bool> {
    loop {
        match stream.read(scratch) {
            Ok(0) => return Ok(true),
            Ok(bytes_received) => counters.add_received(bytes_received as u64),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(false),
            Err(e) => return Err(Box::new(e)),
        }
    }
}

fn run_udp(args: &Args, counters: Arc<Counters>, shutdown: Shutdown) -> BoxResult<()> {
    let mut poll = Poll::new()?;
    let mut events = Events::with_capacity(EVENT_CAPACITY);

    //no accept phase exists; the listening sockets are themselves the
    //readable set
    let mut sockets = Vec::with_capacity(args.num_ports as usize);
    for (index, port) in args.ports().enumerate() {
        let socket = bind_socket(port, Type::DGRAM, Protocol::UDP)?;
        let mut socket = UdpSocket::from_std(socket.into());
        poll.registry().register(&mut socket, Token(index), Interest::READABLE)?;
        sockets.push(socket);
    }
    log::info!("receiving UDP traffic on ports {}..={}", args.start_port, *args.ports().end());

    let mut scratch = vec![0_u8; args.recv_size];
    while shutdown.is_alive() {
        if let Err(e) = poll.poll(&mut events, Some(POLL_TIMEOUT)) {
            if e.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(Box::new(e));
        }

        for event in events.iter() {
            drain_datagrams(&sockets[event.token().0], &mut scratch, &counters)?;
        }
    }

    log::info!("shutdown requested; closing {} sockets", sockets.len());
    Ok(())
}

/// receive until the socket would block, discarding payloads
fn drain_datagrams(socket: &UdpSocket, scratch: &mut [u8], counters: &Counters) -> BoxResult<()> {
    loop {
        match socket.recv_from(scratch) {
            Ok((bytes_received, _peer)) => counters.add_received(bytes_received as u64),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
            Err(e) => return Err(Box::new(e)),
        }
    }
}
