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

use std::io::Write;
use std::net::{TcpStream, UdpSocket};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tgen::args::Args;
use tgen::{client, server, Counters, Shutdown};

fn base_args() -> Args {
    Args {
        server: false,
        client: false,
        tcp: false,
        udp: false,
        start_port: 0,
        num_ports: 1,
        sk_prio: 0,
        rate_mbps: 0,
        send_buffer: 1 << 20,
        send_size: 1472,
        mtu: 1500,
        recv_size: 65536,
        listen_backlog: 1000,
        debug: false,
        host: None,
    }
}

fn start_server(args: Args) -> (Arc<Counters>, Shutdown, thread::JoinHandle<()>) {
    let counters = Arc::new(Counters::new());
    let shutdown = Shutdown::new();

    let engine_counters = Arc::clone(&counters);
    let engine_shutdown = shutdown.clone();
    let handle = thread::spawn(move || {
        server::run(&args, engine_counters, engine_shutdown).expect("server engine failed");
    });
    //give the listeners a moment to bind
    thread::sleep(Duration::from_millis(200));

    (counters, shutdown, handle)
}

fn wait_for(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for condition");
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn tcp_server_counts_and_forgets_a_clean_peer() {
    let mut args = base_args();
    args.server = true;
    args.tcp = true;
    args.start_port = 46100;
    args.num_ports = 2;

    let (counters, shutdown, handle) = start_server(args);

    {
        let mut stream = TcpStream::connect(("127.0.0.1", 46100)).expect("unable to connect");
        stream.write_all(&[7_u8; 100]).expect("unable to write");
    } //orderly close

    wait_for(|| counters.total_received() == 100);

    //the first peer must be forgotten and fresh connections still accepted
    let mut stream = TcpStream::connect(("127.0.0.1", 46101)).expect("unable to connect");
    stream.write_all(&[9_u8; 50]).expect("unable to write");
    drop(stream);

    wait_for(|| counters.total_received() == 150);

    shutdown.kill();
    handle.join().unwrap();
}

#[test]
fn udp_server_counts_datagrams_without_connection_state() {
    let mut args = base_args();
    args.server = true;
    args.udp = true;
    args.start_port = 46200;

    let (counters, shutdown, handle) = start_server(args);

    let socket = UdpSocket::bind("127.0.0.1:0").expect("unable to bind");
    socket.send_to(&[1_u8; 50], ("127.0.0.1", 46200)).expect("unable to send");
    socket.send_to(&[2_u8; 75], ("127.0.0.1", 46200)).expect("unable to send");

    wait_for(|| counters.total_received() == 125);

    shutdown.kill();
    handle.join().unwrap();
}

#[test]
fn server_observes_shutdown_within_the_poll_timeout() {
    let mut args = base_args();
    args.server = true;
    args.udp = true;
    args.start_port = 46300;

    let (_counters, shutdown, handle) = start_server(args);

    let begin = Instant::now();
    shutdown.kill();
    handle.join().unwrap();
    //one 100ms readiness wait plus teardown slack
    assert!(begin.elapsed() < Duration::from_millis(500));
}

#[test]
fn udp_client_counts_whole_payloads_with_no_receiver() {
    let mut args = base_args();
    args.client = true;
    args.udp = true;
    args.start_port = 46400;
    args.num_ports = 2;
    args.send_size = 200;
    args.rate_mbps = 20; //keep the spin loop light
    args.host = Some("127.0.0.1".to_string());

    let counters = Arc::new(Counters::new());
    let shutdown = Shutdown::new();

    let engine_counters = Arc::clone(&counters);
    let engine_shutdown = shutdown.clone();
    let handle = thread::spawn(move || {
        client::run(&args, engine_counters, engine_shutdown).expect("client engine failed");
    });

    wait_for(|| counters.total_sent() >= 400);

    shutdown.kill();
    handle.join().unwrap();

    //every successful send accounts for exactly one whole payload
    let sent = counters.total_sent();
    assert!(sent > 0);
    assert_eq!(sent % 200, 0);
}
