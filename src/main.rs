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

use std::sync::Arc;

use clap::Parser;

use tgen::args::Args;
use tgen::{client, server, utils, Counters, Shutdown};

fn main() {
    let args = Args::parse();

    let mut env = env_logger::Env::default().filter_or("RUST_LOG", "info");
    if args.debug {
        env = env_logger::Env::default().filter_or("RUST_LOG", "debug");
    }
    env_logger::Builder::from_env(env).init();

    if let Err(e) = args.validate() {
        log::error!("{}", e);
        std::process::exit(1);
    }

    if let Err(e) = utils::fd_limit::ensure(u64::from(args.num_ports)) {
        log::error!("unable to provision the descriptor limit: {}", e);
        std::process::exit(1);
    }

    let counters = Arc::new(Counters::new());
    let shutdown = Shutdown::new();

    let signal_shutdown = shutdown.clone();
    let _signal_handle = ctrlc2::set_handler(move || {
        if signal_shutdown.kill() {
            log::warn!("shutdown requested; finishing the current iteration...");
        }
        true
    })
    .expect("unable to install the termination handler");

    let result = if args.client {
        client::run(&args, counters, shutdown)
    } else {
        server::run(&args, counters, shutdown)
    };

    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
