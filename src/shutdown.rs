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

use std::sync::atomic::{AtomicBool, Ordering::Relaxed};
use std::sync::Arc;

/// process-wide termination flag, latched by the signal handler and polled by
/// the engines at the top of every outer iteration; never blocked upon
#[derive(Clone)]
pub struct Shutdown {
    alive: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Shutdown {
        Shutdown {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// latch the flag; returns whether the process was still alive, which
    /// distinguishes the first signal from an impatient repeat
    pub fn kill(&self) -> bool {
        self.alive.swap(false, Relaxed)
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Relaxed)
    }
}

impl Default for Shutdown {
    fn default() -> Shutdown {
        Shutdown::new()
    }
}
