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

//! RLIMIT_NOFILE provisioning; both engines need one descriptor per port,
//! plus slack for accepted connections

use crate::BoxResult;

const HEADROOM: u64 = 1000;

#[cfg(unix)]
pub fn ensure(descriptors: u64) -> BoxResult<()> {
    let wanted = descriptors + HEADROOM;

    let mut limits = libc::rlimit { rlim_cur: 0, rlim_max: 0 };
    if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut limits) } != 0 {
        return Err(Box::new(std::io::Error::last_os_error()));
    }
    if limits.rlim_cur as u64 >= wanted {
        return Ok(());
    }

    log::debug!("raising the open-descriptor limit from {} to {}...", limits.rlim_cur, wanted);
    limits.rlim_cur = wanted as libc::rlim_t;
    if (limits.rlim_max as u64) < wanted {
        limits.rlim_max = wanted as libc::rlim_t;
    }
    if unsafe { libc::setrlimit(libc::RLIMIT_NOFILE, &limits) } != 0 {
        return Err(Box::new(std::io::Error::last_os_error()));
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn ensure(_descriptors: u64) -> BoxResult<()> {
    Ok(())
}
