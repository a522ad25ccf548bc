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

//! thin wrappers over the socket options the engines apply at setup time

use socket2::Socket;

use crate::BoxResult;

pub fn set_send_buffer(socket: &Socket, bytes: usize) -> BoxResult<()> {
    if bytes == 0 {
        return Ok(());
    }
    log::debug!("setting send-buffer to {}...", bytes);
    socket.set_send_buffer_size(bytes)?;
    Ok(())
}

pub fn set_address_reuse(socket: &Socket) -> BoxResult<()> {
    socket.set_reuse_address(true)?;
    Ok(())
}

pub fn set_non_blocking(socket: &Socket) -> BoxResult<()> {
    socket.set_nonblocking(true)?;
    Ok(())
}

/// SO_PRIORITY is Linux-only; elsewhere a non-zero request is reported and
/// ignored
#[cfg(target_os = "linux")]
pub fn set_priority(socket: &Socket, priority: u32) -> BoxResult<()> {
    use std::os::fd::AsRawFd;

    if priority == 0 {
        return Ok(());
    }
    log::debug!("setting socket priority to {}...", priority);
    let value = priority as libc::c_int;
    let result = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_PRIORITY,
            &value as *const libc::c_int as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if result != 0 {
        return Err(Box::new(std::io::Error::last_os_error()));
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn set_priority(_socket: &Socket, priority: u32) -> BoxResult<()> {
    if priority != 0 {
        log::warn!("socket priority is not supported on this platform");
    }
    Ok(())
}
