//! getsockopt/ioctl helpers shared by the Linux and macOS back-ends

use std::os::fd::RawFd;

use crate::{Linger, Timeval};

/// Read a fixed-size socket option
///
/// # Safety
///
/// `T` must be the plain C type the kernel writes for `level`/`name`, and the
/// all-zero bit pattern must be a valid `T`.
pub(super) unsafe fn getsockopt<T: Copy>(
    fd: RawFd,
    level: libc::c_int,
    name: libc::c_int,
) -> std::io::Result<T> {
    // SAFETY: caller guarantees all-zero is a valid T
    let mut value: T = unsafe { std::mem::zeroed() };
    let mut len = std::mem::size_of::<T>() as libc::socklen_t;

    // SAFETY: value is a live, writable T and len is its size; the kernel
    // writes at most len bytes
    let ret = unsafe {
        libc::getsockopt(
            fd,
            level,
            name,
            (&mut value as *mut T).cast::<libc::c_void>(),
            &mut len,
        )
    };

    if ret == -1 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(value)
}

/// `ioctl` that writes a single `int`, e.g. the queue depth requests
///
/// A macro because the request argument type differs between libcs.
macro_rules! ioctl_int {
    ($fd:expr, $request:expr) => {{
        let mut value: libc::c_int = 0;
        // SAFETY: the request writes exactly one int into value
        let ret = unsafe { libc::ioctl($fd, $request, &mut value as *mut libc::c_int) };
        if ret == -1 {
            Err(std::io::Error::last_os_error())
        } else {
            $crate::sys::unix::non_negative(value)
        }
    }};
}
pub(super) use ioctl_int;

pub(super) fn non_negative(value: libc::c_int) -> std::io::Result<u32> {
    u32::try_from(value).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("kernel returned negative value {value}"),
        )
    })
}

pub(super) fn getsockopt_int(fd: RawFd, level: libc::c_int, name: libc::c_int) -> std::io::Result<u32> {
    // SAFETY: these options are plain ints
    let value: libc::c_int = unsafe { getsockopt(fd, level, name)? };
    non_negative(value)
}

pub(super) fn timeout(fd: RawFd, name: libc::c_int) -> std::io::Result<Timeval> {
    // SAFETY: SO_RCVTIMEO/SO_SNDTIMEO write a struct timeval
    let tv: libc::timeval = unsafe { getsockopt(fd, libc::SOL_SOCKET, name)? };
    Ok(Timeval {
        sec: tv.tv_sec as i64,
        usec: tv.tv_usec as i64,
    })
}

pub(super) fn linger(fd: RawFd) -> std::io::Result<Linger> {
    // SAFETY: SO_LINGER writes a struct linger
    let value: libc::linger = unsafe { getsockopt(fd, libc::SOL_SOCKET, libc::SO_LINGER)? };
    Ok(Linger {
        onoff: value.l_onoff,
        linger: value.l_linger,
    })
}

/// Keep a successful query, drop a failed one
pub(super) fn field<T>(name: &'static str, result: std::io::Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::trace!(field = name, error = %e, "socket query failed");
            None
        }
    }
}
