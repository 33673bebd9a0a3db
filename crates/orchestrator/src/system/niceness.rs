//! Scheduling priority of other processes.
//!
//! Niceness is read from `/proc/<pid>/stat`, which avoids `getpriority(2)`
//! and its ambiguous `-1` return value. Only setting goes through libc.

use std::io;

/// Set the nice value of `pid` with `setpriority(2)`.
pub fn set_priority(pid: u32, nice: i32) -> io::Result<()> {
    #[allow(unsafe_code)]
    let ret = unsafe { libc::setpriority(libc::PRIO_PROCESS, pid as libc::id_t, nice) };

    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}
