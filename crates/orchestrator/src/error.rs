#![forbid(unsafe_code)]

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(#[from] config::Error),

    #[error("Failed to read procfs info: {0}")]
    Procfs(#[from] procfs::ProcError),

    #[error("Failed to read file: {0}")]
    Io(#[from] io::Error),
}

/// Failure to inspect or renice a single process.
///
/// These are expected while the daemon runs and never stop the poll loop.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("process {pid} vanished")]
    Vanished { pid: u32 },

    #[error("permission denied for process {pid}")]
    PermissionDenied { pid: u32 },

    #[error("failed to read process {pid}: {source}")]
    Procfs {
        pid: u32,
        #[source]
        source: procfs::ProcError,
    },

    #[error("failed to change priority of process {pid}: {source}")]
    Io {
        pid: u32,
        #[source]
        source: io::Error,
    },
}

impl ProbeError {
    pub fn from_procfs(pid: u32, err: procfs::ProcError) -> Self {
        use procfs::ProcError;
        match err {
            ProcError::NotFound(_) => Self::Vanished { pid },
            ProcError::PermissionDenied(_) => Self::PermissionDenied { pid },
            ProcError::Io(ref io, _) if io.raw_os_error() == Some(libc::ESRCH) => {
                Self::Vanished { pid }
            }
            source => Self::Procfs { pid, source },
        }
    }

    pub fn from_io(pid: u32, err: io::Error) -> Self {
        match err.raw_os_error() {
            Some(libc::ESRCH) => Self::Vanished { pid },
            Some(libc::EPERM | libc::EACCES) => Self::PermissionDenied { pid },
            _ => Self::Io { pid, source: err },
        }
    }

    pub fn pid(&self) -> u32 {
        match self {
            Self::Vanished { pid }
            | Self::PermissionDenied { pid }
            | Self::Procfs { pid, .. }
            | Self::Io { pid, .. } => *pid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_maps_to_probe_error() {
        let vanished = ProbeError::from_io(7, io::Error::from_raw_os_error(libc::ESRCH));
        assert!(matches!(vanished, ProbeError::Vanished { pid: 7 }));

        let denied = ProbeError::from_io(7, io::Error::from_raw_os_error(libc::EPERM));
        assert!(matches!(denied, ProbeError::PermissionDenied { pid: 7 }));

        let other = ProbeError::from_io(7, io::Error::from_raw_os_error(libc::EINVAL));
        assert!(matches!(other, ProbeError::Io { pid: 7, .. }));
    }

    #[test]
    fn missing_proc_entry_means_vanished() {
        let err = ProbeError::from_procfs(9, procfs::ProcError::NotFound(None));
        assert!(matches!(err, ProbeError::Vanished { pid: 9 }));
        assert_eq!(err.pid(), 9);
    }
}
