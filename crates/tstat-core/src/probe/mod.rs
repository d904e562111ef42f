//! Low-level readers for kernel-exported measurements.
//!
//! Everything here returns [`ProbeError`]; a file that doesn't exist maps to
//! [`ProbeError::NoData`] so absent hardware reads as "no data" rather than
//! an I/O failure.

mod meminfo;

use std::fs;
use std::io;
use std::path::Path;

pub use meminfo::MemInfo;

use crate::error::ProbeError;

/// Reads a small text file, trimming surrounding whitespace.
///
/// # Errors
/// `NoData` if the file is missing, `Io` for other read failures.
pub fn read_trimmed(path: &Path) -> Result<String, ProbeError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(contents.trim().to_string()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Err(ProbeError::no_data(format!(
            "{} not found",
            path.display()
        ))),
        Err(err) => Err(ProbeError::Io(err)),
    }
}

/// Parses the first whitespace-separated field of a file as a finite number.
///
/// # Errors
/// As [`read_trimmed`], plus `Parse` when the field is missing, not numeric,
/// or `nan`/`inf`.
pub fn first_field(path: &Path) -> Result<f64, ProbeError> {
    let contents = read_trimmed(path)?;
    let field = contents
        .split_whitespace()
        .next()
        .ok_or_else(|| ProbeError::parse(format!("{} is empty", path.display())))?;
    let value: f64 = field
        .parse()
        .map_err(|e| ProbeError::parse(format!("{} in {}: {e}", field, path.display())))?;
    if !value.is_finite() {
        return Err(ProbeError::parse(format!(
            "non-finite reading {field} in {}",
            path.display()
        )));
    }
    Ok(value)
}

/// Size and free space of a filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsUsage {
    pub total_bytes: u64,
    pub free_bytes: u64,
}

/// Queries the filesystem containing `path`.
///
/// # Errors
/// `Io` if `statvfs` fails.
#[cfg(unix)]
pub fn filesystem_usage(path: &Path) -> Result<FsUsage, ProbeError> {
    use std::ffi::CString;
    use std::mem::MaybeUninit;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| ProbeError::parse(format!("invalid path: {e}")))?;
    let mut stat = MaybeUninit::<libc::statvfs>::uninit();
    // SAFETY: c_path is NUL-terminated and stat is writable storage for one statvfs.
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), stat.as_mut_ptr()) };
    if rc != 0 {
        return Err(ProbeError::Io(io::Error::last_os_error()));
    }
    // SAFETY: statvfs returned 0, so the struct is initialised.
    let stat = unsafe { stat.assume_init() };

    #[allow(clippy::unnecessary_cast)]
    let (blocks, free, frsize) = (
        stat.f_blocks as u64,
        stat.f_bfree as u64,
        stat.f_frsize as u64,
    );
    Ok(FsUsage {
        total_bytes: blocks.saturating_mul(frsize),
        free_bytes: free.saturating_mul(frsize),
    })
}

#[cfg(not(unix))]
pub fn filesystem_usage(_path: &Path) -> Result<FsUsage, ProbeError> {
    Err(ProbeError::no_data("statvfs unavailable on this platform"))
}

/// One-minute load average from the C library.
///
/// # Errors
/// `NoData` if the platform can't report it.
#[cfg(unix)]
pub fn load_average() -> Result<f64, ProbeError> {
    let mut loads = [0f64; 3];
    // SAFETY: the buffer holds the 3 samples requested.
    let filled = unsafe { libc::getloadavg(loads.as_mut_ptr(), 3) };
    if filled < 1 {
        return Err(ProbeError::no_data("getloadavg returned no samples"));
    }
    Ok(loads[0])
}

#[cfg(not(unix))]
pub fn load_average() -> Result<f64, ProbeError> {
    Err(ProbeError::no_data("load average unavailable on this platform"))
}
