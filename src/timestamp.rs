//! Stamp a freshly downloaded file with the current time.
//!
//! Access and modification times are set through `std` on every platform.
//! Windows also has a creation time, which is set through a separate handle
//! and is allowed to fail.

use crate::error::Result;
use std::fs::FileTimes;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// 100ns intervals between 1601-01-01 and 1970-01-01.
pub const FILETIME_UNIX_OFFSET: u64 = 116_444_736_000_000_000;

/// Convert to a Windows FILETIME tick count (100ns since 1601-01-01).
pub fn filetime_ticks(time: SystemTime) -> u64 {
    let since_unix = time.duration_since(UNIX_EPOCH).unwrap_or_default();
    FILETIME_UNIX_OFFSET
        + since_unix.as_secs() * 10_000_000
        + u64::from(since_unix.subsec_nanos() / 100)
}

/// Set access and modification time of `path` to now, plus creation time
/// where the platform has one.
pub fn touch(path: &Path) -> Result<()> {
    let now = SystemTime::now();
    let times = FileTimes::new().set_accessed(now).set_modified(now);
    platform::open(path)?.set_times(times)?;
    if let Err(err) = platform::set_created(path, now) {
        tracing::warn!("could not set creation time of {}: {}", path.display(), err);
    }
    Ok(())
}

#[cfg(not(windows))]
mod platform {
    use std::fs::File;
    use std::io;
    use std::path::Path;
    use std::time::SystemTime;

    pub fn open(path: &Path) -> io::Result<File> {
        File::open(path)
    }

    pub fn set_created(_path: &Path, _time: SystemTime) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(windows)]
mod platform {
    use std::fs::{File, OpenOptions};
    use std::io;
    use std::os::windows::fs::OpenOptionsExt;
    use std::os::windows::io::AsRawHandle;
    use std::path::Path;
    use std::ptr;
    use std::time::SystemTime;
    use winapi::shared::minwindef::FILETIME;
    use winapi::um::fileapi::SetFileTime;
    use winapi::um::winnt::{FILE_WRITE_ATTRIBUTES, HANDLE};

    pub fn open(path: &Path) -> io::Result<File> {
        OpenOptions::new().access_mode(FILE_WRITE_ATTRIBUTES).open(path)
    }

    pub fn set_created(path: &Path, time: SystemTime) -> io::Result<()> {
        let file = open(path)?;
        let ticks = super::filetime_ticks(time);
        let created = FILETIME {
            dwLowDateTime: ticks as u32,
            dwHighDateTime: (ticks >> 32) as u32,
        };
        // SAFETY: the handle is owned by `file` and outlives the call.
        let ok = unsafe {
            SetFileTime(file.as_raw_handle() as HANDLE, &created, ptr::null(), ptr::null())
        };
        if ok == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;

    #[test]
    fn filetime_epoch_offset() {
        assert_eq!(filetime_ticks(UNIX_EPOCH), FILETIME_UNIX_OFFSET);
        let later = UNIX_EPOCH + Duration::new(1, 500);
        assert_eq!(filetime_ticks(later), FILETIME_UNIX_OFFSET + 10_000_005);
    }

    #[test]
    fn touch_sets_modified_to_now() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("video.mp4");
        let file = File::create(&path).unwrap();
        let old = SystemTime::now() - Duration::from_secs(86_400);
        file.set_times(FileTimes::new().set_accessed(old).set_modified(old))
            .unwrap();
        drop(file);

        let before = SystemTime::now();
        touch(&path).unwrap();

        let modified = std::fs::metadata(&path).unwrap().modified().unwrap();
        let drift = match modified.duration_since(before) {
            Ok(d) => d,
            Err(e) => e.duration(),
        };
        assert!(drift < Duration::from_secs(2), "drift was {:?}", drift);
    }

    #[test]
    fn touch_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(touch(&dir.path().join("missing.mp4")).is_err());
    }
}
