//! Disk images and block devices on Linux.

use ap_storage::{msg2err, Error, Offset, Read};
use std::fs::File;
use std::os::fd::AsRawFd;

/// A read-only disk backed by a file in Linux.
pub struct LinuxDisk {
    file: File,
    offset: u64,
    len: u64,
}

impl LinuxDisk {
    /// Open a disk starting at the given offset into the file.
    pub fn new(filename: &str, offset: u64) -> Result<Self, Error> {
        let file = File::open(filename).map_err(|e| msg2err!("open").context(e))?;
        // block devices report a zero length in the metadata
        let len = match file.metadata()?.len() {
            0 => seek_end(&file)?,
            n => n,
        };
        Ok(Self {
            file,
            offset,
            len: len.saturating_sub(offset),
        })
    }

    /// The bytes after the offset.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn seek_end(file: &File) -> Result<u64, Error> {
    let res = unsafe { libc::lseek(file.as_raw_fd(), 0, libc::SEEK_END) };
    if res == -1 {
        return Err(std::io::Error::last_os_error().into());
    }
    Ok(res as u64)
}

impl Read for LinuxDisk {
    fn read_bytes(&self, offset: Offset, buf: &mut [u8]) -> Result<usize, Error> {
        let pos = self
            .offset
            .checked_add(offset)
            .and_then(|p| i64::try_from(p).ok())
            .ok_or(msg2err!("offset out of range"))?;
        let res = unsafe {
            libc::pread(
                self.file.as_raw_fd(),
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len(),
                pos,
            )
        };
        if res == -1 {
            return Err(std::io::Error::last_os_error().into());
        }
        Ok(res as usize)
    }
}
