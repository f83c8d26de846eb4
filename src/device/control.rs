use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::protocol::stream::Command;

/// Transport for stream device commands.
///
/// `payload` is exactly [`Command::payload_len`] bytes. Read-write
/// commands overwrite it with the reply. The returned value is the
/// command's non-negative result, the new stream index for add commands.
pub trait ControlChannel: Send {
    /// Issue one command.
    ///
    /// # Errors
    /// Returns the OS error the device reported.
    fn execute(&mut self, command: Command, payload: &mut [u8]) -> io::Result<u32>;
}

impl<C: ControlChannel + ?Sized> ControlChannel for Box<C> {
    fn execute(&mut self, command: Command, payload: &mut [u8]) -> io::Result<u32> {
        (**self).execute(command, payload)
    }
}

/// The stream device node, driven with `ioctl`.
#[derive(Debug)]
pub struct DeviceFile {
    file: File,
    path: PathBuf,
}

impl DeviceFile {
    /// Open the device node for reading and writing.
    ///
    /// # Errors
    /// Returns the error from opening the node.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        Ok(Self { file, path })
    }

    /// Path of the device node.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
impl ControlChannel for DeviceFile {
    fn execute(&mut self, command: Command, payload: &mut [u8]) -> io::Result<u32> {
        use std::os::fd::AsRawFd;

        if payload.len() != command.payload_len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "{command} expects {} payload bytes, got {}",
                    command.payload_len(),
                    payload.len()
                ),
            ));
        }

        let code = command.code().as_raw();
        // SAFETY: `payload` is an exclusively borrowed buffer of exactly the
        // size encoded in `code`, so the kernel stays within its bounds.
        let ret = unsafe { libc::ioctl(self.file.as_raw_fd(), code as _, payload.as_mut_ptr()) };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(ret.unsigned_abs())
    }
}
