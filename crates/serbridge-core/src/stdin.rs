//! Standard input as the bridge sees it: something that may or may not be a
//! pipe, read at most once.

use std::io;

pub trait Input {
    /// Whether the input is an anonymous pipe rather than a terminal, a
    /// regular file or nothing at all.
    fn is_pipe(&self) -> io::Result<bool>;

    /// A single unbuffered read.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// The process's real standard input.
#[derive(Debug, Default, Clone, Copy)]
pub struct Stdin;

#[cfg(unix)]
mod imp {
    use std::fs::File;
    use std::io::{self, Read};
    use std::os::fd::AsFd;
    use std::os::unix::fs::FileTypeExt;

    pub fn is_pipe<F: AsFd>(stream: &F) -> io::Result<bool> {
        let file = File::from(stream.as_fd().try_clone_to_owned()?);
        Ok(file.metadata()?.file_type().is_fifo())
    }

    // Bypasses std's stdin buffer so no more than `buf.len()` bytes leave the pipe.
    pub fn read(buf: &mut [u8]) -> io::Result<usize> {
        let mut file = File::from(io::stdin().as_fd().try_clone_to_owned()?);
        file.read(buf)
    }
}

#[cfg(windows)]
mod imp {
    use std::fs::File;
    use std::io::{self, Read};
    use std::os::windows::io::{AsHandle, AsRawHandle};
    use windows_sys::Win32::Storage::FileSystem::{GetFileType, FILE_TYPE_PIPE, FILE_TYPE_UNKNOWN};

    pub fn is_pipe<F: AsHandle>(stream: &F) -> io::Result<bool> {
        let handle = stream.as_handle().as_raw_handle();
        if handle.is_null() {
            return Ok(false);
        }
        // SAFETY: the handle is borrowed from `stream` and outlives the call.
        let kind = unsafe { GetFileType(handle) };
        if kind == FILE_TYPE_UNKNOWN {
            let err = io::Error::last_os_error();
            if err.raw_os_error() != Some(0) {
                return Err(err);
            }
        }
        Ok(kind == FILE_TYPE_PIPE)
    }

    pub fn read(buf: &mut [u8]) -> io::Result<usize> {
        let mut file = File::from(io::stdin().as_handle().try_clone_to_owned()?);
        file.read(buf)
    }
}

#[cfg(not(any(unix, windows)))]
mod imp {
    use std::io::{self, Read};

    pub fn is_pipe<F>(_stream: &F) -> io::Result<bool> {
        Ok(false)
    }

    pub fn read(buf: &mut [u8]) -> io::Result<usize> {
        io::stdin().lock().read(buf)
    }
}

pub use imp::is_pipe;

impl Input for Stdin {
    fn is_pipe(&self) -> io::Result<bool> {
        imp::is_pipe(&io::stdin())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        imp::read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::{Command, Stdio};

    #[cfg(unix)]
    fn quiet_child() -> Command {
        Command::new("true")
    }

    #[cfg(windows)]
    fn quiet_child() -> Command {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "exit"]);
        cmd
    }

    #[cfg(any(unix, windows))]
    #[test]
    fn child_stdout_is_a_pipe() {
        let mut child = quiet_child().stdout(Stdio::piped()).spawn().unwrap();
        let stdout = child.stdout.take().unwrap();
        assert!(is_pipe(&stdout).unwrap());
        child.wait().unwrap();
    }

    #[test]
    fn regular_file_is_not_a_pipe() {
        let file = tempfile::tempfile().unwrap();
        assert!(!is_pipe(&file).unwrap());
    }
}
