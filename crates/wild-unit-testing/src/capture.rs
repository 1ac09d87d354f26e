//! Standard stream capture.
//!
//! Capture works at the file-descriptor level: the stream's descriptor is
//! duplicated, an anonymous temporary file is `dup2`-ed over it, and the saved
//! descriptor is put back afterwards. Anything writing to descriptor 1 or 2
//! (Rust `print!`, C `printf`, child processes) lands in the capture.
//!
//! The redirection is process-global, so every capture runs under the owning
//! recorder's guard, which always includes the global recorder's. Nothing is
//! logged while a stream is redirected.

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::CaptureError;
use crate::recorder::{Recorder, global_recorder};

/// One of the process's standard output streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StdStream {
    Stdout,
    Stderr,
}

impl StdStream {
    const fn fd(self) -> RawFd {
        match self {
            Self::Stdout => libc::STDOUT_FILENO,
            Self::Stderr => libc::STDERR_FILENO,
        }
    }

    fn flush(self) {
        let _ = match self {
            Self::Stdout => io::stdout().flush(),
            Self::Stderr => io::stderr().flush(),
        };
        sys::flush_c_stdio();
    }
}

impl fmt::Display for StdStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        })
    }
}

/// Redirections currently in place. Only touched under the global guard.
static ACTIVE_REDIRECTIONS: AtomicUsize = AtomicUsize::new(0);

/// An active redirection. Dropping it restores the stream.
struct Redirection {
    stream: StdStream,
    saved: Option<OwnedFd>,
    file: File,
}

impl Redirection {
    fn begin(stream: StdStream) -> Result<Self, CaptureError> {
        let redirect_err = |source| CaptureError::Redirect { stream, source };

        stream.flush();
        let file = tempfile::tempfile().map_err(redirect_err)?;
        let saved = sys::dup(stream.fd()).map_err(redirect_err)?;

        if ACTIVE_REDIRECTIONS.load(Ordering::Relaxed) == 0 {
            tracing::debug!(%stream, "redirecting stream");
        }
        sys::dup2(file.as_raw_fd(), stream.fd()).map_err(redirect_err)?;
        ACTIVE_REDIRECTIONS.fetch_add(1, Ordering::Relaxed);
        Ok(Self {
            stream,
            saved: Some(saved),
            file,
        })
    }

    fn restore(&mut self) -> Result<(), CaptureError> {
        let Some(saved) = self.saved.take() else {
            return Ok(());
        };
        self.stream.flush();
        sys::dup2(saved.as_raw_fd(), self.stream.fd()).map_err(|source| {
            CaptureError::Restore {
                stream: self.stream,
                source,
            }
        })?;
        if ACTIVE_REDIRECTIONS.fetch_sub(1, Ordering::Relaxed) == 1 {
            tracing::debug!(stream = %self.stream, "stream restored");
        }
        Ok(())
    }

    fn finish(mut self) -> Result<String, CaptureError> {
        self.restore()?;
        let mut bytes = Vec::new();
        self.file.seek(SeekFrom::Start(0))?;
        self.file.read_to_end(&mut bytes)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl Drop for Redirection {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            tracing::warn!(error = %err, "failed to restore redirected stream");
        }
    }
}

impl Recorder {
    /// Run `code` with `stream` redirected into a buffer and return its value
    /// together with everything it wrote.
    ///
    /// Holds the recorder's guard for the whole call, so captures on
    /// different recorders never overlap. The stream is restored before this
    /// returns, and also when `code` panics (the panic then
    /// continues to unwind).
    pub fn capture<R>(
        &self,
        stream: StdStream,
        code: impl FnOnce() -> R,
    ) -> Result<(R, String), CaptureError> {
        let _guard = self.lock();
        let redirection = Redirection::begin(stream)?;
        let value = code();
        let text = redirection.finish()?;
        Ok((value, text))
    }
}

/// [`Recorder::capture`] of standard output on the global recorder.
pub fn capture_stdout<R>(code: impl FnOnce() -> R) -> Result<(R, String), CaptureError> {
    global_recorder().capture(StdStream::Stdout, code)
}

/// [`Recorder::capture`] of standard error on the global recorder.
pub fn capture_stderr<R>(code: impl FnOnce() -> R) -> Result<(R, String), CaptureError> {
    global_recorder().capture(StdStream::Stderr, code)
}

#[allow(unsafe_code)]
mod sys {
    use std::io;
    use std::os::fd::{FromRawFd, OwnedFd, RawFd};

    pub(super) fn dup(fd: RawFd) -> io::Result<OwnedFd> {
        // SAFETY: dup only reads the descriptor table; no memory is passed.
        let rc = unsafe { libc::dup(fd) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: rc is a freshly allocated descriptor that nothing else owns.
        Ok(unsafe { OwnedFd::from_raw_fd(rc) })
    }

    pub(super) fn dup2(src: RawFd, dst: RawFd) -> io::Result<()> {
        loop {
            // SAFETY: dup2 only touches the descriptor table; no memory is passed.
            let rc = unsafe { libc::dup2(src, dst) };
            if rc >= 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }

    pub(super) fn flush_c_stdio() {
        // SAFETY: fflush(NULL) flushes every open C stdio stream.
        unsafe {
            libc::fflush(std::ptr::null_mut());
        }
    }
}
