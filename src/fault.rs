//! Fault boundary around engine calls.
//!
//! Every call into the `png` engine runs inside [`guard`]. A panic raised by
//! the engine, or by the sink it writes to, is caught there and turned into
//! [`PngWriteError::EngineFault`] for the stage that was running. Engine state
//! that is thrown away is dropped through [`release`], because dropping a
//! `png` writer may still write to the sink.
//!
//! The sink itself is wrapped in a [`GuardedSink`] before the engine sees it.
//! A sink panic is caught at the `write` call, so it never unwinds through the
//! engine, whose destructors would write to the same sink again.

use std::any::Any;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

use crate::error::{PngWriteError, Stage};

/// Run `f` with panics converted into [`PngWriteError::EngineFault`].
pub(crate) fn guard<T>(
    stage: Stage,
    f: impl FnOnce() -> Result<T, PngWriteError>,
) -> Result<T, PngWriteError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(PngWriteError::EngineFault {
            stage,
            message: panic_message(payload.as_ref()),
        }),
    }
}

/// Drop engine state without letting a panic escape.
pub(crate) fn release<T>(stage: Stage, resource: T) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || drop(resource))) {
        log::warn!(
            target: "zenpngwrite",
            "png engine panicked while releasing state after {stage}: {}",
            panic_message(payload.as_ref())
        );
    }
}

/// Send a failure to the diagnostic sink and hand it back.
pub(crate) fn report(err: PngWriteError) -> PngWriteError {
    log::error!(target: "zenpngwrite", "{err}");
    err
}

/// First panic raised by a wrapped sink, shared with the writer that owns it.
#[derive(Clone, Debug, Default)]
pub(crate) struct SinkFault(Arc<OnceLock<String>>);

impl SinkFault {
    pub(crate) fn wrap<W: Write>(&self, sink: W) -> GuardedSink<W> {
        GuardedSink {
            inner: Some(sink),
            fault: self.clone(),
        }
    }

    /// Turn the engine's report of a failed sink write back into the panic
    /// that caused it.
    pub(crate) fn resolve(&self, err: PngWriteError) -> PngWriteError {
        let Some(message) = self.0.get() else {
            return err;
        };
        match err {
            PngWriteError::Engine { stage, .. } | PngWriteError::Io { stage, .. } => {
                PngWriteError::EngineFault {
                    stage,
                    message: message.clone(),
                }
            }
            other => other,
        }
    }
}

/// `Write` adapter that converts sink panics into I/O errors.
///
/// After the first panic the sink is poisoned: every later call fails
/// without reaching it.
pub(crate) struct GuardedSink<W: Write> {
    inner: Option<W>,
    fault: SinkFault,
}

impl<W: Write> GuardedSink<W> {
    fn call<T>(&mut self, op: impl FnOnce(&mut W) -> io::Result<T>) -> io::Result<T> {
        if let Some(message) = self.fault.0.get() {
            return Err(io::Error::other(format!("sink is poisoned: {message}")));
        }
        let Some(inner) = self.inner.as_mut() else {
            return Err(io::Error::other("sink already released"));
        };
        match panic::catch_unwind(AssertUnwindSafe(|| op(inner))) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                let _ = self.fault.0.set(message.clone());
                Err(io::Error::other(format!("sink panicked: {message}")))
            }
        }
    }
}

impl<W: Write> Write for GuardedSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.call(|sink| sink.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.call(|sink| sink.flush())
    }
}

impl<W: Write> Drop for GuardedSink<W> {
    fn drop(&mut self) {
        if let Some(sink) = self.inner.take() {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || drop(sink))) {
                log::warn!(
                    target: "zenpngwrite",
                    "sink panicked while being dropped: {}",
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_results_through() {
        assert_eq!(guard(Stage::Rows, || Ok(7)).unwrap(), 7);
        let err = guard::<()>(Stage::Rows, || Err(PngWriteError::ProfileAlreadySet)).unwrap_err();
        assert!(matches!(err, PngWriteError::ProfileAlreadySet));
    }

    #[test]
    fn converts_panics() {
        let err = guard::<()>(Stage::Finalize, || panic!("deflate state corrupted")).unwrap_err();
        match err {
            PngWriteError::EngineFault { stage, message } => {
                assert_eq!(stage, Stage::Finalize);
                assert_eq!(message, "deflate state corrupted");
            }
            other => panic!("expected EngineFault, got {other:?}"),
        }

        let err = guard::<()>(Stage::Header, || panic!("{} rows", 3)).unwrap_err();
        assert!(matches!(err, PngWriteError::EngineFault { ref message, .. } if message == "3 rows"));
    }

    #[test]
    fn release_swallows_panicking_drop() {
        struct Bomb;
        impl Drop for Bomb {
            fn drop(&mut self) {
                panic!("boom");
            }
        }
        release(Stage::Rows, Bomb);
    }

    struct AlwaysPanics {
        calls: usize,
    }

    impl Write for AlwaysPanics {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            self.calls += 1;
            panic!("write #{}", self.calls);
        }

        fn flush(&mut self) -> io::Result<()> {
            panic!("flush");
        }
    }

    #[test]
    fn guarded_sink_poisons_after_first_panic() {
        let fault = SinkFault::default();
        let mut sink = fault.wrap(AlwaysPanics { calls: 0 });
        let first = sink.write(b"abc").unwrap_err();
        assert!(first.to_string().contains("write #1"));
        assert!(sink.write(b"abc").is_err());
        assert!(sink.flush().is_err());
        assert_eq!(sink.inner.as_ref().map(|s| s.calls), Some(1));

        let err = fault.resolve(PngWriteError::io(Stage::Rows)(first));
        assert!(matches!(
            err,
            PngWriteError::EngineFault { stage: Stage::Rows, ref message } if message == "write #1"
        ));
        assert!(matches!(
            fault.resolve(PngWriteError::ProfileAlreadySet),
            PngWriteError::ProfileAlreadySet
        ));
    }

    #[test]
    fn resolve_leaves_plain_io_errors() {
        let fault = SinkFault::default();
        let err = fault.resolve(PngWriteError::io(Stage::Header)(io::Error::other("full")));
        assert!(matches!(err, PngWriteError::Io { stage: Stage::Header, .. }));
    }

    #[test]
    fn guarded_sink_drop_contains_panicking_sink() {
        struct PanicOnDrop;
        impl Write for PanicOnDrop {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                Ok(buf.len())
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        impl Drop for PanicOnDrop {
            fn drop(&mut self) {
                panic!("drop");
            }
        }
        drop(SinkFault::default().wrap(PanicOnDrop));
    }
}
