use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

/// Cloneable in-memory output sink.
///
/// The engine takes ownership of its sink, so keep a clone and read the
/// bytes back once the writer is closed.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.borrow().is_empty()
    }

    /// Copy of everything written so far.
    pub fn to_vec(&self) -> Vec<u8> {
        self.buf.borrow().clone()
    }

    /// Move the written bytes out, leaving the sink empty.
    pub fn take(&self) -> Vec<u8> {
        core::mem::take(&mut *self.buf.borrow_mut())
    }
}

impl Write for MemorySink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
