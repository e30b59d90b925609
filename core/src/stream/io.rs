// ## src/stream/io.rs
// ## Host I/O capabilities + in-process pipe

use std::io::{self, Read, Write};
use std::path::PathBuf;

use bytes::Bytes;
use crossbeam::channel::{bounded, Receiver, Sender};

use crate::types::BridgeError;

/// Blocking readable byte source provided by the host.
pub trait HostSource: Send + 'static {
    /// Read at most `max` bytes. `Ok(None)` means end of data.
    fn read_some(&mut self, max: usize) -> io::Result<Option<Bytes>>;

    fn close(&mut self) -> io::Result<()>;
}

/// Blocking writable byte sink provided by the host.
pub trait HostSink: Send + 'static {
    fn write_some(&mut self, data: &[u8]) -> io::Result<()>;

    fn close(&mut self) -> io::Result<()>;
}

impl<T: HostSource + ?Sized> HostSource for Box<T> {
    fn read_some(&mut self, max: usize) -> io::Result<Option<Bytes>> {
        (**self).read_some(max)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl<T: HostSink + ?Sized> HostSink for Box<T> {
    fn write_some(&mut self, data: &[u8]) -> io::Result<()> {
        (**self).write_some(data)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

// ================= std adapters =================

/// Any `Read` as a [`HostSource`]. Closing drops the reader.
pub struct ReaderSource<R: Read + Send + 'static> {
    inner: Option<R>,
}

impl<R: Read + Send + 'static> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self { inner: Some(reader) }
    }
}

impl<R: Read + Send + 'static> HostSource for ReaderSource<R> {
    fn read_some(&mut self, max: usize) -> io::Result<Option<Bytes>> {
        let reader = match self.inner.as_mut() {
            Some(r) => r,
            None => return Ok(None),
        };
        if max == 0 {
            return Ok(Some(Bytes::new()));
        }

        let mut buf = vec![0u8; max];
        let n = loop {
            match reader.read(&mut buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(Bytes::from(buf)))
    }

    fn close(&mut self) -> io::Result<()> {
        self.inner = None;
        Ok(())
    }
}

/// Any `Write` as a [`HostSink`]. Closing flushes, then drops the writer.
pub struct WriterSink<W: Write + Send + 'static> {
    inner: Option<W>,
}

impl<W: Write + Send + 'static> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { inner: Some(writer) }
    }
}

impl<W: Write + Send + 'static> HostSink for WriterSink<W> {
    fn write_some(&mut self, data: &[u8]) -> io::Result<()> {
        match self.inner.as_mut() {
            Some(w) => w.write_all(data),
            None => Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed")),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        match self.inner.take() {
            Some(mut w) => w.flush(),
            None => Ok(()),
        }
    }
}

/// Canonical input abstraction
pub enum InputSource {
    Reader(Box<dyn Read + Send>),
    File(PathBuf),
    Memory(Vec<u8>),
}

/// Normalize an input source into a boxed host source
pub fn open_input(src: InputSource) -> Result<Box<dyn HostSource>, BridgeError> {
    let source: Box<dyn HostSource> = match src {
        InputSource::Reader(r) => Box::new(ReaderSource::new(r)),
        InputSource::File(p) => Box::new(ReaderSource::new(std::fs::File::open(p)?)),
        InputSource::Memory(b) => Box::new(ReaderSource::new(io::Cursor::new(b))),
    };
    Ok(source)
}

// ================= Pipe =================

/// Bounded chunk pipe: the pump writes, the consumer reads.
/// A full pipe blocks the writer until the consumer catches up.
pub fn pipe(capacity: usize) -> (PipeWriter, PipeReader) {
    let (tx, rx) = bounded(capacity);
    (PipeWriter { tx: Some(tx) }, PipeReader { rx, pending: Bytes::new() })
}

pub struct PipeWriter {
    tx: Option<Sender<Bytes>>,
}

impl HostSink for PipeWriter {
    fn write_some(&mut self, data: &[u8]) -> io::Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "pipe writer closed"))?;
        tx.send(Bytes::copy_from_slice(data))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "pipe reader dropped"))
    }

    fn close(&mut self) -> io::Result<()> {
        self.tx = None;
        Ok(())
    }
}

pub struct PipeReader {
    rx: Receiver<Bytes>,
    pending: Bytes,
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pending.is_empty() {
            match self.rx.recv() {
                Ok(chunk) => self.pending = chunk,
                // Writer closed and every chunk consumed.
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending.split_to(n));
        Ok(n)
    }
}
