use alloc::collections::VecDeque;

use embedded_hal_nb::serial::{self, Error as _};
use log::warn;

/// Monotonic millisecond clock, used to bound blocking reads.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

impl<F: Fn() -> u64> Clock for F {
    fn now_ms(&self) -> u64 {
        self()
    }
}

/// The byte stream the driver talks over.
///
/// Reads block for at most the configured timeout and may return fewer bytes
/// than asked for. `discard` throws away anything buffered but unread.
pub trait Stream {
    type Error: embedded_io::Error;

    /// Bytes that can be read right now without waiting.
    fn available(&mut self) -> usize;

    fn set_timeout(&mut self, timeout_ms: u32);

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    fn write_bytes(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    fn discard(&mut self);
}

impl<S: Stream + ?Sized> Stream for &mut S {
    type Error = S::Error;

    fn available(&mut self) -> usize {
        (**self).available()
    }

    fn set_timeout(&mut self, timeout_ms: u32) {
        (**self).set_timeout(timeout_ms)
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        (**self).read_bytes(buf)
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        (**self).write_bytes(data)
    }

    fn discard(&mut self) {
        (**self).discard()
    }
}

/// Arduino style default
pub const DEFAULT_TIMEOUT_MS: u32 = 1000;

#[derive(Debug)]
pub struct BufferedRx<Rx: serial::Read> {
    pub rx: Rx,
    pub buf: VecDeque<u8>,
}

impl<Rx: serial::Read> BufferedRx<Rx> {
    pub fn new(rx: Rx) -> BufferedRx<Rx> {
        BufferedRx {
            rx,
            buf: VecDeque::new(),
        }
    }

    /// Load as much as we can from rx into the internal buf.
    /// TODO a flood of input on rx keeps this from ever returning.
    pub fn buffer(&mut self) -> Result<(), Rx::Error> {
        loop {
            match self.rx.read() {
                Ok(c) => self.buf.push_back(c),
                Err(nb::Error::WouldBlock) => return Ok(()),
                Err(nb::Error::Other(e)) => return Err(e),
            }
        }
    }

    /// Move buffered bytes into `out`, returns how many were moved.
    pub fn take(&mut self, out: &mut [u8]) -> usize {
        let amount = out.len().min(self.buf.len());
        for (dst, src) in out.iter_mut().zip(self.buf.drain(0..amount)) {
            *dst = src;
        }
        amount
    }
}

/// Transport error from one of the two serial halves.
#[derive(Debug)]
pub enum IoError<WriteError, ReadError> {
    Write(WriteError),
    Read(ReadError),
}

fn io_kind(kind: serial::ErrorKind) -> embedded_io::ErrorKind {
    use embedded_hal_nb::serial::ErrorKind::*;
    match kind {
        Overrun => embedded_io::ErrorKind::OutOfMemory,
        FrameFormat => embedded_io::ErrorKind::InvalidData,
        Parity => embedded_io::ErrorKind::InvalidData,
        _ => embedded_io::ErrorKind::Other,
    }
}

impl<Ew: serial::Error, Er: serial::Error> embedded_io::Error for IoError<Ew, Er> {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            IoError::Write(e) => io_kind(e.kind()),
            IoError::Read(e) => io_kind(e.kind()),
        }
    }
}

/// [`Stream`] over a pair of non-blocking serial halves.
#[derive(Debug)]
pub struct SerialStream<Tx: serial::Write, Rx: serial::Read, C: Clock> {
    tx: Tx,
    rx: BufferedRx<Rx>,
    clock: C,
    timeout_ms: u32,
}

impl<Tx: serial::Write, Rx: serial::Read, C: Clock> SerialStream<Tx, Rx, C> {
    pub fn new(tx: Tx, rx: Rx, clock: C) -> SerialStream<Tx, Rx, C> {
        SerialStream {
            tx,
            rx: BufferedRx::new(rx),
            clock,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Give back the serial halves. Anything still buffered is lost.
    pub fn split(self) -> (Tx, Rx) {
        (self.tx, self.rx.rx)
    }
}

impl<Tx: serial::Write, Rx: serial::Read, C: Clock> Stream for SerialStream<Tx, Rx, C> {
    type Error = IoError<Tx::Error, Rx::Error>;

    fn available(&mut self) -> usize {
        if let Err(e) = self.rx.buffer() {
            warn!("serial read failed: {:?}", e.kind());
        }
        self.rx.buf.len()
    }

    fn set_timeout(&mut self, timeout_ms: u32) {
        self.timeout_ms = timeout_ms;
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let start = self.clock.now_ms();
        let mut filled = 0;
        loop {
            self.rx.buffer().map_err(IoError::Read)?;
            filled += self.rx.take(&mut buf[filled..]);
            let elapsed = self.clock.now_ms().saturating_sub(start);
            if filled == buf.len() || elapsed >= u64::from(self.timeout_ms) {
                return Ok(filled);
            }
        }
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        for b in data {
            nb::block!(self.tx.write(*b)).map_err(IoError::Write)?;
        }
        nb::block!(self.tx.flush()).map_err(IoError::Write)
    }

    fn discard(&mut self) {
        if let Err(e) = self.rx.buffer() {
            warn!("serial read failed: {:?}", e.kind());
        }
        self.rx.buf.clear();
    }
}

/// [`Stream`] over a blocking `embedded-io` port that can report readiness.
#[derive(Debug)]
pub struct IoStream<P, C: Clock> {
    port: P,
    clock: C,
    timeout_ms: u32,
    buf: VecDeque<u8>,
}

impl<P, C> IoStream<P, C>
where
    P: embedded_io::Read + embedded_io::Write + embedded_io::ReadReady,
    C: Clock,
{
    pub fn new(port: P, clock: C) -> IoStream<P, C> {
        IoStream {
            port,
            clock,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            buf: VecDeque::new(),
        }
    }

    pub fn release(self) -> P {
        self.port
    }

    /// Read whatever the port has ready without blocking.
    fn pull(&mut self) -> Result<(), P::Error> {
        let mut chunk = [0; 16];
        while self.port.read_ready()? {
            let n = self.port.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            self.buf.extend(chunk[..n].iter().copied());
        }
        Ok(())
    }
}

impl<P, C> Stream for IoStream<P, C>
where
    P: embedded_io::Read + embedded_io::Write + embedded_io::ReadReady,
    C: Clock,
{
    type Error = P::Error;

    fn available(&mut self) -> usize {
        if let Err(e) = self.pull() {
            warn!("port read failed: {:?}", embedded_io::Error::kind(&e));
        }
        self.buf.len()
    }

    fn set_timeout(&mut self, timeout_ms: u32) {
        self.timeout_ms = timeout_ms;
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let start = self.clock.now_ms();
        let mut filled = 0;
        loop {
            self.pull()?;
            let amount = (buf.len() - filled).min(self.buf.len());
            for (dst, src) in buf[filled..].iter_mut().zip(self.buf.drain(0..amount)) {
                *dst = src;
            }
            filled += amount;
            let elapsed = self.clock.now_ms().saturating_sub(start);
            if filled == buf.len() || elapsed >= u64::from(self.timeout_ms) {
                return Ok(filled);
            }
        }
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.port.write_all(data)?;
        self.port.flush()
    }

    fn discard(&mut self) {
        if let Err(e) = self.pull() {
            warn!("port read failed: {:?}", embedded_io::Error::kind(&e));
        }
        self.buf.clear();
    }
}
