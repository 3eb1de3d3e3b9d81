//! Scripted transport for driver tests.

use alloc::{collections::VecDeque, vec::Vec};

use embedded_io::ErrorKind;

use crate::{packet::Frame, serial::Stream};

/// Checksummed frame bytes as the module would send them.
pub fn frame(command: u8, arg: u16) -> Vec<u8> {
    Frame::new(command, arg, false, true).as_bytes().to_vec()
}

/// Stream whose receive side is fed by the test, either up front or in
/// answer to each write.
#[derive(Debug, Default)]
pub struct MockStream {
    pub rx: VecDeque<u8>,
    /// Every buffer passed to `write_bytes`, in order
    pub written: Vec<Vec<u8>>,
    /// Queued answers, one popped per write
    pub answers: VecDeque<Vec<u8>>,
    pub discards: usize,
    pub timeouts: Vec<u32>,
    pub fail_writes: bool,
}

impl MockStream {
    pub fn new() -> MockStream {
        MockStream::default()
    }

    /// Bytes that are already waiting.
    pub fn feed(&mut self, bytes: &[u8]) -> &mut Self {
        self.rx.extend(bytes.iter().copied());
        self
    }

    /// Bytes that arrive in answer to the next unanswered write. An empty
    /// answer means the module stays quiet.
    pub fn answer(&mut self, bytes: &[u8]) -> &mut Self {
        self.answers.push_back(bytes.to_vec());
        self
    }

    pub fn sends(&self) -> usize {
        self.written.len()
    }
}

impl Stream for MockStream {
    type Error = ErrorKind;

    fn available(&mut self) -> usize {
        self.rx.len()
    }

    fn set_timeout(&mut self, timeout_ms: u32) {
        self.timeouts.push(timeout_ms);
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = buf.len().min(self.rx.len());
        for (dst, src) in buf.iter_mut().zip(self.rx.drain(0..n)) {
            *dst = src;
        }
        Ok(n)
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        if self.fail_writes {
            return Err(ErrorKind::Other);
        }
        self.written.push(data.to_vec());
        if let Some(answer) = self.answers.pop_front() {
            self.rx.extend(answer);
        }
        Ok(())
    }

    fn discard(&mut self) {
        self.discards += 1;
        self.rx.clear();
    }
}
