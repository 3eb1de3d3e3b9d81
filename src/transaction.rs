use embedded_io::Error as _;
use log::{debug, trace, warn};

use crate::{
    Decode, Encode,
    chip::Chip,
    notify::NotificationQueue,
    packet::{FRAME_SIZE, Frame, FrameError, Reply},
    serial::Stream,
    types::reply,
};

/// Wait used when the chip won't answer a command with an ack. About 30ms
/// has been observed, plus some headroom.
pub const NO_ACK_TIMEOUT_MS: u32 = 50;

/// How a transaction finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The stop condition for the chip was met with this reply
    Confirmed(Reply),
    /// Nothing confirmed the command, this is the last reply seen if any
    Unconfirmed(Option<Reply>),
    /// The module answered the last attempt with this error code
    DeviceError(u16),
}

impl Outcome {
    /// The reply handed back to callers. Device errors never count as data.
    pub fn reply(&self) -> Option<Reply> {
        match self {
            Outcome::Confirmed(r) => Some(*r),
            Outcome::Unconfirmed(r) => *r,
            Outcome::DeviceError(_) => None,
        }
    }
}

/// Sends commands, waits for their replies and parks any notifications that
/// arrive in between.
///
/// One transaction runs to completion before the next can start: the stream's
/// timeout and receive buffer are shared by every attempt.
#[derive(Debug)]
pub struct Engine<S: Stream> {
    stream: S,
    chip: Chip,
    retries: u8,
    ack_timeout_ms: u32,
    online: bool,
    queue: NotificationQueue,
}

impl<S: Stream> Engine<S> {
    pub fn new(stream: S, chip: Chip, retries: u8, ack_timeout_ms: u32) -> Engine<S> {
        Engine {
            stream,
            chip,
            retries,
            ack_timeout_ms,
            online: false,
            queue: NotificationQueue::new(),
        }
    }

    pub fn chip(&self) -> &Chip {
        &self.chip
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn into_stream(self) -> S {
        self.stream
    }

    pub fn retries(&self) -> u8 {
        self.retries
    }

    pub fn set_retries(&mut self, retries: u8) {
        self.retries = retries;
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Forget that the module was seen, until it announces a source again.
    pub fn clear_online(&mut self) {
        self.online = false;
    }

    pub fn queue(&self) -> &NotificationQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut NotificationQueue {
        &mut self.queue
    }

    /// Send `command` until the reply satisfies the chip's stop condition or
    /// the retries run out.
    ///
    /// Ack capable commands stop on a reply whose code is `expected`. Other
    /// commands stop on anything but an explicit error, since such chips
    /// don't reliably echo the command code.
    pub fn execute(&mut self, command: u8, expected: u8, arg: u16, request_ack: bool) -> Outcome {
        let supports_ack = self.chip.command_supports_ack(command);
        let timeout = if supports_ack {
            self.ack_timeout_ms
        } else {
            NO_ACK_TIMEOUT_MS
        };
        self.stream.set_timeout(timeout);

        let attempts = self.retries.max(1);
        let mut last = None;
        for attempt in 1..=attempts {
            self.send(command, arg, request_ack);
            last = self.listen(Some(expected), true);

            let done = match last {
                Some(r) if supports_ack => r.command == expected,
                Some(r) => r.command != reply::ERROR,
                None => !supports_ack,
            };
            if done {
                return match last {
                    Some(r) => Outcome::Confirmed(r),
                    None => Outcome::Unconfirmed(None),
                };
            }
            debug!(
                "command {:02X} attempt {}/{} got {:?}",
                command, attempt, attempts, last
            );
        }

        match last {
            Some(r) if r.command == reply::ERROR => {
                warn!("command {:02X} failed with device error {}", command, r.arg);
                Outcome::DeviceError(r.arg)
            }
            other => {
                warn!("command {:02X} unconfirmed", command);
                Outcome::Unconfirmed(other)
            }
        }
    }

    fn send(&mut self, command: u8, arg: u16, request_ack: bool) {
        let frame = self.chip.tx_frame(command, arg, request_ack);
        let mut buf = [0; FRAME_SIZE];
        if let Err(e) = frame.encode(&mut buf) {
            warn!("encode failed: {:?}", e);
            return;
        }
        let out = &buf[..frame.len()];
        trace!("OUT {:02X?}", out);
        if let Err(e) = self.stream.write_bytes(out) {
            warn!("write failed: {:?}", e.kind());
        }
    }

    /// Read replies until one is for the caller.
    ///
    /// Notifications are queued and never returned. With `expected` set,
    /// errors, acks and anything else come back to the caller. Without it,
    /// errors are queued, everything else is dropped, and at most one frame
    /// is read.
    pub fn listen(&mut self, expected: Option<u8>, wait_for_data: bool) -> Option<Reply> {
        while let Some(r) = self.receive(wait_for_data) {
            if let Some(r) = self.route(r, expected) {
                return Some(r);
            }
            if expected.is_none() {
                break;
            }
        }
        None
    }

    fn route(&mut self, r: Reply, expected: Option<u8>) -> Option<Reply> {
        match r.command {
            reply::PLAY_SOURCE_INSERTED | reply::PLAY_SOURCE_REMOVED | reply::PLAY_SOURCE_ONLINE => {
                self.online = true;
                self.queue.push(r);
                None
            }
            reply::TRACK_FINISHED_USB | reply::TRACK_FINISHED_SD | reply::TRACK_FINISHED_FLASH => {
                self.queue.push(r);
                None
            }
            reply::ERROR if expected.is_none() => {
                self.queue.push(r);
                None
            }
            _ => expected.map(|_| r),
        }
    }

    /// One frame off the stream. Without `wait_for_data` nothing is read
    /// unless a whole frame is already waiting.
    pub fn receive(&mut self, wait_for_data: bool) -> Option<Reply> {
        let size = self.chip.rx_frame_size();
        if !wait_for_data && self.stream.available() < size {
            return None;
        }
        match self.read_frame(size) {
            Ok(r) => Some(r),
            Err(e) => {
                match e {
                    FrameError::Size { found: 0, .. } => trace!("no reply"),
                    e => warn!("dropped frame: {:?} ({:?})", e, e.code()),
                }
                if let FrameError::Header = e {
                    // Framing is lost, there is no resync so start over clean
                    self.stream.discard();
                }
                None
            }
        }
    }

    fn read_frame(&mut self, size: usize) -> Result<Reply, FrameError> {
        let mut buf = [0; FRAME_SIZE];
        let found = match self.stream.read_bytes(&mut buf[..size]) {
            Ok(n) => n,
            Err(e) => {
                warn!("read failed: {:?}", e.kind());
                0
            }
        };
        if found > 0 {
            trace!("IN {:02X?}", &buf[..found]);
        }
        if found < size {
            return Err(FrameError::Size {
                expected: size,
                found,
            });
        }
        let frame = Frame::decode(&buf[..size])?;
        frame.validate()?;
        Ok(frame.reply())
    }

    /// Non-blocking receive passes that move newly arrived notifications
    /// into the queue.
    pub fn drain(&mut self, passes: u8) {
        for _ in 0..passes {
            self.listen(None, false);
        }
    }
}
