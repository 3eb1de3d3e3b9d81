#![no_std]

extern crate alloc;

mod chip;
mod driver;
#[cfg(test)]
mod mock;
mod notify;
mod packet;
mod player;
mod serial;
mod transaction;
pub mod types;


pub trait Encode {
    type Error;

    fn encode(&self, buffer: &mut [u8]) -> Result<(), Self::Error>;
}

pub trait Decode<'a> where Self: Sized {
    type Error;

    fn decode(data: &'a [u8]) -> Result<Self, Self::Error>;
}

pub use chip::{Chip, CustomChip};
pub use driver::{Config, Driver, DEFAULT_ACK_TIMEOUT_MS, DEFAULT_DRAINS_PER_POLL, DEFAULT_RETRIES};
pub use notify::{ErrorHandler, Handlers, Notification, NotificationQueue, PlayFinishedHandler, SourceEventHandler};
pub use packet::{checksum, Frame, FrameError, Reply, FRAME_SIZE, FRAME_SIZE_NO_CHECKSUM};
pub use serial::{BufferedRx, Clock, IoError, IoStream, SerialStream, Stream, DEFAULT_TIMEOUT_MS};
pub use transaction::{Engine, Outcome, NO_ACK_TIMEOUT_MS};
pub use types::{
    Equalizer, ErrorCode, PlaySources, PlaybackMode, Source, SourceEvent, Status, StatusSource, StatusState,
};
