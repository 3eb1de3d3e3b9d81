use alloc::{boxed::Box, collections::VecDeque};

use log::debug;

use crate::{
    packet::Reply,
    types::{PlaySources, SourceEvent, reply},
};

/// Device initiated replies waiting to be handed to the handlers, oldest
/// first.
#[derive(Debug, Default)]
pub struct NotificationQueue {
    entries: VecDeque<Reply>,
}

impl NotificationQueue {
    pub fn new() -> NotificationQueue {
        NotificationQueue::default()
    }

    pub fn push(&mut self, reply: Reply) {
        debug!("queued notification {:02X} {:04X}", reply.command, reply.arg);
        self.entries.push_back(reply);
    }

    pub fn pop(&mut self) -> Option<Reply> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reply> {
        self.entries.iter()
    }
}

/// A queued reply in the shape the handlers receive it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Notification {
    PlayFinished { source: PlaySources, track: u16 },
    Source { event: SourceEvent, sources: PlaySources },
    Error(u16),
}

impl Notification {
    /// `None` for codes that are not notifications.
    pub fn from_reply(r: Reply) -> Option<Notification> {
        let finished = |mask: u16| Notification::PlayFinished {
            source: PlaySources::from(mask),
            track: r.arg,
        };
        let source = |event: SourceEvent| Notification::Source {
            event,
            sources: PlaySources::from(r.arg),
        };
        match r.command {
            reply::TRACK_FINISHED_USB => Some(finished(PlaySources::USB)),
            reply::TRACK_FINISHED_SD => Some(finished(PlaySources::SD)),
            reply::TRACK_FINISHED_FLASH => Some(finished(PlaySources::FLASH)),
            reply::PLAY_SOURCE_INSERTED => Some(source(SourceEvent::Inserted)),
            reply::PLAY_SOURCE_REMOVED => Some(source(SourceEvent::Removed)),
            reply::PLAY_SOURCE_ONLINE => Some(source(SourceEvent::Online)),
            reply::ERROR => Some(Notification::Error(r.arg)),
            _ => None,
        }
    }
}

pub type PlayFinishedHandler = Box<dyn FnMut(PlaySources, u16)>;
pub type SourceEventHandler = Box<dyn FnMut(SourceEvent, PlaySources)>;
pub type ErrorHandler = Box<dyn FnMut(u16)>;

/// Registered notification handlers. Unset handlers drop their events.
#[derive(Default)]
pub struct Handlers {
    pub play_finished: Option<PlayFinishedHandler>,
    pub source_event: Option<SourceEventHandler>,
    pub error: Option<ErrorHandler>,
}

impl Handlers {
    pub fn dispatch(&mut self, reply: Reply) {
        match Notification::from_reply(reply) {
            Some(Notification::PlayFinished { source, track }) => {
                if let Some(handler) = self.play_finished.as_mut() {
                    handler(source, track);
                }
            }
            Some(Notification::Source { event, sources }) => {
                if let Some(handler) = self.source_event.as_mut() {
                    handler(event, sources);
                }
            }
            Some(Notification::Error(code)) => self.error(code),
            None => debug!(
                "invalid notification {:02X} {:04X}",
                reply.command, reply.arg
            ),
        }
    }

    pub fn error(&mut self, code: u16) {
        if let Some(handler) = self.error.as_mut() {
            handler(code);
        }
    }
}

impl core::fmt::Debug for Handlers {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Handlers")
            .field("play_finished", &self.play_finished.is_some())
            .field("source_event", &self.source_event.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}
