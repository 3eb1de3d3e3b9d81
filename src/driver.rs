use alloc::boxed::Box;

use log::debug;

use crate::{
    chip::Chip,
    notify::Handlers,
    packet::Reply,
    serial::Stream,
    transaction::{Engine, Outcome},
    types::{PlaySources, SourceEvent, reply},
};

pub const DEFAULT_ACK_TIMEOUT_MS: u32 = 900;
pub const DEFAULT_RETRIES: u8 = 3;
/// Non-blocking receive passes per [`Driver::poll`]
pub const DEFAULT_DRAINS_PER_POLL: u8 = 6;

#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub chip: Chip,
    /// How long to wait for a reply to an ack capable command
    pub ack_timeout_ms: u32,
    /// Attempts per command. 0 behaves like 1.
    pub retries: u8,
    pub drains_per_poll: u8,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            chip: Chip::Standard,
            ack_timeout_ms: DEFAULT_ACK_TIMEOUT_MS,
            retries: DEFAULT_RETRIES,
            drains_per_poll: DEFAULT_DRAINS_PER_POLL,
        }
    }
}

impl Config {
    pub fn with_chip(mut self, chip: Chip) -> Self {
        self.chip = chip;
        self
    }

    pub fn with_ack_timeout(mut self, ack_timeout_ms: u32) -> Self {
        self.ack_timeout_ms = ack_timeout_ms;
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_drains_per_poll(mut self, drains_per_poll: u8) -> Self {
        self.drains_per_poll = drains_per_poll;
        self
    }
}

/// Driver for one MP3 module on one stream.
///
/// Commands block until they are confirmed or their retries run out.
/// Notifications the module sends on its own are queued and handed to the
/// registered handlers from [`Driver::poll`], which the host should call
/// regularly.
#[derive(Debug)]
pub struct Driver<S: Stream> {
    engine: Engine<S>,
    handlers: Handlers,
    drains_per_poll: u8,
}

impl<S: Stream> Driver<S> {
    pub fn new(stream: S) -> Driver<S> {
        Driver::with_config(stream, Config::default())
    }

    pub fn with_config(stream: S, config: Config) -> Driver<S> {
        Driver {
            engine: Engine::new(stream, config.chip, config.retries, config.ack_timeout_ms),
            handlers: Handlers::default(),
            drains_per_poll: config.drains_per_poll,
        }
    }

    pub fn chip(&self) -> &Chip {
        self.engine.chip()
    }

    pub fn retries(&self) -> u8 {
        self.engine.retries()
    }

    pub fn set_retries(&mut self, retries: u8) {
        self.engine.set_retries(retries);
    }

    /// True once the module has announced a play source. Cleared by
    /// [`Driver::reset`].
    pub fn is_online(&self) -> bool {
        self.engine.is_online()
    }

    pub(crate) fn clear_online(&mut self) {
        self.engine.clear_online();
    }

    /// Notifications received but not yet handed out.
    pub fn pending_notifications(&self) -> usize {
        self.engine.queue().len()
    }

    pub fn stream(&self) -> &S {
        self.engine.stream()
    }

    pub fn stream_mut(&mut self) -> &mut S {
        self.engine.stream_mut()
    }

    pub fn release(self) -> S {
        self.engine.into_stream()
    }

    pub fn on_play_finished(&mut self, handler: impl FnMut(PlaySources, u16) + 'static) {
        self.handlers.play_finished = Some(Box::new(handler));
    }

    pub fn on_source_event(&mut self, handler: impl FnMut(SourceEvent, PlaySources) + 'static) {
        self.handlers.source_event = Some(Box::new(handler));
    }

    pub fn on_error(&mut self, handler: impl FnMut(u16) + 'static) {
        self.handlers.error = Some(Box::new(handler));
    }

    /// Hand at most one queued notification to its handler, then pick up
    /// whatever has arrived without waiting for more.
    pub fn poll(&mut self) {
        if let Some(notification) = self.engine.queue_mut().pop() {
            debug!(
                "delivering notification {:02X} {:04X}",
                notification.command, notification.arg
            );
            self.handlers.dispatch(notification);
        }
        self.engine.drain(self.drains_per_poll);
    }

    /// Run one command to completion. A device error goes to the error
    /// handler and comes back as `None`.
    pub fn execute(&mut self, command: u8, expected: u8, arg: u16, request_ack: bool) -> Option<Reply> {
        // Anything already waiting belongs to an earlier exchange
        self.poll();
        match self.engine.execute(command, expected, arg, request_ack) {
            Outcome::DeviceError(code) => {
                self.handlers.error(code);
                None
            }
            outcome => outcome.reply(),
        }
    }

    /// Ask for a value. The module answers with the same command code.
    pub fn query(&mut self, command: u8, arg: u16) -> Option<Reply> {
        self.execute(command, command, arg, false)
    }

    /// Perform an action, answered by an ack.
    pub fn set(&mut self, command: u8, arg: u16) -> Option<Reply> {
        self.execute(command, reply::ACK, arg, true)
    }
}

#[cfg(test)]
mod tests {
    use alloc::{rc::Rc, vec, vec::Vec};
    use core::cell::RefCell;

    use super::*;
    use crate::{
        mock::{MockStream, frame},
        types::command,
    };

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Finished(u16, u16),
        Source(SourceEvent, u16),
        Error(u16),
    }

    fn recorded(driver: &mut Driver<MockStream>) -> Rc<RefCell<Vec<Event>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let log = events.clone();
        driver.on_play_finished(move |source, track| {
            log.borrow_mut().push(Event::Finished(u16::from(source), track))
        });
        let log = events.clone();
        driver.on_source_event(move |event, sources| {
            log.borrow_mut().push(Event::Source(event, u16::from(sources)))
        });
        let log = events.clone();
        driver.on_error(move |code| log.borrow_mut().push(Event::Error(code)));
        events
    }

    #[test]
    fn poll_without_data_does_nothing() {
        let mut driver = Driver::new(MockStream::new());
        let events = recorded(&mut driver);

        driver.poll();
        assert!(events.borrow().is_empty());
        assert!(!driver.is_online());
        assert_eq!(driver.pending_notifications(), 0);
        assert_eq!(driver.stream().sends(), 0);
        assert_eq!(driver.stream().discards, 0);
    }

    #[test]
    fn source_online_is_queued_then_delivered() {
        let mut driver = Driver::new(MockStream::new());
        let events = recorded(&mut driver);
        driver
            .stream_mut()
            .feed(&[0x7E, 0xFF, 0x06, 0x3F, 0x00, 0x00, 0x02, 0xFE, 0xBA, 0xEF]);

        driver.poll();
        assert!(driver.is_online());
        assert_eq!(driver.pending_notifications(), 1);
        assert!(events.borrow().is_empty());

        driver.poll();
        assert_eq!(driver.pending_notifications(), 0);
        assert_eq!(
            *events.borrow(),
            vec![Event::Source(SourceEvent::Online, PlaySources::SD)]
        );
    }

    #[test]
    fn set_volume_acked_first_time() {
        let mut driver = Driver::new(MockStream::new());
        let events = recorded(&mut driver);
        driver.stream_mut().answer(&frame(reply::ACK, 0));

        let r = driver.set(command::SET_VOLUME, 15);
        assert_eq!(r, Some(Reply::new(reply::ACK, 0)));
        assert_eq!(driver.stream().sends(), 1);
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn notifications_keep_arrival_order() {
        let mut driver = Driver::new(MockStream::new());
        let events = recorded(&mut driver);
        let mut answer = frame(reply::TRACK_FINISHED_SD, 3);
        answer.extend(frame(reply::PLAY_SOURCE_INSERTED, 1));
        answer.extend(frame(command::GET_SD_TRACK_COUNT, 42));
        driver.stream_mut().answer(&answer);

        let r = driver.query(command::GET_SD_TRACK_COUNT, 0);
        assert_eq!(r, Some(Reply::new(command::GET_SD_TRACK_COUNT, 42)));
        assert_eq!(driver.pending_notifications(), 2);
        assert!(events.borrow().is_empty());

        driver.poll();
        driver.poll();
        assert_eq!(
            *events.borrow(),
            vec![
                Event::Finished(PlaySources::SD, 3),
                Event::Source(SourceEvent::Inserted, PlaySources::USB),
            ]
        );
    }

    #[test]
    fn device_error_reaches_handler_once() {
        let mut driver = Driver::new(MockStream::new());
        let events = recorded(&mut driver);
        for _ in 0..3 {
            driver.stream_mut().answer(&frame(reply::ERROR, 6));
        }

        let r = driver.set(command::PLAY_FOLDER_TRACK, 0x0102);
        assert_eq!(r, None);
        assert_eq!(driver.stream().sends(), 3);
        assert_eq!(*events.borrow(), vec![Event::Error(6)]);
    }

    #[test]
    fn spontaneous_error_is_a_notification() {
        let mut driver = Driver::new(MockStream::new());
        let events = recorded(&mut driver);
        driver.stream_mut().feed(&frame(reply::ERROR, 0x0A));

        driver.poll();
        assert_eq!(driver.pending_notifications(), 1);
        driver.poll();
        assert_eq!(*events.borrow(), vec![Event::Error(0x0A)]);
    }

    #[test]
    fn stale_replies_are_drained_before_sending() {
        let mut driver = Driver::new(MockStream::new());
        let events = recorded(&mut driver);
        driver
            .stream_mut()
            .feed(&frame(command::GET_VOLUME, 3))
            .feed(&frame(reply::TRACK_FINISHED_USB, 8));
        driver.stream_mut().answer(&frame(command::GET_VOLUME, 21));

        let r = driver.query(command::GET_VOLUME, 0);
        assert_eq!(r, Some(Reply::new(command::GET_VOLUME, 21)));
        assert_eq!(driver.pending_notifications(), 1);

        driver.poll();
        assert_eq!(*events.borrow(), vec![Event::Finished(PlaySources::USB, 8)]);
    }

    #[test]
    fn poll_delivers_one_per_call() {
        let mut driver = Driver::new(MockStream::new());
        let events = recorded(&mut driver);
        for track in 1..=3 {
            driver.stream_mut().feed(&frame(reply::TRACK_FINISHED_FLASH, track));
        }

        driver.poll();
        assert_eq!(driver.pending_notifications(), 3);
        driver.poll();
        assert_eq!(events.borrow().len(), 1);
        assert_eq!(driver.pending_notifications(), 2);
    }

    #[test]
    fn config_is_applied() {
        let config = Config::default()
            .with_chip(Chip::InconsistentAck)
            .with_ack_timeout(500)
            .with_retries(5)
            .with_drains_per_poll(1);
        let mut driver = Driver::with_config(MockStream::new(), config);
        assert_eq!(driver.retries(), 5);
        driver.set_retries(2);
        assert_eq!(driver.retries(), 2);

        driver.query(command::GET_STATUS, 0);
        assert_eq!(driver.stream().timeouts, vec![500]);
        assert_eq!(driver.stream().sends(), 2);

        let stream = driver.release();
        assert_eq!(stream.written.len(), 2);
    }
}
