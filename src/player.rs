//! Player commands in the module's own vocabulary.
//!
//! Actions return `true` when the module answered. Queries return `None`
//! when no usable answer came back, the reason having already gone to the
//! error handler or the log.

use crate::{
    driver::Driver,
    serial::Stream,
    types::{Equalizer, PlaybackMode, Source, Status, command},
};

impl<S: Stream> Driver<S> {
    fn action(&mut self, command: u8, arg: u16) -> bool {
        self.set(command, arg).is_some()
    }

    /// Only a reply echoing `command` carries its value.
    fn value(&mut self, command: u8, arg: u16) -> Option<u16> {
        self.query(command, arg)
            .filter(|r| r.command == command)
            .map(|r| r.arg)
    }

    /// Track by its global index on the current source. 0 lets the module
    /// pick.
    pub fn play_global_track(&mut self, track: u16) -> bool {
        self.action(command::PLAY_GLOBAL_TRACK, track)
    }

    /// `sd:/mp3/####*.mp3`
    pub fn play_mp3_folder_track(&mut self, track: u16) -> bool {
        self.action(command::PLAY_MP3_FOLDER_TRACK, track)
    }

    /// `sd:/##/###*.mp3`, folders 1-99 and tracks 1-255.
    pub fn play_folder_track(&mut self, folder: u8, track: u8) -> bool {
        let arg = (u16::from(folder) << 8) | u16::from(track);
        self.action(command::PLAY_FOLDER_TRACK, arg)
    }

    /// `sd:/##/####*.mp3`, folders 1-15 and tracks 1-3000.
    pub fn play_folder_track16(&mut self, folder: u8, track: u16) -> bool {
        let arg = (u16::from(folder) << 12) | (track & 0x0FFF);
        self.action(command::PLAY_FOLDER_TRACK_16, arg)
    }

    pub fn play_random_track_from_all(&mut self) -> bool {
        self.action(command::PLAY_RANDOM_GLOBAL_TRACK, 0)
    }

    pub fn next_track(&mut self) -> bool {
        self.action(command::PLAY_NEXT_TRACK, 0)
    }

    pub fn prev_track(&mut self) -> bool {
        self.action(command::PLAY_PREV_TRACK, 0)
    }

    pub fn loop_global_track(&mut self, track: u16) -> bool {
        self.action(command::LOOP_GLOBAL_TRACK, track)
    }

    pub fn loop_folder(&mut self, folder: u8) -> bool {
        self.action(command::LOOP_IN_FOLDER, u16::from(folder))
    }

    pub fn play_advertisement(&mut self, track: u16) -> bool {
        self.action(command::PLAY_ADVERT_TRACK, track)
    }

    pub fn stop_advertisement(&mut self) -> bool {
        self.action(command::STOP_ADVERT, 0)
    }

    /// 0-30
    pub fn set_volume(&mut self, volume: u8) -> bool {
        self.action(command::SET_VOLUME, u16::from(volume))
    }

    pub fn volume(&mut self) -> Option<u8> {
        self.value(command::GET_VOLUME, 0)
            .and_then(|v| u8::try_from(v).ok())
    }

    pub fn increase_volume(&mut self) -> bool {
        self.action(command::INC_VOLUME, 0)
    }

    pub fn decrease_volume(&mut self) -> bool {
        self.action(command::DEC_VOLUME, 0)
    }

    pub fn set_eq(&mut self, eq: Equalizer) -> bool {
        self.action(command::SET_EQ, eq as u16)
    }

    pub fn eq(&mut self) -> Option<Equalizer> {
        self.value(command::GET_EQ, 0)
            .and_then(|v| Equalizer::try_from(v).ok())
    }

    /// Poorly supported by most chips.
    pub fn set_playback_mode(&mut self, mode: PlaybackMode) -> bool {
        self.action(command::SET_PLAYBACK_MODE, mode as u16)
    }

    pub fn playback_mode(&mut self) -> Option<PlaybackMode> {
        self.value(command::GET_PLAYBACK_MODE, 0)
            .and_then(|v| PlaybackMode::try_from(v).ok())
    }

    pub fn set_repeat_play_all_in_root(&mut self, repeat: bool) -> bool {
        self.action(command::REPEAT_PLAY_IN_ROOT, u16::from(repeat))
    }

    pub fn set_repeat_play_current_track(&mut self, repeat: bool) -> bool {
        // The module takes 0 to start repeating and 1 to stop
        self.action(command::REPEAT_PLAY_CURRENT_TRACK, u16::from(!repeat))
    }

    pub fn set_playback_source(&mut self, source: Source) -> bool {
        self.action(command::SET_PLAYBACK_SOURCE, source as u16)
    }

    pub fn sleep(&mut self) -> bool {
        self.action(command::SLEEP, 0)
    }

    pub fn awake(&mut self) -> bool {
        self.action(command::AWAKE, 0)
    }

    /// Restart the module. It is offline until a source online notification
    /// shows up through [`Driver::poll`].
    pub fn reset(&mut self) -> bool {
        self.clear_online();
        self.action(command::RESET, 0)
    }

    pub fn start(&mut self) -> bool {
        self.action(command::START, 0)
    }

    pub fn pause(&mut self) -> bool {
        self.action(command::PAUSE, 0)
    }

    pub fn stop(&mut self) -> bool {
        self.action(command::STOP, 0)
    }

    pub fn enable_dac(&mut self) -> bool {
        self.action(command::SET_DAC_INACTIVE, 0)
    }

    pub fn disable_dac(&mut self) -> bool {
        self.action(command::SET_DAC_INACTIVE, 1)
    }

    pub fn status(&mut self) -> Option<Status> {
        self.value(command::GET_STATUS, 0).map(Status::from)
    }

    pub fn software_version(&mut self) -> Option<u16> {
        self.value(command::GET_SOFTWARE_VERSION, 0)
    }

    /// Sources without their own query fall back to the SD card.
    pub fn current_track(&mut self, source: Source) -> Option<u16> {
        let command = match source {
            Source::Usb => command::GET_USB_CURRENT_TRACK,
            Source::Flash => command::GET_FLASH_CURRENT_TRACK,
            _ => command::GET_SD_CURRENT_TRACK,
        };
        self.value(command, 0)
    }

    /// Sources without their own query fall back to the SD card.
    pub fn total_track_count(&mut self, source: Source) -> Option<u16> {
        let command = match source {
            Source::Usb => command::GET_USB_TRACK_COUNT,
            Source::Flash => command::GET_FLASH_TRACK_COUNT,
            _ => command::GET_SD_TRACK_COUNT,
        };
        self.value(command, 0)
    }

    pub fn folder_track_count(&mut self, folder: u16) -> Option<u16> {
        self.value(command::GET_FOLDER_TRACK_COUNT, folder)
    }

    pub fn total_folder_count(&mut self) -> Option<u16> {
        self.value(command::GET_TOTAL_FOLDER_COUNT, 0)
    }
}
