//! Command and reply codes plus the typed values carried in their arguments.

use bilge::prelude::*;

/// Command codes sent to the module.
pub mod command {
    pub const NONE: u8 = 0x00;
    pub const PLAY_NEXT_TRACK: u8 = 0x01;
    pub const PLAY_PREV_TRACK: u8 = 0x02;
    pub const PLAY_GLOBAL_TRACK: u8 = 0x03;
    pub const INC_VOLUME: u8 = 0x04;
    pub const DEC_VOLUME: u8 = 0x05;
    pub const SET_VOLUME: u8 = 0x06;
    pub const SET_EQ: u8 = 0x07;
    /// Shares its code with [`SET_PLAYBACK_MODE`]
    pub const LOOP_GLOBAL_TRACK: u8 = 0x08;
    pub const SET_PLAYBACK_MODE: u8 = 0x08;
    pub const SET_PLAYBACK_SOURCE: u8 = 0x09;
    pub const SLEEP: u8 = 0x0A;
    pub const AWAKE: u8 = 0x0B;
    pub const RESET: u8 = 0x0C;
    pub const START: u8 = 0x0D;
    pub const PAUSE: u8 = 0x0E;
    pub const PLAY_FOLDER_TRACK: u8 = 0x0F;
    pub const REPEAT_PLAY_IN_ROOT: u8 = 0x11;
    pub const PLAY_MP3_FOLDER_TRACK: u8 = 0x12;
    pub const PLAY_ADVERT_TRACK: u8 = 0x13;
    pub const PLAY_FOLDER_TRACK_16: u8 = 0x14;
    pub const STOP_ADVERT: u8 = 0x15;
    pub const STOP: u8 = 0x16;
    pub const LOOP_IN_FOLDER: u8 = 0x17;
    pub const PLAY_RANDOM_GLOBAL_TRACK: u8 = 0x18;
    pub const REPEAT_PLAY_CURRENT_TRACK: u8 = 0x19;
    pub const SET_DAC_INACTIVE: u8 = 0x1A;
    /// Everything above this is a request, everything below an action
    pub const REQUESTS: u8 = 0x30;
    pub const GET_STATUS: u8 = 0x42;
    pub const GET_VOLUME: u8 = 0x43;
    pub const GET_EQ: u8 = 0x44;
    pub const GET_PLAYBACK_MODE: u8 = 0x45;
    pub const GET_SOFTWARE_VERSION: u8 = 0x46;
    pub const GET_USB_TRACK_COUNT: u8 = 0x47;
    pub const GET_SD_TRACK_COUNT: u8 = 0x48;
    pub const GET_FLASH_TRACK_COUNT: u8 = 0x49;
    pub const GET_USB_CURRENT_TRACK: u8 = 0x4B;
    pub const GET_SD_CURRENT_TRACK: u8 = 0x4C;
    pub const GET_FLASH_CURRENT_TRACK: u8 = 0x4D;
    pub const GET_FOLDER_TRACK_COUNT: u8 = 0x4E;
    pub const GET_TOTAL_FOLDER_COUNT: u8 = 0x4F;
}

/// Reply codes sent by the module, solicited or not.
pub mod reply {
    pub const PLAY_SOURCE_INSERTED: u8 = 0x3A;
    pub const PLAY_SOURCE_REMOVED: u8 = 0x3B;
    pub const TRACK_FINISHED_USB: u8 = 0x3C;
    pub const TRACK_FINISHED_SD: u8 = 0x3D;
    pub const TRACK_FINISHED_FLASH: u8 = 0x3E;
    /// Overlaps the deprecated "get play sources" query
    pub const PLAY_SOURCE_ONLINE: u8 = 0x3F;
    pub const ERROR: u8 = 0x40;
    pub const ACK: u8 = 0x41;
}

/// Error codes delivered to the error handler. The first group comes from the
/// module, the 0x81.. group from this driver. Meanings vary a little between
/// chips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Busy,
    Sleeping,
    SerialWrongStack,
    CheckSumNotMatch,
    FileIndexOut,
    FileMismatch,
    Advertise,
    SdReadFail,
    FlashReadFail,
    EnteredSleep,
    RxTimeout,
    PacketSize,
    PacketHeader,
    PacketChecksum,
    General,
    Other(u16),
}

impl From<u16> for ErrorCode {
    fn from(value: u16) -> Self {
        match value {
            1 => ErrorCode::Busy,
            2 => ErrorCode::Sleeping,
            3 => ErrorCode::SerialWrongStack,
            4 => ErrorCode::CheckSumNotMatch,
            5 => ErrorCode::FileIndexOut,
            6 => ErrorCode::FileMismatch,
            7 => ErrorCode::Advertise,
            8 => ErrorCode::SdReadFail,
            9 => ErrorCode::FlashReadFail,
            10 => ErrorCode::EnteredSleep,
            0x81 => ErrorCode::RxTimeout,
            0x82 => ErrorCode::PacketSize,
            0x83 => ErrorCode::PacketHeader,
            0x84 => ErrorCode::PacketChecksum,
            0xFF => ErrorCode::General,
            x => ErrorCode::Other(x),
        }
    }
}

impl From<ErrorCode> for u16 {
    fn from(value: ErrorCode) -> Self {
        match value {
            ErrorCode::Busy => 1,
            ErrorCode::Sleeping => 2,
            ErrorCode::SerialWrongStack => 3,
            ErrorCode::CheckSumNotMatch => 4,
            ErrorCode::FileIndexOut => 5,
            ErrorCode::FileMismatch => 6,
            ErrorCode::Advertise => 7,
            ErrorCode::SdReadFail => 8,
            ErrorCode::FlashReadFail => 9,
            ErrorCode::EnteredSleep => 10,
            ErrorCode::RxTimeout => 0x81,
            ErrorCode::PacketSize => 0x82,
            ErrorCode::PacketHeader => 0x83,
            ErrorCode::PacketChecksum => 0x84,
            ErrorCode::General => 0xFF,
            ErrorCode::Other(x) => x,
        }
    }
}

/// A single play source, as used by commands that select one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Source {
    Usb = 1,
    Sd = 2,
    Aux = 3,
    Sleep = 4,
    Flash = 5,
}

/// Bitmask of play sources, as carried by notifications.
#[bitsize(16)]
#[derive(DebugBits, Clone, Copy, PartialEq, FromBits)]
pub struct PlaySources {
    pub usb: bool,
    pub sd: bool,
    pub pc: bool,
    pub flash: bool,
    reserved: u12,
}

impl PlaySources {
    pub const USB: u16 = 0x01;
    pub const SD: u16 = 0x02;
    pub const PC: u16 = 0x04;
    pub const FLASH: u16 = 0x08;
}

/// What happened to a play source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEvent {
    Removed,
    Inserted,
    Online,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Equalizer {
    Normal = 0,
    Pop,
    Rock,
    Jazz,
    Classic,
    Bass,
}

impl TryFrom<u16> for Equalizer {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Equalizer::Normal),
            1 => Ok(Equalizer::Pop),
            2 => Ok(Equalizer::Rock),
            3 => Ok(Equalizer::Jazz),
            4 => Ok(Equalizer::Classic),
            5 => Ok(Equalizer::Bass),
            x => Err(x),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PlaybackMode {
    Repeat = 0,
    FolderRepeat,
    SingleRepeat,
    Random,
}

impl TryFrom<u16> for PlaybackMode {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PlaybackMode::Repeat),
            1 => Ok(PlaybackMode::FolderRepeat),
            2 => Ok(PlaybackMode::SingleRepeat),
            3 => Ok(PlaybackMode::Random),
            x => Err(x),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusSource {
    General,
    Usb,
    Sd,
    Sleep,
    Unknown(u8),
}

impl From<u8> for StatusSource {
    fn from(value: u8) -> Self {
        match value {
            0x00 => StatusSource::General,
            0x01 => StatusSource::Usb,
            0x02 => StatusSource::Sd,
            0x10 => StatusSource::Sleep,
            x => StatusSource::Unknown(x),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusState {
    Idle,
    Playing,
    Paused,
    /// Some chips report sleep through [`StatusSource::Sleep`] instead
    Sleep,
    /// Undocumented, seen while shuffling
    Shuffling,
    Unknown(u8),
}

impl From<u8> for StatusState {
    fn from(value: u8) -> Self {
        match value {
            0x00 => StatusState::Idle,
            0x01 => StatusState::Playing,
            0x02 => StatusState::Paused,
            0x08 => StatusState::Sleep,
            0x11 => StatusState::Shuffling,
            x => StatusState::Unknown(x),
        }
    }
}

/// Status reply argument: source in the high byte, state in the low byte.
#[bitsize(16)]
#[derive(DebugBits, Clone, Copy, FromBits)]
struct StatusWord {
    state: u8,
    source: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub source: StatusSource,
    pub state: StatusState,
}

impl From<u16> for Status {
    fn from(value: u16) -> Self {
        let word = StatusWord::from(value);
        Status {
            source: StatusSource::from(word.source()),
            state: StatusState::from(word.state()),
        }
    }
}
