use core::ops::Range;

use heapless::Vec;

use crate::{Decode, Encode, types::ErrorCode};

/// Start of every frame
pub const START: u8 = 0x7E;
pub const VERSION: u8 = 0xFF;
/// Declared payload length. Chips without a checksum still send 6 here.
pub const LENGTH: u8 = 0x06;
/// End of every frame
pub const END: u8 = 0xEF;

/// Start: 1, Version: 1, Length: 1, Command: 1, Ack: 1, Arg: 2, Checksum: 2, End: 1
pub const FRAME_SIZE: usize = 10;
/// Same as [`FRAME_SIZE`] minus the two checksum bytes
pub const FRAME_SIZE_NO_CHECKSUM: usize = 8;

const INDEX_COMMAND: usize = 3;
const INDEX_ACK: usize = 4;
const INDEX_ARG_HI: usize = 5;
const INDEX_ARG_LO: usize = 6;
const INDEX_CHECKSUM_HI: usize = 7;
const INDEX_CHECKSUM_LO: usize = 8;

/// Version through arg-lo. Start, end and the checksum itself are left to
/// the structural check.
const CHECKSUM_SPAN: Range<usize> = 1..7;

/// Two's complement of the byte sum, modulo 2^16.
pub fn checksum(span: &[u8]) -> u16 {
    span.iter()
        .fold(0u16, |sum, b| sum.wrapping_add(u16::from(*b)))
        .wrapping_neg()
}

/// A decoded (command, argument) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reply {
    pub command: u8,
    pub arg: u16,
}

impl Reply {
    pub const fn new(command: u8, arg: u16) -> Reply {
        Reply { command, arg }
    }
}

/// Error type for decoding and validating Frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Fewer bytes arrived than a whole frame
    Size { expected: usize, found: usize },
    /// Start, version, length or end byte is wrong
    Header,
    /// Stored checksum does not match the computed one
    Checksum { calculated: u16, found: u16 },
    EncodeBufferTooSmall { expected: usize, found: usize },
}

impl FrameError {
    /// The library error code reported for this framing failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            FrameError::Size { .. } | FrameError::EncodeBufferTooSmall { .. } => {
                ErrorCode::PacketSize
            }
            FrameError::Header => ErrorCode::PacketHeader,
            FrameError::Checksum { .. } => ErrorCode::PacketChecksum,
        }
    }
}

/// One fixed size protocol message, either the 10 byte checksummed shape
/// or the 8 byte shape without checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8, FRAME_SIZE>,
}

impl Frame {
    /// An empty frame with all fixed bytes in place.
    pub fn template(with_checksum: bool) -> Frame {
        let mut bytes = Vec::new();
        let _ = bytes.extend_from_slice(&[START, VERSION, LENGTH, 0, 0, 0, 0]);
        if with_checksum {
            let _ = bytes.extend_from_slice(&[0, 0]);
        }
        let _ = bytes.push(END);
        Frame { bytes }
    }

    /// Build an outbound frame. The checksum is written when the frame
    /// carries one.
    pub fn new(command: u8, arg: u16, request_ack: bool, with_checksum: bool) -> Frame {
        let mut frame = Frame::template(with_checksum);
        let [hi, lo] = arg.to_be_bytes();
        frame.bytes[INDEX_COMMAND] = command;
        frame.bytes[INDEX_ACK] = u8::from(request_ack);
        frame.bytes[INDEX_ARG_HI] = hi;
        frame.bytes[INDEX_ARG_LO] = lo;
        if with_checksum {
            let [hi, lo] = frame.calculated_checksum().to_be_bytes();
            frame.bytes[INDEX_CHECKSUM_HI] = hi;
            frame.bytes[INDEX_CHECKSUM_LO] = lo;
        }
        frame
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn has_checksum(&self) -> bool {
        self.bytes.len() == FRAME_SIZE
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn command(&self) -> u8 {
        self.bytes[INDEX_COMMAND]
    }

    pub fn request_ack(&self) -> bool {
        self.bytes[INDEX_ACK] != 0
    }

    pub fn arg(&self) -> u16 {
        u16::from_be_bytes([self.bytes[INDEX_ARG_HI], self.bytes[INDEX_ARG_LO]])
    }

    pub fn reply(&self) -> Reply {
        Reply::new(self.command(), self.arg())
    }

    /// The checksum as carried on the wire, if this shape has one.
    pub fn stored_checksum(&self) -> Option<u16> {
        self.has_checksum().then(|| {
            u16::from_be_bytes([
                self.bytes[INDEX_CHECKSUM_HI],
                self.bytes[INDEX_CHECKSUM_LO],
            ])
        })
    }

    fn calculated_checksum(&self) -> u16 {
        checksum(&self.bytes[CHECKSUM_SPAN])
    }

    /// Start, version, length and end bytes hold their fixed values.
    pub fn structure_valid(&self) -> bool {
        self.bytes[0] == START
            && self.bytes[1] == VERSION
            && self.bytes[2] == LENGTH
            && self.bytes[self.bytes.len() - 1] == END
    }

    /// Always true for the shape without a checksum.
    pub fn checksum_valid(&self) -> bool {
        match self.stored_checksum() {
            Some(found) => found == self.calculated_checksum(),
            None => true,
        }
    }

    /// Structural check first, then the checksum.
    pub fn validate(&self) -> Result<(), FrameError> {
        if !self.structure_valid() {
            return Err(FrameError::Header);
        }
        if let Some(found) = self.stored_checksum() {
            let calculated = self.calculated_checksum();
            if found != calculated {
                return Err(FrameError::Checksum { calculated, found });
            }
        }
        Ok(())
    }
}

impl Encode for Frame {
    type Error = FrameError;

    fn encode(&self, buffer: &mut [u8]) -> Result<(), Self::Error> {
        if buffer.len() < self.len() {
            return Err(FrameError::EncodeBufferTooSmall {
                expected: self.len(),
                found: buffer.len(),
            });
        }
        buffer[..self.len()].copy_from_slice(&self.bytes);
        Ok(())
    }
}

impl<'a> Decode<'a> for Frame {
    type Error = FrameError;

    /// Wraps raw bytes for inspection. Only the length is checked here,
    /// everything else is left to [`Frame::validate`].
    fn decode(data: &'a [u8]) -> Result<Self, Self::Error> {
        match data.len() {
            FRAME_SIZE | FRAME_SIZE_NO_CHECKSUM => {
                let mut bytes = Vec::new();
                let _ = bytes.extend_from_slice(data);
                Ok(Frame { bytes })
            }
            found if found < FRAME_SIZE_NO_CHECKSUM => Err(FrameError::Size {
                expected: FRAME_SIZE_NO_CHECKSUM,
                found,
            }),
            found => Err(FrameError::Size {
                expected: FRAME_SIZE,
                found,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONLINE_SD: [u8; 10] = [0x7E, 0xFF, 0x06, 0x3F, 0x00, 0x00, 0x02, 0xFE, 0xBA, 0xEF];

    #[test]
    fn encodes_documented_layout() {
        // 7E FF 06 0F 00 01 01 xx xx EF, checksum = 0 - (FF+06+0F+00+01+01)
        let frame = Frame::new(0x0F, 0x0101, false, true);
        assert_eq!(
            frame.as_bytes(),
            &[0x7E, 0xFF, 0x06, 0x0F, 0x00, 0x01, 0x01, 0xFE, 0xEA, 0xEF]
        );

        let frame = Frame::new(0x0F, 0x0101, true, false);
        assert_eq!(
            frame.as_bytes(),
            &[0x7E, 0xFF, 0x06, 0x0F, 0x01, 0x01, 0x01, 0xEF]
        );
    }

    #[test]
    fn decode_recovers_command_and_arg() {
        for with_checksum in [true, false] {
            for (command, arg) in [(0x01, 0), (0x06, 15), (0x14, 0x2ABC), (0x4F, u16::MAX)] {
                let sent = Frame::new(command, arg, true, with_checksum);
                let frame = Frame::decode(sent.as_bytes()).unwrap();
                assert!(frame.validate().is_ok());
                assert_eq!(frame.command(), command);
                assert_eq!(frame.arg(), arg);
                assert!(frame.request_ack());
            }
        }
    }

    #[test]
    fn known_reply_frame_is_valid() {
        let frame = Frame::decode(&ONLINE_SD).unwrap();
        assert!(frame.structure_valid());
        assert!(frame.checksum_valid());
        assert_eq!(frame.reply(), Reply::new(0x3F, 0x0002));
    }

    #[test]
    fn checksum_covers_version_through_arg() {
        for i in 1..7 {
            let mut raw = ONLINE_SD;
            raw[i] ^= 0x01;
            let frame = Frame::decode(&raw).unwrap();
            assert!(!frame.checksum_valid(), "byte {i} not covered");
        }
        // Start and end are outside the checksum, only the structure check sees them
        for i in [0, 9] {
            let mut raw = ONLINE_SD;
            raw[i] ^= 0x01;
            let frame = Frame::decode(&raw).unwrap();
            assert!(frame.checksum_valid());
            assert!(!frame.structure_valid());
        }
    }

    #[test]
    fn checksum_mismatch_reports_both_values() {
        let mut raw = ONLINE_SD;
        raw[8] = 0x00;
        let frame = Frame::decode(&raw).unwrap();
        assert_eq!(
            frame.validate(),
            Err(FrameError::Checksum {
                calculated: 0xFEBA,
                found: 0xFE00
            })
        );
    }

    #[test]
    fn structure_checks_fixed_bytes() {
        for (i, bad) in [(0, 0x7F), (1, 0xFE), (2, 0x08), (9, 0xEE)] {
            let mut raw = ONLINE_SD;
            raw[i] = bad;
            let frame = Frame::decode(&raw).unwrap();
            assert!(!frame.structure_valid());
            assert_eq!(frame.validate(), Err(FrameError::Header));
        }

        let short = Frame::new(0x41, 0, false, false);
        assert!(short.structure_valid());
        assert!(short.checksum_valid());
        assert_eq!(short.stored_checksum(), None);
    }

    #[test]
    fn decode_rejects_odd_sizes() {
        assert_eq!(
            Frame::decode(&ONLINE_SD[..5]),
            Err(FrameError::Size {
                expected: FRAME_SIZE_NO_CHECKSUM,
                found: 5
            })
        );
        assert!(Frame::decode(&ONLINE_SD[..9]).is_err());
    }

    #[test]
    fn encode_needs_room() {
        let frame = Frame::new(0x06, 15, true, true);
        let mut small = [0; 8];
        assert_eq!(
            frame.encode(&mut small),
            Err(FrameError::EncodeBufferTooSmall {
                expected: 10,
                found: 8
            })
        );
        let mut buf = [0; FRAME_SIZE];
        frame.encode(&mut buf).unwrap();
        assert_eq!(&buf, frame.as_bytes());
    }
}
