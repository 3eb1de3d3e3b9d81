use crate::{
    packet::{FRAME_SIZE, FRAME_SIZE_NO_CHECKSUM, Frame},
    types::command,
};

/// Checksum and acknowledgement behaviour for a chip the built in variants
/// don't describe.
#[derive(Debug, Clone, Copy)]
pub struct CustomChip {
    pub send_checksum: bool,
    pub receive_checksum: bool,
    pub supports_ack: fn(u8) -> bool,
}

/// Per chip protocol policy. Chosen once when the driver is built.
#[derive(Debug, Clone, Copy, Default)]
pub enum Chip {
    /// Checksums both ways, every command answers with an ack or its own code.
    #[default]
    Standard,
    /// Checksums both ways, but only commands above
    /// [`command::REQUESTS`] can be relied on to echo their code. Anything
    /// else is only retried on an explicit error reply.
    InconsistentAck,
    /// Outbound frames carry no checksum, inbound frames still do.
    ChecksumlessSend,
    Custom(CustomChip),
}

impl Chip {
    pub fn custom(send_checksum: bool, receive_checksum: bool, supports_ack: fn(u8) -> bool) -> Chip {
        Chip::Custom(CustomChip {
            send_checksum,
            receive_checksum,
            supports_ack,
        })
    }

    pub fn send_checksum(&self) -> bool {
        match self {
            Chip::Standard | Chip::InconsistentAck => true,
            Chip::ChecksumlessSend => false,
            Chip::Custom(chip) => chip.send_checksum,
        }
    }

    pub fn receive_checksum(&self) -> bool {
        match self {
            Chip::Standard | Chip::InconsistentAck | Chip::ChecksumlessSend => true,
            Chip::Custom(chip) => chip.receive_checksum,
        }
    }

    /// Whether a mismatching reply to `command` is worth a retry.
    pub fn command_supports_ack(&self, command: u8) -> bool {
        match self {
            Chip::Standard | Chip::ChecksumlessSend => true,
            // The boundary is the command table's own, keep it exact
            Chip::InconsistentAck => command > command::REQUESTS,
            Chip::Custom(chip) => (chip.supports_ack)(command),
        }
    }

    /// Outbound frame shaped for this chip.
    pub fn tx_frame(&self, command: u8, arg: u16, request_ack: bool) -> Frame {
        Frame::new(command, arg, request_ack, self.send_checksum())
    }

    /// Size of one inbound frame from this chip.
    pub fn rx_frame_size(&self) -> usize {
        if self.receive_checksum() {
            FRAME_SIZE
        } else {
            FRAME_SIZE_NO_CHECKSUM
        }
    }
}
