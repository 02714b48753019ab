//! Flash command table and frame encoding.

/// Flash opcodes supported by the driver.
///
/// Each command has a fixed shape taken from the device command reference:
/// the opcode, a number of dummy bytes clocked out after it, and the number
/// of response bytes clocked in afterwards.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    /// Must directly precede [`Command::Reset`].
    EnableReset = 0x66,
    /// Ignored by the device unless [`Command::EnableReset`] came first.
    Reset = 0x99,
    /// Release power-down. With three dummy bytes the device answers with
    /// its manufacturer ID.
    ReleasePowerDown = 0xAB,
    /// Manufacturer, memory type, capacity.
    JedecId = 0x9F,
    UniqueId = 0x4B,
    ReadStatusRegister1 = 0x05,
    ReadStatusRegister2 = 0x35,
    ReadStatusRegister3 = 0x15,
}

impl Command {
    pub(crate) const fn opcode(self) -> u8 {
        self as u8
    }

    pub(crate) const fn dummy_bytes(self) -> usize {
        match self {
            Command::ReleasePowerDown => 3,
            Command::UniqueId => 4,
            _ => 0,
        }
    }

    pub(crate) const fn response_len(self) -> usize {
        match self {
            Command::EnableReset | Command::Reset => 0,
            Command::ReleasePowerDown => 1,
            Command::JedecId => 3,
            Command::UniqueId => 8,
            Command::ReadStatusRegister1
            | Command::ReadStatusRegister2
            | Command::ReadStatusRegister3 => 1,
        }
    }

    /// Build the write phase and an empty response buffer for this command.
    pub(crate) fn frame(self) -> Frame {
        let mut frame = Frame {
            cmd: [Frame::DUMMY; Frame::MAX_WRITE],
            len: 1 + self.dummy_bytes(),
            response: Response {
                buf: [0; Response::MAX_READ],
                len: self.response_len(),
            },
        };
        frame.cmd[0] = self.opcode();
        frame
    }
}

/// One encoded transaction: the bytes to clock out and room for the reply.
#[derive(Debug, Clone)]
pub(crate) struct Frame {
    cmd: [u8; Frame::MAX_WRITE],
    len: usize,
    response: Response,
}

impl Frame {
    /// Opcode plus the longest dummy run (unique ID).
    const MAX_WRITE: usize = 5;
    const DUMMY: u8 = 0x00;

    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.cmd[..self.len]
    }

    /// Split into the write phase and the response to fill.
    pub(crate) fn split(&mut self) -> (&[u8], &mut Response) {
        (&self.cmd[..self.len], &mut self.response)
    }

    pub(crate) fn into_response(self) -> Response {
        self.response
    }
}

/// Bytes clocked in after the write phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Response {
    buf: [u8; Response::MAX_READ],
    len: usize,
}

impl Response {
    /// Longest reply (unique ID).
    const MAX_READ: usize = 8;

    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buf[..self.len]
    }

    /// First response byte, for single byte replies.
    pub(crate) fn byte(&self) -> u8 {
        self.buf[0]
    }

    /// The response as a fixed size array.
    ///
    /// Only called with the length the command table declares for the
    /// command that produced this response.
    pub(crate) fn array<const N: usize>(&self) -> [u8; N] {
        let mut out = [0; N];
        out.copy_from_slice(&self.buf[..N]);
        out
    }
}
