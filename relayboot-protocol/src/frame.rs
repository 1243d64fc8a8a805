//! Frame encoding and decoding for the bootloader command protocol.
//!
//! Frame format:
//! - HEADER (2 bytes): 0x01 0x88 synchronization bytes
//! - CODE (2 bytes): command or ack code, little-endian
//! - WORDS (1 byte): payload length in 32-bit words (0-32)
//! - PAYLOAD (WORDS × 4 bytes): little-endian words
//! - CRC (2 bytes): CRC-16/MCRF4XX of CODE, WORDS and PAYLOAD, little-endian
//! - TRAILER (2 bytes): 0x99 0x03

use crc::{Crc, CRC_16_MCRF4XX};
use heapless::Vec;

/// Frame synchronization bytes
pub const FRAME_HEADER: [u8; 2] = [0x01, 0x88];

/// Frame terminator bytes
pub const FRAME_TRAILER: [u8; 2] = [0x99, 0x03];

/// Maximum payload size in words
pub const MAX_PAYLOAD_WORDS: usize = 32;

/// Maximum payload size in bytes
pub const MAX_PAYLOAD_SIZE: usize = MAX_PAYLOAD_WORDS * 4;

/// Bytes in a frame besides the payload (HEADER + CODE + WORDS + CRC + TRAILER)
pub const FRAME_OVERHEAD: usize = 2 + 2 + 1 + 2 + 2;

/// Maximum complete frame size
pub const MAX_FRAME_SIZE: usize = FRAME_OVERHEAD + MAX_PAYLOAD_SIZE;

/// Klipper's `crc16_ccitt`
const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_MCRF4XX);

/// Errors that can occur during frame parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// Checksum mismatch
    InvalidChecksum,
    /// Invalid frame structure (bad length, trailer, or unaligned payload)
    InvalidFrame,
    /// Buffer too small for encoding
    BufferTooSmall,
    /// Frame carries a code this side does not understand
    UnknownCommand(u16),
}

/// A parsed or constructed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Command or ack code
    pub code: u16,
    /// Payload bytes, always a whole number of words
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Frame {
    /// Create a new frame with the given code and payload bytes
    pub fn new(code: u16, payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge);
        }
        if payload.len() % 4 != 0 {
            return Err(FrameError::InvalidFrame);
        }

        let mut payload_vec = Vec::new();
        payload_vec
            .extend_from_slice(payload)
            .map_err(|_| FrameError::PayloadTooLarge)?;

        Ok(Self {
            code,
            payload: payload_vec,
        })
    }

    /// Create a frame from a slice of payload words
    pub fn from_words(code: u16, words: &[u32]) -> Result<Self, FrameError> {
        if words.len() > MAX_PAYLOAD_WORDS {
            return Err(FrameError::PayloadTooLarge);
        }
        let mut payload = Vec::new();
        for word in words {
            payload
                .extend_from_slice(&word.to_le_bytes())
                .map_err(|_| FrameError::PayloadTooLarge)?;
        }
        Ok(Self { code, payload })
    }

    /// Create a frame with no payload
    pub fn empty(code: u16) -> Self {
        Self {
            code,
            payload: Vec::new(),
        }
    }

    /// Number of payload words
    pub fn word_count(&self) -> usize {
        self.payload.len() / 4
    }

    /// Read the payload word at `index`
    pub fn word(&self, index: usize) -> Option<u32> {
        let start = index * 4;
        let bytes = self.payload.get(start..start + 4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Payload bytes starting at word `index` (empty past the end)
    pub fn bytes_from_word(&self, index: usize) -> &[u8] {
        self.payload.get(index * 4..).unwrap_or(&[])
    }

    /// Calculate checksum for frame data
    fn calculate_checksum(code: u16, words: u8, payload: &[u8]) -> u16 {
        let mut digest = CRC16.digest();
        digest.update(&code.to_le_bytes());
        digest.update(&[words]);
        digest.update(payload);
        digest.finalize()
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let payload_len = self.payload.len();
        let frame_len = FRAME_OVERHEAD + payload_len;
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        let words = self.word_count() as u8;
        let checksum = Self::calculate_checksum(self.code, words, &self.payload);

        buffer[0..2].copy_from_slice(&FRAME_HEADER);
        buffer[2..4].copy_from_slice(&self.code.to_le_bytes());
        buffer[4] = words;
        buffer[5..5 + payload_len].copy_from_slice(&self.payload);
        buffer[5 + payload_len..7 + payload_len].copy_from_slice(&checksum.to_le_bytes());
        buffer[7 + payload_len..9 + payload_len].copy_from_slice(&FRAME_TRAILER);

        Ok(frame_len)
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| FrameError::BufferTooSmall)?;
        Ok(vec)
    }
}

/// State machine for parsing incoming frames
#[derive(Debug, Clone)]
pub struct FrameParser {
    state: ParseState,
    buffer: Vec<u8, MAX_PAYLOAD_SIZE>,
    code: u16,
    expected_words: u8,
    checksum: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Waiting for the first HEADER byte
    WaitingForHeader,
    /// Got 0x01, waiting for 0x88
    WaitingForSync,
    /// Reading the low byte of CODE
    CodeLow,
    /// Reading the high byte of CODE
    CodeHigh,
    /// Waiting for WORDS
    WaitingForLength,
    /// Reading payload bytes
    ReadingPayload,
    /// Reading the low byte of CRC
    ChecksumLow,
    /// Reading the high byte of CRC
    ChecksumHigh,
    /// Waiting for 0x99
    TrailerStart,
    /// Waiting for 0x03
    TrailerEnd,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    /// Create a new frame parser
    pub fn new() -> Self {
        Self {
            state: ParseState::WaitingForHeader,
            buffer: Vec::new(),
            code: 0,
            expected_words: 0,
            checksum: 0,
        }
    }

    /// Reset the parser state
    pub fn reset(&mut self) {
        self.state = ParseState::WaitingForHeader;
        self.buffer.clear();
        self.code = 0;
        self.expected_words = 0;
        self.checksum = 0;
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `Ok(Some(frame))` when a complete valid frame is parsed,
    /// `Ok(None)` when more bytes are needed, or `Err` on parse error.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Frame>, FrameError> {
        match self.state {
            ParseState::WaitingForHeader => {
                if byte == FRAME_HEADER[0] {
                    self.state = ParseState::WaitingForSync;
                }
                // Silently ignore anything else while hunting for a header
                Ok(None)
            }
            ParseState::WaitingForSync => {
                self.state = match byte {
                    b if b == FRAME_HEADER[1] => ParseState::CodeLow,
                    b if b == FRAME_HEADER[0] => ParseState::WaitingForSync,
                    _ => ParseState::WaitingForHeader,
                };
                Ok(None)
            }
            ParseState::CodeLow => {
                self.code = byte as u16;
                self.state = ParseState::CodeHigh;
                Ok(None)
            }
            ParseState::CodeHigh => {
                self.code |= (byte as u16) << 8;
                self.state = ParseState::WaitingForLength;
                Ok(None)
            }
            ParseState::WaitingForLength => {
                if byte as usize > MAX_PAYLOAD_WORDS {
                    self.reset();
                    return Err(FrameError::InvalidFrame);
                }
                self.expected_words = byte;
                self.buffer.clear();
                self.state = if byte == 0 {
                    ParseState::ChecksumLow
                } else {
                    ParseState::ReadingPayload
                };
                Ok(None)
            }
            ParseState::ReadingPayload => {
                // Cannot overflow, WORDS was bounded above
                let _ = self.buffer.push(byte);
                if self.buffer.len() == self.expected_words as usize * 4 {
                    self.state = ParseState::ChecksumLow;
                }
                Ok(None)
            }
            ParseState::ChecksumLow => {
                self.checksum = byte as u16;
                self.state = ParseState::ChecksumHigh;
                Ok(None)
            }
            ParseState::ChecksumHigh => {
                self.checksum |= (byte as u16) << 8;
                let expected =
                    Frame::calculate_checksum(self.code, self.expected_words, &self.buffer);
                if self.checksum != expected {
                    self.reset();
                    return Err(FrameError::InvalidChecksum);
                }
                self.state = ParseState::TrailerStart;
                Ok(None)
            }
            ParseState::TrailerStart => {
                if byte != FRAME_TRAILER[0] {
                    self.reset();
                    return Err(FrameError::InvalidFrame);
                }
                self.state = ParseState::TrailerEnd;
                Ok(None)
            }
            ParseState::TrailerEnd => {
                if byte != FRAME_TRAILER[1] {
                    self.reset();
                    return Err(FrameError::InvalidFrame);
                }

                let frame = Frame {
                    code: self.code,
                    payload: self.buffer.clone(),
                };

                self.reset();
                Ok(Some(frame))
            }
        }
    }

    /// Feed multiple bytes to the parser
    ///
    /// Returns the first complete frame found, if any.
    /// Remaining bytes after a complete frame are not consumed.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Result<Option<Frame>, FrameError> {
        for &byte in bytes {
            if let Some(frame) = self.feed(byte)? {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_crc_matches_klipper_check_value() {
        assert_eq!(CRC16.checksum(b"123456789"), 0x6F91);
    }

    #[test]
    fn test_frame_encode_empty_payload() {
        let frame = Frame::empty(0x15); // COMPLETE
        let mut buffer = [0u8; 16];
        let len = frame.encode(&mut buffer).unwrap();

        assert_eq!(len, FRAME_OVERHEAD);
        assert_eq!(&buffer[0..2], &FRAME_HEADER);
        assert_eq!(&buffer[2..4], &[0x15, 0x00]);
        assert_eq!(buffer[4], 0); // words
        let crc = CRC16.checksum(&[0x15, 0x00, 0x00]);
        assert_eq!(&buffer[5..7], &crc.to_le_bytes());
        assert_eq!(&buffer[7..9], &FRAME_TRAILER);
    }

    #[test]
    fn test_frame_words_are_little_endian() {
        let frame = Frame::from_words(0x14, &[0x0000_8040]).unwrap();
        assert_eq!(frame.word_count(), 1);
        assert_eq!(&frame.payload[..], &[0x40, 0x80, 0x00, 0x00]);
        assert_eq!(frame.word(0), Some(0x8040));
        assert_eq!(frame.word(1), None);
    }

    #[test]
    fn test_unaligned_payload_rejected() {
        assert_eq!(Frame::new(0x12, &[1, 2, 3]), Err(FrameError::InvalidFrame));
    }

    #[test]
    fn test_payload_too_large() {
        let large_payload = [0u8; MAX_PAYLOAD_SIZE + 4];
        assert_eq!(
            Frame::new(0x12, &large_payload),
            Err(FrameError::PayloadTooLarge)
        );
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let frame = Frame::from_words(0x14, &[1, 2]).unwrap();
        let mut buffer = [0u8; FRAME_OVERHEAD + 7];
        assert_eq!(frame.encode(&mut buffer), Err(FrameError::BufferTooSmall));
    }

    #[test]
    fn test_parser_invalid_checksum() {
        let frame = Frame::from_words(0x14, &[0x8000]).unwrap();
        let mut encoded = frame.encode_to_vec().unwrap();
        // Corrupt a payload byte
        encoded[5] ^= 0xFF;

        let mut parser = FrameParser::new();
        assert_eq!(parser.feed_bytes(&encoded), Err(FrameError::InvalidChecksum));
    }

    #[test]
    fn test_parser_bad_trailer() {
        let frame = Frame::empty(0x11);
        let mut encoded = frame.encode_to_vec().unwrap();
        let last = encoded.len() - 1;
        encoded[last] = 0x00;

        let mut parser = FrameParser::new();
        assert_eq!(parser.feed_bytes(&encoded), Err(FrameError::InvalidFrame));
    }

    #[test]
    fn test_parser_rejects_oversized_length() {
        let mut parser = FrameParser::new();
        let bytes = [0x01, 0x88, 0x12, 0x00, (MAX_PAYLOAD_WORDS + 1) as u8];
        assert_eq!(parser.feed_bytes(&bytes), Err(FrameError::InvalidFrame));
    }

    #[test]
    fn test_parser_resync_after_garbage() {
        let frame = Frame::empty(0x11); // CONNECT
        let encoded = frame.encode_to_vec().unwrap();

        // Garbage, including a stray header byte
        let mut data = Vec::<u8, 32>::new();
        data.extend_from_slice(&[0x00, 0xFF, 0x01, 0x01, 0x34]).unwrap();
        data.extend_from_slice(&encoded).unwrap();

        let mut parser = FrameParser::new();
        let parsed = parser.feed_bytes(&data).unwrap().unwrap();
        assert_eq!(parsed.code, 0x11);
    }

    #[test]
    fn test_parser_recovers_after_error() {
        let good = Frame::from_words(0x14, &[0x8000]).unwrap();
        let mut bad = good.encode_to_vec().unwrap();
        bad[6] ^= 0x01;

        let mut parser = FrameParser::new();
        assert!(parser.feed_bytes(&bad).is_err());
        let parsed = parser
            .feed_bytes(&good.encode_to_vec().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(parsed, good);
    }

    proptest! {
        #[test]
        fn prop_parser_accepts_every_encoded_frame(
            code in any::<u16>(),
            words in proptest::collection::vec(any::<u32>(), 0..=MAX_PAYLOAD_WORDS),
        ) {
            let frame = Frame::from_words(code, &words).unwrap();
            let encoded = frame.encode_to_vec().unwrap();

            let mut parser = FrameParser::new();
            let parsed = parser.feed_bytes(&encoded).unwrap();
            prop_assert_eq!(parsed, Some(frame));
        }
    }
}
