//! Fixed-size raw frame reader.
//!
//! The decoder writes headerless BGR24 frames back to back. This reader pulls
//! exactly `width * height * 3` bytes per frame; anything shorter means the
//! stream is gone.

use std::io::{ErrorKind, Read};

use super::FrameSource;
use crate::frame::{frame_len, Frame, FrameError};

pub struct RawFrameReader<R> {
    reader: R,
    name: String,
    width: u32,
    height: u32,
    frames_read: u64,
}

impl<R: Read> RawFrameReader<R> {
    pub fn new(reader: R, width: u32, height: u32) -> Self {
        Self {
            reader,
            name: "raw".to_string(),
            width,
            height,
            frames_read: 0,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn read_frame(&mut self) -> Result<Frame, FrameError> {
        let expected = frame_len(self.width, self.height);
        if expected == 0 {
            return Err(FrameError::Malformed(format!(
                "zero-sized frame {}x{}",
                self.width, self.height
            )));
        }
        let mut buf = vec![0u8; expected];
        match self.reader.read_exact(&mut buf) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
                return Err(FrameError::Exhausted { expected });
            }
            Err(err) => return Err(FrameError::Io(err)),
        }
        let frame = Frame::from_bgr(buf, self.width, self.height)?;
        self.frames_read += 1;
        Ok(frame)
    }
}

impl<R: Read + Send> FrameSource for RawFrameReader<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_frame(&mut self) -> Result<Frame, FrameError> {
        self.read_frame()
    }

    fn frames_read(&self) -> u64 {
        self.frames_read
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_back_to_back_frames() {
        let mut bytes = vec![1u8; frame_len(4, 2)];
        bytes.extend(vec![2u8; frame_len(4, 2)]);
        let mut reader = RawFrameReader::new(Cursor::new(bytes), 4, 2);

        let first = reader.next_frame().unwrap();
        assert_eq!(first.pixel(0, 0), Some([1, 1, 1]));
        let second = reader.next_frame().unwrap();
        assert_eq!(second.pixel(3, 1), Some([2, 2, 2]));
        assert_eq!(reader.frames_read(), 2);
    }

    #[test]
    fn short_read_is_exhaustion() {
        let bytes = vec![0u8; frame_len(4, 2) + 5];
        let mut reader = RawFrameReader::new(Cursor::new(bytes), 4, 2);

        assert!(reader.next_frame().is_ok());
        let err = reader.next_frame().unwrap_err();
        assert!(matches!(err, FrameError::Exhausted { expected: 24 }));
        assert!(err.is_fatal());
    }

    #[test]
    fn zero_sized_reader_reports_malformed() {
        let mut reader = RawFrameReader::new(Cursor::new(vec![0u8; 8]), 0, 2);
        let err = reader.next_frame().unwrap_err();
        assert!(!err.is_fatal());
    }
}
