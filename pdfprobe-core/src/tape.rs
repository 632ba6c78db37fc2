//! Seekable byte source with a read direction.
//!
//! The tape owns the position and direction state for one session. Forward
//! reads serve the parsers; backward reads exist for the xref tail scan,
//! which walks in from the end of the file.

use crate::error::{ParseError, ParseResult};
use std::io::{Read, Seek, SeekFrom};

/// Read direction of the tape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// A positioned window over a seekable byte source.
#[derive(Debug)]
pub struct Tape<R> {
    inner: R,
    len: u64,
    position: u64,
    direction: Direction,
}

impl<R: Read + Seek> Tape<R> {
    /// Wrap a source, measuring its length once. The tape starts at
    /// position 0 reading forward.
    pub fn new(mut inner: R) -> ParseResult<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self {
            inner,
            len,
            position: 0,
            direction: Direction::Forward,
        })
    }

    /// Total length of the backing source in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current position, in `[0, len]`.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Move to the start of the source and read forward.
    pub fn rewind(&mut self) {
        self.position = 0;
        self.direction = Direction::Forward;
    }

    /// Move past the last byte and read backward.
    pub fn seek_end(&mut self) {
        self.position = self.len;
        self.direction = Direction::Backward;
    }

    /// Set an absolute position. The direction is left unchanged.
    pub fn seek(&mut self, n: u64) -> ParseResult<()> {
        if n > self.len {
            return Err(ParseError::SeekOutOfBounds(n));
        }
        self.position = n;
        Ok(())
    }

    /// Read up to `k` bytes in the current direction and advance over them.
    /// The result is shorter than `k` only at the source boundary. Backward
    /// reads return the window *ending* at the current position, in file
    /// order, and move the position down by the returned length.
    pub fn read(&mut self, k: usize) -> ParseResult<Vec<u8>> {
        let (start, amount) = self.window(k);
        let buf = self.read_at(start, amount)?;
        self.advance(start, amount);
        Ok(buf)
    }

    /// Read the bytes `read(k)` would return without moving the position.
    pub fn peek(&mut self, k: usize) -> ParseResult<Vec<u8>> {
        let (start, amount) = self.window(k);
        self.read_at(start, amount)
    }

    /// Advance the position as `read(k)` would, dropping the bytes.
    pub fn skip(&mut self, k: usize) -> ParseResult<()> {
        let (start, amount) = self.window(k);
        self.advance(start, amount);
        Ok(())
    }

    fn window(&self, k: usize) -> (u64, usize) {
        match self.direction {
            Direction::Forward => {
                let amount = (self.len - self.position).min(k as u64);
                (self.position, amount as usize)
            }
            Direction::Backward => {
                let amount = self.position.min(k as u64);
                (self.position - amount, amount as usize)
            }
        }
    }

    fn advance(&mut self, start: u64, amount: usize) {
        self.position = match self.direction {
            Direction::Forward => start + amount as u64,
            Direction::Backward => start,
        };
    }

    fn read_at(&mut self, start: u64, amount: usize) -> ParseResult<Vec<u8>> {
        let mut buf = vec![0u8; amount];
        if amount > 0 {
            self.inner.seek(SeekFrom::Start(start))?;
            self.inner.read_exact(&mut buf)?;
        }
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn tape(data: &[u8]) -> Tape<Cursor<Vec<u8>>> {
        Tape::new(Cursor::new(data.to_vec())).unwrap()
    }

    #[test]
    fn test_forward_read_and_skip() {
        let mut t = tape(b"hello world");
        assert_eq!(t.len(), 11);
        assert_eq!(t.read(5).unwrap(), b"hello");
        assert_eq!(t.position(), 5);
        t.skip(1).unwrap();
        assert_eq!(t.read(100).unwrap(), b"world");
        assert_eq!(t.position(), 11);
        assert_eq!(t.read(1).unwrap(), b"");
    }

    #[test]
    fn test_peek_does_not_advance() {
        let mut t = tape(b"hello");
        assert_eq!(t.peek(3).unwrap(), b"hel");
        assert_eq!(t.position(), 0);
        assert_eq!(t.read(3).unwrap(), b"hel");
    }

    #[test]
    fn test_backward_read_returns_window_ending_at_position() {
        let mut t = tape(b"hello world");
        t.seek_end();
        assert_eq!(t.direction(), Direction::Backward);
        assert_eq!(t.read(5).unwrap(), b"world");
        assert_eq!(t.position(), 6);
        assert_eq!(t.read(100).unwrap(), b"hello ");
        assert_eq!(t.position(), 0);
    }

    #[test]
    fn test_backward_peek() {
        let mut t = tape(b"abcdef");
        t.seek_end();
        assert_eq!(t.peek(2).unwrap(), b"ef");
        assert_eq!(t.position(), 6);
    }

    #[test]
    fn test_rewind_resets_direction() {
        let mut t = tape(b"abc");
        t.seek_end();
        t.rewind();
        assert_eq!(t.position(), 0);
        assert_eq!(t.direction(), Direction::Forward);
    }

    #[test]
    fn test_seek_bounds() {
        let mut t = tape(b"abc");
        t.seek(3).unwrap();
        assert!(matches!(t.seek(4), Err(ParseError::SeekOutOfBounds(4))));
        // failed seek leaves the position alone
        assert_eq!(t.position(), 3);
    }

    #[test]
    fn test_seek_keeps_direction() {
        let mut t = tape(b"abcdef");
        t.seek_end();
        t.seek(4).unwrap();
        assert_eq!(t.read(2).unwrap(), b"cd");
        assert_eq!(t.position(), 2);
    }

    #[test]
    fn test_empty_source() {
        let mut t = tape(b"");
        assert!(t.is_empty());
        assert_eq!(t.read(10).unwrap(), b"");
        t.seek_end();
        assert_eq!(t.read(10).unwrap(), b"");
    }
}
