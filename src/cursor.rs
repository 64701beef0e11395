// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Buffered Cursor
//!
//! A fixed-size window over a byte source. The parser only ever looks a
//! keyword ahead and pushes back a single byte, so a dump of any size is
//! read in constant memory.

use log::trace;
use std::io::{ErrorKind, Read};

use crate::error::{DumpError, Result};

pub const DEFAULT_CAPACITY: usize = 10240;

/// Room for the longest statement keyword plus the overlap byte.
pub const MIN_CAPACITY: usize = 16;

/// Consumed bytes kept on refill, so `rewind(1)` stays valid right after one.
const OVERLAP: usize = 1;

pub struct Cursor<R> {
    source: R,
    buffer: Box<[u8]>,
    /// Read position inside `buffer`.
    pos: usize,
    /// End of valid data inside `buffer`.
    end: usize,
    /// Absolute position in the source.
    offset: u64,
    exhausted: bool,
}

impl<R: Read> Cursor<R> {
    pub fn new(source: R) -> Self {
        Cursor::with_capacity(source, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(source: R, capacity: usize) -> Self {
        Cursor {
            source,
            buffer: vec![0; capacity.max(MIN_CAPACITY)].into_boxed_slice(),
            pos: 0,
            end: 0,
            offset: 0,
            exhausted: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Absolute byte position of the next unread byte.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn remaining(&self) -> usize {
        self.end - self.pos
    }

    /// Make at least `min_lookahead` unread bytes available, unless the source
    /// runs out first. Requests beyond the window are capped to what fits.
    pub fn ensure(&mut self, min_lookahead: usize) -> Result<()> {
        let wanted = min_lookahead.min(self.buffer.len() - OVERLAP);
        while self.remaining() < wanted && !self.exhausted {
            self.refill()?;
        }
        Ok(())
    }

    fn refill(&mut self) -> Result<()> {
        let keep_from = self.pos.saturating_sub(OVERLAP);
        if keep_from > 0 {
            self.buffer.copy_within(keep_from..self.end, 0);
            self.pos -= keep_from;
            self.end -= keep_from;
        }

        loop {
            match self.source.read(&mut self.buffer[self.end..]) {
                Ok(0) => {
                    self.exhausted = true;
                    break;
                }
                Ok(n) => {
                    self.end += n;
                    break;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        trace!(
            "refilled cursor at offset {}: {} byte(s) buffered, exhausted={}",
            self.offset,
            self.remaining(),
            self.exhausted
        );
        Ok(())
    }

    /// True only once the source is exhausted and the window is drained.
    pub fn at_eof(&self) -> bool {
        self.exhausted && self.remaining() == 0
    }

    pub fn peek_matches(&mut self, literal: &[u8]) -> Result<bool> {
        self.ensure(literal.len())?;
        Ok(self.buffer[self.pos..self.end].starts_with(literal))
    }

    /// The next unread byte without consuming it, `None` at end of input.
    pub fn peek(&mut self) -> Result<Option<u8>> {
        self.ensure(1)?;
        Ok(self.buffer[self.pos..self.end].first().copied())
    }

    fn consume(&mut self, n: usize) {
        self.pos += n;
        self.offset += n as u64;
    }

    pub fn read_one(&mut self) -> Result<u8> {
        self.ensure(1)?;
        if self.remaining() == 0 {
            return Err(DumpError::UnexpectedEof {
                offset: self.offset,
            });
        }
        let byte = self.buffer[self.pos];
        self.consume(1);
        Ok(byte)
    }

    /// Accumulate bytes up to the first one found in `delimiters`, which is
    /// consumed but not returned. With `strip_trailing`, the run of delimiter
    /// bytes right after it is consumed as well.
    pub fn read_until(&mut self, delimiters: &[u8], strip_trailing: bool) -> Result<Vec<u8>> {
        let (result, terminated) = self.scan_until(delimiters)?;
        if !terminated {
            return Err(DumpError::UnexpectedEof {
                offset: self.offset,
            });
        }

        if strip_trailing {
            self.skip_while_in(delimiters)?;
        }

        Ok(result)
    }

    /// Like `read_until` without stripping, but the end of input also ends
    /// the run.
    pub fn read_until_or_eof(&mut self, delimiters: &[u8]) -> Result<Vec<u8>> {
        self.scan_until(delimiters).map(|(result, _)| result)
    }

    /// Bytes before the first delimiter, and whether one was found before
    /// the source ran out.
    fn scan_until(&mut self, delimiters: &[u8]) -> Result<(Vec<u8>, bool)> {
        let mut result = Vec::new();

        loop {
            self.ensure(1)?;
            if self.remaining() == 0 {
                return Ok((result, false));
            }

            let window = &self.buffer[self.pos..self.end];
            match window.iter().position(|b| delimiters.contains(b)) {
                Some(index) => {
                    result.extend_from_slice(&window[..index]);
                    self.consume(index + 1);
                    return Ok((result, true));
                }
                None => {
                    result.extend_from_slice(window);
                    let taken = window.len();
                    self.consume(taken);
                }
            }
        }
    }

    pub fn skip_while_in(&mut self, delimiters: &[u8]) -> Result<()> {
        loop {
            match self.peek()? {
                Some(byte) if delimiters.contains(&byte) => self.consume(1),
                _ => return Ok(()),
            }
        }
    }

    /// Step back over `n` consumed bytes. Only the overlap byte survives a
    /// refill; anything further back is a caller bug.
    pub fn rewind(&mut self, n: usize) -> Result<()> {
        if n > self.pos {
            return Err(DumpError::RewindUnderflow {
                requested: n,
                available: self.pos,
            });
        }
        self.pos -= n;
        self.offset -= n as u64;
        Ok(())
    }

    /// Up to `max` unread bytes, lossily decoded, for error messages.
    pub fn snippet(&mut self, max: usize) -> Result<String> {
        self.ensure(max)?;
        let end = self.end.min(self.pos + max);
        Ok(String::from_utf8_lossy(&self.buffer[self.pos..end]).into_owned())
    }
}
