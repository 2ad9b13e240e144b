// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Communication between Copia and the outside world.
//!
//! The reader is character-oriented; everything it consumes implements
//! [`SourceStream`]: one decoded character at a time, with one character
//! of pushback guaranteed. Printers write through [`SinkStream`]. Local
//! files, strings and the standard streams are provided here; URL-backed
//! transport is an external collaborator installed through
//! [`crate::vm::Vm::set_url_opener`], and its streams are treated exactly
//! like local ones.

#[cfg(test)]
mod mod_test;
#[cfg(test)]
mod print_test;

pub mod print;
pub mod read;

use std::io::Read;

use thiserror::Error;

use crate::memory::cell::Payload;
use crate::memory::conspage::Heap;
use crate::types::CellPtr;

/// A stream of characters open for reading.
pub trait SourceStream {
    /// Fetch the next character, or `None` at end of stream.
    fn getwc(&mut self) -> Option<char>;

    /// Push one character back; the next [`SourceStream::getwc`] returns
    /// it. One character of pushback is guaranteed.
    fn ungetwc(&mut self, c: char);

    /// True once the end of the stream has been reached.
    fn feof(&self) -> bool;

    /// Release the backing resource. Runs at the latest when the owning
    /// stream cell is freed.
    fn close(&mut self) {}
}

/// A stream of characters open for writing.
pub trait SinkStream {
    /// Write one character.
    fn putwc(&mut self, c: char);

    /// Write every character of this string.
    fn write_str(&mut self, s: &str) {
        for c in s.chars() {
            self.putwc(c);
        }
    }

    /// Flush buffered output.
    fn flush(&mut self) {}

    /// Release the backing resource.
    fn close(&mut self) {}
}

/// A source stream over an in-memory string.
pub struct StringSource {
    chars: Vec<char>,
    position: usize,
    pushback: Option<char>,
    closed: bool,
}

impl StringSource {
    /// Create a source over this text.
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            position: 0,
            pushback: None,
            closed: false,
        }
    }
}

impl SourceStream for StringSource {
    fn getwc(&mut self) -> Option<char> {
        if self.closed {
            return None;
        }
        if let Some(c) = self.pushback.take() {
            return Some(c);
        }
        let c = self.chars.get(self.position).copied();
        if c.is_some() {
            self.position += 1;
        }
        c
    }

    fn ungetwc(&mut self, c: char) {
        self.pushback = Some(c);
    }

    fn feof(&self) -> bool {
        self.closed || (self.pushback.is_none() && self.position >= self.chars.len())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// A source stream decoding UTF-8 from any byte reader.
pub struct ReaderSource<R: Read> {
    inner: R,
    pushback: Option<char>,
    eof: bool,
    closed: bool,
}

impl<R: Read> ReaderSource<R> {
    /// Wrap this byte reader.
    pub const fn new(inner: R) -> Self {
        Self {
            inner,
            pushback: None,
            eof: false,
            closed: false,
        }
    }

    /// Decode one UTF-8 character from the byte reader.
    ///
    /// Malformed sequences decode to the replacement character rather than
    /// aborting the read.
    fn next_char(&mut self) -> Option<char> {
        let mut first = [0u8; 1];
        match self.inner.read(&mut first) {
            Ok(0) | Err(_) => return None,
            Ok(_) => {}
        }

        let len = match first[0] {
            0x00..=0x7f => return Some(char::from(first[0])),
            0xc0..=0xdf => 2,
            0xe0..=0xef => 3,
            0xf0..=0xf7 => 4,
            _ => return Some(char::REPLACEMENT_CHARACTER),
        };

        let mut buffer = [0u8; 4];
        buffer[0] = first[0];
        let mut filled = 1;
        while filled < len {
            match self.inner.read(&mut buffer[filled..len]) {
                Ok(0) | Err(_) => break,
                Ok(n) => filled += n,
            }
        }

        match core::str::from_utf8(&buffer[..filled]) {
            Ok(s) => s.chars().next(),
            Err(_) => Some(char::REPLACEMENT_CHARACTER),
        }
    }
}

impl<R: Read> SourceStream for ReaderSource<R> {
    fn getwc(&mut self) -> Option<char> {
        if self.closed {
            return None;
        }
        if let Some(c) = self.pushback.take() {
            return Some(c);
        }
        let c = self.next_char();
        if c.is_none() {
            self.eof = true;
        }
        c
    }

    fn ungetwc(&mut self, c: char) {
        self.pushback = Some(c);
        self.eof = false;
    }

    fn feof(&self) -> bool {
        self.closed || (self.eof && self.pushback.is_none())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// A sink stream encoding UTF-8 onto any byte writer.
pub struct WriterSink<W: std::io::Write> {
    inner: W,
}

impl<W: std::io::Write> WriterSink<W> {
    /// Wrap this byte writer.
    pub const fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: std::io::Write> SinkStream for WriterSink<W> {
    fn putwc(&mut self, c: char) {
        let mut buffer = [0u8; 4];
        let _ = self.inner.write_all(c.encode_utf8(&mut buffer).as_bytes());
    }

    fn write_str(&mut self, s: &str) {
        let _ = self.inner.write_all(s.as_bytes());
    }

    fn flush(&mut self) {
        let _ = std::io::Write::flush(&mut self.inner);
    }

    fn close(&mut self) {
        self.flush();
    }
}

/// A sink stream collecting into a shared string buffer; the test double
/// for output streams.
#[derive(Clone, Default)]
pub struct StringSink {
    buffer: std::rc::Rc<std::cell::RefCell<String>>,
}

impl StringSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    #[must_use]
    pub fn contents(&self) -> String {
        self.buffer.borrow().clone()
    }
}

impl SinkStream for StringSink {
    fn putwc(&mut self, c: char) {
        self.buffer.borrow_mut().push(c);
    }

    fn write_str(&mut self, s: &str) {
        self.buffer.borrow_mut().push_str(s);
    }
}

/// A URL stream delivered by the host's transport.
pub struct UrlStream {
    /// The decoded character stream.
    pub stream: Box<dyn SourceStream>,
    /// The transport's status code, when it reports one.
    pub status_code: Option<i64>,
}

/// The pluggable URL transport: maps a URL to an open stream.
pub type UrlOpener = Box<dyn Fn(&str) -> std::io::Result<UrlStream>>;

/// Host-level session failures: everything that is not expressible as an
/// in-band Lisp exception.
#[derive(Debug, Error)]
pub enum SessionError {
    /// An operating-system level I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// A batch evaluation ended with an uncaught Lisp exception.
    #[error("uncaught exception: {0}")]
    Uncaught(String),
}

/// Stream plumbing on cells.
impl Heap {
    /// Fetch the next character from the stream wrapped by this cell.
    pub fn stream_getwc(&mut self, p: CellPtr) -> Option<char> {
        match &mut self.cell_mut(p).payload {
            Payload::Read { stream, .. } => stream.getwc(),
            _ => None,
        }
    }

    /// Push one character back onto the stream wrapped by this cell.
    pub fn stream_ungetwc(&mut self, p: CellPtr, c: char) {
        if let Payload::Read { stream, .. } = &mut self.cell_mut(p).payload {
            stream.ungetwc(c);
        }
    }

    /// True if the stream wrapped by this cell is at end of input.
    #[must_use]
    pub fn stream_feof(&self, p: CellPtr) -> bool {
        match &self.cell(p).payload {
            Payload::Read { stream, .. } => stream.feof(),
            _ => true,
        }
    }

    /// Close the stream or sink wrapped by this cell.
    pub fn stream_close(&mut self, p: CellPtr) {
        match &mut self.cell_mut(p).payload {
            Payload::Read { stream, .. } => stream.close(),
            Payload::Write { sink, .. } => sink.close(),
            _ => {}
        }
    }

    /// Write a string through the sink wrapped by this cell.
    pub fn sink_write_str(&mut self, p: CellPtr, s: &str) {
        if let Payload::Write { sink, .. } = &mut self.cell_mut(p).payload {
            sink.write_str(s);
        }
    }

    /// Flush the sink wrapped by this cell.
    pub fn sink_flush(&mut self, p: CellPtr) {
        if let Payload::Write { sink, .. } = &mut self.cell_mut(p).payload {
            sink.flush();
        }
    }
}
