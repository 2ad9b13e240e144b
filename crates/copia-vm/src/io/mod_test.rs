// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the stream backends.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::{ReaderSource, SinkStream, SourceStream, StringSink, StringSource, WriterSink};
use crate::memory::conspage::Heap;
use crate::types::CellPtr;

#[test]
fn string_source_yields_each_character() {
    let mut source = StringSource::new("ab");
    assert_eq!(source.getwc(), Some('a'));
    assert_eq!(source.getwc(), Some('b'));
    assert_eq!(source.getwc(), None);
    assert!(source.feof());
}

#[test]
fn pushback_is_returned_first() {
    let mut source = StringSource::new("xyz");
    assert_eq!(source.getwc(), Some('x'));
    source.ungetwc('x');
    assert_eq!(source.getwc(), Some('x'));
    assert_eq!(source.getwc(), Some('y'));
}

#[test]
fn pushback_at_end_of_stream_unsets_eof() {
    let mut source = StringSource::new("a");
    assert_eq!(source.getwc(), Some('a'));
    assert!(source.feof());
    source.ungetwc('a');
    assert!(!source.feof());
    assert_eq!(source.getwc(), Some('a'));
}

#[test]
fn closed_source_reads_nothing() {
    let mut source = StringSource::new("abc");
    source.close();
    assert_eq!(source.getwc(), None);
    assert!(source.feof());
}

#[test]
fn reader_source_decodes_utf8() {
    let bytes: &[u8] = "h\u{e9}\u{3bb}\u{1f600}".as_bytes();
    let mut source = ReaderSource::new(bytes);
    assert_eq!(source.getwc(), Some('h'));
    assert_eq!(source.getwc(), Some('\u{e9}'));
    assert_eq!(source.getwc(), Some('\u{3bb}'));
    assert_eq!(source.getwc(), Some('\u{1f600}'));
    assert_eq!(source.getwc(), None);
}

#[test]
fn reader_source_replaces_malformed_sequences() {
    let bytes: &[u8] = &[0xff, b'a'];
    let mut source = ReaderSource::new(bytes);
    assert_eq!(source.getwc(), Some(char::REPLACEMENT_CHARACTER));
    assert_eq!(source.getwc(), Some('a'));
}

#[test]
fn writer_sink_encodes_utf8() {
    let mut buffer = Vec::new();
    {
        let mut sink = WriterSink::new(&mut buffer);
        sink.putwc('\u{3bb}');
        sink.write_str("ok");
        sink.flush();
    }
    assert_eq!(String::from_utf8(buffer).unwrap(), "\u{3bb}ok");
}

#[test]
fn string_sink_collects_writes() {
    let sink = StringSink::new();
    let mut writer = sink.clone();
    writer.write_str("hello ");
    writer.putwc('w');
    assert_eq!(sink.contents(), "hello w");
}

#[test]
fn stream_cells_plumb_characters_through_the_heap() {
    let mut heap = Heap::new();
    let stream = heap.make_read_stream(Box::new(StringSource::new("ok")), CellPtr::NIL);
    heap.inc_ref(stream);

    assert_eq!(heap.stream_getwc(stream), Some('o'));
    heap.stream_ungetwc(stream, 'o');
    assert_eq!(heap.stream_getwc(stream), Some('o'));
    assert_eq!(heap.stream_getwc(stream), Some('k'));
    assert!(heap.stream_feof(stream));

    // Freeing the cell runs the close finaliser.
    heap.dec_ref(stream);
    assert!(heap.freep(stream));
}

#[test]
fn sink_cells_plumb_strings_through_the_heap() {
    let mut heap = Heap::new();
    let sink = StringSink::new();
    let cell = heap.make_write_stream(Box::new(sink.clone()), CellPtr::NIL);
    heap.inc_ref(cell);

    heap.sink_write_str(cell, "printed");
    heap.sink_flush(cell);
    assert_eq!(sink.contents(), "printed");
}
