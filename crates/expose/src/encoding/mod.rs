//! Module for compressing response bodies.
//!
//! The pipeline writes a payload either straight into an in-memory `Writer`, or through an
//! `Encoder` wrapping one, when the result asks for compression and the request accepts one of
//! the enabled [`Encoding`]s.
//!
//! The implementation is inspired by the actix-http crate's encoding functionality.

mod encoder;

pub(crate) use encoder::Encoder;

use bytes::{Bytes, BytesMut};
use std::fmt;
use std::io;

/// A content coding the pipeline can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Gzip,
    Deflate,
    Zstd,
    Br,
}

impl Encoding {
    /// The token used in `Accept-Encoding` and `Content-Encoding`.
    pub fn name(self) -> &'static str {
        match self {
            Encoding::Gzip => "gzip",
            Encoding::Deflate => "deflate",
            Encoding::Zstd => "zstd",
            Encoding::Br => "br",
        }
    }

    /// Picks the first of `enabled` that the `Accept-Encoding` value accepts.
    pub fn negotiate(accept_encoding: &str, enabled: &[Encoding]) -> Option<Encoding> {
        enabled.iter().copied().find(|encoding| accepts(accept_encoding, encoding.name()))
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether `coding` is acceptable, an explicit entry wins over `*`, and `q=0` refuses.
fn accepts(accept_encoding: &str, coding: &str) -> bool {
    let mut wildcard = false;
    for item in accept_encoding.split(',') {
        let mut parts = item.split(';');
        let token = parts.next().unwrap_or_default().trim();
        let refused = parts.any(is_zero_quality);
        if token.eq_ignore_ascii_case(coding) {
            return !refused;
        }
        if token == "*" {
            wildcard = !refused;
        }
    }
    wildcard
}

fn is_zero_quality(param: &str) -> bool {
    match param.split_once('=') {
        Some((key, value)) => {
            key.trim().eq_ignore_ascii_case("q") && value.trim().parse::<f32>().is_ok_and(|q| q <= 0.0)
        }
        None => false,
    }
}

// inspired by from actix-http
pub(crate) struct Writer {
    buf: BytesMut,
}

impl Writer {
    pub(crate) fn new() -> Self {
        Self { buf: BytesMut::with_capacity(4096) }
    }

    pub(crate) fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}

impl io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The output a payload is written to: plain, or compressed.
pub(crate) enum Sink {
    Identity(Writer),
    Encoded(Encoder),
}

impl Sink {
    pub(crate) fn new(encoding: Option<Encoding>) -> io::Result<Self> {
        match encoding {
            Some(encoding) => Ok(Sink::Encoded(Encoder::new(encoding)?)),
            None => Ok(Sink::Identity(Writer::new())),
        }
    }

    /// Completes the output and returns everything written.
    pub(crate) fn finish(self) -> io::Result<Bytes> {
        match self {
            Sink::Identity(writer) => Ok(writer.freeze()),
            Sink::Encoded(encoder) => encoder.finish(),
        }
    }
}

impl io::Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::Identity(writer) => writer.write(buf),
            Sink::Encoded(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Identity(writer) => writer.flush(),
            Sink::Encoded(encoder) => encoder.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Encoding, Sink};
    use std::io::Write;

    const ALL: [Encoding; 4] = [Encoding::Zstd, Encoding::Br, Encoding::Gzip, Encoding::Deflate];

    #[test]
    fn negotiate_plain_token() {
        assert_eq!(Encoding::negotiate("gzip", &[Encoding::Gzip]), Some(Encoding::Gzip));
        assert_eq!(Encoding::negotiate("gzip, deflate, br", &ALL), Some(Encoding::Br));
        assert_eq!(Encoding::negotiate("identity", &ALL), None);
        assert_eq!(Encoding::negotiate("", &ALL), None);
    }

    #[test]
    fn negotiate_respects_enabled_order() {
        assert_eq!(Encoding::negotiate("gzip, zstd", &[Encoding::Gzip, Encoding::Zstd]), Some(Encoding::Gzip));
        assert_eq!(Encoding::negotiate("br", &[Encoding::Gzip]), None);
    }

    #[test]
    fn negotiate_quality() {
        assert_eq!(Encoding::negotiate("gzip;q=0", &[Encoding::Gzip]), None);
        assert_eq!(Encoding::negotiate("gzip; q=0.5", &[Encoding::Gzip]), Some(Encoding::Gzip));
        assert_eq!(Encoding::negotiate("*", &[Encoding::Deflate]), Some(Encoding::Deflate));
        assert_eq!(Encoding::negotiate("*, gzip;q=0", &[Encoding::Gzip, Encoding::Deflate]), Some(Encoding::Deflate));
        assert_eq!(Encoding::negotiate("GZIP", &[Encoding::Gzip]), Some(Encoding::Gzip));
    }

    #[test]
    fn identity_sink_keeps_bytes() {
        let mut sink = Sink::new(None).unwrap();
        sink.write_all(b"Hello World").unwrap();
        assert_eq!(sink.finish().unwrap().as_ref(), b"Hello World");
    }
}
