//! Producers of response bodies.
//!
//! A [`Payload`] writes its content to an output exactly once: [`Payload::write_to`]
//! consumes the boxed producer, so it can not be replayed.

use bytes::Bytes;
use serde::Serialize;
use std::fmt;
use std::io::{self, Read, Write};

pub trait Payload: Send {
    /// Writes the whole content to `out`, returning the number of bytes written.
    fn write_to(self: Box<Self>, out: &mut dyn Write) -> io::Result<u64>;
}

fn write_bytes(bytes: &[u8], out: &mut dyn Write) -> io::Result<u64> {
    out.write_all(bytes)?;
    Ok(bytes.len() as u64)
}

impl Payload for String {
    fn write_to(self: Box<Self>, out: &mut dyn Write) -> io::Result<u64> {
        write_bytes(self.as_bytes(), out)
    }
}

impl Payload for &'static str {
    fn write_to(self: Box<Self>, out: &mut dyn Write) -> io::Result<u64> {
        write_bytes(self.as_bytes(), out)
    }
}

impl Payload for Vec<u8> {
    fn write_to(self: Box<Self>, out: &mut dyn Write) -> io::Result<u64> {
        write_bytes(&self, out)
    }
}

impl Payload for Bytes {
    fn write_to(self: Box<Self>, out: &mut dyn Write) -> io::Result<u64> {
        write_bytes(&self, out)
    }
}

/// Copies everything from a reader.
pub struct Reader<R>(pub R);

impl<R: Read + Send> Payload for Reader<R> {
    fn write_to(self: Box<Self>, out: &mut dyn Write) -> io::Result<u64> {
        let mut reader = self.0;
        io::copy(&mut reader, out)
    }
}

impl<R> fmt::Debug for Reader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reader").finish_non_exhaustive()
    }
}

/// Serializes the value as json.
///
/// The content type is not implied, pair it with
/// `ResponseOptions::default().with_content_type(mime::APPLICATION_JSON)`.
#[derive(Debug)]
pub struct Json<T>(pub T);

impl<T: Serialize + Send> Payload for Json<T> {
    fn write_to(self: Box<Self>, out: &mut dyn Write) -> io::Result<u64> {
        let bytes = serde_json::to_vec(&self.0).map_err(io::Error::from)?;
        write_bytes(&bytes, out)
    }
}

/// A payload produced by a closure.
pub struct WriteFn<F>(F);

/// Creates a payload from a closure that writes to the output directly.
pub fn write_fn<F>(f: F) -> WriteFn<F>
where
    F: FnOnce(&mut dyn Write) -> io::Result<u64> + Send,
{
    WriteFn(f)
}

impl<F> Payload for WriteFn<F>
where
    F: FnOnce(&mut dyn Write) -> io::Result<u64> + Send,
{
    fn write_to(self: Box<Self>, out: &mut dyn Write) -> io::Result<u64> {
        (self.0)(out)
    }
}

impl<F> fmt::Debug for WriteFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteFn").finish_non_exhaustive()
    }
}
