use super::{Encoding, Writer};
use bytes::Bytes;
use flate2::Compression;
use flate2::write::{GzEncoder, ZlibEncoder};
use std::io;
use std::io::Write;
use tracing::trace;
use zstd::stream::write::Encoder as ZstdEncoder;
// (almost thanks and) copy from actix-http: https://github.com/actix/actix-web/blob/master/actix-http/src/encoding/encoder.rs

/// A compressing writer for one of the supported encodings.
pub(crate) enum Encoder {
    /// Gzip encoding.
    Gzip(GzEncoder<Writer>),
    /// Deflate encoding.
    Deflate(ZlibEncoder<Writer>),
    /// Zstd encoding.
    Zstd(ZstdEncoder<'static, Writer>),
    /// Brotli encoding.
    Br(Box<brotli::CompressorWriter<Writer>>),
}

impl Encoder {
    pub(crate) fn new(encoding: Encoding) -> io::Result<Self> {
        match encoding {
            Encoding::Gzip => Ok(Self::gzip()),
            Encoding::Deflate => Ok(Self::deflate()),
            Encoding::Zstd => Self::zstd(),
            Encoding::Br => Ok(Self::br()),
        }
    }

    fn gzip() -> Self {
        Self::Gzip(GzEncoder::new(Writer::new(), Compression::best()))
    }

    fn deflate() -> Self {
        Self::Deflate(ZlibEncoder::new(Writer::new(), Compression::best()))
    }

    fn zstd() -> io::Result<Self> {
        Ok(Self::Zstd(ZstdEncoder::new(Writer::new(), 6)?))
    }

    fn br() -> Self {
        Self::Br(Box::new(brotli::CompressorWriter::new(
            Writer::new(),
            32 * 1024, // 32 KiB buffer
            3,         // BROTLI_PARAM_QUALITY
            22,        // BROTLI_PARAM_LGWIN
        )))
    }

    fn encoding(&self) -> Encoding {
        match self {
            Encoder::Gzip(_) => Encoding::Gzip,
            Encoder::Deflate(_) => Encoding::Deflate,
            Encoder::Zstd(_) => Encoding::Zstd,
            Encoder::Br(_) => Encoding::Br,
        }
    }

    /// Finishes the encoding process and returns the encoded data.
    pub(crate) fn finish(self) -> io::Result<Bytes> {
        let writer = match self {
            Self::Gzip(encoder) => encoder.finish()?,
            Self::Deflate(encoder) => encoder.finish()?,
            Self::Zstd(encoder) => encoder.finish()?,
            Self::Br(mut encoder) => {
                encoder.flush()?;
                encoder.into_inner()
            }
        };
        Ok(writer.freeze())
    }
}

impl Write for Encoder {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let result = match self {
            Self::Gzip(encoder) => encoder.write(data),
            Self::Deflate(encoder) => encoder.write(data),
            Self::Zstd(encoder) => encoder.write(data),
            Self::Br(encoder) => encoder.write(data),
        };
        if let Err(err) = &result {
            trace!("Error encoding {} encoding: {}", self.encoding(), err);
        }
        result
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Gzip(encoder) => encoder.flush(),
            Self::Deflate(encoder) => encoder.flush(),
            Self::Zstd(encoder) => encoder.flush(),
            Self::Br(encoder) => encoder.flush(),
        }
    }
}
