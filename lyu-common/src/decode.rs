//! Incremental transcoding of lyrics files to UTF-8
//!
//! The tokenizer only understands ASCII-compatible input, while lyrics files
//! are saved as UTF-16. [`Utf8Transcoder`] sits between the file and the
//! tokenizer and converts one buffer at a time, so a reader that stops early
//! never decodes the rest of the file. An invalid byte sequence is reported
//! only once every character before it has been handed out.

use std::io::{self, BufRead, Read};

use encoding_rs::{Decoder, DecoderResult, Encoding, UTF_16BE, UTF_16LE, UTF_8};

/// How far into a BOM-less file to look for an `<?xml ... encoding=".."?>` label
const DECLARATION_SCAN_LIMIT: usize = 256;

const CHUNK_SIZE: usize = 8 * 1024;

/// Pick the encoding of `input` from its first buffer and skip any byte
/// order mark: BOM first, then a declared encoding, then UTF-8
pub(crate) fn transcode<R: BufRead>(mut input: R) -> io::Result<Utf8Transcoder<R>> {
    let head = input.fill_buf()?;
    let (encoding, bom_len) = match Encoding::for_bom(head) {
        Some(found) => found,
        None => (declared_encoding(head).unwrap_or(UTF_8), 0),
    };
    input.consume(bom_len);
    Ok(Utf8Transcoder::new(input, encoding))
}

/// Encoding named by an ASCII `<?xml ...?>` declaration at the start of `head`
pub(crate) fn declared_encoding(head: &[u8]) -> Option<&'static Encoding> {
    let head = &head[..head.len().min(DECLARATION_SCAN_LIMIT)];
    if !head.starts_with(b"<?xml") {
        return None;
    }

    let end = head.windows(2).position(|w| w == b"?>")?;
    let declaration = std::str::from_utf8(&head[..end]).ok()?;

    let after = &declaration[declaration.find("encoding")? + "encoding".len()..];
    let value = after.trim_start().strip_prefix('=')?.trim_start();
    let quote = value.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let label = value[1..].split(quote).next()?;

    let encoding = Encoding::for_label(label.trim().as_bytes())?;
    // An ASCII-readable declaration cannot have been written in UTF-16
    if encoding == UTF_16LE || encoding == UTF_16BE {
        return None;
    }
    Some(encoding)
}

/// `Read` adapter yielding the UTF-8 form of an encoded byte stream
pub(crate) struct Utf8Transcoder<R> {
    inner: R,
    encoding: &'static Encoding,
    decoder: Decoder,
    raw: Vec<u8>,
    raw_start: usize,
    raw_end: usize,
    decoded: Vec<u8>,
    decoded_start: usize,
    decoded_end: usize,
    input_done: bool,
    finished: bool,
    malformed: bool,
}

impl<R: Read> Utf8Transcoder<R> {
    fn new(inner: R, encoding: &'static Encoding) -> Self {
        let decoder = encoding.new_decoder_without_bom_handling();
        let decoded_len = decoder
            .max_utf8_buffer_length_without_replacement(CHUNK_SIZE)
            .unwrap_or(CHUNK_SIZE * 3);

        Self {
            inner,
            encoding,
            decoder,
            raw: vec![0; CHUNK_SIZE],
            raw_start: 0,
            raw_end: 0,
            decoded: vec![0; decoded_len],
            decoded_start: 0,
            decoded_end: 0,
            input_done: false,
            finished: false,
            malformed: false,
        }
    }

    pub(crate) fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    fn invalid_data(&self) -> io::Error {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "invalid character in the given encoding ({})",
                self.encoding.name()
            ),
        )
    }
}

impl<R: Read> Read for Utf8Transcoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.decoded_start < self.decoded_end {
                let available = &self.decoded[self.decoded_start..self.decoded_end];
                let n = available.len().min(buf.len());
                buf[..n].copy_from_slice(&available[..n]);
                self.decoded_start += n;
                return Ok(n);
            }
            if self.malformed {
                return Err(self.invalid_data());
            }
            if self.finished {
                return Ok(0);
            }

            if self.raw_start == self.raw_end && !self.input_done {
                let n = self.inner.read(&mut self.raw)?;
                self.raw_start = 0;
                self.raw_end = n;
                self.input_done = n == 0;
            }

            let (result, read, written) = self.decoder.decode_to_utf8_without_replacement(
                &self.raw[self.raw_start..self.raw_end],
                &mut self.decoded,
                self.input_done,
            );
            self.raw_start += read;
            self.decoded_start = 0;
            self.decoded_end = written;

            match result {
                DecoderResult::InputEmpty => self.finished = self.input_done,
                DecoderResult::OutputFull => {}
                // Hand out what decoded cleanly before failing
                DecoderResult::Malformed(_, _) => self.malformed = true,
            }
        }
    }
}
