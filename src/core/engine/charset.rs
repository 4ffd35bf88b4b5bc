//! Character encodings the final serializer can write.

use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    Latin1,
    Ascii,
}

impl Charset {
    /// Case-insensitive lookup of an `encoding` output property. `None` for
    /// encodings this serializer cannot produce.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(Charset::Utf8),
            "iso-8859-1" | "iso8859-1" | "iso_8859-1" | "latin1" | "l1" => Some(Charset::Latin1),
            "us-ascii" | "ascii" => Some(Charset::Ascii),
            _ => None,
        }
    }

    /// Canonical name, as written in the XML declaration.
    pub fn name(&self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::Latin1 => "ISO-8859-1",
            Charset::Ascii => "US-ASCII",
        }
    }

    fn max_code_point(&self) -> u32 {
        match self {
            Charset::Utf8 => char::MAX as u32,
            Charset::Latin1 => 0xFF,
            Charset::Ascii => 0x7F,
        }
    }
}

/// Re-encodes the UTF-8 produced by the XML writer.
///
/// Characters the charset cannot hold become numeric character references
/// when `references` is set (markup output) and an `InvalidData` error
/// otherwise (text output). A UTF-8 sequence split across two writes is
/// held back until it is complete.
pub struct EncodingWriter<'a> {
    inner: &'a mut dyn Write,
    charset: Charset,
    references: bool,
    pending: Vec<u8>,
}

impl<'a> EncodingWriter<'a> {
    pub fn new(inner: &'a mut dyn Write, charset: Charset, references: bool) -> Self {
        Self {
            inner,
            charset,
            references,
            pending: Vec::new(),
        }
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }
}

impl Write for EncodingWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.charset == Charset::Utf8 {
            return self.inner.write(buf);
        }

        self.pending.extend_from_slice(buf);
        let complete = match std::str::from_utf8(&self.pending) {
            Ok(text) => text.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(e) => return Err(io::Error::new(io::ErrorKind::InvalidData, e)),
        };
        let text = std::str::from_utf8(&self.pending[..complete])
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let limit = self.charset.max_code_point();
        let mut encoded = Vec::with_capacity(complete);
        for ch in text.chars() {
            let code = ch as u32;
            if code <= limit {
                encoded.push(code as u8);
            } else if self.references {
                encoded.extend_from_slice(format!("&#{};", code).as_bytes());
            } else {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "character U+{:04X} cannot be written as {}",
                        code,
                        self.charset.name()
                    ),
                ));
            }
        }

        self.inner.write_all(&encoded)?;
        self.pending.drain(..complete);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "output ends inside a UTF-8 sequence",
            ));
        }
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_case_insensitive() {
        assert_eq!(Charset::from_label("ISO-8859-1"), Some(Charset::Latin1));
        assert_eq!(Charset::from_label(" utf-8 "), Some(Charset::Utf8));
        assert_eq!(Charset::from_label("US-ASCII"), Some(Charset::Ascii));
        assert_eq!(Charset::from_label("Shift_JIS"), None);
    }

    #[test]
    fn latin1_writes_single_bytes() {
        let mut out = Vec::new();
        {
            let mut writer = EncodingWriter::new(&mut out, Charset::Latin1, true);
            writer.write_all("café".as_bytes()).unwrap();
            writer.flush().unwrap();
        }
        assert_eq!(out, b"caf\xe9");
    }

    #[test]
    fn split_sequence_is_completed_by_next_write() {
        let bytes = "é".as_bytes();
        let mut out = Vec::new();
        {
            let mut writer = EncodingWriter::new(&mut out, Charset::Latin1, true);
            writer.write_all(&bytes[..1]).unwrap();
            writer.write_all(&bytes[1..]).unwrap();
            writer.flush().unwrap();
        }
        assert_eq!(out, vec![0xe9]);
    }

    #[test]
    fn unrepresentable_characters_become_references() {
        let mut out = Vec::new();
        {
            let mut writer = EncodingWriter::new(&mut out, Charset::Ascii, true);
            writer.write_all("a€b".as_bytes()).unwrap();
        }
        assert_eq!(String::from_utf8(out).unwrap(), "a&#8364;b");
    }

    #[test]
    fn text_output_rejects_unrepresentable_characters() {
        let mut out = Vec::new();
        let mut writer = EncodingWriter::new(&mut out, Charset::Ascii, false);
        let err = writer.write_all("€".as_bytes()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
