//! Bounds-checked big-endian reader for consumer offsets payloads.
//!
//! `bytes::Buf` panics on underflow, so every read checks `remaining()` first
//! and reports which field ran short.

use bytes::Buf;
use chrono::{DateTime, TimeZone, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReadError {
    /// Fewer bytes than the field needs
    Truncated(String),
    /// Bytes present but invalid for the field
    Malformed(String),
}

pub(crate) struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn ensure(&self, needed: usize, field: &str) -> Result<(), ReadError> {
        let available = self.buf.remaining();
        if available < needed {
            return Err(ReadError::Truncated(format!(
                "{field}: need {needed} byte(s), {available} available"
            )));
        }
        Ok(())
    }

    pub(crate) fn read_i16(&mut self, field: &str) -> Result<i16, ReadError> {
        self.ensure(2, field)?;
        Ok(self.buf.get_i16())
    }

    pub(crate) fn read_i32(&mut self, field: &str) -> Result<i32, ReadError> {
        self.ensure(4, field)?;
        Ok(self.buf.get_i32())
    }

    pub(crate) fn read_i64(&mut self, field: &str) -> Result<i64, ReadError> {
        self.ensure(8, field)?;
        Ok(self.buf.get_i64())
    }

    fn take(&mut self, len: usize, field: &str) -> Result<&'a [u8], ReadError> {
        self.ensure(len, field)?;
        let buf: &'a [u8] = self.buf;
        let (head, tail) = buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    fn take_utf8(&mut self, len: usize, field: &str) -> Result<String, ReadError> {
        let raw = self.take(len, field)?;
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|e| ReadError::Malformed(format!("{field}: invalid UTF-8: {e}")))
    }

    /// Reads an i16 length-prefixed string. Null (-1) is rejected.
    pub(crate) fn read_string(&mut self, field: &str) -> Result<String, ReadError> {
        let len = self.read_i16(field)?;
        if len < 0 {
            return Err(ReadError::Malformed(format!(
                "{field}: negative string length {len}"
            )));
        }
        self.take_utf8(len as usize, field)
    }

    /// Reads an i16 length-prefixed string where -1 means null.
    pub(crate) fn read_nullable_string(&mut self, field: &str) -> Result<Option<String>, ReadError> {
        let len = self.read_i16(field)?;
        match len {
            -1 => Ok(None),
            len if len < 0 => Err(ReadError::Malformed(format!(
                "{field}: invalid string length {len}"
            ))),
            len => self.take_utf8(len as usize, field).map(Some),
        }
    }

    /// Reads i32 length-prefixed opaque bytes. Null (-1) reads as empty.
    pub(crate) fn read_bytes(&mut self, field: &str) -> Result<Vec<u8>, ReadError> {
        let len = self.read_i32(field)?;
        match len {
            -1 => Ok(Vec::new()),
            len if len < 0 => Err(ReadError::Malformed(format!(
                "{field}: invalid bytes length {len}"
            ))),
            len => self.take(len as usize, field).map(<[u8]>::to_vec),
        }
    }

    /// Reads an i32 element count of an array.
    pub(crate) fn read_array_len(&mut self, field: &str) -> Result<usize, ReadError> {
        let len = self.read_i32(field)?;
        if len < 0 {
            return Err(ReadError::Malformed(format!(
                "{field}: negative array length {len}"
            )));
        }
        Ok(len as usize)
    }

    /// Reads an i64 millisecond timestamp.
    pub(crate) fn read_timestamp(&mut self, field: &str) -> Result<DateTime<Utc>, ReadError> {
        let millis = self.read_i64(field)?;
        millis_to_datetime(millis, field)
    }

    /// Reads an i64 millisecond timestamp where -1 means absent.
    pub(crate) fn read_optional_timestamp(
        &mut self,
        field: &str,
    ) -> Result<Option<DateTime<Utc>>, ReadError> {
        match self.read_i64(field)? {
            -1 => Ok(None),
            millis => millis_to_datetime(millis, field).map(Some),
        }
    }
}

fn millis_to_datetime(millis: i64, field: &str) -> Result<DateTime<Utc>, ReadError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| ReadError::Malformed(format!("{field}: timestamp {millis} out of range")))
}
