//! Byte level sources and sinks.
//!
//! Every reader and writer in the codec works against these two types, so the
//! same code path serves a caller supplied buffer and an `std::io` stream.

use crate::constants::STREAM_SCRATCH_SIZE;
use crate::error::JlsError;
use std::io::{ErrorKind, Read, Write};

/// Source of compressed bytes.
pub enum ByteSource<'a> {
    /// Bounded memory buffer.
    Buffer { data: &'a [u8], position: usize },
    /// Unbounded reader. `pending` holds peeked bytes, the next byte last.
    Stream {
        reader: &'a mut dyn Read,
        pending: Vec<u8>,
        position: usize,
    },
}

impl<'a> ByteSource<'a> {
    pub fn from_slice(data: &'a [u8]) -> Self {
        Self::Buffer { data, position: 0 }
    }

    pub fn from_reader(reader: &'a mut dyn Read) -> Self {
        Self::Stream {
            reader,
            pending: Vec::new(),
            position: 0,
        }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        match self {
            Self::Buffer { position, .. } | Self::Stream { position, .. } => *position,
        }
    }

    /// Reads the next byte, or `None` at the end of the data.
    pub fn try_read_u8(&mut self) -> Result<Option<u8>, JlsError> {
        match self {
            Self::Buffer { data, position } => {
                let value = data.get(*position).copied();
                if value.is_some() {
                    *position += 1;
                }
                Ok(value)
            }
            Self::Stream {
                reader,
                pending,
                position,
            } => {
                let value = match pending.pop() {
                    Some(byte) => Some(byte),
                    None => read_stream_byte(&mut **reader)?,
                };
                if value.is_some() {
                    *position += 1;
                }
                Ok(value)
            }
        }
    }

    pub fn read_u8(&mut self) -> Result<u8, JlsError> {
        self.try_read_u8()?.ok_or(JlsError::CompressedBufferTooSmall)
    }

    pub fn read_u16(&mut self) -> Result<u16, JlsError> {
        let high = self.read_u8()? as u16;
        let low = self.read_u8()? as u16;
        Ok((high << 8) | low)
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, JlsError> {
        match self {
            Self::Buffer { data, position } => {
                let end = position
                    .checked_add(count)
                    .filter(|&end| end <= data.len())
                    .ok_or(JlsError::CompressedBufferTooSmall)?;
                let bytes = data[*position..end].to_vec();
                *position = end;
                Ok(bytes)
            }
            Self::Stream { .. } => (0..count).map(|_| self.read_u8()).collect(),
        }
    }

    /// Looks at the byte `offset` positions ahead without consuming anything.
    pub fn peek_u8(&mut self, offset: usize) -> Result<Option<u8>, JlsError> {
        match self {
            Self::Buffer { data, position } => Ok(data.get(*position + offset).copied()),
            Self::Stream {
                reader, pending, ..
            } => {
                while pending.len() <= offset {
                    match read_stream_byte(&mut **reader)? {
                        Some(byte) => pending.insert(0, byte),
                        None => return Ok(None),
                    }
                }
                Ok(Some(pending[pending.len() - 1 - offset]))
            }
        }
    }
}

impl<'a> From<&'a [u8]> for ByteSource<'a> {
    fn from(data: &'a [u8]) -> Self {
        Self::from_slice(data)
    }
}

fn read_stream_byte(reader: &mut dyn Read) -> Result<Option<u8>, JlsError> {
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(error) if error.kind() == ErrorKind::Interrupted => continue,
            Err(error) => return Err(error.into()),
        }
    }
}

/// Destination for compressed or decoded bytes.
pub enum ByteSink<'a> {
    /// Bounded memory buffer; writes past its end fail without touching it.
    Buffer { data: &'a mut [u8], position: usize },
    /// Unbounded writer, buffered through `scratch`.
    Stream {
        writer: &'a mut dyn Write,
        scratch: Vec<u8>,
        written: usize,
    },
}

impl<'a> ByteSink<'a> {
    pub fn from_slice(data: &'a mut [u8]) -> Self {
        Self::Buffer { data, position: 0 }
    }

    pub fn from_writer(writer: &'a mut dyn Write) -> Self {
        Self::Stream {
            writer,
            scratch: Vec::with_capacity(STREAM_SCRATCH_SIZE),
            written: 0,
        }
    }

    /// Total number of bytes accepted so far, including skipped bytes.
    pub fn bytes_written(&self) -> usize {
        match self {
            Self::Buffer { position, .. } => *position,
            Self::Stream {
                scratch, written, ..
            } => *written + scratch.len(),
        }
    }

    /// Remaining room for bounded sinks, `None` for streams.
    pub fn remaining_capacity(&self) -> Option<usize> {
        match self {
            Self::Buffer { data, position } => Some(data.len() - *position),
            Self::Stream { .. } => None,
        }
    }

    pub fn write_u8(&mut self, value: u8) -> Result<(), JlsError> {
        match self {
            Self::Buffer { data, position } => {
                let slot = data.get_mut(*position).ok_or(JlsError::CompressedBufferTooSmall)?;
                *slot = value;
                *position += 1;
                Ok(())
            }
            Self::Stream { scratch, .. } => {
                scratch.push(value);
                if scratch.len() >= STREAM_SCRATCH_SIZE {
                    self.flush_scratch()?;
                }
                Ok(())
            }
        }
    }

    pub fn write_u16(&mut self, value: u16) -> Result<(), JlsError> {
        self.write_bytes(&value.to_be_bytes())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), JlsError> {
        match self {
            Self::Buffer { data, position } => {
                let end = position
                    .checked_add(bytes.len())
                    .filter(|&end| end <= data.len())
                    .ok_or(JlsError::CompressedBufferTooSmall)?;
                data[*position..end].copy_from_slice(bytes);
                *position = end;
                Ok(())
            }
            Self::Stream { scratch, .. } => {
                scratch.extend_from_slice(bytes);
                if scratch.len() >= STREAM_SCRATCH_SIZE {
                    self.flush_scratch()?;
                }
                Ok(())
            }
        }
    }

    /// Moves past `count` bytes: buffer content is left untouched, streams receive zeros.
    pub fn skip(&mut self, count: usize) -> Result<(), JlsError> {
        match self {
            Self::Buffer { data, position } => {
                let end = position
                    .checked_add(count)
                    .filter(|&end| end <= data.len())
                    .ok_or(JlsError::CompressedBufferTooSmall)?;
                *position = end;
                Ok(())
            }
            Self::Stream { .. } => {
                for _ in 0..count {
                    self.write_u8(0)?;
                }
                Ok(())
            }
        }
    }

    /// Pushes buffered bytes to the underlying writer.
    pub fn flush(&mut self) -> Result<(), JlsError> {
        self.flush_scratch()?;
        if let Self::Stream { writer, .. } = self {
            writer.flush()?;
        }
        Ok(())
    }

    fn flush_scratch(&mut self) -> Result<(), JlsError> {
        if let Self::Stream {
            writer,
            scratch,
            written,
        } = self
        {
            writer.write_all(scratch)?;
            *written += scratch.len();
            scratch.clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_source_reads_and_peeks() {
        let data = [0x12, 0x34, 0x56];
        let mut source = ByteSource::from_slice(&data);
        assert_eq!(source.read_u16().unwrap(), 0x1234);
        assert_eq!(source.peek_u8(0).unwrap(), Some(0x56));
        assert_eq!(source.peek_u8(1).unwrap(), None);
        assert_eq!(source.position(), 2);
        assert_eq!(source.read_bytes(2), Err(JlsError::CompressedBufferTooSmall));
        assert_eq!(source.read_bytes(1).unwrap(), vec![0x56]);
        assert_eq!(source.read_u8(), Err(JlsError::CompressedBufferTooSmall));
    }

    #[test]
    fn stream_source_peeks_ahead() {
        let data = [1u8, 2, 3];
        let mut reader: &[u8] = &data;
        let mut source = ByteSource::from_reader(&mut reader);
        assert_eq!(source.peek_u8(1).unwrap(), Some(2));
        assert_eq!(source.peek_u8(0).unwrap(), Some(1));
        assert_eq!(source.read_u8().unwrap(), 1);
        assert_eq!(source.read_bytes(2).unwrap(), vec![2, 3]);
        assert_eq!(source.try_read_u8().unwrap(), None);
        assert_eq!(source.position(), 3);
    }

    #[test]
    fn buffer_sink_never_writes_past_capacity() {
        let mut data = [0u8; 3];
        let mut sink = ByteSink::from_slice(&mut data);
        sink.write_u16(0xABCD).unwrap();
        assert_eq!(sink.write_u16(0x1234), Err(JlsError::CompressedBufferTooSmall));
        assert_eq!(sink.remaining_capacity(), Some(1));
        sink.write_u8(0xEF).unwrap();
        assert_eq!(sink.write_u8(0), Err(JlsError::CompressedBufferTooSmall));
        assert_eq!(data, [0xAB, 0xCD, 0xEF]);
    }

    #[test]
    fn stream_sink_flushes_through_scratch() {
        let mut output = Vec::new();
        {
            let mut sink = ByteSink::from_writer(&mut output);
            let block = vec![7u8; STREAM_SCRATCH_SIZE + 10];
            sink.write_bytes(&block).unwrap();
            sink.skip(2).unwrap();
            assert_eq!(sink.bytes_written(), STREAM_SCRATCH_SIZE + 12);
            sink.flush().unwrap();
        }
        assert_eq!(output.len(), STREAM_SCRATCH_SIZE + 12);
        assert_eq!(&output[output.len() - 2..], &[0, 0]);
    }
}
