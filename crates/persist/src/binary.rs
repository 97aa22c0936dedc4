//! Sequential binary records.
//!
//! A record is a fixed sequence of little-endian fields with no tags, length
//! prefixes or version marker. Readers must consume fields in exactly the
//! order they were written; field order is the only integrity check.

use std::io::{Read, Write};

use uuid::Uuid;

use crate::definitions::DefinitionLookup;
use crate::error::PersistError;

/// A type that can write itself to, and populate itself from, a binary stream.
///
/// `deserialize` mutates an existing (usually default-constructed) instance.
/// On error the instance may be left partially populated.
pub trait BinarySerializable {
    fn serialize<W: Write>(
        &self,
        writer: &mut BinaryWriter<W>,
        definitions: &dyn DefinitionLookup,
    ) -> Result<(), PersistError>;

    fn deserialize<R: Read>(
        &mut self,
        reader: &mut BinaryReader<R>,
        definitions: &dyn DefinitionLookup,
    ) -> Result<(), PersistError>;
}

/// Construct a default instance and populate it from `reader`.
pub fn read_new<T, R>(
    reader: &mut BinaryReader<R>,
    definitions: &dyn DefinitionLookup,
) -> Result<T, PersistError>
where
    T: Default + BinarySerializable,
    R: Read,
{
    let mut value = T::default();
    value.deserialize(reader, definitions)?;
    Ok(value)
}

/// Serialize `value` into a fresh byte buffer.
pub fn to_bytes<T: BinarySerializable>(
    value: &T,
    definitions: &dyn DefinitionLookup,
) -> Result<Vec<u8>, PersistError> {
    let mut writer = BinaryWriter::new(Vec::new());
    value.serialize(&mut writer, definitions)?;
    Ok(writer.into_inner())
}

/// Deserialize a `T` from `bytes`. Trailing bytes are ignored.
pub fn from_bytes<T: Default + BinarySerializable>(
    bytes: &[u8],
    definitions: &dyn DefinitionLookup,
) -> Result<T, PersistError> {
    read_new(&mut BinaryReader::new(bytes), definitions)
}

/// Little-endian primitive writer.
#[derive(Debug)]
pub struct BinaryWriter<W> {
    inner: W,
}

impl<W: Write> BinaryWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn write_i32(&mut self, value: i32) -> std::io::Result<()> {
        self.inner.write_all(&value.to_le_bytes())
    }

    pub fn write_u16(&mut self, value: u16) -> std::io::Result<()> {
        self.inner.write_all(&value.to_le_bytes())
    }

    pub fn write_f32(&mut self, value: f32) -> std::io::Result<()> {
        self.inner.write_all(&value.to_le_bytes())
    }

    /// Writes the 16 raw bytes of `value`.
    pub fn write_uuid(&mut self, value: &Uuid) -> std::io::Result<()> {
        self.inner.write_all(value.as_bytes())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Little-endian primitive reader. A short stream yields `UnexpectedEof`.
#[derive(Debug)]
pub struct BinaryReader<R> {
    inner: R,
}

impl<R: Read> BinaryReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    fn read_array<const N: usize>(&mut self) -> std::io::Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn read_i32(&mut self) -> std::io::Result<i32> {
        self.read_array().map(i32::from_le_bytes)
    }

    pub fn read_u16(&mut self) -> std::io::Result<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    pub fn read_f32(&mut self) -> std::io::Result<f32> {
        self.read_array().map(f32::from_le_bytes)
    }

    pub fn read_uuid(&mut self) -> std::io::Result<Uuid> {
        self.read_array().map(Uuid::from_bytes)
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn primitives_are_little_endian() {
        let mut w = BinaryWriter::new(Vec::new());
        w.write_i32(1).unwrap();
        w.write_u16(0x0203).unwrap();
        w.write_f32(1.0).unwrap();
        assert_eq!(
            w.into_inner(),
            vec![1, 0, 0, 0, 0x03, 0x02, 0x00, 0x00, 0x80, 0x3f]
        );
    }

    #[test]
    fn reader_reads_back_in_order() {
        let id = Uuid::new_v4();
        let mut w = BinaryWriter::new(Vec::new());
        w.write_i32(-5).unwrap();
        w.write_f32(9.81).unwrap();
        w.write_uuid(&id).unwrap();
        let bytes = w.into_inner();
        assert_eq!(bytes.len(), 4 + 4 + 16);

        let mut r = BinaryReader::new(bytes.as_slice());
        assert_eq!(r.read_i32().unwrap(), -5);
        assert_eq!(r.read_f32().unwrap().to_bits(), 9.81f32.to_bits());
        assert_eq!(r.read_uuid().unwrap(), id);
    }

    #[test]
    fn short_stream_is_unexpected_eof() {
        let mut r = BinaryReader::new(&[1u8, 2, 3][..]);
        let err = r.read_i32().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }
}
