//! Binary primitives for versioned payloads.
//!
//! All integers are little-endian. Strings are a `u32` byte length followed by
//! UTF-8 bytes.

use crate::persist::{PersistError, PersistResult};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};
use std::ops::RangeInclusive;

/// Upper bound for one encoded string; guards allocation on corrupt input.
pub const MAX_STRING_BYTES: u32 = 1024 * 1024;

/// Writes the `int32` format version tag.
pub fn write_version(writer: &mut dyn Write, version: i32) -> PersistResult<()> {
    writer.write_i32::<LittleEndian>(version)?;
    Ok(())
}

/// Reads the version tag and checks it against `supported`.
pub fn read_version(reader: &mut dyn Read, supported: RangeInclusive<i32>) -> PersistResult<i32> {
    let version = reader.read_i32::<LittleEndian>()?;
    if !supported.contains(&version) {
        return Err(PersistError::IncompatibleVersion {
            found: version,
            oldest_supported: *supported.start(),
            newest_supported: *supported.end(),
        });
    }
    Ok(version)
}

pub fn write_str(writer: &mut dyn Write, value: &str) -> PersistResult<()> {
    let len = u32::try_from(value.len())
        .ok()
        .filter(|len| *len <= MAX_STRING_BYTES)
        .ok_or_else(|| {
            PersistError::Corrupt(format!("string of {} bytes is too long", value.len()))
        })?;
    writer.write_u32::<LittleEndian>(len)?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}

pub fn read_str(reader: &mut dyn Read) -> PersistResult<String> {
    let len = reader.read_u32::<LittleEndian>()?;
    if len > MAX_STRING_BYTES {
        return Err(PersistError::Corrupt(format!(
            "string length {len} exceeds limit {MAX_STRING_BYTES}"
        )));
    }
    let mut bytes = vec![0u8; len as usize];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|err| PersistError::Corrupt(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{read_str, read_version, write_str, write_version};
    use crate::persist::PersistError;
    use std::io::Cursor;

    #[test]
    fn version_tag_is_four_little_endian_bytes() {
        let mut bytes = Vec::new();
        write_version(&mut bytes, 2).unwrap();
        assert_eq!(bytes, vec![2, 0, 0, 0]);
    }

    #[test]
    fn rejects_versions_outside_supported_range() {
        let mut bytes = Vec::new();
        write_version(&mut bytes, 7).unwrap();
        let err = read_version(&mut Cursor::new(bytes), 1..=2).unwrap_err();
        assert!(matches!(
            err,
            PersistError::IncompatibleVersion {
                found: 7,
                oldest_supported: 1,
                newest_supported: 2,
            }
        ));
    }

    #[test]
    fn strings_survive_encoding() {
        let mut bytes = Vec::new();
        write_str(&mut bytes, "dataStream_dataIn0").unwrap();
        write_str(&mut bytes, "").unwrap();
        let mut reader = Cursor::new(bytes);
        assert_eq!(read_str(&mut reader).unwrap(), "dataStream_dataIn0");
        assert_eq!(read_str(&mut reader).unwrap(), "");
    }

    #[test]
    fn oversized_length_prefix_is_corrupt() {
        let bytes = u32::MAX.to_le_bytes().to_vec();
        let err = read_str(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, PersistError::Corrupt(_)));
    }

    #[test]
    fn truncated_payload_is_io_error() {
        let err = read_str(&mut Cursor::new(vec![5, 0, 0, 0, b'a'])).unwrap_err();
        assert!(matches!(err, PersistError::Io(_)));
    }
}
