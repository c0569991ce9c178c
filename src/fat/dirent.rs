//! The 64-byte directory entry record.
//!
//! ```text
//! | Off | Size | Field |
//! |-----|------|-------|
//! | 0   | 1    | name_length |
//! | 1   | 1    | attribute (bit 4 = directory) |
//! | 2   | 42   | raw_name |
//! | 44  | 4    | first_cluster |
//! | 48  | 4    | file_size |
//! | 52  | 2    | mod_time |
//! | 54  | 2    | mod_date |
//! | 56  | 2    | create_time |
//! | 58  | 2    | create_date |
//! | 60  | 2    | access_time |
//! | 62  | 2    | access_date |
//! ```

pub const ENTRY_LEN: usize = 64;
pub const NAME_MAX: usize = 42;

/// `name_length` values with special meaning.
pub const TOMBSTONE: u8 = 0xE5;
pub const TERMINATOR: u8 = 0xFF;

/// Bit 4 of `attribute`.
pub const ATTR_DIRECTORY: u8 = 0x10;

/// A packed FAT-style time-of-day (2-second resolution): bits 15-11 hours,
/// 10-5 minutes, 4-0 seconds/2. Format doesn't require it to be populated;
/// this driver always writes zero and treats it as opaque on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DosTime(pub u16);

/// A packed FAT-style calendar date: bits 15-9 year-since-1980, 8-5 month,
/// 4-0 day. Opaque to this driver, same as [`DosTime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DosDate(pub u16);

/// How a raw `name_length` byte should be treated during a directory scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// `1..=42`: a live file or directory entry.
    Live,
    /// `0xE5`: deleted, but retained until `prune`.
    Tombstone,
    /// `0xFF`: ends the directory scan.
    Terminator,
    /// Anything else: preserved in place, ignored by lookups.
    Unknown,
}

fn classify(name_length: u8) -> State {
    match name_length {
        TERMINATOR => State::Terminator,
        TOMBSTONE => State::Tombstone,
        1..=0x2A => State::Live,
        _ => State::Unknown,
    }
}

/// One 64-byte directory record, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name_length: u8,
    pub attribute: u8,
    pub raw_name: [u8; NAME_MAX],
    pub first_cluster: u32,
    pub file_size: u32,
    pub mod_time: DosTime,
    pub mod_date: DosDate,
    pub create_time: DosTime,
    pub create_date: DosDate,
    pub access_time: DosTime,
    pub access_date: DosDate,
}

impl DirEntry {
    /// A fresh end-of-directory terminator record.
    pub fn terminator() -> Self {
        Self {
            name_length: TERMINATOR,
            attribute: 0,
            raw_name: [0xFF; NAME_MAX],
            first_cluster: 0,
            file_size: 0,
            mod_time: DosTime::default(),
            mod_date: DosDate::default(),
            create_time: DosTime::default(),
            create_date: DosDate::default(),
            access_time: DosTime::default(),
            access_date: DosDate::default(),
        }
    }

    /// Builds a new live entry for `name`. Timestamps are left zeroed; the
    /// format doesn't require them to be populated. Fails `InvalidName` if
    /// `name` is empty or longer than the 42-byte FATX limit.
    fn new_live(name: &str, attribute: u8, first_cluster: u32, file_size: u32) -> crate::error::Result<Self> {
        if name.is_empty() || name.len() > NAME_MAX {
            return Err(crate::error::Error::InvalidName(name.to_string()));
        }

        let mut raw_name = [0xFFu8; NAME_MAX];
        raw_name[..name.len()].copy_from_slice(name.as_bytes());

        Ok(Self {
            name_length: name.len() as u8,
            attribute,
            raw_name,
            first_cluster,
            file_size,
            mod_time: DosTime::default(),
            mod_date: DosDate::default(),
            create_time: DosTime::default(),
            create_date: DosDate::default(),
            access_time: DosTime::default(),
            access_date: DosDate::default(),
        })
    }

    pub fn new_file(name: &str, first_cluster: u32, file_size: u32) -> crate::error::Result<Self> {
        Self::new_live(name, 0, first_cluster, file_size)
    }

    pub fn new_directory(name: &str, first_cluster: u32) -> crate::error::Result<Self> {
        Self::new_live(name, ATTR_DIRECTORY, first_cluster, 0)
    }

    pub fn state(&self) -> State {
        classify(self.name_length)
    }

    pub fn is_directory(&self) -> bool {
        self.attribute & ATTR_DIRECTORY != 0
    }

    /// A valid live entry has `1 <= name_length <= 42`.
    pub fn is_valid_file(&self) -> bool {
        matches!(self.state(), State::Live)
    }

    /// The entry's name, for live entries only.
    pub fn name(&self) -> Option<&str> {
        if self.state() != State::Live {
            return None;
        }
        std::str::from_utf8(&self.raw_name[..self.name_length as usize]).ok()
    }

    pub fn tombstone(&mut self) {
        self.name_length = TOMBSTONE;
    }

    pub fn decode(bytes: &[u8; ENTRY_LEN]) -> Self {
        macro_rules! le {
            ($ty:ty, $offset:literal) => {
                <$ty>::from_le_bytes(bytes[$offset..$offset + core::mem::size_of::<$ty>()].try_into().unwrap())
            };
        }

        Self {
            name_length: bytes[0],
            attribute: bytes[1],
            raw_name: bytes[2..44].try_into().unwrap(),
            first_cluster: le!(u32, 44),
            file_size: le!(u32, 48),
            mod_time: DosTime(le!(u16, 52)),
            mod_date: DosDate(le!(u16, 54)),
            create_time: DosTime(le!(u16, 56)),
            create_date: DosDate(le!(u16, 58)),
            access_time: DosTime(le!(u16, 60)),
            access_date: DosDate(le!(u16, 62)),
        }
    }

    pub fn encode(&self) -> [u8; ENTRY_LEN] {
        let mut buf = [0u8; ENTRY_LEN];
        buf[0] = self.name_length;
        buf[1] = self.attribute;
        buf[2..44].copy_from_slice(&self.raw_name);
        buf[44..48].copy_from_slice(&self.first_cluster.to_le_bytes());
        buf[48..52].copy_from_slice(&self.file_size.to_le_bytes());
        buf[52..54].copy_from_slice(&self.mod_time.0.to_le_bytes());
        buf[54..56].copy_from_slice(&self.mod_date.0.to_le_bytes());
        buf[56..58].copy_from_slice(&self.create_time.0.to_le_bytes());
        buf[58..60].copy_from_slice(&self.create_date.0.to_le_bytes());
        buf[60..62].copy_from_slice(&self.access_time.0.to_le_bytes());
        buf[62..64].copy_from_slice(&self.access_date.0.to_le_bytes());
        buf
    }
}

/// Decodes a whole cluster chain's worth of directory bytes into entries,
/// stopping at (and excluding) the first terminator.
pub fn decode_all(bytes: &[u8]) -> Vec<DirEntry> {
    let mut out = Vec::new();
    for chunk in bytes.chunks_exact(ENTRY_LEN) {
        let arr: [u8; ENTRY_LEN] = chunk.try_into().unwrap();
        let entry = DirEntry::decode(&arr);
        if entry.state() == State::Terminator {
            break;
        }
        out.push(entry);
    }
    out
}

/// Serializes `entries` followed by one fresh terminator record.
pub fn encode_all(entries: &[DirEntry]) -> Vec<u8> {
    let mut out = Vec::with_capacity((entries.len() + 1) * ENTRY_LEN);
    for entry in entries {
        out.extend_from_slice(&entry.encode());
    }
    out.extend_from_slice(&DirEntry::terminator().encode());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // Invariant 1 format round-trip.
    #[test]
    fn round_trip() {
        let e = DirEntry::new_file("bar.bin", 2, 40000).unwrap();
        let decoded = DirEntry::decode(&e.encode());
        assert_eq!(decoded, e);
    }

    // Invariant 6 terminator preservation.
    #[test]
    fn terminator_preserved_after_encode() {
        let entries = vec![DirEntry::new_file("a", 2, 0).unwrap(), DirEntry::new_directory("b", 3).unwrap()];
        let bytes = encode_all(&entries);

        let terminator_offset = ENTRY_LEN * entries.len();
        assert_eq!(bytes[terminator_offset], TERMINATOR);
    }

    #[test]
    fn decode_all_stops_at_terminator() {
        let entries = vec![DirEntry::new_file("a", 2, 0).unwrap()];
        let bytes = encode_all(&entries);

        // Append garbage after the terminator; decode_all must not see it.
        let mut bytes = bytes;
        bytes.extend_from_slice(&DirEntry::new_file("ghost", 9, 9).unwrap().encode());

        let decoded = decode_all(&bytes);
        assert_eq!(decoded.len(), 1); // just "a"; the terminator itself is excluded
        assert_eq!(decoded[0].name(), Some("a"));
    }

    #[test]
    fn classify_states() {
        assert_eq!(classify(0x01), State::Live);
        assert_eq!(classify(0x2A), State::Live);
        assert_eq!(classify(TOMBSTONE), State::Tombstone);
        assert_eq!(classify(TERMINATOR), State::Terminator);
        assert_eq!(classify(0x00), State::Unknown);
        assert_eq!(classify(0x30), State::Unknown);
    }

    #[test]
    fn directory_attribute_bit() {
        let d = DirEntry::new_directory("foo", 2).unwrap();
        assert!(d.is_directory());
        let f = DirEntry::new_file("foo.bin", 2, 0).unwrap();
        assert!(!f.is_directory());
    }

    #[test]
    fn new_live_rejects_empty_or_oversized_names() {
        assert!(matches!(DirEntry::new_file("", 2, 0), Err(crate::error::Error::InvalidName(_))));
        let too_long = "x".repeat(NAME_MAX + 1);
        assert!(matches!(DirEntry::new_file(&too_long, 2, 0), Err(crate::error::Error::InvalidName(_))));
    }
}
