//! Builds small ZIP archives in memory for tests.
//!
//! Only what the reader consumes is produced: local headers, a central
//! directory, the EOCD, and optionally a Zip64 EOCD pair and an archive
//! comment. CRC fields are left zero since the reader does not verify them.

#![allow(dead_code)]

use byteorder::{LittleEndian, WriteBytesExt};
use miniz_oxide::deflate::compress_to_vec;

pub const METHOD_STORE: u16 = 0;
pub const METHOD_DEFLATE: u16 = 8;

pub struct ZipSpec<'a> {
    pub name: &'a str,
    pub data: &'a [u8],
    pub method: u16,
}

impl<'a> ZipSpec<'a> {
    pub fn stored(name: &'a str, data: &'a [u8]) -> Self {
        Self { name, data, method: METHOD_STORE }
    }

    pub fn deflated(name: &'a str, data: &'a [u8]) -> Self {
        Self { name, data, method: METHOD_DEFLATE }
    }

    /// An explicit directory entry; the name must end with `/`.
    pub fn directory(name: &'a str) -> Self {
        Self { name, data: &[], method: METHOD_STORE }
    }
}

pub fn build(entries: &[ZipSpec<'_>]) -> Vec<u8> {
    build_with(entries, b"", false)
}

pub fn build_with_comment(entries: &[ZipSpec<'_>], comment: &[u8]) -> Vec<u8> {
    build_with(entries, comment, false)
}

pub fn build_zip64(entries: &[ZipSpec<'_>]) -> Vec<u8> {
    build_with(entries, b"", true)
}

fn build_with(entries: &[ZipSpec<'_>], comment: &[u8], zip64: bool) -> Vec<u8> {
    let mut out = Vec::new();
    let mut records = Vec::new();

    for entry in entries {
        let payload = match entry.method {
            METHOD_DEFLATE => compress_to_vec(entry.data, 6),
            _ => entry.data.to_vec(),
        };

        let local_offset = out.len() as u32;

        out.write_u32::<LittleEndian>(0x04034b50).unwrap();
        out.write_u16::<LittleEndian>(20).unwrap(); // version needed
        out.write_u16::<LittleEndian>(0).unwrap(); // flags
        out.write_u16::<LittleEndian>(entry.method).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap(); // mod time
        out.write_u16::<LittleEndian>(0).unwrap(); // mod date
        out.write_u32::<LittleEndian>(0).unwrap(); // crc32, unchecked
        out.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
        out.write_u32::<LittleEndian>(entry.data.len() as u32).unwrap();
        out.write_u16::<LittleEndian>(entry.name.len() as u16).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap(); // extra len
        out.extend_from_slice(entry.name.as_bytes());
        out.extend_from_slice(&payload);

        records.push((entry, payload.len() as u32, local_offset));
    }

    let cd_offset = out.len();

    for (entry, compressed_len, local_offset) in &records {
        out.write_u32::<LittleEndian>(0x02014b50).unwrap();
        out.write_u16::<LittleEndian>(20).unwrap(); // version made by
        out.write_u16::<LittleEndian>(20).unwrap(); // version needed
        out.write_u16::<LittleEndian>(0).unwrap(); // flags
        out.write_u16::<LittleEndian>(entry.method).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap(); // mod time
        out.write_u16::<LittleEndian>(0).unwrap(); // mod date
        out.write_u32::<LittleEndian>(0).unwrap(); // crc32
        out.write_u32::<LittleEndian>(*compressed_len).unwrap();
        out.write_u32::<LittleEndian>(entry.data.len() as u32).unwrap();
        out.write_u16::<LittleEndian>(entry.name.len() as u16).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap(); // extra len
        out.write_u16::<LittleEndian>(0).unwrap(); // comment len
        out.write_u16::<LittleEndian>(0).unwrap(); // disk number
        out.write_u16::<LittleEndian>(0).unwrap(); // internal attrs
        out.write_u32::<LittleEndian>(0).unwrap(); // external attrs
        out.write_u32::<LittleEndian>(*local_offset).unwrap();
        out.extend_from_slice(entry.name.as_bytes());
    }

    let cd_size = out.len() - cd_offset;

    if zip64 {
        let eocd64_offset = out.len();

        out.write_u32::<LittleEndian>(0x06064b50).unwrap();
        out.write_u64::<LittleEndian>(44).unwrap(); // record size minus 12
        out.write_u16::<LittleEndian>(45).unwrap(); // version made by
        out.write_u16::<LittleEndian>(45).unwrap(); // version needed
        out.write_u32::<LittleEndian>(0).unwrap(); // this disk
        out.write_u32::<LittleEndian>(0).unwrap(); // cd disk
        out.write_u64::<LittleEndian>(entries.len() as u64).unwrap();
        out.write_u64::<LittleEndian>(entries.len() as u64).unwrap();
        out.write_u64::<LittleEndian>(cd_size as u64).unwrap();
        out.write_u64::<LittleEndian>(cd_offset as u64).unwrap();

        out.write_u32::<LittleEndian>(0x07064b50).unwrap();
        out.write_u32::<LittleEndian>(0).unwrap(); // eocd64 disk
        out.write_u64::<LittleEndian>(eocd64_offset as u64).unwrap();
        out.write_u32::<LittleEndian>(1).unwrap(); // total disks
    }

    out.write_u32::<LittleEndian>(0x06054b50).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap(); // this disk
    out.write_u16::<LittleEndian>(0).unwrap(); // cd disk

    if zip64 {
        out.write_u16::<LittleEndian>(0xFFFF).unwrap();
        out.write_u16::<LittleEndian>(0xFFFF).unwrap();
        out.write_u32::<LittleEndian>(0xFFFFFFFF).unwrap();
        out.write_u32::<LittleEndian>(0xFFFFFFFF).unwrap();
    } else {
        out.write_u16::<LittleEndian>(entries.len() as u16).unwrap();
        out.write_u16::<LittleEndian>(entries.len() as u16).unwrap();
        out.write_u32::<LittleEndian>(cd_size as u32).unwrap();
        out.write_u32::<LittleEndian>(cd_offset as u32).unwrap();
    }

    out.write_u16::<LittleEndian>(comment.len() as u16).unwrap();
    out.extend_from_slice(comment);

    out
}
