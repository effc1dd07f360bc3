//! ZIP central-directory parsing and the accelerated lookup tree.
//!
//! The central directory is read into a single buffer. A sorted index of
//! record offsets accelerates path comparisons, and a node tree built from
//! the sorted index gives segment-wise descent with binary-searched
//! siblings. Entry names are treated as raw bytes; they are only converted
//! to UTF-8 (lossily) when surfaced through directory iteration.

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::debug;

use crate::error::{FsError, FsResult};
use crate::path;
use crate::stream::{read_exact, SeekOrigin, Stream};

const EOCD_SIGNATURE: u32 = 0x06054b50;
const EOCD64_SIGNATURE: u32 = 0x06064b50;
const EOCD64_LOCATOR_SIGNATURE: u32 = 0x07064b50;

/// Size of the end-of-central-directory record without its comment.
const EOCD_SIZE: usize = 22;
/// A ZIP comment is at most 65535 bytes, bounding the backward EOCD scan.
const MAX_COMMENT: u64 = 65535;
/// Offset of the file name within a central-directory record.
const CD_RECORD_NAME_OFFSET: usize = 46;

/// Decoded central-directory record.
#[derive(Debug, Copy, Clone)]
pub(crate) struct EntryInfo {
    pub compression_method: u16,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub local_header_offset: u64,
    pub directory: bool,
}

/// One node of the accelerated central-directory tree.
///
/// Children occupy one contiguous block of the node pool and are stored in
/// the order the sorted file index produced them.
#[derive(Debug, Copy, Clone)]
pub(crate) struct CdNode {
    /// For leaves, the position in the sorted index of the entry this node
    /// names. For internal nodes this is the first descendant and carries no
    /// other meaning.
    pub file_index: usize,
    name_offset: usize,
    name_len: usize,
    pub children_start: usize,
    pub children_len: usize,
}

/// Parsed central directory plus its lookup structures.
pub(crate) struct ZipDirectory {
    cd: Vec<u8>,
    index: Vec<usize>,
    nodes: Vec<CdNode>,
}

impl ZipDirectory {
    /// Locates, reads and indexes the central directory of `stream`.
    pub fn load(stream: &mut dyn Stream) -> FsResult<Self> {
        let (file_count, cd_size, cd_offset) = locate_central_directory(stream)?;

        if cd_size > usize::MAX as u64 {
            return Err(FsError::TooBig);
        }

        stream.seek(cd_offset as i64, SeekOrigin::Start).map_err(|_| FsError::InvalidFile)?;
        let mut cd = vec![0u8; cd_size as usize];
        read_exact(stream, &mut cd)?;

        let index = build_index(&cd, file_count)?;
        let nodes = build_tree(&cd, &index)?;

        debug!(files = file_count, cd_bytes = cd.len(), "loaded zip central directory");

        Ok(Self { cd, index, nodes })
    }

    pub fn file_count(&self) -> usize {
        self.index.len()
    }

    /// Decodes the record at position `file_index` of the sorted index.
    pub fn entry_at(&self, file_index: usize) -> FsResult<EntryInfo> {
        let record_offset = *self.index.get(file_index).ok_or(FsError::InvalidFile)?;
        decode_record(&self.cd, record_offset)
    }

    pub fn node(&self, node_index: usize) -> &CdNode {
        &self.nodes[node_index]
    }

    pub fn node_name(&self, node: &CdNode) -> &[u8] {
        &self.cd[node.name_offset..node.name_offset + node.name_len]
    }

    /// Metadata as exposed by stat and iteration. Internal nodes are always
    /// directories; leaves take the directory flag from their record.
    pub fn node_info(&self, node_index: usize) -> FsResult<(u64, bool)> {
        let node = &self.nodes[node_index];
        if node.children_len > 0 || node_index == 0 {
            return Ok((0, true));
        }

        let entry = self.entry_at(node.file_index)?;
        if entry.directory {
            Ok((0, true))
        } else {
            Ok((entry.uncompressed_size, false))
        }
    }

    /// Finds the tree node for `file_path` by segment-wise descent.
    ///
    /// The path is normalised first; above-root navigation and unknown
    /// segments both surface as [`FsError::DoesNotExist`].
    pub fn find_node(&self, file_path: &str) -> FsResult<usize> {
        let trimmed = file_path.trim_start_matches(['/', '\\']);
        let clean = path::normalize(trimmed, false).ok_or(FsError::DoesNotExist)?;

        let mut current = 0usize;
        for segment in path::segments(&clean) {
            current = self
                .find_child(current, segment.text.as_bytes())
                .ok_or(FsError::DoesNotExist)?;
        }

        Ok(current)
    }

    /// Binary search among the children of `parent` for `name`.
    fn find_child(&self, parent: usize, name: &[u8]) -> Option<usize> {
        let node = &self.nodes[parent];
        let children = &self.nodes[node.children_start..node.children_start + node.children_len];

        children
            .binary_search_by(|child| self.node_name(child).cmp(name))
            .ok()
            .map(|position| node.children_start + position)
    }
}

/// Bounds-checked little-endian reads over the central directory buffer.
fn u16_at(buf: &[u8], offset: usize) -> FsResult<u16> {
    let mut bytes = buf.get(offset..offset + 2).ok_or(FsError::InvalidFile)?;
    bytes.read_u16::<LittleEndian>().map_err(|_| FsError::InvalidFile)
}

fn u32_at(buf: &[u8], offset: usize) -> FsResult<u32> {
    let mut bytes = buf.get(offset..offset + 4).ok_or(FsError::InvalidFile)?;
    bytes.read_u32::<LittleEndian>().map_err(|_| FsError::InvalidFile)
}

fn u64_at(buf: &[u8], offset: usize) -> FsResult<u64> {
    let mut bytes = buf.get(offset..offset + 8).ok_or(FsError::InvalidFile)?;
    bytes.read_u64::<LittleEndian>().map_err(|_| FsError::InvalidFile)
}

/// Path bytes of one record, or an empty slice when the record is truncated.
fn path_bytes(cd: &[u8], record_offset: usize) -> &[u8] {
    let Ok(name_len) = u16_at(cd, record_offset + 28) else {
        return &[];
    };

    let start = record_offset + CD_RECORD_NAME_OFFSET;
    cd.get(start..start + name_len as usize).unwrap_or(&[])
}

/// Decodes one central-directory record, promoting Zip64 fields from the
/// 0x0001 extra-field chunk where the base record holds a sentinel.
fn decode_record(cd: &[u8], record_offset: usize) -> FsResult<EntryInfo> {
    if record_offset + CD_RECORD_NAME_OFFSET > cd.len() {
        return Err(FsError::InvalidFile);
    }

    let name_len = u16_at(cd, record_offset + 28)? as usize;
    if record_offset + CD_RECORD_NAME_OFFSET + name_len > cd.len() {
        return Err(FsError::InvalidFile);
    }

    let mut info = EntryInfo {
        compression_method: u16_at(cd, record_offset + 10)?,
        compressed_size: u32_at(cd, record_offset + 20)? as u64,
        uncompressed_size: u32_at(cd, record_offset + 24)? as u64,
        local_header_offset: u32_at(cd, record_offset + 42)? as u64,
        directory: false,
    };

    let name_start = record_offset + CD_RECORD_NAME_OFFSET;
    let name = &cd[name_start..name_start + name_len];
    if matches!(name.last(), Some(b'/') | Some(b'\\')) {
        info.directory = true;
    }

    let needs_zip64 = info.compressed_size == 0xFFFFFFFF
        || info.uncompressed_size == 0xFFFFFFFF
        || info.local_header_offset == 0xFFFFFFFF;

    if needs_zip64 {
        let extra_len = u16_at(cd, record_offset + 30)? as usize;
        let extra_start = record_offset + CD_RECORD_NAME_OFFSET + name_len;
        let extra =
            cd.get(extra_start..extra_start + extra_len).ok_or(FsError::InvalidFile)?;

        let mut cursor = 0usize;
        while cursor != extra.len() {
            if extra.len() - cursor < 4 {
                return Err(FsError::InvalidFile);
            }

            let chunk_id = u16_at(extra, cursor)?;
            let chunk_size = u16_at(extra, cursor + 2)? as usize;
            cursor += 4;

            if extra.len() - cursor < chunk_size {
                return Err(FsError::InvalidFile);
            }

            if chunk_id == 0x0001 {
                let mut local = 0usize;

                if info.uncompressed_size == 0xFFFFFFFF {
                    if local + 8 > chunk_size {
                        return Err(FsError::InvalidFile);
                    }
                    info.uncompressed_size = u64_at(extra, cursor + local)?;
                    local += 8;
                }

                if info.compressed_size == 0xFFFFFFFF {
                    if local + 8 > chunk_size {
                        return Err(FsError::InvalidFile);
                    }
                    info.compressed_size = u64_at(extra, cursor + local)?;
                    local += 8;
                }

                if info.local_header_offset == 0xFFFFFFFF {
                    if local + 8 > chunk_size {
                        return Err(FsError::InvalidFile);
                    }
                    info.local_header_offset = u64_at(extra, cursor + local)?;
                }
            }

            cursor += chunk_size;
        }
    }

    Ok(info)
}

/// Finds the EOCD (optionally promoting through Zip64) and returns
/// `(record count, central directory size, central directory offset)`.
fn locate_central_directory(stream: &mut dyn Stream) -> FsResult<(usize, u64, u64)> {
    stream.seek(0, SeekOrigin::End)?;
    let file_len = stream.tell()?;

    if file_len < EOCD_SIZE as u64 {
        return Err(FsError::InvalidFile);
    }

    // Fast path: no archive comment, the EOCD sits exactly at the tail.
    let mut eocd = [0u8; EOCD_SIZE];
    stream.seek(-(EOCD_SIZE as i64), SeekOrigin::End)?;
    read_exact(stream, &mut eocd)?;

    let eocd_position = if u32_at(&eocd, 0)? == EOCD_SIGNATURE {
        file_len - EOCD_SIZE as u64
    } else {
        // There may be a comment pushing the EOCD backwards. Sweep forward
        // from the earliest possible position in 4 KiB chunks, keeping a
        // 3-byte overlap so a signature spanning two chunks is not missed.
        let scan_start = file_len.saturating_sub(EOCD_SIZE as u64 + MAX_COMMENT);
        stream.seek(scan_start as i64, SeekOrigin::Start)?;

        let position = scan_for_eocd(stream, scan_start)?;
        stream.seek(position as i64, SeekOrigin::Start)?;
        read_exact(stream, &mut eocd).map_err(|_| FsError::InvalidFile)?;

        if u32_at(&eocd, 0)? != EOCD_SIGNATURE {
            return Err(FsError::InvalidFile);
        }

        position
    };

    let record_count_16 = u16_at(&eocd, 10)?;
    let cd_size_32 = u32_at(&eocd, 12)?;
    let cd_offset_32 = u32_at(&eocd, 16)?;

    if record_count_16 != 0xFFFF && cd_size_32 != 0xFFFFFFFF && cd_offset_32 != 0xFFFFFFFF {
        return Ok((record_count_16 as usize, cd_size_32 as u64, cd_offset_32 as u64));
    }

    // Zip64. The locator sits 20 bytes before the EOCD.
    if eocd_position < 20 {
        return Err(FsError::InvalidFile);
    }

    let mut locator = [0u8; 20];
    stream.seek((eocd_position - 20) as i64, SeekOrigin::Start)?;
    read_exact(stream, &mut locator)?;

    if u32_at(&locator, 0)? != EOCD64_LOCATOR_SIGNATURE {
        return Err(FsError::InvalidFile);
    }

    let eocd64_offset = u64_at(&locator, 8)?;

    let mut eocd64 = [0u8; 56];
    stream
        .seek(eocd64_offset as i64, SeekOrigin::Start)
        .map_err(|_| FsError::InvalidFile)?;
    read_exact(stream, &mut eocd64)?;

    if u32_at(&eocd64, 0)? != EOCD64_SIGNATURE {
        return Err(FsError::InvalidFile);
    }

    // The stored size excludes the signature and the size field itself.
    if u64_at(&eocd64, 4)? < 36 {
        return Err(FsError::InvalidFile);
    }

    let record_count = u64_at(&eocd64, 32)?;
    let cd_size = u64_at(&eocd64, 40)?;
    let cd_offset = u64_at(&eocd64, 48)?;

    if record_count > usize::MAX as u64 || cd_size > usize::MAX as u64 {
        return Err(FsError::TooBig);
    }

    Ok((record_count as usize, cd_size, cd_offset))
}

/// Scans forward from `start` for the first EOCD signature and returns its
/// absolute position.
fn scan_for_eocd(stream: &mut dyn Stream, start: u64) -> FsResult<u64> {
    let mut buffer = [0u8; 4096];
    let mut carried = 0usize;
    let mut scanned = 0u64;

    loop {
        let filled = match stream.read(&mut buffer[carried..]) {
            Ok(count) => carried + count,
            Err(FsError::AtEnd) if carried > 0 => carried,
            Err(FsError::AtEnd) => return Err(FsError::InvalidFile),
            Err(err) => return Err(err),
        };

        if filled < 4 {
            return Err(FsError::InvalidFile);
        }

        for cursor in 0..=(filled - 4) {
            let sig = u32_at(&buffer[cursor..], 0)?;
            if sig == EOCD_SIGNATURE {
                return Ok(start + scanned + cursor as u64);
            }
        }

        if filled == carried {
            // No new bytes arrived, nothing more to scan.
            return Err(FsError::InvalidFile);
        }

        // Keep the last three bytes so a split signature stays visible.
        let keep = 3.min(filled);
        scanned += (filled - keep) as u64;
        buffer.copy_within(filled - keep..filled, 0);
        carried = keep;
    }
}

/// Walks the raw central directory and records the offset of every record.
fn build_index(cd: &[u8], file_count: usize) -> FsResult<Vec<usize>> {
    let mut index = Vec::with_capacity(file_count);
    let mut cursor = 0usize;

    for _ in 0..file_count {
        if cursor + CD_RECORD_NAME_OFFSET > cd.len() {
            return Err(FsError::InvalidFile);
        }

        index.push(cursor);

        let name_len = u16_at(cd, cursor + 28)? as usize;
        let extra_len = u16_at(cd, cursor + 30)? as usize;
        let comment_len = u16_at(cd, cursor + 32)? as usize;

        cursor = cursor
            .checked_add(CD_RECORD_NAME_OFFSET + name_len + extra_len + comment_len)
            .ok_or(FsError::InvalidFile)?;
        if cursor > cd.len() {
            return Err(FsError::InvalidFile);
        }
    }

    // Byte comparison; a shorter path orders before its extensions.
    index.sort_by(|&a, &b| path_bytes(cd, a).cmp(path_bytes(cd, b)));

    Ok(index)
}

/// First segment of `short` as `(offset, length)`, skipping leading
/// separators. `None` when no segment remains.
fn first_segment(short: &[u8]) -> Option<(usize, usize)> {
    let mut offset = 0;
    while offset < short.len() && (short[offset] == b'/' || short[offset] == b'\\') {
        offset += 1;
    }

    if offset == short.len() {
        return None;
    }

    let mut end = offset;
    while end < short.len() && short[end] != b'/' && short[end] != b'\\' {
        end += 1;
    }

    Some((offset, end - offset))
}

/// Recursive build state for one pending node.
struct PendingNode {
    node_index: usize,
    range_begin: usize,
    range_end: usize,
    prefix_len: usize,
}

/// Builds the node tree over the sorted index.
///
/// Children of a node are appended to the pool as one contiguous block in
/// index order, then each child is built recursively from its descendant
/// range.
fn build_tree(cd: &[u8], index: &[usize]) -> FsResult<Vec<CdNode>> {
    let mut nodes = vec![CdNode {
        file_index: 0,
        name_offset: 0,
        name_len: 0,
        children_start: 0,
        children_len: 0,
    }];

    let root = PendingNode {
        node_index: 0,
        range_begin: 0,
        range_end: index.len(),
        prefix_len: 0,
    };

    build_node(cd, index, &mut nodes, root)?;
    Ok(nodes)
}

fn build_node(
    cd: &[u8],
    index: &[usize],
    nodes: &mut Vec<CdNode>,
    pending: PendingNode,
) -> FsResult<()> {
    let children_start = nodes.len();
    let mut children: Vec<PendingNode> = Vec::new();

    for file in pending.range_begin..pending.range_end {
        let full = path_bytes(cd, index[file]);
        if full.len() <= pending.prefix_len {
            // An explicit listing of this directory itself.
            continue;
        }

        let short = &full[pending.prefix_len..];
        let Some((segment_offset, segment_len)) = first_segment(short) else {
            // A bare separator tail, e.g. an explicit directory entry equal
            // to the prefix. It terminates the previous child's range.
            if let Some(last) = children.last_mut() {
                last.range_end = file;
            }
            continue;
        };

        let name_offset =
            index[file] + CD_RECORD_NAME_OFFSET + pending.prefix_len + segment_offset;
        let name = &cd[name_offset..name_offset + segment_len];

        let matches_last = children
            .last()
            .map(|last| {
                let last_node = &nodes[last.node_index];
                &cd[last_node.name_offset..last_node.name_offset + last_node.name_len] == name
            })
            .unwrap_or(false);

        if !matches_last {
            if let Some(last) = children.last_mut() {
                last.range_end = file;
            }

            nodes.push(CdNode {
                file_index: file,
                name_offset,
                name_len: segment_len,
                children_start: 0,
                children_len: 0,
            });

            children.push(PendingNode {
                node_index: nodes.len() - 1,
                range_begin: file,
                range_end: pending.range_end,
                prefix_len: pending.prefix_len + segment_offset + segment_len,
            });
        }
    }

    nodes[pending.node_index].children_start = children_start;
    nodes[pending.node_index].children_len = children.len();

    for child in children {
        build_node(cd, index, nodes, child)?;
    }

    Ok(())
}
