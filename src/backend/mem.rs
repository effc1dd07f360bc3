//! In-memory filesystem backend.
//!
//! A tree of file and directory nodes rooted at an empty-named directory.
//! Every operation takes the backend's single mutex, so the tree is safe to
//! share between threads. Node handles carry a generation so a file handle
//! left open across a remove observes [`FsError::InvalidFile`] instead of
//! aliasing a recycled slot.

use std::sync::{Arc, Mutex};

use crate::backend::{dir_iter_from_vec, Backend, DirEntry, DirIter, FileHandle, FileInfo, FileTime};
use crate::error::{FsError, FsResult};
use crate::mode::OpenMode;
use crate::path;
use crate::stream::SeekOrigin;

/// Backend over an in-memory node tree.
pub struct MemBackend {
    tree: Arc<Mutex<Tree>>,
}

impl MemBackend {
    pub fn new() -> Self {
        Self { tree: Arc::new(Mutex::new(Tree::new())) }
    }
}

impl Default for MemBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct NodeId {
    index: usize,
    generation: u32,
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

struct Node {
    name: String,
    parent: Option<NodeId>,
    kind: NodeKind,
    access_time: FileTime,
    modified_time: FileTime,
}

enum NodeKind {
    File { data: Vec<u8> },
    Directory { children: Vec<NodeId> },
}

impl Node {
    fn new(name: String, parent: Option<NodeId>, kind: NodeKind) -> Self {
        let now = FileTime::now();
        Self { name, parent, kind, access_time: now, modified_time: now }
    }

    fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }

    fn info(&self) -> FileInfo {
        FileInfo {
            size: match &self.kind {
                NodeKind::File { data } => data.len() as u64,
                NodeKind::Directory { .. } => 0,
            },
            directory: self.is_directory(),
            symlink: false,
            access_time: self.access_time,
            modified_time: self.modified_time,
        }
    }
}

/// Outcome of walking a path through the tree.
struct Resolved {
    /// The final node, when it exists.
    node: Option<NodeId>,
    /// The directory that contains (or would contain) the final segment.
    parent: Option<NodeId>,
    /// The final path segment. Empty for the root.
    last_segment: String,
}

struct Tree {
    slots: Vec<Slot>,
    free: Vec<usize>,
}

const ROOT: NodeId = NodeId { index: 0, generation: 0 };

impl Tree {
    fn new() -> Self {
        let root = Node::new(String::new(), None, NodeKind::Directory { children: Vec::new() });
        Self { slots: vec![Slot { generation: 0, node: Some(root) }], free: Vec::new() }
    }

    fn get(&self, id: NodeId) -> FsResult<&Node> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
            .ok_or(FsError::InvalidFile)
    }

    fn get_mut(&mut self, id: NodeId) -> FsResult<&mut Node> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(FsError::InvalidFile)
    }

    fn insert(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.generation += 1;
                slot.node = Some(node);
                NodeId { index, generation: slot.generation }
            }
            None => {
                self.slots.push(Slot { generation: 0, node: Some(node) });
                NodeId { index: self.slots.len() - 1, generation: 0 }
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        if let Some(slot) = self.slots.get_mut(id.index) {
            if slot.generation == id.generation {
                slot.node = None;
                self.free.push(id.index);
            }
        }
    }

    fn find_child(&self, directory: NodeId, name: &str) -> FsResult<Option<NodeId>> {
        let node = self.get(directory)?;
        let children = match &node.kind {
            NodeKind::Directory { children } => children,
            NodeKind::File { .. } => return Err(FsError::NotDirectory),
        };

        for &child in children {
            if self.get(child)?.name == name {
                return Ok(Some(child));
            }
        }

        Ok(None)
    }

    fn attach(&mut self, directory: NodeId, child: NodeId) -> FsResult<()> {
        self.get_mut(child)?.parent = Some(directory);
        match &mut self.get_mut(directory)?.kind {
            NodeKind::Directory { children } => {
                children.push(child);
                Ok(())
            }
            NodeKind::File { .. } => Err(FsError::NotDirectory),
        }
    }

    fn detach(&mut self, directory: NodeId, child: NodeId) -> FsResult<()> {
        match &mut self.get_mut(directory)?.kind {
            NodeKind::Directory { children } => {
                children.retain(|&c| c != child);
                Ok(())
            }
            NodeKind::File { .. } => Err(FsError::NotDirectory),
        }
    }

    /// Walks `path` from the root. The path is normalised first; navigation
    /// above the root is refused with [`FsError::InvalidArgs`].
    fn resolve(&self, raw_path: &str) -> FsResult<Resolved> {
        let normalized = path::normalize(raw_path, false).ok_or(FsError::InvalidArgs)?;

        let mut current = ROOT;
        let mut iter = path::segments(&normalized).peekable();

        if iter.peek().is_none() {
            return Ok(Resolved { node: Some(ROOT), parent: None, last_segment: String::new() });
        }

        while let Some(segment) = iter.next() {
            let child = self.find_child(current, segment.text)?;

            if iter.peek().is_none() {
                return Ok(Resolved {
                    node: child,
                    parent: Some(current),
                    last_segment: segment.text.to_owned(),
                });
            }

            match child {
                None => return Err(FsError::DoesNotExist),
                Some(next) => {
                    if !self.get(next)?.is_directory() {
                        return Err(FsError::NotDirectory);
                    }
                    current = next;
                }
            }
        }

        Err(FsError::DoesNotExist)
    }
}

impl Backend for MemBackend {
    fn open(&self, file_path: &str, mode: OpenMode) -> FsResult<Box<dyn FileHandle>> {
        let mut tree = self.tree.lock().unwrap();
        let resolved = tree.resolve(file_path)?;

        if let Some(id) = resolved.node {
            let node = tree.get_mut(id)?;
            if node.is_directory() {
                return Err(FsError::IsDirectory);
            }
            if mode.contains(OpenMode::EXCLUSIVE) && mode.is_write() {
                return Err(FsError::AlreadyExists);
            }

            let mut cursor = 0;
            if mode.is_append() {
                if let NodeKind::File { data } = &node.kind {
                    cursor = data.len() as u64;
                }
            }

            if mode.is_write() && mode.contains(OpenMode::TRUNCATE) {
                if let NodeKind::File { data } = &mut node.kind {
                    data.clear();
                }
                node.modified_time = FileTime::now();
                cursor = 0;
            }

            return Ok(Box::new(MemFile {
                tree: Arc::clone(&self.tree),
                node: id,
                cursor,
                mode,
            }));
        }

        // The file does not exist. Only write mode may create it.
        if !mode.is_write() {
            return Err(FsError::DoesNotExist);
        }

        let parent = resolved.parent.ok_or(FsError::InvalidOperation)?;
        if !tree.get(parent)?.is_directory() {
            return Err(FsError::DoesNotExist);
        }

        let node = Node::new(resolved.last_segment, Some(parent), NodeKind::File { data: Vec::new() });
        let id = tree.insert(node);
        tree.attach(parent, id)?;

        Ok(Box::new(MemFile { tree: Arc::clone(&self.tree), node: id, cursor: 0, mode }))
    }

    fn info(&self, file_path: &str) -> FsResult<FileInfo> {
        let tree = self.tree.lock().unwrap();
        let resolved = tree.resolve(file_path)?;
        let id = resolved.node.ok_or(FsError::DoesNotExist)?;
        Ok(tree.get(id)?.info())
    }

    fn remove(&self, file_path: &str) -> FsResult<()> {
        let mut tree = self.tree.lock().unwrap();
        let resolved = tree.resolve(file_path)?;
        let id = resolved.node.ok_or(FsError::DoesNotExist)?;

        if id == ROOT {
            return Err(FsError::InvalidOperation);
        }

        if let NodeKind::Directory { children } = &tree.get(id)?.kind {
            if !children.is_empty() {
                return Err(FsError::DirectoryNotEmpty);
            }
        }

        let parent = tree.get(id)?.parent.ok_or(FsError::InvalidOperation)?;
        tree.detach(parent, id)?;
        tree.release(id);

        Ok(())
    }

    fn rename(&self, old_path: &str, new_path: &str) -> FsResult<()> {
        let mut tree = self.tree.lock().unwrap();

        let source = tree.resolve(old_path)?;
        let id = source.node.ok_or(FsError::DoesNotExist)?;
        if id == ROOT {
            return Err(FsError::InvalidOperation);
        }

        let destination = tree.resolve(new_path)?;

        if destination.node.is_some() {
            return Err(FsError::AlreadyExists);
        }

        let new_parent = destination.parent.ok_or(FsError::DoesNotExist)?;
        if !tree.get(new_parent)?.is_directory() {
            return Err(FsError::NotDirectory);
        }

        let old_parent = tree.get(id)?.parent.ok_or(FsError::InvalidOperation)?;
        tree.detach(old_parent, id)?;

        {
            let node = tree.get_mut(id)?;
            node.name = destination.last_segment.clone();
            node.modified_time = FileTime::now();
        }

        tree.attach(new_parent, id)?;

        Ok(())
    }

    fn make_dir(&self, dir_path: &str) -> FsResult<()> {
        let mut tree = self.tree.lock().unwrap();
        let resolved = tree.resolve(dir_path)?;

        if resolved.node.is_some() {
            return Err(FsError::AlreadyExists);
        }

        let parent = resolved.parent.ok_or(FsError::InvalidOperation)?;
        if !tree.get(parent)?.is_directory() {
            return Err(FsError::NotDirectory);
        }

        let node = Node::new(
            resolved.last_segment,
            Some(parent),
            NodeKind::Directory { children: Vec::new() },
        );
        let id = tree.insert(node);
        tree.attach(parent, id)?;

        Ok(())
    }

    fn read_dir(&self, dir_path: &str) -> FsResult<DirIter> {
        let tree = self.tree.lock().unwrap();
        let resolved = tree.resolve(dir_path)?;
        let id = resolved.node.ok_or(FsError::DoesNotExist)?;

        let children = match &tree.get(id)?.kind {
            NodeKind::Directory { children } => children.clone(),
            NodeKind::File { .. } => return Err(FsError::NotDirectory),
        };

        let mut entries = Vec::with_capacity(children.len());
        for child in children {
            let node = tree.get(child)?;
            entries.push(DirEntry { name: node.name.clone(), info: node.info() });
        }

        Ok(dir_iter_from_vec(entries))
    }
}

struct MemFile {
    tree: Arc<Mutex<Tree>>,
    node: NodeId,
    cursor: u64,
    mode: OpenMode,
}

impl std::fmt::Debug for MemFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemFile")
            .field("node", &self.node)
            .field("cursor", &self.cursor)
            .field("mode", &self.mode)
            .finish()
    }
}

impl FileHandle for MemFile {
    fn read(&mut self, dst: &mut [u8]) -> FsResult<usize> {
        let tree = self.tree.lock().unwrap();
        let node = tree.get(self.node)?;
        let data = match &node.kind {
            NodeKind::File { data } => data,
            NodeKind::Directory { .. } => return Err(FsError::IsDirectory),
        };

        if dst.is_empty() {
            return Ok(0);
        }

        if self.cursor >= data.len() as u64 {
            return Err(FsError::AtEnd);
        }

        let start = self.cursor as usize;
        let count = dst.len().min(data.len() - start);
        dst[..count].copy_from_slice(&data[start..start + count]);
        self.cursor += count as u64;

        Ok(count)
    }

    fn write(&mut self, src: &[u8]) -> FsResult<usize> {
        if !self.mode.is_write() {
            return Err(FsError::AccessDenied);
        }

        if src.is_empty() {
            return Ok(0);
        }

        let mut tree = self.tree.lock().unwrap();
        let node = tree.get_mut(self.node)?;
        let data = match &mut node.kind {
            NodeKind::File { data } => data,
            NodeKind::Directory { .. } => return Err(FsError::IsDirectory),
        };

        let cursor = self.cursor as usize;
        let new_size = data.len().max(cursor + src.len());

        if new_size > data.capacity() {
            let new_capacity = new_size.max(data.capacity() * 2);
            data.reserve_exact(new_capacity - data.len());
        }

        // Zero-fill any gap a past-the-end seek left behind.
        if cursor > data.len() {
            data.resize(cursor, 0);
        }

        if cursor + src.len() > data.len() {
            data.resize(cursor + src.len(), 0);
        }
        data[cursor..cursor + src.len()].copy_from_slice(src);

        node.modified_time = FileTime::now();
        self.cursor += src.len() as u64;

        Ok(src.len())
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> FsResult<()> {
        let size = {
            let tree = self.tree.lock().unwrap();
            match &tree.get(self.node)?.kind {
                NodeKind::File { data } => data.len() as i64,
                NodeKind::Directory { .. } => return Err(FsError::IsDirectory),
            }
        };

        let base = match origin {
            SeekOrigin::Start => 0,
            SeekOrigin::Current => self.cursor as i64,
            SeekOrigin::End => size,
        };

        let target = base.checked_add(offset).ok_or(FsError::BadSeek)?;
        if target < 0 {
            return Err(FsError::BadSeek);
        }

        self.cursor = target as u64;
        Ok(())
    }

    fn tell(&mut self) -> FsResult<u64> {
        Ok(self.cursor)
    }

    fn flush(&mut self) -> FsResult<()> {
        Ok(())
    }

    fn truncate(&mut self) -> FsResult<()> {
        if !self.mode.is_write() {
            return Err(FsError::AccessDenied);
        }

        let mut tree = self.tree.lock().unwrap();
        let node = tree.get_mut(self.node)?;
        match &mut node.kind {
            NodeKind::File { data } => {
                let cursor = (self.cursor as usize).min(data.len());
                data.truncate(cursor);

                // A cursor past the old end still truncates to the cursor by
                // materialising the gap.
                if self.cursor as usize > cursor {
                    data.resize(self.cursor as usize, 0);
                }

                node.modified_time = FileTime::now();
                Ok(())
            }
            NodeKind::Directory { .. } => Err(FsError::IsDirectory),
        }
    }

    fn info(&self) -> FsResult<FileInfo> {
        let tree = self.tree.lock().unwrap();
        Ok(tree.get(self.node)?.info())
    }

    fn duplicate(&self) -> FsResult<Box<dyn FileHandle>> {
        Ok(Box::new(MemFile {
            tree: Arc::clone(&self.tree),
            node: self.node,
            cursor: self.cursor,
            mode: self.mode,
        }))
    }
}
