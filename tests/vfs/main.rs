mod archives;
mod common;
mod iterate;
mod memfs;
mod mounts;
mod zipgen;
