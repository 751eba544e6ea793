#![forbid(unsafe_code)]

//! Offline asset packer.
//!
//! Resource files (images, text and shaders, meshes, audio, skinned meshes
//! with skeletons and animations) are encoded into fixed-layout payloads and
//! packed into a single archive: a file header, a record table sorted by
//! name hash, a NUL-terminated name table and a data blob. A native runtime
//! can read the file into memory and binary-search the table without parsing.

pub mod pak;
