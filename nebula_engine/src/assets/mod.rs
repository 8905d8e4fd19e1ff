//! On-disk asset decoders: glTF scene documents and PNG images, both
//! hand-written rather than delegated to an external parsing crate.

pub mod gltf;
pub mod json;
pub mod png;
