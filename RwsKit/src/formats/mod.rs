//! Binary file format codecs
//!
//! - [`rws`] - RenderWare audio stream containers and their chunk framing

pub mod rws;
