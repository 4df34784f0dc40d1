//! graymap-export: Pure format serializers (sans-IO)
//!
//! Converts pipeline output into netpbm files. Supports PBM (`P1`/`P4`)
//! for monochrome bitmaps and PGM (`P2`/`P5`) for 8-bit graymaps.

pub mod graymap;
pub mod pbm;

pub use graymap::to_graymap;
pub use pbm::{PbmEncoding, PbmMetadata, to_pbm};
