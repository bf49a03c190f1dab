//! Raw byte stream handling: multiplex header stripping and per-source
//! reassembly of physical lines into logical entries.

pub mod demux;
pub mod reassemble;

pub use demux::FrameStripper;
pub use reassemble::Reassembler;
