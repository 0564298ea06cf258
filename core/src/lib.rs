//! Normalization core for polar-scan radar volumes.
//!
//! Sweeps arrive one record at a time, each with its own ray count, range
//! extent and quantization. The assembler decodes, pads and concatenates them
//! into one ray-major volume with per-ray times and sweep boundaries.

pub mod interface;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod telemetry;

pub use interface::{ProtoVolume, ScanDocument, ScanRecord};
pub use prelude::{AssemblerConfig, ScanSource, VolumeError, VolumeResult};
pub use processing::VolumeAssembler;
