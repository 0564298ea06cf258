pub mod assembler;
pub mod quantization;
pub mod range_extent;
pub mod ray_metadata;
pub mod sweep_index;
pub mod timing;

pub use assembler::VolumeAssembler;
pub use quantization::QuantizationDecoder;
pub use range_extent::RangeExtentReconciler;
pub use ray_metadata::{RayMetadata, RayMetadataExtractor};
pub use sweep_index::{SweepIndex, SweepSpan};
pub use timing::{RayTimes, TimingAccumulator, TimingReconstructor};
