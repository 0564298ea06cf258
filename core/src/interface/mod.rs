pub mod document;
pub mod record;
pub mod volume;

pub use document::ScanDocument;
pub use record::{
    Calibration, MomentData, MomentFormat, RayHeader, ScanRecord, ScanType, SiteAttributes,
};
pub use volume::{DecodedField, ProtoVolume, RangeGates, SweepMode};
