use serde::{Deserialize, Serialize};

use crate::interface::record::{ScanRecord, SiteAttributes};
use crate::prelude::{ScanSource, VolumeError, VolumeResult};

/// Whole-file dump of the reader output, held in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanDocument {
    pub site: SiteAttributes,
    pub sweeps: Vec<ScanRecord>,
}

impl ScanDocument {
    pub fn new(site: SiteAttributes, sweeps: Vec<ScanRecord>) -> Self {
        Self { site, sweeps }
    }

    pub fn from_json(contents: &str) -> VolumeResult<Self> {
        serde_json::from_str(contents).map_err(|err| VolumeError::InvalidInput(err.to_string()))
    }

    pub fn to_json(&self) -> VolumeResult<String> {
        serde_json::to_string(self).map_err(|err| VolumeError::InvalidInput(err.to_string()))
    }
}

impl ScanSource for ScanDocument {
    fn site(&self) -> VolumeResult<SiteAttributes> {
        Ok(self.site.clone())
    }

    fn scans(&self) -> VolumeResult<Vec<ScanRecord>> {
        Ok(self.sweeps.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::record::{MomentFormat, ScanType};

    const DOC: &str = r#"{
        "site": {"latitude": -23.6, "longitude": -46.7, "altitude": 735.0, "scan_type": "PPI"},
        "sweeps": [{
            "index": 0,
            "prf": 1000.0,
            "wavelength": 0.0531,
            "scan_speed": 18.0,
            "range_step": 250.0,
            "timestamp": "2017-03-01T12:00:00.000Z",
            "rays": [{"azimuth": 0.5, "elevation": 0.5}, {"azimuth": 1.5, "elevation": 0.5}],
            "moments": {
                "moment_0": {
                    "format": "UV8",
                    "dyn_range_min": -31.5,
                    "dyn_range_max": 95.5,
                    "unit": "dBZ",
                    "samples": {"v": 1, "dim": [2, 3], "data": [0, 10, 20, 30, 40, 50]}
                }
            }
        }]
    }"#;

    #[test]
    fn document_parses_reader_dump() {
        let doc = ScanDocument::from_json(DOC).unwrap();
        assert_eq!(doc.site.scan_type, ScanType::Ppi);
        let sweep = &doc.sweeps[0];
        assert_eq!(sweep.ray_count(), 2);
        let moment = &sweep.moments["moment_0"];
        assert_eq!(moment.calibration.format, MomentFormat::Uv8);
        assert_eq!(moment.shape(), (2, 3));
        assert_eq!(moment.samples[[1, 2]], 50);
        assert!(sweep.timestamp.is_some());
    }

    #[test]
    fn malformed_document_is_invalid_input() {
        assert!(matches!(
            ScanDocument::from_json("{\"site\": 1}"),
            Err(VolumeError::InvalidInput(_))
        ));
    }
}
