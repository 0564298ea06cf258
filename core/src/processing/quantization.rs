use ndarray::{Array2, ArrayView2, Zip};

use crate::interface::{Calibration, DecodedField};
use crate::prelude::{VolumeResult, DEFAULT_FILL_VALUE};

/// Maps stored integer codes to physical values.
///
/// `value = min + code * (max - min) / divisor`. Code 0 means "no
/// measurement" and is always masked, whatever the arithmetic gives.
pub struct QuantizationDecoder {
    fill_value: f64,
}

impl QuantizationDecoder {
    pub fn new(fill_value: f64) -> Self {
        Self { fill_value }
    }

    pub fn decode_value(code: u16, calibration: &Calibration) -> f64 {
        let span = calibration.dyn_range_max - calibration.dyn_range_min;
        calibration.dyn_range_min + f64::from(code) * span / calibration.format.divisor()
    }

    pub fn decode(
        &self,
        samples: ArrayView2<u16>,
        calibration: &Calibration,
    ) -> VolumeResult<DecodedField> {
        let mut values = Array2::<f64>::zeros(samples.dim());
        let mut mask = Array2::<bool>::from_elem(samples.dim(), false);

        Zip::from(&mut values)
            .and(&mut mask)
            .and(&samples)
            .for_each(|value, masked, &code| {
                if code == 0 {
                    *value = self.fill_value;
                    *masked = true;
                } else {
                    *value = Self::decode_value(code, calibration);
                }
            });

        DecodedField::new(values, mask)
    }
}

impl Default for QuantizationDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_FILL_VALUE)
    }
}
