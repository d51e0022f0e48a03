//! A minimal linear world coordinate system.
//!
//! Axes are stored in FITS order (`CTYPE1` first), which is the reverse of the
//! array axis order used by [`MapCube`](crate::MapCube).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WcsAxis {
    pub ctype: String,
    pub cunit: String,
    pub cdelt: f64,
    pub crpix: f64,
    pub crval: f64,
}

impl WcsAxis {
    pub fn new(
        ctype: impl Into<String>,
        cunit: impl Into<String>,
        cdelt: f64,
        crpix: f64,
        crval: f64,
    ) -> Self {
        Self {
            ctype: ctype.into(),
            cunit: cunit.into(),
            cdelt,
            crpix,
            crval,
        }
    }

    /// IVOA-style physical type of the axis, e.g. `custom:pos.helioprojective.lat`.
    pub fn physical_type(&self) -> String {
        let ctype = self.ctype.trim();
        let coord = ctype.split('-').next().unwrap_or(ctype).to_ascii_uppercase();
        match coord.as_str() {
            "HPLN" => "custom:pos.helioprojective.lon".to_string(),
            "HPLT" => "custom:pos.helioprojective.lat".to_string(),
            "SOLX" => "custom:pos.heliocentric.x".to_string(),
            "SOLY" => "custom:pos.heliocentric.y".to_string(),
            "TIME" | "UTC" | "TAI" => "time".to_string(),
            "WAVE" => "em.wl".to_string(),
            "FREQ" => "em.freq".to_string(),
            _ => format!("custom:{ctype}"),
        }
    }

    /// World coordinate of a zero-based pixel index.
    pub fn pixel_to_world(&self, pixel: f64) -> f64 {
        // CRPIX is one-based
        self.crval + self.cdelt * (pixel + 1.0 - self.crpix)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Wcs {
    axes: Vec<WcsAxis>,
}

impl Wcs {
    pub fn new(axes: Vec<WcsAxis>) -> Self {
        Self { axes }
    }

    pub fn naxis(&self) -> usize {
        self.axes.len()
    }

    pub fn axes(&self) -> &[WcsAxis] {
        &self.axes
    }

    pub fn axis(&self, i: usize) -> Option<&WcsAxis> {
        self.axes.get(i)
    }

    /// Physical types in FITS order.
    pub fn physical_types(&self) -> Vec<String> {
        self.axes.iter().map(WcsAxis::physical_type).collect()
    }
}

impl FromIterator<WcsAxis> for Wcs {
    fn from_iter<I: IntoIterator<Item = WcsAxis>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
