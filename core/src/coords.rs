//! Extra per-axis coordinates of a cube, looked up by name.
//!
//! Values are not checked against the cube when they are attached. Whoever
//! needs a coordinate validates it at that point.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use derive_more::Constructor;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uom::si::{f64::Time, time::second};

use crate::error::{Error, Result};

/// Observation start time of each slice.
pub const TIME: &str = "TIME";
/// Exposure duration of each slice.
pub const EXPOSURE_TIME: &str = "EXPOSURE TIME";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CoordValues {
    Float(Vec<f64>),
    Duration(Vec<Time>),
    DateTime(Vec<NaiveDateTime>),
}

impl CoordValues {
    /// Durations given in seconds.
    pub fn seconds(values: &[f64]) -> Self {
        CoordValues::Duration(values.iter().map(|&s| Time::new::<second>(s)).collect())
    }

    pub fn len(&self) -> usize {
        match self {
            CoordValues::Float(v) => v.len(),
            CoordValues::Duration(v) => v.len(),
            CoordValues::DateTime(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The single value at `index`, still wrapped as a one-element list.
    pub fn select(&self, index: usize) -> Option<CoordValues> {
        Some(match self {
            CoordValues::Float(v) => CoordValues::Float(vec![*v.get(index)?]),
            CoordValues::Duration(v) => CoordValues::Duration(vec![*v.get(index)?]),
            CoordValues::DateTime(v) => CoordValues::DateTime(vec![*v.get(index)?]),
        })
    }

    /// Values as seconds. Plain floats are taken to already be seconds.
    pub fn as_seconds(&self) -> Option<Vec<f64>> {
        match self {
            CoordValues::Float(v) => Some(v.clone()),
            CoordValues::Duration(v) => Some(v.iter().map(|t| t.get::<second>()).collect()),
            CoordValues::DateTime(_) => None,
        }
    }

    /// Appends `other`, returning `false` (and leaving `self` alone) if the
    /// two hold different kinds of values.
    pub fn extend_from(&mut self, other: &CoordValues) -> bool {
        match (self, other) {
            (CoordValues::Float(a), CoordValues::Float(b)) => a.extend_from_slice(b),
            (CoordValues::Duration(a), CoordValues::Duration(b)) => a.extend_from_slice(b),
            (CoordValues::DateTime(a), CoordValues::DateTime(b)) => a.extend_from_slice(b),
            _ => return false,
        }
        true
    }
}

/// A named coordinate attached to one array axis.
///
/// `axis` is `None` for a scalar coordinate, i.e. one whose axis has been
/// indexed away.
#[derive(Debug, Clone, PartialEq, Constructor, Serialize, Deserialize)]
pub struct ExtraCoord {
    pub axis: Option<usize>,
    pub values: CoordValues,
}

impl ExtraCoord {
    pub fn on_axis(axis: usize, values: CoordValues) -> Self {
        Self::new(Some(axis), values)
    }

    pub fn scalar(values: CoordValues) -> Self {
        Self::new(None, values)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtraCoords(BTreeMap<String, ExtraCoord>);

impl ExtraCoords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, coord: ExtraCoord) -> Option<ExtraCoord> {
        self.0.insert(name.into(), coord)
    }

    pub fn get(&self, name: &str) -> Option<&ExtraCoord> {
        self.0.get(name)
    }

    /// Like [`get`](Self::get), but a missing coordinate is an error.
    pub fn require(&self, name: &str) -> Result<&ExtraCoord> {
        self.get(name).ok_or_else(|| Error::MissingExtraCoord {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExtraCoord)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Coordinates as seen after removing array axis `axis` at `index`.
    ///
    /// Coordinates on the removed axis become scalars, those on later axes
    /// move down by one. A coordinate too short to have a value at `index`
    /// is dropped.
    pub fn index_axis(&self, axis: usize, index: usize) -> ExtraCoords {
        let mut out = ExtraCoords::new();
        for (name, coord) in self.iter() {
            let coord = match coord.axis {
                Some(a) if a == axis => match coord.values.select(index) {
                    Some(values) => ExtraCoord::scalar(values),
                    None => {
                        warn!(
                            coord = name,
                            len = coord.values.len(),
                            index,
                            "Dropping extra coordinate without a value for the selected slice"
                        );
                        continue;
                    }
                },
                Some(a) if a > axis => ExtraCoord::on_axis(a - 1, coord.values.clone()),
                _ => coord.clone(),
            };
            out.insert(name, coord);
        }
        out
    }
}

impl<K: Into<String>> FromIterator<(K, ExtraCoord)> for ExtraCoords {
    fn from_iter<I: IntoIterator<Item = (K, ExtraCoord)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
