use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Unit of the samples of a cube.
///
/// Only scaling by exposure time is tracked, so a unit is a base symbol
/// (e.g. `DN`) multiplied by some power of seconds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataUnit {
    symbol: String,
    seconds_power: i32,
}

impl DataUnit {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            seconds_power: 0,
        }
    }

    /// Data numbers, the raw detector unit.
    pub fn dn() -> Self {
        Self::new("DN")
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn seconds_power(&self) -> i32 {
        self.seconds_power
    }

    pub fn per_second(&self) -> Self {
        Self {
            symbol: self.symbol.clone(),
            seconds_power: self.seconds_power - 1,
        }
    }

    pub fn times_second(&self) -> Self {
        Self {
            symbol: self.symbol.clone(),
            seconds_power: self.seconds_power + 1,
        }
    }
}

impl Display for DataUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)?;
        match self.seconds_power {
            0 => Ok(()),
            1 => f.write_str(" s"),
            -1 => f.write_str(" / s"),
            p if p > 0 => write!(f, " s{p}"),
            p => write!(f, " / s{}", -p),
        }
    }
}
