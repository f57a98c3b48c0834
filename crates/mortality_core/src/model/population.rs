//! Population pyramid bin model.

use serde::{Deserialize, Serialize};

/// Census count of living people of one age for one year.
///
/// `age == AGE_CAP` stands for "100 and above".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationBin {
    pub year: i32,
    pub age: i32,
    pub count: i64,
}
