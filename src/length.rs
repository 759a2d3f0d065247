use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// Physical length units accepted by the content scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthUnit {
    Kilometers,
    /// Height of Oliver R. Smoot, 1.702 m.
    Smoots,
    Meters,
    /// One quintillionth of a parsec, slightly more than 3 cm.
    Attoparsecs,
    Centimeters,
    /// One million beard-seconds, about 5 mm.
    MegaBeardSeconds,
    Millimeters,
    Miles,
    /// 220 yards.
    Furlongs,
    Yards,
    Feet,
    Inches,
}

impl LengthUnit {
    /// How many of this unit make up one meter.
    fn per_meter(self) -> f64 {
        match self {
            LengthUnit::Kilometers => 0.001,
            LengthUnit::Smoots => 0.587613,
            LengthUnit::Meters => 1.0,
            LengthUnit::Attoparsecs => 32.4078,
            LengthUnit::Centimeters => 100.0,
            LengthUnit::MegaBeardSeconds => 200.0,
            LengthUnit::Millimeters => 1000.0,
            LengthUnit::Miles => 1.0 / MILES_TO_METERS,
            LengthUnit::Furlongs => 0.004971,
            LengthUnit::Yards => 1.0936,
            LengthUnit::Feet => 3.28084,
            LengthUnit::Inches => 39.3701,
        }
    }
}

const MILES_TO_METERS: f64 = 1609.34;

impl std::str::FromStr for LengthUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit = match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "kilometers" | "km" => LengthUnit::Kilometers,
            "smoots" => LengthUnit::Smoots,
            "meters" | "m" => LengthUnit::Meters,
            "attoparsecs" => LengthUnit::Attoparsecs,
            "centimeters" | "cm" => LengthUnit::Centimeters,
            "mega_beard_seconds" => LengthUnit::MegaBeardSeconds,
            "millimeters" | "mm" => LengthUnit::Millimeters,
            "miles" | "mi" => LengthUnit::Miles,
            "furlongs" => LengthUnit::Furlongs,
            "yards" | "yd" => LengthUnit::Yards,
            "feet" | "ft" => LengthUnit::Feet,
            "inches" | "in" => LengthUnit::Inches,
            other => return Err(format!("unknown length unit '{}'", other)),
        };
        Ok(unit)
    }
}

/// Convert a value in `unit` to meters.
pub fn convert_to_meters(length: f64, unit: LengthUnit) -> f64 {
    match unit {
        // Miles divide the other way to keep the published constant exact.
        LengthUnit::Miles => length * MILES_TO_METERS,
        _ => length / unit.per_meter(),
    }
}

/// Convert a value in meters to `unit`.
pub fn convert_meters_to(meters: f64, unit: LengthUnit) -> f64 {
    match unit {
        LengthUnit::Miles => meters / MILES_TO_METERS,
        _ => meters * unit.per_meter(),
    }
}

/// A distance, stored canonically in meters.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Length {
    meters: f64,
}

impl Length {
    pub fn new(value: f64, unit: LengthUnit) -> Self {
        Self {
            meters: convert_to_meters(value, unit),
        }
    }

    pub fn meters(meters: f64) -> Self {
        Self { meters }
    }

    pub fn to_meters(self) -> f64 {
        self.meters
    }

    pub fn convert_to(self, unit: LengthUnit) -> f64 {
        convert_meters_to(self.meters, unit)
    }
}

impl Add for Length {
    type Output = Length;

    fn add(self, rhs: Length) -> Length {
        Length::meters(self.meters + rhs.meters)
    }
}

impl Sub for Length {
    type Output = Length;

    fn sub(self, rhs: Length) -> Length {
        Length::meters(self.meters - rhs.meters)
    }
}

impl Mul<f64> for Length {
    type Output = Length;

    fn mul(self, scalar: f64) -> Length {
        Length::meters(self.meters * scalar)
    }
}
