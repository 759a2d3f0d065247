use crate::length::Length;
use crate::provider::TrackingProvider;
use crate::settings::AnchorConfig;
use crate::types::AnchorType;
use crate::{Result, TrackingError};

/// Physical size of a gameboard variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorDimensions {
    pub playable_x: Length,
    pub playable_y: Length,
    pub border_width: Length,
    /// False when these are the LE fallback rather than provider data.
    pub reported: bool,
}

impl AnchorDimensions {
    /// LE gameboard, used when the provider cannot answer.
    pub const LE_FALLBACK_METERS: (f64, f64, f64) = (0.7, 0.7, 0.05);

    pub fn from_meters(playable_x: f64, playable_y: f64, border_width: f64) -> Self {
        Self {
            playable_x: Length::meters(playable_x),
            playable_y: Length::meters(playable_y),
            border_width: Length::meters(border_width),
            reported: true,
        }
    }

    pub fn le_fallback() -> Self {
        let (x, y, border) = Self::LE_FALLBACK_METERS;
        Self {
            reported: false,
            ..Self::from_meters(x, y, border)
        }
    }

    pub fn total_x(&self) -> Length {
        self.playable_x + self.border_width * 2.0
    }

    pub fn total_y(&self) -> Length {
        self.playable_y + self.border_width * 2.0
    }

    /// Query the provider for a board's dimensions.
    ///
    /// `AnchorType::None` has no dimensions. Provider failures fall back to the
    /// LE board with `reported == false`.
    pub fn query(provider: &dyn TrackingProvider, anchor_type: AnchorType) -> Result<Self> {
        if !anchor_type.is_tracked() {
            return Err(TrackingError::NoAnchor);
        }
        match provider.anchor_dimensions(anchor_type) {
            Ok(dims) => Ok(dims),
            Err(e) => {
                log::warn!("Gameboard dimensions for {:?} unavailable: {}", anchor_type, e);
                Ok(Self::le_fallback())
            }
        }
    }
}

impl AnchorConfig {
    /// Board variant to present: the override if set, else the tracked type,
    /// else LE.
    pub fn displayed_type(&self) -> AnchorType {
        if self.type_override.is_tracked() {
            self.type_override
        } else if self.anchor_type.is_tracked() {
            self.anchor_type
        } else {
            AnchorType::Le
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::SimulatedProvider;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_totals_include_both_borders() {
        let dims = AnchorDimensions::from_meters(0.7, 0.6, 0.05);
        assert_abs_diff_eq!(dims.total_x().to_meters(), 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(dims.total_y().to_meters(), 0.7, epsilon = 1e-12);
    }

    #[test]
    fn test_query_none_is_an_error() {
        let provider = SimulatedProvider::default();
        assert!(matches!(
            AnchorDimensions::query(&provider, AnchorType::None),
            Err(TrackingError::NoAnchor)
        ));
    }

    #[test]
    fn test_query_falls_back_to_le() {
        let mut provider = SimulatedProvider::default();
        provider.anchor_dimensions = None;
        let dims = AnchorDimensions::query(&provider, AnchorType::Xe).unwrap();
        assert!(!dims.reported);
        assert_abs_diff_eq!(dims.playable_x.to_meters(), 0.7, epsilon = 1e-12);

        provider.anchor_dimensions = Some(AnchorDimensions::from_meters(0.9, 0.7, 0.05));
        let dims = AnchorDimensions::query(&provider, AnchorType::Xe).unwrap();
        assert!(dims.reported);
        assert_abs_diff_eq!(dims.playable_x.to_meters(), 0.9, epsilon = 1e-12);
    }

    #[test]
    fn test_displayed_type() {
        let mut anchor = AnchorConfig::default();
        assert_eq!(anchor.displayed_type(), AnchorType::Le);
        anchor.anchor_type = AnchorType::Xe;
        assert_eq!(anchor.displayed_type(), AnchorType::Xe);
        anchor.type_override = AnchorType::XeRaised;
        assert_eq!(anchor.displayed_type(), AnchorType::XeRaised);
    }
}
