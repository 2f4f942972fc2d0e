//! Formulation options.

/// How the bilinear transshipment term `x[s][k][r][v] * z[s][b]` is linearised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransshipmentLinearization {
    /// One continuous `w ∈ [0, 1]` per product with the three McCormick rows.
    /// Exact for any integer-feasible point.
    #[default]
    Product,
    /// One `tau[s][k][b] >= 0` per (ship, compartment, berth) bounded below by
    /// the berth's slot cost when `z[s][b] = 1`. Far fewer variables; exact at
    /// optimality when every transshipment cost is non-negative.
    BerthAggregate,
}

/// Upper bound of the compartment start times `e_sk[s][k]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CompartmentHorizon {
    /// `planning_horizon + max_b processing_time(s, b)`: a compartment may
    /// start after the horizon while the ship itself may not.
    #[default]
    ShipProcessing,
    /// `planning_horizon`.
    PlanningHorizon,
}

/// Configuration for [`ModelBuilder`](super::ModelBuilder).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FormulationConfig {
    pub linearization: TransshipmentLinearization,
    pub compartment_horizon: CompartmentHorizon,
    /// Added to every computed big-M constant.
    pub big_m_margin: f64,
}

impl Default for FormulationConfig {
    fn default() -> Self {
        Self {
            linearization: TransshipmentLinearization::Product,
            compartment_horizon: CompartmentHorizon::ShipProcessing,
            big_m_margin: 1.0,
        }
    }
}

impl FormulationConfig {
    pub fn with_linearization(mut self, linearization: TransshipmentLinearization) -> Self {
        self.linearization = linearization;
        self
    }

    pub fn with_compartment_horizon(mut self, horizon: CompartmentHorizon) -> Self {
        self.compartment_horizon = horizon;
        self
    }

    pub fn with_big_m_margin(mut self, margin: f64) -> Self {
        self.big_m_margin = margin;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.big_m_margin.is_finite() && self.big_m_margin >= 0.0) {
            return Err(format!(
                "big_m_margin must be finite and >= 0, got {}",
                self.big_m_margin
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FormulationConfig::default();
        assert_eq!(config.linearization, TransshipmentLinearization::Product);
        assert_eq!(config.compartment_horizon, CompartmentHorizon::ShipProcessing);
        assert_eq!(config.big_m_margin, 1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_margin() {
        assert!(FormulationConfig::default()
            .with_big_m_margin(-1.0)
            .validate()
            .is_err());
        assert!(FormulationConfig::default()
            .with_big_m_margin(f64::INFINITY)
            .validate()
            .is_err());
    }
}
