use async_trait::async_trait;

use super::error::SimulationError;

/// Outdoor conditions collaborator.
///
/// The implementation backing this capability may be local or remote; the
/// simulation core only ever awaits the accessor.
#[async_trait]
pub trait Environment: Send + Sync {
    /// Current outdoor air temperature in °C.
    async fn current_temperature(&self) -> Result<f64, SimulationError>;
}

/// An environment with a fixed, city-wide outdoor temperature.
#[derive(Debug, Clone, Copy)]
pub struct ConstantEnvironment {
    outdoor_temperature: f64,
}

impl ConstantEnvironment {
    pub fn new(outdoor_temperature: f64) -> Self {
        Self {
            outdoor_temperature,
        }
    }
}

#[async_trait]
impl Environment for ConstantEnvironment {
    async fn current_temperature(&self) -> Result<f64, SimulationError> {
        Ok(self.outdoor_temperature)
    }
}
