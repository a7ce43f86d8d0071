//! Application state shared across handlers

use polars::prelude::DataFrame;
use tracing::info;

use crate::error::Result;
use crate::services::{CropService, FertilizerService, NutrientService};

/// All three fitted services. Constructed once at startup and shared
/// read-only via `Arc`; handlers take no locks.
pub struct AppState {
    pub crop: CropService,
    pub nutrients: NutrientService,
    pub fertilizer: FertilizerService,
}

impl AppState {
    /// Fit every service from one dataset. Each service selects and
    /// cleans the columns it needs independently.
    pub fn fit(df: &DataFrame) -> Result<Self> {
        info!("Fitting crop recommendation model");
        let crop = CropService::fit(df)?;
        info!("Fitting nutrient requirement model");
        let nutrients = NutrientService::fit(df)?;
        info!("Fitting fertilizer recommendation model");
        let fertilizer = FertilizerService::fit(df)?;
        Ok(Self { crop, nutrients, fertilizer })
    }
}
