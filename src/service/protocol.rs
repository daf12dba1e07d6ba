use serde::{Deserialize, Serialize};

use crate::renderer::{NoPrimitiveAtPixel, PickResult};

pub const NOT_SELECTED: &str = "picking: primitive not selected.";

/// Client to service: one JSON object per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryMessage {
    #[serde(rename = "pixelX")]
    pub pixel_x: i64,
    #[serde(rename = "pixelY")]
    pub pixel_y: i64,
}

/// Service to clients, broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMessage {
    pub message: String,
}

impl ResultMessage {
    pub fn from_outcome(outcome: &Result<PickResult, NoPrimitiveAtPixel>) -> Self {
        Self {
            message: format_outcome(outcome),
        }
    }

    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

pub fn parse_query(line: &str) -> Result<QueryMessage, serde_json::Error> {
    serde_json::from_str(line.trim())
}

pub fn format_outcome(outcome: &Result<PickResult, NoPrimitiveAtPixel>) -> String {
    match outcome {
        Ok(hit) => format!(
            "Raster: X: {}  Y: {} <===> GCS: Latitude: {:.7}  Longitude: {:.7}  Elevation: {:.7}",
            hit.pixel.0, hit.pixel.1, hit.geo.latitude, hit.geo.longitude, hit.geo.elevation
        ),
        Err(_) => NOT_SELECTED.to_string(),
    }
}
