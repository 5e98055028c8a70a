use axum::Json;

use crate::models::{Region, RegionList, RegionType};

const REGIONS: [Region; 5] = [
    Region { name: "Maharashtra", region_type: RegionType::State },
    Region { name: "Pune", region_type: RegionType::District },
    Region { name: "Haveli", region_type: RegionType::City },
    Region { name: "Gujarat", region_type: RegionType::State },
    Region { name: "Karnataka", region_type: RegionType::State },
];

pub async fn list() -> Json<RegionList> {
    Json(RegionList {
        regions: REGIONS.to_vec(),
    })
}
