//! 加工时间与费用估算。

use lasercut_config::MaterialProfile;
use serde::Serialize;

use crate::errors::FrontendError;

/// 单件与整批的加工估算，时间单位为分钟。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostEstimate {
    pub material: String,
    pub thickness_mm: f64,
    pub cut_minutes: f64,
    pub pierce_minutes: f64,
    /// 单件总时间。
    pub part_minutes: f64,
    pub part_cost: f64,
    pub quantity: usize,
    pub batch_minutes: f64,
    pub batch_cost: f64,
}

/// 按切割长度、穿孔数与材料参数估算加工时间和费用。
pub fn estimate(
    total_length_m: f64,
    pierce_count: usize,
    profile: &MaterialProfile,
    quantity: usize,
) -> Result<CostEstimate, FrontendError> {
    if !(profile.speed_mm_per_min.is_finite() && profile.speed_mm_per_min > 0.0) {
        return Err(FrontendError::InvalidMaterial(profile.name.clone()));
    }

    let cut_minutes = total_length_m * 1000.0 / profile.speed_mm_per_min;
    let pierce_minutes = pierce_count as f64 * profile.pierce_time_s.max(0.0) / 60.0;
    let part_minutes = cut_minutes + pierce_minutes;
    let rate = profile.machine_cost_per_min + profile.gas_cost_per_min;
    let batch_minutes = part_minutes * quantity as f64;

    Ok(CostEstimate {
        material: profile.name.clone(),
        thickness_mm: profile.thickness_mm,
        cut_minutes,
        pierce_minutes,
        part_minutes,
        part_cost: part_minutes * rate,
        quantity,
        batch_minutes,
        batch_cost: batch_minutes * rate,
    })
}
