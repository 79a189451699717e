// ===============================
// src/risk.rs
// ===============================
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RiskError {
    #[error("position {position} would exceed limit {limit}")]
    PositionLimit { position: i64, limit: i64 },
    #[error("hedged exposure {exposure} would exceed limit {limit}")]
    HedgedExposure { exposure: i64, limit: i64 },
}

/// Post-fill check: both the FUTURE position alone and the net exposure
/// including ETF hedges must stay within `limit`.
pub fn check_exposure(new_position: i64, hedges: i64, limit: i64) -> Result<(), RiskError> {
    if new_position.abs() > limit {
        return Err(RiskError::PositionLimit { position: new_position, limit });
    }
    let exposure = new_position + hedges;
    if exposure.abs() > limit {
        return Err(RiskError::HedgedExposure { exposure, limit });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_limit_passes() {
        assert_eq!(check_exposure(100, 0, 100), Ok(()));
        assert_eq!(check_exposure(-100, 0, 100), Ok(()));
        assert_eq!(check_exposure(80, -80, 100), Ok(()));
    }

    #[test]
    fn position_checked_before_exposure() {
        assert_eq!(
            check_exposure(101, -101, 100),
            Err(RiskError::PositionLimit { position: 101, limit: 100 })
        );
    }

    #[test]
    fn unhedged_drift_is_refused() {
        assert_eq!(
            check_exposure(60, 50, 100),
            Err(RiskError::HedgedExposure { exposure: 110, limit: 100 })
        );
    }
}
