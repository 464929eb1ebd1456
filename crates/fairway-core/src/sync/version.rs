//! Optimistic-concurrency version gate

/// The client's base version does not match the server's current version.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaleBase {
    pub base_version: f64,
    pub current_version: u64,
}

/// Admit a push only when the client's base version equals the server's
/// current version exactly.
#[allow(clippy::float_cmp, clippy::cast_precision_loss)]
pub fn check_base_version(base_version: f64, current_version: u64) -> Result<(), StaleBase> {
    if base_version.is_finite() && base_version == current_version as f64 {
        Ok(())
    } else {
        Err(StaleBase {
            base_version,
            current_version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_versions_pass() {
        assert!(check_base_version(0.0, 0).is_ok());
        assert!(check_base_version(3.0, 3).is_ok());
    }

    #[test]
    fn stale_or_future_versions_are_rejected() {
        let stale = check_base_version(2.0, 3).unwrap_err();
        assert_eq!(stale.current_version, 3);
        assert!(check_base_version(4.0, 3).is_err());
    }

    #[test]
    fn non_integral_or_non_finite_versions_never_match() {
        assert!(check_base_version(2.5, 2).is_err());
        assert!(check_base_version(f64::NAN, 0).is_err());
        assert!(check_base_version(f64::INFINITY, u64::MAX).is_err());
    }
}
