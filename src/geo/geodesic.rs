//! Ellipsoidal distances on WGS-84 via Vincenty's inverse formula.

use crate::error::GeodesicError;

pub const WGS84_A: f64 = 6_378_137.0;
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;
pub const WGS84_B: f64 = (1.0 - WGS84_F) * WGS84_A;

const MAX_ITERATIONS: usize = 200;
const CONVERGENCE: f64 = 1e-12;

/// Distance in meters between two points given in degrees.
pub fn distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> Result<f64, GeodesicError> {
    let l = (lng2 - lng1).to_radians();
    let u1 = ((1.0 - WGS84_F) * lat1.to_radians().tan()).atan();
    let u2 = ((1.0 - WGS84_F) * lat2.to_radians().tan()).atan();
    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let mut lambda = l;
    for _ in 0..MAX_ITERATIONS {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();
        let sin_sigma = ((cos_u2 * sin_lambda).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
        .sqrt();
        if sin_sigma == 0.0 {
            return Ok(0.0);
        }
        let cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        let sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
        // equatorial line: cos_sq_alpha = 0
        let cos_2sigma_m = if cos_sq_alpha != 0.0 {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
        } else {
            0.0
        };
        let c = WGS84_F / 16.0 * cos_sq_alpha * (4.0 + WGS84_F * (4.0 - 3.0 * cos_sq_alpha));
        let previous = lambda;
        lambda = l
            + (1.0 - c)
                * WGS84_F
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))));

        if (lambda - previous).abs() < CONVERGENCE {
            let u_sq = cos_sq_alpha * (WGS84_A.powi(2) - WGS84_B.powi(2)) / WGS84_B.powi(2);
            let a = 1.0
                + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
            let b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
            let delta_sigma = b
                * sin_sigma
                * (cos_2sigma_m
                    + b / 4.0
                        * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))
                            - b / 6.0
                                * cos_2sigma_m
                                * (-3.0 + 4.0 * sin_sigma.powi(2))
                                * (-3.0 + 4.0 * cos_2sigma_m.powi(2))));
            return Ok(WGS84_B * a * (sigma - delta_sigma));
        }
    }

    Err(GeodesicError::NoConvergence(lat1, lng1, lat2, lng2))
}

/// Signed north-south offset of `lat` from `ref_lat`, measured along the
/// reference meridian. Positive northwards.
pub fn northing(ref_lat: f64, ref_lng: f64, lat: f64) -> Result<f64, GeodesicError> {
    let d = distance(ref_lat, ref_lng, lat, ref_lng)?;
    Ok(if lat < ref_lat { -d } else { d })
}

/// Signed east-west offset of `lng` from `ref_lng`, measured along the
/// reference parallel. Positive eastwards.
pub fn easting(ref_lat: f64, ref_lng: f64, lng: f64) -> Result<f64, GeodesicError> {
    let d = distance(ref_lat, ref_lng, ref_lat, lng)?;
    Ok(if lng < ref_lng { -d } else { d })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equator_degree_of_longitude() {
        let d = distance(0.0, 0.0, 0.0, 1.0).unwrap();
        assert!((d - 111_319.490_793).abs() < 1e-3, "{d}");
    }

    #[test]
    fn meridian_degree_from_equator() {
        let d = distance(0.0, 0.0, 1.0, 0.0).unwrap();
        assert!((d - 110_574.389).abs() < 0.01, "{d}");
    }

    #[test]
    fn coincident_points() {
        assert_eq!(distance(43.45, -80.49, 43.45, -80.49).unwrap(), 0.0);
    }

    #[test]
    fn signed_offsets() {
        let n = northing(43.4513, -80.4960, 43.4512).unwrap();
        let e = easting(43.4513, -80.4960, -80.4961).unwrap();
        assert!(n < 0.0 && (n + 11.1).abs() < 0.1, "{n}");
        assert!(e < 0.0 && (e + 8.08).abs() < 0.1, "{e}");
    }
}
