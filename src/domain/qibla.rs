use crate::domain::models::Coordinate;

pub const KAABA: Coordinate = Coordinate {
    latitude: 21.4225,
    longitude: 39.8262,
};

/// Initial great-circle bearing from `from` to the Kaaba, in degrees within [0, 360).
pub fn qibla_direction(from: Coordinate) -> f64 {
    let phi = from.latitude.to_radians();
    let phi_k = KAABA.latitude.to_radians();
    let delta_lambda = (KAABA.longitude - from.longitude).to_radians();

    let y = delta_lambda.sin();
    let x = phi.cos() * phi_k.tan() - phi.sin() * delta_lambda.cos();
    normalize_degrees(y.atan2(x).to_degrees())
}

/// Angle the device must turn clockwise from `heading` to face `qibla`.
pub fn angle_to_qibla(qibla: f64, heading: f64) -> f64 {
    normalize_degrees(qibla - heading)
}

fn normalize_degrees(value: f64) -> f64 {
    let normalized = value.rem_euclid(360.0);
    if normalized >= 360.0 { 0.0 } else { normalized }
}
