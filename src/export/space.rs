use glam::{Mat4, Vec3, Vec4};

/// Change of basis from the authoring tool's right-handed Z-up convention to
/// the engine's right-handed Y-up one: `(x, y, z) -> (x, z, -y)`.
pub const BASIS: Mat4 = Mat4::from_cols(
    Vec4::new(1., 0., 0., 0.),
    Vec4::new(0., 0., -1., 0.),
    Vec4::new(0., 1., 0., 0.),
    Vec4::new(0., 0., 0., 1.),
);

pub const BASIS_INV: Mat4 = Mat4::from_cols(
    Vec4::new(1., 0., 0., 0.),
    Vec4::new(0., 0., 1., 0.),
    Vec4::new(0., -1., 0., 0.),
    Vec4::new(0., 0., 0., 1.),
);

/// Converts a position from source coordinates to engine coordinates.
pub fn convert_position(position: Vec3) -> Vec3 {
    Vec3::new(position.x, position.z, -position.y)
}

/// Converts a direction or normal from source coordinates to engine
/// coordinates. Directions only use the rotation part of the basis change;
/// there is no translation to pick up.
pub fn convert_direction(direction: Vec3) -> Vec3 {
    Vec3::new(direction.x, direction.z, -direction.y)
}

/// Converts a transform from source coordinates to engine coordinates via
/// the similarity transform `C * M * C^-1`, so that
/// `convert(A * B) == convert(A) * convert(B)`.
pub fn convert_matrix(matrix: Mat4) -> Mat4 {
    BASIS.mul_mat4(&matrix).mul_mat4(&BASIS_INV)
}
