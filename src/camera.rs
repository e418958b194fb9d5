//! Orthographic camera looking down -Z at the flow plane.

use glam::{Mat4, Vec2, Vec3};

/// 2D orthographic camera.
///
/// The visible region is `half_width` units either side of `center`
/// horizontally; the vertical half-size follows from the target aspect.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrthoCamera {
    /// Point at the middle of the view.
    pub center: Vec2,
    /// Half of the visible width in world units.
    pub half_width: f32,
    /// Distance from the plane to the near and far clip planes.
    pub depth: f32,
}

impl OrthoCamera {
    pub fn new(half_width: f32) -> Self {
        Self {
            center: Vec2::ZERO,
            half_width,
            depth: 100.0,
        }
    }

    /// Calculate the view matrix for rendering.
    pub fn view_matrix(&self) -> Mat4 {
        let eye = Vec3::new(self.center.x, self.center.y, 1.0);
        Mat4::look_at_rh(eye, eye - Vec3::Z, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        let hw = self.half_width;
        let hh = if aspect > 0.0 { hw / aspect } else { hw };
        Mat4::orthographic_rh(-hw, hw, -hh, hh, -self.depth, self.depth)
    }

    /// Projection times view.
    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }
}

impl Default for OrthoCamera {
    /// Frames the default 100 x 56.25 domain on a 16:9 target.
    fn default() -> Self {
        Self::new(50.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn test_domain_corners_map_to_ndc_corners() {
        let cam = OrthoCamera::default();
        let vp = cam.view_projection(16.0 / 9.0);
        let corner = vp * Vec4::new(50.0, 28.125, 0.0, 1.0);
        assert!((corner.x - 1.0).abs() < 1e-5);
        assert!((corner.y - 1.0).abs() < 1e-5);
        let origin = vp * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!(origin.x.abs() < 1e-6 && origin.y.abs() < 1e-6);
        assert!((0.0..=1.0).contains(&origin.z));
    }

    #[test]
    fn test_center_shifts_view() {
        let mut cam = OrthoCamera::default();
        cam.center = Vec2::new(10.0, 0.0);
        let p = cam.view_projection(16.0 / 9.0) * Vec4::new(10.0, 0.0, 0.0, 1.0);
        assert!(p.x.abs() < 1e-6);
    }
}
