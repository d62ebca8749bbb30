/// World-to-screen transformation shared by every triangle of a render
use nalgebra::{Matrix3xX, Matrix4, Point3, Vector4};

/// Composed view, projection and viewport mapping.
///
/// Maps a world point to `(pixel_x, pixel_y, depth)`: pixels grow right and
/// down from the top-left corner of the image, depth grows away from the
/// camera and lies in `[0, 1]` for points inside the framed volume.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenTransform {
    matrix: Matrix4<f64>,
}

impl ScreenTransform {
    /// Create the full transform from its stages
    pub fn new(view: &Matrix4<f64>, projection: &Matrix4<f64>, viewport: &Matrix4<f64>) -> Self {
        Self {
            matrix: viewport * projection * view,
        }
    }

    /// Map normalized device coordinates onto a `width` x `height` pixel grid
    pub fn viewport_matrix(width: u32, height: u32) -> Matrix4<f64> {
        let half_w = width as f64 / 2.0;
        let half_h = height as f64 / 2.0;

        #[rustfmt::skip]
        let viewport = Matrix4::new(
            half_w, 0.0,     0.0, half_w,
            0.0,    -half_h, 0.0, half_h,
            0.0,    0.0,     0.5, 0.5,
            0.0,    0.0,     0.0, 1.0,
        );
        viewport
    }

    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }

    pub fn project_point(&self, point: &Point3<f64>) -> Point3<f64> {
        self.matrix.transform_point(point)
    }

    /// Project many points at once.
    ///
    /// Column `i` of the result holds `(pixel_x, pixel_y, depth)` of `points[i]`.
    /// The transform is affine (orthographic), so this is one 3x3 product
    /// over the whole batch plus a broadcast translation.
    pub fn project_batch(&self, points: &[Point3<f64>]) -> Matrix3xX<f64> {
        debug_assert_eq!(self.matrix.row(3).transpose(), Vector4::w());

        let linear = self.matrix.fixed_view::<3, 3>(0, 0);
        let translation = self.matrix.fixed_view::<3, 1>(0, 3);

        let world = Matrix3xX::from_iterator(points.len(), points.iter().flat_map(|p| [p.x, p.y, p.z]));
        let mut screen = linear * world;
        for mut column in screen.column_iter_mut() {
            column += translation;
        }
        screen
    }
}
