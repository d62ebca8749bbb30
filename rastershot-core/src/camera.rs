/// Camera presets, auto-framing and lighting
use std::fmt;
use std::str::FromStr;

use nalgebra::{Matrix4, Unit, Vector3};

use crate::error::OptionParseError;
use crate::geometry::Aabb;
use crate::transform::ScreenTransform;

/// Extra room around the framed scene, as a fraction of its projected size
const FRAME_MARGIN: f64 = 1.05;

/// Projected half extents below this are treated as a degenerate scene
const MIN_EXTENT: f64 = 1e-9;

/// Sun offset from the viewer, along the camera right and up axes
const LIGHT_RIGHT_OFFSET: f64 = 0.35;
const LIGHT_UP_OFFSET: f64 = 0.5;

/// Fixed viewing angles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraPreset {
    /// From the south-west, looking down at equal angles
    #[default]
    Iso,
    /// Straight down the Z axis, north up
    Top,
    /// Looking north along +Y
    Front,
    /// Looking west along -X
    Side,
    /// From the south-east, looking down at equal angles
    Se,
}

impl CameraPreset {
    pub const ALL: [CameraPreset; 5] = [
        CameraPreset::Iso,
        CameraPreset::Top,
        CameraPreset::Front,
        CameraPreset::Side,
        CameraPreset::Se,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CameraPreset::Iso => "iso",
            CameraPreset::Top => "top",
            CameraPreset::Front => "front",
            CameraPreset::Side => "side",
            CameraPreset::Se => "se",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Unknown names render with the default preset instead of failing.
    pub fn from_name_or_default(name: &str) -> Self {
        Self::from_name(name).unwrap_or_else(|| {
            let fallback = Self::default();
            log::warn!("Unknown camera angle '{}', using '{}'", name, fallback.name());
            fallback
        })
    }

    /// View direction and world up hint
    fn axes(&self) -> (Vector3<f64>, Vector3<f64>) {
        match self {
            CameraPreset::Iso => (Vector3::new(1.0, 1.0, -1.0), Vector3::z()),
            CameraPreset::Top => (-Vector3::z(), Vector3::y()),
            CameraPreset::Front => (Vector3::y(), Vector3::z()),
            CameraPreset::Side => (-Vector3::x(), Vector3::z()),
            CameraPreset::Se => (Vector3::new(-1.0, 1.0, -1.0), Vector3::z()),
        }
    }
}

impl fmt::Display for CameraPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Output image size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

impl FromStr for Resolution {
    type Err = OptionParseError;

    /// Parses `WIDTHxHEIGHT`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || OptionParseError::Resolution(s.to_string());

        let (width, height) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width: u32 = width.trim().parse().map_err(|_| invalid())?;
        let height: u32 = height.trim().parse().map_err(|_| invalid())?;

        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self::new(width, height))
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Orthographic camera for one render
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub preset: CameraPreset,
    pub view_dir: Unit<Vector3<f64>>,
    /// Screen-up direction, orthogonal to `view_dir`
    pub up: Unit<Vector3<f64>>,
    /// Zoom multiplier: below 1 zooms in, above 1 zooms out
    pub distance: f64,
    pub resolution: Resolution,
}

impl Camera {
    pub fn new(preset: CameraPreset, distance: f64, resolution: Resolution) -> Self {
        let distance = if distance.is_finite() && distance > 0.0 {
            distance
        } else {
            log::warn!("Invalid camera distance {}, using 1.0", distance);
            1.0
        };

        let (view, up_hint) = preset.axes();
        let view_dir = Unit::new_normalize(view);
        let up = Unit::new_normalize(up_hint - view_dir.as_ref() * view_dir.dot(&up_hint));

        Self {
            preset,
            view_dir,
            up,
            distance,
            resolution,
        }
    }

    /// Screen-right direction in world space
    pub fn right(&self) -> Unit<Vector3<f64>> {
        Unit::new_normalize(self.view_dir.cross(self.up.as_ref()))
    }

    /// Unit vector pointing from the scene toward the sun
    pub fn light_direction(&self) -> Unit<Vector3<f64>> {
        Unit::new_normalize(
            -self.view_dir.into_inner()
                + self.right().into_inner() * LIGHT_RIGHT_OFFSET
                + self.up.into_inner() * LIGHT_UP_OFFSET,
        )
    }

    /// Build the world-to-screen transform that fits `bounds` into the image
    pub fn frame(&self, bounds: &Aabb) -> ScreenTransform {
        let center = bounds.center();
        let right = self.right();

        let (half_x, half_y) = bounds.corners().iter().fold((0.0f64, 0.0f64), |(hx, hy), corner| {
            let offset = corner - center;
            (hx.max(offset.dot(right.as_ref()).abs()), hy.max(offset.dot(self.up.as_ref()).abs()))
        });

        let aspect = self.resolution.aspect();
        let fitted = half_y.max(half_x / aspect);
        let half_height = (if fitted > MIN_EXTENT { fitted * FRAME_MARGIN } else { 1.0 }) * self.distance;
        let half_width = half_height * aspect;

        // Far enough back that the whole scene sits between the near and far planes
        let eye_distance = 2.0 * bounds.half_extents().norm() + 1.0;
        let eye = center - self.view_dir.into_inner() * eye_distance;

        let view = Matrix4::look_at_rh(&eye, &center, self.up.as_ref());
        let projection = Matrix4::new_orthographic(
            -half_width,
            half_width,
            -half_height,
            half_height,
            0.0,
            2.0 * eye_distance,
        );
        let viewport = ScreenTransform::viewport_matrix(self.resolution.width, self.resolution.height);

        ScreenTransform::new(&view, &projection, &viewport)
    }
}
