/// Depth-buffered triangle rasterizer
///
/// Every triangle goes through transform, backface cull, flat shading and a
/// depth-tested fill. Setup runs in parallel over triangles; the fill runs in
/// parallel over horizontal bands of the framebuffer, each band owning a
/// disjoint slice of the color and depth buffers.
use nalgebra::{Point3, Unit, Vector3};
use rayon::prelude::*;

use crate::camera::Camera;
use crate::color::{ColorMode, Rgb};
use crate::framebuffer::Framebuffer;
use crate::geometry::{Aabb, Triangle};
use crate::scene::Scene;
use crate::transform::ScreenTransform;

/// Brightness of faces turned away from the light
pub const AMBIENT_FLOOR: f64 = 0.3;

/// Framebuffer rows per parallel fill band
const BAND_ROWS: usize = 16;

/// Counters from one rasterization pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RasterStats {
    pub triangles: usize,
    pub back_facing: usize,
    pub degenerate: usize,
    pub off_screen: usize,
    pub rasterized: usize,
    /// Pixel samples found inside a rasterized triangle
    pub fragments: u64,
    /// Fragments that passed the depth test
    pub writes: u64,
}

/// Flat per-triangle arrays for a whole scene: three vertices and one base color per triangle
#[derive(Debug, Clone, Default)]
pub struct TriangleBatch {
    vertices: Vec<Point3<f64>>,
    colors: Vec<Rgb>,
}

impl TriangleBatch {
    pub fn with_capacity(triangles: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(triangles * 3),
            colors: Vec::with_capacity(triangles),
        }
    }

    pub fn from_scene(scene: &Scene, mode: ColorMode) -> Self {
        let mut batch = Self::with_capacity(scene.triangle_count());
        for element in scene.elements() {
            let color = mode.base_color(element);
            for triangle in element.triangles() {
                batch.push(triangle, color);
            }
        }
        batch
    }

    pub fn push(&mut self, triangle: &Triangle, color: Rgb) {
        self.vertices.extend_from_slice(&triangle.vertices);
        self.colors.push(color);
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    fn world_triangle(&self, index: usize) -> Triangle {
        let v = &self.vertices[index * 3..index * 3 + 3];
        Triangle::new(v[0], v[1], v[2])
    }
}

/// Flat shading: ambient floor plus Lambert term, applied per channel
pub fn shade(base: Rgb, normal: &Vector3<f64>, light: &Vector3<f64>) -> Rgb {
    let lambert = normal.dot(light).max(0.0);
    let intensity = (AMBIENT_FLOOR + (1.0 - AMBIENT_FLOOR) * lambert).clamp(AMBIENT_FLOOR, 1.0);
    base.map(|channel| (channel as f64 * intensity).round().clamp(0.0, 255.0) as u8)
}

/// Draws triangle batches through one camera framing
pub struct Rasterizer {
    transform: ScreenTransform,
    light: Unit<Vector3<f64>>,
}

impl Rasterizer {
    /// Frame `bounds` with `camera`
    pub fn new(camera: &Camera, bounds: &Aabb) -> Self {
        Self {
            transform: camera.frame(bounds),
            light: camera.light_direction(),
        }
    }

    pub fn transform(&self) -> &ScreenTransform {
        &self.transform
    }

    pub fn draw(&self, batch: &TriangleBatch, framebuffer: &mut Framebuffer) -> RasterStats {
        let screen = self.transform.project_batch(&batch.vertices);
        let (width, height) = (framebuffer.width(), framebuffer.height());

        let setups: Vec<Setup> = (0..batch.len())
            .into_par_iter()
            .map(|t| {
                let corner = |i: usize| {
                    let column = screen.column(t * 3 + i);
                    Point3::new(column[0], column[1], column[2])
                };
                let projected = [corner(0), corner(1), corner(2)];

                match orient(projected) {
                    Orientation::BackFacing => Setup::BackFacing,
                    Orientation::Degenerate => Setup::Degenerate,
                    Orientation::FrontFacing(vertices) => {
                        // Shade from the world-space face, not the projected one.
                        match batch.world_triangle(t).normal() {
                            Some(normal) => {
                                let color = shade(batch.colors[t], &normal, self.light.as_ref());
                                setup(vertices, color, width, height)
                            }
                            None => Setup::Degenerate,
                        }
                    }
                }
            })
            .collect();

        fill(setups, framebuffer)
    }
}

/// Sub-pixel precision of snapped screen coordinates (8 bits)
const SUBPIXEL: f64 = 256.0;

/// Pixels of slack around the image. Triangles reaching beyond it are
/// clipped to it before snapping, so snapped coordinates stay small.
const GUARD_BAND: f64 = 4096.0;

/// Snapped coordinates beyond this many sub-pixel units are rejected, which
/// keeps every edge-function product inside `i64`. Only reachable with
/// images wider or taller than about two million pixels.
const MAX_SNAPPED: i64 = 1 << 29;

/// A projected vertex snapped to the sub-pixel grid, depth kept as is
#[derive(Debug, Clone, Copy, PartialEq)]
struct Snapped {
    x: i64,
    y: i64,
    z: f64,
}

impl Snapped {
    fn new(p: &Point3<f64>) -> Option<Self> {
        let snap = |v: f64| {
            let s = (v * SUBPIXEL).round();
            (s.is_finite() && s.abs() <= MAX_SNAPPED as f64).then_some(s as i64)
        };
        Some(Self {
            x: snap(p.x)?,
            y: snap(p.y)?,
            z: p.z,
        })
    }
}

enum Orientation {
    BackFacing,
    Degenerate,
    /// Vertices reordered so the signed area is positive
    FrontFacing([Point3<f64>; 3]),
}

/// Classify a projected triangle by the sign of its screen-space area.
///
/// The viewport flips y, so a face wound counter-clockwise toward the camera
/// has negative signed area in pixel coordinates.
fn orient([v0, v1, v2]: [Point3<f64>; 3]) -> Orientation {
    let area2 = (v1.x - v0.x) * (v2.y - v0.y) - (v1.y - v0.y) * (v2.x - v0.x);
    if area2 == 0.0 || !area2.is_finite() {
        Orientation::Degenerate
    } else if area2 > 0.0 {
        Orientation::BackFacing
    } else {
        Orientation::FrontFacing([v0, v2, v1])
    }
}

/// Prepare a positively oriented pixel-space triangle for filling, clipping
/// it to the guard band first when it reaches past it.
fn setup(vertices: [Point3<f64>; 3], color: Rgb, width: usize, height: usize) -> Setup {
    let (x_max, y_max) = (width as f64 + GUARD_BAND, height as f64 + GUARD_BAND);
    let in_guard_band =
        |p: &Point3<f64>| p.x >= -GUARD_BAND && p.x <= x_max && p.y >= -GUARD_BAND && p.y <= y_max;

    if vertices.iter().all(in_guard_band) {
        return ScreenTriangle::new(vertices, color, width, height);
    }

    // Clipping keeps orientation, so the fan pieces stay positively oriented.
    let polygon = clip_to_guard_band(&vertices, x_max, y_max);
    let pieces: Vec<ScreenTriangle> = (1..polygon.len().saturating_sub(1))
        .filter_map(|i| {
            match ScreenTriangle::new([polygon[0], polygon[i], polygon[i + 1]], color, width, height) {
                Setup::Visible(piece) => Some(piece),
                _ => None,
            }
        })
        .collect();

    if pieces.is_empty() {
        Setup::OffScreen
    } else {
        Setup::Clipped(pieces)
    }
}

/// Sutherland-Hodgman clip of a triangle against the guard band rectangle
fn clip_to_guard_band(triangle: &[Point3<f64>; 3], x_max: f64, y_max: f64) -> Vec<Point3<f64>> {
    // (axis, bound, keep points below the bound)
    let planes = [
        (0, -GUARD_BAND, false),
        (0, x_max, true),
        (1, -GUARD_BAND, false),
        (1, y_max, true),
    ];

    let mut polygon = triangle.to_vec();
    for (axis, bound, below) in planes {
        let inside = |p: &Point3<f64>| if below { p[axis] <= bound } else { p[axis] >= bound };
        let mut clipped = Vec::with_capacity(polygon.len() + 1);

        for (i, current) in polygon.iter().enumerate() {
            let previous = &polygon[(i + polygon.len() - 1) % polygon.len()];
            match (inside(previous), inside(current)) {
                (true, true) => clipped.push(*current),
                (true, false) => clipped.push(crossing(previous, current, axis, bound)),
                (false, true) => {
                    clipped.push(crossing(previous, current, axis, bound));
                    clipped.push(*current);
                }
                (false, false) => {}
            }
        }

        polygon = clipped;
        if polygon.is_empty() {
            break;
        }
    }
    polygon
}

/// Where segment `a`-`b` crosses `axis = bound`, depth interpolated linearly.
///
/// Always measured from the lexicographically smaller endpoint, so two
/// triangles sharing the edge get bit-identical crossings.
fn crossing(a: &Point3<f64>, b: &Point3<f64>, axis: usize, bound: f64) -> Point3<f64> {
    let (a, b) = if (a.x, a.y, a.z) <= (b.x, b.y, b.z) { (a, b) } else { (b, a) };
    let t = (bound - a[axis]) / (b[axis] - a[axis]);
    let mut point = a + (b - a) * t;
    point[axis] = bound;
    point
}

/// Twice the signed area of `(a, b, p)` in sub-pixel units; positive when `p`
/// is on the inner side of `a -> b`. Exact, so a shared edge evaluates to
/// opposite values in the two triangles that share it.
#[inline]
fn edge(a: &Snapped, b: &Snapped, px: i64, py: i64) -> i64 {
    (b.x - a.x) * (py - a.y) - (b.y - a.y) * (px - a.x)
}

/// Sub-pixel coordinate of the center of pixel `i`
#[inline]
fn pixel_center(i: usize) -> i64 {
    i as i64 * SUBPIXEL as i64 + SUBPIXEL as i64 / 2
}

/// Half-open top-left fill rule for positively oriented triangles in y-down
/// coordinates: samples exactly on an edge belong to the triangle only when
/// the edge is a top edge (horizontal, running right) or a left edge
/// (running up).
fn is_top_left(a: &Snapped, b: &Snapped) -> bool {
    (a.y == b.y && b.x > a.x) || b.y < a.y
}

enum Setup {
    BackFacing,
    Degenerate,
    OffScreen,
    Visible(ScreenTriangle),
    /// Pieces of a triangle clipped to the guard band
    Clipped(Vec<ScreenTriangle>),
}

/// A front-facing triangle ready to fill
struct ScreenTriangle {
    vertices: [Snapped; 3],
    inv_area2: f64,
    /// Inclusion of samples lying exactly on the edge opposite each vertex
    top_left: [bool; 3],
    color: Rgb,
    x_min: usize,
    x_max: usize,
    y_min: usize,
    y_max: usize,
}

impl ScreenTriangle {
    /// `vertices` should have positive signed area; pieces that lose it when
    /// snapped are degenerate.
    fn new(vertices: [Point3<f64>; 3], color: Rgb, width: usize, height: usize) -> Setup {
        let [Some(v0), Some(v1), Some(v2)] = vertices.each_ref().map(Snapped::new) else {
            return Setup::OffScreen;
        };
        let area2 = edge(&v0, &v1, v2.x, v2.y);
        if area2 <= 0 {
            return Setup::Degenerate;
        }

        // First and last pixel whose center lies within [lo, hi] sub-pixel units.
        let span = |lo: i64, hi: i64, limit: usize| {
            let first = ((lo as f64 - SUBPIXEL / 2.0) / SUBPIXEL).ceil().max(0.0);
            let last = ((hi as f64 - SUBPIXEL / 2.0) / SUBPIXEL).floor().min(limit as f64 - 1.0);
            (first, last)
        };
        let (x_lo, x_hi) = span(v0.x.min(v1.x).min(v2.x), v0.x.max(v1.x).max(v2.x), width);
        let (y_lo, y_hi) = span(v0.y.min(v1.y).min(v2.y), v0.y.max(v1.y).max(v2.y), height);

        if x_lo > x_hi || y_lo > y_hi {
            return Setup::OffScreen;
        }

        Setup::Visible(Self {
            vertices: [v0, v1, v2],
            inv_area2: 1.0 / area2 as f64,
            top_left: [
                is_top_left(&v1, &v2),
                is_top_left(&v2, &v0),
                is_top_left(&v0, &v1),
            ],
            color,
            x_min: x_lo as usize,
            x_max: x_hi as usize,
            y_min: y_lo as usize,
            y_max: y_hi as usize,
        })
    }

    /// Fill the rows of this triangle that fall in a band starting at `first_row`.
    ///
    /// Returns `(fragments, writes)`.
    fn fill_band(&self, color: &mut [u8], depth: &mut [f32], width: usize, first_row: usize) -> (u64, u64) {
        let rows = depth.len() / width;
        let y_start = self.y_min.max(first_row);
        let y_end = self.y_max.min(first_row + rows - 1);
        if y_start > y_end {
            return (0, 0);
        }

        let [v0, v1, v2] = &self.vertices;
        let edges = [(v1, v2), (v2, v0), (v0, v1)];
        // Edge functions are linear in x: evaluate once per row, then step.
        let step = edges.map(|(a, b)| (a.y - b.y) * SUBPIXEL as i64);
        let px0 = pixel_center(self.x_min);

        let mut fragments = 0;
        let mut writes = 0;

        for y in y_start..=y_end {
            let py = pixel_center(y);
            let mut w = edges.map(|(a, b)| edge(a, b, px0, py));
            let row = (y - first_row) * width;

            for x in self.x_min..=self.x_max {
                let inside = (0..3).all(|i| w[i] > 0 || (w[i] == 0 && self.top_left[i]));
                if inside {
                    fragments += 1;

                    let z = ((w[0] as f64 * v0.z + w[1] as f64 * v1.z + w[2] as f64 * v2.z) * self.inv_area2) as f32;
                    let idx = row + x;
                    if z < depth[idx] {
                        depth[idx] = z;
                        color[idx * 3..idx * 3 + 3].copy_from_slice(&self.color);
                        writes += 1;
                    }
                }

                for i in 0..3 {
                    w[i] += step[i];
                }
            }
        }

        (fragments, writes)
    }
}

/// Tally setup outcomes, bin visible triangles by band in submission order,
/// then fill the bands in parallel.
fn fill(setups: Vec<Setup>, framebuffer: &mut Framebuffer) -> RasterStats {
    let (width, height) = (framebuffer.width(), framebuffer.height());
    let mut stats = RasterStats {
        triangles: setups.len(),
        ..RasterStats::default()
    };

    let mut visible = Vec::new();
    for setup in setups {
        match setup {
            Setup::BackFacing => stats.back_facing += 1,
            Setup::Degenerate => stats.degenerate += 1,
            Setup::OffScreen => stats.off_screen += 1,
            Setup::Visible(triangle) => {
                stats.rasterized += 1;
                visible.push(triangle);
            }
            Setup::Clipped(pieces) => {
                stats.rasterized += 1;
                visible.extend(pieces);
            }
        }
    }

    let band_count = height.div_ceil(BAND_ROWS);
    let mut bins: Vec<Vec<usize>> = vec![Vec::new(); band_count];
    for (i, triangle) in visible.iter().enumerate() {
        for bin in &mut bins[triangle.y_min / BAND_ROWS..=triangle.y_max / BAND_ROWS] {
            bin.push(i);
        }
    }

    let (color, depth) = framebuffer.buffers_mut();
    let (fragments, writes) = color
        .par_chunks_mut(BAND_ROWS * width * 3)
        .zip(depth.par_chunks_mut(BAND_ROWS * width))
        .zip(bins.par_iter())
        .enumerate()
        .map(|(band, ((color, depth), bin))| {
            bin.iter().fold((0, 0), |(fragments, writes), &i| {
                let (f, w) = visible[i].fill_band(color, depth, width, band * BAND_ROWS);
                (fragments + f, writes + w)
            })
        })
        .reduce(|| (0, 0), |a, b| (a.0 + b.0, a.1 + b.1));

    stats.fragments = fragments;
    stats.writes = writes;
    stats
}
