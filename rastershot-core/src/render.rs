/// End-to-end render: element source to finished framebuffer
use std::time::Instant;

use crate::camera::{Camera, CameraPreset, Resolution};
use crate::color::ColorMode;
use crate::error::StoreError;
use crate::framebuffer::Framebuffer;
use crate::raster::{RasterStats, Rasterizer, TriangleBatch};
use crate::scene::{build_scene, FilterSpec, Scene, SceneReport};
use crate::store::ElementSource;

/// Everything that parameterizes one render
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub preset: CameraPreset,
    pub distance: f64,
    pub resolution: Resolution,
    pub color_mode: ColorMode,
    pub filter: FilterSpec,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            preset: CameraPreset::default(),
            distance: 1.0,
            resolution: Resolution::default(),
            color_mode: ColorMode::default(),
            filter: FilterSpec::default(),
        }
    }
}

impl RenderOptions {
    pub fn camera(&self) -> Camera {
        Camera::new(self.preset, self.distance, self.resolution)
    }
}

pub struct RenderOutput {
    pub framebuffer: Framebuffer,
    pub stats: RasterStats,
    pub report: SceneReport,
}

/// Rasterize an already-built scene. An empty scene yields a blank framebuffer.
pub fn render_scene(scene: &Scene, camera: &Camera, color_mode: ColorMode) -> (Framebuffer, RasterStats) {
    let mut framebuffer = Framebuffer::new(camera.resolution);

    let Some(bounds) = scene.bounds() else {
        log::info!("Scene is empty, producing a blank {} image", camera.resolution);
        return (framebuffer, RasterStats::default());
    };

    let start = Instant::now();
    let batch = TriangleBatch::from_scene(scene, color_mode);
    let stats = Rasterizer::new(camera, bounds).draw(&batch, &mut framebuffer);

    log::info!(
        "Rasterized {}/{} triangles ({} back-facing, {} degenerate, {} off-screen), {} pixel writes in {:.2?}",
        stats.rasterized,
        stats.triangles,
        stats.back_facing,
        stats.degenerate,
        stats.off_screen,
        stats.writes,
        start.elapsed()
    );
    (framebuffer, stats)
}

/// Load, filter and rasterize everything `source` holds
pub fn render_source<S>(source: &S, options: &RenderOptions) -> Result<RenderOutput, StoreError>
where
    S: ElementSource + ?Sized,
{
    let (scene, report) = build_scene(source, &options.filter)?;
    let camera = options.camera();
    log::debug!(
        "Camera '{}' at distance {} for {}",
        camera.preset,
        camera.distance,
        camera.resolution
    );

    let (framebuffer, stats) = render_scene(&scene, &camera, options.color_mode);
    Ok(RenderOutput {
        framebuffer,
        stats,
        report,
    })
}
