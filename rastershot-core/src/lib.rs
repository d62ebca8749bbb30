/// rastershot core library - software rendering of tagged building geometry
///
/// This library turns element records (discipline, class and a geometry blob)
/// into a filtered scene and rasterizes it through an orthographic camera into
/// an RGB framebuffer, without any GPU or windowing system.

pub mod camera;
pub mod color;
pub mod decode;
pub mod error;
pub mod framebuffer;
pub mod geometry;
pub mod raster;
pub mod render;
pub mod scene;
pub mod store;
pub mod transform;

// Re-export commonly used types
pub use camera::{Camera, CameraPreset, Resolution};
pub use color::{ColorMode, Rgb};
pub use decode::{decode_geometry, GeometryBlob};
pub use error::{DecodeError, FilterError, OptionParseError, StoreError};
pub use framebuffer::Framebuffer;
pub use geometry::{Aabb, Discipline, Element, Rect2, Triangle, Vertex};
pub use raster::{RasterStats, Rasterizer, TriangleBatch};
pub use render::{render_scene, render_source, RenderOptions, RenderOutput};
pub use scene::{build_scene, DisciplineFilter, FilterSpec, FloorBand, Scene, SceneReport};
pub use store::{ElementRecord, ElementSource, SqliteStore};
pub use transform::ScreenTransform;
