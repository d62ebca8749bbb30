/// Example: decode a single geometry blob and render it to PNG
///
/// Usage: cargo run --example render_blob -- [blob-file] [output.png]
///
/// The blob may be either geometry encoding the database stores. Without a
/// blob file a unit cube is rendered from every camera preset.
use std::env;
use std::fs;

use anyhow::{Context, Result};
use env_logger::{Builder, Env};
use rastershot_core::geometry::cuboid;
use rastershot_core::{
    decode_geometry, render_scene, Camera, CameraPreset, ColorMode, Discipline, Element, Resolution, Scene,
    Vertex,
};

fn main() -> Result<()> {
    Builder::from_env(Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let resolution = Resolution::new(800, 600);

    let Some(blob_path) = args.get(1) else {
        println!("No blob file provided, rendering the default cube...");
        let cube = cuboid(Vertex::new(-1.0, -1.0, -1.0), Vertex::new(1.0, 1.0, 1.0));
        let element = Element::new("cube", Discipline::Arc, "wall", cube).context("cube has no triangles")?;
        let scene = Scene::new(vec![element]);

        for preset in CameraPreset::ALL {
            let (framebuffer, _) = render_scene(&scene, &Camera::new(preset, 1.0, resolution), ColorMode::Class);
            let path = format!("cube_{}.png", preset.name());
            framebuffer.save_png(&path)?;
            println!("Wrote {}", path);
        }
        return Ok(());
    };

    println!("Loading geometry blob: {}", blob_path);
    let data = fs::read(blob_path).with_context(|| format!("Failed to read {}", blob_path))?;
    let triangles = decode_geometry(&data).with_context(|| format!("Failed to decode {}", blob_path))?;
    println!("Decoded {} triangles", triangles.len());

    let element = Element::new(blob_path.as_str(), Discipline::Other(String::new()), "", triangles)
        .context("blob has no triangles")?;
    let scene = Scene::new(vec![element]);
    let (framebuffer, stats) = render_scene(&scene, &Camera::new(CameraPreset::Iso, 1.0, resolution), ColorMode::Class);

    let output = args.get(2).map(String::as_str).unwrap_or("blob.png");
    framebuffer.save_png(output)?;
    println!("Rasterized {} of {} triangles into {}", stats.rasterized, stats.triangles, output);
    Ok(())
}
