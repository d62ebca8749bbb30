use nalgebra::{Point3, Vector3};
use rastershot_core::color::{class_color, BACKGROUND_COLOR};
use rastershot_core::geometry::cuboid;
use rastershot_core::raster::shade;
use rastershot_core::{
    render_scene, render_source, Camera, CameraPreset, ColorMode, Discipline, DisciplineFilter, Element,
    ElementRecord, FilterSpec, FloorBand, Framebuffer, Rasterizer, RenderOptions, Resolution, Scene, Triangle,
};

fn cube(id: &str, discipline: Discipline, class: &str, center: [f64; 3], size: f64) -> Element {
    let half = size / 2.0;
    let c = Point3::from(center);
    Element::new(
        id,
        discipline,
        class,
        cuboid(c - Vector3::repeat(half), c + Vector3::repeat(half)),
    )
    .unwrap()
}

fn raw_blob(triangles: &[Triangle]) -> Vec<u8> {
    triangles
        .iter()
        .flat_map(|t| t.vertices.iter())
        .flat_map(|v| [v.x as f32, v.y as f32, v.z as f32])
        .flat_map(f32::to_le_bytes)
        .collect()
}

fn cube_record(id: &str, discipline: Discipline, class: &str, center: [f64; 3]) -> ElementRecord {
    let element = cube(id, discipline.clone(), class, center, 1.0);
    ElementRecord::new(id, discipline, class, raw_blob(element.triangles()))
}

fn drawn_pixels(fb: &Framebuffer) -> Vec<(usize, usize)> {
    (0..fb.height())
        .flat_map(|y| (0..fb.width()).map(move |x| (x, y)))
        .filter(|&(x, y)| fb.pixel(x, y) != BACKGROUND_COLOR)
        .collect()
}

#[test]
fn scenario_a_unit_cube_from_top() {
    let scene = Scene::new(vec![cube("cube", Discipline::Arc, "box", [0.0; 3], 1.0)]);
    let camera = Camera::new(CameraPreset::Top, 1.0, Resolution::new(100, 100));
    let (fb, stats) = render_scene(&scene, &camera, ColorMode::Class);

    assert_eq!(stats.triangles, 12);
    assert_eq!(stats.rasterized, 2, "only the two top-face triangles face the camera");

    // The 5% framing margin leaves the square spanning pixels 2..=97 on both axes.
    let drawn = drawn_pixels(&fb);
    assert_eq!(drawn.len(), 96 * 96);
    assert!(drawn.iter().all(|&(x, y)| (2..=97).contains(&x) && (2..=97).contains(&y)));

    let top_color = fb.pixel(50, 50);
    assert!(drawn.iter().all(|&(x, y)| fb.pixel(x, y) == top_color));
}

#[test]
fn extreme_zoom_fills_the_image_with_the_facing_side() {
    let scene = Scene::new(vec![cube("cube", Discipline::Arc, "box", [0.0; 3], 1.0)]);

    for distance in [1e-4, 1e-5, 1e-8] {
        let camera = Camera::new(CameraPreset::Top, distance, Resolution::new(100, 100));
        let (fb, stats) = render_scene(&scene, &camera, ColorMode::Class);

        assert_eq!(stats.rasterized, 2, "distance {distance}");
        assert_eq!(stats.off_screen, 0, "distance {distance}");
        assert_eq!(stats.fragments, 100 * 100, "distance {distance}");

        let top_color = fb.pixel(50, 50);
        assert_ne!(top_color, BACKGROUND_COLOR);
        assert_eq!(drawn_pixels(&fb).len(), 100 * 100);
        assert!(drawn_pixels(&fb).iter().all(|&(x, y)| fb.pixel(x, y) == top_color));
    }
}

#[test]
fn scenario_b_nearer_cube_hides_the_farther_one() {
    let near = cube("near", Discipline::Arc, "wall", [0.0, 0.0, 0.0], 1.0);
    let far = cube("far", Discipline::Arc, "door", [0.0, 3.0, 0.0], 1.0);
    let camera = Camera::new(CameraPreset::Front, 1.0, Resolution::new(80, 60));
    let light = camera.light_direction();
    let facing = -Vector3::y();

    for elements in [vec![near.clone(), far.clone()], vec![far.clone(), near.clone()]] {
        let scene = Scene::new(elements);
        let (fb, _) = render_scene(&scene, &camera, ColorMode::Class);

        let near_color = shade(class_color("wall"), &facing, light.as_ref());
        let far_color = shade(class_color("door"), &facing, light.as_ref());
        let drawn = drawn_pixels(&fb);
        assert!(!drawn.is_empty());
        assert!(drawn.iter().all(|&(x, y)| fb.pixel(x, y) == near_color));
        assert!(drawn.iter().all(|&(x, y)| fb.pixel(x, y) != far_color));

        let rasterizer = Rasterizer::new(&camera, scene.bounds().unwrap());
        let front_face = rasterizer.transform().project_point(&Point3::new(0.0, -0.5, 0.0));
        let (cx, cy) = (front_face.x as usize, front_face.y as usize);
        assert_eq!(fb.pixel(cx, cy), near_color);
        assert!((fb.depth(cx, cy) as f64 - front_face.z).abs() < 1e-6);
    }
}

#[test]
fn scenario_c_discipline_filter_matches_rendering_alone() {
    let arc = cube_record("arc", Discipline::Arc, "wall", [0.0, 0.0, 0.0]);
    let fp = cube_record("fp", Discipline::Fp, "pipe", [0.3, -1.0, 0.2]);
    let base = RenderOptions {
        resolution: Resolution::new(64, 48),
        ..RenderOptions::default()
    };

    let filtered = RenderOptions {
        filter: FilterSpec {
            disciplines: DisciplineFilter::from_sets(vec![Discipline::Arc], vec![]).unwrap(),
            ..FilterSpec::default()
        },
        ..base.clone()
    };
    let with_filter = render_source(&vec![arc.clone(), fp], &filtered).unwrap();
    let alone = render_source(&vec![arc], &base).unwrap();

    let a = &with_filter.framebuffer;
    let b = &alone.framebuffer;
    assert_eq!(a.encode_png().unwrap(), b.encode_png().unwrap());
    for y in 0..a.height() {
        for x in 0..a.width() {
            assert_eq!(a.depth(x, y).to_bits(), b.depth(x, y).to_bits());
        }
    }
    assert_eq!(with_filter.report.filtered_out, 1);
}

#[test]
fn scenario_d_floor_band() {
    let records = vec![
        cube_record("ground", Discipline::Arc, "slab", [0.0, 0.0, 0.5]),
        cube_record("upper", Discipline::Arc, "slab", [0.0, 0.0, 5.0]),
    ];
    let options = RenderOptions {
        resolution: Resolution::new(32, 32),
        filter: FilterSpec {
            floor: Some(FloorBand::new(0.0, 1.0)),
            ..FilterSpec::default()
        },
        ..RenderOptions::default()
    };

    let output = render_source(&records, &options).unwrap();
    assert_eq!(output.report.kept, 1);
    assert_eq!(output.report.filtered_out, 1);
    assert_eq!(output.stats.triangles, 12);
    assert!(!output.framebuffer.is_blank());
}

#[test]
fn triangle_order_does_not_change_the_image() {
    let a = cube("a", Discipline::Str, "column", [0.0, 0.0, 0.0], 2.0);
    let b = cube("b", Discipline::Arc, "wall", [0.7, 0.4, 0.9], 1.5);
    let camera = Camera::new(CameraPreset::Iso, 1.0, Resolution::new(120, 90));

    let (first, _) = render_scene(&Scene::new(vec![a.clone(), b.clone()]), &camera, ColorMode::Class);
    let (second, _) = render_scene(&Scene::new(vec![b, a]), &camera, ColorMode::Class);
    assert_eq!(first.encode_png().unwrap(), second.encode_png().unwrap());
}

#[test]
fn back_facing_triangle_contributes_nothing() {
    let p = Point3::new;
    // Wound clockwise seen from above, so it faces -Z, away from the top camera.
    let down = Triangle::new(p(0.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(1.0, 0.0, 0.0));
    let up = Triangle::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0));
    let camera = Camera::new(CameraPreset::Top, 1.0, Resolution::new(40, 40));

    let facing_away = Element::new("down", Discipline::Arc, "slab", vec![down]).unwrap();
    let (fb, stats) = render_scene(&Scene::new(vec![facing_away]), &camera, ColorMode::Class);
    assert_eq!(stats.back_facing, 1);
    assert!(fb.is_blank());

    let facing_camera = Element::new("up", Discipline::Arc, "slab", vec![up]).unwrap();
    let (fb, stats) = render_scene(&Scene::new(vec![facing_camera]), &camera, ColorMode::Class);
    assert_eq!(stats.rasterized, 1);
    assert!(!fb.is_blank());
}

#[test]
fn rendering_is_deterministic() {
    let records: Vec<_> = (0..20)
        .map(|i| {
            let f = i as f64;
            cube_record(
                &format!("e{i:02}"),
                if i % 2 == 0 { Discipline::Arc } else { Discipline::Acmv },
                if i % 3 == 0 { "wall" } else { "duct" },
                [f * 0.6, (f * 1.7) % 4.0, (f * 0.9) % 3.0],
            )
        })
        .collect();
    let options = RenderOptions {
        resolution: Resolution::new(160, 120),
        color_mode: ColorMode::Discipline,
        ..RenderOptions::default()
    };

    let first = render_source(&records, &options).unwrap();
    let second = render_source(&records, &options).unwrap();
    assert_eq!(
        first.framebuffer.encode_png().unwrap(),
        second.framebuffer.encode_png().unwrap()
    );
    assert_eq!(first.stats, second.stats);
}

#[test]
fn unmatched_discipline_filter_gives_blank_image() {
    let records = vec![cube_record("arc", Discipline::Arc, "wall", [0.0; 3])];
    let options = RenderOptions {
        resolution: Resolution::new(50, 20),
        filter: FilterSpec {
            disciplines: DisciplineFilter::from_sets(vec![Discipline::Lpg], vec![]).unwrap(),
            ..FilterSpec::default()
        },
        ..RenderOptions::default()
    };

    let output = render_source(&records, &options).unwrap();
    assert!(output.framebuffer.is_blank());
    let png = output.framebuffer.encode_png().unwrap();
    let image = image::load_from_memory(&png).unwrap().to_rgb8();
    assert_eq!(image.dimensions(), (50, 20));
    assert!(image.pixels().all(|p| p.0 == BACKGROUND_COLOR));
}
