/// Command-line front end for the rastershot renderer
///
/// Maps parsed arguments onto `RenderOptions`, renders the element database
/// and writes the resulting PNG.
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;
use rastershot_core::{
    render_source, CameraPreset, ColorMode, Discipline, DisciplineFilter, FilterSpec, FloorBand, Framebuffer,
    Rect2, RenderOptions, Resolution, SqliteStore,
};

/// Render a building element database to a PNG image
#[derive(Debug, Parser)]
#[command(name = "rastershot", version)]
pub struct Args {
    /// SQLite database holding the `elements` table
    pub database: PathBuf,

    /// Camera preset: iso, top, front, side or se
    #[arg(long, default_value = "iso")]
    pub angle: String,

    /// Zoom multiplier; values above 1 show more of the scene
    #[arg(long, default_value_t = 1.0)]
    pub distance: f64,

    /// Output size as WIDTHxHEIGHT
    #[arg(long, default_value = "1920x1080")]
    pub resolution: Resolution,

    /// Output path [default: render_<angle>_<unix-seconds>.png]
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Only render enclosure-forming classes (walls, slabs, roofs, ...)
    #[arg(long)]
    pub surface_only: bool,

    /// Comma-separated disciplines to include
    #[arg(long, value_delimiter = ',', conflicts_with = "exclude")]
    pub discipline: Vec<Discipline>,

    /// Comma-separated disciplines to exclude
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<Discipline>,

    /// Color elements by class or by discipline
    #[arg(long, default_value = "class")]
    pub color_by: String,

    /// Keep only elements whose bounds center lies within --floor-tolerance of this Z level
    #[arg(long)]
    pub floor: Option<f64>,

    /// Half-width of the floor band in meters
    #[arg(long, default_value_t = FloorBand::DEFAULT_TOLERANCE)]
    pub floor_tolerance: f64,

    /// Keep only elements overlapping minX,minY,maxX,maxY in plan
    #[arg(long, allow_hyphen_values = true)]
    pub bbox: Option<Rect2>,
}

impl Args {
    pub fn preset(&self) -> CameraPreset {
        CameraPreset::from_name_or_default(&self.angle)
    }

    pub fn render_options(&self) -> Result<RenderOptions> {
        let tags = |list: &[Discipline]| {
            list.iter()
                .filter(|d| !d.as_str().is_empty())
                .cloned()
                .collect::<Vec<_>>()
        };
        let disciplines = DisciplineFilter::from_sets(tags(&self.discipline), tags(&self.exclude))?;

        Ok(RenderOptions {
            preset: self.preset(),
            distance: self.distance,
            resolution: self.resolution,
            color_mode: ColorMode::from_name_or_default(&self.color_by),
            filter: FilterSpec {
                disciplines,
                surface_only: self.surface_only,
                floor: self.floor.map(|z| FloorBand::new(z, self.floor_tolerance)),
                bbox: self.bbox,
            },
        })
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_output_path(self.preset()))
    }
}

/// `render_<angle>_<unix-seconds>.png` in the working directory
pub fn default_output_path(preset: CameraPreset) -> PathBuf {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    PathBuf::from(format!("render_{}_{}.png", preset.name(), seconds))
}

/// Render `args.database` and write the PNG; returns the path written
pub fn run(args: &Args) -> Result<PathBuf> {
    let options = args.render_options()?;
    let store = SqliteStore::open(&args.database)
        .with_context(|| format!("Failed to open database {}", args.database.display()))?;

    let output = render_source(&store, &options)
        .with_context(|| format!("Failed to read elements from {}", args.database.display()))?;

    if !output.report.dropped.is_empty() {
        log::warn!(
            "{} element(s) skipped because their geometry could not be decoded",
            output.report.dropped.len()
        );
    }

    let path = args.output_path();
    write_png(&output.framebuffer, &path)?;
    log::info!(
        "Wrote {}x{} render to {}",
        output.framebuffer.width(),
        output.framebuffer.height(),
        path.display()
    );
    Ok(path)
}

fn write_png(framebuffer: &Framebuffer, path: &Path) -> Result<()> {
    framebuffer
        .save_png(path)
        .with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("rastershot").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["model.db"]).unwrap();
        let options = args.render_options().unwrap();
        assert_eq!(options, RenderOptions::default());
        assert!(args.output.is_none());
    }

    #[test]
    fn test_all_options() {
        let args = parse(&[
            "model.db",
            "--angle",
            "top",
            "--distance",
            "2.5",
            "--resolution",
            "640x480",
            "--output",
            "out.png",
            "--surface-only",
            "--discipline",
            "arc,str",
            "--color-by",
            "discipline",
            "--floor",
            "3.0",
            "--floor-tolerance",
            "0.5",
            "--bbox",
            "-10,-5,10,5",
        ])
        .unwrap();
        let options = args.render_options().unwrap();

        assert_eq!(options.preset, CameraPreset::Top);
        assert_eq!(options.distance, 2.5);
        assert_eq!(options.resolution, Resolution::new(640, 480));
        assert_eq!(options.color_mode, ColorMode::Discipline);
        assert!(options.filter.surface_only);
        assert_eq!(options.filter.floor, Some(FloorBand::new(3.0, 0.5)));
        assert_eq!(options.filter.bbox, Some("-10,-5,10,5".parse().unwrap()));
        assert_eq!(
            options.filter.disciplines,
            DisciplineFilter::from_sets(vec![Discipline::Arc, Discipline::Str], vec![]).unwrap()
        );
        assert_eq!(args.output_path(), PathBuf::from("out.png"));
    }

    #[test]
    fn test_unknown_names_fall_back() {
        let args = parse(&["model.db", "--angle", "nadir", "--color-by", "material"]).unwrap();
        let options = args.render_options().unwrap();
        assert_eq!(options.preset, CameraPreset::Iso);
        assert_eq!(options.color_mode, ColorMode::Class);
    }

    #[test]
    fn test_floor_help_describes_center_band() {
        let command = Args::command();
        let floor = command
            .get_arguments()
            .find(|arg| arg.get_id() == "floor")
            .unwrap();
        let help = floor.get_help().unwrap().to_string();
        assert!(help.contains("bounds center"), "{help}");
        assert!(help.contains("--floor-tolerance"), "{help}");
    }

    #[test]
    fn test_include_and_exclude_conflict() {
        let err = parse(&["model.db", "--discipline", "ARC", "--exclude", "FP"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_malformed_values_rejected() {
        let err = parse(&["model.db", "--resolution", "1920by1080"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);

        let err = parse(&["model.db", "--bbox", "0,0,1"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);

        let err = parse(&["model.db", "--bbox", "5,0,1,1"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_empty_discipline_tags_ignored() {
        let args = parse(&["model.db", "--exclude", "fp,,"]).unwrap();
        let options = args.render_options().unwrap();
        assert_eq!(
            options.filter.disciplines,
            DisciplineFilter::from_sets(vec![], vec![Discipline::Fp]).unwrap()
        );
    }

    #[test]
    fn test_default_output_name() {
        let path = default_output_path(CameraPreset::Se);
        let name = path.to_str().unwrap();
        assert!(name.starts_with("render_se_"));
        assert!(name.ends_with(".png"));
        assert!(name["render_se_".len()..name.len() - 4].parse::<u64>().is_ok());
    }

    #[test]
    fn test_missing_database_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = parse(&[
            dir.path().join("absent.db").to_str().unwrap(),
            "--output",
            dir.path().join("out.png").to_str().unwrap(),
        ])
        .unwrap();
        assert!(run(&args).is_err());
        assert!(!dir.path().join("out.png").exists());
    }
}
