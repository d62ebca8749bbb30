/// Scene assembly: load element records, decode them and apply the render filters
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::decode::decode_geometry;
use crate::error::{DecodeError, FilterError, StoreError};
use crate::geometry::{Aabb, Discipline, Element, Rect2};
use crate::store::{ElementRecord, ElementSource};

/// Enclosure-forming classes kept by the surface-only filter
const SURFACE_CLASSES: &[&str] = &[
    "wall",
    "exterior_wall",
    "interior_wall",
    "curtain_wall",
    "slab",
    "floor",
    "floor_slab",
    "roof",
    "roof_slab",
    "ceiling",
    "window",
    "door",
    "skylight",
    "facade",
    "parapet",
];

static SURFACE_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| SURFACE_CLASSES.iter().copied().collect());

pub fn is_surface_class(class: &str) -> bool {
    SURFACE_SET.contains(class.trim().to_ascii_lowercase().as_str())
}

/// Which disciplines take part in a render
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DisciplineFilter {
    #[default]
    All,
    Include(HashSet<Discipline>),
    Exclude(HashSet<Discipline>),
}

impl DisciplineFilter {
    /// Empty sets count as unset. Supplying both sets is an error.
    pub fn from_sets(
        include: impl IntoIterator<Item = Discipline>,
        exclude: impl IntoIterator<Item = Discipline>,
    ) -> Result<Self, FilterError> {
        let include: HashSet<_> = include.into_iter().collect();
        let exclude: HashSet<_> = exclude.into_iter().collect();

        match (include.is_empty(), exclude.is_empty()) {
            (true, true) => Ok(DisciplineFilter::All),
            (false, true) => Ok(DisciplineFilter::Include(include)),
            (true, false) => Ok(DisciplineFilter::Exclude(exclude)),
            (false, false) => Err(FilterError::ConflictingDisciplineSets),
        }
    }

    pub fn accepts(&self, discipline: &Discipline) -> bool {
        match self {
            DisciplineFilter::All => true,
            DisciplineFilter::Include(set) => set.contains(discipline),
            DisciplineFilter::Exclude(set) => !set.contains(discipline),
        }
    }
}

/// Keep elements whose bounds center lies within `tolerance` of `z`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloorBand {
    pub z: f64,
    pub tolerance: f64,
}

impl FloorBand {
    pub const DEFAULT_TOLERANCE: f64 = 2.0;

    pub fn new(z: f64, tolerance: f64) -> Self {
        Self {
            z,
            tolerance: tolerance.abs(),
        }
    }

    pub fn contains(&self, z: f64) -> bool {
        (z - self.z).abs() <= self.tolerance
    }
}

/// Every predicate an element must satisfy to be rendered
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub disciplines: DisciplineFilter,
    pub surface_only: bool,
    pub floor: Option<FloorBand>,
    pub bbox: Option<Rect2>,
}

impl FilterSpec {
    /// Predicates answerable without decoding geometry
    pub fn accepts_metadata(&self, discipline: &Discipline, class: &str) -> bool {
        self.disciplines.accepts(discipline) && (!self.surface_only || is_surface_class(class))
    }

    /// Predicates on the decoded bounds
    pub fn accepts_bounds(&self, bounds: &Aabb) -> bool {
        let in_band = self.floor.map_or(true, |band| band.contains(bounds.center().z));
        let in_rect = self.bbox.map_or(true, |rect| bounds.intersects_xy(&rect));
        in_band && in_rect
    }

    pub fn accepts(&self, element: &Element) -> bool {
        self.accepts_metadata(&element.discipline, &element.class) && self.accepts_bounds(element.bounds())
    }
}

/// The filtered elements of one render
#[derive(Debug, Clone, Default)]
pub struct Scene {
    elements: Vec<Element>,
    bounds: Option<Aabb>,
}

impl Scene {
    pub fn new(elements: Vec<Element>) -> Self {
        let bounds = elements
            .iter()
            .map(|element| *element.bounds())
            .reduce(|acc, b| acc.union(&b));

        Self { elements, bounds }
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Aggregate bounds, `None` for an empty scene
    pub fn bounds(&self) -> Option<&Aabb> {
        self.bounds.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.elements.iter().map(|e| e.triangles().len()).sum()
    }
}

/// What happened to each loaded record while building a scene
#[derive(Debug, Default)]
pub struct SceneReport {
    pub loaded: usize,
    pub filtered_out: usize,
    pub kept: usize,
    /// Elements whose geometry failed to decode
    pub dropped: Vec<(String, DecodeError)>,
}

/// Decode and filter records into a scene.
///
/// Metadata predicates run before decoding, so excluded elements are never
/// decoded. Decode failures drop the element and are recorded in the report.
pub fn build_from_records(
    records: impl IntoIterator<Item = ElementRecord>,
    filter: &FilterSpec,
) -> (Scene, SceneReport) {
    let mut report = SceneReport::default();
    let mut elements = Vec::new();

    for record in records {
        report.loaded += 1;

        if !filter.accepts_metadata(&record.discipline, &record.class) {
            report.filtered_out += 1;
            continue;
        }

        let element = decode_geometry(&record.geometry).and_then(|triangles| {
            Element::new(record.id.clone(), record.discipline, record.class, triangles)
                .ok_or(DecodeError::Empty)
        });
        let element = match element {
            Ok(element) => element,
            Err(err) => {
                log::warn!("Dropping element {}: {}", record.id, err);
                report.dropped.push((record.id, err));
                continue;
            }
        };

        if filter.accepts_bounds(element.bounds()) {
            elements.push(element);
        } else {
            report.filtered_out += 1;
        }
    }

    report.kept = elements.len();
    (Scene::new(elements), report)
}

/// Load every record from `source`, then decode and filter it
pub fn build_scene<S>(source: &S, filter: &FilterSpec) -> Result<(Scene, SceneReport), StoreError>
where
    S: ElementSource + ?Sized,
{
    let records = source.load_elements()?;
    let (scene, report) = build_from_records(records, filter);

    log::info!(
        "Scene: {} loaded, {} kept, {} filtered out, {} dropped ({} triangles)",
        report.loaded,
        report.kept,
        report.filtered_out,
        report.dropped.len(),
        scene.triangle_count()
    );
    Ok((scene, report))
}
