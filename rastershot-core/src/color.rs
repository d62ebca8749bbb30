/// Base color assignment by element class or discipline
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use crate::geometry::{Discipline, Element};

/// An 8-bit RGB triple
pub type Rgb = [u8; 3];

pub const DEFAULT_COLOR: Rgb = [160, 160, 160];

/// Image background where nothing was drawn
pub const BACKGROUND_COLOR: Rgb = [255, 255, 255];

const CLASS_COLORS: &[(&str, Rgb)] = &[
    ("wall", [214, 205, 190]),
    ("exterior_wall", [200, 188, 170]),
    ("interior_wall", [228, 222, 212]),
    ("curtain_wall", [120, 170, 210]),
    ("slab", [180, 180, 180]),
    ("floor", [190, 185, 175]),
    ("floor_slab", [180, 180, 180]),
    ("roof", [170, 80, 60]),
    ("roof_slab", [175, 90, 70]),
    ("ceiling", [236, 236, 236]),
    ("window", [140, 190, 230]),
    ("skylight", [150, 200, 235]),
    ("door", [150, 100, 60]),
    ("column", [120, 120, 135]),
    ("beam", [105, 120, 145]),
    ("foundation", [130, 125, 115]),
    ("stair", [200, 170, 120]),
    ("railing", [90, 90, 90]),
    ("parapet", [195, 180, 160]),
    ("facade", [205, 195, 180]),
    ("pipe", [220, 60, 60]),
    ("sprinkler", [235, 40, 40]),
    ("duct", [80, 170, 170]),
    ("cable_tray", [230, 200, 60]),
    ("conduit", [240, 215, 90]),
    ("rebar", [140, 90, 50]),
    ("gas_pipe", [150, 80, 180]),
    ("furniture", [170, 140, 110]),
];

static CLASS_TABLE: LazyLock<HashMap<&'static str, Rgb>> =
    LazyLock::new(|| CLASS_COLORS.iter().copied().collect());

/// Which element attribute drives the base color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    #[default]
    Class,
    Discipline,
}

impl ColorMode {
    pub fn name(&self) -> &'static str {
        match self {
            ColorMode::Class => "class",
            ColorMode::Discipline => "discipline",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [ColorMode::Class, ColorMode::Discipline]
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(name.trim()))
    }

    pub fn from_name_or_default(name: &str) -> Self {
        Self::from_name(name).unwrap_or_else(|| {
            let fallback = Self::default();
            log::warn!("Unknown color mode '{}', using '{}'", name, fallback.name());
            fallback
        })
    }

    pub fn base_color(&self, element: &Element) -> Rgb {
        match self {
            ColorMode::Class => class_color(&element.class),
            ColorMode::Discipline => discipline_color(&element.discipline),
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn discipline_color(discipline: &Discipline) -> Rgb {
    match discipline {
        Discipline::Arc => [200, 200, 200],
        Discipline::Str => [70, 110, 200],
        Discipline::Fp => [220, 50, 50],
        Discipline::Sp => [240, 128, 128],
        Discipline::Elec => [240, 210, 60],
        Discipline::Acmv => [0, 150, 150],
        Discipline::Reb => [140, 90, 50],
        Discipline::Cw => [150, 200, 240],
        Discipline::Lpg => [150, 80, 180],
        Discipline::Other(_) => DEFAULT_COLOR,
    }
}

/// Case-insensitive class lookup
pub fn class_color(class: &str) -> Rgb {
    CLASS_TABLE
        .get(class.trim().to_ascii_lowercase().as_str())
        .copied()
        .unwrap_or(DEFAULT_COLOR)
}
