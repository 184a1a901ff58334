#![forbid(unsafe_code)]

//! Geometry domains and the model sections that feed them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Point-domain sections, in lookup order.
pub const POINT_SECTIONS: &[&str] = &["JUNCTIONS", "OUTFALLS", "DIVIDERS", "STORAGE"];
/// Line-domain sections, in lookup order.
pub const LINE_SECTIONS: &[&str] = &["CONDUITS", "PUMPS", "ORIFICES", "WEIRS", "OUTLETS"];
/// Area-domain sections.
pub const AREA_SECTIONS: &[&str] = &["SUBCATCHMENTS"];

/// Geometry domain of a feature.
///
/// The declaration order is also the draw order: areas at the bottom,
/// points on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Area,
    Line,
    Point,
}

impl Domain {
    /// All domains in draw order.
    pub const ALL: [Domain; 3] = [Domain::Area, Domain::Line, Domain::Point];

    /// Domain of a model section, or `None` for non-geometric sections.
    pub fn of_section(section: &str) -> Option<Domain> {
        if POINT_SECTIONS.contains(&section) {
            Some(Domain::Point)
        } else if LINE_SECTIONS.contains(&section) {
            Some(Domain::Line)
        } else if AREA_SECTIONS.contains(&section) {
            Some(Domain::Area)
        } else {
            None
        }
    }

    /// Sections belonging to this domain.
    pub const fn sections(self) -> &'static [&'static str] {
        match self {
            Domain::Point => POINT_SECTIONS,
            Domain::Line => LINE_SECTIONS,
            Domain::Area => AREA_SECTIONS,
        }
    }

    /// Dense index for per-domain arrays.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Domain::Point => "point",
            Domain::Line => "line",
            Domain::Area => "area",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_lookup() {
        assert_eq!(Domain::of_section("STORAGE"), Some(Domain::Point));
        assert_eq!(Domain::of_section("WEIRS"), Some(Domain::Line));
        assert_eq!(Domain::of_section("SUBCATCHMENTS"), Some(Domain::Area));
        assert_eq!(Domain::of_section("OPTIONS"), None);
        assert_eq!(Domain::of_section("junctions"), None);
    }

    #[test]
    fn draw_order_is_areas_lines_points() {
        let mut all = Domain::ALL;
        all.sort();
        assert_eq!(all, [Domain::Area, Domain::Line, Domain::Point]);
        for (i, d) in Domain::ALL.iter().enumerate() {
            assert_eq!(d.index(), i);
        }
    }

    #[test]
    fn every_section_maps_back() {
        for d in Domain::ALL {
            for s in d.sections() {
                assert_eq!(Domain::of_section(s), Some(d));
            }
        }
    }
}
