#![forbid(unsafe_code)]

//! Model → display coordinate projection.
//!
//! Model coordinates are state-plane eastings/northings in feet. The catalog
//! holds the Lambert Conformal Conic (2SP) zones the model files use, all on
//! the GRS 1980 ellipsoid. The inverse follows the closed-form series in
//! Snyder's *Map Projections: A Working Manual* (1987), eq. 14-15 ff.
//!
//! A [`Projector`] never fails: an unknown name, a degenerate definition or a
//! non-finite result all fall back to the identity transform
//! (`lat = y`, `lon = x`).

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use netdiff_core::geometry::{LatLon, ModelPoint};
use tracing::warn;

/// GRS 1980 semi-major axis (m).
const GRS80_A: f64 = 6_378_137.0;
/// GRS 1980 inverse flattening.
const GRS80_INV_F: f64 = 298.257_222_101;
/// US survey foot in metres.
const US_SURVEY_FOOT: f64 = 0.304_800_609_601_219_2;
/// International foot in metres.
const INTERNATIONAL_FOOT: f64 = 0.3048;

/// Name of the pass-through definition.
pub const IDENTITY: &str = "identity";
/// Definition used when nothing else is configured.
pub const DEFAULT_PROJECTION: &str = "EPSG:3735";

const MAX_LAT_ITERATIONS: usize = 15;
const LAT_TOLERANCE: f64 = 1e-12;

/// Lambert Conformal Conic (two standard parallels) parameters.
///
/// Angles are in degrees; false easting/northing are in the linear unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LambertConic {
    pub standard_parallel_1: f64,
    pub standard_parallel_2: f64,
    pub latitude_of_origin: f64,
    pub central_meridian: f64,
    pub false_easting: f64,
    pub false_northing: f64,
    /// Metres per linear unit.
    pub unit: f64,
}

/// A named entry of the projection catalog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionDef {
    pub name: &'static str,
    pub description: &'static str,
    /// `None` is the identity transform.
    pub conic: Option<LambertConic>,
}

/// The fixed catalog of selectable definitions.
pub const CATALOG: &[ProjectionDef] = &[
    ProjectionDef {
        name: "EPSG:3735",
        description: "NAD83 / Ohio South (ftUS)",
        conic: Some(LambertConic {
            standard_parallel_1: 40.033_333_333_333_33,
            standard_parallel_2: 38.733_333_333_333_33,
            latitude_of_origin: 38.0,
            central_meridian: -82.5,
            false_easting: 1_968_500.000_000_001,
            false_northing: 0.0,
            unit: US_SURVEY_FOOT,
        }),
    },
    ProjectionDef {
        name: "EPSG:3733",
        description: "NAD83 / Ohio North (ftUS)",
        conic: Some(LambertConic {
            standard_parallel_1: 41.7,
            standard_parallel_2: 40.433_333_333_333_33,
            latitude_of_origin: 39.666_666_666_666_66,
            central_meridian: -82.5,
            false_easting: 1_968_500.000_000_001,
            false_northing: 0.0,
            unit: US_SURVEY_FOOT,
        }),
    },
    ProjectionDef {
        name: "EPSG:6499",
        description: "NAD83(2011) / Michigan South (ft)",
        conic: Some(LambertConic {
            standard_parallel_1: 43.666_666_666_666_66,
            standard_parallel_2: 42.1,
            latitude_of_origin: 41.5,
            central_meridian: -84.366_666_666_666_66,
            false_easting: 13_123_359.580_052_49,
            false_northing: 0.0,
            unit: INTERNATIONAL_FOOT,
        }),
    },
    ProjectionDef {
        name: "EPSG:2272",
        description: "NAD83 / Pennsylvania South (ftUS)",
        conic: Some(LambertConic {
            standard_parallel_1: 40.966_666_666_666_67,
            standard_parallel_2: 39.933_333_333_333_33,
            latitude_of_origin: 39.333_333_333_333_34,
            central_meridian: -77.75,
            false_easting: 1_968_500.000_000_001,
            false_northing: 0.0,
            unit: US_SURVEY_FOOT,
        }),
    },
    ProjectionDef {
        name: IDENTITY,
        description: "raw model coordinates",
        conic: None,
    },
];

/// Look up a catalog entry by name (case-insensitive).
pub fn lookup(name: &str) -> Option<&'static ProjectionDef> {
    let name = name.trim();
    CATALOG.iter().find(|def| def.name.eq_ignore_ascii_case(name))
}

/// Precomputed inverse constants for one conic zone.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ConicInverse {
    e: f64,
    n: f64,
    a_f: f64,
    rho0: f64,
    lon0: f64,
    false_easting: f64,
    false_northing: f64,
    unit: f64,
}

impl ConicInverse {
    fn new(p: &LambertConic) -> Option<Self> {
        let finite = [
            p.standard_parallel_1,
            p.standard_parallel_2,
            p.latitude_of_origin,
            p.central_meridian,
            p.false_easting,
            p.false_northing,
            p.unit,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite || p.unit <= 0.0 {
            return None;
        }
        // Parallels symmetric about the equator give n = 0.
        if (p.standard_parallel_1 + p.standard_parallel_2).abs() < 1e-10 {
            return None;
        }

        let f = 1.0 / GRS80_INV_F;
        let e = (2.0 * f - f * f).sqrt();
        let phi1 = p.standard_parallel_1.to_radians();
        let phi2 = p.standard_parallel_2.to_radians();
        let phi0 = p.latitude_of_origin.to_radians();

        let m1 = msfn(e, phi1);
        let m2 = msfn(e, phi2);
        let t1 = tsfn(e, phi1);
        let t2 = tsfn(e, phi2);
        let t0 = tsfn(e, phi0);

        let n = if (phi1 - phi2).abs() > 1e-10 {
            (m1.ln() - m2.ln()) / (t1.ln() - t2.ln())
        } else {
            phi1.sin()
        };
        let big_f = m1 / (n * t1.powf(n));
        let a_f = GRS80_A * big_f;
        let rho0 = a_f * t0.powf(n);

        let inverse = Self {
            e,
            n,
            a_f,
            rho0,
            lon0: p.central_meridian.to_radians(),
            false_easting: p.false_easting,
            false_northing: p.false_northing,
            unit: p.unit,
        };
        [n, a_f, rho0]
            .iter()
            .all(|v| v.is_finite() && *v != 0.0)
            .then_some(inverse)
    }

    fn inverse(&self, pt: ModelPoint) -> Option<LatLon> {
        let x = (pt.x - self.false_easting) * self.unit;
        let y = (pt.y - self.false_northing) * self.unit;
        let sign = self.n.signum();
        let dy = self.rho0 - y;
        let rho = sign * x.hypot(dy);
        let theta = (sign * x).atan2(sign * dy);

        let lat = if rho == 0.0 {
            sign * FRAC_PI_2
        } else {
            let t = (rho / self.a_f).powf(1.0 / self.n);
            phi_from_t(self.e, t)?
        };
        let lon = theta / self.n + self.lon0;

        let out = LatLon::new(lat.to_degrees(), lon.to_degrees());
        (out.is_finite() && out.lat.abs() <= 90.0).then_some(out)
    }
}

/// Snyder eq. 14-15.
fn msfn(e: f64, phi: f64) -> f64 {
    let s = phi.sin();
    phi.cos() / (1.0 - e * e * s * s).sqrt()
}

/// Snyder eq. 15-9a.
fn tsfn(e: f64, phi: f64) -> f64 {
    let es = e * phi.sin();
    (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
}

/// Snyder eq. 7-9, iterated to convergence.
fn phi_from_t(e: f64, t: f64) -> Option<f64> {
    if !t.is_finite() || t < 0.0 {
        return None;
    }
    let mut phi = FRAC_PI_2 - 2.0 * t.atan();
    for _ in 0..MAX_LAT_ITERATIONS {
        let es = e * phi.sin();
        let next = FRAC_PI_2 - 2.0 * (t * ((1.0 - es) / (1.0 + es)).powf(e / 2.0)).atan();
        if (next - phi).abs() < LAT_TOLERANCE {
            return Some(next);
        }
        phi = next;
    }
    Some(phi)
}

/// The active model → display transform.
///
/// Pure and deterministic for a given definition; swapping definitions means
/// building a new projector, which invalidates every coordinate computed with
/// the old one.
#[derive(Debug, Clone, PartialEq)]
pub struct Projector {
    name: String,
    inverse: Option<ConicInverse>,
}

impl Default for Projector {
    fn default() -> Self {
        Self::by_name(DEFAULT_PROJECTION)
    }
}

impl Projector {
    /// Pass-through projector.
    pub fn identity() -> Self {
        Self {
            name: IDENTITY.to_string(),
            inverse: None,
        }
    }

    /// Projector for a catalog entry; unknown names resolve to identity.
    pub fn by_name(name: &str) -> Self {
        match lookup(name) {
            Some(def) => Self::from_def(def),
            None => {
                warn!(projection = name, "unknown projection, using identity");
                Self::identity()
            }
        }
    }

    /// Projector for an explicit definition; degenerate parameters resolve
    /// to identity.
    pub fn from_def(def: &ProjectionDef) -> Self {
        let inverse = match &def.conic {
            None => None,
            Some(conic) => {
                let inverse = ConicInverse::new(conic);
                if inverse.is_none() {
                    warn!(projection = def.name, "degenerate projection parameters, using identity");
                }
                inverse
            }
        };
        Self {
            name: if inverse.is_some() || def.conic.is_none() {
                def.name.to_string()
            } else {
                IDENTITY.to_string()
            },
            inverse,
        }
    }

    /// Name of the effective definition.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_identity(&self) -> bool {
        self.inverse.is_none()
    }

    /// Project a model coordinate. Falls back to the raw pair when the
    /// definition cannot produce a finite result.
    pub fn project(&self, pt: ModelPoint) -> LatLon {
        self.inverse
            .as_ref()
            .and_then(|inv| inv.inverse(pt))
            .unwrap_or(LatLon::new(pt.y, pt.x))
    }

    /// Convenience for raw pairs.
    #[inline]
    pub fn project_xy(&self, x: f64, y: f64) -> LatLon {
        self.project(ModelPoint::new(x, y))
    }
}
