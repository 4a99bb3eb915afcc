//! # Canon Primitives
//!
//! Hardcoded constants and kind vocabularies for the canon.
//!
//! The canon starts with zero declarations but fixed rules.
//! These primitives are compiled into the binary and are immutable at runtime;
//! changing any of them is a canon change and warrants a new `canon_version`.

/// Canon version stamped on verdicts when no configuration overrides it.
pub const DEFAULT_CANON_VERSION: &str = "1.0";

/// Default number of verdicts retained by an engine's cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Deepest recursion a Form may declare without also declaring `truncated`.
///
/// - `iteration_depth <= MAX_ITERATION_DEPTH`: always acceptable.
/// - `iteration_depth > MAX_ITERATION_DEPTH`: requires `truncated = true`.
pub const MAX_ITERATION_DEPTH: u32 = 8;

// =============================================================================
// SIGNATURE FORMAT
// =============================================================================

/// Magic bytes prefixed to every canonical signature preimage.
pub const SIGNATURE_MAGIC: &[u8; 4] = b"CNSG";

/// Canonical signature format version.
///
/// Increment this when the canonical lowering changes; every previously
/// computed signature becomes incomparable.
pub const SIGNATURE_FORMAT_VERSION: u8 = 1;

// =============================================================================
// KIND VOCABULARIES
// =============================================================================

/// Form kinds whose handedness changes the realized artifact.
pub const CHIRAL_KINDS: &[&str] = &[
    "spiral",
    "golden_spiral",
    "logarithmic_spiral",
    "archimedean_spiral",
    "helix",
    "vortex",
    "torus_knot",
    "triskelion",
    "swastika",
    "pinwheel",
];

/// Form kinds that are meaningless without a declared symmetry group.
pub const SYMMETRY_REQUIRED_KINDS: &[&str] = &[
    "regular_polygon",
    "star_polygon",
    "tetrahedron",
    "cube",
    "octahedron",
    "dodecahedron",
    "icosahedron",
    "platonic_solid",
];

/// Ornamental kinds that usually carry a symmetry group.
pub const SYMMETRY_ADVISED_KINDS: &[&str] = &[
    "rosette",
    "mandala",
    "flower_of_life",
    "seed_of_life",
    "metatrons_cube",
    "tiling",
    "lattice",
];

/// Curved kinds whose curvature varies along the form.
///
/// Constant-curvature kinds (circle, sphere, arc) carry an implied class
/// and are deliberately absent.
pub const VARIABLE_CURVATURE_KINDS: &[&str] = &[
    "ellipse",
    "spiral",
    "golden_spiral",
    "logarithmic_spiral",
    "archimedean_spiral",
    "helix",
    "torus",
    "parabola",
    "hyperbola",
    "catenary",
    "cardioid",
    "lemniscate",
    "vesica_piscis",
];

/// Relation kinds that count as a declared reflection.
pub const REFLECTION_RELATION_KINDS: &[&str] = &["reflect", "reflection", "mirror"];

/// Form parameter naming the Form this one mirrors.
pub const REFLECTION_OF_PARAM: &str = "reflection_of";

/// Orientation pairs that are mirror images of each other.
pub const OPPOSITE_ORIENTATIONS: &[(&str, &str)] = &[("cw", "ccw"), ("left", "right")];

/// Constraint operators that compare or combine numeric quantities.
pub const NUMERIC_OPERATORS: &[&str] = &[
    "eq", "ne", "lt", "le", "gt", "ge", "approx", "ratio", "add", "sub", "mul", "div",
];

/// Case-insensitive membership test against one of the vocabularies above.
#[must_use]
pub fn kind_in(kind: &str, vocabulary: &[&str]) -> bool {
    vocabulary.iter().any(|k| k.eq_ignore_ascii_case(kind.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_lookup_ignores_case_and_padding() {
        assert!(kind_in("Helix", CHIRAL_KINDS));
        assert!(kind_in(" cube ", SYMMETRY_REQUIRED_KINDS));
        assert!(!kind_in("circle", VARIABLE_CURVATURE_KINDS));
    }

    #[test]
    fn symmetry_vocabularies_are_disjoint() {
        for kind in SYMMETRY_REQUIRED_KINDS {
            assert!(!kind_in(kind, SYMMETRY_ADVISED_KINDS), "{kind}");
        }
    }

    #[test]
    fn magic_bytes_correct() {
        assert_eq!(SIGNATURE_MAGIC, b"CNSG");
    }
}
