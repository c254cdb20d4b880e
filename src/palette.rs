//! Deterministic chart colors for labels.
//!
//! The hash is a non-cryptographic 32-bit rolling hash (`h = h * 31 + c` over
//! UTF-16 code units, wrapping). Collisions only mean two labels share a color.

pub const PALETTE: [&str; 10] = [
    "#3B82F6", "#10B981", "#F59E0B", "#EF4444", "#8B5CF6", "#EC4899", "#06B6D4", "#84CC16",
    "#F97316", "#6366F1",
];

pub fn label_hash(label: &str) -> i32 {
    label
        .encode_utf16()
        .fold(0i32, |hash, unit| {
            (hash << 5).wrapping_sub(hash).wrapping_add(i32::from(unit))
        })
}

pub fn palette_index(label: &str) -> usize {
    (label_hash(label).unsigned_abs() as usize) % PALETTE.len()
}

pub fn color_for(label: &str) -> &'static str {
    PALETTE[palette_index(label)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_matches_reference_values() {
        assert_eq!(label_hash(""), 0);
        assert_eq!(label_hash("SDM"), 81948);
        assert_eq!(label_hash("aplikasi"), 1062277656);
        assert_eq!(label_hash("tata kelola"), -337041448);
        assert_eq!(label_hash("konsultasi"), -1738838013);
    }

    #[test]
    fn colors_are_stable_per_label() {
        assert_eq!(color_for("aplikasi"), "#06B6D4");
        assert_eq!(color_for("aplikasi"), color_for("aplikasi"));
        assert_eq!(color_for("Dki Jakarta"), "#8B5CF6");
        assert_eq!(color_for("konsultasi"), "#EF4444");
        assert_eq!(color_for(""), PALETTE[0]);
    }
}
