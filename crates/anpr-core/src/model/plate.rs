use serde::{Deserialize, Serialize};

/// A plate registered through the console. Matching is by `plate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedPlate {
    pub plate: String,
    /// Display name, e.g. the vehicle owner.
    pub name: String,
}

/// Canonical lookup form: trimmed and ASCII-uppercased.
pub fn normalize_plate(plate: &str) -> String {
    plate.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(normalize_plate(" ab12cde "), "AB12CDE");
        assert_eq!(normalize_plate("AB12 CDE"), "AB12 CDE");
    }
}
