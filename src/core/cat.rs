//! Purpose: Wire and domain types for spy cats and breed directory entries.
//! Exports: `SpyCat`, `SpyCatInput`, `BreedOption`, experience/salary bounds.
//! Role: Shared vocabulary between the gateway, the breed cache, and the controllers.
//! Invariants: `SpyCat` values only ever originate from a remote response.
//! Invariants: Salaries decode from either a JSON number or a numeric string.
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const EXPERIENCE_MIN: u32 = 0;
pub const EXPERIENCE_MAX: u32 = 15;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpyCat {
    pub id: u64,
    pub name: String,
    pub experience: u32,
    pub breed: String,
    #[serde(deserialize_with = "deserialize_salary")]
    pub salary: f64,
}

/// Create payload; only produced by a passing local validation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SpyCatInput {
    pub name: String,
    pub experience: u32,
    pub breed: String,
    pub salary: f64,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct BreedOption {
    pub id: String,
    pub name: String,
}

impl BreedOption {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

// Decimal fields are commonly rendered as strings ("50000.00") by REST backends.
fn deserialize_salary<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    struct SalaryVisitor;

    impl Visitor<'_> for SalaryVisitor {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a number or a numeric string")
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<f64, E> {
            Ok(value)
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<f64, E> {
            Ok(value as f64)
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<f64, E> {
            Ok(value as f64)
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<f64, E> {
            value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|salary| salary.is_finite())
                .ok_or_else(|| E::invalid_value(de::Unexpected::Str(value), &self))
        }
    }

    deserializer.deserialize_any(SalaryVisitor)
}

#[cfg(test)]
mod tests {
    use super::SpyCat;
    use serde_json::json;

    #[test]
    fn decodes_numeric_and_string_salaries() {
        let cat: SpyCat = serde_json::from_value(json!({
            "id": 7, "name": "Tom", "experience": 3, "breed": "Abyssinian", "salary": 50000
        }))
        .expect("numeric salary");
        assert_eq!(cat.salary, 50000.0);

        let cat: SpyCat = serde_json::from_value(json!({
            "id": 8, "name": "Kit", "experience": 0, "breed": "Bengal", "salary": "1250.50"
        }))
        .expect("string salary");
        assert_eq!(cat.salary, 1250.5);
    }

    #[test]
    fn rejects_non_numeric_salary_strings() {
        let result = serde_json::from_value::<SpyCat>(json!({
            "id": 9, "name": "Ace", "experience": 1, "breed": "Bengal", "salary": "lots"
        }));
        assert!(result.is_err());
    }
}
