//! Department → unit catalog backing the cascading dropdowns on the
//! user forms.

use std::collections::BTreeMap;

/// Departments and the organizational units under each.
#[derive(Debug, Clone)]
pub struct DepartmentCatalog {
    map: BTreeMap<String, Vec<String>>,
}

impl DepartmentCatalog {
    /// Build a catalog from explicit entries.
    pub fn new<I, D, U>(entries: I) -> Self
    where
        I: IntoIterator<Item = (D, Vec<U>)>,
        D: Into<String>,
        U: Into<String>,
    {
        Self {
            map: entries
                .into_iter()
                .map(|(d, units)| (d.into(), units.into_iter().map(Into::into).collect()))
                .collect(),
        }
    }

    /// The default catalog used when none is configured.
    #[must_use]
    pub fn standard() -> Self {
        Self::new([
            ("Engineering", vec!["Platform", "Applications", "QA"]),
            ("Operations", vec!["Facilities", "Support"]),
            ("Sales", vec!["Domestic", "International"]),
            ("HR", vec!["Recruiting", "Payroll"]),
        ])
    }

    /// Department names, in deterministic order.
    pub fn department_names(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    /// The full department → units map as JSON, for embedding into the
    /// edit form's unit-cascade script.
    #[must_use]
    pub fn as_json(&self) -> String {
        serde_json::to_string(&self.map).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for DepartmentCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_is_a_map_of_unit_lists() {
        let catalog = DepartmentCatalog::new([("Engineering", vec!["Platform"])]);
        assert_eq!(catalog.as_json(), r#"{"Engineering":["Platform"]}"#);
    }

    #[test]
    fn department_names_are_sorted() {
        let catalog = DepartmentCatalog::standard();
        let names: Vec<&str> = catalog.department_names().collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }
}
