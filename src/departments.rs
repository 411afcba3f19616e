/// Department registry for Honduras.
///
/// Defines the 18 first-level administrative divisions with their official
/// two-digit codes and the number of municipalities each contains. Coverage
/// verification compares fetched records against this registry; it is the
/// single source of truth for department names.
///
/// Source: Instituto Nacional de Estadística (INE) territorial division.

/// Metadata for one department.
pub struct Department {
    /// Two-digit INE department code.
    pub code: &'static str,
    /// Official department name, as stored in the `department` column.
    pub name: &'static str,
    /// Departmental capital.
    pub capital: &'static str,
    /// Number of municipalities in the department.
    pub municipalities: usize,
}

pub static DEPARTMENT_REGISTRY: &[Department] = &[
    Department { code: "01", name: "Atlántida", capital: "La Ceiba", municipalities: 8 },
    Department { code: "02", name: "Colón", capital: "Trujillo", municipalities: 10 },
    Department { code: "03", name: "Comayagua", capital: "Comayagua", municipalities: 21 },
    Department { code: "04", name: "Copán", capital: "Santa Rosa de Copán", municipalities: 23 },
    Department { code: "05", name: "Cortés", capital: "San Pedro Sula", municipalities: 12 },
    Department { code: "06", name: "Choluteca", capital: "Choluteca", municipalities: 16 },
    Department { code: "07", name: "El Paraíso", capital: "Yuscarán", municipalities: 19 },
    Department { code: "08", name: "Francisco Morazán", capital: "Tegucigalpa", municipalities: 28 },
    Department { code: "09", name: "Gracias a Dios", capital: "Puerto Lempira", municipalities: 6 },
    Department { code: "10", name: "Intibucá", capital: "La Esperanza", municipalities: 17 },
    Department { code: "11", name: "Islas de la Bahía", capital: "Roatán", municipalities: 4 },
    Department { code: "12", name: "La Paz", capital: "La Paz", municipalities: 19 },
    Department { code: "13", name: "Lempira", capital: "Gracias", municipalities: 28 },
    Department { code: "14", name: "Ocotepeque", capital: "Ocotepeque", municipalities: 16 },
    Department { code: "15", name: "Olancho", capital: "Juticalpa", municipalities: 23 },
    Department { code: "16", name: "Santa Bárbara", capital: "Santa Bárbara", municipalities: 28 },
    Department { code: "17", name: "Valle", capital: "Nacaome", municipalities: 9 },
    Department { code: "18", name: "Yoro", capital: "Yoro", municipalities: 11 },
];

/// Total number of municipalities across all departments.
pub fn total_municipalities() -> usize {
    DEPARTMENT_REGISTRY.iter().map(|d| d.municipalities).sum()
}

/// Looks up a department by exact name. Returns `None` if not found.
pub fn find_department(name: &str) -> Option<&'static Department> {
    DEPARTMENT_REGISTRY.iter().find(|d| d.name == name)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_eighteen_departments() {
        assert_eq!(DEPARTMENT_REGISTRY.len(), 18);
    }

    #[test]
    fn test_all_codes_are_two_digits() {
        for dept in DEPARTMENT_REGISTRY {
            assert_eq!(
                dept.code.len(),
                2,
                "code for '{}' should be 2 digits, got '{}'",
                dept.name,
                dept.code
            );
            assert!(
                dept.code.chars().all(|c| c.is_ascii_digit()),
                "code for '{}' should be numeric, got '{}'",
                dept.name,
                dept.code
            );
        }
    }

    #[test]
    fn test_codes_are_sequential() {
        for (i, dept) in DEPARTMENT_REGISTRY.iter().enumerate() {
            assert_eq!(dept.code, format!("{:02}", i + 1), "registry out of order at '{}'", dept.name);
        }
    }

    #[test]
    fn test_no_duplicate_names() {
        let mut seen = std::collections::HashSet::new();
        for dept in DEPARTMENT_REGISTRY {
            assert!(seen.insert(dept.name), "duplicate department '{}'", dept.name);
        }
    }

    #[test]
    fn test_municipality_total_is_298() {
        assert_eq!(total_municipalities(), 298);
    }

    #[test]
    fn test_find_department_returns_correct_entry() {
        let dept = find_department("Francisco Morazán").expect("Francisco Morazán should be in registry");
        assert_eq!(dept.code, "08");
        assert_eq!(dept.capital, "Tegucigalpa");
    }

    #[test]
    fn test_find_department_is_exact_match() {
        assert!(find_department("Francisco Morazan").is_none(), "names are matched with accents");
        assert!(find_department("").is_none());
    }
}
