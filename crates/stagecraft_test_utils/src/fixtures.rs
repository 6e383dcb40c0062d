//! Canned tables and submissions.

use stagecraft_catalog::{MemoryCatalog, Table};

pub const NAMES: &str = "Names";
pub const PEOPLE: &str = "People";
pub const EXISTING: &str = "Existing";

/// `Names(First Name)` with Oski and Carol.
pub fn names_table() -> Table {
    Table::from_lists(vec![
        vec!["First Name".to_string()],
        vec!["Oski".to_string()],
        vec!["Carol".to_string()],
    ])
    .expect("fixture table is well formed")
}

/// `People(First Name, Last Name, Age)` with three rows.
pub fn people_table() -> Table {
    Table::new(["First Name", "Last Name", "Age"])
        .and_then(|t| t.with_row(["Oski", "Bear", "3"]))
        .and_then(|t| t.with_row(["Carol", "Christ", "70"]))
        .and_then(|t| t.with_row(["Steve", "Wozniak", "73"]))
        .expect("fixture table is well formed")
}

/// A single-cell table used as a deletion target.
pub fn existing_table() -> Table {
    Table::new(["a"])
        .and_then(|t| t.with_row(["x"]))
        .expect("fixture table is well formed")
}

/// An in-memory catalog holding [`names_table`], [`people_table`] and
/// [`existing_table`].
pub fn seeded_catalog() -> MemoryCatalog {
    MemoryCatalog::new()
        .with_table(NAMES, names_table())
        .with_table(PEOPLE, people_table())
        .with_table(EXISTING, existing_table())
}

/// Owned `(field, value)` pairs, ready for `Submission::from_pairs`.
pub fn fields<'a, I>(pairs: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagecraft_catalog::TableCatalog;

    #[test]
    fn test_seeded_catalog() {
        let catalog = seeded_catalog();
        let names = catalog.list_names().unwrap();
        assert_eq!(names.len(), 3);
        assert_eq!(catalog.read(PEOPLE).unwrap().len(), 3);
        assert_eq!(catalog.read(NAMES).unwrap(), names_table());
    }
}
