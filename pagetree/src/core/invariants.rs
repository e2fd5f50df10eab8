//! Structural invariants of persisted page trees.

use std::collections::HashSet;

use crate::tree::NodeRecord;

/// Check a flat record list before it is rebuilt into a tree:
/// - No duplicate ids
/// - Exactly one root (record without `parent_id`)
/// - Every parent exists and is listed before its children
///
/// Returns every violation found, in record order.
pub fn validate_records(records: &[NodeRecord]) -> Vec<String> {
    let mut errors = Vec::new();
    if records.is_empty() {
        errors.push("tree must contain a root page".to_string());
        return errors;
    }

    let all_ids: HashSet<&str> = records.iter().map(|record| record.id.as_str()).collect();
    let mut seen = HashSet::new();
    let mut roots = Vec::new();

    for (index, record) in records.iter().enumerate() {
        if record.id.trim().is_empty() {
            errors.push(format!("record {index}: id must not be empty"));
        }
        if !seen.insert(record.id.as_str()) {
            errors.push(format!("duplicate id '{}'", record.id));
        }
        match record.parent_id.as_deref() {
            None => roots.push(record.id.as_str()),
            Some(parent) if parent == record.id => {
                errors.push(format!("'{}' is its own parent", record.id));
            }
            Some(parent) if !all_ids.contains(parent) => {
                errors.push(format!("'{}': parent '{}' not found", record.id, parent));
            }
            Some(parent) if !seen.contains(parent) => {
                errors.push(format!(
                    "'{}': parent '{}' must be listed before its children",
                    record.id, parent
                ));
            }
            Some(_) => {}
        }
    }

    match roots.len() {
        0 => errors.push("tree must contain a root page".to_string()),
        1 => {
            if records[0].parent_id.is_some() {
                errors.push(format!("root '{}' must be the first record", roots[0]));
            }
        }
        _ => errors.push(format!("multiple roots: {}", roots.join(", "))),
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::DataMap;

    fn record(id: &str, parent: Option<&str>) -> NodeRecord {
        NodeRecord {
            id: id.to_string(),
            parent_id: parent.map(str::to_string),
            tag: id.to_uppercase(),
            data: DataMap::new(),
        }
    }

    #[test]
    fn accepts_well_formed_records() {
        let records = vec![record("a", None), record("b", Some("a")), record("c", Some("b"))];
        assert!(validate_records(&records).is_empty());
    }

    #[test]
    fn reports_every_violation() {
        let records = vec![
            record("a", None),
            record("a", Some("b")),
            record("b", Some("a")),
            record("c", Some("ghost")),
            record("d", None),
        ];
        let errors = validate_records(&records);

        assert!(errors.iter().any(|err| err.contains("duplicate id 'a'")));
        assert!(errors.iter().any(|err| err.contains("listed before")));
        assert!(errors.iter().any(|err| err.contains("'ghost' not found")));
        assert!(errors.iter().any(|err| err.contains("multiple roots")));
    }

    #[test]
    fn rejects_empty_and_self_parented_records() {
        assert!(!validate_records(&[]).is_empty());

        let errors = validate_records(&[record("a", Some("a"))]);
        assert!(errors.iter().any(|err| err.contains("own parent")));
        assert!(errors.iter().any(|err| err.contains("root page")));
    }
}
