//! Folding earliest/latest date fields into a single range field

use crate::config::DateFieldNames;
use crate::graph::FieldMap;

/// An inclusive date range as stored in the target's range field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

impl DateRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// A range whose bounds are the same date
    pub fn single(date: impl Into<String>) -> Self {
        let date = date.into();
        Self::new(date.clone(), date)
    }
}

/// Stored as `start,end`, the target's range field format
impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.start, self.end)
    }
}

/// Replace the earliest/latest fields with one range field.
///
/// A lone bound stands for both ends. Returns the range written, if any;
/// the bound fields are removed either way.
pub fn merge_date_range(fields: &mut FieldMap, names: &DateFieldNames) -> Option<DateRange> {
    let earliest = fields.remove(&names.earliest);
    let latest = fields.remove(&names.latest);

    let range = match (earliest, latest) {
        (Some(start), Some(end)) => DateRange::new(start, end),
        (Some(date), None) | (None, Some(date)) => DateRange::single(date),
        (None, None) => return None,
    };

    fields.insert(names.range.clone(), range.to_string());
    Some(range)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn both_bounds_form_a_range() {
        let names = DateFieldNames::default();
        let mut map = fields(&[("earliestdate", "1990"), ("latestdate", "1995"), ("title", "x")]);

        let range = merge_date_range(&mut map, &names).unwrap();
        assert_eq!(range, DateRange::new("1990", "1995"));
        assert_eq!(map["datecreatedofartwork"], "1990,1995");
        assert!(!map.contains_key("earliestdate"));
        assert!(!map.contains_key("latestdate"));
        assert_eq!(map["title"], "x");
    }

    #[test]
    fn only_latest_collapses_to_latest() {
        let names = DateFieldNames::default();
        let mut map = fields(&[("latestdate", "1995")]);

        let range = merge_date_range(&mut map, &names).unwrap();
        assert_eq!(range, DateRange::single("1995"));
        assert_eq!(range.start, "1995");
        assert_eq!(range.end, "1995");
        assert!(!map.contains_key("latestdate"));
    }

    #[test]
    fn only_earliest_collapses_to_earliest() {
        let names = DateFieldNames::default();
        let mut map = fields(&[("earliestdate", "1820")]);

        assert_eq!(merge_date_range(&mut map, &names), Some(DateRange::single("1820")));
        assert_eq!(map["datecreatedofartwork"], "1820,1820");
    }

    #[test]
    fn no_bounds_leaves_fields_alone() {
        let names = DateFieldNames::default();
        let mut map = fields(&[("datecreatedofartwork", "kept")]);

        assert!(merge_date_range(&mut map, &names).is_none());
        assert_eq!(map["datecreatedofartwork"], "kept");
    }
}
