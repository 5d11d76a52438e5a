use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Categorical inputs the model receives as integer codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalField {
    PropertyType,
    Furnishing,
    PropertyCondition,
}

impl CategoricalField {
    pub const ALL: [CategoricalField; 3] = [
        CategoricalField::PropertyType,
        CategoricalField::Furnishing,
        CategoricalField::PropertyCondition,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoricalField::PropertyType => "property_type",
            CategoricalField::Furnishing => "furnishing",
            CategoricalField::PropertyCondition => "property_condition",
        }
    }

    /// Code used when a label is not present in the field's table.
    ///
    /// Unknown labels are not an error: `property_type` falls back to 0,
    /// `furnishing` to 1 and `property_condition` to 2.
    pub fn default_code(&self) -> i64 {
        match self {
            CategoricalField::PropertyType => 0,
            CategoricalField::Furnishing => 1,
            CategoricalField::PropertyCondition => 2,
        }
    }

    /// Options offered by the entry forms when no fitted table is available.
    pub fn form_choices(&self) -> &'static [&'static str] {
        match self {
            CategoricalField::PropertyType => &["rumah"],
            CategoricalField::Furnishing => &["unfurnished", "furnished", "semi furnished"],
            CategoricalField::PropertyCondition => &["bagus", "bagus sekali"],
        }
    }
}

impl fmt::Display for CategoricalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed label-to-code tables, one per categorical field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncodeMap {
    tables: BTreeMap<CategoricalField, BTreeMap<String, i64>>,
}

fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

impl EncodeMap {
    /// Builds the tables from observed labels: distinct labels are sorted and
    /// numbered from 0.
    pub fn fit<'a, I>(observations: I) -> Self
    where
        I: IntoIterator<Item = (CategoricalField, &'a str)>,
    {
        let mut seen: BTreeMap<CategoricalField, BTreeSet<String>> = BTreeMap::new();
        for (field, label) in observations {
            let label = normalize_label(label);
            if label.is_empty() {
                continue;
            }
            seen.entry(field).or_default().insert(label);
        }

        let tables = seen
            .into_iter()
            .map(|(field, labels)| {
                let table = labels
                    .into_iter()
                    .enumerate()
                    .map(|(code, label)| (label, code as i64))
                    .collect();
                (field, table)
            })
            .collect();

        EncodeMap { tables }
    }

    /// Builds the tables from explicit `(label, code)` pairs.
    pub fn from_tables<I, L>(tables: I) -> Self
    where
        I: IntoIterator<Item = (CategoricalField, Vec<(L, i64)>)>,
        L: AsRef<str>,
    {
        let tables = tables
            .into_iter()
            .map(|(field, pairs)| {
                let table = pairs
                    .into_iter()
                    .map(|(label, code)| (normalize_label(label.as_ref()), code))
                    .collect();
                (field, table)
            })
            .collect();
        EncodeMap { tables }
    }

    pub fn encode(&self, field: CategoricalField, label: &str) -> i64 {
        self.lookup(field, label).unwrap_or_else(|| field.default_code())
    }

    /// Mapped code for a known label, `None` for an unknown one.
    pub fn lookup(&self, field: CategoricalField, label: &str) -> Option<i64> {
        self.tables
            .get(&field)
            .and_then(|table| table.get(&normalize_label(label)))
            .copied()
    }

    /// Known labels of a field ordered by code.
    pub fn labels(&self, field: CategoricalField) -> Vec<&str> {
        let mut labels: Vec<(&str, i64)> = self
            .tables
            .get(&field)
            .map(|table| table.iter().map(|(l, c)| (l.as_str(), *c)).collect())
            .unwrap_or_default();
        labels.sort_by_key(|(_, code)| *code);
        labels.into_iter().map(|(label, _)| label).collect()
    }

    /// Labels to offer for a field: the fitted ones, or the form defaults.
    pub fn choices(&self, field: CategoricalField) -> Vec<String> {
        let labels = self.labels(field);
        if labels.is_empty() {
            field.form_choices().iter().map(|s| s.to_string()).collect()
        } else {
            labels.into_iter().map(str::to_string).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EncodeMap {
        EncodeMap::fit([
            (CategoricalField::PropertyType, "rumah"),
            (CategoricalField::Furnishing, "unfurnished"),
            (CategoricalField::Furnishing, "furnished"),
            (CategoricalField::Furnishing, "semi furnished"),
            (CategoricalField::PropertyCondition, "bagus"),
            (CategoricalField::PropertyCondition, "bagus sekali"),
            (CategoricalField::PropertyCondition, "butuh renovasi"),
        ])
    }

    #[test]
    fn fit_numbers_sorted_labels() {
        let map = sample();
        assert_eq!(map.encode(CategoricalField::PropertyType, "rumah"), 0);
        assert_eq!(map.encode(CategoricalField::Furnishing, "furnished"), 0);
        assert_eq!(map.encode(CategoricalField::Furnishing, "semi furnished"), 1);
        assert_eq!(map.encode(CategoricalField::Furnishing, "unfurnished"), 2);
        assert_eq!(map.encode(CategoricalField::PropertyCondition, "bagus sekali"), 1);
        assert_eq!(map.encode(CategoricalField::PropertyCondition, "butuh renovasi"), 2);
    }

    #[test]
    fn unknown_labels_use_field_defaults() {
        let map = sample();
        assert_eq!(map.encode(CategoricalField::PropertyType, "apartemen"), 0);
        assert_eq!(map.encode(CategoricalField::Furnishing, "kosong"), 1);
        assert_eq!(map.encode(CategoricalField::PropertyCondition, "baru"), 2);
        assert_eq!(map.lookup(CategoricalField::PropertyCondition, "baru"), None);
    }

    #[test]
    fn empty_map_always_defaults() {
        let map = EncodeMap::default();
        for field in CategoricalField::ALL {
            assert_eq!(map.encode(field, "anything"), field.default_code());
        }
    }

    #[test]
    fn encoding_is_repeatable() {
        let map = sample();
        for field in CategoricalField::ALL {
            for label in map.labels(field) {
                let first = map.encode(field, label);
                assert_eq!(map.encode(field, label), first);
                assert_eq!(map.lookup(field, label), Some(first));
            }
        }
    }

    #[test]
    fn labels_are_matched_case_insensitively() {
        let map = sample();
        assert_eq!(map.encode(CategoricalField::Furnishing, "  Unfurnished "), 2);
    }

    #[test]
    fn choices_fall_back_to_form_options() {
        let map = sample();
        assert_eq!(map.choices(CategoricalField::Furnishing)[0], "furnished");
        let empty = EncodeMap::default();
        assert_eq!(empty.choices(CategoricalField::PropertyCondition), vec!["bagus", "bagus sekali"]);
    }

    #[test]
    fn explicit_tables_are_kept() {
        let map = EncodeMap::from_tables([(
            CategoricalField::Furnishing,
            vec![("unfurnished", 7), ("furnished", 3)],
        )]);
        assert_eq!(map.encode(CategoricalField::Furnishing, "unfurnished"), 7);
        assert_eq!(map.labels(CategoricalField::Furnishing), vec!["furnished", "unfurnished"]);
    }
}
