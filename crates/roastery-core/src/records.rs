use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One coffee offering scraped from a source's detail page, in the canonical
/// schema shared by every source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Id of the source descriptor that produced this record, e.g. `"fritz"`.
    pub source_id: String,
    /// Display name of the source, e.g. `"프릳츠커피"`.
    pub source_name: String,
    pub name: String,
    pub origin: Option<String>,
    pub process: Option<String>,
    /// Distinct notes in order of first appearance.
    pub tasting_notes: Vec<String>,
    /// Price in whole currency units as printed on the page, e.g. `18000` for `"18,000원"`.
    pub price: Option<u64>,
    /// Normalized weight such as `"200g"` or `"1kg"`.
    pub weight: Option<String>,
    pub roast_level: Option<String>,
    pub variety: Option<String>,
    pub altitude: Option<String>,
    pub harvest_date: Option<String>,
    /// Detail page URL the record was extracted from.
    pub url: String,
    pub crawled_at: DateTime<Utc>,
}

impl Record {
    /// Returns how many optional attributes were resolved, a rough measure of
    /// how well a source's rules fit its pages.
    #[must_use]
    pub fn populated_fields(&self) -> usize {
        let optional = [
            self.origin.is_some(),
            self.process.is_some(),
            !self.tasting_notes.is_empty(),
            self.price.is_some(),
            self.weight.is_some(),
            self.roast_level.is_some(),
            self.variety.is_some(),
            self.altitude.is_some(),
            self.harvest_date.is_some(),
        ];
        optional.into_iter().filter(|set| *set).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_record() -> Record {
        Record {
            source_id: "fritz".to_string(),
            source_name: "프릳츠커피".to_string(),
            name: "에티오피아 예가체프".to_string(),
            origin: None,
            process: None,
            tasting_notes: vec![],
            price: None,
            weight: None,
            roast_level: None,
            variety: None,
            altitude: None,
            harvest_date: None,
            url: "https://fritz.co.kr/product/detail.html?product_no=1".to_string(),
            crawled_at: Utc::now(),
        }
    }

    #[test]
    fn populated_fields_counts_only_resolved_attributes() {
        let mut record = bare_record();
        assert_eq!(record.populated_fields(), 0);

        record.origin = Some("Ethiopia".to_string());
        record.price = Some(18_000);
        record.tasting_notes = vec!["자스민".to_string()];
        assert_eq!(record.populated_fields(), 3);
    }

    #[test]
    fn serializes_with_snake_case_keys() {
        let mut record = bare_record();
        record.harvest_date = Some("2023".to_string());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["source_id"], "fritz");
        assert_eq!(json["harvest_date"], "2023");
        assert!(json["price"].is_null());
        assert!(json["tasting_notes"].as_array().unwrap().is_empty());
    }
}
