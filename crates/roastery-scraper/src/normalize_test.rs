use chrono::{TimeZone, Utc};

use super::*;

fn make_record(source_id: &str, name: &str, url: &str) -> Record {
    Record {
        source_id: source_id.to_owned(),
        source_name: "모모스커피".to_owned(),
        name: name.to_owned(),
        origin: None,
        process: None,
        tasting_notes: vec![],
        price: None,
        weight: None,
        roast_level: None,
        variety: None,
        altitude: None,
        harvest_date: None,
        url: url.to_owned(),
        crawled_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
    }
}

// -----------------------------------------------------------------------
// normalize_record
// -----------------------------------------------------------------------

#[test]
fn collapses_whitespace_in_text_fields() {
    let mut record = make_record("momos", "  에티오피아 \n 구지  ", "https://momos.co.kr/g/1");
    record.origin = Some("Ethiopia,\t Guji".to_owned());
    record.process = Some("   ".to_owned());
    record.variety = Some("Kurume  ".to_owned());

    let normalized = normalize_record(record);
    assert_eq!(normalized.name, "에티오피아 구지");
    assert_eq!(normalized.origin.as_deref(), Some("Ethiopia, Guji"));
    assert_eq!(normalized.process, None);
    assert_eq!(normalized.variety.as_deref(), Some("Kurume"));
}

#[test]
fn canonicalizes_weight() {
    let mut record = make_record("momos", "Guji", "https://momos.co.kr/g/1");
    record.weight = Some(" 1 KG ".to_owned());
    assert_eq!(normalize_record(record).weight.as_deref(), Some("1kg"));
}

#[test]
fn dedupes_tasting_notes() {
    let mut record = make_record("momos", "Guji", "https://momos.co.kr/g/1");
    record.tasting_notes = vec![
        "Peach".to_owned(),
        " peach ".to_owned(),
        "Earl  Grey".to_owned(),
    ];
    assert_eq!(
        normalize_record(record).tasting_notes,
        vec!["Peach", "Earl Grey"]
    );
}

#[test]
fn normalize_record_is_idempotent() {
    let mut record = make_record("momos", " Guji  Natural ", " https://momos.co.kr/g/1 ");
    record.origin = Some(" Ethiopia ".to_owned());
    record.weight = Some("200 g".to_owned());
    record.tasting_notes = vec!["Plum".to_owned(), "plum".to_owned()];

    let once = normalize_record(record);
    let twice = normalize_record(once.clone());
    assert_eq!(once, twice);
}

// -----------------------------------------------------------------------
// normalize_records
// -----------------------------------------------------------------------

#[test]
fn drops_duplicate_urls_keeping_first() {
    let records = vec![
        make_record("momos", "First", "https://momos.co.kr/g/1"),
        make_record("momos", "Other", "https://momos.co.kr/g/2"),
        make_record("momos", "Second", "https://momos.co.kr/g/1 "),
    ];
    let names: Vec<String> = normalize_records(records)
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, vec!["First", "Other"]);
}

#[test]
fn keeps_same_coffee_from_different_sources() {
    let records = vec![
        make_record("momos", "Ethiopia Guji", "https://momos.co.kr/g/1"),
        make_record("fritz", "Ethiopia Guji", "https://fritz.co.kr/p/1"),
    ];
    assert_eq!(normalize_records(records).len(), 2);
}

#[test]
fn normalize_records_is_idempotent() {
    let records = vec![
        make_record("momos", " A ", "https://momos.co.kr/g/1"),
        make_record("momos", "B", "https://momos.co.kr/g/1"),
        make_record("momos", "C", "https://momos.co.kr/g/3"),
    ];
    let once = normalize_records(records);
    let twice = normalize_records(once.clone());
    assert_eq!(once, twice);
    assert_eq!(once.len(), 2);
}
