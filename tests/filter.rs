mod common;

use std::collections::BTreeSet;

use proptest::prelude::*;

use sales_lens::{
    filter::{FilterSpec, YearRange, parse_allow_set, parse_year_range},
    pipeline::PreparedDataset,
};

use common::{SCENARIO_CSV, prepare_str, titles};

const PLATFORMS: [&str; 4] = ["PC", "Switch", "PS5", "Wii"];
const PUBLISHERS: [&str; 3] = ["Nintendo", "Sega", "Capcom"];

fn dataset_from(rows: &[(u16, usize, usize)]) -> PreparedDataset {
    let mut csv = String::from("game,sales,year,platform,publisher\n");
    for (idx, (year, platform, publisher)) in rows.iter().enumerate() {
        csv.push_str(&format!(
            "G{idx},{},{year},{},{}\n",
            idx + 1,
            PLATFORMS[platform % PLATFORMS.len()],
            PUBLISHERS[publisher % PUBLISHERS.len()]
        ));
    }
    prepare_str(&csv)
}

fn subset(pool: &[&str], mask: u8) -> BTreeSet<String> {
    pool.iter()
        .enumerate()
        .filter(|(idx, _)| mask & (1 << idx) != 0)
        .map(|(_, value)| value.to_string())
        .collect()
}

proptest! {
    #[test]
    fn filter_keeps_exactly_the_matching_rows(
        rows in prop::collection::vec((1990u16..2020, 0usize..4, 0usize..3), 0..30),
        platform_mask in prop::option::of(0u8..16),
        publisher_mask in prop::option::of(0u8..8),
        years in prop::option::of((1990u16..2020, 0u16..15)),
    ) {
        let dataset = dataset_from(&rows);
        let spec = FilterSpec {
            platforms: platform_mask.map(|mask| subset(&PLATFORMS, mask)),
            publishers: publisher_mask.map(|mask| subset(&PUBLISHERS, mask)),
            years: years.map(|(low, span)| YearRange::new(low as f64, (low + span) as f64)),
        };
        let kept = dataset.filter(&spec).expect("filter");

        for row in &kept {
            if let Some(allowed) = &spec.platforms {
                prop_assert!(allowed.contains(row.platform.as_deref().unwrap_or_default()));
            }
            if let Some(allowed) = &spec.publishers {
                prop_assert!(allowed.contains(row.publisher.as_deref().unwrap_or_default()));
            }
            if let Some(range) = &spec.years {
                prop_assert!(range.contains(row.year.unwrap_or(f64::NAN)));
            }
        }
        let expected = dataset.rows.iter().filter(|row| spec.matches(row)).count();
        prop_assert_eq!(kept.len(), expected);
        for pair in kept.windows(2) {
            prop_assert!(pair[0].position < pair[1].position);
        }
    }

    #[test]
    fn unrestricted_spec_keeps_every_row(
        rows in prop::collection::vec((1990u16..2020, 0usize..4, 0usize..3), 0..30),
    ) {
        let dataset = dataset_from(&rows);
        let spec = FilterSpec::default();
        prop_assert!(spec.is_unrestricted());
        prop_assert_eq!(dataset.filter(&spec).expect("filter").len(), dataset.rows.len());
    }
}

#[test]
fn year_range_bounds_are_inclusive() {
    let dataset = prepare_str("game,sales,year\nA,1,1999\nB,1,2000\nC,1,2005\nD,1,2006\n");
    let spec = FilterSpec {
        years: Some(YearRange::new(2000.0, 2005.0)),
        ..FilterSpec::default()
    };
    assert_eq!(titles(&dataset.filter(&spec).expect("filter")), vec!["B", "C"]);
}

#[test]
fn parse_allow_set_distinguishes_absent_from_empty() {
    assert_eq!(parse_allow_set(&[]), None);
    assert_eq!(parse_allow_set(&[String::new()]), Some(BTreeSet::new()));
    assert_eq!(
        parse_allow_set(&["PC, Wii".to_string(), "Switch".to_string()]),
        Some(BTreeSet::from([
            "PC".to_string(),
            "Switch".to_string(),
            "Wii".to_string()
        ]))
    );
}

#[test]
fn parse_year_range_accepts_open_bounds_and_rejects_inversions() {
    assert_eq!(
        parse_year_range(":2010").expect("open low"),
        YearRange::new(f64::NEG_INFINITY, 2010.0)
    );
    assert!(parse_year_range("2010:2000").is_err());
    assert!(parse_year_range("2010").is_err());
    assert!(parse_year_range("abc:2000").is_err());
}

#[test]
fn filter_spec_deserializes_from_yaml() {
    let spec: FilterSpec = serde_yaml::from_str(
        "platforms: [X]\nyears: { low: 2000, high: 2001 }\n",
    )
    .expect("parse spec");
    let dataset = prepare_str(SCENARIO_CSV);
    assert_eq!(titles(&dataset.filter(&spec).expect("filter")), vec!["A", "C"]);
    assert!(serde_yaml::from_str::<FilterSpec>("platform: [X]\n").is_err());
}
