mod common;

use sales_lens::{
    aggregate::{AggFunction, GroupRole},
    cache::DatasetCache,
    pipeline::PrepareOptions,
    query::{QueryFile, QueryOutcome, Request, render_reports, run_queries, run_query},
};

use common::{SCENARIO_CSV, TestWorkspace, assert_close, fixture_path, prepare_str};

const QUERIES: &str = r#"
queries:
  - name: overall
    request: { kind: summary }
  - name: nintendo-top
    filter:
      publishers: [Nintendo]
    request: { kind: top, n: 2 }
  - name: yearly-mean
    request: { kind: group, by: year, function: mean }
  - name: nobody
    filter:
      platforms: []
    request: { kind: summary }
  - name: local
    source: scenario.csv
    request: { kind: top-game }
  - name: local-platforms
    source: scenario.csv
    filter:
      publishers: [Anyone]
    request: { kind: summary }
"#;

#[test]
fn batch_runs_every_query_and_prepares_each_source_once() {
    let workspace = TestWorkspace::new();
    workspace.write("scenario.csv", SCENARIO_CSV);
    let queries_path = workspace.write("queries.yaml", QUERIES);

    let file = QueryFile::load(&queries_path).expect("load queries");
    assert_eq!(file.queries.len(), 6);
    assert_eq!(
        file.queries[4].source.as_deref(),
        Some(workspace.path().join("scenario.csv").as_path())
    );

    let mut cache = DatasetCache::new(PrepareOptions::default());
    let reports = run_queries(
        &mut cache,
        &file,
        &fixture_path(common::GAMES_FIXTURE),
        10,
    )
    .expect("run batch");
    assert_eq!(reports.len(), 6);
    assert_eq!(cache.preparations(), 2);

    match &reports[0].outcome {
        QueryOutcome::Summary { summary } => {
            assert_eq!(summary.count, 10);
            assert_close(summary.total_sales, 1069.36);
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    match &reports[1].outcome {
        QueryOutcome::Games { games } => {
            let titles = games.iter().map(|g| g.title.as_str()).collect::<Vec<_>>();
            assert_eq!(titles, vec!["Wii Sports", "Mario Kart 8 / Deluxe"]);
            assert_eq!(reports[1].matched_rows, 4);
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    match &reports[2].outcome {
        QueryOutcome::Groups { result } => {
            assert_eq!(result.role, GroupRole::Year);
            assert_eq!(result.function, AggFunction::Mean);
            assert_eq!(result.entries[0].key.to_string(), "1985");
            let year_2006 = result
                .entries
                .iter()
                .find(|entry| entry.key.to_string() == "2006")
                .expect("2006 group");
            assert_close(year_2006.value, 91.45);
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    assert!(matches!(reports[3].outcome, QueryOutcome::NoData { .. }));
    assert_eq!(reports[3].matched_rows, 0);

    match &reports[4].outcome {
        QueryOutcome::Games { games } => assert_eq!(games[0].title, "A"),
        other => panic!("unexpected outcome {other:?}"),
    }

    match &reports[5].outcome {
        QueryOutcome::Rejected { reason } => assert!(reason.contains("publisher")),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn run_query_defaults_top_length() {
    let dataset = prepare_str(SCENARIO_CSV);
    let (matched, outcome) = run_query(
        &dataset,
        &Default::default(),
        &Request::Top { n: None },
        1,
    );
    assert_eq!(matched, 2);
    match outcome {
        QueryOutcome::Games { games } => {
            assert_eq!(games.len(), 1);
            assert_eq!(games[0].rank, 1);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn render_reports_labels_each_query() {
    let workspace = TestWorkspace::new();
    let data = workspace.write("scenario.csv", SCENARIO_CSV);
    let queries_path = workspace.write(
        "queries.yaml",
        "queries:\n  - name: totals\n    request: { kind: summary }\n  - name: none\n    filter: { platforms: [] }\n    request: { kind: top-game }\n",
    );
    let file = QueryFile::load(&queries_path).expect("load");
    let mut cache = DatasetCache::new(PrepareOptions::default());
    let reports = run_queries(&mut cache, &file, &data, 5).expect("run");
    let rendered = render_reports(&reports);

    assert!(rendered.contains("== totals (2 matching row(s))"));
    assert!(rendered.contains("== none (0 matching row(s))"));
    assert!(rendered.contains("No data matches: top game requires at least one row"));
}

#[test]
fn unknown_request_kind_is_rejected_at_load() {
    let workspace = TestWorkspace::new();
    let path = workspace.write(
        "queries.yaml",
        "queries:\n  - name: bad\n    request: { kind: median }\n",
    );
    assert!(QueryFile::load(&path).is_err());
}

#[test]
fn unreadable_source_aborts_the_batch() {
    let workspace = TestWorkspace::new();
    let path = workspace.write(
        "queries.yaml",
        "queries:\n  - name: ghost\n    source: missing.csv\n    request: { kind: summary }\n",
    );
    let file = QueryFile::load(&path).expect("load");
    let mut cache = DatasetCache::new(PrepareOptions::default());
    let err = run_queries(&mut cache, &file, &workspace.path().join("unused.csv"), 5)
        .expect_err("missing source");
    assert!(format!("{err:#}").contains("Query 'ghost'"));
}
