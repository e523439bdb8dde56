use sales_lens::table::render_table;

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[test]
fn numeric_columns_are_right_aligned() {
    let headers = strings(&["title", "sales"]);
    let rows = vec![strings(&["Minecraft", "300"]), strings(&["Tetris", "35.5"])];
    let rendered = render_table(&headers, &rows);
    let lines = rendered.lines().collect::<Vec<_>>();

    assert_eq!(lines[0], "title      sales");
    assert_eq!(lines[1], "---------  -----");
    assert_eq!(lines[2], "Minecraft    300");
    assert_eq!(lines[3], "Tetris      35.5");
}

#[test]
fn percent_cells_count_as_numeric() {
    let headers = strings(&["platform", "share"]);
    let rows = vec![strings(&["PC", "7.5%"]), strings(&["Switch", "92.5%"])];
    let rendered = render_table(&headers, &rows);
    assert!(rendered.contains("PC         7.5%"));
    assert!(rendered.contains("Switch    92.5%"));
}

#[test]
fn mixed_columns_stay_left_aligned_and_trailing_space_is_trimmed() {
    let headers = strings(&["key", "note"]);
    let rows = vec![strings(&["1", "n/a"]), strings(&["x", ""])];
    let rendered = render_table(&headers, &rows);
    let lines = rendered.lines().collect::<Vec<_>>();
    assert_eq!(lines[2], "1    n/a");
    assert_eq!(lines[3], "x");
}

#[test]
fn control_characters_are_flattened() {
    let headers = strings(&["title"]);
    let rows = vec![strings(&["Line\nBreak\tTab"])];
    let rendered = render_table(&headers, &rows);
    assert!(rendered.contains("Line Break Tab"));
    assert_eq!(rendered.lines().count(), 3);
}

#[test]
fn empty_tables_render_headers_only() {
    let headers = strings(&["a", "bb"]);
    let rendered = render_table(&headers, &[]);
    assert_eq!(rendered, "a  bb\n-  --\n");
}
