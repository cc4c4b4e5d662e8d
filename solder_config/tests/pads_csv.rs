use std::fs::File;
use std::io::Write;

use rstest::rstest;
use solder_config::{PadShape, load_pads_csv};
use tempfile::tempdir;

fn write_csv(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("pads.csv");
    let mut f = File::create(&path).unwrap();
    f.write_all(body.as_bytes()).unwrap();
    path
}

#[rstest]
fn loads_rows_with_optional_second_dimension() {
    let dir = tempdir().unwrap();
    let path = write_csv(
        &dir,
        "label,shape,z_mm,a_mm,b_mm,solder_height_mm\n\
         J1-1,square,-12.5,3.0,,0.5\n\
         TP4, concentric ,-12.0,2.0,0.6,0.4\n",
    );
    let rows = load_pads_csv(&path).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].label, "J1-1");
    assert_eq!(rows[0].shape, PadShape::Square);
    assert_eq!(rows[0].b_mm, None);
    assert_eq!(rows[1].shape, PadShape::Concentric);
    assert_eq!(rows[1].b_mm, Some(0.6));
    assert!((rows[1].z_mm + 12.0).abs() < 1e-9);
}

#[rstest]
#[case("label,shape,z,a_mm,b_mm,solder_height_mm\n", "must have headers")]
#[case("shape,label,z_mm,a_mm,b_mm,solder_height_mm\n", "must have headers")]
#[case("label,shape,z_mm,a_mm,b_mm,solder_height_mm\n", "contains no pads")]
#[case(
    "label,shape,z_mm,a_mm,b_mm,solder_height_mm\nP1,hexagon,-1,1,,0.5\n",
    "invalid csv row 2"
)]
#[case(
    "label,shape,z_mm,a_mm,b_mm,solder_height_mm\nP1,circle,-1,abc,,0.5\n",
    "invalid csv row 2"
)]
fn rejects_bad_files(#[case] body: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let path = write_csv(&dir, body);
    let err = load_pads_csv(&path).expect_err("should reject");
    assert!(
        format!("{err}").to_lowercase().contains(needle),
        "unexpected error: {err}"
    );
}

#[rstest]
fn missing_file_mentions_path() {
    let dir = tempdir().unwrap();
    let err = load_pads_csv(&dir.path().join("nope.csv")).expect_err("missing file");
    assert!(format!("{err}").contains("nope.csv"));
}
