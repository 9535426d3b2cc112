use clap::Parser;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use itnconv::config::parse_class_spec;
use itnconv::geometry::{boundary, is_valid_polygon, open_ring, polygon_from_vertices};
use itnconv::itn::{build_itn_document, decode, encode, read_itn_file, write_itn_file};
use itnconv::pairing::{
    collect_shapes, find_by_extension, other_tissue_folders, pair_folder, regular_tissue_folders,
    FileMatch, PairOutcome, SkipReason,
};
use itnconv::{
    ClassSpec, ClassVocabulary, CodecError, ImageType, ImportArgs, ImportStats, PairingError,
};

fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    File::create(path).unwrap();
}

fn write_text(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut file = File::create(path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
}

fn decode_owned(entries: &[(String, String)]) -> Result<itnconv::PolygonMap, CodecError> {
    decode(entries.iter().map(|(k, v)| (k.as_str(), v.as_str())))
}

const TRIANGLE_ITN: &str = "[Polygon]
poly_x_0_0 = 0
poly_y_0_0 = 0
poly_x_0_1 = 10
poly_y_0_1 = 0
poly_x_0_2 = 5
poly_y_0_2 = 10
";

#[test]
fn test_encode_keys() {
    let entries = encode(2, &[(1.5, -3.0), (4.0, 0.25)]);
    assert_eq!(
        entries,
        vec![
            ("poly_x_2_0".to_string(), "1.5".to_string()),
            ("poly_y_2_0".to_string(), "-3".to_string()),
            ("poly_x_2_1".to_string(), "4".to_string()),
            ("poly_y_2_1".to_string(), "0.25".to_string()),
        ]
    );
}

#[test]
fn test_round_trip() {
    let cases: Vec<(usize, Vec<(f64, f64)>)> = vec![
        (0, vec![(3.5, -2.25)]),
        (
            7,
            vec![
                (0.1, 0.2),
                (1234.5678, -98.76),
                (1e-7, 3.0e12),
                (42.0, 17.333333333333332),
            ],
        ),
        (1, vec![(-0.0, 0.0), (f64::MIN_POSITIVE, -f64::MIN_POSITIVE)]),
        (1_000_000, vec![(-1.5, -2.5), (-1e300, 1e300), (f64::MAX, f64::MIN)]),
        (u32::MAX as usize, vec![(0.0, 0.0), (10.0, 0.0), (5.0, 10.0)]),
    ];

    for (index, vertices) in cases {
        let decoded = decode_owned(&encode(index, &vertices)).unwrap();

        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[&index], vertices);
        for (got, want) in decoded[&index].iter().zip(&vertices) {
            assert_eq!(got.0.is_sign_negative(), want.0.is_sign_negative());
            assert_eq!(got.1.is_sign_negative(), want.1.is_sign_negative());
        }
    }
}

#[test]
fn test_decode_orders_vertices_and_ignores_other_keys() {
    let entries = [
        ("Poly_X_1_1", "11"),
        ("version", "3"),
        ("poly_y_1_1", "12"),
        ("POLY_X_1_0", "1"),
        ("poly_y_1_0", "2"),
        ("poly_x_0_0", "5"),
        ("poly_y_0_0", "6"),
        ("poly_z_0_0", "9"),
        ("poly_x_a_0", "9"),
    ];
    let decoded = decode(entries).unwrap();

    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded[&0], vec![(5.0, 6.0)]);
    assert_eq!(decoded[&1], vec![(1.0, 2.0), (11.0, 12.0)]);
}

#[test]
fn test_decode_unpaired_coordinate() {
    let entries = [("poly_x_0_0", "1"), ("poly_y_0_0", "2"), ("poly_x_0_1", "3")];
    let err = decode(entries).unwrap_err();
    assert!(matches!(
        err,
        CodecError::UnpairedCoordinate {
            polygon: 0,
            vertex: 1,
            missing: 'y'
        }
    ));

    let entries = [("poly_y_4_0", "2")];
    let err = decode(entries).unwrap_err();
    assert!(matches!(
        err,
        CodecError::UnpairedCoordinate {
            polygon: 4,
            vertex: 0,
            missing: 'x'
        }
    ));
}

#[test]
fn test_decode_invalid_and_duplicate_values() {
    let err = decode([("poly_x_0_0", "abc"), ("poly_y_0_0", "1")]).unwrap_err();
    assert!(matches!(err, CodecError::InvalidCoordinate { ref key, .. } if key == "poly_x_0_0"));

    let err = decode([
        ("poly_x_0_0", "1"),
        ("POLY_X_0_0", "2"),
        ("poly_y_0_0", "1"),
    ])
    .unwrap_err();
    assert!(matches!(err, CodecError::DuplicateCoordinate { ref key } if key == "poly_x_0_0"));
}

#[test]
fn test_decode_rejects_non_finite_values() {
    for value in ["nan", "NaN", "inf", "-inf", "infinity", "-Infinity"] {
        let err = decode([("poly_x_0_0", value), ("poly_y_0_0", "1")]).unwrap_err();
        assert!(
            matches!(err, CodecError::InvalidCoordinate { value: ref v, .. } if v == value),
            "{} was accepted",
            value
        );
    }

    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("nan.itn");
    write_text(
        &path,
        "[Polygon]\npoly_x_0_0=nan\npoly_y_0_0=0\npoly_x_0_1=1\npoly_y_0_1=inf\n",
    );
    assert!(read_itn_file(&path).is_err());
}

#[test]
fn test_read_itn_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("sample.itn");
    write_text(&path, TRIANGLE_ITN);

    let polygons = read_itn_file(&path).unwrap();
    assert_eq!(polygons.len(), 1);
    assert_eq!(polygons[&0], vec![(0.0, 0.0), (10.0, 0.0), (5.0, 10.0)]);
}

#[test]
fn test_read_itn_file_without_polygon_section() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("empty.itn");
    write_text(&path, "[Other]\nkey = value\n");

    let err = read_itn_file(&path).unwrap_err();
    match err {
        CodecError::InFile { path: failed, source } => {
            assert_eq!(failed, path);
            assert!(matches!(*source, CodecError::MissingSection { .. }));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_write_itn_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("out.itn");
    let polygons = vec![
        vec![(0.0, 0.0), (10.0, 0.0), (5.0, 10.0)],
        vec![(1.5, 1.5), (2.5, 1.5), (2.0, 3.5), (1.0, 2.0)],
    ];
    write_itn_file(&path, &polygons).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("[Polygon]"));
    assert!(content.contains("poly_x_1_3"));

    let decoded = read_itn_file(&path).unwrap();
    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded[&0], polygons[0]);
    assert_eq!(decoded[&1], polygons[1]);
}

#[test]
fn test_empty_document_keeps_polygon_section() {
    let document = build_itn_document(&[]);
    let section = document.section(Some("Polygon")).unwrap();
    assert_eq!(section.iter().count(), 0);
}

#[test]
fn test_polygon_boundary_and_open_ring() {
    let polygon = polygon_from_vertices(&[(0.0, 0.0), (10.0, 0.0), (5.0, 10.0)]);

    assert_eq!(
        boundary(&polygon),
        vec![(0.0, 0.0), (10.0, 0.0), (5.0, 10.0), (0.0, 0.0)]
    );
    assert_eq!(open_ring(&polygon), vec![(0.0, 0.0), (10.0, 0.0), (5.0, 10.0)]);
    assert!(is_valid_polygon(&polygon));

    let degenerate = polygon_from_vertices(&[(1.0, 1.0), (2.0, 2.0), (1.0, 1.0)]);
    assert!(!is_valid_polygon(&degenerate));
    assert_eq!(open_ring(&degenerate), vec![(1.0, 1.0), (2.0, 2.0)]);
}

#[test]
fn test_find_by_extension() {
    let temp_dir = tempfile::tempdir().unwrap();
    let folder = temp_dir.path().join("R46[01]");
    touch(&folder.join("a.svs"));
    touch(&folder.join("b.svs"));
    touch(&folder.join("c.itn"));
    fs::create_dir_all(folder.join("dir.itn")).unwrap();

    assert_eq!(
        find_by_extension(&folder, "itn").unwrap(),
        FileMatch::One(folder.join("c.itn"))
    );
    assert_eq!(
        find_by_extension(&folder, "svs").unwrap(),
        FileMatch::Many(vec![folder.join("a.svs"), folder.join("b.svs")])
    );
    assert_eq!(find_by_extension(&folder, "tif").unwrap(), FileMatch::None);
}

#[test]
fn test_pair_folder() {
    let temp_dir = tempfile::tempdir().unwrap();
    let folder = temp_dir.path().join("R46_001");
    touch(&folder.join("slide.svs"));
    touch(&folder.join("slide.itn"));

    let pair = pair_folder(&folder).unwrap().pair().unwrap();
    assert_eq!(pair.folder, folder);
    assert_eq!(pair.image, folder.join("slide.svs"));
    assert_eq!(pair.polygons, folder.join("slide.itn"));
}

#[test]
fn test_pair_folder_skips_missing_files() {
    let temp_dir = tempfile::tempdir().unwrap();
    let no_polygons = temp_dir.path().join("R46_002");
    touch(&no_polygons.join("slide.svs"));
    let no_image = temp_dir.path().join("R46_003");
    touch(&no_image.join("slide.itn"));

    assert_eq!(
        pair_folder(&no_polygons).unwrap(),
        PairOutcome::Skipped(SkipReason::MissingPolygons)
    );
    assert_eq!(
        pair_folder(&no_image).unwrap(),
        PairOutcome::Skipped(SkipReason::MissingImage)
    );
}

#[test]
fn test_pair_folder_ambiguous() {
    let temp_dir = tempfile::tempdir().unwrap();
    let folder = temp_dir.path().join("R46_004");
    touch(&folder.join("one.svs"));
    touch(&folder.join("two.svs"));
    touch(&folder.join("slide.itn"));

    let err = pair_folder(&folder).unwrap_err();
    assert!(matches!(
        err,
        PairingError::Ambiguous { count: 2, ref extension, .. } if extension == "svs"
    ));
}

#[test]
fn test_folder_discovery() {
    let temp_dir = tempfile::tempdir().unwrap();
    let src = temp_dir.path();
    fs::create_dir_all(src.join("R46_002")).unwrap();
    fs::create_dir_all(src.join("R46_001")).unwrap();
    fs::create_dir_all(src.join("R47_001")).unwrap();
    touch(&src.join("R46_notes.txt"));

    assert_eq!(
        regular_tissue_folders(src, "R46").unwrap(),
        vec![src.join("R46_001"), src.join("R46_002")]
    );
    assert!(other_tissue_folders(src, "Other_tissue").unwrap().is_empty());

    fs::create_dir_all(src.join("Other_tissue").join("lung")).unwrap();
    assert_eq!(
        other_tissue_folders(src, "Other_tissue").unwrap(),
        vec![src.join("Other_tissue").join("lung")]
    );
}

#[test]
fn test_collect_shapes_accumulates_and_reports_ambiguity() {
    let temp_dir = tempfile::tempdir().unwrap();
    let src = temp_dir.path();
    let first = src.join("R46_001");
    write_text(&first.join("a.itn"), TRIANGLE_ITN);
    touch(&first.join("slide.svs"));
    let skipped = src.join("R46_002");
    touch(&skipped.join("slide.svs"));

    let mut stats = ImportStats::new();
    let batches = [("Regular tissue", vec![first.clone(), skipped])];
    let shapes = collect_shapes(&batches, &mut stats).unwrap();

    assert_eq!(shapes.len(), 1);
    assert_eq!(shapes[&first.join("slide.svs")].len(), 1);
    assert_eq!(stats.folders_scanned, 2);
    assert_eq!(stats.folders_paired, 1);
    assert_eq!(stats.skipped_missing_polygons, 1);

    let empty = src.join("R46_004");
    write_text(&empty.join("empty.itn"), "[Polygon]\nname=empty\n");
    touch(&empty.join("empty.svs"));

    let mut stats = ImportStats::new();
    let batches = [("Regular tissue", vec![empty.clone()])];
    let shapes = collect_shapes(&batches, &mut stats).unwrap();
    assert!(shapes.is_empty());
    assert_eq!(stats.folders_paired, 1);

    let ambiguous = src.join("R46_003");
    touch(&ambiguous.join("a.itn"));
    touch(&ambiguous.join("b.itn"));
    touch(&ambiguous.join("slide.svs"));

    let mut stats = ImportStats::new();
    let batches = [("Regular tissue", vec![first, ambiguous])];
    let err = collect_shapes(&batches, &mut stats).unwrap_err();
    assert!(matches!(err, PairingError::AmbiguousFolders(ref folders) if folders.len() == 1));
}

#[test]
fn test_parse_class_spec() {
    assert_eq!(
        parse_class_spec("Border:-9408287").unwrap(),
        ClassSpec::new("Border", -9408287)
    );
    assert_eq!(
        parse_class_spec("Tumor:#FF0000").unwrap(),
        ClassSpec::new("Tumor", -65536)
    );
    assert!(parse_class_spec("Border").is_err());
    assert!(parse_class_spec(":12").is_err());
    assert!(parse_class_spec("Border:red").is_err());
    assert!(parse_class_spec("Border:#FFF").is_err());
}

#[test]
fn test_import_args_defaults() {
    let args = ImportArgs::try_parse_from(["itn2project"]).unwrap();

    assert_eq!(args.src_dir, Path::new("./unn_data/Aperio/R46"));
    assert_eq!(args.project, Path::new("domore_qupath"));
    assert_eq!(args.prefix, "R46");
    assert_eq!(args.other_dir, "Other_tissue");
    assert_eq!(args.image_type, ImageType::BrightfieldHE);
    assert_eq!(args.vocabulary(), ClassVocabulary::default());

    let args = ImportArgs::try_parse_from([
        "itn2project",
        "-s",
        "/data",
        "--class",
        "Tissue:-1",
        "--class",
        "Background:0",
    ])
    .unwrap();
    let vocabulary = args.vocabulary();
    assert_eq!(vocabulary.len(), 2);
    assert_eq!(vocabulary.classes()[0], ClassSpec::new("Tissue", -1));
    assert_eq!(vocabulary.classes()[1], ClassSpec::new("Background", 0));
}
