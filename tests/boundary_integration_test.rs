use govdata_etl::config::toml_config::TomlConfig;
use govdata_etl::domain::ports::Pipeline;
use govdata_etl::{BoundaryPipeline, EtlEngine, EtlError};
use shapefile::dbase::{self, FieldName, FieldValue, TableWriterBuilder};
use shapefile::{Point, Polygon, PolygonRing, Shape, Writer};
use std::path::Path;
use tempfile::TempDir;

const NAD83_PRJ: &str = r#"GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137,298.257222101]],PRIMEM["Greenwich",0],UNIT["Degree",0.017453292519943295]]"#;

const TIGER_CPG: &str = "UTF-8\n";

fn square(x: f64) -> Polygon {
    Polygon::new(PolygonRing::Outer(vec![
        Point::new(x, 0.0),
        Point::new(x, 1.0),
        Point::new(x + 1.0, 1.0),
        Point::new(x + 1.0, 0.0),
        Point::new(x, 0.0),
    ]))
}

fn write_state_layer(path: &Path, fields: &[&str], districts: &[(&str, &str)]) {
    write_layer_with_width(path, fields, 100, districts);
}

fn write_layer_with_width(path: &Path, fields: &[&str], width: u8, districts: &[(&str, &str)]) {
    let mut table = TableWriterBuilder::new();
    for field in fields {
        table = table.add_character_field(FieldName::try_from(*field).unwrap(), width);
    }

    let mut writer = Writer::from_path(path, table).unwrap();
    for (i, (geoid, name)) in districts.iter().enumerate() {
        let mut record = dbase::Record::default();
        record.insert(
            fields[0].to_string(),
            FieldValue::Character(Some(geoid.to_string())),
        );
        record.insert(
            fields[1].to_string(),
            FieldValue::Character(Some(name.to_string())),
        );
        writer
            .write_shape_and_record(&square(i as f64), &record)
            .unwrap();
    }
    drop(writer);

    std::fs::write(path.with_extension("prj"), NAD83_PRJ).unwrap();
    std::fs::write(path.with_extension("cpg"), TIGER_CPG).unwrap();
}

fn config_for(temp_dir: &TempDir) -> TomlConfig {
    let root = temp_dir.path().display();
    let toml_content = format!(
        r#"
[pipeline]
name = "boundaries"
version = "1.0"

[boundaries]
raw_path = "{root}/data_raw/unsd_shps/"
clean_path = "{root}/data_clean/"
"#
    );
    TomlConfig::from_toml_str(&toml_content).unwrap()
}

fn character(record: &dbase::Record, field: &str) -> String {
    match record.get(field) {
        Some(FieldValue::Character(Some(value))) => value.trim().to_string(),
        other => panic!("unexpected value for {}: {:?}", field, other),
    }
}

#[tokio::test]
async fn test_merge_state_shapefiles() {
    let temp_dir = TempDir::new().unwrap();
    let raw = temp_dir.path().join("data_raw/unsd_shps");
    std::fs::create_dir_all(&raw).unwrap();

    write_state_layer(
        &raw.join("tl_2016_01_unsd.shp"),
        &["GEOID", "NAME"],
        &[("0100005", "Albertville City"), ("0100006", "Marshall County")],
    );
    write_state_layer(
        &raw.join("tl_2016_56_unsd.shp"),
        &["GEOID", "NAME"],
        &[("5600730", "Albany County School District 1")],
    );
    // Not part of the unified district series
    write_state_layer(
        &raw.join("tl_2016_01_elsd.shp"),
        &["GEOID", "NAME"],
        &[("0199999", "Elementary Only")],
    );

    let config = config_for(&temp_dir);
    let pipeline = BoundaryPipeline::new(config.boundaries.unwrap());
    let output_path = EtlEngine::new(pipeline).run().await.unwrap();

    assert!(output_path.ends_with("unsd_compiled.shp"));
    let output = Path::new(&output_path);
    assert!(output.with_extension("shx").exists());
    assert!(output.with_extension("dbf").exists());
    assert_eq!(
        std::fs::read_to_string(output.with_extension("prj")).unwrap(),
        NAD83_PRJ
    );
    assert_eq!(
        std::fs::read_to_string(output.with_extension("cpg")).unwrap(),
        TIGER_CPG
    );

    let mut reader = shapefile::Reader::from_path(output).unwrap();
    let features: Vec<(Shape, dbase::Record)> = reader
        .iter_shapes_and_records()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(features.len(), 3);
    assert!(features
        .iter()
        .all(|(shape, _)| matches!(shape, Shape::Polygon(_))));

    let geoids: Vec<String> = features
        .iter()
        .map(|(_, record)| character(record, "GEOID"))
        .collect();
    assert_eq!(geoids, vec!["0100005", "0100006", "5600730"]);
    assert_eq!(
        character(&features[2].1, "NAME"),
        "Albany County School District 1"
    );
}

#[tokio::test]
async fn test_mismatched_attribute_fields_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let raw = temp_dir.path().join("data_raw/unsd_shps");
    std::fs::create_dir_all(&raw).unwrap();

    write_state_layer(
        &raw.join("tl_2016_01_unsd.shp"),
        &["GEOID", "NAME"],
        &[("0100005", "Albertville City")],
    );
    write_state_layer(
        &raw.join("tl_2016_02_unsd.shp"),
        &["GEOID", "NAMELSAD"],
        &[("0200001", "Anchorage School District")],
    );

    let config = config_for(&temp_dir);
    let pipeline = BoundaryPipeline::new(config.boundaries.unwrap());

    let sources = pipeline.extract().await.unwrap();
    assert_eq!(sources.len(), 2);
    assert!(matches!(
        pipeline.transform(sources).await,
        Err(EtlError::SchemaMismatchError { .. })
    ));
}

#[tokio::test]
async fn test_narrower_attribute_field_is_rejected_before_writing() {
    let temp_dir = TempDir::new().unwrap();
    let raw = temp_dir.path().join("data_raw/unsd_shps");
    std::fs::create_dir_all(&raw).unwrap();

    write_layer_with_width(
        &raw.join("tl_2016_01_unsd.shp"),
        &["GEOID", "NAME"],
        10,
        &[("0100005", "Albertvil")],
    );
    write_layer_with_width(
        &raw.join("tl_2016_02_unsd.shp"),
        &["GEOID", "NAME"],
        100,
        &[("0200001", "Anchorage Borough School District")],
    );

    let config = config_for(&temp_dir);
    let pipeline = BoundaryPipeline::new(config.boundaries.unwrap());

    let result = EtlEngine::new(pipeline).run().await;
    assert!(matches!(
        result,
        Err(EtlError::SchemaMismatchError { ref source_name, .. }) if source_name.ends_with("tl_2016_02_unsd.shp")
    ));
    assert!(!temp_dir
        .path()
        .join("data_clean/unsd_compiled.shp")
        .exists());
}

#[tokio::test]
async fn test_no_matching_shapefiles() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::create_dir_all(temp_dir.path().join("data_raw/unsd_shps")).unwrap();

    let config = config_for(&temp_dir);
    let pipeline = BoundaryPipeline::new(config.boundaries.unwrap());

    let result = EtlEngine::new(pipeline).run().await;
    assert!(matches!(result, Err(EtlError::NoInputFiles { .. })));
}
