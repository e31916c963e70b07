use crate::core::school_districts::{
    default_columns, normalize_header, sheet_to_records, sort_by_state_year,
};
use crate::core::spreadsheet::{is_raw_spreadsheet, read_first_sheet};
use crate::domain::model::{DistrictTable, OutputFormat, RawSheet, Record};
use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
use crate::utils::error::{EtlError, Result};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::path::Path;

/// Stacks the yearly school district finance sheets into one table.
pub struct SchoolDistrictPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> SchoolDistrictPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    fn columns(&self) -> Vec<String> {
        let configured = self.config.columns();
        if configured.is_empty() {
            default_columns()
        } else {
            configured.iter().map(|c| normalize_header(c)).collect()
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for SchoolDistrictPipeline<S, C> {
    type Extracted = Vec<RawSheet>;
    type Transformed = DistrictTable;

    fn name(&self) -> &str {
        "school districts"
    }

    async fn extract(&self) -> Result<Vec<RawSheet>> {
        let raw_path = self.config.raw_path();
        let mut sheets = Vec::new();

        for file_name in self.storage.list_files(raw_path).await? {
            if !is_raw_spreadsheet(&file_name) {
                tracing::warn!("Skipping {}: not a spreadsheet", file_name);
                continue;
            }

            let path = join(raw_path, &file_name);
            let bytes = self.storage.read_file(&path).await?;
            let sheet = read_first_sheet(&file_name, bytes)?;
            tracing::info!("Reading {}: {}...", sheet.year, file_name);
            sheets.push(sheet);
        }

        if sheets.is_empty() {
            return Err(EtlError::NoInputFiles {
                path: raw_path.to_string(),
            });
        }

        Ok(sheets)
    }

    async fn transform(&self, data: Vec<RawSheet>) -> Result<DistrictTable> {
        let columns = self.columns();
        let mut records = Vec::new();

        for sheet in &data {
            tracing::debug!("Creating STATE and YRDATA columns for {}", sheet.file_name);
            let sheet_records = sheet_to_records(sheet, &columns)?;
            tracing::debug!("{}: {} districts", sheet.file_name, sheet_records.len());
            records.extend(sheet_records);
        }

        tracing::debug!("Sorting {} records by state and year", records.len());
        sort_by_state_year(&mut records);

        Ok(DistrictTable { columns, records })
    }

    async fn load(&self, result: DistrictTable) -> Result<String> {
        let clean_path = self.config.clean_path();
        let mut primary = None;

        for format in self.config.output_formats() {
            let file_name = output_file_name(self.config.output_name(), format);
            let bytes = render(&result, format)?;
            let path = join(clean_path, &file_name);

            tracing::debug!("Writing {} ({} bytes)", path, bytes.len());
            self.storage.write_file(&path, &bytes).await?;

            primary.get_or_insert(path);
        }

        primary.ok_or_else(|| EtlError::ConfigError {
            message: "no output format configured".to_string(),
        })
    }
}

fn join(dir: &str, file_name: &str) -> String {
    Path::new(dir).join(file_name).to_string_lossy().into_owned()
}

/// Keeps the configured name when its extension already matches, otherwise swaps the extension.
pub fn output_file_name(clean_name: &str, format: OutputFormat) -> String {
    let path = Path::new(clean_name);
    let matches = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(format.extension()))
        .unwrap_or(false);

    if matches {
        clean_name.to_string()
    } else {
        path.with_extension(format.extension())
            .to_string_lossy()
            .into_owned()
    }
}

pub fn render(table: &DistrictTable, format: OutputFormat) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Csv => render_delimited(table, b','),
        OutputFormat::Tsv => render_delimited(table, b'\t'),
        OutputFormat::Json => {
            let rows: Vec<JsonRow> = table
                .records
                .iter()
                .map(|record| JsonRow {
                    columns: &table.columns,
                    record,
                })
                .collect();
            Ok(serde_json::to_vec_pretty(&rows)?)
        }
    }
}

/// A record serialized as a JSON object whose keys follow the table's column order.
struct JsonRow<'a> {
    columns: &'a [String],
    record: &'a Record,
}

impl Serialize for JsonRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for column in self.columns {
            map.serialize_entry(column, self.record.get(column))?;
        }
        map.end()
    }
}

fn render_delimited(table: &DistrictTable, delimiter: u8) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer.write_record(&table.columns)?;
    for record in &table.records {
        writer.write_record(table.columns.iter().map(|c| record.get(c)))?;
    }

    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn put(&self, path: &str, data: Vec<u8>) {
            self.files.lock().await.insert(path.to_string(), data);
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                EtlError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        async fn list_files(&self, dir: &str) -> Result<Vec<String>> {
            let files = self.files.lock().await;
            let mut names: Vec<String> = files
                .keys()
                .filter_map(|path| {
                    let path = Path::new(path);
                    (path.parent() == Some(Path::new(dir)))
                        .then(|| path.file_name()?.to_str().map(str::to_string))
                        .flatten()
                })
                .collect();
            names.sort();
            Ok(names)
        }
    }

    struct MockConfig {
        columns: Vec<String>,
        formats: Vec<OutputFormat>,
    }

    impl MockConfig {
        fn new() -> Self {
            Self {
                columns: Vec::new(),
                formats: vec![OutputFormat::Csv],
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn raw_path(&self) -> &str {
            "raw"
        }

        fn clean_path(&self) -> &str {
            "clean"
        }

        fn output_name(&self) -> &str {
            "us_school_districts.csv"
        }

        fn columns(&self) -> Vec<String> {
            self.columns.clone()
        }

        fn output_formats(&self) -> Vec<OutputFormat> {
            self.formats.clone()
        }
    }

    fn workbook(rows: &[&[&str]]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                worksheet.write_string(r as u32, c as u16, *value).unwrap();
            }
        }
        workbook.save_to_buffer().unwrap()
    }

    async fn seeded_storage() -> MockStorage {
        let storage = MockStorage::new();
        storage
            .put(
                "raw/elsec15.xlsx",
                workbook(&[
                    &["IDCENSUS", "NAME", "ENROLL", "TOTALREV"],
                    &["44500100100000", "Abbott ISD", "300", "5000"],
                    &["01500100100000", "Autauga County", "9000", "81000"],
                ]),
            )
            .await;
        storage
            .put(
                "raw/elsec92.xlsx",
                workbook(&[
                    &["ID", "NAME", "ENROLL"],
                    &["44000000000", "Abbott ISD", "280"],
                ]),
            )
            .await;
        storage.put("raw/README.txt", b"notes".to_vec()).await;
        storage
            .put("raw/.elsec15.xlsx", b"lock file left by a spreadsheet editor".to_vec())
            .await;
        storage
    }

    #[tokio::test]
    async fn test_extract_reads_spreadsheets_in_name_order() {
        let storage = seeded_storage().await;
        let pipeline = SchoolDistrictPipeline::new(storage, MockConfig::new());

        let sheets = pipeline.extract().await.unwrap();

        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].file_name, "elsec15.xlsx");
        assert_eq!(sheets[0].year, 2015);
        assert_eq!(sheets[1].year, 1992);
    }

    #[tokio::test]
    async fn test_extract_skips_hidden_files() {
        let storage = seeded_storage().await;
        assert!(storage.get_file("raw/.elsec15.xlsx").await.is_some());
        let pipeline = SchoolDistrictPipeline::new(storage, MockConfig::new());

        let sheets = pipeline.extract().await.unwrap();

        assert!(sheets.iter().all(|sheet| !sheet.file_name.starts_with('.')));
        assert_eq!(sheets.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_state_code_aborts_run() {
        let storage = seeded_storage().await;
        storage
            .put(
                "raw/elsec16.xlsx",
                workbook(&[
                    &["IDCENSUS", "NAME", "ENROLL"],
                    &["72500100100000", "Puerto Rico Department of Education", "350000"],
                ]),
            )
            .await;
        let pipeline = SchoolDistrictPipeline::new(storage.clone(), MockConfig::new());

        let result = crate::core::etl::EtlEngine::new(pipeline).run().await;

        assert!(matches!(
            result,
            Err(EtlError::UnknownStateCode { ref code, ref file_name }) if code == "72" && file_name == "elsec16.xlsx"
        ));
        assert!(storage
            .get_file("clean/us_school_districts.csv")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_extract_empty_directory() {
        let pipeline = SchoolDistrictPipeline::new(MockStorage::new(), MockConfig::new());
        assert!(matches!(
            pipeline.extract().await,
            Err(EtlError::NoInputFiles { .. })
        ));
    }

    #[tokio::test]
    async fn test_transform_concatenates_and_sorts() {
        let storage = seeded_storage().await;
        let pipeline = SchoolDistrictPipeline::new(storage, MockConfig::new());

        let sheets = pipeline.extract().await.unwrap();
        let table = pipeline.transform(sheets).await.unwrap();

        assert_eq!(table.columns, default_columns());
        let keys: Vec<(&str, &str)> = table
            .records
            .iter()
            .map(|r| (r.get("STATE"), r.get("YRDATA")))
            .collect();
        assert_eq!(
            keys,
            vec![("Alabama", "2015"), ("Texas", "1992"), ("Texas", "2015")]
        );
        assert_eq!(table.records[1].get("ENROLL"), "280");
    }

    #[tokio::test]
    async fn test_transform_with_custom_columns() {
        let storage = seeded_storage().await;
        let mut config = MockConfig::new();
        config.columns = vec!["state".to_string(), "name".to_string(), "yrdata".to_string()];
        let pipeline = SchoolDistrictPipeline::new(storage, config);

        let sheets = pipeline.extract().await.unwrap();
        let table = pipeline.transform(sheets).await.unwrap();

        assert_eq!(table.columns, vec!["STATE", "NAME", "YRDATA"]);
        assert_eq!(table.records[0].data.len(), 3);
    }

    #[tokio::test]
    async fn test_load_writes_csv_with_header() {
        let storage = seeded_storage().await;
        let pipeline = SchoolDistrictPipeline::new(storage.clone(), MockConfig::new());

        let sheets = pipeline.extract().await.unwrap();
        let table = pipeline.transform(sheets).await.unwrap();
        let output_path = pipeline.load(table).await.unwrap();

        assert_eq!(output_path, "clean/us_school_districts.csv");

        let csv = String::from_utf8(storage.get_file(&output_path).await.unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("STATE,ENROLL,NAME,YRDATA,TOTALREV,"));
        assert!(lines[1].starts_with("Alabama,9000,Autauga County,2015,81000,"));
    }

    #[tokio::test]
    async fn test_load_writes_every_configured_format() {
        let storage = seeded_storage().await;
        let mut config = MockConfig::new();
        config.formats = vec![OutputFormat::Csv, OutputFormat::Tsv, OutputFormat::Json];
        let pipeline = SchoolDistrictPipeline::new(storage.clone(), config);

        let sheets = pipeline.extract().await.unwrap();
        let table = pipeline.transform(sheets).await.unwrap();
        pipeline.load(table).await.unwrap();

        let tsv = storage.get_file("clean/us_school_districts.tsv").await.unwrap();
        assert!(String::from_utf8(tsv).unwrap().starts_with("STATE\tENROLL\tNAME"));

        let json = storage.get_file("clean/us_school_districts.json").await.unwrap();
        let rows: Vec<serde_json::Value> = serde_json::from_slice(&json).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["STATE"], "Alabama");
    }

    #[test]
    fn test_render_json_keeps_column_order() {
        let table = DistrictTable {
            columns: vec!["STATE".to_string(), "ENROLL".to_string(), "NAME".to_string()],
            records: vec![Record {
                data: [
                    ("NAME".to_string(), "Abbott ISD".to_string()),
                    ("STATE".to_string(), "Texas".to_string()),
                ]
                .into_iter()
                .collect(),
            }],
        };

        let json = String::from_utf8(render(&table, OutputFormat::Json).unwrap()).unwrap();
        let state = json.find("\"STATE\"").unwrap();
        let enroll = json.find("\"ENROLL\"").unwrap();
        let name = json.find("\"NAME\"").unwrap();
        assert!(state < enroll && enroll < name);
        assert!(json.contains("\"ENROLL\": \"\""));
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(
            output_file_name("us_school_districts.csv", OutputFormat::Csv),
            "us_school_districts.csv"
        );
        assert_eq!(
            output_file_name("us_school_districts.csv", OutputFormat::Json),
            "us_school_districts.json"
        );
        assert_eq!(output_file_name("districts", OutputFormat::Tsv), "districts.tsv");
    }

    #[test]
    fn test_render_quotes_embedded_commas() {
        let table = DistrictTable {
            columns: vec!["STATE".to_string(), "NAME".to_string()],
            records: vec![Record {
                data: [
                    ("STATE".to_string(), "Texas".to_string()),
                    ("NAME".to_string(), "Abbott, ISD".to_string()),
                ]
                .into_iter()
                .collect(),
            }],
        };

        let csv = String::from_utf8(render(&table, OutputFormat::Csv).unwrap()).unwrap();
        assert_eq!(csv, "STATE,NAME\nTexas,\"Abbott, ISD\"\n");
    }
}
