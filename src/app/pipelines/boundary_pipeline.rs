use crate::domain::model::{BoundaryFeature, BoundarySource, FieldSpec, MergedLayer};
use crate::domain::ports::{ConfigProvider, Pipeline};
use crate::utils::error::{EtlError, Result};
use shapefile::dbase;
use shapefile::{Shape, Writer};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PATTERN: &str = "tl_2016_*_unsd.shp";

/// Merges the per-state boundary shapefiles into one layer.
pub struct BoundaryPipeline<C: ConfigProvider> {
    config: C,
}

impl<C: ConfigProvider> BoundaryPipeline<C> {
    pub fn new(config: C) -> Self {
        Self { config }
    }

    fn discover(&self) -> Result<Vec<PathBuf>> {
        let pattern = Path::new(self.config.raw_path()).join(self.config.file_pattern());
        let pattern = pattern.to_string_lossy();
        tracing::debug!("Looking for shapefiles matching {}", pattern);

        let mut paths: Vec<PathBuf> = glob::glob(&pattern)?
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::warn!("Skipping unreadable path: {}", e);
                    None
                }
            })
            .collect();
        paths.sort();
        Ok(paths)
    }
}

pub fn read_boundary_source(shp_path: &Path) -> Result<BoundarySource> {
    let fields = {
        let table = dbase::Reader::from_path(shp_path.with_extension("dbf"))?;
        table
            .fields()
            .iter()
            .map(|field| FieldSpec {
                name: field.name().to_string(),
                field_type: field.field_type(),
                length: field.length(),
            })
            .collect()
    };

    let projection = read_sidecar(shp_path, "prj")?;
    let encoding = read_sidecar(shp_path, "cpg")?;

    let mut reader = shapefile::Reader::from_path(shp_path)?;
    let shape_type = reader.header().shape_type;

    let mut features = Vec::new();
    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;
        features.push(BoundaryFeature { shape, record });
    }

    Ok(BoundarySource {
        shp_path: shp_path.to_path_buf(),
        shape_type,
        fields,
        projection,
        encoding,
        features,
    })
}

fn read_sidecar(shp_path: &Path, extension: &str) -> Result<Option<String>> {
    let path = shp_path.with_extension(extension);
    if path.exists() {
        Ok(Some(fs::read_to_string(&path)?))
    } else {
        Ok(None)
    }
}

fn describe_fields(fields: &[FieldSpec]) -> String {
    fields
        .iter()
        .map(FieldSpec::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Concatenates sources in order. Shape type and attribute field definitions (name, type and
/// width) must agree across all of them, since every record is written with the first file's table.
pub fn merge_sources(sources: Vec<BoundarySource>) -> Result<MergedLayer> {
    let first = sources.first().ok_or_else(|| EtlError::ProcessingError {
        message: "no boundary sources to merge".to_string(),
    })?;

    let shape_type = first.shape_type;
    let fields = first.fields.clone();
    let template_dbf = first.dbf_path();
    let projection = first.projection.clone();
    let encoding = first.encoding.clone();

    let mut features = Vec::with_capacity(sources.iter().map(|s| s.features.len()).sum());
    let mut null_shapes = 0usize;

    for source in sources {
        let source_name = source.shp_path.display().to_string();
        if source.shape_type != shape_type {
            return Err(EtlError::SchemaMismatchError {
                source_name,
                reason: format!(
                    "shape type {:?} differs from {:?}",
                    source.shape_type, shape_type
                ),
            });
        }
        if source.fields != fields {
            return Err(EtlError::SchemaMismatchError {
                source_name,
                reason: format!(
                    "attribute fields [{}] differ from [{}]",
                    describe_fields(&source.fields),
                    describe_fields(&fields)
                ),
            });
        }
        if source.projection.is_some() && source.projection != projection {
            tracing::warn!("{} uses a different projection than the first file", source_name);
        }

        for feature in source.features {
            if matches!(feature.shape, Shape::NullShape) {
                null_shapes += 1;
                continue;
            }
            features.push(feature);
        }
    }

    if null_shapes > 0 {
        tracing::warn!("Dropped {} features without geometry", null_shapes);
    }

    Ok(MergedLayer {
        shape_type,
        template_dbf,
        projection,
        encoding,
        features,
    })
}

#[async_trait::async_trait]
impl<C: ConfigProvider> Pipeline for BoundaryPipeline<C> {
    type Extracted = Vec<BoundarySource>;
    type Transformed = MergedLayer;

    fn name(&self) -> &str {
        "school district boundaries"
    }

    async fn extract(&self) -> Result<Vec<BoundarySource>> {
        let paths = self.discover()?;
        if paths.is_empty() {
            return Err(EtlError::NoInputFiles {
                path: Path::new(self.config.raw_path())
                    .join(self.config.file_pattern())
                    .display()
                    .to_string(),
            });
        }

        let mut sources = Vec::with_capacity(paths.len());
        for path in paths {
            let source = read_boundary_source(&path)?;
            tracing::info!(
                "Reading {}: {} features",
                path.display(),
                source.features.len()
            );
            sources.push(source);
        }

        Ok(sources)
    }

    async fn transform(&self, data: Vec<BoundarySource>) -> Result<MergedLayer> {
        merge_sources(data)
    }

    async fn load(&self, result: MergedLayer) -> Result<String> {
        let clean_path = Path::new(self.config.clean_path());
        fs::create_dir_all(clean_path)?;
        let output_path = clean_path.join(self.config.output_name());

        tracing::debug!(
            "Writing {} {:?} features using fields of {}",
            result.features.len(),
            result.shape_type,
            result.template_dbf.display()
        );

        let template = dbase::Reader::from_path(&result.template_dbf)?;
        let table_builder = dbase::TableWriterBuilder::from_reader(template);
        let mut writer = Writer::from_path(&output_path, table_builder)?;
        for feature in &result.features {
            let record = &feature.record;
            match &feature.shape {
                Shape::Point(s) => writer.write_shape_and_record(s, record)?,
                Shape::PointM(s) => writer.write_shape_and_record(s, record)?,
                Shape::PointZ(s) => writer.write_shape_and_record(s, record)?,
                Shape::Polyline(s) => writer.write_shape_and_record(s, record)?,
                Shape::PolylineM(s) => writer.write_shape_and_record(s, record)?,
                Shape::PolylineZ(s) => writer.write_shape_and_record(s, record)?,
                Shape::Polygon(s) => writer.write_shape_and_record(s, record)?,
                Shape::PolygonM(s) => writer.write_shape_and_record(s, record)?,
                Shape::PolygonZ(s) => writer.write_shape_and_record(s, record)?,
                Shape::Multipoint(s) => writer.write_shape_and_record(s, record)?,
                Shape::MultipointM(s) => writer.write_shape_and_record(s, record)?,
                Shape::MultipointZ(s) => writer.write_shape_and_record(s, record)?,
                Shape::Multipatch(s) => writer.write_shape_and_record(s, record)?,
                Shape::NullShape => {}
            }
        }
        // Headers and the .shx index are finalized on drop
        drop(writer);

        if let Some(projection) = &result.projection {
            fs::write(output_path.with_extension("prj"), projection)?;
        }
        if let Some(encoding) = &result.encoding {
            fs::write(output_path.with_extension("cpg"), encoding)?;
        }

        Ok(output_path.display().to_string())
    }
}
