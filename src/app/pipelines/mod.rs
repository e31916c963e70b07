pub mod boundary_pipeline;
pub mod school_district_pipeline;

pub use boundary_pipeline::BoundaryPipeline;
pub use school_district_pipeline::SchoolDistrictPipeline;
