/// Sample-partition aggregation and the tone curve.
pub mod aggregate;
/// Region copy for spatially partitioned results.
pub mod region;
