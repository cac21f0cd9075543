use std::io::Write;
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, IntoParallelRefMutIterator, ParallelIterator};
use serde::{Deserialize, Serialize};

use crate::diagnostics::DiagnosticSink;
use crate::errors::LutError;
use crate::storage::{Axis, TableValues};

type Sampler = Box<dyn Fn(f64, f64) -> f64 + Send + Sync>;

///
/// Dense tabulated approximation of an expensive two-variable function,
/// queried with bilinear interpolation. The table is rebuilt from the
/// sampling closure whenever an axis or the closure itself changes, and it
/// exists either fully populated or not at all.
///
/// Queries outside the sampled range are answered by linearly extending
/// the boundary cell. An optional [`DiagnosticSink`] is notified when that
/// happens; without one the extrapolation is silent.
///
/// Serialized tables keep their axes and values but not the sampling
/// closure, so a loaded table answers queries yet will not rebuild until a
/// sampler is set again.
///
#[derive(Default, Serialize, Deserialize)]
pub struct BilinearTable
{
    x: Axis,
    y: Axis,
    data: Option<TableValues>,
    #[serde(skip)]
    sampler: Option<Sampler>,
    #[serde(skip)]
    diagnostics: Option<Box<dyn DiagnosticSink>>,
}

impl BilinearTable
{
    pub fn new() -> Self
    {
        Self::default()
    }

    ///
    /// Configures the x axis from two bounds (in either order) and a node
    /// count, discarding any existing values. The table is rebuilt
    /// immediately when a sampler is present and both axes are usable;
    /// degenerate input (`count < 2`, zero width) just leaves it unbuilt.
    ///
    pub fn set_x_range(&mut self, a: f64, b: f64, count: usize)
    {
        self.x = Axis::new(a, b, count);
        self.rebuild();
    }

    /// Same as `set_x_range` for the y axis.
    pub fn set_y_range(&mut self, a: f64, b: f64, count: usize)
    {
        self.y = Axis::new(a, b, count);
        self.rebuild();
    }

    ///
    /// Installs the sampling closure and rebuilds if both axes are usable.
    /// The closure should be deterministic, otherwise the table contents
    /// depend on when the build happened to run.
    ///
    pub fn set_sampler<F: Fn(f64, f64) -> f64 + Send + Sync + 'static>(&mut self, f: F)
    {
        self.sampler = Some(Box::new(f));
        self.rebuild();
    }

    /// Installs a sink notified on out-of-range queries.
    pub fn set_diagnostics<S: DiagnosticSink + 'static>(&mut self, sink: S)
    {
        self.diagnostics = Some(Box::new(sink));
    }

    fn rebuild(&mut self)
    {
        self.data = None;
        if !self.x.is_usable() || !self.y.is_usable()
        {
            return;
        }
        if let Some(f) = &self.sampler
        {
            self.data = Some(TableValues::sample(&self.x, &self.y, f));
        }
    }

    /// True once the table holds values consistent with the current axes.
    #[inline]
    pub fn is_ready(&self) -> bool
    {
        self.data.is_some()
    }

    #[inline(always)]
    pub fn x_axis(&self) -> &Axis
    {
        &self.x
    }

    #[inline(always)]
    pub fn y_axis(&self) -> &Axis
    {
        &self.y
    }

    ///
    /// Bilinear interpolation at `(x, y)`: linear along x at the cell's two
    /// rows, then linear along y between those values. Out-of-range points
    /// use the nearest boundary cell, extended linearly.
    ///
    #[inline]
    pub fn interpolate(&self, x: f64, y: f64) -> Result<f64, LutError>
    {
        let data = match &self.data
        {
            Some(data) => data,
            None => return Err(LutError::TableNotBuilt),
        };
        let (ix, clamped_x) = self.x.cell_index(x);
        let (iy, clamped_y) = self.y.cell_index(y);
        if clamped_x || clamped_y
        {
            if let Some(sink) = &self.diagnostics
            {
                sink.extrapolated(x, y);
            }
        }
        let tx = x - self.x.node(ix);
        let ty = y - self.y.node(iy);
        let zy0 = tx * (data[(iy, ix + 1)] - data[(iy, ix)]) / self.x.step() + data[(iy, ix)];
        let zy1 = tx * (data[(iy + 1, ix + 1)] - data[(iy + 1, ix)]) / self.x.step() + data[(iy + 1, ix)];
        Ok(ty * (zy1 - zy0) / self.y.step() + zy0)
    }

    ///
    /// Like `interpolate`, but answers `0.0` for an unbuilt table. Callers
    /// treating the table as an optional accelerator can use this and test
    /// `is_ready` once instead of handling a `Result` per query.
    ///
    #[inline]
    pub fn interpolate_or_zero(&self, x: f64, y: f64) -> f64
    {
        self.interpolate(x, y).unwrap_or(0.0)
    }

    #[inline]
    pub fn interpolate_batch(&self, points: &[[f64; 2]]) -> Vec<Result<f64, LutError>>
    {
        let mut results = vec![Ok(0.0); points.len()];
        points.par_iter().zip(results.par_iter_mut()).for_each(
            |(point, value)|
            {
                *value = self.interpolate(point[0], point[1]);
            }
        );
        results
    }

    ///
    /// Saves axes and values (compressed using LZ4).
    ///
    pub fn save(&self, path: &str) -> Result<(), LutError>
    {
        let mut file = std::io::BufWriter::new(std::fs::File::create(path).map_err(|_| LutError::FileIOError)?);
        let buffer = self.write_buffer()?;
        file.write_all(&buffer).map_err(|_| LutError::WriteBufferFailed)?;
        Ok(())
    }

    pub fn write_buffer(&self) -> Result<Vec<u8>, LutError>
    {
        let bytes = bincode::serde::encode_to_vec(self, bincode::config::standard()).map_err(|_| LutError::SerializationFailed)?;
        Ok(lz4_flex::compress_prepend_size(&bytes))
    }

    pub fn read_buffer(buffer: &[u8]) -> Result<Self, LutError>
    {
        let buffer = lz4_flex::decompress_size_prepended(buffer).map_err(|_| LutError::LZ4DecompressionFailed)?;
        let (table, _) = bincode::serde::decode_from_slice(&buffer, bincode::config::standard()).map_err(|_| LutError::DeserializationFailed)?;
        Ok(table)
    }

    pub fn read<Reader: std::io::Read>(mut reader: Reader) -> Result<Self, LutError>
    {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).map_err(|_| LutError::ReadBufferFailed)?;
        Self::read_buffer(&bytes)
    }
}

#[cfg(test)]
use std::sync::Arc;
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(test)]
struct CountingSink
{
    hits: Arc<AtomicUsize>,
}

#[cfg(test)]
impl DiagnosticSink for CountingSink
{
    fn extrapolated(&self, _x: f64, _y: f64)
    {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }
}

#[test]
fn values_are_exact_at_every_node()
{
    let mut table = BilinearTable::new();
    table.set_x_range(0.0, 10.0, 11);
    table.set_y_range(0.0, 5.0, 6);
    table.set_sampler(|x, y| x + y);
    assert!(table.is_ready());
    for j in 0..6
    {
        for k in 0..11
        {
            let x = table.x_axis().node(k);
            let y = table.y_axis().node(j);
            assert_eq!(table.interpolate(x, y).unwrap(), x + y);
        }
    }
    assert_eq!(table.interpolate(2.5, 1.5).unwrap(), 4.0);
}

#[test]
fn linear_functions_are_reproduced_between_nodes()
{
    use approx::assert_relative_eq;
    let mut table = BilinearTable::new();
    table.set_x_range(0.0, 10.0, 11);
    table.set_y_range(0.0, 5.0, 6);
    table.set_sampler(|x, y| 2.0 * x - 3.0 * y + 1.0);
    for &(x, y) in &[(1.25, 3.75), (0.1, 4.9), (9.99, 0.01), (5.0, 2.5)]
    {
        assert_relative_eq!(table.interpolate(x, y).unwrap(), 2.0 * x - 3.0 * y + 1.0, max_relative = 1e-12);
    }
    // exactly on a cell boundary, approached from either cell
    assert_relative_eq!(table.interpolate(3.0, 2.5).unwrap(), 2.0 * 3.0 - 3.0 * 2.5 + 1.0, max_relative = 1e-12);
}

#[test]
fn out_of_range_queries_extend_the_boundary_cell()
{
    let mut table = BilinearTable::new();
    table.set_x_range(0.0, 10.0, 11);
    table.set_y_range(0.0, 5.0, 6);
    table.set_sampler(|x, y| x + y);
    // linear data, so the clamped-cell extension stays on the plane
    assert_eq!(table.interpolate(-2.0, -1.0).unwrap(), -3.0);
    assert_eq!(table.interpolate(12.0, 7.0).unwrap(), 19.0);

    // bilinear data: extension of the corner cell, worked by hand
    let mut table = BilinearTable::new();
    table.set_x_range(0.0, 4.0, 5);
    table.set_y_range(0.0, 4.0, 5);
    table.set_sampler(|x, y| x * y);
    assert_eq!(table.interpolate(6.0, 1.5).unwrap(), 9.0);
}

#[test]
fn unbuilt_table_degrades_instead_of_failing()
{
    let table = BilinearTable::new();
    assert!(!table.is_ready());
    assert_eq!(table.interpolate(1.0, 1.0), Err(LutError::TableNotBuilt));
    assert_eq!(table.interpolate_or_zero(1.0, 1.0), 0.0);

    // axes alone are not enough
    let mut table = BilinearTable::new();
    table.set_x_range(0.0, 10.0, 11);
    table.set_y_range(0.0, 5.0, 6);
    assert!(!table.is_ready());

    // a sampler alone is not enough either
    let mut table = BilinearTable::new();
    table.set_sampler(|x, y| x + y);
    assert!(!table.is_ready());
    table.set_x_range(0.0, 10.0, 11);
    assert!(!table.is_ready());
    table.set_y_range(0.0, 5.0, 6);
    assert!(table.is_ready());
}

#[test]
fn degenerate_axes_skip_the_build()
{
    let mut table = BilinearTable::new();
    table.set_sampler(|x, y| x + y);
    table.set_y_range(0.0, 5.0, 6);
    table.set_x_range(0.0, 10.0, 0);
    assert!(!table.is_ready());
    table.set_x_range(0.0, 10.0, 1);
    assert!(!table.is_ready());
    table.set_x_range(5.0, 5.0, 11);
    assert!(!table.is_ready());
    table.set_x_range(0.0, 10.0, 2);
    assert!(table.is_ready());
}

#[test]
fn reconfiguration_invalidates_previous_results()
{
    let mut table = BilinearTable::new();
    table.set_x_range(0.0, 10.0, 11);
    table.set_y_range(0.0, 1.0, 2);
    table.set_sampler(|x, _| x * x);
    // node spacing 1.0: x=2.5 interpolates between 4 and 9
    assert_eq!(table.interpolate(2.5, 0.0).unwrap(), 6.5);

    // coarser x axis: one cell from 0 to 100
    table.set_x_range(0.0, 10.0, 2);
    assert_eq!(table.interpolate(2.5, 0.0).unwrap(), 25.0);

    // new sampler replaces the values outright
    table.set_x_range(0.0, 10.0, 11);
    table.set_sampler(|x, y| x + y);
    assert_eq!(table.interpolate(2.5, 0.5).unwrap(), 3.0);
}

#[test]
fn batch_queries_match_scalar_queries()
{
    let mut table = BilinearTable::new();
    table.set_x_range(0.0, 10.0, 21);
    table.set_y_range(0.0, 5.0, 11);
    table.set_sampler(|x, y| x * x + y);
    let points: Vec<[f64; 2]> = (0..200).map(|i| [i as f64 * 0.06 - 1.0, i as f64 * 0.03]).collect();
    let batch = table.interpolate_batch(&points);
    for (point, value) in points.iter().zip(batch)
    {
        assert_eq!(value, table.interpolate(point[0], point[1]));
    }
}

#[test]
fn diagnostics_fire_on_clamping_only()
{
    let hits = Arc::new(AtomicUsize::new(0));
    let mut table = BilinearTable::new();
    table.set_x_range(0.0, 10.0, 11);
    table.set_y_range(0.0, 5.0, 6);
    table.set_sampler(|x, y| x + y);
    table.set_diagnostics(CountingSink { hits: hits.clone() });

    table.interpolate(2.5, 1.5).unwrap();
    assert_eq!(hits.load(Ordering::Relaxed), 0);
    table.interpolate(12.0, 1.5).unwrap();
    table.interpolate(2.5, -1.0).unwrap();
    assert_eq!(hits.load(Ordering::Relaxed), 2);
}

#[test]
fn serialized_table_answers_but_does_not_rebuild()
{
    let mut table = BilinearTable::new();
    table.set_x_range(0.0, 10.0, 11);
    table.set_y_range(0.0, 5.0, 6);
    table.set_sampler(|x, y| x * y + 1.0);

    let buffer = table.write_buffer().unwrap();
    println!("buffer size={}", buffer.len());
    let loaded = BilinearTable::read_buffer(&buffer).unwrap();
    assert!(loaded.is_ready());
    assert_eq!(loaded.interpolate(2.5, 1.5), table.interpolate(2.5, 1.5));

    // no sampler travels with the buffer, so a reconfigured copy stays unbuilt
    let mut loaded = BilinearTable::read_buffer(&buffer).unwrap();
    loaded.set_x_range(0.0, 20.0, 11);
    assert!(!loaded.is_ready());
}
