use pvlut::algorithms::extremum::{bisect_max, ternary_max};
use pvlut::diagnostics::ExtrapolationWarning;
use pvlut::errors::LutError;
use pvlut::tables::bilinear::BilinearTable;

// Toy panel model: short-circuit current scales with irradiance, the knee
// voltage drifts down as the cell heats up. Good enough to give the search
// a realistic unimodal power curve.
fn panel_current(v: f64, g: f64, t: f64) -> f64
{
    let voc = 21.9 - 0.08 * (t - 25.0);
    let isc = 8.02 * g / 1000.0;
    if v >= voc
    {
        0.0
    }
    else
    {
        isc * (1.0 - (v / voc).powi(12))
    }
}

fn mpp_voltage(g: f64, t: f64) -> f64
{
    ternary_max(0.0, 25.0, 1e-9, |v| v * panel_current(v, g, t))
}

fn build_vmp_table() -> Result<(), LutError>
{
    println!("\nRunning \"build_vmp_table\" demo\n");
    // Tabulate the maximum power voltage over irradiance and temperature,
    // then query the table instead of re-running the search per sample.
    let mut table = BilinearTable::new();
    table.set_x_range(100.0, 1000.0, 19);
    table.set_y_range(0.0, 75.0, 16);
    table.set_diagnostics(ExtrapolationWarning::new());
    table.set_sampler(mpp_voltage);

    let (g, t) = (640.0, 31.0);
    let fast = table.interpolate(g, t)?;
    let exact = mpp_voltage(g, t);
    println!("G={g} W/m2, T={t} C: table {fast:.4} V, direct search {exact:.4} V");

    // Out of the sampled range: answered by extending the boundary cell,
    // and the sink warns once.
    let clipped = table.interpolate(1200.0, 80.0)?;
    println!("G=1200 W/m2, T=80 C (extrapolated): {clipped:.4} V");
    let _ = table.interpolate(1500.0, 90.0)?;

    let buffer = table.write_buffer()?;
    let loaded = BilinearTable::read_buffer(&buffer)?;
    println!("round-tripped table: {} bytes, query {:.4} V", buffer.len(), loaded.interpolate(g, t)?);
    Ok(())
}

fn search_power_curve()
{
    println!("\nRunning \"search_power_curve\" demo\n");
    let (g, t) = (850.0, 42.0);
    let vmp = bisect_max(0.0, 25.0, 1e-6, |v| v * panel_current(v, g, t));
    let pmp = vmp * panel_current(vmp, g, t);
    println!("G={g} W/m2, T={t} C: Vmp={vmp:.4} V, Pmp={pmp:.2} W");
}

fn main()
{
    tracing_subscriber::fmt().init();
    build_vmp_table().unwrap();
    search_power_curve();
}
