use masked_cells::{masked_array, CellValue, MinMax, X};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Hourly readings with two sensor dropouts.
    let readings = masked_array![[12.5, X, 14.0], [15.5, 16.0, X]];
    assert_eq!(readings.count(), 4);

    // Masks propagate through arithmetic.
    let scaled = &readings * CellValue::from(2.0);
    assert_eq!(scaled.mask(), readings.mask());

    // Reductions skip masked cells.
    let mean = readings.mean(None, false)?.into_scalar()?;
    assert_eq!(mean.value(), Some(CellValue::Float64(14.5)));
    let per_row = readings.max(Some(1), false)?.into_array();
    assert_eq!(per_row.filled(0.0).to_vec::<f64>()?, vec![14.0, 16.0]);

    // Masked cells sort to the end.
    let sorted = readings.sorted(None)?;
    println!("sorted: {sorted:?}");
    println!("filled: {:?}", readings.filled(MinMax::Max));
    Ok(())
}
