use masked_cells::dispatch::{call, ufunc, Dispatched, Func, Operand, Params, UFuncMethod};
use masked_cells::kernel::UFunc;
use masked_cells::{masked_array, X};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let a = masked_array![[1, 2, X], [4, X, 6]];

    // Elementwise kernels and their methods.
    let sum = ufunc(UFunc::Add, UFuncMethod::Reduce, &[Operand::from(&a)], &Params::new().axis(0))?
        .into_result()?;
    println!("column sums: {sum:?}");

    // Whole-array functions.
    let median = call(Func::Median, &[Operand::from(&a)], &Params::new().axis(1))?
        .into_result()?
        .into_masked()?;
    println!("row medians: {median:?}");

    // Kernels with several outputs have no masked strategy.
    match ufunc(UFunc::Modf, UFuncMethod::Call, &[Operand::from(&a)], &Params::new())? {
        Dispatched::Handled(_) => unreachable!(),
        Dispatched::Declined(reason) => println!("declined: {reason}"),
    }
    Ok(())
}
