//! Build a small sheet, fill one column of formulas by copying, and
//! round-trip it through a file.
//!
//! Run with: `cargo run --example build_report`

use tally::prelude::*;

fn main() -> Result<()> {
    let mut sheet = Sheet::new();

    // Quantities in column A, unit prices in column B.
    for (row, (qty, price)) in [(3, 19.99), (1, 249.0), (12, 4.5)].iter().enumerate() {
        sheet.set_cell(Position::new(row as i32, 0), &qty.to_string())?;
        sheet.set_cell(Position::new(row as i32, 1), &price.to_string())?;
    }

    // Line total for the first row, then copy it down the column. The
    // relative references rebind per row.
    sheet.set_cell("C0".parse()?, "=A0*B0")?;
    sheet.copy_rect("C1".parse()?, "C0".parse()?, 1, 1);
    sheet.copy_rect("C2".parse()?, "C0".parse()?, 1, 1);

    // Grand total with pinned column references.
    sheet.set_cell("C4".parse()?, "=$C0+$C1+$C2")?;

    for row in 0..3 {
        let total = sheet.get_value(Position::new(row, 2));
        println!("line {row}: {total}");
    }
    println!("grand total: {}", sheet.get_value("C4".parse()?));

    let path = std::env::temp_dir().join("tally_report.bin");
    sheet.save_to(&path)?;
    let restored = Sheet::open(&path)?;
    println!(
        "round-tripped through {}: grand total {}",
        path.display(),
        restored.get_value("C4".parse()?)
    );

    Ok(())
}
