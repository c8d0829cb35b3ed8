//! Simple example of converting a Voltcraft log to CSV and Parquet.

use voltcraft_parser::{stats, HistoryWriter, OutputFormat, PowerLogReader};

fn main() -> Result<(), voltcraft_parser::Error> {
    // Decode every block in the file
    let log = PowerLogReader::from_file("A0000001")?.read_all()?;

    println!(
        "Read {} samples in {} block(s)",
        log.sample_count(),
        log.blocks.len()
    );

    let mut samples = log.into_samples();
    stats::prepare(&mut samples);

    let writer = HistoryWriter::new("output").formats(&[OutputFormat::Csv, OutputFormat::Parquet]);
    println!("{}", writer.write(&samples)?.summary());
    writer.write_statistics(&samples)?;

    println!("Wrote history to ./output");

    Ok(())
}
