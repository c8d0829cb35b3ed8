//! Example showing block-by-block decoding from a stream.

use std::fs::File;
use voltcraft_parser::block::RecordParser;
use voltcraft_parser::cursor::ReaderSource;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Pull bytes from the file as they are needed
    let file = File::open("A0000001")?;
    let mut parser = RecordParser::new(ReaderSource::new(file));

    let mut total_samples = 0;
    let mut peak_power = 0.0f64;

    while let Some(block) = parser.next_block() {
        let mut block = block?;
        println!("BLOCK at offset {}: starts {}", block.offset(), block.start_time());

        for sample in block.by_ref() {
            let sample = sample?;
            total_samples += 1;
            peak_power = peak_power.max(sample.power);
        }

        println!(
            "  {} samples, {}",
            block.sample_count().unwrap_or(0),
            block.status().map(|s| s.to_string()).unwrap_or_default()
        );
        for warning in block.warnings() {
            println!("  warning: {}", warning);
        }
        let unreported = block.warning_count() - block.warnings().len() as u64;
        if unreported > 0 {
            println!("  ... and {} more implausible samples", unreported);
        }
    }

    println!();
    println!("Total samples: {}", total_samples);
    println!("Peak power: {:.3}kW", peak_power);

    Ok(())
}
