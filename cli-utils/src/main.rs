//! Decode captured result records into engineering units.
//!
//! The bridge replies to every timing request with a fixed-layout
//! little-endian record. This tool takes such a record as a hex string
//! (e.g. copied from a logic analyzer or a serial dump) and prints the
//! decoded fields, converting ticks to time via the tick scale carried in
//! the record.

use anyhow::{bail, Context, Result};
use clap::Parser;

use pulsebridge_common::report::{
    BusyPulseReport, EdgeIntervalReport, PinReadReport, PulseWaitReport, TimerValueReport,
};
use pulsebridge_common::INVALID_PIN_ELAPSED;

/// This doc string acts as a help message when the user runs '--help'
/// as do all doc strings on fields
#[derive(Parser)]
enum Opts {
    /// Decode a busy-pulse measurement record (16 bytes).
    BusyPulse { record: String },
    /// Decode a pulse-wait record (12 bytes).
    PulseWait {
        record: String,
        /// Tick scale factor (pulse-wait records do not carry one).
        #[clap(short, long, default_value = "16000")]
        ticks_per_ms: u32,
    },
    /// Decode an edge-interval record (9 bytes).
    EdgeInterval { record: String },
    /// Decode a pin-read record (5 bytes).
    PinRead { record: String },
    /// Decode a raw tick-counter snapshot (4 bytes).
    Timer { record: String },
}

fn main() -> Result<()> {
    env_logger::init();

    match Opts::parse() {
        Opts::BusyPulse { record } => {
            let report = BusyPulseReport::decode(&decode_hex(&record)?)
                .context("Not a valid busy-pulse record")?;
            println!("Status: {}", report.status);
            print_elapsed(
                report.elapsed_ticks,
                report.rollovers,
                report.ticks_per_ms,
            );
        }
        Opts::PulseWait {
            record,
            ticks_per_ms,
        } => {
            let report = PulseWaitReport::decode(&decode_hex(&record)?)
                .context("Not a valid pulse-wait record")?;
            println!("Status: {}", report.status);
            print_elapsed(report.elapsed_ticks, report.rollovers, ticks_per_ms);
        }
        Opts::EdgeInterval { record } => {
            let report = EdgeIntervalReport::decode(&decode_hex(&record)?)
                .context("Not a valid edge-interval record")?;
            if report.delta_ticks == INVALID_PIN_ELAPSED {
                println!("Delta: invalid pin");
            } else {
                println!(
                    "Delta: {} ticks = {:.3} ms",
                    report.delta_ticks,
                    report.delta_ticks as f64 / report.ticks_per_ms as f64,
                );
            }
            println!("Deadline misses: {}{}",
                report.timeout_counter,
                if report.timeout_counter == 255 { " (saturated)" } else { "" },
            );
        }
        Opts::PinRead { record } => {
            let report = PinReadReport::decode(&decode_hex(&record)?)
                .context("Not a valid pin-read record")?;
            println!("Status: {}", report.status);
            println!("Level: {}", if report.level { "high" } else { "low" });
        }
        Opts::Timer { record } => {
            let report = TimerValueReport::decode(&decode_hex(&record)?)
                .context("Not a valid timer record")?;
            println!("Ticks: {}", report.ticks);
        }
    }
    Ok(())
}

fn decode_hex(record: &str) -> Result<Vec<u8>> {
    let cleaned: String = record
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    if cleaned.is_empty() {
        bail!("Empty record");
    }
    hex::decode(&cleaned).context("Record is not valid hex")
}

fn print_elapsed(elapsed_ticks: u32, rollovers: u32, ticks_per_ms: u32) {
    if elapsed_ticks == INVALID_PIN_ELAPSED {
        println!("Elapsed: invalid pin");
        return;
    }
    let total_ticks = u64::from(rollovers) * (1 << 32) + u64::from(elapsed_ticks);
    println!(
        "Elapsed: {} ticks ({} rollovers) = {:.3} ms",
        total_ticks,
        rollovers,
        total_ticks as f64 / ticks_per_ms as f64,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hex_strips_separators() {
        assert_eq!(decode_hex("0a 0b:0c").unwrap(), vec![0x0a, 0x0b, 0x0c]);
    }

    #[test]
    fn test_decode_hex_rejects_garbage() {
        assert!(decode_hex("zz").is_err());
        assert!(decode_hex("").is_err());
    }
}
