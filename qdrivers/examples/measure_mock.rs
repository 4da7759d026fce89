//! In this example, we will set up a simulated digitizer from a TOML description, feed it two
//! cycles of samples and read them back in every data mode.
//!
//! Run with `RUST_LOG=qdrivers=debug` to see every vendor call.

use qdrivers::prelude::*;
use sd1::mock::MockAin;
use tracing_subscriber::EnvFilter;

const CONFIG: &str = r#"
name = "dig"
chassis = 0
slot = 2
measure = [2]

[[channel]]
index = 2
full_scale = 2.0
points_per_cycle = 4
n_cycles = 2
"#;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config: DigitizerConfig = CONFIG.parse()?;
    let mut dig = Digitizer::from_config(MockAin::new(4), &config)?;

    for mode in 0..=2 {
        dig.set_data_mode(mode)?;
        {
            // Simulated hardware: each cycle arrives as its own chunk
            let mut sdk = dig.sdk().lock().map_err(|_| Error::Poisoned)?;
            sdk.push_samples(2, &[0, 16384, -16384, 32767]);
            sdk.push_samples(2, &[0, 0, 0, 0]);
        }
        for trace in dig.measure()? {
            println!(
                "{:?}: {} ({}) = {:?}",
                dig.data_mode(),
                trace.name,
                trace.unit,
                trace.data
            );
        }
    }

    dig.close()?;
    Ok(())
}
