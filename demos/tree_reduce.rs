//! Pipelined tree reduce across in-process ranks.
//!
//! Every rank fills its vector with its own rank id; after the reduce the
//! root holds `0 + 1 + ... + (world - 1)` at every position.
//!
//! ```bash
//! cargo run --example tree_reduce -- --world 8 --fan-in 2 --count 65536
//! ```

use anyhow::{Result, bail};
use clap::Parser;
use nway::{FabricConfig, LocalFabric, ReduceConfig, ReduceOp, Substrate};
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "tree_reduce")]
#[command(about = "Pipelined N-ary tree reduce over one-sided writes")]
struct Args {
    #[arg(long, default_value_t = 4)]
    world: u32,
    #[arg(long, default_value_t = 2)]
    fan_in: u32,
    #[arg(long, default_value_t = 4096)]
    count: usize,
    #[arg(long, default_value_t = 0)]
    root: u32,
    #[arg(long, default_value_t = 1024)]
    block_len: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ReduceConfig {
        fan_in: args.fan_in,
        max_block_len: args.block_len,
        ..ReduceConfig::from_env()
    };
    let fabrics = LocalFabric::bootstrap_local(args.world, FabricConfig::from_env())?;

    let mut handles = Vec::new();
    for fabric in fabrics.into_iter().map(Arc::new) {
        let config = config.clone();
        let (count, root) = (args.count, args.root);
        handles.push(tokio::spawn(async move {
            let rank = fabric.rank();
            let input = vec![rank as i32; count];
            let start = Instant::now();
            let out = nway::reduce(&*fabric, &input, root, &ReduceOp::Sum, &config).await?;
            nway::Result::Ok((rank, start.elapsed(), out))
        }));
    }

    let expected: i32 = (0..args.world as i32).sum();
    for h in handles {
        let (rank, elapsed, out) = h.await??;
        let secs = elapsed.as_secs_f64();
        let mib = (args.count * std::mem::size_of::<i32>()) as f64 / 1024.0 / 1024.0;
        println!(
            "# rank {rank:4}  size [byte]: {:10}  time: {secs:8.6}  bandwidth [MiB/s]: {:8.0}",
            args.count * std::mem::size_of::<i32>(),
            mib / secs.max(f64::EPSILON),
        );
        if let Some(result) = out {
            if let Some(pos) = result.iter().position(|&v| v != expected) {
                bail!("root result wrong at {pos}: {} != {expected}", result[pos]);
            }
            println!("# root {rank}: all {} elements equal {expected}", result.len());
        }
    }

    Ok(())
}
