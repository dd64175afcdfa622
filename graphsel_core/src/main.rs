use std::{env, io, sync::Arc};

use clap::{Parser, ValueEnum};
use log::{LevelFilter, info};
use tokio::runtime::Builder;

use graphsel_core::{
    MAX_PERMITS_THREADS,
    configuration::Configuration,
    core::{
        element::{ElementType, Scalar},
        matrix::MatrixFormat,
        mock_matrices::random_matrix,
        select::{AsyncSelector, SelectOp, SelectOpKind},
    },
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    /// Compressed rows (CSR)
    Compressed,
    /// Dense presence flags plus values
    Bitmap,
}

impl From<FormatArg> for MatrixFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Compressed => MatrixFormat::Compressed,
            FormatArg::Bitmap => MatrixFormat::Bitmap,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "graphsel_core", version, about = "Runs one entry selection over a random sparse matrix")]
struct Args {
    /// Number of rows (default: 10000)
    #[arg(long, value_name = "N", default_value_t = 10_000)]
    rows: usize,

    /// Number of columns (default: 10000)
    #[arg(long, value_name = "N", default_value_t = 10_000)]
    cols: usize,

    /// Fraction of slots holding an entry, 0.0 to 1.0 (default: 0.001)
    #[arg(long, value_name = "FRACTION", default_value_t = 0.001)]
    density: f64,

    /// Storage format of the generated matrix (default: compressed)
    #[arg(long, value_enum, default_value_t = FormatArg::Compressed)]
    format: FormatArg,

    /// Selection operator, e.g. tril, diag, nonzero, gt_thunk (default: nonzero)
    #[arg(long, value_name = "OP", default_value = "nonzero")]
    op: String,

    /// Thunk value, `k` for positional operators (default: 0)
    #[arg(long, value_name = "VALUE", default_value = "0", allow_hyphen_values = true)]
    thunk: String,

    /// Element type of the matrix: bool, i8..i64, u8..u64, f32, f64 (default: i32)
    #[arg(long = "element-type", alias = "element_type", value_name = "TYPE", default_value = "i32")]
    element_type: String,

    /// Number of worker threads (default: available parallelism)
    #[arg(long = "concurrent-threads", alias = "concurrent_threads", value_name = "N")]
    concurrent_threads: Option<usize>,

    /// Minimum entries per thread (default: 65536)
    #[arg(long = "chunk-size", alias = "chunk_size", value_name = "N")]
    chunk_size: Option<usize>,

    /// Logging level off, error, warn, info, debug, trace (default: info)
    #[arg(long = "log-level", alias = "log_level", value_name = "LEVEL")]
    log_level: Option<LevelFilter>,

    /// Seed of the matrix generator (default: 42)
    #[arg(long, value_name = "N", default_value_t = 42)]
    seed: u64,
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    let config = Configuration {
        concurrent_threads: args.concurrent_threads,
        chunk_size: args.chunk_size,
        ..Default::default()
    };

    if let Some(threads) = config.concurrent_threads {
        _ = MAX_PERMITS_THREADS.set(threads);
    }

    let rt = Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    rt.block_on(async {
        unsafe { env::set_var("RUST_BACKTRACE", "full"); }
        let level = args.log_level.unwrap_or(LevelFilter::Info);
        env_logger::Builder::new()
            .filter_level(level)
            .init();

        let element_type = ElementType::from_name(&args.element_type).map_err(io::Error::other)?;
        let kind = SelectOpKind::from_name(&args.op).map_err(io::Error::other)?;
        let op = SelectOp::new(kind, element_type);
        let thunk = Scalar::parse(op.thunk_type(), &args.thunk).map_err(io::Error::other)?;

        let matrix = random_matrix(
            args.rows,
            args.cols,
            args.density,
            element_type,
            args.format.into(),
            args.seed,
        )
        .map_err(io::Error::other)?;

        info!(
            "Generated {} x {} {:?} matrix with {} entries",
            matrix.nrows(),
            matrix.ncols(),
            matrix.format(),
            matrix.nnz()
        );

        let selector = AsyncSelector::new(config.clone()).map_err(io::Error::other)?;
        let threads = selector.selector().threads();

        let (output, statistics) = selector
            .select_with_stats(Arc::new(matrix), op, thunk, threads, None)
            .await
            .map_err(io::Error::other)?;

        info!("Selection {} {} produced {} entries", kind, thunk, output.nnz());

        for line in statistics.emit() {
            println!("{}", line);
        }

        Ok::<(), io::Error>(())
    })
}
