use std::{io, sync::Arc};

use graphsel_core::{
    configuration::Configuration,
    core::{
        element::{ElementType, Scalar},
        matrix::MatrixFormat,
        mock_matrices::random_matrix,
        select::{AsyncSelector, SelectOp, SelectOpKind},
    },
};
use stopwatch::Stopwatch;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> io::Result<()> {
    let mut stopwatch = Stopwatch::new();
    stopwatch.start();

    let matrix = random_matrix(50_000, 50_000, 0.0005, ElementType::I64, MatrixFormat::Compressed, 1234)
        .map_err(io::Error::other)?;

    stopwatch.stop();
    println!("Generated {} entries in {:?}", matrix.nnz(), stopwatch.elapsed());

    let matrix = Arc::new(matrix);
    let op = SelectOp::new(SelectOpKind::Tril, ElementType::I64);

    let selector = AsyncSelector::new(Configuration {
        chunk_size: Some(1024),
        ..Default::default()
    })
    .map_err(io::Error::other)?;

    let max_threads = selector.selector().threads();
    let mut baseline = None;
    let mut threads = 1;

    while threads <= max_threads {
        let mut stopwatch = Stopwatch::start_new();

        let (output, statistics) = selector
            .select_with_stats(Arc::clone(&matrix), op, Scalar::I64(0), threads, None)
            .await
            .map_err(io::Error::other)?;

        stopwatch.stop();

        match &baseline {
            None => baseline = Some(output),
            Some(expected) => {
                if *expected != output {
                    return Err(io::Error::other(format!("Output with {} threads differs from single thread", threads)));
                }
            }
        }

        println!("Threads ({}): {} tasks, elapsed {:?}", threads, statistics.tasks, stopwatch.elapsed());
        for line in statistics.emit() {
            println!("  {}", line);
        }

        threads *= 2;
    }

    println!("All thread counts produced identical results");

    Ok(())
}
