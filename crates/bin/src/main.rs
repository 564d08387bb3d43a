use anyhow::{ensure, Result};
use clap::{Parser, Subcommand};

use logreg_core::{
    data::ToyDataset,
    nn::{LinearClassifier, Sgd},
    ops_cpu::{cross_entropy_backward, cross_entropy_forward, softmax, to_labels, to_one_hot},
    train::{accuracy, Callbacks, Metrics},
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a linear softmax classifier on synthetic Gaussian blobs
    Train {
        #[arg(long, default_value_t = 50)]
        epochs: usize,
        #[arg(long, default_value_t = 0.5)]
        lr: f32,
        #[arg(long)]
        momentum: Option<f32>,
        #[arg(long, default_value_t = 3)]
        classes: usize,
        #[arg(long, default_value_t = 2)]
        features: usize,
        #[arg(long, default_value_t = 200)]
        per_class: usize,
        #[arg(long, default_value_t = 0.6)]
        spread: f32,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Run numeric sanity checks on the CPU ops
    Sanity {
        #[arg(long, default_value_t = 32)]
        batch: usize,
        #[arg(long, default_value_t = 10)]
        classes: usize,
    },
}

struct CsvLogger {
    train_metrics: Vec<String>,
}

impl CsvLogger {
    fn new() -> Self {
        Self {
            train_metrics: vec!["epoch,loss,accuracy".to_string()],
        }
    }

    fn save_metrics(&self) -> Result<()> {
        std::fs::create_dir_all("results")?;
        std::fs::write("results/metrics_train.csv", self.train_metrics.join("\n"))?;
        println!("Saved metrics to results/metrics_train.csv");
        Ok(())
    }
}

impl Callbacks for CsvLogger {
    fn on_epoch_end(&mut self, epoch: usize, metrics: &Metrics) {
        if epoch % 10 == 0 {
            println!(
                "Epoch {:>3}: loss={:.4}, acc={:.2}%",
                epoch + 1,
                metrics.loss,
                metrics.accuracy * 100.0
            );
        }
        self.train_metrics
            .push(format!("{},{:.6},{:.4}", epoch, metrics.loss, metrics.accuracy));
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Train {
            epochs,
            lr,
            momentum,
            classes,
            features,
            per_class,
            spread,
            seed,
        } => run_train(epochs, lr, momentum, classes, features, per_class, spread, seed),
        Commands::Sanity { batch, classes } => run_sanity(batch, classes),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_train(
    epochs: usize,
    lr: f32,
    momentum: Option<f32>,
    classes: usize,
    features: usize,
    per_class: usize,
    spread: f32,
    seed: u64,
) -> Result<()> {
    ensure!(classes > 0, "--classes must be at least 1");
    ensure!(features > 0, "--features must be at least 1");
    ensure!(per_class > 0, "--per-class must be at least 1");

    println!(
        "Generating {} blob samples ({} classes x {} features)...",
        classes * per_class,
        classes,
        features
    );
    let data = ToyDataset::blobs(classes, features, per_class, spread, seed);
    let (train_data, test_data) = data.split(0.8);

    let mut model = LinearClassifier::new(features, classes, seed);
    let mut optimizer = Sgd::new(lr, momentum);
    let mut callbacks = CsvLogger::new();

    println!("Training for {} epochs (lr={})...", epochs, lr);
    let history = model.fit_with(
        &train_data.features,
        &train_data.labels,
        epochs,
        &mut optimizer,
        &mut callbacks,
    )?;

    if let Some(last) = history.last() {
        println!(
            "Final train loss={:.4}, train acc={:.2}%",
            last.loss,
            last.accuracy * 100.0
        );
    }

    let test_logits = model.predict_logits(&test_data.features);
    let test_acc = accuracy(&test_logits, &test_data.labels, classes);
    println!(
        "Held-out accuracy on {} samples: {:.2}%",
        test_data.num_samples,
        test_acc * 100.0
    );

    callbacks.save_metrics()?;
    Ok(())
}

fn run_sanity(batch: usize, classes: usize) -> Result<()> {
    ensure!(batch > 0, "--batch must be at least 1");
    ensure!(classes > 0, "--classes must be at least 1");

    println!("Running sanity checks: batch={}, classes={}...", batch, classes);

    // Deterministic logits, same recipe for every run
    let mut logits = vec![0.0f32; batch * classes];
    for (idx, v) in logits.iter_mut().enumerate() {
        *v = 0.03 * (idx as f32).sin() + 0.01 * ((idx % classes) as f32);
    }
    let labels: Vec<usize> = (0..batch).map(|i| i % classes).collect();

    // Softmax rows normalize and survive extreme inputs
    let probs = softmax(&logits, batch, classes);
    let max_row_err = probs
        .chunks(classes)
        .map(|row| (row.iter().sum::<f32>() - 1.0).abs())
        .fold(0.0f32, f32::max);
    println!("softmax: max row-sum error = {:.2e}", max_row_err);

    let extreme = softmax(&[1000.0, 9.0, 8.0], 1, 3);
    let extreme_ok = extreme.iter().all(|p| p.is_finite()) && (extreme[0] - 1.0).abs() < 1e-5;
    println!(
        "softmax extreme [1000, 9, 8]: [{:.4}, {:.4}, {:.4}] => {}",
        extreme[0],
        extreme[1],
        extreme[2],
        if extreme_ok { "PASS" } else { "FAIL" }
    );

    // One-hot round trip
    let (one_hot, k) = to_one_hot(&labels, Some(classes))?;
    let round_trip_ok = to_labels(&one_hot, k) == labels;
    println!(
        "one-hot round trip: {}",
        if round_trip_ok { "PASS" } else { "FAIL" }
    );

    // Cross-entropy gradient rows sum to zero
    let cache = cross_entropy_forward(&logits, &labels, classes)?;
    let upstream = vec![1.0 / batch as f32; batch];
    let (d_logits, _) = cross_entropy_backward(&cache, &upstream);
    let max_grad_row_sum = d_logits
        .chunks(classes)
        .map(|row| row.iter().sum::<f32>().abs())
        .fold(0.0f32, f32::max);
    println!(
        "cross-entropy: loss={:.4}, max |grad row sum| = {:.2e}",
        cache.mean_loss(),
        max_grad_row_sum
    );

    let ok = max_row_err < 1e-5 && extreme_ok && round_trip_ok && max_grad_row_sum < 1e-5;
    println!("Sanity: {}", if ok { "PASS" } else { "FAIL" });

    Ok(())
}
