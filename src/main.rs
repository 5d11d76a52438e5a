use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::{self, BufRead};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use rumah_estimator::config::Config;
use rumah_estimator::data::reference::ReferenceDataset;
use rumah_estimator::model::encoder::{CategoricalField, EncodeMap};
use rumah_estimator::model::features::{limits, PropertyInput};
use rumah_estimator::model::predictor::Metrics;
use rumah_estimator::pipeline::{Estimate, Estimator, SimilarProperties};
use rumah_estimator::server::{build_router, AppState};
use rumah_estimator::session::history::PredictionHistory;
use rumah_estimator::session::store::SessionStore;
use rumah_estimator::training::trainer::train_model;
use rumah_estimator::utils::input::{get_choice, get_number};
use rumah_estimator::utils::{io as model_io, plot};
use rumah_estimator::Error;

#[derive(Parser, Debug)]
#[command(name = "rumah")]
#[command(about = "House price estimation with similar-property lookup")]
#[command(version)]
struct Cli {
    /// TOML config file (defaults to ./rumah.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Model artifact path
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    /// Reference dataset (CSV)
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train a model and save the artifact
    Train {
        /// Training data (CSV); defaults to the reference dataset
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(long)]
        epochs: Option<usize>,
        /// Where to write the training-loss chart
        #[arg(long)]
        plot: Option<PathBuf>,
    },
    /// Estimate one property
    Predict(PropertyArgs),
    /// Prompt for properties until end of input
    Interactive,
    /// Show how much each feature drives the price
    Importances,
    /// Run the HTTP form server
    Serve {
        #[arg(long, env = "RUMAH_HOST")]
        host: Option<String>,
        #[arg(short, long, env = "RUMAH_PORT")]
        port: Option<u16>,
    },
}

#[derive(Args, Debug)]
struct PropertyArgs {
    #[arg(long, default_value_t = 2)]
    bedrooms: u32,
    #[arg(long, default_value_t = 1)]
    bathrooms: u32,
    #[arg(long, default_value_t = 100.0)]
    land_size: f64,
    #[arg(long, default_value_t = 80.0)]
    building_size: f64,
    #[arg(long, default_value_t = 1)]
    floors: u32,
    #[arg(long, default_value_t = 5)]
    building_age: u32,
    #[arg(long, default_value_t = 0)]
    garages: u32,
    #[arg(long, default_value = "rumah")]
    property_type: String,
    #[arg(long, default_value = "unfurnished")]
    furnishing: String,
    #[arg(long, default_value = "bagus")]
    property_condition: String,
}

impl From<PropertyArgs> for PropertyInput {
    fn from(args: PropertyArgs) -> Self {
        PropertyInput {
            bedrooms: args.bedrooms,
            bathrooms: args.bathrooms,
            land_size_m2: args.land_size,
            building_size_m2: args.building_size,
            floors: args.floors,
            building_age: args.building_age,
            garages: args.garages,
            property_type: args.property_type,
            furnishing: args.furnishing,
            property_condition: args.property_condition,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rumah_estimator=info,rumah=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(model) = cli.model {
        config.model_path = model;
    }
    if let Some(dataset) = cli.dataset {
        config.dataset_path = dataset;
    }

    match cli.command {
        Command::Train { data, epochs, plot } => {
            if let Some(data) = data {
                config.training_path = Some(data);
            }
            if let Some(epochs) = epochs {
                config.training.epochs = epochs;
            }
            if let Some(plot) = plot {
                config.plot_path = plot;
            }
            train(&config)
        }
        Command::Predict(args) => {
            let (estimator, metrics) = load_estimator(&config)?;
            let mut history = PredictionHistory::new();
            match estimator.estimate(&PropertyInput::from(args), &mut history) {
                Ok(estimate) => {
                    print_estimate(&estimator, &estimate);
                    print_metrics(&estimator, &metrics);
                    Ok(())
                }
                Err(Error::Validation(message)) => {
                    println!("Peringatan: {}", message);
                    Ok(())
                }
                Err(e) => Err(e).context("Prediction failed"),
            }
        }
        Command::Interactive => {
            let (estimator, _) = load_estimator(&config)?;
            interactive(&estimator)
        }
        Command::Importances => {
            let (estimator, _) = load_estimator(&config)?;
            println!("Pentingnya fitur dalam prediksi harga:");
            for importance in estimator.importances() {
                println!("  {:<20} {:.4}", importance.feature, importance.weight);
            }
            Ok(())
        }
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let (estimator, _) = load_estimator(&config)?;
            let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
            runtime.block_on(serve(&config, estimator))
        }
    }
}

fn train(config: &Config) -> Result<()> {
    let data_path = config.training_data_path();
    info!("Training new model from {}", data_path.display());

    let (model, history) = train_model(data_path, &config.training)
        .with_context(|| format!("Failed to train on {}", data_path.display()))?;
    model_io::save_model(&config.model_path, &model).context("Failed to save model")?;

    if let Err(e) = plot::create_plot(&history, &config.plot_path) {
        tracing::warn!(error = %e, "Could not write training plot");
    }

    println!("Model saved to {}", config.model_path.display());
    println!(
        "Hold-out metrics: R² {:.3}, MAE {}, RMSE {}",
        model.metrics.r2,
        rumah_estimator::format_currency(model.metrics.mae),
        rumah_estimator::format_currency(model.metrics.rmse)
    );
    Ok(())
}

/// Loads the artifact and reference listings; also returns the artifact's
/// hold-out metrics.
fn load_estimator(config: &Config) -> Result<(Estimator, Metrics)> {
    let model = model_io::load_model(&config.model_path).with_context(|| {
        format!(
            "Failed to load model from {} (run `rumah train` first)",
            config.model_path.display()
        )
    })?;
    let metrics = model.metrics.clone();
    let dataset = ReferenceDataset::load(&config.dataset_path);
    let estimator = Estimator::from_model(model, dataset).with_similar_limit(config.similar_limit);
    Ok((estimator, metrics))
}

fn print_metrics(estimator: &Estimator, metrics: &Metrics) {
    println!("\nMetrik model ({} baris uji):", metrics.test_rows);
    println!("  R²   {:.3}", metrics.r2);
    println!("  MAE  {}", estimator.format_price(metrics.mae));
    println!("  RMSE {}", estimator.format_price(metrics.rmse));
}

fn print_estimate(estimator: &Estimator, estimate: &Estimate) {
    println!("\nEstimasi harga rumah: {}", estimate.formatted_price);
    println!("\nProperti serupa:");
    match &estimate.similar {
        SimilarProperties::Found(records) => {
            for (i, record) in records.iter().enumerate() {
                println!(
                    "  {}. {} - {}\n     {}\n     {}",
                    i + 1,
                    record.title,
                    estimator.format_price(record.price_in_rp),
                    record.address,
                    record.url
                );
            }
        }
        SimilarProperties::NoMatch => println!("  Tidak ada properti serupa yang ditemukan."),
        SimilarProperties::Failed(message) => println!("  Gagal mencari properti serupa: {}", message),
    }
}

fn prompt_input<R: BufRead>(input: &mut R, encoder: &EncodeMap) -> io::Result<Option<PropertyInput>> {
    let defaults = PropertyInput::default();
    let (rooms_lo, rooms_hi) = limits::ROOMS;
    let (area_lo, area_hi) = limits::AREA_M2;

    macro_rules! ask {
        ($call:expr) => {
            match $call? {
                Some(value) => value,
                None => return Ok(None),
            }
        };
    }

    let bedrooms = ask!(get_number(input, "Jumlah Kamar Tidur", rooms_lo, rooms_hi, defaults.bedrooms));
    let bathrooms = ask!(get_number(input, "Jumlah Kamar Mandi", rooms_lo, rooms_hi, defaults.bathrooms));
    let land_size_m2 = ask!(get_number(input, "Luas Tanah (m²)", area_lo, area_hi, defaults.land_size_m2));
    let building_size_m2 = ask!(get_number(input, "Luas Bangunan (m²)", area_lo, area_hi, defaults.building_size_m2));
    let floors = ask!(get_number(input, "Jumlah Lantai", limits::FLOORS.0, limits::FLOORS.1, defaults.floors));
    let building_age = ask!(get_number(
        input,
        "Usia Bangunan (tahun)",
        limits::BUILDING_AGE.0,
        limits::BUILDING_AGE.1,
        defaults.building_age
    ));
    let garages = ask!(get_number(input, "Jumlah Garasi", limits::GARAGES.0, limits::GARAGES.1, defaults.garages));

    let mut choose = |field: CategoricalField, prompt: &str| -> io::Result<Option<String>> {
        let choices = encoder.choices(field);
        let options: Vec<&str> = choices.iter().map(String::as_str).collect();
        get_choice(input, prompt, &options)
    };
    let property_type = ask!(choose(CategoricalField::PropertyType, "Tipe Properti"));
    let furnishing = ask!(choose(CategoricalField::Furnishing, "Perabotan"));
    let property_condition = ask!(choose(CategoricalField::PropertyCondition, "Kondisi Properti"));

    Ok(Some(PropertyInput {
        bedrooms,
        bathrooms,
        land_size_m2,
        building_size_m2,
        floors,
        building_age,
        garages,
        property_type,
        furnishing,
        property_condition,
    }))
}

fn interactive(estimator: &Estimator) -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut history = PredictionHistory::new();

    println!("Masukkan detail properti (Ctrl-D untuk selesai)");
    while let Some(property) = prompt_input(&mut input, estimator.encoder())? {
        match estimator.estimate(&property, &mut history) {
            Ok(estimate) => print_estimate(estimator, &estimate),
            Err(Error::Validation(message)) => println!("Peringatan: {}", message),
            Err(e) => println!("Terjadi kesalahan: {}", e),
        }
        println!();
    }

    if !history.is_empty() {
        println!("\nRiwayat prediksi:");
        for entry in history.entries() {
            println!("  {}  {}", entry.display_time(), estimator.format_price(entry.predicted_price));
        }
    }
    Ok(())
}

async fn serve(config: &Config, estimator: Estimator) -> Result<()> {
    let sessions = SessionStore::with_limits(
        Duration::from_secs(config.server.session_idle_minutes.saturating_mul(60)),
        config.server.max_sessions,
    );
    let state = AppState::new(estimator).with_sessions(sessions);
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.server.host, config.server.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
