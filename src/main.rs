#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

use crate::command::{import, inspect, tags};
use argh::FromArgs;
use imagestream_registry::configuration;
use imagestream_registry::configuration::registry::create_registry;
use imagestream_registry::configuration::{Configuration, ObservabilityConfig};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use std::time::Duration;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

mod command;

fn set_tracing(config: Option<ObservabilityConfig>) -> Result<(), configuration::Error> {
    if let Some(ObservabilityConfig {
        tracing: Some(tracing_config),
    }) = config
    {
        let resource = Resource::builder()
            .with_service_name(env!("CARGO_PKG_NAME"))
            .with_attribute(KeyValue::new("service.version", env!("CARGO_PKG_VERSION")))
            .build();
        let otlp_exporter = SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&tracing_config.endpoint)
            .with_timeout(Duration::from_secs(10))
            .build()?;

        let tracer_provider = SdkTracerProvider::builder()
            .with_batch_exporter(otlp_exporter)
            .with_id_generator(RandomIdGenerator::default())
            .with_resource(resource)
            .with_sampler(Sampler::TraceIdRatioBased(tracing_config.sampling_rate))
            .build();

        let tracer = tracer_provider.tracer(env!("CARGO_PKG_NAME"));
        let _ = global::set_tracer_provider(tracer_provider);
        let telemetry = tracing_opentelemetry::layer().with_tracer(tracer);

        let _ = tracing_subscriber::registry()
            .with(EnvFilter::from_default_env())
            .with(tracing_subscriber::fmt::layer().json())
            .with(telemetry)
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(EnvFilter::from_default_env())
            .with(tracing_subscriber::fmt::layer().json())
            .try_init();
    }
    Ok(())
}

#[derive(FromArgs, PartialEq, Debug)]
/// Registry tag and manifest operations over image streams
struct GlobalArguments {
    #[argh(option, short = 'c', default = "String::from(\"config.toml\")")]
    /// the path to the configuration file, defaults to `config.toml`
    config: String,

    #[argh(subcommand)]
    subcommand: SubCommand,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
enum SubCommand {
    Tags(tags::Options),
    Inspect(inspect::Options),
    Import(import::Options),
}

fn main() -> Result<(), command::Error> {
    let cli_args: GlobalArguments = argh::from_env();

    let config = Configuration::load(&cli_args.config)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run_command(cli_args, config))
}

async fn run_command(
    cli_args: GlobalArguments,
    config: Configuration,
) -> Result<(), command::Error> {
    set_tracing(config.observability.clone())?;

    let registry = create_registry(&config)?;
    let request_timeout = config.registry.request_timeout;

    let operation = async move {
        match cli_args.subcommand {
            SubCommand::Tags(options) => tags::Command::new(registry).run(&options).await,
            SubCommand::Inspect(options) => inspect::Command::new(registry).run(&options).await,
            SubCommand::Import(options) => import::Command::new(registry).run(&options).await,
        }
    };

    // Dropping the operation on timeout cancels any store I/O still in flight
    tokio::time::timeout(Duration::from_secs(request_timeout), operation)
        .await
        .map_err(|_| command::Error::Timeout(request_timeout))?
}
