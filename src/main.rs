use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tagwatch::aws::client::AwsClient;
use tagwatch::clients::{LimitedConcurrencyClient, MetricClient, ResourceDiscovery, TaggingClient};
use tagwatch::config::{Config, JobConfig};
use tagwatch::model::{CloudwatchData, Dimension, GetMetricDataProcessingParams, Job, Metric, MetricConfig};
use tagwatch::{telemetry, VERSION};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Discover tagged AWS resources and collect their CloudWatch metrics
#[derive(Parser, Debug)]
#[command(name = "tagwatch", version, about, long_about = None)]
struct Args {
    /// Config file (defaults to <config dir>/tagwatch/config.yml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    /// Print API counters in Prometheus text format after the cycle
    #[arg(long)]
    print_metrics: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("tagwatch {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("tagwatch").join("tagwatch.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".tagwatch").join("tagwatch.log");
    }
    PathBuf::from("tagwatch.log")
}

/// Clients shared by every job in one region
struct RegionClients {
    metrics: MetricClient,
    tagging: LimitedConcurrencyClient<TaggingClient>,
}

impl RegionClients {
    fn new(region: &str, config: &Config) -> Result<Self> {
        let aws = Arc::new(AwsClient::new(region, config.endpoint_url.as_deref())?);
        Ok(Self {
            metrics: MetricClient::new(aws.clone()),
            tagging: LimitedConcurrencyClient::new(
                TaggingClient::new(aws.clone(), aws),
                config.tagging_api_concurrency,
            ),
        })
    }
}

/// One collected value
#[derive(Debug, Serialize)]
struct MetricValue {
    metric: String,
    statistic: String,
    dimensions: Vec<Dimension>,
    value: Option<f64>,
    timestamp: Option<DateTime<Utc>>,
}

/// Outcome of one (job, region) pair, printed as a JSON line
#[derive(Debug, Serialize)]
struct JobReport {
    namespace: String,
    region: String,
    resources: usize,
    values: Vec<MetricValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    let config_path = match args.config {
        Some(path) => path,
        None => Config::default_path().context("Could not determine config directory, use --config")?,
    };
    let config = Config::load(&config_path)?;
    tracing::info!("Loaded {} jobs from {}", config.jobs.len(), config_path.display());

    let mut clients: HashMap<String, RegionClients> = HashMap::new();
    for region in config.regions() {
        let region_clients = RegionClients::new(&region, &config)?;
        clients.insert(region, region_clients);
    }

    let mut tasks = Vec::new();
    for job in &config.jobs {
        for region in &job.regions {
            if let Some(region_clients) = clients.get(region) {
                tasks.push(run_job(job, region, region_clients, config.metrics_per_query));
            }
        }
    }

    for report in join_all(tasks).await {
        println!("{}", serde_json::to_string(&report)?);
    }

    if args.print_metrics {
        print!("{}", telemetry::render()?);
    }

    Ok(())
}

async fn run_job(
    job_config: &JobConfig,
    region: &str,
    clients: &RegionClients,
    metrics_per_query: usize,
) -> JobReport {
    let job = job_config.to_job();
    let mut report = JobReport {
        namespace: job.job_type.clone(),
        region: region.to_string(),
        resources: 0,
        values: Vec::new(),
        error: None,
    };

    match collect(job_config, &job, region, clients, metrics_per_query, &mut report).await {
        Ok(()) => {
            tracing::info!(
                namespace = %report.namespace,
                region,
                resources = report.resources,
                values = report.values.len(),
                "Job finished"
            );
        }
        Err(err) => {
            tracing::error!(namespace = %report.namespace, region, "Job failed: {:#}", err);
            report.error = Some(format!("{:#}", err));
        }
    }
    report
}

async fn collect(
    job_config: &JobConfig,
    job: &Job,
    region: &str,
    clients: &RegionClients,
    metrics_per_query: usize,
    report: &mut JobReport,
) -> Result<()> {
    let resources = clients.tagging.get_resources(job, region).await?;
    report.resources = resources.len();

    for metric_config in &job_config.metrics {
        let mut metrics: Vec<Metric> = Vec::new();
        clients
            .metrics
            .list_metrics(
                &job.job_type,
                metric_config,
                job_config.recently_active_only,
                |page, _last| metrics.extend(page),
            )
            .await?;

        if job_config.use_get_metric_statistics {
            for metric in &metrics {
                let datapoints = clients
                    .metrics
                    .get_metric_statistics(&metric.dimensions, &job.job_type, metric_config)
                    .await;
                let latest = datapoints.last();
                for statistic in &metric_config.statistics {
                    report.values.push(MetricValue {
                        metric: metric.metric_name.clone(),
                        statistic: statistic.clone(),
                        dimensions: metric.dimensions.clone(),
                        value: latest.and_then(|dp| dp.statistic(statistic)),
                        timestamp: latest.and_then(|dp| dp.timestamp),
                    });
                }
            }
        } else {
            let queries = metric_data_queries(&metrics, metric_config);
            let (start, end) = metric_config.window(Utc::now()).with_context(|| {
                format!("metric {} has no usable time window", metric_config.name)
            })?;
            for chunk in queries.chunks(metrics_per_query) {
                let results = clients
                    .metrics
                    .get_metric_data(chunk, &job.job_type, start, end)
                    .await;
                // Results line up with the chunk unless the whole request failed
                for (query, result) in chunk.iter().zip(results) {
                    report.values.push(MetricValue {
                        metric: query.metric_name.clone(),
                        statistic: query.processing.statistic.clone(),
                        dimensions: query.dimensions.clone(),
                        value: result.datapoint,
                        timestamp: result.timestamp,
                    });
                }
            }
        }
    }

    Ok(())
}

/// One query per (metric, statistic), with ids unique within the job
fn metric_data_queries(metrics: &[Metric], config: &MetricConfig) -> Vec<CloudwatchData> {
    let mut queries = Vec::with_capacity(metrics.len() * config.statistics.len());
    for metric in metrics {
        for statistic in &config.statistics {
            queries.push(CloudwatchData {
                metric_name: metric.metric_name.clone(),
                dimensions: metric.dimensions.clone(),
                processing: GetMetricDataProcessingParams {
                    query_id: format!("id_{}", queries.len()),
                    period: config.period,
                    statistic: statistic.clone(),
                },
            });
        }
    }
    queries
}
