use clap::{Parser, ValueEnum};
use log::error;
use std::path::PathBuf;
use std::process::ExitCode;

use lecture_lib::core::LectureJob;
use lecture_lib::{init_logging, LectureProcessor, PipelineConfig, PipelineError};

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    /// 2.5s sampling, for lectures that change slides often
    Dense,
    /// 10s sampling, for lectures that stay on a slide for minutes
    Sparse,
}

#[derive(Parser)]
#[command(name = "lecture-slides")]
#[command(about = "Split a lecture recording into slides and transcribe the speech over each one")]
struct Cli {
    /// Source video
    video: Option<PathBuf>,

    /// JSON5 config file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Sampling preset, ignored when --config is given
    #[arg(short, long)]
    preset: Option<Preset>,

    /// Root directory for cached audio, snapshots and slides.json
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Seconds between sampled frames
    #[arg(short, long)]
    interval: Option<f64>,

    /// Whisper model name, or a ggml model file with the `whisper` feature
    #[arg(short, long)]
    model: Option<String>,

    /// Speech language (e.g. "en", "zh")
    #[arg(short, long)]
    lang: Option<String>,

    /// Parallel transcription workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Also write the report here
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Ignore cached audio
    #[arg(short, long)]
    force: bool,
}

impl Cli {
    fn pipeline_config(&self) -> Result<PipelineConfig, PipelineError> {
        let mut config = match (&self.config, self.preset) {
            (Some(path), _) => PipelineConfig::from_file(path)?,
            (None, Some(Preset::Dense)) => PipelineConfig::for_dense_lectures(),
            (None, Some(Preset::Sparse)) => PipelineConfig::for_sparse_lectures(),
            (None, None) => PipelineConfig::default(),
        };

        if let Some(dir) = &self.cache_dir {
            config.cache_dir = dir.clone();
        }
        if let Some(interval) = self.interval {
            config.sampler.interval_secs = interval;
        }
        if let Some(model) = &self.model {
            config.audio.model = model.clone();
        }
        if let Some(lang) = &self.lang {
            config.audio.language = lang.clone();
        }
        if let Some(workers) = self.workers {
            config.audio.workers = workers;
        }
        config.validate()?;
        Ok(config)
    }
}

fn run(cli: Cli) -> Result<(), PipelineError> {
    let config = cli.pipeline_config()?;
    let job = LectureJob::new(cli.video.as_deref(), &config.cache_dir)?.with_force(cli.force);
    let processor = LectureProcessor::with_defaults(config)?;

    let report = processor.run(&job)?;
    let json = report.to_json_pretty()?;
    if let Some(output) = &cli.output {
        std::fs::write(output, &json)?;
    }
    println!("{}", json);
    Ok(())
}

fn main() -> ExitCode {
    init_logging();
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ {}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
