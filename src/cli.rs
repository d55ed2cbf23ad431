use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "iqload",
    version,
    about = "Batch loader for Avaya IQ call-report exports"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Load(LoadArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct LoadArgs {
    #[arg(long, default_value = "exported_data")]
    pub inbox_dir: PathBuf,

    #[arg(long, default_value = "processed_data")]
    pub processed_dir: PathBuf,

    #[arg(long, default_value = "call_data.sqlite")]
    pub db_path: PathBuf,

    #[arg(long, default_value = "error.log")]
    pub error_log: PathBuf,

    #[arg(long, default_value = "manifests")]
    pub manifest_dir: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = "exported_data")]
    pub inbox_dir: PathBuf,

    #[arg(long, default_value = "call_data.sqlite")]
    pub db_path: PathBuf,

    #[arg(long, default_value = "error.log")]
    pub error_log: PathBuf,
}
