use super::Parser;

#[derive(Parser, Debug)]
pub struct Cli {
    /// Path to the settings file, without extension.
    #[arg(long)]
    pub settings: Option<String>,
    /// Emit logs as JSON lines.
    #[arg(long)]
    pub json_logs: bool,
}
