use anyhow::Result;
use clap::Parser;
use outfit_playlist::models::{Config, Detail, ImageInput};
use outfit_playlist::CaptionPipeline;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "outfit-playlist")]
#[command(about = "Suggest a playlist from a photo of someone's outfit")]
struct CliArgs {
    /// Path to a JPEG or PNG photo.
    #[arg(value_name = "IMAGE")]
    image: PathBuf,

    /// Current weather, passed to the model as context.
    #[arg(long, default_value = "sunny")]
    weather: String,

    /// Format to re-encode the photo to. Defaults to the file extension.
    #[arg(long)]
    format: Option<String>,

    /// Visual analysis effort: low, high or auto.
    #[arg(long, value_parser = parse_detail_arg)]
    detail: Option<Detail>,

    /// Use a canned model answer instead of calling the API.
    #[arg(long)]
    dry_run: bool,
}

fn parse_detail_arg(input: &str) -> std::result::Result<Detail, String> {
    input
        .parse()
        .map_err(|_| format!("Invalid detail '{}'. Expected low, high or auto", input))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "outfit_playlist=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();

    let mut config = Config::from_env()?;
    config.dry_run |= args.dry_run;
    if let Some(detail) = args.detail {
        config.detail = detail;
    }

    let mut input = ImageInput::from_path(&args.image)?;
    if let Some(format) = args.format {
        input.format = format;
    }

    info!("Captioning {}", args.image.display());
    let pipeline = CaptionPipeline::from_config(&config)?;
    let context = format!("the current weather is {}", args.weather);

    match pipeline.caption(input, &context).await {
        Ok(Ok(caption)) => {
            println!("{}", serde_json::to_string_pretty(&caption)?);
            Ok(())
        }
        Ok(Err(failure)) => {
            error!(
                "Caption failed: {} (recorded in {})",
                failure,
                config.error_log_path.display()
            );
            std::process::exit(1);
        }
        Err(e) => {
            error!("Cannot caption {}: {}", args.image.display(), e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_detail_arg_valid() {
        assert_eq!(parse_detail_arg("HIGH").unwrap(), Detail::High);
    }

    #[test]
    fn test_parse_detail_arg_invalid() {
        let err = parse_detail_arg("ultra").unwrap_err();
        assert!(err.contains("low, high or auto"));
    }

    #[test]
    fn test_cli_defaults() {
        let args = CliArgs::try_parse_from(["outfit-playlist", "me.jpg"]).unwrap();
        assert_eq!(args.image, PathBuf::from("me.jpg"));
        assert_eq!(args.weather, "sunny");
        assert!(args.format.is_none());
        assert!(args.detail.is_none());
        assert!(!args.dry_run);
    }
}
