use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use ideaminer::config::{self, IdeaMinerConfig};
use ideaminer::gemini::GeminiClient;
use ideaminer::output::{json as json_out, table};
use ideaminer::ranking;
use ideaminer::youtube::{DurationBucket, YouTubeClient};

#[derive(Parser)]
#[command(
    name = "ideaminer",
    version,
    about = "IdeaMiner — rank YouTube videos by view-to-subscriber ratio and mine their comments for content ideas"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Search videos by keyword, ranked by efficiency ratio
    Search {
        /// Search keyword
        keyword: String,

        /// Video length filter: any, short, medium, long
        #[arg(long, default_value = "any")]
        duration: String,

        /// Minimum efficiency ratio (views / subscribers), inclusive
        #[arg(long, default_value_t = 1.0)]
        min_efficiency: f64,

        /// YouTube Data API key (overrides env and config)
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Analyze a video's top comments: sentiment, keywords, topic ideas
    Analyze {
        /// Video ID (the watch?v= parameter)
        video_id: String,

        /// Also generate a script outline for the N-th recommended topic (1-based)
        #[arg(long)]
        script: Option<usize>,

        /// YouTube Data API key (overrides env and config)
        #[arg(long)]
        api_key: Option<String>,

        /// Gemini API key (overrides env and config)
        #[arg(long)]
        gemini_api_key: Option<String>,
    },

    /// Generate a script outline for a chosen topic keyword
    Script {
        /// Topic keyword
        keyword: String,

        /// Audience-reaction context to ground the outline
        #[arg(long, default_value = "")]
        context: String,

        /// Gemini API key (overrides env and config)
        #[arg(long)]
        gemini_api_key: Option<String>,
    },

    /// Manage ~/.ideaminer/config.toml
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Create the default config file if it doesn't exist
    Init,

    /// Show the config with secrets redacted
    Show,

    /// Save an API key for a service
    SetKey {
        /// Service name: youtube or gemini
        service: String,

        /// The API key to store
        key: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let json_output = cli.json;
    let config = IdeaMinerConfig::load()?;

    match cli.command {
        Commands::Search {
            keyword,
            duration,
            min_efficiency,
            api_key,
        } => {
            let keyword = keyword.trim().to_string();
            if keyword.is_empty() {
                bail!("Search keyword must not be empty");
            }
            let duration = DurationBucket::from_str(&duration).with_context(|| {
                format!("Unknown duration: {duration}. Use: any, short, medium, long")
            })?;

            let yt = build_youtube_client(api_key.as_deref(), &config)?;

            let hits = yt.search(&keyword, duration)?;
            if hits.is_empty() {
                // zero matches is a successful empty result, not a failure
                if json_output {
                    json_out::print_json(&serde_json::json!({
                        "keyword": keyword,
                        "minEfficiency": min_efficiency,
                        "total": 0,
                        "videos": [],
                    }))?;
                } else {
                    table::print_video_results(&[], &keyword);
                }
                return Ok(());
            }

            let video_ids: Vec<String> = hits.into_iter().map(|h| h.id.video_id).collect();
            let details = yt.video_statistics(&video_ids)?;

            // one statistics request over the distinct channels, first-seen order
            let mut channel_ids: Vec<String> = Vec::new();
            for d in &details {
                if !channel_ids.contains(&d.snippet.channel_id) {
                    channel_ids.push(d.snippet.channel_id.clone());
                }
            }
            let subscribers = yt.channel_statistics(&channel_ids)?;

            let results = ranking::rank(&details, &subscribers, min_efficiency);
            if json_output {
                json_out::print_json(&serde_json::json!({
                    "keyword": keyword,
                    "minEfficiency": min_efficiency,
                    "total": results.len(),
                    "videos": results,
                }))?;
            } else {
                table::print_video_results(&results, &keyword);
            }
        }

        Commands::Analyze {
            video_id,
            script,
            api_key,
            gemini_api_key,
        } => {
            let yt = build_youtube_client(api_key.as_deref(), &config)?;
            let gemini = build_gemini_client(gemini_api_key.as_deref(), &config)?;

            let details = yt.video_statistics(&[video_id.clone()])?;
            let video = details
                .first()
                .with_context(|| format!("Video not found: {video_id}"))?;

            let comments = yt.comments(&video_id)?;
            let analysis = gemini.analyze(&video.snippet.title, &comments)?;

            let outline = match script {
                Some(n) => {
                    let idx = n.checked_sub(1).context("--script is 1-based")?;
                    let rec = analysis.recommendations.get(idx).with_context(|| {
                        format!(
                            "No recommendation #{n} ({} available)",
                            analysis.recommendations.len()
                        )
                    })?;
                    let text = gemini.generate_outline(&rec.keyword, &analysis.audience_reaction)?;
                    Some((rec.keyword.clone(), text))
                }
                None => None,
            };

            if json_output {
                json_out::print_json(&serde_json::json!({
                    "videoId": video_id,
                    "title": video.snippet.title,
                    "commentCount": comments.len(),
                    "analysis": analysis,
                    "scriptOutline": outline.as_ref().map(|(keyword, text)| {
                        serde_json::json!({"keyword": keyword, "outline": text})
                    }),
                }))?;
            } else {
                table::print_analysis(&video.snippet.title, &analysis);
                if let Some((keyword, text)) = outline {
                    println!();
                    table::print_outline(&keyword, &text);
                }
            }
        }

        Commands::Script {
            keyword,
            context,
            gemini_api_key,
        } => {
            let gemini = build_gemini_client(gemini_api_key.as_deref(), &config)?;
            let outline = gemini.generate_outline(&keyword, &context)?;

            if json_output {
                json_out::print_json(&serde_json::json!({
                    "keyword": keyword,
                    "outline": outline,
                }))?;
            } else {
                table::print_outline(&keyword, &outline);
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Init => {
                let created = config::init_config()?;
                let path = config::config_path()?;
                if created {
                    println!("Created {}", path.display());
                } else {
                    println!("Config already exists: {}", path.display());
                }
            }
            ConfigAction::Show => {
                println!("{}", config.display_redacted());
            }
            ConfigAction::SetKey { service, key } => {
                let path = config::config_path()?;
                let mut config = config;
                config.set_api_key(&service, &key, &path)?;
                println!("Saved {service} API key to {}", path.display());
            }
        },
    }

    Ok(())
}

fn build_youtube_client(cli_key: Option<&str>, config: &IdeaMinerConfig) -> Result<YouTubeClient> {
    let service = config.service_config("youtube");
    let key = config::resolve_credential(cli_key, "YOUTUBE_API_KEY", service)?;
    let mut client = YouTubeClient::new(key);
    if let Some(url) = service.and_then(|s| s.base_url.clone()) {
        client = client.with_base_url(url);
    }
    Ok(client)
}

fn build_gemini_client(cli_key: Option<&str>, config: &IdeaMinerConfig) -> Result<GeminiClient> {
    let service = config.service_config("gemini");
    let key = config::resolve_credential(cli_key, "GEMINI_API_KEY", service)?;
    let mut client = GeminiClient::new(key);
    if let Some(url) = service.and_then(|s| s.base_url.clone()) {
        client = client.with_base_url(url);
    }
    if let Some(model) = service.and_then(|s| s.model.clone()) {
        client = client.with_model(model);
    }
    Ok(client)
}
