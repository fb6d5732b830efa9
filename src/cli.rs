// src/cli.rs
use crate::analyzer::{AnalyzerConfig, EngagementAnalyzer, TimeGranularity};
use crate::config::AppConfig;
use crate::database::{DatabaseConfig, PostRepository, ProfileRecord, ProfileRepository};
use crate::presenter::InsightPresenter;
use crate::store::{PostStore, RawPost};
use crate::web::start_web_server;
use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "linkpulse")]
#[command(about = "LinkedIn content assistant API and analysis tools")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP API server
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Import posts from a CSV export into the database
    Import {
        csv_file: PathBuf,
        /// Profile URL the posts belong to
        #[arg(long)]
        profile_url: String,
    },
    /// Print engagement insights for stored posts
    Analyze {
        #[arg(long, default_value = "hour")]
        granularity: String,
        #[arg(long, default_value_t = 3)]
        top_k: usize,
        #[arg(long, default_value_t = 2)]
        min_samples: usize,
    },
}

pub async fn run(cli: Cli, config: AppConfig) -> Result<()> {
    match cli.command {
        Command::Serve { port } => {
            let port = match port {
                Some(port) => port,
                None => std::env::var("ROCKET_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8000),
            };

            start_web_server(
                config.database_path,
                port,
                config.generation_url,
                config.request_timeout_seconds,
            )
            .await
        }

        Command::Import {
            csv_file,
            profile_url,
        } => {
            if !csv_file.exists() {
                error!("CSV file not found: {}", csv_file.display());
                return Ok(());
            }

            let content = tokio::fs::read_to_string(&csv_file).await?;
            let mut reader = csv::Reader::from_reader(content.as_bytes());

            let mut store = PostStore::new();
            let mut success_count = 0;
            let mut error_count = 0;

            for result in reader.deserialize::<RawPost>() {
                match result {
                    Ok(raw) => match store.add(raw) {
                        Ok(post) => {
                            success_count += 1;
                            info!("Imported post {} ({})", post.id, post.content_type);
                        }
                        Err(e) => {
                            error_count += 1;
                            warn!("Skipping record: {}", e);
                        }
                    },
                    Err(e) => {
                        error_count += 1;
                        warn!("CSV parsing error: {}", e);
                    }
                }
            }

            info!("Import completed:");
            info!("  Success: {}", success_count);
            info!("  Errors:  {}", error_count);

            if store.is_empty() {
                return Ok(());
            }

            let mut db_config = DatabaseConfig::new(config.database_path);
            db_config.init_pool().await?;
            db_config.migrate().await?;
            let pool = db_config.pool()?;

            let posts = store.all();
            let avg_engagement = posts
                .iter()
                .map(|p| p.engagement_score() as f64)
                .sum::<f64>()
                / posts.len() as f64;

            let username = crate::scraper::username_from_url(&profile_url);

            ProfileRepository::new(pool)
                .upsert(&ProfileRecord {
                    profile_url: profile_url.clone(),
                    username: username.clone(),
                    name: username,
                    headline: None,
                    location: None,
                    avg_engagement,
                    last_updated: Utc::now(),
                })
                .await?;
            PostRepository::new(pool)
                .replace_for_profile(&profile_url, posts)
                .await?;

            info!("Stored {} posts for {}", posts.len(), profile_url);
            Ok(())
        }

        Command::Analyze {
            granularity,
            top_k,
            min_samples,
        } => {
            let granularity: TimeGranularity = granularity.parse()?;

            let mut db_config = DatabaseConfig::new(config.database_path);
            db_config.init_pool().await?;
            db_config.migrate().await?;
            let pool = db_config.pool()?;

            let stored = PostRepository::new(pool).list_all().await?;
            let store = PostStore::from_posts(stored.iter().map(|row| row.to_post()).collect());

            let analyzer = EngagementAnalyzer::new(
                AnalyzerConfig::default()
                    .with_time_granularity(granularity)
                    .with_top_k(top_k)
                    .with_min_samples(min_samples),
            );
            let report = analyzer.analyze(&store)?;
            let view = InsightPresenter::present(&report);

            println!(
                "Analyzed {} posts (mean engagement {:.1})",
                view.total_posts, view.overall_mean_score
            );
            for section in &view.sections {
                println!("\n{}", section.title);
                for row in &section.rows {
                    print!(
                        "  {:<20} {:>8.1}  ({} posts)",
                        row.label, row.mean_score, row.sample_count
                    );
                    match &row.observation {
                        Some(observation) => println!("  {}", observation),
                        None => println!(),
                    }
                }
            }
            if !view.top_hashtags.is_empty() {
                println!("\nTop hashtags");
                for tag in &view.top_hashtags {
                    println!("  {} ({})", tag.tag, tag.count);
                }
            }
            println!("\n{}", view.best_posting_time);

            Ok(())
        }
    }
}
