use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use client_core::{source_for, AggregationMode, Phase, RegistrationViewModel, ViewState};
use shared::domain::{SortOrder, TypeFilter};
use tracing::info;
use url::Url;

mod config;

use config::load_settings;

#[derive(Parser, Debug)]
struct Args {
    /// Base URL of the registration API, e.g. https://host/api
    #[arg(long)]
    api_base_url: Option<String>,
    /// Aggregation variant of the deployment: client or server
    #[arg(long)]
    aggregation: Option<AggregationMode>,
    /// Restrict the table to one registration type: all, student, professional
    #[arg(long)]
    filter: Option<TypeFilter>,
    /// Substring matched against name, email, and company
    #[arg(long)]
    search: Option<String>,
    /// Order by registration date: asc or desc
    #[arg(long)]
    sort: Option<SortOrder>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(api_base_url) = args.api_base_url {
        settings.api_base_url = api_base_url;
    }
    if let Some(aggregation) = args.aggregation {
        settings.aggregation = aggregation;
    }

    let base = Url::parse(&settings.api_base_url)
        .with_context(|| format!("invalid api base url '{}'", settings.api_base_url))?;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.request_timeout_secs))
        .build()
        .context("failed to build http client")?;
    let model = RegistrationViewModel::new(source_for(settings.aggregation, http, base.as_str()));

    if let Some(filter) = args.filter {
        model.set_type_filter(filter).await;
    }
    if let Some(search) = args.search {
        model.set_search_text(search).await;
    }

    // the holder refetches on every sort change, so a non-default order is
    // requested by toggling before the first load instead of loading twice
    match args.sort {
        Some(sort) if sort != SortOrder::default() => model.toggle_sort_order().await,
        _ => model.refresh().await,
    }

    let state = model.state().await;
    match state.phase {
        Phase::Ready => {
            info!(
                total = state.stats.total,
                shown = state.derived.len(),
                "registrations: refresh complete"
            );
            render(&state);
            Ok(())
        }
        _ => {
            let detail = state
                .last_error
                .unwrap_or_else(|| "retrieval did not complete".to_string());
            bail!("refresh failed: {detail}");
        }
    }
}

fn render(state: &ViewState) {
    println!("Total registrations: {}", state.stats.total);
    println!("Students:            {}", state.stats.students);
    println!("Professionals:       {}", state.stats.professionals);
    println!();

    if state.derived.is_empty() {
        println!("No registrations match the current criteria.");
        return;
    }

    println!(
        "{:<24} {:<30} {:<14} {:<20} {:<16} DATE",
        "NAME", "EMAIL", "TYPE", "COMPANY", "PHONE"
    );
    for record in &state.derived {
        println!(
            "{:<24} {:<30} {:<14} {:<20} {:<16} {}",
            record.name,
            record.email,
            record.registration_type.as_str(),
            record.company.as_deref().unwrap_or("-"),
            record.phone.as_deref().unwrap_or("-"),
            record.created_at.format("%Y-%m-%d"),
        );
    }
}
