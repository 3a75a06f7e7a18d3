mod args;
mod client;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::args::{Args, Command, EndpointsCommand, WindowArgs};
use crate::client::ApiClient;
use crate::output::{print_endpoint_detail, print_endpoints};

fn window_query(window: &WindowArgs) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(start) = &window.start {
        query.push(("start", start.clone()));
    }
    if let Some(end) = &window.end {
        query.push(("end", end.clone()));
    }
    if let Some(metrics) = &window.metrics {
        query.push(("metrics", metrics.clone()));
    }
    query
}

fn list_query(
    model: Option<String>,
    function: Option<String>,
    tag: Option<String>,
    labels: Vec<String>,
    window: &WindowArgs,
) -> Vec<(&'static str, String)> {
    let mut query: Vec<(&'static str, String)> = [("model", model), ("function", function), ("tag", tag)]
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k, v)))
        .collect();
    query.extend(labels.into_iter().map(|l| ("label", l)));
    query.extend(window_query(window));
    query
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let client = ApiClient::new(&args.api_url, args.session_key);

    match args.command {
        Command::Endpoints { subcommand } => match subcommand {
            EndpointsCommand::List {
                project,
                model,
                function,
                tag,
                labels,
                window,
            } => {
                let query = list_query(model, function, tag, labels, &window);
                tracing::debug!(?query, "listing endpoints");
                let list = client.list(&project, &query).await?;
                if args.json {
                    println!("{}", serde_json::to_string_pretty(&list)?);
                } else {
                    print_endpoints(&project, &list.endpoints);
                }
            }
            EndpointsCommand::Get {
                project,
                endpoint_id,
                features,
                window,
            } => {
                let mut query = window_query(&window);
                if features {
                    query.push(("features", "true".to_string()));
                }
                let state = client.get(&project, &endpoint_id, &query).await?;
                if args.json {
                    println!("{}", serde_json::to_string_pretty(&state)?);
                } else {
                    print_endpoint_detail(&state);
                }
            }
            EndpointsCommand::Clear {
                project,
                endpoint_id,
            } => {
                client.clear(&project, &endpoint_id).await?;
                println!("✓ Cleared endpoint {endpoint_id}");
            }
        },
    }

    Ok(())
}
