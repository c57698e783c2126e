//! Routes Command

use anyhow::Result;
use clap::Parser;

use crate::client::FrameClient;
use crate::output::{print_list, OutputFormat, RouteDisplay};

#[derive(Parser)]
pub struct RoutesArgs {
    /// Only print routes starting with this prefix
    #[arg(long)]
    pub prefix: Option<String>,
}

pub async fn execute(args: RoutesArgs, client: FrameClient, format: OutputFormat) -> Result<()> {
    let routes: Vec<RouteDisplay> = client
        .list_routes()
        .await?
        .into_iter()
        .filter(|r| args.prefix.as_deref().map_or(true, |p| r.starts_with(p)))
        .map(|route| RouteDisplay { route })
        .collect();

    print_list(&routes, format);
    Ok(())
}
