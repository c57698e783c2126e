//! Inspect Command
//!
//! Resolves a single frame URL without keeping any history.

use anyhow::Result;
use clap::Parser;

use framedev_common::Dispatch;

use crate::client::FrameClient;
use crate::output::{print_frame, print_item, print_warning, OutputFormat, RecordDisplay};

#[derive(Parser)]
pub struct InspectArgs {
    /// Frame URL on the inspected application
    pub url: String,

    /// Print the full interaction record as JSON
    #[arg(long)]
    pub raw: bool,
}

pub async fn execute(args: InspectArgs, client: FrameClient, format: OutputFormat) -> Result<()> {
    let record = client.get_frame(&args.url).await?;

    if args.raw {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    print_item(&RecordDisplay::from(&record), format);
    if matches!(format, OutputFormat::Table | OutputFormat::Plain) {
        print_frame(&record);
    }
    if !record.response.is_success() {
        print_warning(&format!(
            "frame answered {} {}",
            record.response.status, record.response.status_text
        ));
    }
    Ok(())
}
