//! `hechte fetch`: one fetch of one timeline, printed oldest first.

use std::io::{self, Write};

use tracing::debug;

use hechte_core::{FetchError, FetchOnceError, RemoteSource, TimelinePoller};

use crate::cli::{FetchArgs, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

pub async fn handle(args: FetchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (profile_name, mut client_config) = config::resolve_client_config(global)?;
    if let Some(timeline) = args.timeline {
        client_config.poller.timeline = timeline;
    }
    let timeline = client_config.poller.timeline;
    config::ensure_account(&profile_name, &client_config, timeline)?;

    let source = RemoteSource::from_config(&client_config)?;
    let poller = TimelinePoller::with_config(source, &client_config.poller, |err: FetchError| {
        debug!(timeline = %err.timeline, error = %err, "fetch failed");
    })?;

    let batch = poller.fetch_once().await.map_err(|err| match err {
        FetchOnceError::Fetch(err) => CliError::from_fetch(err.kind, err.message, &profile_name),
        FetchOnceError::Misuse(err) => CliError::Poller(err),
    })?;

    let color = output::should_color(global.color);
    let mut stdout = io::stdout().lock();
    for message in batch.iter() {
        let line = output::render_message(args.output, timeline, message, None, color)?;
        writeln!(stdout, "{line}")?;
    }
    stdout.flush()?;
    Ok(())
}
