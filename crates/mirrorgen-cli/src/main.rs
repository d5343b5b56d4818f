use std::sync::Arc;

use clap::Parser;
use cli::Args;
use logging::setup_logging;
use mirrorgen_config::{
    config::{self, get_config, CONFIG_PATH},
    error::ConfigError,
};
use mirrorgen_core::{
    artifact::{ArtifactSink, FsArtifactSink},
    manifest::ManifestTemplate,
    publish::{CommandPublisher, Publisher, SkipPublisher},
};
use mirrorgen_events::{ChannelSink, EventSinkHandle, NullSink};
use mirrorgen_operations::{
    mirror::{mirror, mirror_entries},
    CancelSignal, MirrorContext, MirrorError, MirrorReport, MirrorResult,
};
use mirrorgen_registry::{http_client::configure_http_client, read_snapshot};
use mirrorgen_utils::{fs::ensure_dir_exists, path::resolve_path};
use progress::{spawn_event_handler, ProgressGuard};
use tracing::{debug, info, warn};
use ureq::Proxy;
use utils::{parse_headers, progress_enabled, COLOR};

mod cli;
mod logging;
mod progress;
mod summary;
mod utils;

pub fn create_context(config: config::Config) -> (MirrorContext, Option<ProgressGuard>) {
    if progress_enabled() {
        let (sink, receiver) = ChannelSink::new();
        let events: EventSinkHandle = Arc::new(sink);
        let ctx = MirrorContext::new(config, events);
        let guard = spawn_event_handler(receiver);
        (ctx, Some(guard))
    } else {
        let events: EventSinkHandle = Arc::new(NullSink);
        (MirrorContext::new(config, events), None)
    }
}

/// Raises `cancel` on the first Ctrl-C and exits on the second.
fn spawn_interrupt_handler(cancel: CancelSignal) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Interrupted, waiting for running packages to finish (press Ctrl-C again to abort)");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            progress::stop();
            std::process::exit(130);
        }
    });
}

async fn handle_cli() -> MirrorResult<bool> {
    let args = Args::parse();

    setup_logging(&args);

    if args.no_color {
        let mut color = COLOR.write().unwrap();
        *color = false;
    }

    if args.no_progress || args.json {
        let mut progress = utils::PROGRESS.write().unwrap();
        *progress = false;
    }

    if let Some(ref c) = args.config {
        let mut config_path = CONFIG_PATH.write().unwrap();
        *config_path = resolve_path(c).map_err(ConfigError::from)?;
    }

    config::init()?;
    let mut config = get_config();
    args.apply_to(&mut config);
    config.validate()?;
    debug!(?config, "resolved configuration");

    let proxy = args
        .proxy
        .as_deref()
        .map(Proxy::new)
        .transpose()
        .map_err(|err| MirrorError::Custom(format!("Invalid proxy: {err}")))?;
    let headers = args
        .header
        .as_deref()
        .map(parse_headers)
        .transpose()
        .map_err(MirrorError::Custom)?;
    let user_agent = config.user_agent.clone();
    let timeout = config.timeout()?;

    configure_http_client(|client| {
        if proxy.is_some() {
            client.proxy = proxy;
        }
        if user_agent.is_some() {
            client.user_agent = user_agent;
        }
        if headers.is_some() {
            client.headers = headers;
        }
        client.timeout = timeout;
    });

    let template = ManifestTemplate::from_config(
        &config,
        &args.package_name_base,
        &args.package_version,
        &args.author,
    )?;

    let output_root = resolve_path(&args.output_root).map_err(ConfigError::from)?;
    ensure_dir_exists(&output_root)?;
    info!("Writing packages to {}", output_root.display());

    let sink: Arc<dyn ArtifactSink> =
        Arc::new(FsArtifactSink::new(&output_root).with_readme(config.readme_enabled()));
    let publish = config.publish_enabled();
    let publisher: Arc<dyn Publisher> = if publish {
        Arc::new(CommandPublisher::from_parts(config.publish_command()?)?)
    } else {
        Arc::new(SkipPublisher)
    };

    let snapshot = match args.snapshot {
        Some(ref path) => {
            let path = resolve_path(path).map_err(ConfigError::from)?;
            info!("Reading registry snapshot from {}", path.display());
            let snapshot = read_snapshot(&path)?;
            if snapshot.is_empty() {
                warn!("{} holds an empty listing, nothing to mirror", path.display());
            }
            Some(snapshot)
        }
        None => None,
    };

    let cancel = CancelSignal::new();
    spawn_interrupt_handler(cancel.clone());

    let (ctx, progress_guard) = create_context(config);

    let result: MirrorResult<MirrorReport> = match snapshot {
        Some(snapshot) => {
            let total_rows = snapshot.total_rows;
            mirror_entries(
                &ctx,
                snapshot.into_entries(),
                total_rows,
                template,
                sink,
                publisher,
                cancel,
            )
            .await
        }
        None => mirror(&ctx, template, sink, publisher, cancel).await,
    };

    // The context owns the event sender; dropping it lets the progress thread drain and exit.
    drop(ctx);
    if let Some(guard) = progress_guard {
        guard.finish();
    }
    progress::stop();

    let report = result?;
    summary::print_summary(&report, publish);

    Ok(report.is_success())
}

#[tokio::main]
async fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    let code = match handle_cli().await {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(err) => {
            eprintln!("{:?}", miette::Report::new(err));
            1
        }
    };

    // A cancelled snapshot fetch may still be running on the blocking pool.
    std::process::exit(code);
}
