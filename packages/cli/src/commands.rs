use std::path::Path;
use std::time::Duration;

use hazard_map_map_models::{BoundingBox, LoginRequest, MediaFile, MediaKind};
use hazard_map_render::{AlertOverlay, LayerToggles, MapScene};
use hazard_map_sync::{ClientConfig, Collaborators, Session, SessionError, SessionOptions};
use tokio::time::Instant;

use crate::SubmitArgs;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

fn open_session(config: &ClientConfig) -> Result<Session, SessionError> {
    let collaborators = Collaborators::from_config(config)?;
    Ok(Session::new(collaborators, SessionOptions::from(config)))
}

async fn pan_to(session: &Session, bounds: BoundingBox) {
    match session.refresher().on_move_end(bounds).await {
        Ok(outcome) => log::info!("moved to {bounds:?}: {outcome:?}"),
        Err(e) => log::warn!(
            "moved to {bounds:?}, reports not refreshed ({:?}): {e}",
            e.kind()
        ),
    }
}

fn print_summary(session: &Session) {
    let (line, overlay) = session.view().read(|state| {
        let viewport = state.viewport();
        let line = format!(
            "{} reports ({}), {} hotspots, {} alerts | center {:.4},{:.4} zoom {}",
            state.reports().len(),
            state.report_origin(),
            state.hotspots().len(),
            state.alerts().len(),
            viewport.center.lat,
            viewport.center.lng,
            viewport.zoom,
        );
        (line, AlertOverlay::from_alerts(state.alerts()))
    });
    println!("[rev {}] {line}", session.view().revision());
    print!("{overlay}");
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

pub async fn watch(
    config: &ClientConfig,
    bounds: Option<BoundingBox>,
    for_secs: Option<u64>,
) -> CommandResult {
    let session = open_session(config)?;
    let load = session.initial_load().await;
    log::info!("loaded: {load:?}");

    let handle = session.start();
    if let Some(bounds) = bounds {
        pan_to(&session, bounds).await;
    }

    let mut revisions = session.view().subscribe();
    let mut channel = handle.channel_state();
    let deadline = for_secs.map(|secs| Instant::now() + Duration::from_secs(secs));
    print_summary(&session);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("interrupted");
                break;
            }
            () = until(deadline) => break,
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
                revisions.borrow_and_update();
                print_summary(&session);
            }
            changed = channel.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *channel.borrow_and_update();
                println!("push channel {state} (attempt {})", handle.connect_attempts());
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}

pub async fn snapshot(
    config: &ClientConfig,
    bounds: Option<BoundingBox>,
    layers: LayerToggles,
    output: Option<&Path>,
) -> CommandResult {
    let session = open_session(config)?;
    let load = session.initial_load().await;
    log::info!("loaded: {load:?}");
    if let Some(bounds) = bounds {
        pan_to(&session, bounds).await;
    }

    let (scene, overlay) = session.view().read(|state| {
        (
            MapScene::build(state, layers),
            AlertOverlay::from_alerts(state.alerts()),
        )
    });
    let geojson = scene.to_geojson_string()?;

    match output {
        Some(path) => {
            tokio::fs::write(path, geojson).await?;
            log::info!(
                "wrote {} features to {}",
                scene.heat.len() + scene.markers.len(),
                path.display()
            );
        }
        None => println!("{geojson}"),
    }
    eprint!("{overlay}");
    Ok(())
}

async fn read_media(path: &Path) -> Result<MediaFile, std::io::Error> {
    let file_name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());
    let content_type = MediaKind::from_file_name(&file_name)
        .map_or("application/octet-stream", |(_, mime)| mime);
    let bytes = tokio::fs::read(path).await?;
    Ok(MediaFile::new(file_name, content_type, bytes))
}

pub async fn submit(config: &ClientConfig, args: SubmitArgs) -> CommandResult {
    let session = open_session(config)?;

    let mut draft = args.draft();

    let mut files = Vec::with_capacity(args.media.len());
    for path in &args.media {
        files.push(read_media(path).await?);
    }
    for rejected in draft.add_media(files)? {
        eprintln!("skipped {rejected}: unsupported file type");
    }

    if args.classify {
        match session.classify(&mut draft).await {
            Ok(prediction) => println!(
                "classified as {} ({:.2}), severity {}",
                prediction.label,
                prediction.score,
                draft.severity.value()
            ),
            Err(e) => log::warn!("classification skipped: {e}"),
        }
    }

    match session.submit(&draft).await {
        Ok(report) => {
            println!("submitted report {}", report.id);
            Ok(())
        }
        Err(SessionError::Invalid(errors)) => {
            for (field, message) in &errors.fields {
                eprintln!("{field}: {message}");
            }
            Err(errors.into())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn login(config: &ClientConfig, username: String, password: String) -> CommandResult {
    let session = open_session(config)?;
    let token = session
        .api()
        .login(&LoginRequest { username, password })
        .await?;
    println!("{}", token.access_token);
    eprintln!("export HAZARD_MAP_TOKEN=<token> to use it in later commands");
    Ok(())
}
