// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for photobooth operations
//!
//! This module provides command-line functionality for:
//! - Running a capture session and exporting its strip and clip
//! - Composing a strip from existing images
//! - Listing devices and recording formats

use chrono::Local;
use photobooth::backends::audio::enumerate_audio_devices;
use photobooth::backends::camera::still::load_image_as_frame;
use photobooth::backends::camera::v4l2_utils::enumerate_cameras;
use photobooth::backends::camera::{
    CaptureDevice, GstCameraDevice, MediaConstraints, StillImageDevice,
};
use photobooth::binder;
use photobooth::config::Config;
use photobooth::constants::recording::FORMAT_PREFERENCE;
use photobooth::export::{RecordingExporter, StripExporter};
use photobooth::pipelines::photo::{CaptureSet, capture_slot};
use photobooth::pipelines::video::encoder_selection::select_encoders;
use photobooth::pipelines::video::{
    GstRecordingCapability, RecordingCapability, negotiate_format,
};
use photobooth::preview::PreviewBoard;
use photobooth::session::{SessionEvent, SessionOutcome, parse_countdown_delay};
use photobooth::storage::{BlobRegistry, DirectoryDownloads, DownloadSink};
use photobooth::template::{StripTemplate, TemplateLayout, TemplateSource};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Options of the `session` command
pub struct SessionArgs {
    pub camera: Option<String>,
    pub image: Option<PathBuf>,
    pub test_pattern: bool,
    pub delay: Option<String>,
    pub mirror: bool,
    pub no_record: bool,
    pub template: Option<PathBuf>,
    /// 1-based alternate strip to swap into the main position
    pub strip: Option<usize>,
    pub output: Option<PathBuf>,
}

fn strip_template(path: Option<PathBuf>) -> StripTemplate {
    match path {
        Some(path) => StripTemplate::new(TemplateSource::File(path), TemplateLayout::classic()),
        None => StripTemplate::builtin(),
    }
}

fn download_sink(config: &Config, output: Option<PathBuf>) -> Arc<dyn DownloadSink> {
    Arc::new(DirectoryDownloads::new(
        output.unwrap_or_else(|| config.output_dir()),
    ))
}

/// Run one session and export its results
pub fn run_session(args: SessionArgs) -> Result<(), Box<dyn std::error::Error>> {
    let SessionArgs {
        camera,
        image,
        test_pattern,
        delay,
        mirror,
        no_record,
        template,
        strip,
        output,
    } = args;
    let config = Config::load()?;

    let device: Box<dyn CaptureDevice> = if let Some(image) = &image {
        Box::new(StillImageDevice::from_file(image))
    } else if test_pattern {
        Box::new(StillImageDevice::test_pattern(1280, 720))
    } else {
        match camera.or_else(|| config.camera_device.clone()) {
            Some(path) => Box::new(GstCameraDevice::with_path(path)),
            None => Box::new(GstCameraDevice::system_default()),
        }
    };

    let record = config.record_video && !no_record;
    let capability = GstRecordingCapability;
    let bound = binder::bind(
        device.as_ref(),
        &MediaConstraints::default_strategies(None),
        record.then_some(&capability as &dyn RecordingCapability),
    )?;

    println!("Using camera: {}", bound.stream.label());
    if bound.stream.has_audio() {
        println!("Microphone: enabled");
    }
    match (&bound.recorder, bound.format()) {
        (Some(_), Some(format)) => println!("Recording: {}", format.mime),
        (Some(_), None) => println!("Recording: platform default"),
        (None, _) => println!("Recording: off"),
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let mut board = PreviewBoard::new(
            strip_template(template.or_else(|| config.template_path.clone())),
            config
                .alternate_templates
                .iter()
                .cloned()
                .map(|path| strip_template(Some(path)))
                .collect(),
            config.display_width,
        );
        board.load_main().await?;
        if let Some(number) = strip {
            let index = number.checked_sub(1).ok_or("Strip numbers start at 1")?;
            board.swap_with_main(index).await?;
            println!("Strip: {}", board.main().source().label());
        }
        let layout = board.main().layout().clone();
        let board = Arc::new(Mutex::new(board));

        let format = bound.format().cloned();
        let controller = bound
            .into_controller(layout)
            .with_timing(config.session_timing())
            .with_board(Arc::clone(&board));

        let countdown = match &delay {
            Some(input) => parse_countdown_delay(input),
            None => config.countdown(),
        };
        controller.set_countdown_seconds(countdown);
        controller.set_mirror(mirror || config.mirror_preview);

        let mut events = controller.subscribe();
        let printer = tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                match event {
                    SessionEvent::Countdown(Some(n)) => println!("  {}...", n),
                    SessionEvent::FrameCaptured {
                        index,
                        width,
                        height,
                    } => println!("  Captured slot {} ({}x{})", index + 1, width, height),
                    SessionEvent::RecorderStarted => println!("  Recording started"),
                    SessionEvent::RecorderStopped => println!("  Recording stopped"),
                    SessionEvent::Finalized { .. } => break,
                    _ => {}
                }
            }
        });

        println!();
        println!("Session started at {}", Local::now().format("%H:%M:%S"));
        let outcome = controller.start_session().await;
        let _ = printer.await;

        let report = match outcome? {
            SessionOutcome::Completed(report) => report,
            SessionOutcome::Rejected => return Err("A session is already running".into()),
        };
        println!(
            "Session finished: {} photos in {:.1}s",
            report.frames,
            report.elapsed.as_secs_f64()
        );
        println!();

        let sink = download_sink(&config, output);
        let state = Arc::clone(controller.state());

        let main = board.lock().map_err(|_| "preview board poisoned")?.main().clone();
        let strip = StripExporter::new(Arc::clone(&sink))
            .export(&main, &state.captures)
            .await?;
        println!("Strip saved: {}", strip.path.display());

        if state.recording.is_empty() {
            println!("No clip recorded.");
        } else {
            let clip = RecordingExporter::new(sink, BlobRegistry::new())
                .export(&state.recording, format.as_ref())
                .await?;
            println!("Clip saved: {} ({} KiB)", clip.path.display(), clip.bytes / 1024);
        }

        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

/// Build a strip from image files
pub fn compose_strip(
    images: Vec<PathBuf>,
    mirror: bool,
    template: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async move {
        let mut template = strip_template(template.or_else(|| config.template_path.clone()));
        template.load().await?;

        let captures = CaptureSet::new();
        for (index, path) in images.iter().enumerate() {
            let slot = template
                .layout()
                .slot(index)
                .ok_or_else(|| format!("Template has no slot {}", index + 1))?;
            let frame = Arc::new(load_image_as_frame(path)?);
            let captured = capture_slot(frame, index, slot, mirror).await?;
            println!("Slot {}: {}", index + 1, path.display());
            captures.store(captured);
        }

        let strip = StripExporter::new(download_sink(&config, output))
            .export(&template, &captures)
            .await?;
        println!("Strip saved: {}", strip.path.display());
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

/// Print recording format support in preference order
pub fn list_formats() -> Result<(), Box<dyn std::error::Error>> {
    gstreamer::init()?;

    println!("Recording formats (in preference order):");
    println!();
    for mime in FORMAT_PREFERENCE {
        match select_encoders(mime) {
            Some(choice) => println!(
                "  [x] {:<24} {} + {}{}",
                mime,
                choice.video_encoder,
                choice.muxer(),
                choice
                    .audio_encoder
                    .map(|audio| format!(" (audio: {})", audio))
                    .unwrap_or_default()
            ),
            None => println!("  [ ] {}", mime),
        }
    }
    println!();

    match negotiate_format(&GstRecordingCapability) {
        Some(format) => println!("Selected: {} (.{})", format.mime, format.extension),
        None => println!("Selected: none, recording unavailable"),
    }
    Ok(())
}

/// List cameras and microphones
pub fn list_devices() -> Result<(), Box<dyn std::error::Error>> {
    let cameras = enumerate_cameras();
    if cameras.is_empty() {
        println!("No cameras found.");
    } else {
        println!("Available cameras:");
        println!();
        for camera in &cameras {
            println!("  {}  {} ({})", camera.path, camera.card, camera.driver);
        }
    }
    println!();

    let microphones = enumerate_audio_devices();
    if microphones.is_empty() {
        println!("No microphones found.");
    } else {
        println!("Available microphones:");
        println!();
        for mic in &microphones {
            println!("  {}  {}", mic.name, mic.node_name);
        }
    }
    Ok(())
}

/// Print the effective configuration as JSON
pub fn print_config() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    if let Some(path) = Config::default_path() {
        println!("# {}", path.display());
    }
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
