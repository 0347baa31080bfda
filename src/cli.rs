// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for scanner operations
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Scanning a single barcode without the terminal UI
//! - Showing the effective configuration

use barcode_scanner::backends::camera::MediaDevices;
use barcode_scanner::backends::camera::v4l2::V4l2MediaDevices;
use barcode_scanner::scanner::{self, devices};
use barcode_scanner::{AppError, AppResult, Config, Platform, ScannerMessage, SessionSnapshot};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// List all available cameras
pub fn list_cameras() -> AppResult<()> {
    let rt = tokio::runtime::Runtime::new()?;
    let infos = rt.block_on(V4l2MediaDevices::new().enumerate_devices())?;
    let cameras = devices::video_inputs(infos);

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    let default = devices::select_default(&cameras).map(|d| d.id.clone());

    println!("Available cameras:");
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        let marker = if Some(&camera.id) == default.as_ref() {
            " (default)"
        } else {
            ""
        };
        println!("  [{}] {}{}", index, camera.display_label(index), marker);
        println!("      Device: {}", camera.id);
    }
    println!();

    Ok(())
}

/// Scan until one barcode is read, then print it
pub fn scan_once(
    config: Config,
    device: Option<String>,
    image: Option<PathBuf>,
    timeout_secs: u64,
) -> AppResult<()> {
    let platform = match &image {
        Some(path) => {
            println!("Scanning image: {}", path.display());
            Platform::still_image(path.clone(), &config)
        }
        None => Platform::native(&config),
    };

    let rt = tokio::runtime::Runtime::new()?;
    let code = rt.block_on(async move {
        let (code_tx, mut code_rx) = mpsc::unbounded_channel();
        let handle = scanner::spawn(
            platform,
            config,
            Box::new(move |code| {
                let _ = code_tx.send(code);
            }),
        );

        let snapshot = handle.wait_for(|s| s.ready).await?;
        check_startup(&snapshot)?;

        if let Some(device) = device {
            let id = resolve_device(&snapshot, &device)?;
            handle.send(ScannerMessage::SelectDevice(id)).await?;
        }
        if let Some(label) = handle.snapshot().selected_label() {
            println!("Using camera: {}", label);
        }

        handle.send(ScannerMessage::Start).await?;
        println!("Scanning...");

        let timeout = Duration::from_secs(timeout_secs);
        let result = tokio::select! {
            code = code_rx.recv() => code.ok_or(AppError::ScannerClosed),
            snapshot = handle.wait_for(|s| s.error.is_some() && !s.scanning) => {
                match snapshot?.error {
                    Some(e) => Err(AppError::Scan(e)),
                    None => Err(AppError::ScannerClosed),
                }
            }
            _ = tokio::time::sleep(timeout) => Err(AppError::Timeout(timeout)),
        };

        handle.shutdown().await?;
        result
    })?;

    println!("{}", code);
    Ok(())
}

/// Print the effective configuration
pub fn show_config(config: &Config) -> AppResult<()> {
    match Config::path() {
        Some(path) if path.exists() => println!("# {}", path.display()),
        Some(path) => println!("# {} (not found, using defaults)", path.display()),
        None => println!("# no config directory, using defaults"),
    }
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

/// Fail early when the session cannot scan at all
fn check_startup(snapshot: &SessionSnapshot) -> AppResult<()> {
    if let Some(error) = &snapshot.error {
        return Err(AppError::Scan(error.clone()));
    }
    if snapshot.devices.is_empty() {
        return Err(AppError::Other("No cameras found".to_string()));
    }
    Ok(())
}

/// Accept either a list index or a device id
fn resolve_device(
    snapshot: &SessionSnapshot,
    device: &str,
) -> AppResult<barcode_scanner::backends::camera::DeviceId> {
    if let Ok(index) = device.parse::<usize>() {
        return snapshot
            .devices
            .get(index)
            .map(|d| d.id.clone())
            .ok_or_else(|| {
                AppError::Other(format!(
                    "Camera index {} out of range (0-{})",
                    index,
                    snapshot.devices.len().saturating_sub(1)
                ))
            });
    }

    snapshot
        .devices
        .iter()
        .find(|d| d.id.as_str() == device)
        .map(|d| d.id.clone())
        .ok_or_else(|| AppError::Other(format!("Unknown camera: {}", device)))
}
