//! pt-installer - Android Platform Tools installer
//!
//! Downloads platform-tools for this OS, extracts it, and optionally adds it
//! to PATH and creates a desktop shortcut.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use pt_installer::config::Settings;
use pt_installer::downloaders::HttpClient;
use pt_installer::installer::{InstallRequest, InstallResult, InstallService, Installer, RunningInstall};
use pt_installer::path_env::Registration;
use pt_installer::progress::{Phase, Progress, ProgressEvent};
use pt_installer::{logging, platform, update};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Parser)]
#[command(name = "pt-installer")]
#[command(version)]
#[command(about = "Install Android Platform Tools and put them on PATH")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (use RUST_LOG=debug for more detail)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Download and install platform-tools
    Install {
        /// Installation directory (default: last used, then ~/Android)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Add the tools to PATH (default: off unless enabled in settings)
        #[arg(long, num_args = 0..=1, default_missing_value = "true")]
        add_to_path: Option<bool>,

        /// Create a desktop shortcut to adb
        #[arg(long, num_args = 0..=1, default_missing_value = "true")]
        create_shortcut: Option<bool>,

        /// Archive URL (default: the official archive for this OS)
        #[arg(long, env = "PT_INSTALLER_URL")]
        url: Option<String>,

        /// Update the machine-wide PATH instead of the user's (Windows, needs admin)
        #[arg(long)]
        system: bool,
    },

    /// Show size and date of the archive currently published
    CheckUpdate {
        /// Archive URL (default: the official archive for this OS)
        #[arg(long, env = "PT_INSTALLER_URL")]
        url: Option<String>,
    },

    /// Show the settings file and its contents
    Settings,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let _log_guard = logging::init(cli.verbose)?;

    match cli.command {
        Commands::Install {
            dir,
            add_to_path,
            create_shortcut,
            url,
            system,
        } => {
            let mut settings = Settings::load();

            let target_dir = match dir.or_else(|| settings.install_dir.clone()) {
                Some(dir) if dir.is_relative() => std::env::current_dir()
                    .context("Could not determine current directory")?
                    .join(dir),
                Some(dir) => dir,
                None => match platform::default_install_dir() {
                    Some(dir) => dir,
                    None => bail!("Could not determine home directory; pass --dir"),
                },
            };
            let source_url = url
                .or_else(|| settings.download_url.clone())
                .unwrap_or_else(platform::default_download_url);

            let request = InstallRequest::new(target_dir, source_url)
                .with_path(add_to_path.unwrap_or(settings.add_to_path))
                .with_shortcut(create_shortcut.unwrap_or(settings.create_shortcut));

            println!("pt-installer - Android Platform Tools");
            println!("Source:  {}", request.source_url);
            println!("Target:  {}", request.target_dir.display());
            println!();

            let installer = Installer::new(request).system_wide(system);
            let result = run_with_progress(installer).await?;

            match result {
                InstallResult::Succeeded(report) => {
                    println!("\n=== Installation Summary ===");
                    println!("Installed:  {}", report.tool_dir.display());
                    println!(
                        "Files:      {} ({} downloaded)",
                        report.files_extracted,
                        HumanBytes(report.bytes_downloaded)
                    );
                    match report.path_registration {
                        Some(Registration::Added) => println!("PATH:       added"),
                        Some(Registration::AlreadyPresent) => println!("PATH:       already present"),
                        None => {}
                    }
                    if let Some(shortcut) = &report.shortcut {
                        println!("Shortcut:   {}", shortcut.display());
                    }
                    for warning in &report.warnings {
                        println!("Warning:    {}", warning);
                    }
                    if report.path_registration == Some(Registration::Added) {
                        println!("\nOpen a new terminal to pick up the PATH change.");
                    }

                    settings.install_dir = Some(report.install_dir.clone());
                    if let Err(e) = settings.save() {
                        tracing::warn!("Could not save settings: {:#}", e);
                    }
                    Ok(ExitCode::SUCCESS)
                }
                InstallResult::Failed(e) => {
                    eprintln!("\nInstallation failed: {}", e);
                    Ok(ExitCode::from(1))
                }
            }
        }

        Commands::CheckUpdate { url } => {
            let url = url
                .or_else(|| Settings::load().download_url)
                .unwrap_or_else(platform::default_download_url);

            let client = HttpClient::new()?;
            let remote = update::check_remote_archive(&client, &url)
                .await
                .with_context(|| format!("Failed to check {}", url))?;

            println!("Archive:        {}", remote.url);
            match remote.size {
                Some(size) => println!("Size:           {}", HumanBytes(size)),
                None => println!("Size:           unknown"),
            }
            println!(
                "Last modified:  {}",
                remote.last_modified.as_deref().unwrap_or("unknown")
            );
            Ok(ExitCode::SUCCESS)
        }

        Commands::Settings => {
            let path = Settings::settings_path()?;
            let settings = Settings::load();
            println!("Settings file: {}", path.display());
            println!(
                "{}",
                serde_json::to_string_pretty(&settings).context("Failed to serialize settings")?
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Run the install with a progress bar; Ctrl-C cancels the run
async fn run_with_progress(installer: Installer) -> Result<InstallResult> {
    let service = InstallService::new();
    let RunningInstall {
        events,
        cancel,
        handle,
    } = service.start(installer)?;

    let renderer = tokio::spawn(render_progress(events));
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling...");
            cancel.cancel();
        }
    });

    let result = handle.await.context("Install task failed")?;
    interrupt.abort();
    let _ = renderer.await;
    Ok(result)
}

async fn render_progress(mut events: UnboundedReceiver<ProgressEvent>) {
    let pb = ProgressBar::new(1000);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% | {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));

    let mut phase = None;
    while let Some(event) = events.recv().await {
        if phase != Some(event.phase) {
            phase = Some(event.phase);
            pb.set_position(0);
        }
        match event.phase {
            Phase::Done | Phase::Failed => {
                pb.finish_and_clear();
                break;
            }
            _ => {
                if let Progress::Fraction(f) = event.progress {
                    pb.set_position((f * 1000.0) as u64);
                }
                pb.set_message(event.message);
            }
        }
    }
    pb.finish_and_clear();
}
