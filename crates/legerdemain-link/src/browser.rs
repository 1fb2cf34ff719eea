//! Best-effort browser launch.
//!
//! Opening a browser is a convenience: when it fails the user can still
//! navigate to the printed URL by hand, so errors are only logged.

use std::io;
use std::process::{Command, ExitStatus};
use std::thread::{self, JoinHandle};

/// Something that can show the consent page to the user.
pub trait Launcher: Send + Sync {
    /// Point the user at `url`.
    fn open(&self, url: &str) -> io::Result<()>;
}

impl<L: Launcher + ?Sized> Launcher for std::sync::Arc<L> {
    fn open(&self, url: &str) -> io::Result<()> {
        (**self).open(url)
    }
}

/// Opens the platform's default browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl Launcher for SystemBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        spawn_reaped(browser_command(url)).map(|_| ())
    }
}

/// Start `cmd` and wait for it on a detached thread so it never lingers as
/// a zombie.
fn spawn_reaped(mut cmd: Command) -> io::Result<JoinHandle<io::Result<ExitStatus>>> {
    let mut child = cmd.spawn()?;
    Ok(thread::spawn(move || child.wait()))
}

/// Does not launch anything; the user opens the URL manually.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualBrowser;

impl Launcher for ManualBrowser {
    fn open(&self, _url: &str) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(target_os = "macos")]
fn browser_command(url: &str) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg(url);
    cmd
}

#[cfg(target_os = "windows")]
fn browser_command(url: &str) -> Command {
    // The URL protocol handler always picks the default browser; `explorer`
    // may open File Explorer for some URL shapes.
    let mut cmd = Command::new("rundll32.exe");
    cmd.arg("url.dll,FileProtocolHandler").arg(url);
    cmd
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn browser_command(url: &str) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(url);
    cmd
}
