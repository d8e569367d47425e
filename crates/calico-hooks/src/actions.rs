//! Imperative one-off actions
//!
//! Everything here is a side effect on the host: package sources, service
//! stop/start, the etcd data wipe. All subprocesses are run synchronously
//! with captured output; failure aborts the hook pass.

use std::path::Path;
use std::process::Command;

use crate::config::CharmConfig;
use crate::error::{Error, Result};

/// Package sources the plugin packages come from
const CALICO_SOURCE: &str = "ppa:cory-benfield/project-calico";
const BIRD_SOURCE: &str = "ppa:cz.nic-labs/bird";

/// Packages a Calico compute unit needs
const PACKAGES: [&str; 3] = ["calico-compute", "bird", "neutron-dhcp-agent"];

/// The agent shipped by the stock Neutron packages that conflicts with
/// Calico's dataplane and must not run alongside it
const CONFLICTING_AGENT: &str = "neutron-openvswitch-agent";

/// Where the local etcd keeps its data
pub const ETCD_DATA_DIR: &str = "/var/lib/etcd";

/// Run a host command, mapping failure to a hook error with stderr attached
fn run(command: &str, args: &[&str]) -> Result<()> {
    tracing::debug!(command, ?args, "Running host command");
    let output = Command::new(command)
        .args(args)
        .output()
        .map_err(|e| Error::Action {
            command: command.to_string(),
            message: format!("failed to spawn: {e}"),
        })?;

    if !output.status.success() {
        return Err(Error::Action {
            command: command.to_string(),
            message: format!(
                "exit code {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }
    Ok(())
}

/// Start/stop control over host services
pub trait ServiceControl {
    fn start(&self, name: &str) -> Result<()>;
    fn stop(&self, name: &str) -> Result<()>;
    fn restart(&self, name: &str) -> Result<()>;
    fn disable(&self, name: &str) -> Result<()>;
}

/// [`ServiceControl`] backed by systemctl
#[derive(Debug, Default)]
pub struct SystemctlControl;

impl ServiceControl for SystemctlControl {
    fn start(&self, name: &str) -> Result<()> {
        run("systemctl", &["start", name])
    }

    fn stop(&self, name: &str) -> Result<()> {
        run("systemctl", &["stop", name])
    }

    fn restart(&self, name: &str) -> Result<()> {
        run("systemctl", &["restart", name])
    }

    fn disable(&self, name: &str) -> Result<()> {
        run("systemctl", &["disable", name])
    }
}

/// Add the package sources the plugin packages come from and refresh.
///
/// `calico-origin` overrides the default Calico source when set.
pub fn add_package_sources(cfg: &CharmConfig) -> Result<()> {
    let calico_source = cfg.calico_origin.as_deref().unwrap_or(CALICO_SOURCE);
    run("add-apt-repository", &["--yes", calico_source])?;
    run("add-apt-repository", &["--yes", BIRD_SOURCE])?;
    run("apt-get", &["update", "-q"])?;
    run("apt-get", &["upgrade", "-y", "-q"])
}

/// Install the plugin packages
pub fn install_packages() -> Result<()> {
    let mut args = vec!["install", "-y", "-q"];
    args.extend(PACKAGES);
    run("apt-get", &args)
}

/// Fetch and install an operator-pinned etcd package, when configured
pub fn install_etcd_package(url: &str) -> Result<()> {
    if !url.starts_with("http") {
        tracing::warn!(url, "Ignoring non-http etcd-package-url");
        return Ok(());
    }
    run("wget", &[url])?;
    let filename = url.rsplit('/').next().unwrap_or(url);
    run("dpkg", &["-i", filename])
}

/// Create the felix config file if it does not exist yet, so the renderer
/// has a target it owns from the first pass
pub fn maybe_create_felix_cfg(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, "")?;
    tracing::info!(path = %path.display(), "Created empty felix config");
    Ok(())
}

/// Pause the stock Neutron agent that conflicts with Calico's dataplane.
///
/// Best effort on the stop: the agent may not be installed at all, which is
/// fine. Disabling keeps it from coming back on reboot.
pub fn pause_conflicting_agents(services: &dyn ServiceControl) -> Result<()> {
    if let Err(e) = services.stop(CONFLICTING_AGENT) {
        tracing::debug!(error = %e, agent = CONFLICTING_AGENT, "Conflicting agent not running");
    }
    if let Err(e) = services.disable(CONFLICTING_AGENT) {
        tracing::debug!(error = %e, agent = CONFLICTING_AGENT, "Conflicting agent not installed");
    }
    Ok(())
}

/// Stop etcd, wipe its data directory, and start it again.
///
/// etcd cannot pick up a changed cluster configuration from a config reload;
/// when the cluster string changes it needs its persisted state gone before
/// the restart or it will rejoin the old cluster.
pub fn force_etcd_restart(services: &dyn ServiceControl, data_dir: &Path) -> Result<()> {
    services.stop("etcd")?;

    if data_dir.is_dir() {
        for entry in std::fs::read_dir(data_dir)? {
            let path = entry?.path();
            tracing::info!(path = %path.display(), "Removing etcd state");
            if path.is_dir() {
                std::fs::remove_dir_all(&path)?;
            } else {
                std::fs::remove_file(&path)?;
            }
        }
    }

    services.start("etcd")
}
