use std::ffi::OsString;
use std::future::Future;
use std::path::Path;
use std::process::Stdio;

use anyhow::{bail, Context};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::{Config, SegmentConfig};

/// Arguments for a `serve` child. The resolved data dir is passed explicitly
/// so a `--data-dir` given to the supervisor reaches every child.
pub fn child_args(config_path: &Path, data_dir: &Path, segment: &SegmentConfig) -> Vec<OsString> {
    vec![
        "--config".into(),
        config_path.as_os_str().to_owned(),
        "--data-dir".into(),
        data_dir.as_os_str().to_owned(),
        "serve".into(),
        "--segment".into(),
        segment.key.clone().into(),
    ]
}

async fn forward_lines<R>(tag: String, stream: R, is_stderr: bool)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if is_stderr => warn!("[{tag}] {line}"),
            Ok(Some(line)) => info!("[{tag}] {line}"),
            Ok(None) => break,
            Err(e) => {
                warn!(tool = %tag, error = %e, "lost child output");
                break;
            }
        }
    }
}

/// Resolves on SIGINT (Ctrl+C) or, on unix, SIGTERM. Returns the signal name.
pub async fn shutdown_signal() -> &'static str {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "unable to listen for SIGINT (Ctrl+C)");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}

/// A spawned tool process and the names it is logged under.
pub struct ManagedChild {
    pub tag: String,
    pub label: String,
    pub child: Child,
}

/// Waits on every child until they have all exited or `stop` resolves. On
/// stop, each child still running is killed and reaped before this returns.
/// Returns how many children were killed.
pub async fn supervise<F>(children: Vec<ManagedChild>, stop: F) -> usize
where
    F: Future<Output = ()>,
{
    let (stop_tx, stop_rx) = watch::channel(false);
    let mut running = JoinSet::new();

    for ManagedChild {
        tag,
        label,
        mut child,
    } in children
    {
        let mut stop = stop_rx.clone();
        running.spawn(async move {
            tokio::select! {
                status = child.wait() => {
                    match status {
                        Ok(status) => info!(tool = %tag, code = ?status.code(), "{label} exited"),
                        Err(e) => warn!(tool = %tag, error = %e, "failed to wait for {label}"),
                    }
                    false
                }
                _ = stop.changed() => {
                    if let Err(e) = child.kill().await {
                        warn!(tool = %tag, error = %e, "failed to stop {label}");
                    }
                    true
                }
            }
        });
    }

    tokio::pin!(stop);
    loop {
        tokio::select! {
            _ = &mut stop => break,
            joined = running.join_next() => {
                if joined.is_none() {
                    info!("all tools exited");
                    return 0;
                }
            }
        }
    }

    // Receivers stay alive inside each child task, so send cannot fail while
    // any of them is still running.
    let _ = stop_tx.send(true);
    let mut killed = 0;
    while let Some(joined) = running.join_next().await {
        if matches!(joined, Ok(true)) {
            killed += 1;
        }
    }
    killed
}

/// Runs one `serve` process per configured segment until SIGINT/SIGTERM,
/// then kills every child that is still running.
pub async fn start_all(config_path: &Path, config: &Config) -> anyhow::Result<()> {
    if config.segments.is_empty() {
        bail!("no segments configured");
    }

    let exe = std::env::current_exe().context("failed to locate own executable")?;
    let mut children = Vec::with_capacity(config.segments.len());

    info!("starting {} tools", config.segments.len());

    for (i, segment) in config.segments.iter().enumerate() {
        let tag = format!("#{}", i + 1);
        let mut child = Command::new(&exe)
            .args(child_args(config_path, &config.data_dir, segment))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn tool {}", segment.key))?;

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(tag.clone(), stdout, false));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(tag.clone(), stderr, true));
        }

        info!("  {}: http://localhost:{}", segment.label, segment.port);
        children.push(ManagedChild {
            tag,
            label: segment.label.clone(),
            child,
        });
    }

    let stop = async {
        let signal = shutdown_signal().await;
        info!("received {signal}, shutting down all tools");
    };
    let killed = supervise(children, stop).await;
    if killed > 0 {
        info!(killed, "all tools stopped");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[cfg(unix)]
    fn sleeper(tag: &str, seconds: &str) -> ManagedChild {
        let child = Command::new("sleep")
            .arg(seconds)
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        ManagedChild {
            tag: tag.to_string(),
            label: format!("sleep {seconds}"),
            child,
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stop_kills_every_running_child() {
        let children = vec![sleeper("#1", "30"), sleeper("#2", "30")];
        let pids: Vec<u32> = children.iter().filter_map(|c| c.child.id()).collect();
        assert_eq!(pids.len(), 2);

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let stop = async {
            let _ = rx.await;
        };
        let supervised = tokio::spawn(supervise(children, stop));
        tx.send(()).unwrap();

        let killed = tokio::time::timeout(Duration::from_secs(5), supervised)
            .await
            .expect("supervise did not return after stop")
            .unwrap();
        assert_eq!(killed, 2);
        // Killed children are reaped before supervise returns.
        #[cfg(target_os = "linux")]
        for pid in pids {
            assert!(!Path::new(&format!("/proc/{pid}")).exists());
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn returns_when_all_children_exit() {
        let children = vec![sleeper("#1", "0")];
        let killed = tokio::time::timeout(
            Duration::from_secs(5),
            supervise(children, std::future::pending::<()>()),
        )
        .await
        .unwrap();
        assert_eq!(killed, 0);
    }

    #[test]
    fn child_runs_serve_for_its_segment() {
        let config = Config::default();
        let args = child_args(
            Path::new("tracker.toml"),
            &PathBuf::from("/srv/prospects"),
            &config.segments[1],
        );
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            [
                "--config",
                "tracker.toml",
                "--data-dir",
                "/srv/prospects",
                "serve",
                "--segment",
                "cyber"
            ]
        );
    }
}
