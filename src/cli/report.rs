//! Human readable session summary printed by `mclone info`.
//!
//! Loaded volumes and intact tasks are shown in `[...]`, unloaded volumes and
//! stale tasks in `<...>`.

use std::fmt::Write;

use crate::session::Session;
use crate::task::{Endpoint, Task};

pub fn render_info(session: &Session) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Mclone version {}", env!("CARGO_PKG_VERSION"));
    let _ = writeln!(out);
    let _ = writeln!(out, "## Volumes");
    let _ = writeln!(out);
    for volume in session.volumes() {
        let _ = writeln!(out, "* [{}] :: ({})", volume.id(), volume.root().display());
    }

    let (intact, stale): (Vec<&Task>, Vec<&Task>) =
        session.tasks().iter().partition(|task| session.is_intact(task));
    for (title, tasks) in [("Intact tasks", intact), ("Stale tasks", stale)] {
        if tasks.is_empty() {
            continue;
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "## {title}");
        let _ = writeln!(out);
        for task in tasks {
            let _ = writeln!(out, "{}", task_line(session, task));
        }
    }
    out
}

fn task_line(session: &Session, task: &Task) -> String {
    let crypter = task
        .crypter_mode()
        .map(|mode| format!("{mode}+"))
        .unwrap_or_default();
    let mut parts = vec![format!(
        "* {} :: {}{} {} -> {}",
        bracket(task.id(), session.is_intact(task)),
        crypter,
        task.mode(),
        endpoint(session, task.source()),
        endpoint(session, task.destination()),
    )];
    if let Some(include) = task.include() {
        parts.push(format!("include {include}"));
    }
    if let Some(exclude) = task.exclude() {
        parts.push(format!("exclude {exclude}"));
    }
    parts.join(" :: ")
}

fn endpoint(session: &Session, endpoint: &Endpoint) -> String {
    let loaded = session.volumes().get(&endpoint.volume).is_some();
    format!("{}({})", bracket(&endpoint.volume, loaded), endpoint.root)
}

fn bracket(id: &str, loaded: bool) -> String {
    if loaded {
        format!("[{id}]")
    } else {
        format!("<{id}>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{HostExecutor, Rclone};
    use crate::session::SessionOptions;
    use crate::task::{CrypterMode, TaskOptions};
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_render_info() {
        let dir = TempDir::new().unwrap();
        let (a, b) = (dir.path().join("a"), dir.path().join("b"));
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();

        let mut session = Session::new(
            Rclone::new("rclone", Arc::new(HostExecutor::new())),
            SessionOptions::default(),
        );
        let va = session.format_volume(&a).unwrap().id().to_string();
        let vb = session.format_volume(&b).unwrap().id().to_string();
        let id = session
            .create_task(
                &a.join("x"),
                &b,
                TaskOptions {
                    crypter_mode: Some(CrypterMode::Encrypt),
                    exclude: Some("*.tmp".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        let report = render_info(&session);
        assert!(report.starts_with("# Mclone version "));
        assert!(report.contains(&format!("* [{va}] :: (")));
        assert!(report.contains("## Intact tasks"));
        assert!(!report.contains("## Stale tasks"));
        assert!(report.contains(&format!(
            "* [{id}] :: encrypt+update [{va}](x) -> [{vb}]() :: exclude *.tmp"
        )));
    }

    #[tokio::test]
    async fn test_render_stale_task() {
        let dir = TempDir::new().unwrap();
        let (a, b) = (dir.path().join("a"), dir.path().join("b"));
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();
        let rclone = Rclone::new("rclone", Arc::new(HostExecutor::new()));

        let mut session = Session::new(rclone.clone(), SessionOptions::default());
        let va = session.format_volume(&a).unwrap().id().to_string();
        let vb = session.format_volume(&b).unwrap().id().to_string();
        let id = session
            .create_task(&a, &b.join("y"), TaskOptions::default())
            .unwrap();
        session.commit().await.unwrap();

        let mut only_a = Session::new(rclone, SessionOptions::default());
        only_a.restore_volumes([&a]).unwrap();
        let report = render_info(&only_a);
        assert!(!report.contains("## Intact tasks"));
        assert!(report.contains(&format!(
            "## Stale tasks\n\n* <{id}> :: update [{va}]() -> <{vb}>(y)\n"
        )));
    }
}
