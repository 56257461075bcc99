use super::context::ApiContext;
use crate::metrics::{format_bytes, format_uptime};
use chrono::{DateTime, SecondsFormat, Utc};
use mcxb_types::{LogEntry, SupervisorState};
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

const STYLE: &str = "body{font-family:monospace;background:#111;color:#ddd;margin:2em}\
h1{color:#5c5}table{border-collapse:collapse}td{padding:2px 12px 2px 0;vertical-align:top}\
td.k{color:#888}.running{color:#5c5}.error{color:#e55}.pending{color:#cc5}\
pre{background:#000;padding:1em;overflow-x:auto;white-space:pre-wrap}";

/// Snapshot of everything the dashboard shows.
#[derive(Clone, Debug)]
pub struct DashboardView {
    pub state: SupervisorState,
    pub runtime: Option<String>,
    pub artifact_name: String,
    pub uptime: Duration,
    pub memory_bytes: Option<u64>,
    pub child_pid: Option<u32>,
    pub launches: u64,
    pub restarts: u64,
    pub last_exit_code: Option<i32>,
    pub work_dir: String,
    pub work_dir_entries: Vec<String>,
    pub logs: Vec<LogEntry>,
    pub refresh_secs: u64,
    pub generated_at: DateTime<Utc>,
}

impl DashboardView {
    pub fn collect(ctx: &ApiContext) -> Self {
        let state = &ctx.state;
        Self {
            state: state.state(),
            runtime: state.runtime().map(|p| p.display().to_string()),
            artifact_name: ctx.artifact_name.clone(),
            uptime: state.uptime(),
            memory_bytes: ctx.sampler.memory_bytes(),
            child_pid: state.stats.current_pid(),
            launches: state.stats.launches(),
            restarts: state.stats.restarts(),
            last_exit_code: state.stats.last_exit_code(),
            work_dir: ctx.work_dir.display().to_string(),
            work_dir_entries: list_work_dir(&ctx.work_dir),
            logs: state.logs.tail(ctx.log_lines),
            refresh_secs: ctx.refresh_secs,
            generated_at: Utc::now(),
        }
    }
}

/// Sorted entry names, directories suffixed with `/`.
pub fn list_work_dir(dir: &Path) -> Vec<String> {
    let mut entries: Vec<String> = match std::fs::read_dir(dir) {
        Ok(read_dir) => read_dir
            .filter_map(|e| e.ok())
            .map(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                if e.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                    format!("{}/", name)
                } else {
                    name
                }
            })
            .collect(),
        Err(_) => Vec::new(),
    };
    entries.sort();
    entries
}

pub fn html_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn state_class(state: &SupervisorState) -> &'static str {
    match state {
        SupervisorState::Running => "running",
        SupervisorState::Error(_) => "error",
        SupervisorState::Stopped(Some(0)) => "pending",
        SupervisorState::Stopped(_) => "error",
        _ => "pending",
    }
}

fn row(html: &mut String, key: &str, value: &str) {
    let _ = writeln!(
        html,
        "<tr><td class=\"k\">{}</td><td>{}</td></tr>",
        key,
        html_escape(value)
    );
}

pub fn render_dashboard(view: &DashboardView) -> String {
    let mut html = String::with_capacity(8 * 1024);

    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">\
         <meta http-equiv=\"refresh\" content=\"{}\">\
         <title>MCXboxBroadcast launcher</title><style>{}</style></head><body>\n",
        view.refresh_secs, STYLE
    );
    html.push_str("<h1>MCXboxBroadcast launcher</h1>\n");

    let _ = writeln!(
        html,
        "<p>Status: <strong class=\"{}\">{}</strong></p>",
        state_class(&view.state),
        html_escape(&view.state.to_string())
    );

    html.push_str("<table>\n");
    row(
        &mut html,
        "Java runtime",
        view.runtime.as_deref().unwrap_or("not resolved"),
    );
    row(&mut html, "Artifact", &view.artifact_name);
    row(&mut html, "Uptime", &format_uptime(view.uptime));
    row(
        &mut html,
        "Memory",
        &view
            .memory_bytes
            .map(format_bytes)
            .unwrap_or_else(|| "unavailable".into()),
    );
    row(
        &mut html,
        "Child PID",
        &view
            .child_pid
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".into()),
    );
    row(&mut html, "Launches", &view.launches.to_string());
    row(&mut html, "Restarts", &view.restarts.to_string());
    row(
        &mut html,
        "Last exit code",
        &view
            .last_exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".into()),
    );
    row(&mut html, "Working directory", &view.work_dir);
    html.push_str("</table>\n");

    html.push_str("<h2>Files</h2>\n<ul>\n");
    if view.work_dir_entries.is_empty() {
        html.push_str("<li><em>empty</em></li>\n");
    }
    for entry in &view.work_dir_entries {
        let _ = writeln!(html, "<li>{}</li>", html_escape(entry));
    }
    html.push_str("</ul>\n");

    let _ = writeln!(
        html,
        "<h2>Recent logs ({})</h2>\n<pre>",
        view.logs.len()
    );
    for entry in &view.logs {
        html.push_str(&html_escape(&entry.to_string()));
        html.push('\n');
    }
    html.push_str("</pre>\n");

    let _ = writeln!(
        html,
        "<p><small>Generated {} &middot; <a href=\"/logs\">logs</a> &middot; \
         <a href=\"/config\">config</a> &middot; <a href=\"/health\">health</a></small></p>",
        view.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    html.push_str("</body></html>\n");

    html
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> DashboardView {
        DashboardView {
            state: SupervisorState::Running,
            runtime: None,
            artifact_name: "MCXboxBroadcastStandalone.jar".into(),
            uptime: Duration::from_secs(65),
            memory_bytes: Some(3 * 1024 * 1024),
            child_pid: Some(4242),
            launches: 2,
            restarts: 1,
            last_exit_code: Some(1),
            work_dir: "/srv/mcxb".into(),
            work_dir_entries: vec!["config.yml".into(), "jre/".into()],
            logs: vec![LogEntry::new("[CHILD] <script>alert('x')</script>")],
            refresh_secs: 7,
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_render_contains_fields() {
        let html = render_dashboard(&view());
        assert!(html.contains("<meta http-equiv=\"refresh\" content=\"7\">"));
        assert!(html.contains("class=\"running\">running</strong>"));
        assert!(html.contains("not resolved"));
        assert!(html.contains("MCXboxBroadcastStandalone.jar"));
        assert!(html.contains("0h 01m 05s"));
        assert!(html.contains("3.0 MiB"));
        assert!(html.contains("4242"));
        assert!(html.contains("<li>jre/</li>"));
    }

    #[test]
    fn test_logs_are_escaped() {
        let html = render_dashboard(&view());
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
    }

    #[test]
    fn test_error_state_class() {
        let mut v = view();
        v.state = SupervisorState::Error("no java & no bundle".into());
        let html = render_dashboard(&v);
        assert!(html.contains("class=\"error\">error: no java &amp; no bundle</strong>"));
    }

    #[test]
    fn test_list_work_dir_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.jar"), b"x").unwrap();
        std::fs::write(dir.path().join("a.yml"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("jre")).unwrap();

        assert_eq!(list_work_dir(dir.path()), vec!["a.yml", "b.jar", "jre/"]);
        assert!(list_work_dir(&dir.path().join("missing")).is_empty());
    }
}
