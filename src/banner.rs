//! Startup banner

use crossterm::style::{Color, Stylize};

use ktail_logs::PodRef;

/// Summary printed before the first log line
///
/// With `watch` set the banner also says that other pods in the namespace
/// will be streamed once they are ready, since the listed pods are only the
/// starting set.
pub fn render(namespace: &str, pods: &[PodRef], color: bool, watch: bool) -> String {
    let mut out = format!(
        "Tailing logs for {} pod(s) in namespace {}\n",
        pods.len(),
        namespace
    );

    for pod in pods {
        let name = format!("{}/{}", pod.namespace, pod.name);
        if color {
            out.push_str(&format!(
                "  - {} (container: {})\n",
                name.with(Color::Green),
                pod.container.as_str().with(Color::Cyan)
            ));
        } else {
            out.push_str(&format!("  - {} (container: {})\n", name, pod.container));
        }
    }

    if watch {
        out.push_str(&format!(
            "Watching namespace {} for other ready pods (use --no-watch to stream only these)\n",
            namespace
        ));
    }

    out.push_str("Press Ctrl+C to stop...\n");
    out
}
