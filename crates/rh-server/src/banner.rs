use colored::Colorize;

use rh_types::ServerInfo;

/// Startup text shown before the first event.
pub fn render(info: &ServerInfo, web: bool) -> String {
    let mut text = format!(
        "{} {}\nListening on {}",
        " Request Hole ".black().on_bright_white().bold(),
        info.build_info.version.bright_black(),
        info.listen_url()
    );
    if web {
        text.push_str(&format!("\nWeb running on: {}", info.web_url()));
    }
    if info.details {
        text.push_str(&format!("\nDetails: {}", info.details));
    }
    if let Some(log) = &info.log_file {
        text.push_str(&format!("\nLog: {log}"));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Protocol, RunConfig};

    #[test]
    fn minimal_banner() {
        colored::control::set_override(false);
        let info = RunConfig::default().server_info(Protocol::Http);
        let banner = render(&info, false);
        let lines: Vec<&str> = banner.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Request Hole"));
        assert_eq!(lines[1], "Listening on http://localhost:8080");
    }

    #[test]
    fn banner_lists_enabled_extras() {
        colored::control::set_override(false);
        let mut config = RunConfig::default();
        config.details = true;
        config.log.file = Some("rh.log".into());
        let banner = render(&config.server_info(Protocol::Ws), true);
        assert!(banner.contains("Listening on ws://localhost:8080"));
        assert!(banner.contains("Web running on: http://localhost:8081"));
        assert!(banner.contains("Details: true"));
        assert!(banner.ends_with("Log: rh.log"));
    }
}
