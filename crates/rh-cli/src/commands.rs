use colored::Colorize;
use tracing::warn;

use rh_server::{Protocol, RequestHole};
use rh_types::BuildInfo;

use crate::cli::{Cli, Command};

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Http => cmd_serve(&cli, Protocol::Http).await,
        Command::Ws => cmd_serve(&cli, Protocol::Ws).await,
        Command::Version => {
            println!("{}", version_text(&BuildInfo::current()));
            Ok(())
        }
    }
}

async fn cmd_serve(cli: &Cli, protocol: Protocol) -> anyhow::Result<()> {
    let hole = RequestHole::new(cli.run_config()?, protocol)?;
    println!("{}\n", hole.banner());

    let report = hole.run(interrupted()).await?;
    for stats in report.deliveries.iter().filter(|stats| stats.dropped > 0) {
        eprintln!(
            "{} {} dropped {} of {} events",
            "!".yellow().bold(),
            stats.sink,
            stats.dropped,
            stats.dropped + stats.delivered
        );
    }
    match report.fault() {
        Some(reason) => anyhow::bail!("{reason}"),
        None => Ok(()),
    }
}

async fn interrupted() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(%err, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

fn version_text(info: &BuildInfo) -> String {
    format!(
        "{} {}\n{}\n\nBuild date: {}\nCommit: {}\nBuild by: {}",
        "Request Hole".bold(),
        info.version,
        info.repo,
        info.date,
        info.commit,
        info.built_by
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_lists_build_info() {
        colored::control::set_override(false);
        let info = BuildInfo {
            version: "1.2.3".into(),
            commit: "abc123".into(),
            date: "2024-01-01".into(),
            repo: "https://github.com/aaronvb/request_hole".into(),
            built_by: "ci".into(),
        };
        let text = version_text(&info);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Request Hole 1.2.3");
        assert_eq!(lines[1], "https://github.com/aaronvb/request_hole");
        assert_eq!(lines[3], "Build date: 2024-01-01");
        assert_eq!(lines[4], "Commit: abc123");
        assert_eq!(lines[5], "Build by: ci");
    }
}
