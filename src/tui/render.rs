use crate::state::ListedServer;
use crate::tui::menu::{MenuState, Notice};
use crate::tui::{Painter, Theme};

pub fn status_mark(server: &ListedServer) -> &'static str {
    if server.conflict {
        "!"
    } else if server.enabled {
        "✓"
    } else {
        "✗"
    }
}

fn paint_mark(server: &ListedServer, painter: Painter, theme: &Theme) -> String {
    let mark = status_mark(server);
    let color = if server.conflict {
        theme.conflict
    } else if server.enabled {
        theme.enabled
    } else {
        theme.disabled
    };
    painter.fg(mark, color)
}

/// Plain list used by `ccmcp list` and when stdout is not a terminal.
pub fn server_list(servers: &[ListedServer], painter: Painter, theme: &Theme) -> Vec<String> {
    if servers.is_empty() {
        return vec![painter.fg("No MCP servers configured", theme.conflict)];
    }

    let width = servers.iter().map(|s| s.name.chars().count()).max().unwrap_or(0);
    let enabled = servers.iter().filter(|s| s.enabled).count();
    let mut lines = vec![painter.bold(
        &format!("MCP servers ({} enabled, {} disabled)", enabled, servers.len() - enabled),
        theme.heading,
    )];
    for server in servers {
        let name = format!("{:<width$}", server.name, width = width);
        let mut line = format!(
            "  {} {}  {}",
            paint_mark(server, painter, theme),
            name,
            painter.fg(&server.definition.summary(), theme.detail)
        );
        if server.conflict {
            line.push_str(&painter.fg("  (also in the other store)", theme.conflict));
        }
        lines.push(line);
    }
    lines
}

/// Multi-line description of one server.
pub fn server_detail(server: &ListedServer, painter: Painter, theme: &Theme) -> Vec<String> {
    let def = &server.definition;
    let state = if server.enabled { "enabled" } else { "disabled" };
    let mut lines = vec![
        painter.bold(&server.name, theme.heading),
        format!("  Status:  {} {}", paint_mark(server, painter, theme), state),
        painter.fg(
            &format!("  Command: {}", def.command().unwrap_or("")),
            theme.detail,
        ),
        painter.fg(&format!("  Args:    {}", def.args().join(" ")), theme.detail),
    ];
    if let Some(kind) = def.kind() {
        lines.push(painter.fg(&format!("  Type:    {}", kind), theme.detail));
    }
    if let Some(timeout) = def.timeout() {
        lines.push(painter.fg(&format!("  Timeout: {}s", timeout), theme.detail));
    }
    let env = def.env_keys();
    if !env.is_empty() {
        lines.push(painter.fg(&format!("  Env:     {}", env.join(", ")), theme.detail));
    }
    let allow = def.always_allow();
    if !allow.is_empty() {
        lines.push(painter.fg(&format!("  Allow:   {}", allow.join(", ")), theme.detail));
    }
    for (key, value) in def.extra() {
        lines.push(painter.fg(&format!("  {}: {}", key, value), theme.detail));
    }
    lines
}

pub fn menu(state: &MenuState, painter: Painter, theme: &Theme) -> Vec<String> {
    let mut lines = vec![
        painter.bold("ccmcp - Claude Code MCP control panel", theme.heading),
        painter.fg(
            "↑/↓ move  enter toggle  r reload  q quit",
            theme.detail,
        ),
        String::new(),
    ];

    if state.servers.is_empty() {
        lines.push(painter.fg("  No MCP servers configured", theme.conflict));
    }
    for (index, server) in state.servers.iter().enumerate() {
        let row = format!(
            "{} {}  {}",
            status_mark(server),
            server.name,
            server.definition.summary()
        );
        if index == state.selected {
            lines.push(painter.highlight(&row));
        } else {
            lines.push(format!(
                "  {} {}  {}",
                paint_mark(server, painter, theme),
                server.name,
                painter.fg(&server.definition.summary(), theme.detail)
            ));
        }
    }

    lines.push(String::new());
    if let Some(name) = &state.confirming {
        let verb = match state.servers.iter().find(|s| &s.name == name) {
            Some(server) if server.enabled => "Disable",
            _ => "Enable",
        };
        lines.push(painter.bold(&format!("{verb} server '{name}'? [y/N]"), theme.conflict));
    } else if let Some(notice) = &state.notice {
        lines.push(match notice {
            Notice::Info(text) => painter.fg(text, theme.success),
            Notice::Error(text) => painter.fg(&format!("Error: {text}"), theme.error),
        });
    }
    lines
}
