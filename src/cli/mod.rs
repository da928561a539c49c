//! Terminal rendering for the `conectatech` binary.

use crate::api::contacts::Contact;
use crate::api::resources::Resource;
use crate::identity::{SessionSnapshot, User};
use crate::navigation::RootGraph;

const MAX_COL_WIDTH: usize = 48;

/// Render rows as an ASCII table with a `rows: N` footer. Empty input renders a short notice.
pub fn render_table(cols: &[&str], rows: &[Vec<String>], empty_notice: &str) -> String {
    if rows.is_empty() {
        return empty_notice.to_string();
    }
    let mut widths: Vec<usize> = cols.iter().map(|c| display_len(c).min(MAX_COL_WIDTH)).collect();
    for r in rows {
        for (i, cell) in r.iter().enumerate().take(cols.len()) {
            let w = display_len(cell);
            if w > widths[i] { widths[i] = w.min(MAX_COL_WIDTH); }
        }
    }
    let header: Vec<String> = cols.iter().map(|c| c.to_string()).collect();
    let sep = build_separator(&widths);
    let mut out = Vec::with_capacity(rows.len() + 5);
    out.push(sep.clone());
    out.push(build_row(&header, &widths));
    out.push(sep.clone());
    for r in rows {
        out.push(build_row(r, &widths));
    }
    out.push(sep);
    out.push(format!("rows: {}", rows.len()));
    out.join("\n")
}

pub fn contacts_table(contacts: &[&Contact], searching: bool) -> String {
    let rows: Vec<Vec<String>> = contacts
        .iter()
        .map(|c| {
            vec![
                c.id.to_string(),
                c.full_name.clone(),
                c.position.clone(),
                c.boss_name.clone(),
                c.vehicle.as_ref().map(|v| format!("{} ({})", v.plate, v.kind)).unwrap_or_default(),
                c.numbers().collect::<Vec<_>>().join(", "),
            ]
        })
        .collect();
    let notice = if searching { "No se encontraron contactos para la búsqueda." } else { "No hay contactos registrados." };
    render_table(&["id", "nombre", "cargo", "jefe", "vehículo", "números"], &rows, notice)
}

pub fn resources_table(resources: &[&Resource], searching: bool) -> String {
    let rows: Vec<Vec<String>> = resources
        .iter()
        .map(|r| {
            vec![
                r.id.to_string(),
                r.title.clone(),
                r.type_resource.to_string(),
                r.detail.clone().unwrap_or_default(),
                r.url_resource.clone().unwrap_or_default(),
            ]
        })
        .collect();
    let notice = if searching { "No se encontraron recursos para la búsqueda." } else { "No hay recursos registrados." };
    render_table(&["id", "título", "tipo", "detalle", "url"], &rows, notice)
}

pub fn describe_user(user: &User) -> String {
    format!("{} <{}> id={} role={}", user.display_name(), user.email, user.id, user.role)
}

pub fn describe_session(snap: &SessionSnapshot) -> String {
    match (RootGraph::for_snapshot(snap), snap.user()) {
        (RootGraph::Loading, _) => "cargando sesión...".to_string(),
        (RootGraph::Main, Some(u)) => format!("autenticado: {}", describe_user(u)),
        _ => "sin sesión".to_string(),
    }
}

fn display_len(s: &str) -> usize { s.chars().count() }

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::from("+");
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::from("|");
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        let text = truncate(cell, *w);
        let pad = " ".repeat(w.saturating_sub(display_len(&text)));
        s.push(' ');
        if is_numeric_like(cell) {
            s.push_str(&pad);
            s.push_str(&text);
        } else {
            s.push_str(&text);
            s.push_str(&pad);
        }
        s.push_str(" |");
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max { return s.to_string(); }
    if max <= 1 { return "…".to_string(); }
    s.chars().take(max - 1).collect::<String>() + "…"
}

// right-align ids and counts
fn is_numeric_like(s: &str) -> bool {
    let st = s.trim();
    !st.is_empty() && st.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_layout() {
        let rows = vec![vec!["1".to_string(), "Juan".to_string()], vec!["10".to_string(), "Ana María".to_string()]];
        let t = render_table(&["id", "nombre"], &rows, "vacío");
        let lines: Vec<&str> = t.lines().collect();
        assert_eq!(lines[0], "+----+-----------+");
        assert_eq!(lines[1], "| id | nombre    |");
        assert_eq!(lines[3], "|  1 | Juan      |");
        assert_eq!(lines[4], "| 10 | Ana María |");
        assert_eq!(lines.last().copied(), Some("rows: 2"));
    }

    #[test]
    fn empty_and_truncated() {
        assert_eq!(render_table(&["id"], &[], "vacío"), "vacío");
        let long = "x".repeat(60);
        let t = render_table(&["v"], &[vec![long]], "");
        assert!(t.contains(&format!("{}…", "x".repeat(MAX_COL_WIDTH - 1))));
    }
}
