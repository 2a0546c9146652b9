//! Minimal HTML rendering for the browser pages.
//!
//! One listing page shared by the main and query views, plus the event
//! creation form. Deliberately plain string building; there is no
//! templating layer to keep in sync.

use axum::response::Html;

/// An event with its ids already resolved to display names.
pub struct DisplayEvent {
    pub event_id: String,
    pub event_time: i64,
    pub dc: String,
    pub topic: String,
    pub tags: Vec<String>,
    pub host: String,
    pub user: String,
    pub data: String,
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn options(names: &[String]) -> String {
    let mut out = String::from("<option value=\"\"></option>");
    for name in names {
        let esc = escape(name);
        out.push_str(&format!("<option value=\"{}\">{}</option>", esc, esc));
    }
    out
}

/// The shared listing page: query form on top, event table below.
pub fn listing(events: &[DisplayEvent], topics: &[String], dcs: &[String]) -> Html<String> {
    let mut rows = String::new();
    for ev in events {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&ev.event_id),
            ev.event_time,
            escape(&ev.dc),
            escape(&ev.topic),
            escape(&ev.tags.join(",")),
            escape(&ev.host),
            escape(&ev.user),
            escape(&ev.data),
        ));
    }

    Html(format!(
        r#"<!DOCTYPE html>
<html><head><title>Event Gateway</title></head><body>
<h1>Events</h1>
<form action="/event" method="get">
  <label>DC <select name="dc">{dcs}</select></label>
  <label>Topic <select name="topic">{topics}</select></label>
  <label>Host <input type="text" name="host"></label>
  <label>Start <input type="date" name="startDate"></label>
  <label>End <input type="date" name="endDate"></label>
  <input type="submit" value="Query">
</form>
<p><a href="/create_form">Create event</a></p>
<table border="1">
<tr><th>ID</th><th>Time</th><th>DC</th><th>Topic</th><th>Tags</th><th>Host</th><th>User</th><th>Data</th></tr>
{rows}
</table>
</body></html>"#,
        dcs = options(dcs),
        topics = options(topics),
        rows = rows,
    ))
}

/// The event creation form, pre-populated with topic and DC selectors.
pub fn create_form(topics: &[String], dcs: &[String]) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html><head><title>Create Event</title></head><body>
<h1>Create Event</h1>
<form action="/add_event" method="post">
  <label>Topic <select name="topic">{topics}</select></label>
  <label>DC <select name="dc">{dcs}</select></label>
  <label>Host <input type="text" name="host"></label>
  <label>User <input type="text" name="user"></label>
  <label>Tags <input type="text" name="tags" placeholder="a,b,c"></label>
  <label>Date <input type="date" name="date"></label>
  <label>Time <input type="time" name="time"></label>
  <label>Data <textarea name="data">{{}}</textarea></label>
  <input type="submit" value="Create">
</form>
</body></html>"#,
        topics = options(topics),
        dcs = options(dcs),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_escapes_values() {
        let events = vec![DisplayEvent {
            event_id: "id-1".to_string(),
            event_time: 100,
            dc: "us-east-1".to_string(),
            topic: "<script>".to_string(),
            tags: vec!["a".to_string()],
            host: "web-1".to_string(),
            user: "u".to_string(),
            data: "{}".to_string(),
        }];
        let Html(body) = listing(&events, &[], &[]);
        assert!(body.contains("&lt;script&gt;"));
        assert!(!body.contains("<script>"));
    }

    #[test]
    fn test_create_form_lists_selectors() {
        let Html(body) = create_form(
            &["deploys".to_string()],
            &["us-east-1".to_string()],
        );
        assert!(body.contains("<option value=\"deploys\">"));
        assert!(body.contains("<option value=\"us-east-1\">"));
    }
}
