//! HTML rendering for the customer-facing pages.

use std::fmt::Write;

use chrono::FixedOffset;
use orderwatch_core::{BrandingConfig, Order, OrderStatus, Timeline, TrackingSession};

const STYLE: &str = r#"
body { font-family: Roboto, sans-serif; background: #fff; color: #000; margin: 0; padding: 16px; }
header { text-align: center; margin-top: 16px; }
header img { height: 40px; width: auto; }
h1 { font-size: 2rem; margin: 4px 0; }
h2 { font-size: 1.5rem; margin: 8px 0; }
.dialog { max-width: 400px; margin: 24px auto; padding: 16px 24px; border-radius: 12px; box-shadow: 0 4px 16px rgba(0,0,0,.2); }
.dialog h3 { margin-top: 0; }
.dialog label { display: block; margin: 12px 0 4px; font-size: .9rem; }
.dialog input { width: 100%; box-sizing: border-box; padding: 8px; font-size: 1rem; }
.error { color: #d32f2f; font-size: .9rem; text-align: center; margin-top: 12px; }
.actions { display: flex; justify-content: flex-end; gap: 8px; margin-top: 16px; }
.actions button, .actions a.button, .clear button { border: 0; padding: 8px 16px; border-radius: 4px; cursor: pointer; font-size: .9rem; }
.actions a.button { display: inline-flex; align-items: center; color: inherit; text-decoration: none; }
.submit { background: #FFEB3B; }
.submit:hover { background: #FDD835; }
.secondary { background: transparent; }
.banner { position: fixed; top: 16px; right: 16px; z-index: 1300; }
.banner button { background: #FFEB3B; color: #000; border: 0; padding: 8px 16px; border-radius: 8px; cursor: pointer; box-shadow: 0 2px 8px rgba(0,0,0,.3); }
.card { max-width: 720px; margin: 0 auto 32px; padding: 24px; border-radius: 12px; box-shadow: 0 2px 8px rgba(0,0,0,.2); }
.chip { display: inline-block; background: #1976d2; color: #fff; border-radius: 16px; padding: 2px 10px; font-size: .8rem; margin: 8px 0; }
.timeline { list-style: none; padding: 0; margin: 16px 0; }
.timeline li { display: flex; align-items: center; gap: 12px; }
.timeline .connector { width: 2px; height: 20px; margin-left: 11px; }
.timeline .time { margin-left: auto; color: #666; font-size: .85rem; }
.thanks { color: #2e7d32; text-align: center; font-weight: 500; }
.caption { display: block; text-align: center; font-size: .8rem; }
.clear { text-align: center; }
"#;

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape_html(input: &str) -> String {
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

/// Values the lookup form is rendered with.
#[derive(Debug, Default)]
pub struct SearchView<'a> {
    pub ticket_suffix: &'a str,
    pub mobile: &'a str,
    pub error: Option<&'a str>,
}

fn open_page(out: &mut String, title: &str, head_extra: &str) {
    let _ = write!(
        out,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<link rel="stylesheet" href="https://fonts.googleapis.com/icon?family=Material+Icons">
{head_extra}<style>{STYLE}</style>
</head>
<body>
"#,
        title = escape_html(title),
    );
}

fn close_page(out: &mut String) {
    out.push_str("</body>\n</html>\n");
}

fn header(out: &mut String, branding: &BrandingConfig, today: &str) {
    let company = escape_html(&branding.company_name);
    out.push_str("<header>\n");
    if let Some(logo) = &branding.logo {
        let _ = writeln!(
            out,
            r#"<img src="/assets/{}" alt="{} Logo">"#,
            escape_html(logo.trim_start_matches('/')),
            company
        );
    }
    let _ = writeln!(out, "<h1>{}</h1>", company);
    let _ = writeln!(out, "<div>Date: {}</div>", escape_html(today));
    out.push_str("<h2>Track Your Order</h2>\n</header>\n");
}

/// The "Confirm Your Details" lookup form.
pub fn search_page(branding: &BrandingConfig, today: &str, view: &SearchView<'_>) -> String {
    let mut out = String::new();
    open_page(&mut out, &branding.company_name, "");
    header(&mut out, branding, today);

    let _ = write!(
        out,
        r#"<form class="dialog" method="post" action="/ticket">
<h3>Confirm Your Details</h3>
<label for="ticket_suffix">Ticket ID (Last 4 digits)</label>
<input id="ticket_suffix" name="ticket_suffix" value="{suffix}" autocomplete="off">
<label for="mobile">Mobile Number</label>
<input id="mobile" name="mobile" value="{mobile}" inputmode="numeric" autocomplete="tel">
"#,
        suffix = escape_html(view.ticket_suffix),
        mobile = escape_html(view.mobile),
    );
    if let Some(error) = view.error {
        let _ = writeln!(out, r#"<p class="error" role="alert">{}</p>"#, escape_html(error));
    }
    out.push_str(
        r#"<div class="actions">
<a href="/ticket" class="button secondary" role="button"><span class="material-icons">clear</span> Clear</a>
<button type="submit" class="submit"><span class="material-icons">search</span> Submit</button>
</div>
</form>
"#,
    );

    close_page(&mut out);
    out
}

fn render_timeline(out: &mut String, timeline: &Timeline) {
    out.push_str("<ol class=\"timeline\">\n");
    for step in &timeline.steps {
        let weight = if step.active { "bold" } else { "normal" };
        let _ = writeln!(
            out,
            r#"<li><span class="material-icons" style="color:{icon_color}">{icon}</span><span style="color:{label_color};font-weight:{weight}">{label}</span><span class="time">{time}</span></li>"#,
            icon_color = step.icon_color,
            icon = step.icon,
            label_color = step.label_color,
            label = step.status.label(),
            time = escape_html(&step.time),
        );
        if let Some(color) = step.connector_color {
            let _ = writeln!(
                out,
                r#"<li><span class="connector" style="background:{}"></span></li>"#,
                color
            );
        }
    }
    out.push_str("</ol>\n");
}

fn render_order(out: &mut String, order: &Order, branding: &BrandingConfig, offset: FixedOffset) {
    out.push_str("<section class=\"card\">\n");
    let _ = writeln!(
        out,
        "<strong>{} - {}</strong><br>",
        escape_html(&order.ticket_id),
        escape_html(&order.customer.name)
    );
    let _ = writeln!(out, r#"<span class="chip">{}</span>"#, order.stage_label());
    let _ = writeln!(
        out,
        "<div><strong>Mobile:</strong> {}</div>",
        escape_html(&order.customer.mobile)
    );
    let _ = writeln!(
        out,
        "<div><strong>Total Time:</strong> {}</div>\n<hr>",
        order.total_time()
    );

    render_timeline(out, &Timeline::for_order(order, offset));
    out.push_str("<hr>\n");

    if order.current_stage() == Some(OrderStatus::Served) {
        out.push_str("<p class=\"thanks\">Thank you for your purchase!</p>\n");
    }
    let _ = write!(
        out,
        r#"<span class="caption">{}</span>
<span class="caption">{}</span>
<span class="caption"><strong>Contact: {}</strong></span>
</section>
"#,
        escape_html(&branding.wait_message),
        escape_html(&branding.estimate_message),
        escape_html(&branding.contact_number),
    );
}

fn live_script(out: &mut String, session_id: &str, alert: bool, sound: Option<&str>) {
    let mut on_alert = String::new();
    if alert {
        if let Some(sound) = sound {
            let _ = writeln!(
                out,
                r#"<audio id="notify-sound" src="/assets/{}" preload="auto"></audio>"#,
                escape_html(sound.trim_start_matches('/'))
            );
            on_alert.push_str(
                r#"var sound = document.getElementById("notify-sound"); if (sound) { sound.play().catch(function () {}); }"#,
            );
        }
        on_alert.push_str("if (navigator.vibrate) { navigator.vibrate(200); }");
    }

    let _ = write!(
        out,
        r#"<script>
(function () {{
  var id = "{id}";
  {on_alert}
  var proto = location.protocol === "https:" ? "wss://" : "ws://";
  var ws = new WebSocket(proto + location.host + "/api/v1/track/" + id + "/ws");
  ws.onmessage = function (event) {{
    var msg = JSON.parse(event.data);
    if (msg.type === "status_update") {{ location.reload(); }}
    if (msg.type === "session_cleared") {{ location.href = "/ticket"; }}
  }};
}})();
</script>
"#,
        id = escape_html(session_id),
    );
}

/// The live tracking page for a session.
pub fn session_page(
    branding: &BrandingConfig,
    today: &str,
    session: &TrackingSession,
    offset: FixedOffset,
    refresh_secs: u64,
) -> String {
    let id = escape_html(&session.id);
    let mut out = String::new();
    let refresh = format!(
        "<meta http-equiv=\"refresh\" content=\"{}\">\n",
        refresh_secs.max(1)
    );
    open_page(&mut out, &branding.company_name, &refresh);
    header(&mut out, branding, today);

    if session.new_status_available {
        let _ = writeln!(
            out,
            r#"<form class="banner" method="post" action="/ticket/session/{id}/dismiss"><button type="submit" title="Click to dismiss notification">&#x1F514; New status update available! Click to refresh.</button></form>"#,
        );
    }

    if let Some(error) = &session.error {
        let _ = writeln!(out, r#"<p class="error" role="alert">{}</p>"#, escape_html(error));
    }

    for order in &session.orders {
        render_order(&mut out, order, branding, offset);
    }

    let _ = writeln!(
        out,
        r#"<form class="clear" method="post" action="/ticket/session/{id}/clear"><button type="submit" class="secondary"><span class="material-icons">clear</span> Clear</button></form>"#,
    );

    live_script(
        &mut out,
        &session.id,
        session.new_status_available,
        branding.notification_sound.as_deref(),
    );
    close_page(&mut out);
    out
}
