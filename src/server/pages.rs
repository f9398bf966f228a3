//! HTML pages served to the capturing device.
//!
//! Two pages only (form and confirmation), rendered from format strings;
//! a template engine would be more machinery than markup here.

/// Escape the few characters that matter when interpolating record-store
/// text into HTML.
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// The upload form, bound to the resolved client/appointment.
pub fn upload_form(full_name: &str, appointment_date: &str, appt_type: &str, action: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Upload Photos</title>
<style>
body {{ font-family: sans-serif; margin: 2em; text-align: center; }}
.card {{ max-width: 26em; margin: 0 auto; padding: 1.5em; border: 1px solid #ccc; border-radius: 8px; }}
input[type=submit] {{ margin-top: 1em; padding: 0.6em 2em; font-size: 1em; }}
</style>
</head>
<body>
<div class="card">
<h2>Upload Photos</h2>
<p><strong>{name}</strong></p>
<p>{date} &middot; {kind}</p>
<form action="{action}" method="post" enctype="multipart/form-data">
<input type="file" name="photos" accept="image/*" capture="environment" multiple>
<br>
<input type="submit" value="Upload">
</form>
</div>
</body>
</html>"#,
        name = escape(full_name),
        date = escape(appointment_date),
        kind = escape(appt_type),
        action = action,
    )
}

/// The confirmation page, reporting how many files were saved.
pub fn upload_success(
    uploaded: usize,
    full_name: &str,
    appointment_date: &str,
    appt_type: &str,
) -> String {
    let noun = if uploaded == 1 { "photo" } else { "photos" };
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Upload Complete</title>
<style>
body {{ font-family: sans-serif; margin: 2em; text-align: center; }}
.card {{ max-width: 26em; margin: 0 auto; padding: 1.5em; border: 1px solid #ccc; border-radius: 8px; }}
</style>
</head>
<body>
<div class="card">
<h2>Upload Complete</h2>
<p>{uploaded} {noun} saved for <strong>{name}</strong></p>
<p>{date} &middot; {kind}</p>
</div>
</body>
</html>"#,
        uploaded = uploaded,
        noun = noun,
        name = escape(full_name),
        date = escape(appointment_date),
        kind = escape(appt_type),
    )
}
