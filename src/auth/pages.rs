//! Minimal HTML pages for the browser side of the login flow.

use axum::response::Html;

use super::provider::IdentityClaims;

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{title} - Stockwatch</title></head>
<body>
{body}
</body>
</html>
"#
    ))
}

pub fn landing() -> Html<String> {
    page(
        "Welcome",
        r#"<h1>Stockwatch</h1>
<p>Track the symbols you care about.</p>
<a href="/login">Sign in with Google</a>"#,
    )
}

pub fn welcome(user: &IdentityClaims) -> Html<String> {
    let display = user
        .name
        .as_deref()
        .or(user.email.as_deref())
        .unwrap_or("there");
    let email = user.email.as_deref().unwrap_or_default();
    page(
        "Welcome",
        &format!(
            r#"<h1>Hello, {}</h1>
<p>Signed in as {}</p>
<a href="/logout">Sign out</a>"#,
            escape(display),
            escape(email)
        ),
    )
}

pub fn provider_error(error: &str) -> Html<String> {
    page(
        "Sign-in failed",
        &format!(
            r#"<h1>Sign-in failed</h1>
<p>The identity provider reported: {}</p>
<a href="/login">Try again</a>"#,
            escape(error)
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welcome_escapes_claims() {
        let mut claims = IdentityClaims::with_email("a@example.com");
        claims.name = Some("<script>alert(1)</script>".into());
        let Html(body) = welcome(&claims);
        assert!(!body.contains("<script>"));
        assert!(body.contains("&lt;script&gt;"));
        assert!(body.contains("a@example.com"));
    }

    #[test]
    fn error_page_shows_reason() {
        let Html(body) = provider_error("access_denied");
        assert!(body.contains("access_denied"));
        assert!(body.contains(r#"href="/login""#));
    }
}
