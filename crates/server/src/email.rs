use crate::config::settings;

// --- Environment helpers ---

fn mailgun_api_key() -> Result<String, String> {
    settings()
        .mailgun_api_key
        .clone()
        .ok_or_else(|| "MAILGUN_API_KEY is not configured".to_string())
}

fn mailgun_domain() -> Result<String, String> {
    settings()
        .mailgun_domain
        .clone()
        .ok_or_else(|| "MAILGUN_DOMAIN is not configured".to_string())
}

fn mailgun_from() -> Result<String, String> {
    match settings().mailgun_from.clone() {
        Some(v) => Ok(v),
        None => Ok(format!("{} <noreply@{}>", settings().app_name, mailgun_domain()?)),
    }
}

/// An outbound email. The transport performs no retries; callers decide.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    pub to_name: Option<String>,
    pub reply_to: Option<String>,
    pub cc: Option<String>,
    pub subject: String,
    pub text: String,
    pub html: String,
    /// Attached as the `notice-id` user variable so delivery webhooks can
    /// be correlated back to the notice.
    pub notice_id: Option<String>,
}

// --- Core email sending ---

#[tracing::instrument(skip(email), fields(to = %email.to, subject = %email.subject))]
pub async fn send_email(email: &OutboundEmail) -> Result<(), String> {
    let domain = mailgun_domain()?;
    let url = format!("https://api.mailgun.net/v3/{}/messages", domain);

    let to = match &email.to_name {
        Some(name) => format!("{} <{}>", name, email.to),
        None => email.to.clone(),
    };

    let mut form: Vec<(&str, String)> = vec![
        ("from", mailgun_from()?),
        ("to", to),
        ("subject", email.subject.clone()),
        ("text", email.text.clone()),
        ("html", email.html.clone()),
    ];
    if let Some(reply_to) = &email.reply_to {
        form.push(("h:Reply-To", reply_to.clone()));
    }
    if let Some(cc) = &email.cc {
        form.push(("cc", cc.clone()));
    }
    if let Some(notice_id) = &email.notice_id {
        form.push(("v:notice-id", notice_id.clone()));
    }

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {}", e))?;

    let response = client
        .post(&url)
        .basic_auth("api", Some(mailgun_api_key()?))
        .form(&form)
        .send()
        .await
        .map_err(|e| format!("Mailgun request failed: {}", e))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(format!("Mailgun API error ({}): {}", status, body));
    }

    tracing::info!("Email sent successfully");
    Ok(())
}

// --- Higher-level helpers ---

/// Send a formal compliance notice to the GC contact. Returns whether the
/// transport accepted the message; the notice state machine records the
/// outcome either way.
pub async fn send_notice_email(
    to: &str,
    to_name: Option<&str>,
    reply_to: Option<&str>,
    cc: Option<&str>,
    subject: &str,
    notice_content: &str,
    project_name: &str,
    notice_id: &str,
) -> bool {
    let email = OutboundEmail {
        to: to.to_string(),
        to_name: to_name.map(|s| s.to_string()),
        reply_to: reply_to.map(|s| s.to_string()),
        cc: cc.map(|s| s.to_string()),
        subject: subject.to_string(),
        text: templates::notice_text(subject, notice_content, project_name),
        html: templates::notice_html(subject, notice_content, project_name),
        notice_id: Some(notice_id.to_string()),
    };
    match send_email(&email).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, to = to, "Failed to send notice email");
            false
        }
    }
}

/// Send a CRITICAL/EXPIRED deadline alert email.
pub async fn send_alert_email(to: &str, to_name: &str, title: &str, message: &str, deadline_label: &str) {
    let subject = format!("[{}] {}", settings().app_name, title);
    let email = OutboundEmail {
        to: to.to_string(),
        to_name: Some(to_name.to_string()),
        reply_to: None,
        cc: None,
        subject,
        text: templates::alert_text(message, deadline_label),
        html: templates::alert_html(title, message, deadline_label),
        notice_id: None,
    };
    if let Err(e) = send_email(&email).await {
        tracing::error!(error = %e, to = to, "Failed to send alert email");
    }
}

/// Send the weekly compliance summary.
pub async fn send_weekly_summary_email(to: &str, to_name: &str, project_name: &str, body: &str) {
    let subject = format!(
        "[{}] Weekly Compliance Summary — {}",
        settings().app_name,
        project_name
    );
    let email = OutboundEmail {
        to: to.to_string(),
        to_name: Some(to_name.to_string()),
        reply_to: None,
        cc: None,
        subject,
        text: body.to_string(),
        html: templates::summary_html(body),
        notice_id: None,
    };
    if let Err(e) = send_email(&email).await {
        tracing::error!(error = %e, to = to, "Failed to send weekly summary email");
    }
}

// --- Webhook verification ---

/// Verify a Mailgun webhook signature (HMAC-SHA256 over timestamp + token).
pub fn verify_webhook_signature(
    signing_key: &str,
    timestamp: &str,
    token: &str,
    signature: &str,
) -> bool {
    use hmac::{Hmac, Mac};
    type HmacSha256 = Hmac<sha2::Sha256>;

    let Ok(mut mac) = HmacSha256::new_from_slice(signing_key.as_bytes()) else {
        return false;
    };
    mac.update(timestamp.as_bytes());
    mac.update(token.as_bytes());

    let expected = hex::encode(mac.finalize().into_bytes());
    expected == signature
}

// --- Email templates ---

mod templates {
    pub fn notice_text(subject: &str, content: &str, project_name: &str) -> String {
        format!(
            "{subject}\nProject: {project_name}\n\n{content}\n\nPlease acknowledge receipt of this notice by replying to this email.\n"
        )
    }

    pub fn notice_html(subject: &str, content: &str, project_name: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: Georgia, 'Times New Roman', serif; color: #1c1917; line-height: 1.6; padding: 20px;">
  <div style="max-width: 640px; margin: 0 auto;">
    <h2 style="margin-bottom: 4px;">{subject}</h2>
    <p style="color: #57534e; margin-top: 0;">Project: {project_name}</p>
    <div style="background: #fafaf8; border: 1px solid #e8e5de; border-radius: 8px; padding: 20px; margin: 16px 0; white-space: pre-wrap;">{content}</div>
    <p style="color: #57534e; font-size: 14px;">Please acknowledge receipt of this notice by replying to this email.</p>
  </div>
</body>
</html>"#
        )
    }

    pub fn alert_text(message: &str, deadline_label: &str) -> String {
        format!("{message}\n\nDeadline: {deadline_label}\n\nLog in to draft and send the required notice.\n")
    }

    pub fn alert_html(title: &str, message: &str, deadline_label: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: Arial, sans-serif; color: #1c1917; line-height: 1.6; padding: 20px;">
  <div style="max-width: 600px; margin: 0 auto; border: 1px solid #dc2626; border-radius: 8px; padding: 24px;">
    <h2 style="color: #dc2626; margin-top: 0;">{title}</h2>
    <p>{message}</p>
    <p><strong>Deadline:</strong> {deadline_label}</p>
    <p style="color: #57534e; font-size: 14px;">Log in to draft and send the required notice.</p>
  </div>
</body>
</html>"#
        )
    }

    pub fn summary_html(body: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: Arial, sans-serif; color: #1c1917; padding: 20px;">
  <pre style="max-width: 640px; margin: 0 auto; background: #fafaf8; border: 1px solid #e8e5de; border-radius: 8px; padding: 20px; white-space: pre-wrap; font-family: inherit;">{body}</pre>
</body>
</html>"#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_webhook_signature_valid() {
        use hmac::{Hmac, Mac};
        type HmacSha256 = Hmac<sha2::Sha256>;

        let key = "test-signing-key";
        let timestamp = "1234567890";
        let token = "abc123";

        let mut mac = HmacSha256::new_from_slice(key.as_bytes()).unwrap();
        mac.update(timestamp.as_bytes());
        mac.update(token.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        assert!(verify_webhook_signature(key, timestamp, token, &signature));
    }

    #[test]
    fn verify_webhook_signature_invalid() {
        assert!(!verify_webhook_signature("key", "timestamp", "token", "badsignature"));
    }

    #[test]
    fn verify_webhook_signature_wrong_key() {
        use hmac::{Hmac, Mac};
        type HmacSha256 = Hmac<sha2::Sha256>;

        let mut mac = HmacSha256::new_from_slice(b"correct-key").unwrap();
        mac.update(b"1234567890");
        mac.update(b"abc123");
        let signature = hex::encode(mac.finalize().into_bytes());

        assert!(!verify_webhook_signature("wrong-key", "1234567890", "abc123", &signature));
    }

    #[test]
    fn notice_template_contains_content_and_project() {
        let html = templates::notice_html("Notice of Claim", "Formal notice body", "Summit Tower");
        assert!(html.contains("Notice of Claim"));
        assert!(html.contains("Formal notice body"));
        assert!(html.contains("Summit Tower"));
    }

    #[test]
    fn alert_template_contains_deadline() {
        let html = templates::alert_html("CRITICAL: Claims Notice", "2 days remaining", "Friday, March 21, 2025");
        assert!(html.contains("CRITICAL: Claims Notice"));
        assert!(html.contains("Friday, March 21, 2025"));
    }
}
